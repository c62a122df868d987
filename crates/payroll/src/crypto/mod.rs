//! Key management and field encryption.
//!
//! [`EncryptionKey`] is loaded once at start-up and handed by reference to
//! [`FieldCipher`], which seals and opens individual sensitive values.

mod cipher;
mod key;

pub use cipher::FieldCipher;
pub use key::{EncryptionKey, KEY_LEN};
