//! Backup and restore of the store's files.
//!
//! A backup is a zip archive holding the database file under its own file
//! name and every regular file of the documents directory under
//! `<documents dir name>/<relative path>`. Restore validates every entry
//! against the target directory before writing anything, so an archive with
//! a single escaping entry leaves the target untouched.

use std::env;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};

/// Creates and restores archives of the database file and documents directory.
#[derive(Debug, Clone)]
pub struct ArchiveManager {
    database_path: PathBuf,
    documents_dir: PathBuf,
}

impl ArchiveManager {
    /// Create a manager for the given database file and documents directory.
    #[must_use]
    pub fn new(database_path: impl Into<PathBuf>, documents_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            documents_dir: documents_dir.into(),
        }
    }

    /// Write a backup archive to `target` and return its path.
    ///
    /// A missing database file or documents directory is skipped rather than
    /// treated as an error. The archive is written to a temporary file next to
    /// `target` and moved into place once complete, so a failed backup never
    /// leaves a truncated archive behind. A `target` inside the documents
    /// directory is never archived into itself.
    ///
    /// Run [`RecordStore::checkpoint`](crate::store::RecordStore::checkpoint)
    /// first when the store is open.
    ///
    /// # Errors
    ///
    /// Returns an error if a source file cannot be read or the archive cannot
    /// be written.
    pub fn backup(&self, target: impl AsRef<Path>) -> Result<PathBuf> {
        let target = target.as_ref();

        let documents = if self.documents_dir.is_dir() {
            let existing_target = target.canonicalize().ok();
            let mut files = collect_files(&self.documents_dir)?;
            files.retain(|(path, _)| {
                existing_target.is_none() || path.canonicalize().ok() != existing_target
            });
            Some((file_name_str(&self.documents_dir)?, files))
        } else {
            debug!(
                "Documents directory {} not found; skipping",
                self.documents_dir.display()
            );
            None
        };

        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        let mut entries = 0_usize;
        {
            let mut zip = ZipWriter::new(&mut tmp);
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

            if self.database_path.is_file() {
                let name = database_file_name(&self.database_path)?;
                add_file(&mut zip, &self.database_path, &name, options)?;
                entries += 1;
            } else {
                warn!(
                    "Database {} not found; backing up without it",
                    self.database_path.display()
                );
            }

            if let Some((root, files)) = &documents {
                for (path, relative) in files {
                    add_file(&mut zip, path, &format!("{root}/{relative}"), options)?;
                    entries += 1;
                }
            }

            zip.finish()?;
        }

        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(target).map_err(|e| Error::Io(e.error))?;

        info!(entries, "Backup written to {}", target.display());
        Ok(target.to_path_buf())
    }

    /// Extract `archive` into `target_dir` and return the restored database path.
    ///
    /// Every entry is resolved against the target directory first. The
    /// directory is created, if missing, only once the archive has been read
    /// and all entries are known to stay inside, so a rejected or unreadable
    /// archive leaves the filesystem as it was.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsafeArchive`] naming the first entry that would land
    /// outside `target_dir`, or an I/O or archive error.
    pub fn restore(&self, archive: impl AsRef<Path>, target_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let archive_path = archive.as_ref();
        let target_dir = target_dir.as_ref();

        let base = resolve_target(target_dir)?;

        let mut zip = ZipArchive::new(File::open(archive_path)?)?;

        let mut destinations = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let entry = zip.by_index(index)?;
            let name = entry.name().to_string();
            let dest = resolve_entry(&base, &name)?;
            destinations.push((dest, entry.is_dir()));
        }

        fs::create_dir_all(&base).map_err(|source| Error::DirectoryCreate {
            path: target_dir.to_path_buf(),
            source,
        })?;

        for (index, (dest, is_dir)) in destinations.iter().enumerate() {
            if *is_dir || *dest == base {
                fs::create_dir_all(dest)?;
                continue;
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut entry = zip.by_index(index)?;
            let mut out = File::create(dest)?;
            io::copy(&mut entry, &mut out)?;
        }

        info!(
            entries = destinations.len(),
            "Restored {} into {}",
            archive_path.display(),
            base.display()
        );
        Ok(base.join(database_file_name(&self.database_path)?))
    }
}

/// Resolve an archive entry name to the path it would be written to.
///
/// Parent segments are applied lexically, absolute names and drive prefixes
/// replace the base, and the longest existing ancestor is canonicalized so
/// symlinks inside `base` are followed.
fn resolve_entry(base: &Path, entry: &str) -> Result<PathBuf> {
    let unsafe_entry = || Error::UnsafeArchive {
        entry: entry.to_string(),
    };

    let lexical = join_lexically(base.to_path_buf(), Path::new(entry));
    let resolved = canonicalize_existing(&lexical).ok_or_else(unsafe_entry)?;

    if resolved == base || resolved.starts_with(base) {
        Ok(resolved)
    } else {
        Err(unsafe_entry())
    }
}

/// Canonical form of the restore target, which need not exist yet.
fn resolve_target(target_dir: &Path) -> Result<PathBuf> {
    let lexical = join_lexically(env::current_dir()?, target_dir);
    canonicalize_existing(&lexical).ok_or_else(|| {
        Error::storage(format!(
            "cannot resolve restore target {}",
            target_dir.display()
        ))
    })
}

/// Apply `path` to `start` component by component without touching the disk.
fn join_lexically(start: PathBuf, path: &Path) -> PathBuf {
    let mut joined = start;
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => joined = PathBuf::from(prefix.as_os_str()),
            Component::RootDir => joined.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                joined.pop();
            }
            Component::Normal(part) => joined.push(part),
        }
    }
    joined
}

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// components below it. `path` must already be free of `.` and `..`.
fn canonicalize_existing(path: &Path) -> Option<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();
    while fs::symlink_metadata(existing).is_err() {
        missing.push(existing.file_name()?);
        existing = existing.parent()?;
    }

    let mut resolved = existing.canonicalize().ok()?;
    resolved.extend(missing.iter().rev());
    Some(resolved)
}

/// List regular files below `root` as `(absolute path, relative name)` pairs.
///
/// Relative names use forward slashes. Symlinks to regular files are read
/// through; symlinked directories are not descended into.
fn collect_files(root: &Path) -> Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    let mut pending = vec![(root.to_path_buf(), String::new())];

    while let Some((dir, prefix)) = pending.pop() {
        let mut children = fs::read_dir(&dir)?.collect::<io::Result<Vec<_>>>()?;
        children.sort_by_key(fs::DirEntry::file_name);

        for child in children {
            let name = child.file_name();
            let name = name.to_str().ok_or_else(|| {
                Error::storage(format!("non UTF-8 file name under {}", dir.display()))
            })?;
            let relative = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}/{name}")
            };

            let file_type = child.file_type()?;
            if file_type.is_dir() {
                pending.push((child.path(), relative));
            } else if file_type.is_file() || is_file_symlink(&file_type, &child.path()) {
                files.push((child.path(), relative));
            }
        }
    }

    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

fn is_file_symlink(file_type: &fs::FileType, path: &Path) -> bool {
    file_type.is_symlink() && fs::metadata(path).is_ok_and(|m| m.is_file())
}

fn add_file<W: Write + io::Seek>(
    zip: &mut ZipWriter<W>,
    path: &Path,
    name: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    zip.start_file(name, options)?;
    let mut source = File::open(path)?;
    io::copy(&mut source, zip)?;
    debug!("Archived {name}");
    Ok(())
}

fn database_file_name(path: &Path) -> Result<String> {
    file_name_str(path)
}

fn file_name_str(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::storage(format!("{} has no usable file name", path.display())))
}
