//! Expands an input path into a lazy stream of file entries.
//!
//! A single file yields one entry. A directory is walked with each
//! directory's files yielded before its subdirectories, sorted by name, so
//! companions always arrive together. Archives are extracted into a scratch
//! directory that lives as long as the expander.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::archive::{self, ArchiveKind};
use crate::error::IngestError;
use crate::types::FileEntry;

/// A file that was discovered but could not be inspected.
#[derive(Debug)]
pub struct EntryError {
    pub source_path: PathBuf,
    pub relative_path: String,
    pub error: IngestError,
}

type FilteredWalk = walkdir::FilterEntry<walkdir::IntoIter, fn(&DirEntry) -> bool>;

enum Source {
    Single(Option<FileEntry>),
    Walk { root: PathBuf, iter: FilteredWalk },
}

/// Single-pass iterator over the files under an ingestion root.
pub struct PathExpander {
    source: Source,
    is_single_file: bool,
    // Declared last so it is dropped after the walker.
    _scratch: Option<TempDir>,
}

impl PathExpander {
    /// Opens `root`. Archives are extracted before this returns.
    ///
    /// Fails with `PathNotFound`, `UnsupportedArchive` or an archive read
    /// error. Per-file problems surface later as [`EntryError`] items.
    pub fn open(root: &Path, recursive: bool) -> Result<Self, IngestError> {
        let meta = match std::fs::metadata(root) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IngestError::PathNotFound(root.to_path_buf()));
            }
            Err(e) => return Err(IngestError::from_io(root.to_path_buf(), e)),
        };

        if meta.is_dir() {
            return Ok(Self::walk(root.to_path_buf(), recursive, None));
        }

        if let Some(kind) = archive::detect(root) {
            if kind == ArchiveKind::Unsupported {
                return Err(IngestError::UnsupportedArchive(root.to_path_buf()));
            }
            let scratch = tempfile::Builder::new().prefix("immich-ingest-").tempdir()?;
            let files = archive::extract(root, kind, scratch.path())?;
            info!(archive = %root.display(), files, "archive expanded");
            // Archive contents are always walked in full.
            let dir = scratch.path().to_path_buf();
            return Ok(Self::walk(dir, true, Some(scratch)));
        }

        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let entry = file_entry(root.to_path_buf(), name, &meta);
        Ok(Self {
            source: Source::Single(Some(entry)),
            is_single_file: true,
            _scratch: None,
        })
    }

    fn walk(root: PathBuf, recursive: bool, scratch: Option<TempDir>) -> Self {
        let iter = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .follow_links(true)
            .sort_by(|a, b| {
                (a.file_type().is_dir(), a.file_name()).cmp(&(b.file_type().is_dir(), b.file_name()))
            })
            .into_iter()
            .filter_entry(visible as fn(&DirEntry) -> bool);
        debug!(root = %root.display(), recursive, "walking directory");
        Self {
            source: Source::Walk { root, iter },
            is_single_file: false,
            _scratch: scratch,
        }
    }

    /// True when the root was a plain file (not a directory or archive).
    pub fn is_single_file(&self) -> bool {
        self.is_single_file
    }
}

impl Iterator for PathExpander {
    type Item = Result<FileEntry, EntryError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            Source::Single(entry) => entry.take().map(Ok),
            Source::Walk { root, iter } => loop {
                let item = match iter.next()? {
                    Ok(item) => item,
                    Err(err) => {
                        let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                        let relative_path = relative(root, &path);
                        let error = match err.into_io_error() {
                            Some(io) => IngestError::from_io(path.clone(), io),
                            None => IngestError::Io(std::io::Error::other("filesystem loop")),
                        };
                        return Some(Err(EntryError {
                            source_path: path,
                            relative_path,
                            error,
                        }));
                    }
                };
                if !item.file_type().is_file() {
                    continue;
                }
                let path = item.path().to_path_buf();
                let relative_path = relative(root, &path);
                return Some(match item.metadata() {
                    Ok(meta) => Ok(file_entry(path, relative_path, &meta)),
                    Err(err) => {
                        let error = match err.into_io_error() {
                            Some(io) => IngestError::from_io(path.clone(), io),
                            None => IngestError::Io(std::io::Error::other("metadata unavailable")),
                        };
                        Err(EntryError {
                            source_path: path,
                            relative_path,
                            error,
                        })
                    }
                });
            },
        }
    }
}

/// Hidden files and directories below the root are never ingested.
fn visible(entry: &DirEntry) -> bool {
    entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
}

/// Relative path with forward slashes, even on Windows.
fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

pub(crate) fn file_entry(source_path: PathBuf, relative_path: String, meta: &std::fs::Metadata) -> FileEntry {
    let modified: DateTime<Utc> = meta
        .modified()
        .map(Into::into)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    FileEntry {
        source_path,
        relative_path,
        size: meta.len(),
        modified,
        created: meta.created().ok().map(Into::into),
    }
}
