//! Archive detection and extraction into a scratch directory.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::IngestError;

/// Archive formats recognised by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    /// Recognised (`.7z`, `.rar`) but not decodable.
    Unsupported,
}

/// Detects an archive by its (case-insensitive) file name.
pub fn detect(path: &Path) -> Option<ArchiveKind> {
    let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
    if name.ends_with(".zip") {
        Some(ArchiveKind::Zip)
    } else if name.ends_with(".gz") || name.ends_with(".tgz") {
        Some(ArchiveKind::TarGz)
    } else if name.ends_with(".bz2") || name.ends_with(".tbz2") {
        Some(ArchiveKind::TarBz2)
    } else if name.ends_with(".xz") || name.ends_with(".txz") {
        Some(ArchiveKind::TarXz)
    } else if name.ends_with(".tar") {
        Some(ArchiveKind::Tar)
    } else if name.ends_with(".7z") || name.ends_with(".rar") {
        Some(ArchiveKind::Unsupported)
    } else {
        None
    }
}

/// Returns the member path if it stays inside the extraction root.
///
/// Rejects empty and absolute names, `..` components and Windows prefixes.
pub fn safe_member_path(name: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in name.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

/// Extracts `archive` into `dest`. Returns the number of files written.
pub fn extract(archive: &Path, kind: ArchiveKind, dest: &Path) -> Result<usize, IngestError> {
    let file = File::open(archive).map_err(|e| IngestError::from_io(archive.to_path_buf(), e))?;
    let reader = BufReader::new(file);
    let written = match kind {
        ArchiveKind::Zip => extract_zip(archive, reader, dest)?,
        ArchiveKind::Tar => extract_tar(archive, reader, dest)?,
        ArchiveKind::TarGz => {
            extract_tar(archive, flate2::read::GzDecoder::new(reader), dest)?
        }
        ArchiveKind::TarBz2 => {
            extract_tar(archive, bzip2::read::BzDecoder::new(reader), dest)?
        }
        ArchiveKind::TarXz => extract_tar(archive, xz2::read::XzDecoder::new(reader), dest)?,
        ArchiveKind::Unsupported => {
            return Err(IngestError::UnsupportedArchive(archive.to_path_buf()));
        }
    };
    debug!(archive = %archive.display(), files = written, "archive extracted");
    Ok(written)
}

fn archive_error(archive: &Path, err: impl std::fmt::Display) -> IngestError {
    IngestError::Archive {
        path: archive.to_path_buf(),
        message: err.to_string(),
    }
}

fn extract_zip<R: io::Read + io::Seek>(
    archive: &Path,
    reader: R,
    dest: &Path,
) -> Result<usize, IngestError> {
    let mut zip = zip::ZipArchive::new(reader).map_err(|e| archive_error(archive, e))?;
    let mut written = 0;

    for i in 0..zip.len() {
        let mut member = zip.by_index(i).map_err(|e| archive_error(archive, e))?;
        let Some(rel) = safe_member_path(Path::new(member.name())) else {
            warn!(archive = %archive.display(), member = member.name(), "skipping unsafe archive member");
            continue;
        };
        let out = dest.join(rel);
        if member.is_dir() {
            std::fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&out)?;
        io::copy(&mut member, &mut file).map_err(|e| archive_error(archive, e))?;
        if let Some(modified) = member.last_modified().and_then(zip_mtime) {
            file.set_modified(modified)?;
        }
        written += 1;
    }

    Ok(written)
}

/// Zip stores local wall-clock time without a zone; it is read as UTC.
fn zip_mtime(ts: zip::DateTime) -> Option<SystemTime> {
    let naive = NaiveDate::from_ymd_opt(ts.year().into(), ts.month().into(), ts.day().into())?
        .and_hms_opt(ts.hour().into(), ts.minute().into(), ts.second().into())?;
    Some(naive.and_utc().into())
}

fn extract_tar<R: io::Read>(archive: &Path, reader: R, dest: &Path) -> Result<usize, IngestError> {
    let mut tar = tar::Archive::new(reader);
    let mut written = 0;

    for entry in tar.entries().map_err(|e| archive_error(archive, e))? {
        let mut entry = entry.map_err(|e| archive_error(archive, e))?;
        let name = entry
            .path()
            .map_err(|e| archive_error(archive, e))?
            .into_owned();
        let Some(rel) = safe_member_path(&name) else {
            warn!(archive = %archive.display(), member = %name.display(), "skipping unsafe archive member");
            continue;
        };

        let kind = entry.header().entry_type();
        if kind.is_dir() {
            std::fs::create_dir_all(dest.join(&rel))?;
            continue;
        }
        if !kind.is_file() {
            // Links and devices are never materialised.
            debug!(member = %name.display(), "skipping non-regular archive member");
            continue;
        }

        let out = dest.join(rel);
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry.unpack(&out).map_err(|e| archive_error(archive, e))?;
        written += 1;
    }

    Ok(written)
}
