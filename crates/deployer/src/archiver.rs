use std::{
    fs::File,
    io::{self, Seek, Write},
    path::{Component, Path, PathBuf, StripPrefixError},
};

use derive_more::{Display, Error, From};
use tokio::task::JoinError;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::error::ErrorKind;

/// Deflate compression level used for every archive entry.
const COMPRESSION_LEVEL: i32 = 9;

/// Errors that may occur during the archive creation process.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ArchiverError {
    /// [`zip`]-crate specific error.
    Zip(zip::result::ZipError),

    /// [`walkdir`]-crate specific error.
    WalkDir(walkdir::Error),

    /// IO error.
    Io(io::Error),

    /// Unable to strip source directory prefix from path.
    StripPrefix(StripPrefixError),

    /// Source path exists, but is not a directory.
    #[display(fmt = "{} is not a directory", "_0.display()")]
    #[from(ignore)]
    NotADirectory(#[error(not(source))] PathBuf),

    /// Archiving task panicked or was cancelled.
    #[display(fmt = "archiving task failed: {}", _0)]
    Join(JoinError),
}

impl ArchiverError {
    /// Failure class of this error.
    pub(crate) fn kind(&self) -> ErrorKind {
        ErrorKind::LocalIo
    }
}

/// Archive the `source` directory into a ZIP file at `destination`.
///
/// Any existing file at `destination` is overwritten. The returned future resolves
/// only after the archive was finalized and synced to disk, so the file is safe to upload.
pub(crate) async fn archive_directory(
    source: &Path,
    destination: &Path,
) -> Result<PathBuf, ArchiverError> {
    let source = source.to_owned();
    let destination = destination.to_owned();

    tokio::task::spawn_blocking(move || -> Result<PathBuf, ArchiverError> {
        let source = source.canonicalize()?;

        if !source.is_dir() {
            return Err(ArchiverError::NotADirectory(source));
        }

        let file = File::create(&destination)?;
        let skip = destination.canonicalize()?;

        build_zip_archive(file, &source, &skip)?.sync_all()?;

        debug!(destination = %destination.display(), "archive written");

        Ok(destination)
    })
    .await?
}

/// Write contents of the `source` directory into the provided `file`.
///
/// Entry names are relative to `source`, so the archive has no wrapping root folder.
/// The entry located at `skip` is left out, which allows the archive to be placed
/// inside of the directory it is built from.
fn build_zip_archive<W: Write + Seek>(
    file: W,
    source: &Path,
    skip: &Path,
) -> Result<W, ArchiverError> {
    let mut writer = ZipWriter::new(file);

    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;

        if entry.path() == skip {
            continue;
        }

        let Some(name) = entry_name(entry.path().strip_prefix(source)?) else {
            warn!(
                "File {} contains non-unicode symbols in path",
                entry.path().display()
            );
            continue;
        };

        if !name.is_empty() {
            if entry.file_type().is_dir() {
                writer.add_directory(name, options)?;
            } else if entry.file_type().is_file() {
                writer.start_file(name, options)?;
                io::copy(&mut File::open(entry.path())?, &mut writer)?;
            }
        }
    }

    Ok(writer.finish()?)
}

/// Convert a relative path into a ZIP entry name with `/` separators.
///
/// Returns [`None`] if any of the path components is not valid UTF-8.
fn entry_name(relative: &Path) -> Option<String> {
    let mut segments = Vec::new();

    for component in relative.components() {
        if let Component::Normal(segment) = component {
            segments.push(segment.to_str()?);
        }
    }

    Some(segments.join("/"))
}
