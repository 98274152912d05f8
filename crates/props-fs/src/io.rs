//! Atomic file I/O for properties files

use fs2::FileExt;
use props_core::{Encoding, Properties, WriteOptions};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::{Error, Result};

/// Write content atomically to a file with locking.
///
/// Every call writes its own uniquely named temp file in the target
/// directory, holds an exclusive advisory lock on it while writing, then
/// renames it over `path`. Concurrent writers of the same path each land a
/// complete file; the last rename wins. The temp file is removed on failure.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            parent
        }
        None => Path::new("."),
    };

    let prefix = format!(
        ".{}.",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default()
    );
    let mut temp_file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| Error::io(parent, e))?;

    if temp_file.as_file().lock_exclusive().is_err() {
        tracing::warn!(path = %path.display(), "Could not lock temp file");
        return Err(Error::LockFailed {
            path: path.to_path_buf(),
        });
    }

    temp_file
        .write_all(content)
        .and_then(|()| temp_file.as_file().sync_all())
        .map_err(|e| Error::io(temp_file.path(), e))?;

    FileExt::unlock(temp_file.as_file()).map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    temp_file.persist(path).map_err(|e| {
        tracing::warn!(from = %e.file.path().display(), to = %path.display(), "Rename failed");
        Error::io(path, e.error)
    })?;

    tracing::debug!(path = %path.display(), "Wrote file atomically");
    Ok(())
}

/// Load a properties file into a new store.
pub fn load_file(path: &Path, encoding: Encoding) -> Result<Properties> {
    let mut props = Properties::new();
    load_into(path, encoding, &mut props)?;
    Ok(props)
}

/// Load a properties file on top of an existing store.
///
/// Entries committed before a parse error stay in `props`.
pub fn load_into(path: &Path, encoding: Encoding, props: &mut Properties) -> Result<()> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    props
        .load_with_encoding(file, encoding)
        .map_err(|e| Error::from_core(path, e))?;
    tracing::debug!(path = %path.display(), entries = props.len(), "Loaded properties file");
    Ok(())
}

/// Load a file layered over `defaults`, falling back to the defaults alone
/// when the file does not exist.
pub fn load_file_or_defaults(
    path: &Path,
    encoding: Encoding,
    defaults: &Properties,
) -> Result<Properties> {
    let mut props = Properties::with_defaults(defaults);
    match load_into(path, encoding, &mut props) {
        Err(Error::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No properties file, using defaults");
            Ok(props)
        }
        other => other.map(|()| props),
    }
}

/// Store the local entries of `props` to `path` atomically.
pub fn save_file(
    path: &Path,
    props: &Properties,
    comments: Option<&str>,
    options: WriteOptions,
) -> Result<()> {
    let mut content = Vec::new();
    props
        .store_with_options(&mut content, comments, options)
        .map_err(|e| Error::from_core(path, e))?;
    write_atomic(path, &content)?;
    tracing::debug!(path = %path.display(), entries = props.len(), "Saved properties file");
    Ok(())
}
