//! Atomic output.
//!
//! Writers never create their destination directly: bytes go to a sibling
//! `<name>.tmp` file which is then renamed into place, so the destination is
//! either absent, the old file, or the complete new file.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::WriteOptions;
use crate::error::{Error, Result};

/// The staging path used for `path`: the same name with `.tmp` appended.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Fail when `path` exists and overwriting was not requested.
///
/// Checked in simulate mode too, so a simulated run reports the same
/// configuration errors as a real one.
pub fn check_destination(path: &Path, options: &WriteOptions) -> Result<()> {
    if !options.overwrite && path.exists() {
        return Err(Error::Configuration(format!(
            "destination '{}' exists; pass overwrite to replace it",
            path.display()
        )));
    }
    Ok(())
}

/// Write `bytes` to `path` atomically, honouring `options`.
///
/// Returns `false` when the write was skipped by simulate mode.
pub fn write_atomic(path: &Path, bytes: &[u8], options: &WriteOptions) -> Result<bool> {
    check_destination(path, options)?;
    if options.simulate {
        tracing::info!(path = %path.display(), bytes = bytes.len(), "simulate: skipped write");
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let staging = temp_path(path);
    fs::write(&staging, bytes)?;
    fs::rename(&staging, path)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
    Ok(true)
}

/// Like [`write_atomic`], but the caller fills the staging file.
///
/// Used for archives, which are written through a seekable handle.
pub fn write_atomic_with<F>(path: &Path, options: &WriteOptions, fill: F) -> Result<bool>
where
    F: FnOnce(&mut fs::File) -> Result<()>,
{
    check_destination(path, options)?;
    if options.simulate {
        tracing::info!(path = %path.display(), "simulate: skipped write");
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let staging = temp_path(path);
    let mut file = fs::File::create(&staging)?;
    fill(&mut file)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&staging, path)?;
    tracing::debug!(path = %path.display(), "wrote file");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_temp_path_is_sibling() {
        assert_eq!(
            temp_path(Path::new("out/book.epub")),
            PathBuf::from("out/book.epub.tmp")
        );
    }

    #[test]
    fn test_write_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");

        assert!(write_atomic(&path, b"one", &WriteOptions::default()).unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"one");
        assert!(!temp_path(&path).exists());

        let err = write_atomic(&path, b"two", &WriteOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(fs::read(&path).unwrap(), b"one");

        write_atomic(&path, b"two", &WriteOptions::overwrite()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
    }

    #[test]
    fn test_simulate_skips_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("a.md");
        assert!(!write_atomic(&path, b"x", &WriteOptions::simulate()).unwrap());
        assert!(!path.exists());
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_write_with_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.bin");
        write_atomic_with(&path, &WriteOptions::default(), |file| {
            file.write_all(b"payload")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"payload");
    }
}
