//! Disk persistence for snapshots.
//!
//! Writes go to a uniquely named temporary file next to the target, are
//! fsynced, then renamed over the target, so a crash never leaves a
//! half-written snapshot under the real name. Missing parent directories are
//! not created.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Directory that holds `path`. A bare file name lives in the working directory.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Atomically replaces `path` with `bytes`.
///
/// Each call writes its own uniquely named temp file in the target
/// directory, so concurrent writers never share a temp file. The directory
/// is fsynced after the rename on unix.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if path.file_name().is_none() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("snapshot path {:?} has no file name", path),
        ));
    }
    let dir = parent_dir(path);

    // Dropping the temp file on any error below removes it.
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))?;
    }
    tmp.persist(path).map_err(|e| e.error)?;

    #[cfg(unix)]
    {
        fs::File::open(dir)?.sync_all()?;
    }

    tracing::info!("Saved snapshot {:?} ({} bytes)", path, bytes.len());
    Ok(())
}

/// Reads a whole snapshot file.
pub fn read_snapshot(path: &Path) -> io::Result<Vec<u8>> {
    let raw = fs::read(path)?;
    tracing::debug!("Read snapshot {:?} ({} bytes)", path, raw.len());
    Ok(raw)
}
