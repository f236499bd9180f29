use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Sibling path that output is staged into before it replaces `path`.
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Move a fully written staging file over its target.
pub fn commit(staging: &Path, path: &Path) -> io::Result<()> {
    fs::rename(staging, path)?;
    debug!(path = %path.display(), "replaced output file");
    Ok(())
}

/// Remove a staging file after a failed write. A missing file is fine.
pub fn discard(staging: &Path) {
    match fs::remove_file(staging) {
        Ok(()) => debug!(path = %staging.display(), "removed staging file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %staging.display(), error = %e, "failed to remove staging file"),
    }
}

/// Write `contents` to `path` through a staging file, so a crash never
/// leaves a truncated target behind.
pub fn write_replacing(path: &Path, contents: &[u8]) -> io::Result<()> {
    let staging = staging_path(path);
    let result = fs::write(&staging, contents).and_then(|()| commit(&staging, path));
    if result.is_err() {
        discard(&staging);
    }
    result
}
