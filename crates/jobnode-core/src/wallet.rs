//! Quarantine of compromised credential files.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

pub const QUARANTINE_SUFFIX: &str = ".compromised";

/// `path` with [`QUARANTINE_SUFFIX`] appended to its full file name.
pub fn quarantine_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(QUARANTINE_SUFFIX);
    PathBuf::from(name)
}

/// Rename a compromised credential file in place. The file is never deleted.
pub fn quarantine(path: &Path) -> io::Result<PathBuf> {
    let target = quarantine_path(path);
    std::fs::rename(path, &target)?;
    warn!(
        path = %path.display(),
        quarantined = %target.display(),
        "compromised wallet quarantined"
    );
    Ok(target)
}
