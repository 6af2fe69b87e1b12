use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Marker file held for the duration of one tick.
///
/// Created with exclusive-create semantics so two processes cannot both
/// hold it. The file is removed when the guard drops, which also covers
/// early returns and unwinding out of a tick.
#[derive(Debug)]
pub struct TickLock {
    path: PathBuf,
}

impl TickLock {
    /// `Ok(None)` when another holder already owns the lock. Other I/O
    /// failures are returned as errors.
    pub fn acquire(path: &Path) -> io::Result<Option<Self>> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(e),
        };

        let lock = Self {
            path: path.to_path_buf(),
        };
        // PID is informational; a failed write still leaves us the owner
        if let Err(e) = write!(file, "{}", std::process::id()) {
            warn!(path = %path.display(), error = %e, "Failed to write pid into lock file");
        }
        debug!(path = %path.display(), "Lock acquired");
        Ok(Some(lock))
    }
}

impl Drop for TickLock {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Lock released"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove lock file"),
        }
    }
}

/// Log a lock left behind by a previous process. It is not removed; the
/// operator decides whether it is stale.
pub fn warn_if_stale(path: &Path) {
    if let Ok(pid) = std::fs::read_to_string(path) {
        warn!(
            path = %path.display(),
            pid = pid.trim(),
            "Lock file already present at startup; ticks will be skipped until it is removed"
        );
    }
}
