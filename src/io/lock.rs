use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Lock file created inside a store directory
pub const LOCK_FILE: &str = ".lock";

/// Pause between attempts while another writer holds the lock
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Exclusive writer lock on one store directory, held until dropped.
///
/// Backed by `flock` on Unix. The lock file itself is left in place: every
/// process must lock the same inode, so it is never unlinked.
pub struct StoreLock {
    _file: File,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("store at {dir} stayed locked for {waited:?}; is another tasky writing?")]
    Timeout { dir: PathBuf, waited: Duration },
}

impl StoreLock {
    /// Take the lock on `dir`, retrying until `timeout` has passed.
    pub fn acquire(dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::CreateError { path, source: e })?;

        let start = Instant::now();
        while !try_lock(&file) {
            let waited = start.elapsed();
            if waited >= timeout {
                tracing::debug!(dir = %dir.display(), ?waited, "store lock timed out");
                return Err(LockError::Timeout {
                    dir: dir.to_path_buf(),
                    waited,
                });
            }
            std::thread::sleep(RETRY_INTERVAL);
        }
        Ok(StoreLock { _file: file })
    }
}

/// One non-blocking attempt at an exclusive lock. Closing the file releases it.
#[cfg(unix)]
fn try_lock(file: &File) -> bool {
    use std::os::unix::io::AsRawFd;
    unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) == 0 }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> bool {
    true
}
