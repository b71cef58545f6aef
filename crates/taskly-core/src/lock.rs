//! Advisory lock guarding read-modify-write cycles on the timeline document.
//!
//! Both the foreground CLI and the detached heartbeat take this lock before they
//! load, mutate and save `timeline.json`. The OS drops the lock when the holder
//! exits or is killed, so a terminated heartbeat can never leave it held.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use fs2::FileExt;

#[derive(Debug)]
pub struct StateLock {
    file: File,
}

impl StateLock {
    /// Block until the exclusive lock on `path` is held.
    pub fn acquire(path: &Path) -> io::Result<Self> {
        crate::storage::ensure_parent_dir(path)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
