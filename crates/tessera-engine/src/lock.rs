//! Advisory exclusive lock on an output directory.
//!
//! `store`, `load` and `purge` each hold the lock for their whole duration,
//! so two operations on the same directory (from this or another process)
//! never interleave. The lock is non-blocking: a second holder gets
//! [`EngineError::Locked`] immediately. It is released on drop; the lock file
//! itself stays in the directory.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tessera_types::LOCK_FILE_NAME;
use tracing::debug;

use crate::error::EngineError;

/// Held exclusive lock on an output directory.
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
    #[cfg(unix)]
    _guard: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _guard: File,
}

impl DirLock {
    /// Try to take the lock on `dir`, which must exist.
    pub fn acquire(dir: &Path) -> Result<Self, EngineError> {
        let path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| EngineError::io(&path, e))?;

        let guard = lock_exclusive(file, &path)?;
        debug!(path = %path.display(), "acquired directory lock");
        Ok(Self {
            path,
            _guard: guard,
        })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn lock_exclusive(file: File, path: &Path) -> Result<nix::fcntl::Flock<File>, EngineError> {
    use nix::errno::Errno;
    use nix::fcntl::{Flock, FlockArg};

    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(guard) => Ok(guard),
        Err((_file, Errno::EWOULDBLOCK)) => Err(EngineError::Locked {
            path: path.to_path_buf(),
        }),
        Err((_file, errno)) => Err(EngineError::io(path, std::io::Error::from(errno))),
    }
}

// TODO: use LockFileEx on Windows; until then only the lock file is created.
#[cfg(not(unix))]
fn lock_exclusive(file: File, _path: &Path) -> Result<File, EngineError> {
    Ok(file)
}
