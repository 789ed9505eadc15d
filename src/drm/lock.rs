//! Advisory whole-file locking for the DRM Store.
//!
//! Equivalent to `file_lock` / `file_unlock` (drm_file.c). Every mutating
//! DRM operation acquires an exclusive `F_SETLKW` lock before load and
//! releases it after save; `FileLock` wraps that discipline in a `Drop`
//! guard so a `?`-propagated error mid-operation still unlocks, which the
//! original C's manual `goto err_out; file_unlock(...)` path had to do by
//! hand at every call site.

use std::io;
use std::os::unix::io::RawFd;

use super::error::DrmError;

fn whole_file_flock(lock_type: libc::c_short) -> libc::flock {
    // SAFETY: libc::flock is a plain-old-data struct; zero-initializing then
    // overwriting every field below is sound for all platform layouts.
    let mut fl: libc::flock = unsafe { std::mem::zeroed() };
    fl.l_type = lock_type;
    fl.l_whence = libc::SEEK_SET as libc::c_short;
    fl.l_start = 0;
    fl.l_len = 0;
    fl.l_pid = 0;
    fl
}

fn fcntl_lock(fd: RawFd, lock_type: libc::c_short) -> io::Result<()> {
    let mut fl = whole_file_flock(lock_type);
    let rc = unsafe { libc::fcntl(fd, libc::F_SETLKW, &mut fl as *mut libc::flock) };
    if rc == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// RAII guard holding an exclusive whole-file lock on `fd` for its lifetime.
pub struct FileLock {
    fd: RawFd,
}

impl FileLock {
    /// Blocks until an exclusive lock on `fd` is acquired.
    pub fn acquire(fd: RawFd) -> Result<Self, DrmError> {
        fcntl_lock(fd, libc::F_WRLCK as libc::c_short).map_err(DrmError::from_io)?;
        Ok(FileLock { fd })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = fcntl_lock(self.fd, libc::F_UNLCK as libc::c_short) {
            log::warn!(target: "cowolf::drm", "failed to release DRM lock on fd {}: {e}", self.fd);
        }
    }
}
