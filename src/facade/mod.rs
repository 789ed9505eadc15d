//! The COWOLF Facade: per-file datamap lifecycle, sparse/passthrough
//! decision on open, and the scatter-gather read.
//!
//! Ported from cowolf.c.

pub mod error;
pub mod paths;

use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::sys::uio::pread;

use crate::config::CowolfConfig;
use crate::drm::DrmFile;
pub use error::CowolfError;
use paths::build_cowolf_paths;

/// Ensures the metadata directory holding a DRM/link file exists.
///
/// A seam (rather than a hardcoded `std::fs::create_dir_all` call site)
/// so callers embedding this crate in a larger union filesystem can supply
/// their own directory-creation policy (permissions, ownership) while the
/// default matches the original `create_metapath` behavior.
pub trait MetaPathProvider {
    fn ensure_metapath(&self, drm_or_link_path: &Path) -> io::Result<()>;
}

pub struct StdMetaPathProvider;

impl MetaPathProvider for StdMetaPathProvider {
    fn ensure_metapath(&self, drm_or_link_path: &Path) -> io::Result<()> {
        if let Some(parent) = paths::metadir_of(drm_or_link_path) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// Per-file state produced by `open`.
///
/// `cwf_on` is true iff the upper file is sparse and governed by a DRM; in
/// that case `lower_fd`/`drmap_fd` are valid and owned exclusively by this
/// handle. Both descriptors close best-effort on `Drop`.
pub struct CowolfHandle {
    cwf_on: bool,
    lower_fd: Option<OwnedFd>,
    drmap_fd: Option<DrmFile>,
}

impl CowolfHandle {
    fn passthrough() -> Self {
        CowolfHandle {
            cwf_on: false,
            lower_fd: None,
            drmap_fd: None,
        }
    }

    pub fn is_sparse(&self) -> bool {
        self.cwf_on
    }

    /// Explicit close that surfaces failures, consuming the handle.
    /// `Drop` performs the same best-effort close if this is never called.
    pub fn close(mut self) -> Result<(), CowolfError> {
        self.close_inner()
    }

    fn close_inner(&mut self) -> Result<(), CowolfError> {
        if !self.cwf_on {
            return Ok(());
        }
        self.drmap_fd.take();
        if let Some(fd) = self.lower_fd.take() {
            drop(fd);
        }
        Ok(())
    }
}

impl Drop for CowolfHandle {
    fn drop(&mut self) {
        if let Err(e) = self.close_inner() {
            log::warn!(target: "cowolf::facade", "error closing cowolf handle: {e}");
        }
    }
}

/// Equivalent to `has_datamap`: does a DRM file already exist for `path`
/// on `branch`?
pub fn has_datamap(cfg: &CowolfConfig, path: &Path, branch: usize) -> Result<bool, CowolfError> {
    let (drm_path, _) = build_cowolf_paths(&cfg.branches[branch].path, path)?;
    Ok(drm_path.exists())
}

/// Creates a datamap for `path` on `branch`, if the file is COWOLF-eligible.
///
/// Returns `Ok(false)` without side effects when not eligible (not an
/// error — mirrors the original `-1`-vs-`0` distinction without conflating
/// "feature off" with a real failure). Equivalent to `cowolf_create_datamap`.
pub fn create_datamap(
    cfg: &CowolfConfig,
    path: &Path,
    branch: usize,
    file_size: u64,
    meta: &dyn MetaPathProvider,
) -> Result<bool, CowolfError> {
    if !cfg.is_eligible(file_size) {
        return Ok(false);
    }
    let (drm_path, link_path) = build_cowolf_paths(&cfg.branches[branch].path, path)?;
    meta.ensure_metapath(&drm_path)?;
    DrmFile::create(&drm_path, file_size)?;

    let _ = std::fs::remove_file(&link_path);
    std::os::unix::fs::symlink(path, &link_path)?;
    Ok(true)
}

/// Removes the datamap for `path` on `branch`, if one exists. No-op success
/// if it does not. Best-effort: both the DRM and the link are attempted
/// regardless of whether the first attempt failed. Equivalent to
/// `cowolf_destroy_datamap`.
pub fn destroy_datamap(cfg: &CowolfConfig, path: &Path, branch: usize) -> Result<(), CowolfError> {
    let (drm_path, link_path) = build_cowolf_paths(&cfg.branches[branch].path, path)?;
    if !drm_path.exists() {
        return Ok(());
    }
    let drm_result = DrmFile::destroy(&drm_path);
    let link_result = match std::fs::remove_file(&link_path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    };
    drm_result?;
    link_result?;
    Ok(())
}

/// Renames the datamap from `old` to `new` on `branch`. The link's target
/// (the lower-branch original path) is unchanged. Equivalent to
/// `cowolf_rename_datamap`.
pub fn rename_datamap(
    cfg: &CowolfConfig,
    old: &Path,
    new: &Path,
    branch: usize,
    meta: &dyn MetaPathProvider,
) -> Result<(), CowolfError> {
    let (old_drm, old_link) = build_cowolf_paths(&cfg.branches[branch].path, old)?;
    if !old_drm.exists() {
        return Ok(());
    }
    let (new_drm, new_link) = build_cowolf_paths(&cfg.branches[branch].path, new)?;
    meta.ensure_metapath(&new_drm)?;
    DrmFile::rename(&old_drm, &new_drm)?;
    DrmFile::rename(&old_link, &new_link)?;
    Ok(())
}

/// Truncates the datamap for `path` on `branch` to `new_size`. No-op
/// success if no datamap exists. Equivalent to `cowolf_truncate_datamap`.
pub fn truncate_datamap(
    cfg: &CowolfConfig,
    path: &Path,
    branch: usize,
    new_size: u64,
) -> Result<(), CowolfError> {
    let (drm_path, _) = build_cowolf_paths(&cfg.branches[branch].path, path)?;
    if !drm_path.exists() {
        return Ok(());
    }
    let drm = DrmFile::open(&drm_path)?;
    drm.trunc(new_size)?;
    Ok(())
}

/// Opens `path` on `branch`, deciding whether it is sparse (COWOLF-backed)
/// or a full passthrough file. Equivalent to `cowolf_open`.
///
/// On the lower branch, a pre-existing DRM is treated as corruption (stale
/// state from an incompatible prior mount) and rejected with an I/O error.
/// On the upper branch, a missing DRM means ordinary passthrough; any other
/// DRM-open failure propagates; a present DRM means the file is sparse and
/// its lower-branch counterpart is opened via the recovered symlink target.
pub fn open(
    cfg: &CowolfConfig,
    path: &Path,
    branch: usize,
    flags: i32,
) -> Result<CowolfHandle, CowolfError> {
    let (drm_path, link_path) = build_cowolf_paths(&cfg.branches[branch].path, path)?;

    if branch > 0 {
        if drm_path.exists() {
            log::error!(
                target: "cowolf::facade",
                "stale datamap found on lower branch for {}",
                path.display()
            );
            return Err(CowolfError::Io(io::Error::new(
                io::ErrorKind::Other,
                "stale datamap on lower branch",
            )));
        }
        return Ok(CowolfHandle::passthrough());
    }

    let drm = match DrmFile::open(&drm_path) {
        Ok(drm) => drm,
        Err(crate::drm::DrmError::NotFound) => return Ok(CowolfHandle::passthrough()),
        Err(e) => return Err(e.into()),
    };

    let lower_name = std::fs::read_link(&link_path)?;
    let lower_path: PathBuf = cfg.lower().path.join(strip_root(&lower_name));

    let lower_file = OpenOptions::new()
        .read(true)
        .custom_flags(flags)
        .open(&lower_path)?;

    log::debug!(target: "cowolf::facade", "{} opened as sparse, lower={}", path.display(), lower_path.display());

    Ok(CowolfHandle {
        cwf_on: true,
        lower_fd: Some(lower_file.into()),
        drmap_fd: Some(drm),
    })
}

fn strip_root(p: &Path) -> &Path {
    p.strip_prefix("/").unwrap_or(p)
}

/// Records `[offset, offset+len-1]` as authoritative on the upper branch.
/// Does not touch file data; the caller performs the data `pwrite` itself
/// before calling this. Equivalent to `cowolf_write`.
pub fn write(handle: &CowolfHandle, offset: u64, len: u64) -> Result<(), CowolfError> {
    match &handle.drmap_fd {
        Some(drm) => Ok(drm.add_entry(offset, len)?),
        None => Ok(()),
    }
}

/// Scatter-gather read: services `[offset, offset+size-1]` by alternating
/// `pread`s across the lower file (holes) and the upper file (mapped
/// ranges), driven by the DRM as a routing table. Equivalent to
/// `cowolf_read`.
///
/// Returns the number of bytes transferred. A short read from either
/// backing file stops the loop and returns the partial count as `Ok`,
/// matching the original's "return bytes transferred so far" convention;
/// only a hard syscall failure before any bytes are transferred at the
/// failing offset surfaces as `Err`.
pub fn read(
    upper_fd: RawFd,
    handle: &CowolfHandle,
    buf: &mut [u8],
    offset: u64,
) -> Result<usize, CowolfError> {
    let size = buf.len() as u64;
    let drm = match &handle.drmap_fd {
        Some(drm) => drm,
        None => return Err(CowolfError::Io(io::Error::new(io::ErrorKind::Other, "handle is not sparse"))),
    };
    let lower_fd = handle.lower_fd.as_ref().expect("sparse handle always owns a lower fd");

    let entries = drm.get_entries(offset, size)?;

    let upper: BorrowedFd = unsafe { BorrowedFd::borrow_raw(upper_fd) };
    let lower: BorrowedFd = lower_fd.as_fd();

    let mut start = offset;
    let mut remain = size;
    let mut m = 0usize;

    while remain > 0 {
        let (lower_sz, upper_sz) = match entries.get(m) {
            Some(e) => (e.offset - start, e.len),
            None => (remain, 0u64),
        };

        if lower_sz > 0 {
            let buf_off = (size - remain) as usize;
            let want = lower_sz as usize;
            let n = read_at(lower, &mut buf[buf_off..buf_off + want], start)?;
            start += n as u64;
            remain -= n as u64;
            if (n as u64) < lower_sz {
                // short read from the lower branch; stop and report what we have.
                return Ok((size - remain) as usize);
            }
        }

        if upper_sz > 0 {
            let buf_off = (size - remain) as usize;
            let want = upper_sz as usize;
            let n = read_at(upper, &mut buf[buf_off..buf_off + want], start)?;
            start += n as u64;
            remain -= n as u64;
            if (n as u64) < upper_sz {
                return Ok((size - remain) as usize);
            }
        }

        m += 1;
    }

    Ok((size - remain) as usize)
}

fn read_at(fd: BorrowedFd, buf: &mut [u8], offset: u64) -> Result<usize, CowolfError> {
    pread(fd, buf, offset as i64).map_err(|errno| {
        CowolfError::Io(io::Error::from_raw_os_error(errno as i32))
    })
}
