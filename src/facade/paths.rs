//! Path composition for DRM and link files.
//!
//! Equivalent to `build_cowolf_paths` (cowolf.c): for a logical path `P` on
//! branch root `R`, the DRM path is `R/METADIR/P.cowolf.drm` and the link
//! path is `R/METADIR/P.cowolf.lnk`.

use std::path::{Path, PathBuf};

use super::error::CowolfError;

pub const METADIR: &str = ".unionfs-cowolf";
pub const DRMAP_TAG: &str = ".cowolf.drm";
pub const LINK_TAG: &str = ".cowolf.lnk";

/// Maximum composed path length, mirroring POSIX `PATH_MAX`.
pub const PATHLEN_MAX: usize = 4096;

fn compose(branch_root: &Path, logical_path: &Path, tag: &str) -> Result<PathBuf, CowolfError> {
    let relative = logical_path.strip_prefix("/").unwrap_or(logical_path);
    let mut file_name = relative
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    file_name.push(tag);

    let mut out = branch_root.join(METADIR);
    if let Some(parent) = relative.parent() {
        out.push(parent);
    }
    out.push(file_name);

    if out.as_os_str().len() > PATHLEN_MAX {
        return Err(CowolfError::NameTooLong);
    }
    Ok(out)
}

/// Returns `(drm_path, link_path)` for `logical_path` rooted at `branch_root`.
pub fn build_cowolf_paths(
    branch_root: &Path,
    logical_path: &Path,
) -> Result<(PathBuf, PathBuf), CowolfError> {
    let drm = compose(branch_root, logical_path, DRMAP_TAG)?;
    let link = compose(branch_root, logical_path, LINK_TAG)?;
    Ok((drm, link))
}

/// The metadata directory that must exist before a DRM/link file can be
/// created at `drm_or_link_path`.
pub fn metadir_of(path: &Path) -> Option<&Path> {
    path.parent()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_expected_layout() {
        let (drm, link) =
            build_cowolf_paths(Path::new("/upper"), Path::new("/dir/file.bin")).unwrap();
        assert_eq!(
            drm,
            PathBuf::from("/upper/.unionfs-cowolf/dir/file.bin.cowolf.drm")
        );
        assert_eq!(
            link,
            PathBuf::from("/upper/.unionfs-cowolf/dir/file.bin.cowolf.lnk")
        );
    }

    #[test]
    fn rejects_path_too_long() {
        let huge = "a".repeat(PATHLEN_MAX);
        let logical = PathBuf::from("/").join(huge);
        let result = build_cowolf_paths(Path::new("/upper"), &logical);
        assert!(matches!(result, Err(CowolfError::NameTooLong)));
    }
}
