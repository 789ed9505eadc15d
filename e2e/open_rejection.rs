//! E2E Test: datamap found on lower branch is rejected at open.
//!
//! A DRM file on the lower (read-only) branch can only be stale state left
//! behind by an incompatible prior mount (e.g. the branch order changed).
//! `cowolf_open` refuses to proceed rather than silently accepting it.

use cowolf::{create_datamap, open, BranchConfig, CowolfConfig, StdMetaPathProvider};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_stale_lower_branch_datamap_rejected() {
    let upper = TempDir::new().unwrap();
    let lower = TempDir::new().unwrap();
    fs::write(lower.path().join("file.bin"), vec![b'L'; 1000]).unwrap();

    let cfg = CowolfConfig::new(
        vec![
            BranchConfig::new(upper.path()),
            BranchConfig::new(lower.path()),
        ],
        0,
    );
    let meta = StdMetaPathProvider;

    // Plant a datamap directly on the lower branch, simulating leftover
    // state from an incompatible mount.
    create_datamap(&cfg, Path::new("/file.bin"), 1, 1000, &meta).unwrap();

    let result = open(&cfg, Path::new("/file.bin"), 1, 0);
    assert!(result.is_err(), "opening a branch with a stale datamap must fail");
}

#[test]
fn test_lower_branch_without_datamap_opens_passthrough() {
    let upper = TempDir::new().unwrap();
    let lower = TempDir::new().unwrap();
    fs::write(lower.path().join("file.bin"), vec![b'L'; 1000]).unwrap();

    let cfg = CowolfConfig::new(
        vec![
            BranchConfig::new(upper.path()),
            BranchConfig::new(lower.path()),
        ],
        0,
    );

    let handle = open(&cfg, Path::new("/file.bin"), 1, 0).unwrap();
    assert!(!handle.is_sparse());
}
