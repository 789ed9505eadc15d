//! E2E Test Suite: datamap lifecycle — create, rename, truncate, destroy,
//! and corruption detection across real temp-directory branch layouts.

use cowolf::{
    create_datamap, destroy_datamap, has_datamap, rename_datamap, truncate_datamap, BranchConfig,
    CowolfConfig, DrmFile, StdMetaPathProvider,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cfg(upper: &TempDir, lower: &TempDir, threshold: u64) -> CowolfConfig {
    CowolfConfig::new(
        vec![
            BranchConfig::new(upper.path()),
            BranchConfig::new(lower.path()),
        ],
        threshold,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: rename carries the datamap and link, preserving the link target.
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_rename_datamap_preserves_link_target() {
    let upper = TempDir::new().unwrap();
    let lower = TempDir::new().unwrap();
    let cfg = cfg(&upper, &lower, 0);
    let meta = StdMetaPathProvider;

    create_datamap(&cfg, Path::new("/old.bin"), 0, 1000, &meta).unwrap();
    rename_datamap(&cfg, Path::new("/old.bin"), Path::new("/new.bin"), 0, &meta).unwrap();

    assert!(!has_datamap(&cfg, Path::new("/old.bin"), 0).unwrap());
    assert!(has_datamap(&cfg, Path::new("/new.bin"), 0).unwrap());

    let (_, link_path) =
        cowolf::facade::paths::build_cowolf_paths(upper.path(), Path::new("/new.bin")).unwrap();
    let target = fs::read_link(&link_path).unwrap();
    assert_eq!(target, Path::new("/old.bin"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: rename of a path with no datamap is a no-op, not an error.
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_rename_without_datamap_is_noop() {
    let upper = TempDir::new().unwrap();
    let lower = TempDir::new().unwrap();
    let cfg = cfg(&upper, &lower, 0);
    let meta = StdMetaPathProvider;
    rename_datamap(&cfg, Path::new("/a.bin"), Path::new("/b.bin"), 0, &meta).unwrap();
    assert!(!has_datamap(&cfg, Path::new("/b.bin"), 0).unwrap());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: truncate without a datamap is a no-op.
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_truncate_without_datamap_is_noop() {
    let upper = TempDir::new().unwrap();
    let lower = TempDir::new().unwrap();
    let cfg = cfg(&upper, &lower, 0);
    assert!(truncate_datamap(&cfg, Path::new("/a.bin"), 0, 10).is_ok());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: destroy is best-effort — it removes both files even if the link
// was already gone.
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_destroy_is_best_effort() {
    let upper = TempDir::new().unwrap();
    let lower = TempDir::new().unwrap();
    let cfg = cfg(&upper, &lower, 0);
    let meta = StdMetaPathProvider;

    create_datamap(&cfg, Path::new("/a.bin"), 0, 1000, &meta).unwrap();
    let (_, link_path) =
        cowolf::facade::paths::build_cowolf_paths(upper.path(), Path::new("/a.bin")).unwrap();
    fs::remove_file(&link_path).unwrap(); // simulate the link already missing

    destroy_datamap(&cfg, Path::new("/a.bin"), 0).unwrap();
    assert!(!has_datamap(&cfg, Path::new("/a.bin"), 0).unwrap());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: a hand-corrupted datamap file is detected on load, not silently
// accepted.
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_corrupted_datamap_detected() {
    let upper = TempDir::new().unwrap();
    let lower = TempDir::new().unwrap();
    let cfg = cfg(&upper, &lower, 0);
    let meta = StdMetaPathProvider;

    create_datamap(&cfg, Path::new("/a.bin"), 0, 1000, &meta).unwrap();
    let (drm_path, _) =
        cowolf::facade::paths::build_cowolf_paths(upper.path(), Path::new("/a.bin")).unwrap();
    // truncate the file mid-record: 16-byte records, leave a partial tail.
    let mut data = fs::read(&drm_path).unwrap();
    data.push(0);
    fs::write(&drm_path, &data).unwrap();

    let drm = DrmFile::open(&drm_path).unwrap();
    assert!(drm.get_entries(0, 10).is_err());
}
