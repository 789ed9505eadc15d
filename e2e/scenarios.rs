//! E2E Test Suite: COWOLF end-to-end scenarios
//!
//! Validates the full datamap lifecycle and scatter-gather read against
//! real temp-directory branch layouts, standing in for a two-branch union
//! filesystem mount. Corresponds to `cowolf_create_datamap` /
//! `cowolf_open` / `cowolf_read` / `cowolf_write` in the original cowolf.c.

use cowolf::{create_datamap, open, read, write, BranchConfig, CowolfConfig, StdMetaPathProvider};
use std::fs;
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileExt;
use std::path::Path;
use tempfile::TempDir;

struct Branches {
    upper: TempDir,
    lower: TempDir,
}

fn setup(lower_fill: u8, lower_size: usize) -> (Branches, CowolfConfig) {
    let upper = TempDir::new().unwrap();
    let lower = TempDir::new().unwrap();
    fs::write(lower.path().join("file.bin"), vec![lower_fill; lower_size]).unwrap();
    let cfg = CowolfConfig::new(
        vec![
            BranchConfig::new(upper.path()),
            BranchConfig::new(lower.path()),
        ],
        0,
    );
    (Branches { upper, lower }, cfg)
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: Pure passthrough — no datamap present on the upper branch.
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_pure_passthrough() {
    let (b, cfg) = setup(b'L', 1000);
    let upper_path = b.upper.path().join("file.bin");
    fs::write(&upper_path, vec![b'U'; 1000]).unwrap();

    let handle = open(&cfg, Path::new("/file.bin"), 0, 0).unwrap();
    assert!(!handle.is_sparse());
    // caller reads directly from the upper file; cowolf is not consulted.
    let data = fs::read(&upper_path).unwrap();
    assert!(data.iter().all(|&x| x == b'U'));
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: Full lower fallthrough — datamap present but empty (no writes yet).
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_full_lower_fallthrough() {
    let (b, cfg) = setup(b'L', 1000);
    let meta = StdMetaPathProvider;
    let upper_path = b.upper.path().join("file.bin");
    let upper_file = fs::File::create(&upper_path).unwrap();
    upper_file.set_len(1000).unwrap();

    create_datamap(&cfg, Path::new("/file.bin"), 0, 1000, &meta).unwrap();
    let handle = open(&cfg, Path::new("/file.bin"), 0, 0).unwrap();
    assert!(handle.is_sparse());

    let mut buf = vec![0u8; 1000];
    let n = read(upper_file.as_raw_fd(), &handle, &mut buf, 0).unwrap();
    assert_eq!(n, 1000);
    assert!(buf.iter().all(|&b| b == b'L'));
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: Mid-file overwrite — a single localized write splits the read
// between lower and upper.
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_mid_file_overwrite() {
    let (b, cfg) = setup(b'L', 1000);
    let meta = StdMetaPathProvider;
    let upper_path = b.upper.path().join("file.bin");
    let upper_file = fs::File::create(&upper_path).unwrap();
    upper_file.set_len(1000).unwrap();
    create_datamap(&cfg, Path::new("/file.bin"), 0, 1000, &meta).unwrap();

    let handle = open(&cfg, Path::new("/file.bin"), 0, 0).unwrap();
    upper_file.write_all_at(&vec![b'U'; 100], 300).unwrap();
    write(&handle, 300, 100).unwrap();

    let mut buf = vec![0u8; 500];
    let n = read(upper_file.as_raw_fd(), &handle, &mut buf, 200).unwrap();
    assert_eq!(n, 500);
    assert!(buf[0..100].iter().all(|&b| b == b'L')); // 200..300
    assert!(buf[100..200].iter().all(|&b| b == b'U')); // 300..400
    assert!(buf[200..500].iter().all(|&b| b == b'L')); // 400..700
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: Adjacent-write merging — a second write touching the boundary of
// the first merges into a single datamap record.
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_adjacent_write_merging() {
    let (b, cfg) = setup(b'L', 1000);
    let meta = StdMetaPathProvider;
    let upper_path = b.upper.path().join("file.bin");
    let upper_file = fs::File::create(&upper_path).unwrap();
    upper_file.set_len(1000).unwrap();
    create_datamap(&cfg, Path::new("/file.bin"), 0, 1000, &meta).unwrap();

    let handle = open(&cfg, Path::new("/file.bin"), 0, 0).unwrap();
    upper_file.write_all_at(&vec![b'U'; 100], 300).unwrap();
    write(&handle, 300, 100).unwrap();
    upper_file.write_all_at(&vec![b'U'; 50], 400).unwrap();
    write(&handle, 400, 50).unwrap();

    let mut buf = vec![0u8; 200];
    let n = read(upper_file.as_raw_fd(), &handle, &mut buf, 300).unwrap();
    assert_eq!(n, 200);
    assert!(buf.iter().all(|&b| b == b'U')); // 300..450 fully merged and authoritative
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: Growth past EOF — a write beyond the original size is entirely
// served from the upper branch via the sentinel record.
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_growth_past_eof() {
    let (b, cfg) = setup(b'L', 1000);
    let meta = StdMetaPathProvider;
    let upper_path = b.upper.path().join("file.bin");
    let upper_file = fs::File::create(&upper_path).unwrap();
    upper_file.set_len(1000).unwrap();
    create_datamap(&cfg, Path::new("/file.bin"), 0, 1000, &meta).unwrap();

    let handle = open(&cfg, Path::new("/file.bin"), 0, 0).unwrap();
    upper_file.set_len(2100).unwrap();
    upper_file.write_all_at(&vec![b'U'; 100], 2000).unwrap();
    write(&handle, 2000, 100).unwrap();

    let mut buf = vec![0u8; 200];
    let n = read(upper_file.as_raw_fd(), &handle, &mut buf, 1900).unwrap();
    assert_eq!(n, 200);
    // 1900..2000 is a hole past the old EOF, served from upper (zero-filled).
    assert!(buf[0..100].iter().all(|&b| b == 0));
    assert!(buf[100..200].iter().all(|&b| b == b'U'));
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 6: Truncate then regrow — after truncating the datamap, later reads
// past the new EOF come from the upper branch, not the lower.
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_truncate_then_regrow() {
    let (b, cfg) = setup(b'L', 1000);
    let meta = StdMetaPathProvider;
    let upper_path = b.upper.path().join("file.bin");
    let upper_file = fs::File::create(&upper_path).unwrap();
    upper_file.set_len(1000).unwrap();
    create_datamap(&cfg, Path::new("/file.bin"), 0, 1000, &meta).unwrap();

    cowolf::truncate_datamap(&cfg, Path::new("/file.bin"), 0, 400).unwrap();

    upper_file.set_len(3000).unwrap();
    upper_file.write_all_at(&vec![b'U'; 100], 600).unwrap();
    write(&cowolf::open(&cfg, Path::new("/file.bin"), 0, 0).unwrap(), 600, 100).unwrap();

    let handle = open(&cfg, Path::new("/file.bin"), 0, 0).unwrap();
    let mut buf = vec![0u8; 100];
    let n = read(upper_file.as_raw_fd(), &handle, &mut buf, 600).unwrap();
    assert_eq!(n, 100);
    assert!(buf.iter().all(|&b| b == b'U'));
}
