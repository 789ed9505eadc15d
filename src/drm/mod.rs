//! DRM Store: file-level persistence of a range array with advisory locking.
//!
//! Ported from drm_file.c. On-disk format: a sequence of fixed-size
//! records, two little-endian `u64`s each (`off_start`, `off_end`); file
//! length is always an exact multiple of the record size; the final record
//! is always a sentinel (`off_end == u64::MAX`).
//!
//! Every mutating operation follows: acquire lock -> load -> mutate in
//! memory -> save (overwrite + truncate) -> release lock.

pub mod error;
mod lock;

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use crate::range::{self, Record, Span};
pub use error::DrmError;
use lock::FileLock;

const RECORD_SIZE: usize = 16;

/// A caller-facing, query-clipped entry returned by `get_entries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrmEntry {
    pub offset: u64,
    pub len: u64,
}

fn encode(recs: &[Record]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(recs.len() * RECORD_SIZE);
    for r in recs {
        buf.extend_from_slice(&r.off_start.to_le_bytes());
        buf.extend_from_slice(&r.off_end.to_le_bytes());
    }
    buf
}

fn decode(buf: &[u8]) -> Result<Vec<Record>, DrmError> {
    if buf.is_empty() || buf.len() % RECORD_SIZE != 0 {
        return Err(DrmError::Corruption);
    }
    let mut recs = Vec::with_capacity(buf.len() / RECORD_SIZE + 1);
    for chunk in buf.chunks_exact(RECORD_SIZE) {
        let off_start = u64::from_le_bytes(chunk[0..8].try_into().unwrap());
        let off_end = u64::from_le_bytes(chunk[8..16].try_into().unwrap());
        recs.push(Record::new(off_start, off_end));
    }
    match recs.last() {
        Some(last) if last.is_sentinel() => Ok(recs),
        _ => Err(DrmError::Corruption),
    }
}

/// An open handle on a DRM file.
///
/// Closes its descriptor best-effort on drop; errors are logged, not
/// propagated, matching `drmf_close`'s fire-and-forget semantics.
pub struct DrmFile {
    file: File,
}

impl DrmFile {
    /// Creates a new DRM file containing a single sentinel record
    /// `{size_initial, u64::MAX}`.
    ///
    /// If the file already exists, this is treated as success without
    /// inspecting its contents — a concurrent creator racing to the same
    /// path converges harmlessly in the common case where both callers
    /// agree on `size_initial`; see the design note on this race in
    /// DESIGN.md. Equivalent to `drmf_create` (drm_file.c).
    pub fn create(path: &Path, size_initial: u64) -> Result<(), DrmError> {
        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                log::debug!(target: "cowolf::drm", "DRM already exists at {}", path.display());
                return Ok(());
            }
            Err(e) => return Err(DrmError::from_io(e)),
        };
        let recs = vec![Record::sentinel(size_initial)];
        file.write_all_at(&encode(&recs), 0)
            .map_err(DrmError::from_io)?;
        Ok(())
    }

    /// Unlinks the DRM file. Equivalent to `drmf_destroy`.
    pub fn destroy(path: &Path) -> Result<(), DrmError> {
        std::fs::remove_file(path).map_err(DrmError::from_io)
    }

    /// Renames the DRM file. Equivalent to `drmf_rename`.
    pub fn rename(oldpath: &Path, newpath: &Path) -> Result<(), DrmError> {
        std::fs::rename(oldpath, newpath).map_err(DrmError::from_io)
    }

    /// Opens an existing DRM file for reading and writing.
    ///
    /// Returns `DrmError::NotFound` when the path does not exist — this is
    /// a routine signal to the facade layer, not a fatal error. Equivalent
    /// to `drmf_open`.
    pub fn open(path: &Path) -> Result<Self, DrmError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(DrmError::from_io)?;
        Ok(DrmFile { file })
    }

    fn load(&self) -> Result<Vec<Record>, DrmError> {
        let len = self.file.metadata().map_err(DrmError::from_io)?.len();
        let mut buf = vec![0u8; len as usize];
        self.file.read_exact_at(&mut buf, 0).map_err(DrmError::from_io)?;
        decode(&buf)
    }

    fn save(&self, recs: &[Record]) -> Result<(), DrmError> {
        let buf = encode(recs);
        self.file.write_all_at(&buf, 0).map_err(DrmError::from_io)?;
        self.file
            .set_len(buf.len() as u64)
            .map_err(DrmError::from_io)?;
        Ok(())
    }

    /// Records `[offset, offset+len-1]` as authoritative on the upper
    /// branch. Equivalent to `drmf_add_entry`.
    pub fn add_entry(&self, offset: u64, len: u64) -> Result<(), DrmError> {
        if len == 0 {
            return Ok(());
        }
        let _lock = FileLock::acquire(self.file.as_raw_fd())?;
        let mut recs = self.load()?;
        range::insert(Record::new(offset, offset + len - 1), &mut recs);
        self.save(&recs)
    }

    /// Returns the sorted, disjoint entries overlapping
    /// `[offset, offset+len-1]`, each clipped to that window.
    /// Equivalent to `drmf_get_entries`.
    pub fn get_entries(&self, offset: u64, len: u64) -> Result<Vec<DrmEntry>, DrmError> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let recs = {
            let _lock = FileLock::acquire(self.file.as_raw_fd())?;
            self.load()?
        };
        let range_end = offset + len - 1;
        let window = range::find_overlaps(Span::new(offset, len), &recs);
        Ok(recs[window]
            .iter()
            .map(|r| {
                let lo = r.off_start.max(offset);
                let hi = r.off_end.min(range_end);
                DrmEntry {
                    offset: lo,
                    len: hi - lo + 1,
                }
            })
            .collect())
    }

    /// Truncates the map to `new_size`, preserving the sentinel invariant.
    ///
    /// Equivalent to `drmf_trunc`. The new sentinel's start is
    /// `min(saved_last_start, new_size)`, where `saved_last_start` is the
    /// pre-truncation sentinel's start: this correctly distinguishes
    /// truncating into an unmapped hole (new sentinel starts at the new
    /// EOF) from truncating through a mapped region (new sentinel absorbs
    /// the clipped tail, starting where that region began).
    pub fn trunc(&self, new_size: u64) -> Result<(), DrmError> {
        let _lock = FileLock::acquire(self.file.as_raw_fd())?;
        let mut recs = self.load()?;
        let saved_last_start = recs.last().map(|r| r.off_start).unwrap_or(0);
        recs.pop(); // drop the sentinel before truncating the mapped portion
        range::truncate(new_size, &mut recs);
        let new_sentinel_start = saved_last_start.min(new_size);
        range::insert(Record::sentinel(new_sentinel_start), &mut recs);
        self.save(&recs)
    }
}

impl Drop for DrmFile {
    fn drop(&mut self) {
        // File's own Drop closes the fd; nothing extra to do, but log at
        // trace level for parity with drmf_close's call site visibility.
        log::trace!(target: "cowolf::drm", "closing DRM fd {}", self.file.as_raw_fd());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_then_load_is_single_sentinel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.drm");
        DrmFile::create(&path, 1000).unwrap();
        let f = DrmFile::open(&path).unwrap();
        let recs = f.load().unwrap();
        assert_eq!(recs, vec![Record::sentinel(1000)]);
    }

    #[test]
    fn create_twice_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.drm");
        DrmFile::create(&path, 1000).unwrap();
        DrmFile::create(&path, 2000).unwrap();
        let f = DrmFile::open(&path).unwrap();
        // second create is a no-op per the documented race behavior.
        assert_eq!(f.load().unwrap(), vec![Record::sentinel(1000)]);
    }

    #[test]
    fn open_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.drm");
        match DrmFile::open(&path) {
            Err(DrmError::NotFound) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn add_entry_then_get_entries_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.drm");
        DrmFile::create(&path, 1000).unwrap();
        let f = DrmFile::open(&path).unwrap();
        f.add_entry(300, 100).unwrap();
        let entries = f.get_entries(200, 500).unwrap();
        assert_eq!(
            entries,
            vec![
                DrmEntry { offset: 300, len: 100 },
            ]
        );
    }

    #[test]
    fn get_entries_clips_to_window() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.drm");
        DrmFile::create(&path, 1000).unwrap();
        let f = DrmFile::open(&path).unwrap();
        f.add_entry(300, 100).unwrap(); // [300,399]
        let entries = f.get_entries(350, 1000).unwrap();
        assert_eq!(entries[0], DrmEntry { offset: 350, len: 50 });
        // sentinel clipped to the query window too.
        assert_eq!(entries[1].offset, 1000);
    }

    #[test]
    fn trunc_into_hole_sets_sentinel_to_new_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.drm");
        DrmFile::create(&path, 1000).unwrap();
        let f = DrmFile::open(&path).unwrap();
        f.add_entry(300, 100).unwrap(); // [300,399]
        f.trunc(200).unwrap(); // hole at [0,199], below the mapped region
        assert_eq!(f.load().unwrap(), vec![Record::sentinel(200)]);
    }

    #[test]
    fn trunc_through_mapped_region_absorbs_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.drm");
        DrmFile::create(&path, 1000).unwrap();
        let f = DrmFile::open(&path).unwrap();
        f.add_entry(300, 100).unwrap(); // [300,399]
        f.trunc(350).unwrap(); // cuts through the mapped region
        assert_eq!(f.load().unwrap(), vec![Record::sentinel(300)]);
    }

    #[test]
    fn trunc_growth_is_noop_sentinel_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.drm");
        DrmFile::create(&path, 1000).unwrap();
        let f = DrmFile::open(&path).unwrap();
        f.trunc(5000).unwrap();
        // growth is already implicit in the sentinel; start is unchanged.
        assert_eq!(f.load().unwrap(), vec![Record::sentinel(1000)]);
    }

    #[test]
    fn corrupt_size_not_multiple_of_record_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.drm");
        std::fs::write(&path, [0u8; 7]).unwrap();
        let f = DrmFile::open(&path).unwrap();
        assert!(matches!(f.load(), Err(DrmError::Corruption)));
    }

    #[test]
    fn corrupt_missing_sentinel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.drm");
        let recs = vec![Record::new(0, 99)]; // off_end != u64::MAX
        std::fs::write(&path, encode(&recs)).unwrap();
        let f = DrmFile::open(&path).unwrap();
        assert!(matches!(f.load(), Err(DrmError::Corruption)));
    }
}
