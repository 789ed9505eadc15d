//! In-memory range algebra over a sorted, disjoint, non-adjacent array of
//! byte-range records.
//!
//! Ported from drm_mem.c. The array invariant maintained throughout this
//! module: for all `i`, `recs[i].off_end + 1 < recs[i+1].off_start` — no two
//! records overlap or touch. A valid map always carries a trailing sentinel
//! record whose `off_end == u64::MAX`; that invariant is the caller's
//! responsibility (the DRM Store layer), not enforced here, since some of
//! these routines (`truncate`) are specified to operate on a sentinel-free
//! slice.

use std::fmt;
use std::ops::Range as IndexRange;

/// A single `[off_start, off_end]` inclusive byte interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub off_start: u64,
    pub off_end: u64,
}

impl Record {
    pub const fn new(off_start: u64, off_end: u64) -> Self {
        Record { off_start, off_end }
    }

    /// The sentinel tail record representing "everything from `eof` onward
    /// belongs to the upper branch."
    pub const fn sentinel(eof: u64) -> Self {
        Record::new(eof, u64::MAX)
    }

    pub fn is_sentinel(&self) -> bool {
        self.off_end == u64::MAX
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.off_start, self.off_end)
    }
}

/// A half-open byte span `[offset, offset+len)` used as an insert/query
/// argument, distinct from the inclusive on-disk `Record` representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub offset: u64,
    pub len: u64,
}

impl Span {
    pub const fn new(offset: u64, len: u64) -> Self {
        Span { offset, len }
    }

    fn last_off(&self) -> Option<u64> {
        if self.len == 0 {
            None
        } else {
            Some(self.offset + self.len - 1)
        }
    }
}

/// Predecessor search: returns the index of the record with the greatest
/// `off_start <= key`, or `None` if every record starts above `key`.
///
/// Equivalent to `search_sml_or_eql` (drm_mem.c:71-80), reimplemented with
/// `slice::partition_point` instead of a `bsearch` comparator that smuggles
/// array bounds through the search key.
pub fn search_sml_or_eql(key: u64, recs: &[Record]) -> Option<usize> {
    if recs.is_empty() || recs[0].off_start > key {
        return None;
    }
    // partition_point finds the first index where the predicate is false;
    // every record before it has off_start <= key.
    let idx = recs.partition_point(|r| r.off_start <= key);
    Some(idx - 1)
}

/// Returns true if `right` overlaps or is adjacent to `left` (merge-eligible).
/// Equivalent to `rec_merge`'s mergeability test (drm_mem.c:88-96).
fn mergeable(left: &Record, right: &Record) -> bool {
    left.off_end.checked_add(1).map_or(true, |end_plus_one| end_plus_one >= right.off_start)
}

fn merge_into(left: &mut Record, right: &Record) {
    left.off_end = left.off_end.max(right.off_end);
}

/// Inserts `new_range` into `recs`, merging with any overlapping or adjacent
/// neighbors so the sorted-disjoint-non-adjacent invariant is preserved.
///
/// Equivalent to `drmm_rec_insert` (drm_mem.c:107-160). The C source mutates
/// a caller-owned fixed buffer with one spare slot and returns a new count;
/// here `recs` is an ordinary `Vec` and grows/shrinks directly.
pub fn insert(new_range: Record, recs: &mut Vec<Record>) {
    let pred = search_sml_or_eql(new_range.off_start, recs);

    let ins_idx = match pred {
        Some(p) if mergeable(&recs[p], &new_range) => {
            merge_into(&mut recs[p], &new_range);
            p
        }
        Some(p) => {
            recs.insert(p + 1, new_range);
            p + 1
        }
        None => {
            recs.insert(0, new_range);
            0
        }
    };

    // Cascade-merge forward: the record at ins_idx may now subsume any
    // number of its successors.
    let mut next = ins_idx + 1;
    while next < recs.len() && mergeable(&recs[ins_idx].clone(), &recs[next]) {
        let absorbed_end = recs[next].off_end;
        recs[ins_idx].off_end = recs[ins_idx].off_end.max(absorbed_end);
        recs.remove(next);
    }
}

/// Truncates a *sentinel-excluded* record array to cover only
/// `[0, new_size - 1]`, clipping the last surviving record as needed.
///
/// Equivalent to `drmm_rec_truncate` (drm_mem.c:169-186). Callers own
/// reconstructing the sentinel afterward (see `drm::DrmFile::trunc`) — this
/// function only performs the pure clipping step.
pub fn truncate(new_size: u64, recs: &mut Vec<Record>) {
    if new_size == 0 || recs.is_empty() {
        recs.clear();
        return;
    }
    let last_off = new_size - 1;
    match search_sml_or_eql(last_off, recs) {
        None => recs.clear(),
        Some(idx) => {
            recs[idx].off_end = recs[idx].off_end.min(last_off);
            recs.truncate(idx + 1);
        }
    }
}

/// Finds the contiguous index range of every record intersecting
/// `[span.offset, span.offset + span.len - 1]`.
///
/// Equivalent to `drmm_rec_find_overlaps` (drm_mem.c:197-230).
pub fn find_overlaps(span: Span, recs: &[Record]) -> IndexRange<usize> {
    let Some(range_end) = span.last_off() else {
        return 0..0;
    };
    if recs.is_empty() {
        return 0..0;
    }

    let start_guess = search_sml_or_eql(span.offset, recs).unwrap_or(0);

    let mut first = None;
    let mut last_exclusive = start_guess;
    for (i, r) in recs.iter().enumerate().skip(start_guess) {
        if r.off_start > range_end {
            break;
        }
        if r.off_end < span.offset {
            continue;
        }
        if first.is_none() {
            first = Some(i);
        }
        last_exclusive = i + 1;
    }

    match first {
        Some(f) => f..last_exclusive,
        None => 0..0,
    }
}
