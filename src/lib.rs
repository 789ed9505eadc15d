//! Copy-on-write range map for large files in a two-branch union filesystem.
//!
//! Three layers, leaves first:
//! - [`range`] — pure in-memory algebra over sorted, disjoint byte ranges.
//! - [`drm`] — file-level persistence of a range array with advisory locking.
//! - [`facade`] — per-file datamap lifecycle and the scatter-gather read/write
//!   that stitches an upper (read-write) branch and a lower (read-only)
//!   branch together using a datamap as a routing table.

pub mod config;
pub mod drm;
pub mod facade;
pub mod range;

pub use config::{BranchConfig, CowolfConfig};
pub use drm::{DrmEntry, DrmError, DrmFile};
pub use facade::{
    create_datamap, destroy_datamap, has_datamap, open, read, rename_datamap, truncate_datamap,
    write, CowolfError, CowolfHandle, MetaPathProvider, StdMetaPathProvider,
};
pub use range::{Record, Span};
