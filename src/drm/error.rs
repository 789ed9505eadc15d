//! Error type for the DRM Store layer.

use std::fmt;
use std::io;

/// Failure modes for DRM Store operations.
///
/// Hand-rolled rather than derived (matching `Lz4FError`'s `Display` /
/// `std::error::Error` impls elsewhere in this crate) so the underlying
/// `io::ErrorKind` is never flattened away.
#[derive(Debug)]
pub enum DrmError {
    /// The DRM file does not exist.
    NotFound,
    /// The file's length is not a multiple of the record size, or its last
    /// record is not a valid sentinel (`off_end == u64::MAX`).
    Corruption,
    /// The composed path exceeded the configured maximum path length.
    NameTooLong,
    /// Any other I/O failure; the original `io::ErrorKind` is preserved.
    Io(io::Error),
}

impl DrmError {
    pub fn from_io(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            DrmError::NotFound
        } else {
            DrmError::Io(err)
        }
    }
}

impl fmt::Display for DrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrmError::NotFound => write!(f, "data-range map not found"),
            DrmError::Corruption => write!(f, "data-range map is corrupt"),
            DrmError::NameTooLong => write!(f, "data-range map path exceeds maximum length"),
            DrmError::Io(e) => write!(f, "data-range map I/O error: {e}"),
        }
    }
}

impl std::error::Error for DrmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DrmError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DrmError {
    fn from(err: io::Error) -> Self {
        DrmError::from_io(err)
    }
}
