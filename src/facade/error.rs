//! Error type for the COWOLF Facade layer.

use std::fmt;
use std::io;

use crate::drm::DrmError;

/// Failure modes surfaced by facade operations.
#[derive(Debug)]
pub enum CowolfError {
    /// A composed path exceeded the configured maximum path length.
    NameTooLong,
    /// Any other I/O failure, with the underlying `io::ErrorKind` preserved.
    Io(io::Error),
}

impl CowolfError {
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            CowolfError::NameTooLong => io::ErrorKind::InvalidFilename,
            CowolfError::Io(e) => e.kind(),
        }
    }
}

impl fmt::Display for CowolfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CowolfError::NameTooLong => write!(f, "cowolf path exceeds maximum length"),
            CowolfError::Io(e) => write!(f, "cowolf I/O error: {e}"),
        }
    }
}

impl std::error::Error for CowolfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CowolfError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CowolfError {
    fn from(err: io::Error) -> Self {
        CowolfError::Io(err)
    }
}

impl From<DrmError> for CowolfError {
    fn from(err: DrmError) -> Self {
        match err {
            DrmError::NotFound => CowolfError::Io(io::Error::from(io::ErrorKind::NotFound)),
            DrmError::Corruption => {
                CowolfError::Io(io::Error::new(io::ErrorKind::InvalidData, "DRM corruption"))
            }
            DrmError::NameTooLong => CowolfError::NameTooLong,
            DrmError::Io(e) => CowolfError::Io(e),
        }
    }
}
