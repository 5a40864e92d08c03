//! Error types for WMC

use thiserror::Error;

/// Result type alias for WMC operations
pub type Result<T> = std::result::Result<T, WmcError>;

/// Main error type for WMC
///
/// Every failure in the encode pipeline aborts the whole run: frames form a
/// prediction chain, so there is no per-frame retry or skip.
#[derive(Error, Debug)]
pub enum WmcError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Initialization error
    #[error("initialization error: {reason}")]
    Init {
        /// Reason for failure
        reason: String,
    },

    /// Invalid container header
    #[error("invalid container header: {reason}")]
    InvalidHeader {
        /// Reason for invalidity
        reason: String,
    },

    /// Container ended mid-record
    #[error("container truncated while reading {context}")]
    Truncated {
        /// What was being read when the stream ended
        context: String,
    },

    /// Frame record failed structural validation
    #[error("corrupt frame record: {reason}")]
    CorruptRecord {
        /// Reason for rejection
        reason: String,
    },

    /// Plane cannot be tiled into 8x8 blocks
    #[error("plane dimensions {rows}x{cols} are not a multiple of the {alignment}-sample block grid")]
    DimensionNotAligned {
        /// Plane row count
        rows: usize,
        /// Plane column count
        cols: usize,
        /// Required alignment
        alignment: usize,
    },

    /// Plane dimensions differ from what the pipeline expects
    #[error("plane dimensions {actual_rows}x{actual_cols} do not match expected {expected_rows}x{expected_cols}")]
    PlaneMismatch {
        /// Actual row count
        actual_rows: usize,
        /// Actual column count
        actual_cols: usize,
        /// Expected row count
        expected_rows: usize,
        /// Expected column count
        expected_cols: usize,
    },

    /// Quality outside the accepted range
    #[error("invalid quality {value}: valid range is 1-100")]
    InvalidQuality {
        /// The rejected value
        value: u8,
    },

    /// Frame source delivered a pixel format the pipeline cannot ingest
    #[error("unsupported pixel format: {format}. WMC ingests 4:4:4 YUV4MPEG2")]
    UnsupportedPixelFormat {
        /// The unsupported format
        format: String,
    },

    /// Malformed zero-run stream
    #[error("malformed run-length stream: {reason}")]
    RleDecode {
        /// Reason for rejection
        reason: String,
    },

    /// The source produced no frames at all
    #[error("frame source yielded no frames")]
    EmptySource,

    /// Frame source failure
    #[error("frame source error: {reason}")]
    Source {
        /// Reason for failure
        reason: String,
    },
}

impl WmcError {
    /// Create an initialization error
    pub fn init(reason: impl Into<String>) -> Self {
        WmcError::Init {
            reason: reason.into(),
        }
    }

    /// Create an invalid header error
    pub fn invalid_header(reason: impl Into<String>) -> Self {
        WmcError::InvalidHeader {
            reason: reason.into(),
        }
    }

    /// Create a truncation error
    pub fn truncated(context: impl Into<String>) -> Self {
        WmcError::Truncated {
            context: context.into(),
        }
    }

    /// Create a corrupt record error
    pub fn corrupt_record(reason: impl Into<String>) -> Self {
        WmcError::CorruptRecord {
            reason: reason.into(),
        }
    }

    /// Create a run-length decode error
    pub fn rle_decode(reason: impl Into<String>) -> Self {
        WmcError::RleDecode {
            reason: reason.into(),
        }
    }

    /// Create a frame source error
    pub fn source(reason: impl Into<String>) -> Self {
        WmcError::Source {
            reason: reason.into(),
        }
    }

    /// Check if this is a container read/parse error
    pub fn is_container_error(&self) -> bool {
        matches!(
            self,
            WmcError::InvalidHeader { .. }
                | WmcError::Truncated { .. }
                | WmcError::CorruptRecord { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WmcError::InvalidQuality { value: 0 };
        assert!(err.to_string().contains("1-100"));

        let err = WmcError::DimensionNotAligned {
            rows: 12,
            cols: 16,
            alignment: 8,
        };
        assert!(err.to_string().contains("12x16"));
    }

    #[test]
    fn test_container_error_category() {
        assert!(WmcError::truncated("frame record").is_container_error());
        assert!(WmcError::invalid_header("bad magic").is_container_error());
        assert!(!WmcError::EmptySource.is_container_error());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: WmcError = io.into();
        assert!(matches!(err, WmcError::Io(_)));
    }
}
