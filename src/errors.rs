//! Error types for data-link operations
//!
//! Transient loss on the channel is never an error: the ARQ loop absorbs it.
//! What surfaces here is rejected input, broken frames, and the optional
//! retry ceiling.
use std::io;

use thiserror::Error;

/// Result type alias for data-link operations
pub type Result<T> = std::result::Result<T, LinkError>;

/// Data-link error enumeration
///
/// Covers the failure modes outside the happy path:
/// - Rejected user input (binary strings, hex checksums)
/// - Invalid channel configuration
/// - Frame decoding and integrity violations
/// - Attempt ceiling reached on a hostile channel
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    /// I/O error (console or pacing failure)
    #[error("I/O error: {0}")]
    IoError(String),

    /// Drop probability is NaN or outside `[0.0, 1.0]`
    #[error("Invalid drop probability: {0} (must be within 0.0..=1.0)")]
    InvalidDropProbability(f64),

    /// Scripted probability source built without any samples
    #[error("Scripted source needs at least one sample")]
    EmptyScript,

    /// Binary-string input contained something other than `0` and `1`
    #[error("Invalid binary string: {0:?}")]
    InvalidBinaryString(String),

    /// Checksum input is not a hex number that fits in 16 bits
    #[error("Invalid CRC format: {0:?}")]
    InvalidCrcHex(String),

    /// Encoded frame is too short or carries a bad sequence byte
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// CRC check failed - data corrupted or wrong CRC supplied
    #[error("Integrity check failed: expected CRC {expected:#06x}, got {actual:#06x}")]
    IntegrityCheckFailed { expected: u16, actual: u16 },

    /// Configured attempt ceiling reached without an acknowledgment
    #[error("No acknowledgment after {attempts} attempts")]
    RetryLimitExceeded { attempts: u32 },
}

impl From<io::Error> for LinkError {
    fn from(err: io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LinkError::IntegrityCheckFailed { expected: 0x29B1, actual: 0x0001 };
        assert_eq!(
            err.to_string(),
            "Integrity check failed: expected CRC 0x29b1, got 0x0001"
        );

        let err = LinkError::RetryLimitExceeded { attempts: 7 };
        assert_eq!(err.to_string(), "No acknowledgment after 7 attempts");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let err: LinkError = io_err.into();
        assert!(matches!(err, LinkError::IoError(msg) if msg.contains("pipe closed")));
    }
}
