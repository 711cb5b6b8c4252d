//! Error types for the counter store.
//!
//! Errors fall into two groups. Per-line errors ([`StoreError::IndexOutOfRange`]
//! and [`StoreError::MalformedRequest`]) are answered with an error line and the
//! session keeps going. Everything else ends the session (or, for
//! [`StoreError::InvalidSize`] and [`StoreError::InvalidConfig`], refuses to
//! start the store at all).

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type StoreResult<T> = Result<T, StoreError>;

/// Everything that can go wrong between a client line and a cell.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store was asked for a non-positive number of cells.
    #[error("invalid vector size {size}: must be a positive integer")]
    InvalidSize {
        /// The rejected size.
        size: i64,
    },

    /// A request addressed a cell outside `[0, len)`.
    #[error("index {index} out of range [0, {len})")]
    IndexOutOfRange {
        /// The index the client sent.
        index: i64,
        /// Number of cells in the store.
        len: usize,
    },

    /// A request line could not be parsed as `<OP> <index>`.
    #[error("malformed request: {}", excerpt(.line))]
    MalformedRequest {
        /// The offending line, without its terminator.
        line: String,
    },

    /// The client broke the handshake (missing or non-numeric count, early EOF).
    #[error("protocol violation: {reason}")]
    ProtocolViolation {
        /// What the client did wrong.
        reason: String,
    },

    /// The client sent nothing for longer than the idle timeout.
    #[error("session idle for more than {after:?}")]
    IdleTimeout {
        /// The configured timeout that expired.
        after: Duration,
    },

    /// Startup configuration was rejected.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration is unusable.
        reason: String,
    },

    /// Reading from or writing to the client failed.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

/// Longest slice of a rejected line repeated back in an error message.
const EXCERPT_LEN: usize = 64;

/// Quotes `line`, cut to [`EXCERPT_LEN`] bytes with its full length noted.
fn excerpt(line: &str) -> String {
    if line.len() <= EXCERPT_LEN {
        return format!("{line:?}");
    }
    let mut end = EXCERPT_LEN;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    format!("{:?}... ({} bytes)", &line[..end], line.len())
}

impl StoreError {
    /// Returns `true` for errors that are reported to the client as a reply
    /// line without ending the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::IndexOutOfRange { .. } | StoreError::MalformedRequest { .. }
        )
    }

    /// Builds a [`StoreError::ProtocolViolation`].
    pub fn protocol(reason: impl Into<String>) -> Self {
        StoreError::ProtocolViolation {
            reason: reason.into(),
        }
    }
}
