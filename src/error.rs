//! # Error Handling for SimpleSheet
//!
//! This module defines the error type used throughout the crate. A single
//! error enum ([`Error`]) represents every failure mode, from a rejected local
//! mutation to a network failure inside the background uploader.
//!
//! ## Rust Pattern: thiserror
//!
//! We use the `thiserror` crate to derive `std::error::Error` implementations.
//! This provides:
//! - Automatic `Display` implementation from the `#[error(...)]` attributes
//! - Automatic `From` implementations from the `#[from]` attributes
//! - Proper error source chaining via `#[source]`
//!
//! ## Error Categories
//!
//! | Category | Examples | Typical Response |
//! |----------|----------|------------------|
//! | Validation | `OutOfBounds`, `InvalidMove` | Fix the call; nothing was applied |
//! | Authentication | Expired token, scope mismatch | Re-authenticate |
//! | Transport | Connection reset, bad JSON, non-2xx | Queue kept; next drain retries |
//! | Fatal usage | Mutation after shutdown, column move | Programming error |
//!
//! Validation errors are always raised *before* any side effect: the grid,
//! the extent and the pending queue are untouched when one is returned.

use thiserror::Error;

use crate::types::Dimension;

// =============================================================================
// Error Type
// =============================================================================

/// All errors that can occur in SimpleSheet operations.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Validation Errors (caller-correctable, zero side effects)
    // =========================================================================

    /// A mutation referenced a row or column at or beyond the sheet's extent.
    ///
    /// # When This Happens
    ///
    /// - `set` writes past the last row or column of the extent
    /// - `append` supplies a row wider than the column extent
    /// - a dimension range or move destination lies outside the extent
    ///
    /// # Recovery
    ///
    /// Grow the sheet first with `append_dimension` or `insert`, then retry.
    #[error("{dimension} index {index} is out of bounds (extent is {limit})")]
    OutOfBounds {
        /// The dimension that overflowed
        dimension: Dimension,
        /// The first offending index
        index: usize,
        /// The current extent along that dimension
        limit: usize,
    },

    /// A move's destination index falls inside the block being moved.
    #[error("cannot move {dimension} {start}..{end} to index {destination} inside the moved block")]
    InvalidMove {
        /// The dimension being moved
        dimension: Dimension,
        /// Start of the source block (inclusive)
        start: usize,
        /// End of the source block (exclusive)
        end: usize,
        /// The rejected destination
        destination: usize,
    },

    /// A dimension range was empty or reversed.
    #[error("invalid {dimension} range {start}..{end}")]
    InvalidRange {
        /// The dimension of the range
        dimension: Dimension,
        /// Start of the range (inclusive)
        start: usize,
        /// End of the range (exclusive)
        end: usize,
    },

    // =========================================================================
    // Fatal Usage Errors (programming errors)
    // =========================================================================

    /// A mutation was attempted on a sheet that has been shut down.
    #[error("operation called on a sheet that has been shut down")]
    ShutDown,

    /// The requested code path has no implementation.
    ///
    /// Moving columns is the only such path today.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    // =========================================================================
    // Authentication Errors
    // =========================================================================

    /// No valid credential could be produced for the requested scope.
    ///
    /// # When This Happens
    ///
    /// - A static [`AccessToken`](crate::auth::AccessToken) has expired
    /// - The requested scope isn't covered by the token's scope
    /// - An OAuth factory has no refresh token
    /// - The token endpoint rejected the grant
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Signing the service-account assertion failed.
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // =========================================================================
    // Transport Errors (queue retained, retried by the next drain)
    // =========================================================================

    /// The HTTP client failed (connection, TLS, timeout).
    ///
    /// # Rust Pattern: #[from]
    ///
    /// The `#[from]` attribute lets `?` convert `reqwest::Error` directly.
    #[error("http error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A request body couldn't be encoded or a response couldn't be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote service answered with a non-success status.
    #[error("api error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message extracted from the response body
        message: String,
    },

    /// A successful response lacked a field the caller depends on.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A drain cycle failed; reported to waiters that did not trigger it.
    #[error("upload failed: {0}")]
    Upload(String),

    /// The background uploader task is no longer running.
    #[error("uploader has shut down")]
    UploaderClosed,

    // =========================================================================
    // Input Errors
    // =========================================================================

    /// A textual cell reference or range couldn't be parsed.
    #[error("invalid cell reference: {0}")]
    Format(String),

    /// Configuration or credential material is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading a credential file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors raised by local validation before any side effect.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::OutOfBounds { .. } | Error::InvalidMove { .. } | Error::InvalidRange { .. }
        )
    }

    /// True for programming errors that no retry can fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ShutDown | Error::NotImplemented(_))
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A `Result` type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Tests
// =============================================================================
