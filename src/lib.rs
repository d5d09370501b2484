//! # SimpleSheet - Write-Buffered Spreadsheet Client
//!
//! SimpleSheet is a client library for a cloud spreadsheet API. It provides:
//!
//! - **Authentication**: static tokens, OAuth2 authorization-code and
//!   refresh-token flows, service-account JWT-bearer flow, with memoized
//!   single-flight refresh
//! - **A typed wire model**: sheets, grid properties, cell data, and the
//!   batch-update request items
//! - **Direct access**: [`Spreadsheet`] issues one batch-update per call
//! - **Write buffering**: [`AtomicSheet`] applies mutations to a local image
//!   synchronously and uploads them in batches in the background
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     AtomicSheet (sync API)                      │
//! │        append / insert / delete / move / set / clear / get      │
//! │                                                                 │
//! │  ┌───────────────────────┐        ┌──────────────────────────┐ │
//! │  │ SheetCache            │        │ pre-load mutation log    │ │
//! │  │ (grid + extent,       │        │ (replayed onto the       │ │
//! │  │  validate-then-apply) │        │  loaded snapshot)        │ │
//! │  └───────────────────────┘        └──────────────────────────┘ │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ Operation (mpsc)
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Uploader Task                             │
//! │       (owns the pending queue, at most one drain in flight)     │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │          SheetsClient → Authenticator + Transport (HTTP)        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Invariants
//!
//! 1. **Validate then apply**: a mutation either applies fully and queues
//!    exactly one operation, or fails with nothing changed
//! 2. **Bounded by the extent**: no accepted mutation touches a row or
//!    column at or past the sheet's extent
//! 3. **Single flight**: at most one upload per sheet is in flight
//! 4. **FIFO, exact prefix**: operations upload in enqueue order, and a
//!    successful batch removes exactly the operations it carried
//! 5. **Load first**: no operation is sent before the sheet is resolved
//!
//! ## Module Organization
//!
//! - [`error`]: the crate's error type
//! - [`types`]: identifiers, [`Dimension`], [`Extent`]
//! - [`location`]: cell references in A1 and R1C1 notation
//! - [`schema`]: wire model of the remote API
//! - [`operation`]: batch-update request items
//! - [`config`]: endpoints and timeouts
//! - [`transport`]: JSON-over-HTTP seam
//! - [`auth`]: authenticators and token flows
//! - [`client`]: authenticated calls against one spreadsheet
//! - [`spreadsheet`]: direct spreadsheet API
//! - [`cache`]: local grid image and mutation validation
//! - [`uploader`]: single-flight background uploader
//! - [`sheet`]: [`AtomicSheet`]

// =============================================================================
// Module Declarations
// =============================================================================

/// Error types for SimpleSheet operations.
///
/// One enum covers validation, authentication, transport and usage errors.
pub mod error;

/// Identifier newtypes, the row/column [`Dimension`], and [`Extent`].
pub mod types;

/// Cell and range references.
pub mod location;

/// Wire model of the remote spreadsheet API.
///
/// Every type here mirrors a JSON resource of the service and serializes
/// with its camelCase field names.
pub mod schema;

/// Batch-update request items.
pub mod operation;

/// Client configuration: endpoints, timeouts, environment overrides.
pub mod config;

/// The HTTP seam: [`Transport`](transport::Transport) and its reqwest
/// implementation.
pub mod transport;

/// Authentication: scopes, tokens, OAuth2 and service accounts.
pub mod auth;

/// Authenticated calls against one spreadsheet.
pub mod client;

/// Direct, unbuffered spreadsheet access.
pub mod spreadsheet;

/// Local sheet image and mutation validation.
pub mod cache;

/// The background uploader behind [`AtomicSheet`].
///
/// Owns the pending queue and drains it with at most one batch-update call
/// in flight, removing exactly the uploaded prefix on success.
pub mod uploader;

/// The write-buffered sheet.
pub mod sheet;

// =============================================================================
// Re-exports
// =============================================================================

pub use auth::{AccessToken, Authenticator, CachingAuthenticator, OAuthClient, Scope, ServiceAccount};
pub use cache::{Grid, Mutation, SheetCache};
pub use client::{LoadedSheet, SheetsClient};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use location::Location;
pub use operation::{Operation, Operations};
pub use sheet::AtomicSheet;
pub use spreadsheet::Spreadsheet;
pub use types::{Dimension, Extent, SheetId, SpreadsheetId};
pub use uploader::UploadStatus;
