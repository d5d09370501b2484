//! # AtomicSheet: Write-Buffered Sheet
//!
//! An [`AtomicSheet`] is a local image of one remote sheet that can be
//! mutated synchronously. Each mutation is validated and applied to the
//! local [`SheetCache`] on the spot, then its remote [`Operation`] is queued
//! for the background uploader:
//!
//! ```text
//! sheet.set(rows, at)?                    (sync, never awaits)
//!   │
//!   ├─ refused after shutdown ─────────► Err(ShutDown)
//!   ├─ cache.validate(&mutation) ─ bad ─► Err(OutOfBounds | InvalidMove | ...)
//!   │                                      (nothing changed, nothing queued)
//!   ├─ uploader.enqueue(op) ─ closed ───► Err(UploaderClosed)
//!   └─ cache.commit(&mutation) ────────► Ok(())
//!                                           │
//!                         uploader task ◄───┘  batches + uploads later
//! ```
//!
//! `get()` therefore always reflects every accepted mutation, whatever the
//! upload state. Upload failures are only observed by awaiting
//! [`flush`](AtomicSheet::flush) or [`shutdown`](AtomicSheet::shutdown).
//!
//! ## Loading
//!
//! Construction spawns the uploader, whose first drain loads the remote
//! sheet (creating it if missing). Mutations made before that finishes are
//! checked against the empty local image, queued behind the load, and
//! logged. When the snapshot arrives, the next call on the sheet rebuilds
//! the cache from it and replays the log, so the local image matches what
//! the remote sheet will look like once the queue has drained.
//!
//! ## Rust Pattern: &mut self Instead of a Lock
//!
//! The cache is owned by the handle and only touched through `&mut self`.
//! Reads take `&mut self` too, since they first fold in a freshly loaded
//! snapshot. The uploader never sees the cache; it only gets operations.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut sheet = AtomicSheet::new(client, "Log");
//! sheet.wait_loaded().await?;
//! sheet.append_dimension(Dimension::Rows, 3)?;
//! sheet.set(vec![vec!["a".into(), "b".into()]], Location::ORIGIN)?;
//! sheet.flush().await?;
//! ```

use std::ops::Range;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use crate::cache::{Grid, Mutation, SheetCache};
use crate::client::{LoadedSheet, SheetsClient};
use crate::error::{Error, Result};
use crate::location::Location;
use crate::operation::Operation;
use crate::types::{Dimension, Extent, SheetId};
use crate::uploader::{spawn_uploader, UploadStatus, UploaderHandle};

/// A sheet whose mutations apply locally at once and upload in batches.
pub struct AtomicSheet {
    title: String,
    cache: SheetCache,
    sheet_id: SheetId,
    /// Accepted before the remote snapshot was folded in.
    preload_log: Vec<Mutation>,
    loaded: watch::Receiver<Option<Arc<LoadedSheet>>>,
    integrated: bool,
    uploader: UploaderHandle,
    shut_down: bool,
}

impl AtomicSheet {
    /// Opens the sheet titled `title`, creating it remotely if needed.
    ///
    /// Returns immediately; the load runs in the background. Must be called
    /// from within a tokio runtime.
    pub fn new(client: Arc<SheetsClient>, title: impl Into<String>) -> Self {
        let title = title.into();
        let (uploader, loaded) = spawn_uploader(client, title.clone());
        Self {
            title,
            cache: SheetCache::new(),
            sheet_id: SheetId::UNRESOLVED,
            preload_log: Vec::new(),
            loaded,
            integrated: false,
            uploader,
            shut_down: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// True once the remote sheet has been loaded or created.
    pub fn is_sheet_loaded(&self) -> bool {
        self.loaded.borrow().is_some()
    }

    /// The remote sheet ID; [`SheetId::UNRESOLVED`] until loaded.
    pub fn sheet_id(&mut self) -> SheetId {
        self.sync_loaded();
        self.sheet_id
    }

    /// The current grid, including every accepted mutation.
    pub fn get(&mut self) -> &Grid {
        self.sync_loaded();
        self.cache.grid()
    }

    /// The current extent, including every accepted mutation.
    pub fn extent(&mut self) -> Extent {
        self.sync_loaded();
        self.cache.extent()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Appends rows below the populated region.
    ///
    /// Fails with `OutOfBounds` if a row is wider than the column extent.
    pub fn append_rows(&mut self, rows: Grid) -> Result<()> {
        self.operate(Mutation::AppendRows(rows))
    }

    /// Grows the sheet by `size` rows or columns.
    pub fn append_dimension(&mut self, dimension: Dimension, size: usize) -> Result<()> {
        self.operate(Mutation::AppendDimension { dimension, size })
    }

    /// Deletes the rows or columns in `range`.
    pub fn delete(&mut self, dimension: Dimension, range: Range<usize>) -> Result<()> {
        self.operate(Mutation::Delete { dimension, range })
    }

    /// Inserts `range.len()` empty rows or columns at `range.start`.
    pub fn insert(&mut self, dimension: Dimension, range: Range<usize>) -> Result<()> {
        self.operate(Mutation::Insert { dimension, range })
    }

    /// Moves the rows in `range` to `destination` (counted before removal).
    ///
    /// Fails with `InvalidMove` if `destination` is inside `range`, and with
    /// `NotImplemented` for columns.
    pub fn move_dimension(
        &mut self,
        dimension: Dimension,
        range: Range<usize>,
        destination: usize,
    ) -> Result<()> {
        self.operate(Mutation::Move {
            dimension,
            range,
            destination,
        })
    }

    /// Overwrites cells starting at `at`. The extent must already cover them.
    pub fn set(&mut self, rows: Grid, at: Location) -> Result<()> {
        self.operate(Mutation::Set { rows, at })
    }

    /// Empties the grid; the extent stays.
    pub fn clear(&mut self) -> Result<()> {
        self.operate(Mutation::Clear)
    }

    fn operate(&mut self, mutation: Mutation) -> Result<()> {
        if self.shut_down {
            return Err(Error::ShutDown);
        }
        self.sync_loaded();

        // Queue before committing, so a closed uploader leaves the cache as is.
        self.cache.validate(&mutation)?;
        let op: Operation = mutation.to_operation(self.sheet_id);
        self.uploader.enqueue(op)?;
        self.cache.commit(&mutation);

        if !self.integrated {
            self.preload_log.push(mutation);
        }
        Ok(())
    }

    /// Folds the loaded snapshot in, once.
    fn sync_loaded(&mut self) {
        if self.integrated {
            return;
        }
        let snapshot = self.loaded.borrow().clone();
        let Some(sheet) = snapshot else {
            return;
        };

        let mut cache = SheetCache::from_snapshot(sheet.rows.clone(), sheet.extent);
        for mutation in self.preload_log.drain(..) {
            if let Err(e) = cache.apply(&mutation) {
                warn!(title = %self.title, error = %e, ?mutation, "queued mutation does not apply to loaded sheet");
            }
        }

        self.cache = cache;
        self.sheet_id = sheet.sheet_id;
        self.integrated = true;
    }

    // =========================================================================
    // Upload Control
    // =========================================================================

    /// Waits for the remote sheet to be loaded.
    ///
    /// Fails with the load error if the load drain fails; calling again
    /// retries it.
    pub async fn wait_loaded(&mut self) -> Result<()> {
        if !self.is_sheet_loaded() {
            let uploader = self.uploader.clone();
            tokio::select! {
                loaded = self.loaded.wait_for(Option::is_some) => {
                    loaded.map_err(|_| Error::UploaderClosed)?;
                }
                flushed = uploader.flush() => flushed?,
            }
        }
        self.sync_loaded();
        Ok(())
    }

    /// Waits until every accepted mutation has been uploaded.
    ///
    /// Retries a previously failed drain; fails if this drain fails.
    pub async fn flush(&mut self) -> Result<()> {
        self.uploader.flush().await?;
        self.sync_loaded();
        Ok(())
    }

    /// The uploader's current state.
    pub async fn status(&self) -> Result<UploadStatus> {
        self.uploader.status().await
    }

    /// Refuses further mutations, makes a final upload attempt, and stops
    /// the uploader.
    ///
    /// Returns the final drain's error if operations remain unsent.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        self.uploader.shutdown().await
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessToken, Scope};
    use crate::config::ClientConfig;
    use crate::transport::{HttpRequest, HttpResponse, Transport};
    use async_trait::async_trait;
    use serde_json::json;

    /// Every call fails, so the sheet never loads.
    struct Offline;

    #[async_trait]
    impl Transport for Offline {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse> {
            Ok(HttpResponse::json(503, &json!({ "error": { "code": 503, "message": "offline" } })))
        }
    }

    fn offline_sheet() -> AtomicSheet {
        let token = AccessToken {
            access_token: "t".to_string(),
            token_type: "Bearer".to_string(),
            scope: Scope::sheets(),
            refresh_token: None,
            expiry_date: chrono::Utc::now() + chrono::Duration::hours(1),
        };
        let client = SheetsClient::new("doc", Arc::new(token), Arc::new(Offline), ClientConfig::default());
        AtomicSheet::new(Arc::new(client), "Log")
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_mutations_apply_before_load() {
        let mut sheet = offline_sheet();
        assert!(!sheet.is_sheet_loaded());

        sheet.append_dimension(Dimension::Rows, 3).unwrap();
        sheet.append_dimension(Dimension::Columns, 2).unwrap();
        sheet.set(vec![row(&["a", "b"])], Location::ORIGIN).unwrap();

        assert_eq!(sheet.get(), &vec![row(&["a", "b"])]);
        assert_eq!(sheet.extent(), Extent::new(2, 3));
        assert_eq!(sheet.sheet_id(), SheetId::UNRESOLVED);
        assert_eq!(sheet.status().await.unwrap().pending, 3);
    }

    #[tokio::test]
    async fn test_rejected_mutation_queues_nothing() {
        let mut sheet = offline_sheet();
        let err = sheet.set(vec![row(&["x"])], Location::ORIGIN).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { .. }));
        assert!(sheet.get().is_empty());
        assert_eq!(sheet.status().await.unwrap().pending, 0);
    }

    #[tokio::test]
    async fn test_wait_loaded_reports_load_failure() {
        let mut sheet = offline_sheet();
        let err = sheet.wait_loaded().await.unwrap_err();
        assert!(matches!(err, Error::Upload(ref m) if m.contains("offline")));
        assert!(sheet.status().await.unwrap().load_pending);
    }

    #[tokio::test]
    async fn test_mutation_after_shutdown_is_refused() {
        let mut sheet = offline_sheet();
        sheet.append_dimension(Dimension::Rows, 1).unwrap();

        // The final drain can't reach the service.
        assert!(matches!(sheet.shutdown().await, Err(Error::Upload(_))));
        assert!(sheet.is_shut_down());

        let err = sheet.append_dimension(Dimension::Rows, 1).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(sheet.extent(), Extent::new(0, 1));
        assert!(sheet.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_closed_uploader_leaves_cache_untouched() {
        let mut sheet = offline_sheet();
        sheet.append_dimension(Dimension::Rows, 2).unwrap();

        // Stop the task behind the sheet's back.
        let _ = sheet.uploader.shutdown().await;
        assert!(sheet.uploader.is_closed());

        let err = sheet.append_dimension(Dimension::Columns, 1).unwrap_err();
        assert!(matches!(err, Error::UploaderClosed));
        assert_eq!(sheet.extent(), Extent::new(0, 2));
        assert!(sheet.get().is_empty());
    }
}
