//! Direct, unbuffered access to a spreadsheet.
//!
//! A [`Spreadsheet`] is fetched once and then issues one batch-update call
//! per method. Nothing is cached except the sheet list, which is kept in
//! step with `create_sheet` / `delete_sheet`. For buffered, locally
//! validated edits of a single sheet use [`AtomicSheet`](crate::sheet::AtomicSheet).

use std::ops::Range;
use std::sync::Arc;

use crate::cache::Grid;
use crate::client::SheetsClient;
use crate::error::{Error, Result};
use crate::location::Location;
use crate::operation::Operation;
use crate::schema::{
    BatchUpdateResponse, GridProperties, Sheet, SpreadsheetProperties, SpreadsheetResource,
};
use crate::types::{Dimension, SheetId, SpreadsheetId};

/// A fetched spreadsheet.
pub struct Spreadsheet {
    client: Arc<SheetsClient>,
    properties: Option<SpreadsheetProperties>,
    spreadsheet_url: Option<String>,
    sheets: Vec<Sheet>,
}

impl Spreadsheet {
    /// Fetches the spreadsheet the client points at.
    pub async fn fetch(client: Arc<SheetsClient>) -> Result<Self> {
        let resource: SpreadsheetResource = client.fetch_spreadsheet().await?;
        Ok(Self {
            client,
            properties: resource.properties,
            spreadsheet_url: resource.spreadsheet_url,
            sheets: resource.sheets,
        })
    }

    pub fn spreadsheet_id(&self) -> &SpreadsheetId {
        self.client.spreadsheet_id()
    }

    pub fn properties(&self) -> Option<&SpreadsheetProperties> {
        self.properties.as_ref()
    }

    pub fn spreadsheet_url(&self) -> Option<&str> {
        self.spreadsheet_url.as_deref()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn client(&self) -> &Arc<SheetsClient> {
        &self.client
    }

    /// The sheet titled `title`, if any.
    pub fn sheet_for_title(&self, title: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.properties.title == title)
    }

    /// Overwrites cells starting at `from`.
    pub async fn write_rows(
        &self,
        sheet_id: SheetId,
        rows: &[Vec<String>],
        from: &Location,
    ) -> Result<BatchUpdateResponse> {
        self.client
            .batch_update(Operation::update_cells(sheet_id, rows, from))
            .await
    }

    /// Adds a sheet and records it in [`sheets`](Self::sheets).
    pub async fn create_sheet(
        &mut self,
        title: &str,
        grid: Option<GridProperties>,
    ) -> Result<BatchUpdateResponse> {
        let response = self.client.batch_update(Operation::add_sheet(title, grid)).await?;
        let properties = response
            .added_sheet()
            .cloned()
            .ok_or_else(|| Error::UnexpectedResponse("addSheet reply missing".to_string()))?;
        self.sheets.push(Sheet::new(properties));
        Ok(response)
    }

    /// Deletes a sheet and drops it from [`sheets`](Self::sheets).
    pub async fn delete_sheet(&mut self, sheet_id: SheetId) -> Result<BatchUpdateResponse> {
        let response = self.client.batch_update(Operation::delete_sheet(sheet_id)).await?;
        self.sheets
            .retain(|s| s.properties.sheet_id != Some(sheet_id));
        Ok(response)
    }

    /// Deletes rows or columns.
    pub async fn delete_dimension(
        &self,
        sheet_id: SheetId,
        dimension: Dimension,
        range: Range<usize>,
    ) -> Result<BatchUpdateResponse> {
        self.client
            .batch_update(Operation::delete(sheet_id, dimension, range))
            .await
    }

    /// Inserts empty rows or columns.
    pub async fn insert_dimension(
        &self,
        sheet_id: SheetId,
        dimension: Dimension,
        range: Range<usize>,
    ) -> Result<BatchUpdateResponse> {
        self.client
            .batch_update(Operation::insert(sheet_id, dimension, range))
            .await
    }

    /// Appends empty rows or columns at the end of a sheet.
    pub async fn append_dimension(
        &self,
        sheet_id: SheetId,
        dimension: Dimension,
        size: usize,
    ) -> Result<BatchUpdateResponse> {
        self.client
            .batch_update(Operation::append_dimension(sheet_id, dimension, size))
            .await
    }

    /// Moves rows or columns to `destination`.
    pub async fn move_dimension(
        &self,
        sheet_id: SheetId,
        dimension: Dimension,
        range: Range<usize>,
        destination: usize,
    ) -> Result<BatchUpdateResponse> {
        self.client
            .batch_update(Operation::move_dimension(sheet_id, dimension, range, destination))
            .await
    }

    /// Appends rows after the last row with data.
    pub async fn append_rows(&self, sheet_id: SheetId, rows: &Grid) -> Result<BatchUpdateResponse> {
        self.client
            .batch_update(Operation::append_cells(sheet_id, rows))
            .await
    }

    /// Clears every entered value in a sheet.
    pub async fn clear_sheet(&self, sheet_id: SheetId) -> Result<BatchUpdateResponse> {
        self.client.batch_update(Operation::clear(sheet_id)).await
    }
}
