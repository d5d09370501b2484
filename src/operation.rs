//! # Remote Operations
//!
//! An [`Operation`] describes one mutation in the exact shape the remote
//! `spreadsheets/{id}:batchUpdate` endpoint accepts as a request item. A
//! batch is an ordered list of them wrapped in [`Operations`]:
//!
//! ```text
//! {
//!   "requests": [
//!     { "appendDimension": { "sheetId": 7, "dimension": "ROWS", "length": 3 } },
//!     { "updateCells": { "rows": [...], "fields": "userEnteredValue",
//!                        "start": { "sheetId": 7, "rowIndex": 0, "columnIndex": 0 } } }
//!   ]
//! }
//! ```
//!
//! ## No Validation Here
//!
//! This module is a pure data mapping. By the time an operation is built, the
//! caller has already checked it against the local sheet cache; see
//! [`SheetCache`](crate::cache::SheetCache) for the bounds rules.
//!
//! ## Immutability
//!
//! Operations are created once per accepted mutation and never edited. The
//! one exception is binding: operations recorded before a sheet's remote ID
//! is known carry [`SheetId::UNRESOLVED`], and [`Operation::bind_sheet`]
//! returns a copy carrying the resolved ID.

use std::ops::Range;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::location::Location;
use crate::schema::{GridProperties, RowData, SheetProperties};
use crate::types::{Dimension, SheetId};

/// Field mask for every cell write: only the entered value is touched.
const USER_ENTERED_VALUE: &str = "userEnteredValue";

// =============================================================================
// Request Items
// =============================================================================

/// `appendCells`: appends rows after the last row with data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendCellsRequest {
    pub sheet_id: SheetId,
    pub rows: Vec<RowData>,
    pub fields: String,
}

/// `updateCells`: overwrites cells starting at a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCellsRequest {
    pub rows: Vec<RowData>,
    pub fields: String,
    pub start: GridCoordinate,
}

/// A single cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCoordinate {
    pub sheet_id: SheetId,
    pub row_index: usize,
    pub column_index: usize,
}

/// A half-open span of rows or columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionRange {
    pub sheet_id: SheetId,
    pub dimension: Dimension,
    pub start_index: usize,
    pub end_index: usize,
}

impl DimensionRange {
    fn new(sheet_id: SheetId, dimension: Dimension, range: &Range<usize>) -> Self {
        Self {
            sheet_id,
            dimension,
            start_index: range.start,
            end_index: range.end,
        }
    }
}

/// `appendDimension`: grows the sheet at its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendDimensionRequest {
    pub sheet_id: SheetId,
    pub dimension: Dimension,
    pub length: usize,
}

/// `insertDimension`: inserts empty rows or columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertDimensionRequest {
    pub range: DimensionRange,
    pub inherit_from_before: bool,
}

/// `deleteDimension`: removes rows or columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDimensionRequest {
    pub range: DimensionRange,
}

/// `moveDimension`: relocates a block of rows or columns.
///
/// `destination_index` is measured before the source block is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveDimensionRequest {
    pub source: DimensionRange,
    pub destination_index: usize,
}

/// `addSheet`: creates a sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSheetRequest {
    pub properties: SheetProperties,
}

/// `deleteSheet`: removes a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSheetRequest {
    pub sheet_id: SheetId,
}

/// Whole-sheet range used by the clear request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRange {
    pub sheet_id: SheetId,
}

/// Clears every entered value in a sheet; sent as `updateCells` with no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearRequest {
    pub range: SheetRange,
    pub fields: &'static str,
}

// =============================================================================
// Operation
// =============================================================================

/// One batch-update request item.
///
/// # Wire Format
///
/// Serialized as a single-key object whose key names the request type
/// (`{"appendCells": {...}}`). [`Operation::Clear`] is sent under the
/// `updateCells` key with a whole-sheet range and no rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    AppendCells(AppendCellsRequest),
    UpdateCells(UpdateCellsRequest),
    AppendDimension(AppendDimensionRequest),
    InsertDimension(InsertDimensionRequest),
    DeleteDimension(DeleteDimensionRequest),
    MoveDimension(MoveDimensionRequest),
    AddSheet(AddSheetRequest),
    DeleteSheet(DeleteSheetRequest),
    Clear(ClearRequest),
}

impl Operation {
    /// Appends `rows` after the last row with data.
    pub fn append_cells(sheet_id: SheetId, rows: &[Vec<String>]) -> Self {
        Operation::AppendCells(AppendCellsRequest {
            sheet_id,
            rows: rows.iter().map(|r| RowData::from_texts(r)).collect(),
            fields: USER_ENTERED_VALUE.to_string(),
        })
    }

    /// Overwrites cells starting at `start` (unset components mean `0`).
    pub fn update_cells(sheet_id: SheetId, rows: &[Vec<String>], start: &Location) -> Self {
        let (column_index, row_index) = start.celled();
        Operation::UpdateCells(UpdateCellsRequest {
            rows: rows.iter().map(|r| RowData::from_texts(r)).collect(),
            fields: USER_ENTERED_VALUE.to_string(),
            start: GridCoordinate {
                sheet_id,
                row_index,
                column_index,
            },
        })
    }

    /// Appends `length` empty rows or columns.
    pub fn append_dimension(sheet_id: SheetId, dimension: Dimension, length: usize) -> Self {
        Operation::AppendDimension(AppendDimensionRequest {
            sheet_id,
            dimension,
            length,
        })
    }

    /// Inserts `range.len()` empty rows or columns at `range.start`.
    pub fn insert(sheet_id: SheetId, dimension: Dimension, range: Range<usize>) -> Self {
        Operation::InsertDimension(InsertDimensionRequest {
            range: DimensionRange::new(sheet_id, dimension, &range),
            inherit_from_before: false,
        })
    }

    /// Deletes the rows or columns in `range`.
    pub fn delete(sheet_id: SheetId, dimension: Dimension, range: Range<usize>) -> Self {
        Operation::DeleteDimension(DeleteDimensionRequest {
            range: DimensionRange::new(sheet_id, dimension, &range),
        })
    }

    /// Moves the rows or columns in `range` to `destination`.
    pub fn move_dimension(
        sheet_id: SheetId,
        dimension: Dimension,
        range: Range<usize>,
        destination: usize,
    ) -> Self {
        Operation::MoveDimension(MoveDimensionRequest {
            source: DimensionRange::new(sheet_id, dimension, &range),
            destination_index: destination,
        })
    }

    /// Creates a sheet titled `title`, optionally with an initial grid size.
    pub fn add_sheet(title: impl Into<String>, grid: Option<GridProperties>) -> Self {
        Operation::AddSheet(AddSheetRequest {
            properties: SheetProperties {
                grid_properties: grid,
                ..SheetProperties::titled(title)
            },
        })
    }

    /// Deletes the sheet.
    pub fn delete_sheet(sheet_id: SheetId) -> Self {
        Operation::DeleteSheet(DeleteSheetRequest { sheet_id })
    }

    /// Clears every entered value in the sheet.
    pub fn clear(sheet_id: SheetId) -> Self {
        Operation::Clear(ClearRequest {
            range: SheetRange { sheet_id },
            fields: USER_ENTERED_VALUE,
        })
    }

    /// The request type as spelled on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::AppendCells(_) => "appendCells",
            Operation::UpdateCells(_) | Operation::Clear(_) => "updateCells",
            Operation::AppendDimension(_) => "appendDimension",
            Operation::InsertDimension(_) => "insertDimension",
            Operation::DeleteDimension(_) => "deleteDimension",
            Operation::MoveDimension(_) => "moveDimension",
            Operation::AddSheet(_) => "addSheet",
            Operation::DeleteSheet(_) => "deleteSheet",
        }
    }

    /// The sheet this operation targets; `None` for `addSheet`.
    pub fn sheet_id(&self) -> Option<SheetId> {
        match self {
            Operation::AppendCells(r) => Some(r.sheet_id),
            Operation::UpdateCells(r) => Some(r.start.sheet_id),
            Operation::AppendDimension(r) => Some(r.sheet_id),
            Operation::InsertDimension(r) => Some(r.range.sheet_id),
            Operation::DeleteDimension(r) => Some(r.range.sheet_id),
            Operation::MoveDimension(r) => Some(r.source.sheet_id),
            Operation::AddSheet(_) => None,
            Operation::DeleteSheet(r) => Some(r.sheet_id),
            Operation::Clear(r) => Some(r.range.sheet_id),
        }
    }

    /// Returns a copy targeting `sheet_id` if this one is unresolved.
    ///
    /// Operations that already name a resolved sheet are returned unchanged.
    pub fn bind_sheet(&self, sheet_id: SheetId) -> Operation {
        let mut op = self.clone();
        if op.sheet_id().is_some_and(|id| id.is_resolved()) {
            return op;
        }
        match &mut op {
            Operation::AppendCells(r) => r.sheet_id = sheet_id,
            Operation::UpdateCells(r) => r.start.sheet_id = sheet_id,
            Operation::AppendDimension(r) => r.sheet_id = sheet_id,
            Operation::InsertDimension(r) => r.range.sheet_id = sheet_id,
            Operation::DeleteDimension(r) => r.range.sheet_id = sheet_id,
            Operation::MoveDimension(r) => r.source.sheet_id = sheet_id,
            Operation::AddSheet(_) => {}
            Operation::DeleteSheet(r) => r.sheet_id = sheet_id,
            Operation::Clear(r) => r.range.sheet_id = sheet_id,
        }
        op
    }
}

/// Serializes as `{"<requestType>": <request>}`.
///
/// # Rust Pattern: Manual Serialize
///
/// A derived externally-tagged enum would do the same for most variants,
/// but `Clear` has to share the `updateCells` key with `UpdateCells`, which
/// a derive can't express.
impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        let name = self.name();
        match self {
            Operation::AppendCells(r) => map.serialize_entry(name, r)?,
            Operation::UpdateCells(r) => map.serialize_entry(name, r)?,
            Operation::AppendDimension(r) => map.serialize_entry(name, r)?,
            Operation::InsertDimension(r) => map.serialize_entry(name, r)?,
            Operation::DeleteDimension(r) => map.serialize_entry(name, r)?,
            Operation::MoveDimension(r) => map.serialize_entry(name, r)?,
            Operation::AddSheet(r) => map.serialize_entry(name, r)?,
            Operation::DeleteSheet(r) => map.serialize_entry(name, r)?,
            Operation::Clear(r) => map.serialize_entry(name, r)?,
        }
        map.end()
    }
}

// =============================================================================
// Batch Body
// =============================================================================

/// The body of one batch-update call: operations in FIFO order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Operations {
    pub requests: Vec<Operation>,
}

impl Operations {
    /// Wraps a list of operations.
    pub fn new(requests: Vec<Operation>) -> Self {
        Self { requests }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl From<Operation> for Operations {
    fn from(op: Operation) -> Self {
        Self::new(vec![op])
    }
}

impl From<Vec<Operation>> for Operations {
    fn from(ops: Vec<Operation>) -> Self {
        Self::new(ops)
    }
}

// =============================================================================
// Tests
// =============================================================================
