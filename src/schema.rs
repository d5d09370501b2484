//! # Remote Wire Schema
//!
//! Serde models of the JSON resources exchanged with the Sheets REST API.
//! Only the fields this crate reads or writes are modelled; unknown fields
//! are ignored on decode and `None` fields are omitted on encode.
//!
//! ## Field Naming
//!
//! The API speaks camelCase JSON (`sheetId`, `gridProperties`), so every
//! struct here carries `#[serde(rename_all = "camelCase")]`.
//!
//! ## Resource Shapes
//!
//! ```text
//! Spreadsheet
//! └── sheets[]
//!     ├── properties { sheetId, title, gridProperties { rowCount, columnCount } }
//!     └── data[]
//!         └── rowData[]
//!             └── values[] { userEnteredValue { stringValue | numberValue | boolValue } }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::location::Location;
use crate::types::{Dimension, SheetId, SpreadsheetId};

// =============================================================================
// Spreadsheet
// =============================================================================

/// A spreadsheet resource as returned by `GET spreadsheets/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetResource {
    /// The ID of the spreadsheet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<SpreadsheetId>,
    /// Overall properties of the spreadsheet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<SpreadsheetProperties>,
    /// The URL of the spreadsheet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_url: Option<String>,
    /// The sheets that are part of the spreadsheet.
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

/// Properties of a spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetProperties {
    /// The title of the spreadsheet.
    pub title: String,
    /// The locale, e.g. `en_US`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// CLDR time zone, e.g. `America/New_York`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

// =============================================================================
// Sheet
// =============================================================================

/// A single sheet in a spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    /// The sheet's properties.
    pub properties: SheetProperties,
    /// Grid data, present only when requested through `fields`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<GridData>>,
}

impl Sheet {
    /// Creates a sheet without grid data.
    pub fn new(properties: SheetProperties) -> Self {
        Self {
            properties,
            data: None,
        }
    }

    /// Flattens the first grid into rows of cell text.
    pub fn rows_text(&self) -> Vec<Vec<String>> {
        self.data
            .as_ref()
            .and_then(|grids| grids.first())
            .and_then(|grid| grid.row_data.as_ref())
            .map(|rows| {
                rows.iter()
                    .map(|row| row.values.iter().map(CellData::to_text).collect())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The sheet's `(columns, rows)` extent; `(0, 0)` without grid properties.
    pub fn extent(&self) -> (usize, usize) {
        self.properties
            .grid_properties
            .as_ref()
            .map(|g| (g.column_count, g.row_count))
            .unwrap_or((0, 0))
    }
}

/// Kind of sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SheetType {
    /// Default value, do not use.
    SheetTypeUnspecified,
    /// A sheet with a grid of cells.
    Grid,
    /// A sheet holding a single object such as a chart.
    Object,
    /// A sheet connected to an external data source.
    DataSource,
}

/// Properties of a sheet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    /// The name of the sheet.
    pub title: String,
    /// The ID of the sheet; assigned by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<SheetId>,
    /// Position of the sheet among its siblings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    /// Kind of sheet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_type: Option<SheetType>,
    /// True if the sheet is hidden in the UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    /// True if the sheet is right-to-left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_to_left: Option<bool>,
    /// Row/column counts for grid sheets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_properties: Option<GridProperties>,
}

impl SheetProperties {
    /// Properties for a new sheet with the given title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Row and column counts of a grid sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProperties {
    /// Number of rows in the grid.
    #[serde(default)]
    pub row_count: usize,
    /// Number of columns in the grid.
    #[serde(default)]
    pub column_count: usize,
    /// Number of frozen rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen_row_count: Option<usize>,
    /// Number of frozen columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen_column_count: Option<usize>,
}

impl GridProperties {
    /// A grid of the given size with nothing frozen.
    pub fn new(column_count: usize, row_count: usize) -> Self {
        Self {
            row_count,
            column_count,
            frozen_row_count: None,
            frozen_column_count: None,
        }
    }
}

// =============================================================================
// Cell Data
// =============================================================================

/// Grid data of a sheet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridData {
    /// Rows, starting at the grid's start row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_data: Option<Vec<RowData>>,
}

/// One row of cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowData {
    /// Cells in the row.
    #[serde(default)]
    pub values: Vec<CellData>,
}

impl RowData {
    /// A row of string cells.
    pub fn from_texts(texts: &[String]) -> Self {
        Self {
            values: texts.iter().map(|t| CellData::text(t.clone())).collect(),
        }
    }
}

/// One cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    /// The value the user entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_entered_value: Option<ExtendedValue>,
}

impl CellData {
    /// A cell holding a string value.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            user_entered_value: Some(ExtendedValue {
                string_value: Some(value.into()),
                ..ExtendedValue::default()
            }),
        }
    }

    /// Renders the entered value as text; empty for blank cells.
    pub fn to_text(&self) -> String {
        let Some(value) = &self.user_entered_value else {
            return String::new();
        };
        if let Some(s) = &value.string_value {
            s.clone()
        } else if let Some(n) = value.number_value {
            n.to_string()
        } else if let Some(b) = value.bool_value {
            let text = if b { "TRUE" } else { "FALSE" };
            text.to_string()
        } else if let Some(f) = &value.formula_value {
            f.clone()
        } else {
            String::new()
        }
    }
}

/// The kinds of value a cell can hold.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula_value: Option<String>,
}

// =============================================================================
// Batch Update Responses
// =============================================================================

/// Response of `spreadsheets/{id}:batchUpdate`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<SpreadsheetId>,
    /// One reply per request, in request order; empty objects for requests
    /// without a reply.
    #[serde(default)]
    pub replies: Vec<Reply>,
}

impl BatchUpdateResponse {
    /// Properties of the sheet created by the first `addSheet` reply.
    pub fn added_sheet(&self) -> Option<&SheetProperties> {
        self.replies
            .iter()
            .find_map(|r| r.add_sheet.as_ref())
            .map(|a| &a.properties)
    }
}

/// A single reply inside a batch-update response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_sheet: Option<AddSheetReply>,
}

/// Reply to an `addSheet` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSheetReply {
    pub properties: SheetProperties,
}

// =============================================================================
// Values API
// =============================================================================

/// Raw shape of a `ValueRange`, before the range string is parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawValuesRange {
    #[serde(default = "default_major_dimension")]
    major_dimension: Dimension,
    range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Vec<String>>>,
}

fn default_major_dimension() -> Dimension {
    Dimension::Rows
}

/// A block of values with the range they cover (`Sheet1!A1:C3`).
///
/// The sheet name and the start/end locations are parsed once, when the
/// value is constructed or decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValuesRange", into = "RawValuesRange")]
pub struct ValuesRange {
    /// Whether `values` is a list of rows or a list of columns.
    pub major_dimension: Dimension,
    /// The A1 range string.
    pub range: String,
    /// The cell text; absent for an empty range.
    pub values: Option<Vec<Vec<String>>>,
    /// Sheet name portion of `range` (empty when the range has none).
    pub sheet: String,
    /// Top-left location of the range.
    pub start: Location,
    /// Bottom-right location of the range (equal to `start` for one cell).
    pub end: Location,
}

impl ValuesRange {
    /// Builds a values range, parsing `range` eagerly.
    pub fn new(
        major_dimension: Dimension,
        range: impl Into<String>,
        values: Option<Vec<Vec<String>>>,
    ) -> Result<Self> {
        let range = range.into();
        let (sheet, start, end) = parse_range(&range)?;
        Ok(Self {
            major_dimension,
            range,
            values,
            sheet,
            start,
            end,
        })
    }
}

impl TryFrom<RawValuesRange> for ValuesRange {
    type Error = Error;

    fn try_from(raw: RawValuesRange) -> Result<Self> {
        ValuesRange::new(raw.major_dimension, raw.range, raw.values)
    }
}

impl From<ValuesRange> for RawValuesRange {
    fn from(v: ValuesRange) -> Self {
        RawValuesRange {
            major_dimension: v.major_dimension,
            range: v.range,
            values: v.values,
        }
    }
}

/// Splits `Sheet!A1:B2` into `("Sheet", A1, B2)`.
///
/// Quoted sheet names (`'My Sheet'!A1`) are unquoted; a range without `!`
/// has an empty sheet name.
pub fn parse_range(range: &str) -> Result<(String, Location, Location)> {
    let (sheet, cells) = match range.rfind('!') {
        Some(i) => (&range[..i], &range[i + 1..]),
        None => ("", range),
    };
    let sheet = sheet
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .map(|s| s.replace("''", "'"))
        .unwrap_or_else(|| sheet.to_string());

    let mut parts = cells.splitn(2, ':');
    let start = Location::parse(parts.next().unwrap_or_default())?;
    let end = match parts.next() {
        Some(e) => Location::parse(e)?,
        None => start.clone(),
    };
    Ok((sheet, start, end))
}

/// Response of a values write.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<SpreadsheetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: usize,
    #[serde(default)]
    pub updated_columns: usize,
    #[serde(default)]
    pub updated_cells: usize,
}

// =============================================================================
// Error Bodies
// =============================================================================

/// Error envelope returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

/// Details inside [`ApiErrorBody`].
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
