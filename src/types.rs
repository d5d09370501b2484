//! # Domain Types for SimpleSheet
//!
//! This module defines the small identifier types used throughout the crate.
//!
//! ## Design Philosophy: Newtypes for Safety
//!
//! A spreadsheet is addressed by an opaque string and each of its sheets by a
//! numeric ID. Both are wrapped in newtypes so a sheet ID can never be passed
//! where a row count is expected, and so the "not resolved yet" state of a
//! sheet ID has a name ([`SheetId::UNRESOLVED`]) instead of being a magic `-1`.
//!
//! ## Example
//!
//! ```rust
//! use simplesheet::types::{SheetId, SpreadsheetId};
//!
//! let spreadsheet = SpreadsheetId::new("1BxiMVs0XRA5nFMdKvBdBZjgmUUqptlbs74OgvE2upms");
//! let sheet = SheetId::from_raw(0);
//! assert!(sheet.is_resolved());
//! assert!(!SheetId::UNRESOLVED.is_resolved());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::location::Location;

// =============================================================================
// Spreadsheet Identification
// =============================================================================

/// The ID of a spreadsheet, as found in its URL.
///
/// # Rust Pattern: Newtype
///
/// `SpreadsheetId` wraps a `String`, so a sheet title can't be passed where a
/// spreadsheet ID is expected even though both are strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpreadsheetId(String);

impl SpreadsheetId {
    /// Creates a spreadsheet ID from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpreadsheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SpreadsheetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SpreadsheetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// Sheet Identification
// =============================================================================

/// The numeric ID of one sheet inside a spreadsheet.
///
/// # Sentinel Value
///
/// The remote service assigns IDs `>= 0`. Operations recorded by an
/// [`AtomicSheet`](crate::AtomicSheet) before its sheet has been found or
/// created carry [`SheetId::UNRESOLVED`]; the uploader binds them to the real
/// ID before they are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetId(i64);

impl SheetId {
    /// Placeholder for a sheet whose remote identity is not known yet.
    pub const UNRESOLVED: SheetId = SheetId(-1);

    /// Creates a SheetId from the raw value returned by the API.
    pub fn from_raw(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw value for request bodies.
    pub fn as_raw(&self) -> i64 {
        self.0
    }

    /// Returns false for [`SheetId::UNRESOLVED`].
    pub fn is_resolved(&self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_resolved() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "<unresolved>")
        }
    }
}

// =============================================================================
// Dimension
// =============================================================================

/// One of the two axes of a sheet.
///
/// Serialized the way the remote API spells it (`"ROWS"` / `"COLUMNS"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Dimension {
    /// Horizontal lines of cells.
    Rows,
    /// Vertical lines of cells.
    Columns,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Rows => write!(f, "rows"),
            Dimension::Columns => write!(f, "columns"),
        }
    }
}

// =============================================================================
// Extent
// =============================================================================

/// The logical size of a sheet: its column and row counts.
///
/// Equivalently, the exclusive bottom-right corner of the data region. Cell
/// `(col, row)` is inside the extent iff `col < columns && row < rows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent {
    pub columns: usize,
    pub rows: usize,
}

impl Extent {
    /// The empty extent.
    pub const EMPTY: Extent = Extent { columns: 0, rows: 0 };

    /// Widest grid the remote service accepts (column `ZZZ`).
    pub const MAX_COLUMNS: usize = 18_278;

    /// Tallest grid the remote service accepts (its cell cap over one column).
    pub const MAX_ROWS: usize = 10_000_000;

    pub fn new(columns: usize, rows: usize) -> Self {
        Self { columns, rows }
    }

    /// The count along `dimension`.
    pub fn along(&self, dimension: Dimension) -> usize {
        match dimension {
            Dimension::Rows => self.rows,
            Dimension::Columns => self.columns,
        }
    }

    /// The largest count allowed along `dimension`.
    pub fn max_along(dimension: Dimension) -> usize {
        match dimension {
            Dimension::Rows => Self::MAX_ROWS,
            Dimension::Columns => Self::MAX_COLUMNS,
        }
    }

    /// Mutable count along `dimension`.
    pub fn along_mut(&mut self, dimension: Dimension) -> &mut usize {
        match dimension {
            Dimension::Rows => &mut self.rows,
            Dimension::Columns => &mut self.columns,
        }
    }

    /// The extent as its exclusive bottom-right cell.
    pub fn to_location(&self) -> Location {
        Location::cell(self.columns, self.rows)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.columns, self.rows)
    }
}

// =============================================================================
// Tests
// =============================================================================
