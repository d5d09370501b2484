//! # Cell Locations
//!
//! A [`Location`] addresses a cell, a whole row, a whole column, or a named
//! range. Rows and columns are 0-based internally and rendered 1-based in
//! the textual forms the remote API understands:
//!
//! ```text
//! Location::cell(1, 2)   → "B3"     (A1 form)
//!                        → "R3C2"   (R1C1 form)
//! Location::column(27)   → "AB"
//! Location::row(9)       → "10"
//! ```
//!
//! ## Partial Locations
//!
//! Either component may be unset. "Row 4, any column" is how range deletes
//! and inserts express "from this row on". Unset components stay unset
//! through arithmetic; [`Location::celled`] fills them in when a concrete
//! cell is required.
//!
//! ## Invariants
//!
//! - Components are `usize`, so a location can never be negative
//! - [`Location::checked_offset`] refuses to move above or left of `A1`

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

// =============================================================================
// Location
// =============================================================================

/// A cell, row, column, or named reference in a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// Grid coordinates; either component may be unset.
    Grid {
        /// 0-based column index
        col: Option<usize>,
        /// 0-based row index
        row: Option<usize>,
    },
    /// A named range defined in the spreadsheet.
    Named(String),
}

impl Location {
    /// The top-left cell, `A1`.
    pub const ORIGIN: Location = Location::Grid {
        col: Some(0),
        row: Some(0),
    };

    /// A fully specified cell.
    pub fn cell(col: usize, row: usize) -> Self {
        Location::Grid {
            col: Some(col),
            row: Some(row),
        }
    }

    /// A whole column.
    pub fn column(col: usize) -> Self {
        Location::Grid {
            col: Some(col),
            row: None,
        }
    }

    /// A whole row.
    pub fn row(row: usize) -> Self {
        Location::Grid {
            col: None,
            row: Some(row),
        }
    }

    /// A named range.
    pub fn named(name: impl Into<String>) -> Self {
        Location::Named(name.into())
    }

    /// Column component, if this is a grid location with a column.
    pub fn col_index(&self) -> Option<usize> {
        match self {
            Location::Grid { col, .. } => *col,
            Location::Named(_) => None,
        }
    }

    /// Row component, if this is a grid location with a row.
    pub fn row_index(&self) -> Option<usize> {
        match self {
            Location::Grid { row, .. } => *row,
            Location::Named(_) => None,
        }
    }

    /// True when both components are set.
    pub fn is_celled(&self) -> bool {
        self.col_index().is_some() && self.row_index().is_some()
    }

    /// Resolves to a concrete `(col, row)`, using `0` for unset components.
    ///
    /// Named locations have no grid coordinates and resolve to `A1`.
    pub fn celled(&self) -> (usize, usize) {
        self.celled_or(0, 0)
    }

    /// Resolves to a concrete `(col, row)` with explicit defaults.
    pub fn celled_or(&self, default_col: usize, default_row: usize) -> (usize, usize) {
        (
            self.col_index().unwrap_or(default_col),
            self.row_index().unwrap_or(default_row),
        )
    }

    /// Offsets both components by signed deltas.
    ///
    /// Unset components stay unset. Returns `None` if either component would
    /// move above row 0 or left of column 0, or if this is a named location.
    pub fn checked_offset(&self, d_col: isize, d_row: isize) -> Option<Location> {
        match self {
            Location::Grid { col, row } => {
                let col = match col {
                    Some(c) => Some(c.checked_add_signed(d_col)?),
                    None => None,
                };
                let row = match row {
                    Some(r) => Some(r.checked_add_signed(d_row)?),
                    None => None,
                };
                Some(Location::Grid { col, row })
            }
            Location::Named(_) => None,
        }
    }

    /// Renders the location in R1C1 form (`R3C2`, `R3`, `C2`).
    pub fn to_r1c1(&self) -> String {
        match self {
            Location::Grid { col, row } => {
                let mut out = String::new();
                if let Some(r) = row {
                    out.push_str(&format!("R{}", r + 1));
                }
                if let Some(c) = col {
                    out.push_str(&format!("C{}", c + 1));
                }
                out
            }
            Location::Named(name) => name.clone(),
        }
    }

    /// Parses an A1 (`B3`, `AB`, `10`) or full R1C1 (`R3C2`) reference.
    ///
    /// `R3` and `C2` on their own are valid A1 references and parse as such;
    /// use [`Location::parse_r1c1`] for partial R1C1 forms.
    pub fn parse(text: &str) -> Result<Location> {
        let text = text.trim();
        if let Some(loc) = parse_full_r1c1(text) {
            return Ok(loc);
        }
        parse_a1(text).ok_or_else(|| Error::Format(text.to_string()))
    }

    /// Parses an R1C1 reference, including the partial `R3` and `C2` forms.
    pub fn parse_r1c1(text: &str) -> Result<Location> {
        let text = text.trim();
        let upper = text.to_ascii_uppercase();
        let (row_part, col_part) = match upper.find('C') {
            Some(i) => (&upper[..i], Some(&upper[i + 1..])),
            None => (upper.as_str(), None),
        };

        let row = match row_part {
            "" => None,
            r => Some(parse_one_based(r.strip_prefix('R').ok_or_else(|| Error::Format(text.to_string()))?)
                .ok_or_else(|| Error::Format(text.to_string()))?),
        };
        let col = match col_part {
            None => None,
            Some(c) => Some(parse_one_based(c).ok_or_else(|| Error::Format(text.to_string()))?),
        };

        if row.is_none() && col.is_none() {
            return Err(Error::Format(text.to_string()));
        }
        Ok(Location::Grid { col, row })
    }
}

impl Default for Location {
    fn default() -> Self {
        Location::ORIGIN
    }
}

/// Renders A1 form.
impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Grid { col, row } => {
                if let Some(c) = col {
                    write!(f, "{}", column_letters(*c))?;
                }
                if let Some(r) = row {
                    write!(f, "{}", r + 1)?;
                }
                Ok(())
            }
            Location::Named(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Location::parse(s)
    }
}

// =============================================================================
// Column Letters
// =============================================================================

/// Converts a 0-based column index to letters (`0 → A`, `26 → AA`).
pub fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Converts column letters to a 0-based index (`A → 0`, `AA → 26`).
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut index: usize = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

// =============================================================================
// Parsing Helpers
// =============================================================================

fn parse_one_based(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok()?.checked_sub(1)
}

fn parse_a1(text: &str) -> Option<Location> {
    let split = text
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(text.len());
    let (letters, digits) = text.split_at(split);

    let col = if letters.is_empty() {
        None
    } else {
        Some(column_index(letters)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        Some(parse_one_based(digits)?)
    };

    if col.is_none() && row.is_none() {
        return None;
    }
    Some(Location::Grid { col, row })
}

fn parse_full_r1c1(text: &str) -> Option<Location> {
    let upper = text.to_ascii_uppercase();
    let rest = upper.strip_prefix('R')?;
    let c = rest.find('C')?;
    let row = parse_one_based(&rest[..c])?;
    let col = parse_one_based(&rest[c + 1..])?;
    Some(Location::cell(col, row))
}

// =============================================================================
// Tests
// =============================================================================
