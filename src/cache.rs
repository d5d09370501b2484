//! # Local Sheet Cache
//!
//! The in-memory image of one sheet: a [`Grid`] of cell text plus the
//! sheet's logical [`Extent`]. Every local mutation goes through
//! [`SheetCache::apply`], which validates first and only then touches state.
//!
//! ```text
//!            extent.columns
//!          ◄───────────────►
//!        ┌───┬───┬───┬───┐  ▲
//! row 0  │ a │ b │   │   │  │
//!        ├───┼───┼───┼───┤  │
//! row 1  │ c │   │   │   │  │ extent.rows
//!        ├───┼───┼───┼───┤  │
//! row 2  │   │   │   │   │  │   (not populated: grid has 2 rows)
//!        └───┴───┴───┴───┘  ▼
//! ```
//!
//! Rows are ragged and the grid may be shorter than the extent. A cell that
//! the grid doesn't reach reads as an empty string; no operation ever needs
//! it to be materialized.
//!
//! ## Invariants
//!
//! - No accepted mutation references a row or column at or past the extent.
//! - `apply` either fully applies a mutation or returns an error with the
//!   grid and extent untouched.
//! - The extent only changes through accepted mutations.

use std::ops::Range;

use crate::error::{Error, Result};
use crate::location::Location;
use crate::operation::Operation;
use crate::types::{Dimension, Extent, SheetId};

/// Rows of cell text.
pub type Grid = Vec<Vec<String>>;

// =============================================================================
// Mutations
// =============================================================================

/// One local mutation of a sheet.
///
/// Each accepted mutation maps to exactly one remote [`Operation`].
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Append full rows below the populated region.
    AppendRows(Grid),
    /// Grow the extent by `size` along `dimension`.
    AppendDimension { dimension: Dimension, size: usize },
    /// Remove the rows or columns in `range`.
    Delete { dimension: Dimension, range: Range<usize> },
    /// Insert `range.len()` empty rows or columns at `range.start`.
    Insert { dimension: Dimension, range: Range<usize> },
    /// Relocate the block `range` so it starts at `destination`, with
    /// `destination` counted before the block is removed.
    Move {
        dimension: Dimension,
        range: Range<usize>,
        destination: usize,
    },
    /// Overwrite cells starting at `at`.
    Set { rows: Grid, at: Location },
    /// Empty the grid; the extent is kept.
    Clear,
}

impl Mutation {
    /// The remote operation equivalent to this mutation.
    pub fn to_operation(&self, sheet_id: SheetId) -> Operation {
        match self {
            Mutation::AppendRows(rows) => Operation::append_cells(sheet_id, rows),
            Mutation::AppendDimension { dimension, size } => {
                Operation::append_dimension(sheet_id, *dimension, *size)
            }
            Mutation::Delete { dimension, range } => {
                Operation::delete(sheet_id, *dimension, range.clone())
            }
            Mutation::Insert { dimension, range } => {
                Operation::insert(sheet_id, *dimension, range.clone())
            }
            Mutation::Move {
                dimension,
                range,
                destination,
            } => Operation::move_dimension(sheet_id, *dimension, range.clone(), *destination),
            Mutation::Set { rows, at } => Operation::update_cells(sheet_id, rows, at),
            Mutation::Clear => Operation::clear(sheet_id),
        }
    }
}

// =============================================================================
// Sheet Cache
// =============================================================================

/// Grid and extent of one sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetCache {
    grid: Grid,
    extent: Extent,
}

impl SheetCache {
    /// An empty sheet with a `0x0` extent.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding a remote snapshot.
    pub fn from_snapshot(grid: Grid, extent: Extent) -> Self {
        Self { grid, extent }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Text of one cell; empty for cells the grid doesn't reach.
    pub fn cell(&self, col: usize, row: usize) -> &str {
        self.grid
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Validates `mutation` and, if it is legal, applies it.
    pub fn apply(&mut self, mutation: &Mutation) -> Result<()> {
        self.validate(mutation)?;
        self.commit(mutation);
        Ok(())
    }

    /// Applies a mutation that [`validate`](Self::validate) accepted.
    pub(crate) fn commit(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::AppendRows(rows) => {
                self.grid.extend(rows.iter().cloned());
                self.extent.rows += rows.len();
            }
            Mutation::AppendDimension { dimension, size } => {
                *self.extent.along_mut(*dimension) += size;
            }
            Mutation::Delete { dimension, range } => self.delete(*dimension, range),
            Mutation::Insert { dimension, range } => self.insert(*dimension, range),
            Mutation::Move {
                range, destination, ..
            } => self.move_rows(range, *destination),
            Mutation::Set { rows, at } => self.set(rows, at),
            Mutation::Clear => self.grid.clear(),
        }
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Checks `mutation` against the current extent without touching state.
    pub fn validate(&self, mutation: &Mutation) -> Result<()> {
        match mutation {
            Mutation::AppendRows(rows) => {
                let columns = self.extent.columns;
                if let Some(row) = rows.iter().find(|r| r.len() > columns) {
                    return Err(Error::OutOfBounds {
                        dimension: Dimension::Columns,
                        index: row.len() - 1,
                        limit: columns,
                    });
                }
                self.grown(Dimension::Rows, rows.len()).map(|_| ())
            }
            Mutation::AppendDimension { dimension, size } => {
                self.grown(*dimension, *size).map(|_| ())
            }
            Mutation::Clear => Ok(()),
            Mutation::Delete { dimension, range } => {
                check_range(*dimension, range)?;
                self.check_within(*dimension, range.end - 1)
            }
            Mutation::Insert { dimension, range } => {
                check_range(*dimension, range)?;
                // Inserting at the extent appends.
                if range.start > self.extent.along(*dimension) {
                    return Err(self.out_of_bounds(*dimension, range.start));
                }
                self.grown(*dimension, range.len()).map(|_| ())
            }
            Mutation::Move {
                dimension,
                range,
                destination,
            } => {
                if *dimension == Dimension::Columns {
                    return Err(Error::NotImplemented("column move"));
                }
                check_range(*dimension, range)?;
                if range.contains(destination) {
                    return Err(Error::InvalidMove {
                        dimension: *dimension,
                        start: range.start,
                        end: range.end,
                        destination: *destination,
                    });
                }
                self.check_within(*dimension, range.end - 1)?;
                // Moving to the extent puts the block last.
                if *destination > self.extent.along(*dimension) {
                    return Err(self.out_of_bounds(*dimension, *destination));
                }
                Ok(())
            }
            Mutation::Set { rows, at } => {
                let (col, row) = grid_origin(at)?;
                if rows.is_empty() {
                    return Ok(());
                }
                self.check_span(Dimension::Rows, row, rows.len())?;
                for r in rows.iter().filter(|r| !r.is_empty()) {
                    self.check_span(Dimension::Columns, col, r.len())?;
                }
                Ok(())
            }
        }
    }

    /// Checks that `len >= 1` cells starting at `start` fit in the extent.
    fn check_span(&self, dimension: Dimension, start: usize, len: usize) -> Result<()> {
        let last = start
            .checked_add(len - 1)
            .ok_or_else(|| self.out_of_bounds(dimension, usize::MAX))?;
        self.check_within(dimension, last)
    }

    /// The count along `dimension` after growing it by `by`, capped at
    /// [`Extent::max_along`].
    fn grown(&self, dimension: Dimension, by: usize) -> Result<usize> {
        let current = self.extent.along(dimension);
        let limit = Extent::max_along(dimension);
        match current.checked_add(by) {
            Some(len) if len <= limit => Ok(len),
            _ => Err(Error::OutOfBounds {
                dimension,
                index: current.saturating_add(by).saturating_sub(1),
                limit,
            }),
        }
    }

    fn check_within(&self, dimension: Dimension, index: usize) -> Result<()> {
        if index >= self.extent.along(dimension) {
            return Err(self.out_of_bounds(dimension, index));
        }
        Ok(())
    }

    fn out_of_bounds(&self, dimension: Dimension, index: usize) -> Error {
        Error::OutOfBounds {
            dimension,
            index,
            limit: self.extent.along(dimension),
        }
    }

    // =========================================================================
    // Application (validated input only)
    // =========================================================================

    fn delete(&mut self, dimension: Dimension, range: &Range<usize>) {
        match dimension {
            Dimension::Rows => {
                let len = self.grid.len();
                self.grid.drain(range.start.min(len)..range.end.min(len));
            }
            Dimension::Columns => {
                for row in &mut self.grid {
                    let len = row.len();
                    row.drain(range.start.min(len)..range.end.min(len));
                }
            }
        }
        *self.extent.along_mut(dimension) -= range.len();
    }

    fn insert(&mut self, dimension: Dimension, range: &Range<usize>) {
        let count = range.len();
        match dimension {
            Dimension::Rows => {
                if range.start < self.grid.len() {
                    let tail = self.grid.split_off(range.start);
                    self.grid.extend(std::iter::repeat_with(Vec::new).take(count));
                    self.grid.extend(tail);
                }
            }
            Dimension::Columns => {
                for row in self.grid.iter_mut().filter(|r| r.len() > range.start) {
                    let tail = row.split_off(range.start);
                    row.extend(std::iter::repeat(String::new()).take(count));
                    row.extend(tail);
                }
            }
        }
        *self.extent.along_mut(dimension) += count;
    }

    fn move_rows(&mut self, range: &Range<usize>, destination: usize) {
        let needed = range.end.max(destination);
        if self.grid.len() < needed {
            self.grid.resize_with(needed, Vec::new);
        }

        let block: Grid = self.grid.drain(range.clone()).collect();
        let at = if destination < range.start {
            destination
        } else {
            destination - block.len()
        };
        let tail = self.grid.split_off(at);
        self.grid.extend(block);
        self.grid.extend(tail);
    }

    fn set(&mut self, rows: &Grid, at: &Location) {
        let (col, row) = at.celled();
        if rows.is_empty() {
            return;
        }
        if self.grid.len() < row + rows.len() {
            self.grid.resize_with(row + rows.len(), Vec::new);
        }
        for (target, values) in self.grid[row..].iter_mut().zip(rows) {
            if values.is_empty() {
                continue;
            }
            if target.len() < col + values.len() {
                target.resize(col + values.len(), String::new());
            }
            target[col..col + values.len()].clone_from_slice(values);
        }
    }
}

/// Rejects empty or reversed ranges.
fn check_range(dimension: Dimension, range: &Range<usize>) -> Result<()> {
    if range.start >= range.end {
        return Err(Error::InvalidRange {
            dimension,
            start: range.start,
            end: range.end,
        });
    }
    Ok(())
}

/// The top-left cell of a write; unset components mean `0`.
fn grid_origin(at: &Location) -> Result<(usize, usize)> {
    match at {
        Location::Grid { .. } => Ok(at.celled()),
        Location::Named(name) => Err(Error::Format(format!(
            "cannot write to named range '{name}' locally"
        ))),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Grid {
        data.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn cache(grid: &[&[&str]], columns: usize, row_count: usize) -> SheetCache {
        SheetCache::from_snapshot(rows(grid), Extent::new(columns, row_count))
    }

    #[test]
    fn test_append_rows() {
        let mut c = cache(&[&["a", "b"]], 2, 1);
        c.apply(&Mutation::AppendRows(rows(&[&["c"], &["d", "e"]]))).unwrap();
        assert_eq!(c.grid(), &rows(&[&["a", "b"], &["c"], &["d", "e"]]));
        assert_eq!(c.extent(), Extent::new(2, 3));
    }

    #[test]
    fn test_append_row_wider_than_extent_fails() {
        let mut c = cache(&[], 2, 0);
        let before = c.clone();
        let err = c
            .apply(&Mutation::AppendRows(rows(&[&["a"], &["a", "b", "c"]])))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfBounds { dimension: Dimension::Columns, index: 2, limit: 2 }
        ));
        assert_eq!(c, before);
    }

    #[test]
    fn test_set_on_empty_sheet_fails() {
        let mut c = SheetCache::new();
        let err = c
            .apply(&Mutation::Set { rows: rows(&[&["x"]]), at: Location::ORIGIN })
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(c, SheetCache::new());
    }

    #[test]
    fn test_set_grows_grid_not_extent() {
        let mut c = SheetCache::new();
        c.apply(&Mutation::AppendDimension { dimension: Dimension::Rows, size: 3 }).unwrap();
        c.apply(&Mutation::AppendDimension { dimension: Dimension::Columns, size: 4 }).unwrap();
        c.apply(&Mutation::Set { rows: rows(&[&["a", "b"]]), at: Location::cell(1, 2) })
            .unwrap();
        assert_eq!(c.grid(), &rows(&[&[], &[], &["", "a", "b"]]));
        assert_eq!(c.extent(), Extent::new(4, 3));
        assert_eq!(c.cell(2, 2), "b");
        assert_eq!(c.cell(3, 0), "");
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let mut c = cache(&[&["a", "b", "c"], &["d"]], 3, 2);
        c.apply(&Mutation::Set { rows: rows(&[&["X"], &["Y", "Z"]]), at: Location::cell(1, 0) })
            .unwrap();
        assert_eq!(c.grid(), &rows(&[&["a", "X", "c"], &["d", "Y", "Z"]]));
    }

    #[test]
    fn test_set_past_column_extent_is_atomic() {
        let mut c = cache(&[&["a"]], 2, 2);
        let before = c.clone();
        // First row fits, second doesn't: nothing may be written.
        let err = c
            .apply(&Mutation::Set { rows: rows(&[&["x"], &["y", "z"]]), at: Location::cell(1, 0) })
            .unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { dimension: Dimension::Columns, index: 2, .. }));
        assert_eq!(c, before);
    }

    #[test]
    fn test_set_named_location_rejected() {
        let mut c = cache(&[], 5, 5);
        let err = c
            .apply(&Mutation::Set { rows: rows(&[&["x"]]), at: Location::named("Totals") })
            .unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_delete_rows_and_columns() {
        let mut c = cache(&[&["a", "b", "c"], &["d", "e"], &["f"]], 3, 4);
        c.apply(&Mutation::Delete { dimension: Dimension::Rows, range: 1..2 }).unwrap();
        assert_eq!(c.grid(), &rows(&[&["a", "b", "c"], &["f"]]));
        assert_eq!(c.extent(), Extent::new(3, 3));

        c.apply(&Mutation::Delete { dimension: Dimension::Columns, range: 0..2 }).unwrap();
        assert_eq!(c.grid(), &rows(&[&["c"], &[]]));
        assert_eq!(c.extent(), Extent::new(1, 3));
    }

    #[test]
    fn test_delete_past_extent_fails() {
        let mut c = cache(&[&["a"]], 1, 2);
        let err = c
            .apply(&Mutation::Delete { dimension: Dimension::Rows, range: 1..3 })
            .unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { dimension: Dimension::Rows, index: 2, limit: 2 }));
    }

    #[test]
    fn test_empty_range_rejected() {
        let mut c = cache(&[], 3, 3);
        let err = c
            .apply(&Mutation::Insert { dimension: Dimension::Rows, range: 2..2 })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRange { start: 2, end: 2, .. }));
    }

    #[test]
    fn test_insert_shifts_data() {
        let mut c = cache(&[&["a", "b"], &["c", "d"]], 2, 2);
        c.apply(&Mutation::Insert { dimension: Dimension::Rows, range: 1..3 }).unwrap();
        assert_eq!(c.grid(), &rows(&[&["a", "b"], &[], &[], &["c", "d"]]));
        assert_eq!(c.extent(), Extent::new(2, 4));

        c.apply(&Mutation::Insert { dimension: Dimension::Columns, range: 1..2 }).unwrap();
        assert_eq!(c.grid(), &rows(&[&["a", "", "b"], &[], &[], &["c", "", "d"]]));
        assert_eq!(c.extent(), Extent::new(3, 4));
    }

    #[test]
    fn test_insert_at_extent_appends() {
        let mut c = cache(&[&["a"]], 1, 1);
        c.apply(&Mutation::Insert { dimension: Dimension::Rows, range: 1..2 }).unwrap();
        assert_eq!(c.extent(), Extent::new(1, 2));
        let err = c
            .apply(&Mutation::Insert { dimension: Dimension::Rows, range: 5..6 })
            .unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { index: 5, .. }));
    }

    #[test]
    fn test_append_then_delete_columns_round_trip() {
        let mut c = cache(&[&["a", "b"], &["c"]], 2, 2);
        let before = c.clone();
        c.apply(&Mutation::AppendDimension { dimension: Dimension::Columns, size: 3 }).unwrap();
        c.apply(&Mutation::Delete { dimension: Dimension::Columns, range: 2..5 }).unwrap();
        assert_eq!(c, before);
    }

    #[test]
    fn test_move_rows_down() {
        let mut c = cache(&[&["0"], &["1"], &["2"], &["3"], &["4"]], 1, 5);
        c.apply(&Mutation::Move { dimension: Dimension::Rows, range: 0..2, destination: 4 })
            .unwrap();
        assert_eq!(c.grid(), &rows(&[&["2"], &["3"], &["0"], &["1"], &["4"]]));
        assert_eq!(c.extent(), Extent::new(1, 5));
    }

    #[test]
    fn test_move_rows_up() {
        let mut c = cache(&[&["0"], &["1"], &["2"], &["3"]], 1, 4);
        c.apply(&Mutation::Move { dimension: Dimension::Rows, range: 2..4, destination: 0 })
            .unwrap();
        assert_eq!(c.grid(), &rows(&[&["2"], &["3"], &["0"], &["1"]]));
    }

    #[test]
    fn test_move_to_block_end_is_identity() {
        let mut c = cache(&[&["0"], &["1"], &["2"]], 1, 3);
        let before = c.clone();
        c.apply(&Mutation::Move { dimension: Dimension::Rows, range: 0..2, destination: 2 })
            .unwrap();
        assert_eq!(c, before);
    }

    #[test]
    fn test_move_to_extent_pads_unpopulated_rows() {
        let mut c = cache(&[&["a"], &["b"]], 1, 5);
        c.apply(&Mutation::Move { dimension: Dimension::Rows, range: 0..1, destination: 4 })
            .unwrap();
        assert_eq!(c.grid(), &rows(&[&["b"], &[], &[], &["a"]]));
    }

    #[test]
    fn test_move_into_own_range_is_invalid() {
        let mut c = cache(&[&["0"], &["1"], &["2"]], 1, 3);
        let before = c.clone();
        let err = c
            .apply(&Mutation::Move { dimension: Dimension::Rows, range: 0..2, destination: 1 })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMove { start: 0, end: 2, destination: 1, .. }));
        assert_eq!(c, before);
    }

    #[test]
    fn test_move_out_of_bounds() {
        let mut c = cache(&[&["0"], &["1"]], 1, 2);
        assert!(matches!(
            c.apply(&Mutation::Move { dimension: Dimension::Rows, range: 1..3, destination: 0 }),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            c.apply(&Mutation::Move { dimension: Dimension::Rows, range: 0..1, destination: 3 }),
            Err(Error::OutOfBounds { index: 3, .. })
        ));
    }

    #[test]
    fn test_move_columns_not_implemented() {
        let mut c = cache(&[&["a", "b"]], 2, 1);
        let err = c
            .apply(&Mutation::Move { dimension: Dimension::Columns, range: 0..1, destination: 2 })
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_clear_keeps_extent() {
        let mut c = cache(&[&["a", "b"]], 2, 3);
        c.apply(&Mutation::Clear).unwrap();
        assert!(c.grid().is_empty());
        assert_eq!(c.extent(), Extent::new(2, 3));
    }

    #[test]
    fn test_mutation_to_operation() {
        let id = SheetId::from_raw(7);
        let op = Mutation::Move { dimension: Dimension::Rows, range: 1..3, destination: 0 }
            .to_operation(id);
        assert_eq!(op.name(), "moveDimension");
        assert_eq!(op.sheet_id(), Some(id));
        assert_eq!(Mutation::Clear.to_operation(id), Operation::clear(id));
    }

    #[test]
    fn test_set_at_huge_column_is_out_of_bounds() {
        let mut c = cache(&[&["a"]], 3, 3);
        let before = c.clone();
        let err = c
            .apply(&Mutation::Set { rows: rows(&[&["a", "b"]]), at: Location::cell(usize::MAX, 0) })
            .unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { dimension: Dimension::Columns, .. }));

        let err = c
            .apply(&Mutation::Set { rows: rows(&[&["a"], &["b"]]), at: Location::cell(0, usize::MAX) })
            .unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { dimension: Dimension::Rows, .. }));

        // A column parsed from user text lands far past any extent.
        let far = Location::parse("ZZZZZZZZZZZZZ1").unwrap();
        let err = c
            .apply(&Mutation::Set { rows: rows(&[&["a", "b"]]), at: far })
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(c, before);
    }

    #[test]
    fn test_growth_past_limit_is_out_of_bounds() {
        let mut c = cache(&[&["a"], &["b"]], 3, 3);
        let before = c.clone();

        let err = c
            .apply(&Mutation::AppendDimension { dimension: Dimension::Rows, size: usize::MAX })
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfBounds { dimension: Dimension::Rows, limit: Extent::MAX_ROWS, .. }
        ));

        let err = c
            .apply(&Mutation::Insert { dimension: Dimension::Rows, range: 1..usize::MAX })
            .unwrap_err();
        assert!(err.is_validation());

        let err = c
            .apply(&Mutation::AppendDimension {
                dimension: Dimension::Columns,
                size: Extent::MAX_COLUMNS,
            })
            .unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { dimension: Dimension::Columns, .. }));
        assert_eq!(c, before);

        // Up to the limit is fine, and later inserts still validate.
        c.apply(&Mutation::AppendDimension {
            dimension: Dimension::Columns,
            size: Extent::MAX_COLUMNS - 3,
        })
        .unwrap();
        assert_eq!(c.extent().columns, Extent::MAX_COLUMNS);
        assert!(c
            .apply(&Mutation::Insert { dimension: Dimension::Columns, range: 0..5 })
            .is_err());
        c.apply(&Mutation::Insert { dimension: Dimension::Rows, range: 0..5 }).unwrap();
        assert_eq!(c.extent().rows, 8);
    }
}
