//! In-memory worksheet model: values, per-cell formats and merges.
//!
//! Templates are loaded into a [`SheetModel`], edited (row insertion, style
//! copy, merges, cleanup) and finally rendered by [`crate::writer::XlsxWriter`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::spec::{
    EnumCellValue, SpecCellBorder, SpecCellFormat, SpecMergeRange, XlsxModelError,
};

static EMPTY_CELL_VALUE: EnumCellValue = EnumCellValue::None;

static CELL_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\$?[A-Z]{1,3})(\$?)(\d+)").expect("cell reference pattern compiles")
});

/// One stored cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetCell {
    /// Cell value.
    pub value: EnumCellValue,
    /// Explicit format; `None` renders with the workbook default.
    pub format: Option<SpecCellFormat>,
}

/// Editable worksheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetModel {
    name: String,
    cells: BTreeMap<(usize, usize), SpecSheetCell>,
    merges: Vec<SpecMergeRange>,
    col_widths: BTreeMap<usize, f64>,
    row_heights: BTreeMap<usize, f64>,
}

impl SheetModel {
    /// Create an empty sheet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    ////////////////////////////////////////////////////////////////////////////
    // #region CellAccess

    /// Bounds-free accessor; unknown cells read as [`EnumCellValue::None`].
    pub fn value(&self, row: usize, col: usize) -> &EnumCellValue {
        self.cells
            .get(&(row, col))
            .map(|cell| &cell.value)
            .unwrap_or(&EMPTY_CELL_VALUE)
    }

    pub fn format(&self, row: usize, col: usize) -> Option<&SpecCellFormat> {
        self.cells.get(&(row, col)).and_then(|cell| cell.format.as_ref())
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&SpecSheetCell> {
        self.cells.get(&(row, col))
    }

    /// Iterate stored cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (&(usize, usize), &SpecSheetCell)> {
        self.cells.iter()
    }

    /// Set a value, keeping the cell's existing format.
    pub fn set_value(&mut self, row: usize, col: usize, value: impl Into<EnumCellValue>) {
        self.cells.entry((row, col)).or_default().value = value.into();
    }

    /// Set a format, keeping the cell's existing value.
    pub fn set_format(&mut self, row: usize, col: usize, format: SpecCellFormat) {
        self.cells.entry((row, col)).or_default().format = Some(format);
    }

    /// Set value and format together.
    pub fn write(
        &mut self,
        row: usize,
        col: usize,
        value: impl Into<EnumCellValue>,
        format: SpecCellFormat,
    ) {
        self.cells.insert(
            (row, col),
            SpecSheetCell {
                value: value.into(),
                format: Some(format),
            },
        );
    }

    /// Overlay `patch` onto the cell's current format.
    pub fn patch_format(&mut self, row: usize, col: usize, patch: &SpecCellFormat) {
        let cell = self.cells.entry((row, col)).or_default();
        let fmt_base = cell.format.clone().unwrap_or_default();
        cell.format = Some(fmt_base.merge(patch));
    }

    /// Blank the value, keep the format.
    pub fn clear_value(&mut self, row: usize, col: usize) {
        if let Some(cell) = self.cells.get_mut(&(row, col)) {
            cell.value = EnumCellValue::None;
        }
    }

    /// Drop the cell entirely (value and format).
    pub fn remove_cell(&mut self, row: usize, col: usize) {
        self.cells.remove(&(row, col));
    }

    /// Positions of non-empty cells whose trimmed text equals `text` (case-insensitive).
    pub fn find_text(&self, text: &str) -> Vec<(usize, usize)> {
        let c_needle = text.trim().to_lowercase();
        self.cells
            .iter()
            .filter(|(_, cell)| match &cell.value {
                EnumCellValue::String(s) => s.trim().to_lowercase() == c_needle,
                _ => false,
            })
            .map(|(pos, _)| *pos)
            .collect()
    }

    /// Highest row index holding a cell or merge.
    pub fn max_row(&self) -> Option<usize> {
        let n_cells = self.cells.keys().map(|(row, _)| *row).max();
        let n_merges = self.merges.iter().map(|merge| merge.row_end).max();
        n_cells.into_iter().chain(n_merges).max()
    }

    /// Highest column index holding a cell or merge.
    pub fn max_col(&self) -> Option<usize> {
        let n_cells = self.cells.keys().map(|(_, col)| *col).max();
        let n_merges = self.merges.iter().map(|merge| merge.col_end).max();
        [n_cells, n_merges].into_iter().flatten().max()
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region Dimensions

    pub fn set_column_width(&mut self, col: usize, width: f64) {
        self.col_widths.insert(col, width);
    }

    pub fn column_widths(&self) -> &BTreeMap<usize, f64> {
        &self.col_widths
    }

    pub fn set_row_height(&mut self, row: usize, height: f64) {
        self.row_heights.insert(row, height);
    }

    pub fn row_heights(&self) -> &BTreeMap<usize, f64> {
        &self.row_heights
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region RowOperations

    /// Insert `n_rows` blank rows before `row_at`, shifting everything at or below it.
    ///
    /// Merges that start above `row_at` and end at or below it grow by `n_rows`.
    /// Formula references to shifted rows follow their rows.
    pub fn insert_rows(&mut self, row_at: usize, n_rows: usize) {
        if n_rows == 0 {
            return;
        }

        let dict_cells_old = std::mem::take(&mut self.cells);
        self.cells = dict_cells_old
            .into_iter()
            .map(|((row, col), mut cell)| {
                if let EnumCellValue::Formula(formula) = &cell.value {
                    cell.value = EnumCellValue::Formula(shift_formula_rows(formula, row_at, n_rows));
                }
                let n_row = if row >= row_at { row + n_rows } else { row };
                ((n_row, col), cell)
            })
            .collect();

        for merge in &mut self.merges {
            if merge.row_start >= row_at {
                merge.row_start += n_rows;
                merge.row_end += n_rows;
            } else if merge.row_end >= row_at {
                merge.row_end += n_rows;
            }
        }

        let dict_heights_old = std::mem::take(&mut self.row_heights);
        self.row_heights = dict_heights_old
            .into_iter()
            .map(|(row, height)| {
                if row >= row_at {
                    (row + n_rows, height)
                } else {
                    (row, height)
                }
            })
            .collect();
    }

    /// Copy formats (and formulas, re-pointed to `row_dst`) of `row_src` onto `row_dst`.
    ///
    /// Values other than formulas are not copied; existing values on `row_dst` are cleared.
    pub fn copy_row_style(&mut self, row_src: usize, row_dst: usize) {
        let l_cells_src: Vec<(usize, SpecSheetCell)> = self
            .cells
            .range((row_src, 0)..(row_src + 1, 0))
            .map(|((_, col), cell)| (*col, cell.clone()))
            .collect();

        for (col, cell_src) in l_cells_src {
            let value = match &cell_src.value {
                EnumCellValue::Formula(formula) => {
                    EnumCellValue::Formula(repoint_formula_row(formula, row_src, row_dst))
                }
                _ => EnumCellValue::None,
            };
            self.cells.insert(
                (row_dst, col),
                SpecSheetCell {
                    value,
                    format: cell_src.format,
                },
            );
        }

        if let Some(height) = self.row_heights.get(&row_src).copied() {
            self.row_heights.insert(row_dst, height);
        }
    }

    /// Unmerge and drop every cell in rows `row_start..=row_end`.
    ///
    /// Returns the number of merges removed.
    pub fn clear_rows(&mut self, row_start: usize, row_end: usize) -> usize {
        if row_end < row_start {
            return 0;
        }
        let n_merges_before = self.merges.len();
        self.merges
            .retain(|merge| merge.row_end < row_start || merge.row_start > row_end);
        self.cells
            .retain(|(row, _), _| *row < row_start || *row > row_end);
        self.row_heights
            .retain(|row, _| *row < row_start || *row > row_end);
        n_merges_before - self.merges.len()
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region Merges

    pub fn merges(&self) -> &[SpecMergeRange] {
        &self.merges
    }

    /// Merge covering `(row, col)`, if any.
    pub fn merge_at(&self, row: usize, col: usize) -> Option<&SpecMergeRange> {
        self.merges.iter().find(|merge| merge.contains(row, col))
    }

    /// Add a merge; fails when it overlaps an existing merge.
    pub fn merge(&mut self, range: SpecMergeRange) -> Result<(), XlsxModelError> {
        if range.is_single_cell() {
            return Err(XlsxModelError::Merge {
                range,
                message: "a merge must span more than one cell".to_string(),
            });
        }
        if let Some(existing) = self.merges.iter().find(|merge| merge.overlaps(&range)) {
            return Err(XlsxModelError::Merge {
                range,
                message: format!("overlaps existing merge {existing:?}"),
            });
        }
        self.merges.push(range);
        Ok(())
    }

    /// Remove every merge overlapping `range`; returns the removed ranges.
    pub fn unmerge_overlapping(&mut self, range: &SpecMergeRange) -> Vec<SpecMergeRange> {
        let (l_removed, l_kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.merges)
            .into_iter()
            .partition(|merge| merge.overlaps(range));
        self.merges = l_kept;
        l_removed
    }

    /// Merge, recovering from collisions by unmerging first and retrying once.
    ///
    /// Returns the number of merges that had to be removed.
    pub fn merge_or_replace(&mut self, range: SpecMergeRange) -> Result<usize, XlsxModelError> {
        match self.merge(range) {
            Ok(()) => Ok(0),
            Err(XlsxModelError::Merge { .. }) if !range.is_single_cell() => {
                let l_removed = self.unmerge_overlapping(&range);
                self.merge(range)?;
                Ok(l_removed.len())
            }
            Err(err) => Err(err),
        }
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region Borders

    /// Draw an outer box of `style` around `range`, leaving inner borders untouched.
    pub fn apply_box_border(&mut self, range: &SpecMergeRange, style: i64) {
        for row in range.row_start..=range.row_end {
            for col in range.col_start..=range.col_end {
                let mut patch = SpecCellFormat::default();
                if row == range.row_start {
                    patch.top = Some(style);
                }
                if row == range.row_end {
                    patch.bottom = Some(style);
                }
                if col == range.col_start {
                    patch.left = Some(style);
                }
                if col == range.col_end {
                    patch.right = Some(style);
                }
                if patch != SpecCellFormat::default() {
                    self.patch_format(row, col, &patch);
                }
            }
        }
    }

    /// Apply the same border on every side of every cell in `range`.
    pub fn apply_grid_border(&mut self, range: &SpecMergeRange, border: &SpecCellBorder) {
        for row in range.row_start..=range.row_end {
            for col in range.col_start..=range.col_end {
                let fmt_current = self.format(row, col).cloned().unwrap_or_default();
                self.set_format(row, col, fmt_current.with_border(border));
            }
        }
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
}

/// Re-point relative row references equal to `row_src` (zero-based) onto `row_dst`.
///
/// Absolute rows (`A$20`) are left untouched.
pub fn repoint_formula_row(formula: &str, row_src: usize, row_dst: usize) -> String {
    let c_row_src = (row_src + 1).to_string();
    let c_row_dst = (row_dst + 1).to_string();
    CELL_REF_RE
        .replace_all(formula, |caps: &Captures<'_>| {
            if caps[2].is_empty() && caps[3] == c_row_src {
                format!("{}{}", &caps[1], c_row_dst)
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Move every row reference at or below `row_at` (zero-based) down by `n_rows`.
///
/// Absolute and relative rows shift alike, as on a sheet row insertion.
pub fn shift_formula_rows(formula: &str, row_at: usize, n_rows: usize) -> String {
    CELL_REF_RE
        .replace_all(formula, |caps: &Captures<'_>| {
            match caps[3].parse::<usize>() {
                Ok(n_row) if n_row > row_at => {
                    format!("{}{}{}", &caps[1], &caps[2], n_row + n_rows)
                }
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}
