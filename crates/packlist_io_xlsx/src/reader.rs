//! Workbook decoding with `calamine`: raw source grids and template sheet models.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx, open_workbook_auto_from_rs, open_workbook_from_rs};
use tracing::debug;

use crate::model::SheetModel;
use crate::spec::{EnumCellValue, SpecMergeRange, XlsxModelError};

static EMPTY_RAW_VALUE: EnumCellValue = EnumCellValue::None;

/// Immutable grid of one worksheet.
///
/// Positions are absolute: `rows[0]` is sheet row 1 even when the used range
/// starts lower down.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecRawSheet {
    /// Worksheet name.
    pub name: String,
    /// Row-major cells; rows may have different lengths.
    pub rows: Vec<Vec<EnumCellValue>>,
}

impl SpecRawSheet {
    /// Build a sheet from rows of values.
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<EnumCellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Row slice, empty when out of bounds.
    pub fn row(&self, row: usize) -> &[EnumCellValue] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bounds-checked accessor returning an empty sentinel.
    pub fn cell(&self, row: usize, col: usize) -> &EnumCellValue {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY_RAW_VALUE)
    }

    /// Whether every cell of `row` is blank (missing rows count as blank).
    pub fn is_row_empty(&self, row: usize) -> bool {
        self.row(row).iter().all(EnumCellValue::is_empty)
    }
}

/// Decoded upload: every sheet name plus the selected source grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecSourceWorkbook {
    /// Worksheet names in workbook order.
    pub sheet_names: Vec<String>,
    /// Grid of the selected source sheet.
    pub source_sheet: SpecRawSheet,
}

/// Source sheet choice: the second sheet when present, else the first.
pub fn select_source_sheet_name(sheet_names: &[String]) -> Option<&str> {
    sheet_names
        .get(1)
        .or_else(|| sheet_names.first())
        .map(String::as_str)
}

/// List worksheet names of a workbook held in memory.
pub fn read_sheet_names(v_bytes: &[u8]) -> Result<Vec<String>, XlsxModelError> {
    let workbook = open_workbook_auto_from_rs(Cursor::new(v_bytes.to_vec()))
        .map_err(|err| XlsxModelError::Open(err.to_string()))?;
    Ok(workbook.sheet_names())
}

/// Decode workbook bytes and read the source sheet grid.
pub fn read_workbook(v_bytes: &[u8]) -> Result<SpecSourceWorkbook, XlsxModelError> {
    let sheet_names = read_sheet_names(v_bytes)?;
    let c_source_name = select_source_sheet_name(&sheet_names)
        .ok_or(XlsxModelError::EmptyWorkbook)?
        .to_string();
    let source_sheet = read_raw_sheet(v_bytes, &c_source_name)?;
    debug!(
        sheet = %c_source_name,
        n_sheets = sheet_names.len(),
        n_rows = source_sheet.n_rows(),
        "read source sheet"
    );

    Ok(SpecSourceWorkbook {
        sheet_names,
        source_sheet,
    })
}

/// Read one worksheet into an absolute-position grid.
pub fn read_raw_sheet(v_bytes: &[u8], sheet_name: &str) -> Result<SpecRawSheet, XlsxModelError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(v_bytes.to_vec()))
        .map_err(|err| XlsxModelError::Open(err.to_string()))?;
    let l_sheet_names = workbook.sheet_names();
    if !l_sheet_names.iter().any(|name| name == sheet_name) {
        return Err(XlsxModelError::SheetNotFound {
            name: sheet_name.to_string(),
            available: l_sheet_names,
        });
    }

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|err| XlsxModelError::Read {
            name: sheet_name.to_string(),
            message: err.to_string(),
        })?;

    let Some((n_row_offset, n_col_offset)) = range.start() else {
        return Ok(SpecRawSheet::from_rows(sheet_name, Vec::new()));
    };
    let n_row_offset = n_row_offset as usize;
    let n_col_offset = n_col_offset as usize;

    let mut l_rows: Vec<Vec<EnumCellValue>> = vec![Vec::new(); n_row_offset];
    for row in range.rows() {
        let mut l_cells = vec![EnumCellValue::None; n_col_offset];
        l_cells.extend(row.iter().map(convert_calamine_value));
        while l_cells.last().is_some_and(EnumCellValue::is_empty) {
            l_cells.pop();
        }
        l_rows.push(l_cells);
    }

    Ok(SpecRawSheet::from_rows(sheet_name, l_rows))
}

/// Load worksheet `sheet_name` of an `.xlsx` template as an editable model.
///
/// Values, formulas and merges are loaded; styles are not.
pub fn read_template_sheet(
    v_bytes: &[u8],
    sheet_name: &str,
) -> Result<SheetModel, XlsxModelError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(v_bytes.to_vec()))
        .map_err(|err: calamine::XlsxError| XlsxModelError::Open(err.to_string()))?;
    let l_sheet_names = workbook.sheet_names();
    if !l_sheet_names.iter().any(|name| name == sheet_name) {
        return Err(XlsxModelError::SheetNotFound {
            name: sheet_name.to_string(),
            available: l_sheet_names,
        });
    }

    let derive_read_error = |err: calamine::XlsxError| XlsxModelError::Read {
        name: sheet_name.to_string(),
        message: err.to_string(),
    };

    let mut sheet = SheetModel::new(sheet_name);
    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(derive_read_error)?;
    let (n_row_offset, n_col_offset) = range.start().unwrap_or((0, 0));
    for (row, col, value) in range.used_cells() {
        let value = convert_calamine_value(value);
        if !value.is_empty() {
            sheet.set_value(row + n_row_offset as usize, col + n_col_offset as usize, value);
        }
    }

    let range_formula = workbook
        .worksheet_formula(sheet_name)
        .map_err(derive_read_error)?;
    let (n_row_offset, n_col_offset) = range_formula.start().unwrap_or((0, 0));
    for (row, col, formula) in range_formula.used_cells() {
        if !formula.trim().is_empty() {
            sheet.set_value(
                row + n_row_offset as usize,
                col + n_col_offset as usize,
                EnumCellValue::Formula(formula.trim_start_matches('=').to_string()),
            );
        }
    }

    if let Some(result) = workbook.worksheet_merge_cells(sheet_name) {
        for dims in result.map_err(derive_read_error)? {
            let merge = SpecMergeRange::new(
                dims.start.0 as usize,
                dims.start.1 as usize,
                dims.end.0 as usize,
                dims.end.1 as usize,
            );
            if !merge.is_single_cell() {
                sheet.merge_or_replace(merge)?;
            }
        }
    }

    debug!(
        sheet = %sheet_name,
        n_merges = sheet.merges().len(),
        "loaded template sheet"
    );
    Ok(sheet)
}

/// Strings as-is, numbers as numbers, booleans and dates as display text,
/// errors and blanks as empty.
fn convert_calamine_value(value: &Data) -> EnumCellValue {
    match value {
        Data::Empty | Data::Error(_) => EnumCellValue::None,
        Data::String(s) => EnumCellValue::from(s.as_str()),
        Data::Int(n) => EnumCellValue::Number(*n as f64),
        Data::Float(n) => EnumCellValue::Number(*n),
        Data::DateTimeIso(s) | Data::DurationIso(s) => EnumCellValue::from(s.as_str()),
        other => EnumCellValue::from(other.to_string()),
    }
}
