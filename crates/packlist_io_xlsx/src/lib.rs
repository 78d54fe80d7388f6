//! `packlist_io_xlsx`:
//! Spreadsheet I/O kernel for the packing-list report generator.
//!
//! Modules:
//! - `conf`   : constants and default format presets
//! - `spec`   : cell values, formats, merges and errors
//! - `util`   : pure helper functions (sheet names, column letters)
//! - `model`  : editable in-memory worksheet
//! - `reader` : `calamine` based workbook decoding
//! - `writer` : `rust_xlsxwriter` based rendering
pub mod conf;
pub mod model;
pub mod reader;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_NUM_FORMAT_DECIMAL_3, EnumFmtKey, N_BORDER_MEDIUM, N_BORDER_THIN,
    N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL, derive_default_xlsx_formats,
};
pub use model::{SheetModel, SpecSheetCell, repoint_formula_row, shift_formula_rows};
pub use reader::{
    SpecRawSheet, SpecSourceWorkbook, read_raw_sheet, read_sheet_names, read_template_sheet,
    read_workbook, select_source_sheet_name,
};
pub use spec::{
    EnumCellValue, SpecCellBorder, SpecCellFormat, SpecMergeRange,
    SpecXlsxReport, XlsxModelError,
};
pub use util::{
    create_sheet_identifier, derive_column_letter, derive_contiguous_ranges,
    derive_unique_sheet_name, sanitize_sheet_name,
};
pub use writer::{XlsxWriter, render_workbook};
