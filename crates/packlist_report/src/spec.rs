//! Report pipeline specification models, options and errors.

use packlist_io_xlsx::{EnumCellValue, EnumFmtKey, SheetModel, XlsxModelError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conf::{N_MATCH_DISTANCE_MAX, N_MATCH_RATIO_MIN, N_SIZES, TUP_MATERIAL_PREFIXES_ALLOWED};

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Versioned positional contract of the report template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnumTemplateVersion {
    /// Older layout: doubled SAP PO text, fewer mapped columns, `Colour` breakdown.
    #[serde(rename = "v1", alias = "v1_legacy")]
    V1Legacy,
    /// Newer layout with N..V mapping and per-group merges.
    #[default]
    #[serde(rename = "v2", alias = "v2_extended")]
    V2Extended,
}

/// Weight/volume aggregation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumWeightPolicy {
    /// Sum the first row of every carton group once.
    #[default]
    PerCartonGroup,
    /// Sum every data row regardless of grouping.
    PerRow,
}

/// Which artifacts to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumOutputMode {
    /// One single-sheet workbook per table.
    Separate,
    /// One workbook with every sheet.
    Combined,
    /// Both of the above.
    #[default]
    Both,
}

impl EnumOutputMode {
    pub fn if_separate(self) -> bool {
        matches!(self, Self::Separate | Self::Both)
    }

    pub fn if_combined(self) -> bool {
        matches!(self, Self::Combined | Self::Both)
    }
}

/// Where the PO-line / model # header cells take their value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumPoLineSource {
    /// First data row's primary SKU minus its last two characters.
    SkuTrimmed,
    /// The order number itself.
    OrderNumber,
}

/// How the SAP PO header cell is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSapPoStyle {
    /// Final (unique) sheet name.
    SheetName,
    /// `"{po} / {po}"`.
    Doubled,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Input options for [`crate::pipeline::generate_reports`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecReportOptions {
    /// Template contract.
    pub template_version: EnumTemplateVersion,
    /// Artifacts to produce.
    pub output_mode: EnumOutputMode,
    /// Weight/volume aggregation policy.
    pub weight_policy: EnumWeightPolicy,
    /// Externally supplied model name; overrides the sheet lookup.
    pub model_name: Option<String>,
    /// Maximum worker threads for per-table stages.
    pub num_workers_max: Option<usize>,
    /// Accepted prefixes of the secondary material code.
    pub material_prefixes: Vec<String>,
    /// Maximum per-cell edit distance for a header position to match.
    pub match_distance_max: usize,
    /// Minimum matched-position ratio for a header row.
    pub match_ratio_min: f64,
    /// Compare generated cells with their source values.
    pub if_strict_validation: bool,
    /// Re-derive border boxes in the combined workbook.
    pub if_combined_borders: bool,
}

impl Default for SpecReportOptions {
    fn default() -> Self {
        Self {
            template_version: EnumTemplateVersion::default(),
            output_mode: EnumOutputMode::default(),
            weight_policy: EnumWeightPolicy::default(),
            model_name: None,
            num_workers_max: None,
            material_prefixes: TUP_MATERIAL_PREFIXES_ALLOWED
                .iter()
                .map(ToString::to_string)
                .collect(),
            match_distance_max: N_MATCH_DISTANCE_MAX,
            match_ratio_min: N_MATCH_RATIO_MIN,
            if_strict_validation: true,
            if_combined_borders: true,
        }
    }
}

/// Header matching thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecMatchOptions {
    /// Maximum edit distance per position.
    pub n_distance_max: usize,
    /// Minimum matched ratio.
    pub n_ratio_min: f64,
}

impl Default for SpecMatchOptions {
    fn default() -> Self {
        Self {
            n_distance_max: N_MATCH_DISTANCE_MAX,
            n_ratio_min: N_MATCH_RATIO_MIN,
        }
    }
}

impl From<&SpecReportOptions> for SpecMatchOptions {
    fn from(options: &SpecReportOptions) -> Self {
        Self {
            n_distance_max: options.match_distance_max,
            n_ratio_min: options.match_ratio_min,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TemplateLayout

/// One source-column to destination-column copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumnMapping {
    /// Source column index in the packing-list table.
    pub n_col_src: usize,
    /// Destination column index in the report sheet.
    pub n_col_dst: usize,
    /// Field label used in validation output.
    pub c_field: &'static str,
    /// Style preset of the destination column.
    pub enum_fmt: EnumFmtKey,
}

/// Positional contract of one template version.
///
/// All row/column indices are zero-based and refer to the unfilled template.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecTemplateLayout {
    pub enum_version: EnumTemplateVersion,
    /// Worksheet name holding the template.
    pub c_sheet_name: &'static str,

    /// First data row; also the style row copied into inserted rows.
    pub n_row_data_start: usize,
    /// Table header row written by the built-in template.
    pub n_row_table_header: usize,
    /// Last row of the reserved summary/breakdown area.
    pub n_row_reserved_end: usize,

    pub n_col_carton: usize,
    pub n_col_color: usize,
    pub n_col_sku: usize,
    pub n_col_material: usize,
    /// First of the seven size columns (OS..XXL).
    pub n_col_size_start: usize,
    /// Explicit source to destination copies.
    pub l_column_mappings: Vec<SpecColumnMapping>,
    /// Destination columns merged per split carton group (carton column excluded).
    pub l_cols_merge: Vec<usize>,
    /// Destination columns rounded to three decimals.
    pub l_cols_round: Vec<usize>,

    pub cell_po_line: (usize, usize),
    pub cell_model_no: (usize, usize),
    pub cell_sap_po: (usize, usize),
    pub cell_model_name: (usize, usize),
    pub cell_ship_to: (usize, usize),
    /// Cells blanked on every generated sheet.
    pub l_cells_clear: Vec<(usize, usize)>,
    pub enum_po_line_source: EnumPoLineSource,
    pub enum_sap_po_style: EnumSapPoStyle,

    pub n_col_summary_label: usize,
    pub n_col_summary_value: usize,
    /// Blank rows between the last data row and the summary header.
    pub n_rows_summary_gap: usize,
    pub n_col_breakdown_start: usize,
    /// Breakdown header row relative to the summary header row.
    pub n_row_breakdown_offset: usize,
    pub c_breakdown_color_label: &'static str,

    /// Column widths of the built-in template.
    pub l_col_widths: Vec<(usize, f64)>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PipelineModels

/// One header occurrence plus its data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecExtractedTable {
    /// Zero-based table index in sheet order.
    pub n_table_idx: usize,
    /// Header row followed by data rows, each padded to the header length.
    pub rows: Vec<Vec<EnumCellValue>>,
    pub model_name: String,
    pub side_text: String,
    /// Absolute sheet row of the header.
    pub n_row_start: usize,
}

impl SpecExtractedTable {
    pub fn header(&self) -> &[EnumCellValue] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn data_rows(&self) -> &[Vec<EnumCellValue>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Absolute sheet row of data row `idx`.
    pub fn sheet_row_of(&self, idx: usize) -> usize {
        self.n_row_start + 1 + idx
    }
}

/// Maximal run of consecutive rows sharing one forward-filled carton id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCartonGroup {
    pub carton_id: String,
    /// First data row (inclusive, table-relative).
    pub n_row_start: usize,
    /// Last data row (inclusive, table-relative).
    pub n_row_end: usize,
    pub n_rows: usize,
}

impl SpecCartonGroup {
    pub fn if_split(&self) -> bool {
        self.n_rows > 1
    }
}

/// Forward-filled values of one data row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecNormalizedRow {
    pub carton_id: String,
    pub color: String,
    pub sku: String,
    pub material_code: String,
    /// Last known units-per-carton factor.
    pub units_factor: Option<f64>,
    /// Index into [`SpecNormalizedTable::groups`].
    pub n_group_idx: usize,
}

/// Resolved source columns (`None` when the label could not be located).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecSourceColumns {
    /// One entry per signature label.
    pub l_cols_signature: Vec<Option<usize>>,
    /// OS..XXL size-labelled columns.
    pub l_cols_size: [Option<usize>; N_SIZES],
}

impl SpecSourceColumns {
    /// Column resolved for signature position `idx`.
    pub fn col(&self, idx: usize) -> Option<usize> {
        self.l_cols_signature.get(idx).copied().flatten()
    }
}

/// Output of the row normalizer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecNormalizedTable {
    pub n_table_idx: usize,
    pub header: Vec<EnumCellValue>,
    pub data_rows: Vec<Vec<EnumCellValue>>,
    pub rows: Vec<SpecNormalizedRow>,
    pub groups: Vec<SpecCartonGroup>,
    /// Carton id to number of rows carrying it, in first-seen order.
    pub l_carton_occurrences: Vec<(String, usize)>,
    pub columns: SpecSourceColumns,
    pub model_name: String,
    pub side_text: String,
    /// Order number (`SA4 PO NO#`) of the first data row.
    pub order_number: String,
    /// Absolute sheet row of the header.
    pub n_row_start: usize,
    pub soft_issues: Vec<SpecSoftIssue>,
}

impl SpecNormalizedTable {
    pub fn n_data_rows(&self) -> usize {
        self.data_rows.len()
    }

    /// Group that data row `idx` belongs to.
    pub fn group_of(&self, idx: usize) -> Option<&SpecCartonGroup> {
        self.rows
            .get(idx)
            .and_then(|row| self.groups.get(row.n_group_idx))
    }

    /// Raw data cell, empty sentinel when out of bounds.
    pub fn raw(&self, idx: usize, col: usize) -> &EnumCellValue {
        static EMPTY: EnumCellValue = EnumCellValue::None;
        self.data_rows
            .get(idx)
            .and_then(|row| row.get(col))
            .unwrap_or(&EMPTY)
    }
}

/// Per-color unit totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecColorBreakdownEntry {
    pub color: String,
    pub size_quantities: [f64; N_SIZES],
    pub total: f64,
}

/// Shipment totals of one table.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SpecReportSummary {
    pub total_carton: f64,
    pub total_net_net_weight: f64,
    pub total_net_weight: f64,
    pub total_gross_weight: f64,
    pub total_cbm: f64,
}

/// Filled template copy plus its bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecGeneratedSheet {
    pub n_table_idx: usize,
    pub sheet: SheetModel,
    pub sheet_name: String,
    pub order_number: String,
    pub n_row_data_start: usize,
    pub n_data_rows: usize,
    pub n_row_summary: usize,
    /// Last row used by the summary or breakdown block.
    pub n_row_block_end: usize,
    /// Recovered merge collisions and cleanup notes.
    pub warnings: Vec<String>,
}

/// One produced workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub sheet_names: Vec<String>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Validation

/// Non-fatal data issue found while reading the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecSoftIssue {
    /// One-based sheet row.
    pub row: usize,
    /// Column label or letter.
    pub column: String,
    pub issue: String,
    pub value: String,
}

/// Generated cell that disagrees with its source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecStrictMismatch {
    pub order_number: String,
    /// One-based row in the generated sheet.
    pub row: usize,
    /// Column letter in the generated sheet.
    pub column: String,
    pub field_name: String,
    pub original_value: String,
    pub generated_value: String,
}

/// Validation output of one run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecValidationReport {
    pub soft_issues: Vec<SpecSoftIssue>,
    pub strict_mismatches: Vec<SpecStrictMismatch>,
}

impl SpecValidationReport {
    pub fn is_clean(&self) -> bool {
        self.soft_issues.is_empty() && self.strict_mismatches.is_empty()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Errors raised by the report pipeline.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Workbook decoding or rendering failed.
    #[error(transparent)]
    Xlsx(#[from] XlsxModelError),
    /// No row of the source sheet matched the header signature.
    #[error(
        "no packing-list header found in sheet {sheet:?} ({n_rows} rows scanned); expected a row starting with \"CASE NOS\"; available sheets: {}",
        sheet_names.join(", ")
    )]
    NoHeaderFound {
        sheet: String,
        n_rows: usize,
        sheet_names: Vec<String>,
    },
    /// Every detected table was empty or failed.
    #[error("no data rows found below {n_tables} detected header(s)")]
    NoDataRows { n_tables: usize },
    /// The template workbook lacks the report worksheet.
    #[error("template worksheet {name:?} not found; available worksheets: {}", available.join(", "))]
    TemplateSheetMissing { name: String, available: Vec<String> },
    /// Table-level layout failure.
    #[error("layout of table {n_table_idx} failed: {message}")]
    Layout { n_table_idx: usize, message: String },
    /// Invalid option value.
    #[error("invalid options: {0}")]
    Options(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
