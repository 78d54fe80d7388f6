//! Shared XLSX specification models.

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification.
///
/// Every field is optional so formats can be layered with [`SpecCellFormat::merge`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Top border override.
    pub top: Option<i64>,
    /// Bottom border override.
    pub bottom: Option<i64>,
    /// Left border override.
    pub left: Option<i64>,
    /// Right border override.
    pub right: Option<i64>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            top: other.top.or(self.top),
            bottom: other.bottom.or(self.bottom),
            left: other.left.or(self.left),
            right: other.right.or(self.right),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }

    /// Overlay side borders, keeping every other property.
    pub fn with_border(&self, border: &SpecCellBorder) -> SpecCellFormat {
        self.merge(&SpecCellFormat {
            top: Some(border.top),
            bottom: Some(border.bottom),
            left: Some(border.left),
            right: Some(border.right),
            ..Default::default()
        })
    }
}

/// Border tuple for top/bottom/left/right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecCellBorder {
    /// Top border style.
    pub top: i64,
    /// Bottom border style.
    pub bottom: i64,
    /// Left border style.
    pub left: i64,
    /// Right border style.
    pub right: i64,
}

impl SpecCellBorder {
    /// Same style on all four sides.
    pub fn uniform(style: i64) -> Self {
        Self {
            top: style,
            bottom: style,
            left: style,
            right: style,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValueSpecification

/// Cell value held by the sheet model and the raw sheet grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Formula text without the leading `=`.
    Formula(String),
}

impl EnumCellValue {
    /// Whether the cell is blank (missing or whitespace-only text).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(s) => s.trim().is_empty(),
            Self::Number(_) => false,
            Self::Formula(f) => f.trim().is_empty(),
        }
    }

    /// Display text; numbers print without a trailing `.0` when integral.
    pub fn to_text(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::String(s) => s.clone(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Self::Formula(f) => format!("={f}"),
        }
    }

    /// Numeric view: numbers as-is, numeric-looking text parsed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Self::None
        } else {
            Self::String(value.to_string())
        }
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Self::None
        } else {
            Self::String(value)
        }
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetModelSpecification

/// Inclusive rectangular merge range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecMergeRange {
    /// First row (inclusive).
    pub row_start: usize,
    /// First column (inclusive).
    pub col_start: usize,
    /// Last row (inclusive).
    pub row_end: usize,
    /// Last column (inclusive).
    pub col_end: usize,
}

impl SpecMergeRange {
    /// Create a range, normalizing reversed corners.
    pub fn new(row_start: usize, col_start: usize, row_end: usize, col_end: usize) -> Self {
        Self {
            row_start: row_start.min(row_end),
            col_start: col_start.min(col_end),
            row_end: row_start.max(row_end),
            col_end: col_start.max(col_end),
        }
    }

    /// Single-column vertical range.
    pub fn vertical(col: usize, row_start: usize, row_end: usize) -> Self {
        Self::new(row_start, col, row_end, col)
    }

    /// Whether two ranges share at least one cell.
    pub fn overlaps(&self, other: &SpecMergeRange) -> bool {
        self.row_start <= other.row_end
            && other.row_start <= self.row_end
            && self.col_start <= other.col_end
            && other.col_start <= self.col_end
    }

    /// Whether `(row, col)` lies inside the range.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.row_start..=self.row_end).contains(&row)
            && (self.col_start..=self.col_end).contains(&col)
    }

    /// Whether the range covers exactly one cell.
    pub fn is_single_cell(&self) -> bool {
        self.row_start == self.row_end && self.col_start == self.col_end
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Errors raised while reading, editing or rendering workbooks.
#[derive(Debug, Error)]
pub enum XlsxModelError {
    /// The workbook bytes could not be decoded.
    #[error("failed to open workbook: {0}")]
    Open(String),
    /// The workbook has no worksheets.
    #[error("workbook contains no worksheets")]
    EmptyWorkbook,
    /// A requested worksheet is missing.
    #[error("worksheet {name:?} not found; available sheets: {}", available.join(", "))]
    SheetNotFound {
        /// Requested worksheet name.
        name: String,
        /// Worksheet names present in the workbook.
        available: Vec<String>,
    },
    /// A worksheet could not be read.
    #[error("failed to read worksheet {name:?}: {message}")]
    Read {
        /// Worksheet name.
        name: String,
        /// Underlying error text.
        message: String,
    },
    /// A merge could not be applied even after unmerging the colliding ranges.
    #[error("cannot merge {range:?}: {message}")]
    Merge {
        /// Requested range.
        range: SpecMergeRange,
        /// Reason.
        message: String,
    },
    /// Rendering with `rust_xlsxwriter` failed.
    #[error("xlsx write error: {0}")]
    Write(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-render report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Unique sheet names written to the workbook, in order.
    pub sheets: Vec<String>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
