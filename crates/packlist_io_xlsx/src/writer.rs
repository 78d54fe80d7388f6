//! XLSX writer kernel that renders [`SheetModel`]s into workbook bytes.

use std::collections::{BTreeSet, HashMap};

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use tracing::debug;

use crate::model::SheetModel;
use crate::spec::{EnumCellValue, SpecCellFormat, SpecXlsxReport, XlsxModelError};
use crate::util::{cast_col_num, cast_row_num, derive_unique_sheet_name, sanitize_sheet_name};

/// Stateful workbook writer.
///
/// The workbook is buffered in memory until [`Self::save_to_buffer`] is called.
pub struct XlsxWriter {
    workbook: Workbook,
    fmt_default: SpecCellFormat,
    dict_formats: HashMap<SpecCellFormat, Format>,
    set_sheet_names_existing: BTreeSet<String>,
    report: SpecXlsxReport,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create a writer; cells without an explicit format use `fmt_default`.
    pub fn new(fmt_default: SpecCellFormat) -> Self {
        Self {
            workbook: Workbook::new(),
            fmt_default,
            dict_formats: HashMap::new(),
            set_sheet_names_existing: BTreeSet::new(),
            report: SpecXlsxReport::default(),
            if_closed: false,
        }
    }

    /// Snapshot of sheet names written so far and warnings.
    pub fn report(&self) -> SpecXlsxReport {
        self.report.clone()
    }

    /// Render one sheet model; returns the unique worksheet name used.
    pub fn write_sheet(&mut self, sheet: &SheetModel) -> Result<String, XlsxModelError> {
        if self.if_closed {
            return Err(XlsxModelError::Write(
                "Cannot write after save_to_buffer().".to_string(),
            ));
        }

        let c_name_sanitized = sanitize_sheet_name(sheet.name(), "_");
        let c_name = derive_unique_sheet_name(&c_name_sanitized, &mut self.set_sheet_names_existing);
        if c_name != sheet.name() {
            self.report
                .warn(format!("Sheet {:?} written as {c_name:?}", sheet.name()));
        }

        let worksheet = self.workbook.add_worksheet();
        worksheet
            .set_name(&c_name)
            .map_err(derive_xlsx_error_text)
            .map_err(XlsxModelError::Write)?;
        write_sheet_model(
            worksheet,
            sheet,
            &self.fmt_default,
            &mut self.dict_formats,
        )
        .map_err(XlsxModelError::Write)?;

        debug!(
            sheet = %c_name,
            n_merges = sheet.merges().len(),
            "rendered sheet"
        );
        self.report.sheets.push(c_name.clone());
        Ok(c_name)
    }

    /// Serialize the workbook. Only one call is allowed.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, XlsxModelError> {
        if self.if_closed {
            return Err(XlsxModelError::Write(
                "Workbook already saved.".to_string(),
            ));
        }
        if self.report.sheets.is_empty() {
            return Err(XlsxModelError::Write(
                "Workbook has no sheets to save.".to_string(),
            ));
        }
        let v_bytes = self
            .workbook
            .save_to_buffer()
            .map_err(derive_xlsx_error_text)
            .map_err(XlsxModelError::Write)?;
        self.if_closed = true;
        Ok(v_bytes)
    }
}

/// Render every sheet into one workbook buffer.
pub fn render_workbook(
    l_sheets: &[&SheetModel],
    fmt_default: SpecCellFormat,
) -> Result<(Vec<u8>, SpecXlsxReport), XlsxModelError> {
    let mut writer = XlsxWriter::new(fmt_default);
    for sheet in l_sheets {
        writer.write_sheet(sheet)?;
    }
    let v_bytes = writer.save_to_buffer()?;
    Ok((v_bytes, writer.report()))
}

fn write_sheet_model(
    worksheet: &mut Worksheet,
    sheet: &SheetModel,
    fmt_default: &SpecCellFormat,
    dict_formats: &mut HashMap<SpecCellFormat, Format>,
) -> Result<(), String> {
    for (col, width) in sheet.column_widths() {
        worksheet
            .set_column_width(cast_col_num(*col)?, *width)
            .map_err(derive_xlsx_error_text)?;
    }
    for (row, height) in sheet.row_heights() {
        worksheet
            .set_row_height(cast_row_num(*row)?, *height)
            .map_err(derive_xlsx_error_text)?;
    }

    for ((row, col), cell) in sheet.cells() {
        // merged cells, anchors included, are written by merge_range below
        if sheet.merge_at(*row, *col).is_some() {
            continue;
        }
        let fmt_spec = cell.format.as_ref().unwrap_or(fmt_default);
        let format = derive_cached_format(dict_formats, fmt_spec);
        write_cell_with_format(worksheet, *row, *col, &cell.value, &format)?;
    }

    for merge in sheet.merges() {
        let cell_anchor = sheet.cell(merge.row_start, merge.col_start);
        let fmt_spec = cell_anchor
            .and_then(|cell| cell.format.as_ref())
            .unwrap_or(fmt_default);
        let format = derive_cached_format(dict_formats, fmt_spec);
        let value = sheet.value(merge.row_start, merge.col_start);
        let c_text = match value {
            EnumCellValue::String(val) => val.as_str(),
            _ => "",
        };

        worksheet
            .merge_range(
                cast_row_num(merge.row_start)?,
                cast_col_num(merge.col_start)?,
                cast_row_num(merge.row_end)?,
                cast_col_num(merge.col_end)?,
                c_text,
                &format,
            )
            .map_err(derive_xlsx_error_text)?;

        if matches!(value, EnumCellValue::Number(_) | EnumCellValue::Formula(_)) {
            write_cell_with_format(worksheet, merge.row_start, merge.col_start, value, &format)?;
        }
    }

    Ok(())
}

fn derive_cached_format(
    dict_formats: &mut HashMap<SpecCellFormat, Format>,
    spec: &SpecCellFormat,
) -> Format {
    dict_formats
        .entry(spec.clone())
        .or_insert_with(|| derive_rust_xlsx_format(spec))
        .clone()
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), String> {
    let (row, col) = (cast_row_num(row_idx)?, cast_col_num(col_idx)?);
    let res = match value {
        EnumCellValue::None => worksheet.write_blank(row, col, format),
        EnumCellValue::String(c_text) => worksheet.write_string_with_format(row, col, c_text, format),
        EnumCellValue::Number(n_value) => {
            worksheet.write_number_with_format(row, col, *n_value, format)
        }
        EnumCellValue::Formula(c_formula) => {
            worksheet.write_formula_with_format(row, col, c_formula.as_str(), format)
        }
    };
    res.map(|_| ()).map_err(derive_xlsx_error_text)
}

/// Translate a cell format model into a `rust_xlsxwriter` format.
fn derive_rust_xlsx_format(fmt_spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(c_font) = &fmt_spec.font_name {
        format = format.set_font_name(c_font.as_str());
    }
    if let Some(n_size) = fmt_spec.font_size {
        format = format.set_font_size(n_size as f64);
    }
    if fmt_spec.bold == Some(true) {
        format = format.set_bold();
    }
    if fmt_spec.italic == Some(true) {
        format = format.set_italic();
    }
    if fmt_spec.text_wrap == Some(true) {
        format = format.set_text_wrap();
    }
    for c_align in [&fmt_spec.align, &fmt_spec.valign].into_iter().flatten() {
        if let Some(align) = derive_format_align(c_align) {
            format = format.set_align(align);
        }
    }
    if let Some(c_num) = &fmt_spec.num_format {
        format = format.set_num_format(c_num.as_str());
    }
    if let Some(c_color) = &fmt_spec.bg_color {
        format = format.set_background_color(c_color.as_str());
    }
    if let Some(c_color) = &fmt_spec.font_color {
        format = format.set_font_color(c_color.as_str());
    }

    // the box border first, then per-side overrides
    if let Some(n_style) = fmt_spec.border {
        format = format.set_border(derive_format_border(n_style));
    }
    let l_sides: [(Option<i64>, fn(Format, FormatBorder) -> Format); 4] = [
        (fmt_spec.top, Format::set_border_top),
        (fmt_spec.bottom, Format::set_border_bottom),
        (fmt_spec.left, Format::set_border_left),
        (fmt_spec.right, Format::set_border_right),
    ];
    for (n_style, apply_side) in l_sides {
        if let Some(n_style) = n_style {
            format = apply_side(format, derive_format_border(n_style));
        }
    }

    format
}

/// Excel border style index to `FormatBorder`; unknown indices mean no border.
fn derive_format_border(n_style: i64) -> FormatBorder {
    const L_BORDERS: [FormatBorder; 8] = [
        FormatBorder::None,
        FormatBorder::Thin,
        FormatBorder::Medium,
        FormatBorder::Dashed,
        FormatBorder::Dotted,
        FormatBorder::Thick,
        FormatBorder::Double,
        FormatBorder::Hair,
    ];
    usize::try_from(n_style)
        .ok()
        .and_then(|idx| L_BORDERS.get(idx).cloned())
        .unwrap_or(FormatBorder::None)
}

fn derive_format_align(c_align: &str) -> Option<FormatAlign> {
    let align = match c_align.trim().to_ascii_lowercase().as_str() {
        "general" => FormatAlign::General,
        "left" => FormatAlign::Left,
        "center" => FormatAlign::Center,
        "right" => FormatAlign::Right,
        "center_across" => FormatAlign::CenterAcross,
        "top" => FormatAlign::Top,
        "bottom" => FormatAlign::Bottom,
        "vcenter" | "vertical_center" => FormatAlign::VerticalCenter,
        _ => return None,
    };
    Some(align)
}

fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}
