//! Report sheet layout: fills one template copy from one normalized table.

use packlist_io_xlsx::{
    EnumCellValue, EnumFmtKey, N_BORDER_THIN, SheetModel, SpecCellBorder, SpecCellFormat,
    SpecMergeRange, XlsxModelError, derive_default_xlsx_formats,
};
use tracing::debug;

use crate::aggregate::{derive_breakdown_totals, derive_row_size_values};
use crate::conf::{C_LABEL_SUMMARY, C_LABEL_TOTAL, N_SIZES, TUP_SIZE_LABELS, TUP_SUMMARY_LABELS};
use crate::spec::{
    EnumPoLineSource, EnumSapPoStyle, ReportError, SpecColorBreakdownEntry, SpecGeneratedSheet,
    SpecNormalizedTable, SpecReportSummary, SpecTemplateLayout,
};
use crate::util::{derive_numeric, round3};

/// Per-sheet inputs that are not part of the table itself.
#[derive(Debug, Clone, Copy)]
pub struct SpecLayoutContext<'a> {
    pub layout: &'a SpecTemplateLayout,
    /// Final, already de-duplicated sheet name.
    pub sheet_name: &'a str,
}

/// Fill a fresh copy of `template` with one table.
///
/// The template is never mutated; identical inputs yield identical sheets.
pub fn write_report_sheet(
    template: &SheetModel,
    normalized: &SpecNormalizedTable,
    summary: &SpecReportSummary,
    l_breakdown: &[SpecColorBreakdownEntry],
    ctx: &SpecLayoutContext<'_>,
) -> Result<SpecGeneratedSheet, ReportError> {
    let layout = ctx.layout;
    let n_data_rows = normalized.n_data_rows();
    let n_row_data_start = layout.n_row_data_start;
    let derive_layout_error = |message: String| ReportError::Layout {
        n_table_idx: normalized.n_table_idx,
        message,
    };

    let mut sheet = template.clone();
    sheet.set_name(ctx.sheet_name);
    let mut l_warnings = Vec::new();

    write_header_fields(&mut sheet, normalized, ctx);

    // #region DataRows
    sheet.insert_rows(n_row_data_start, n_data_rows);
    let n_row_style = n_row_data_start + n_data_rows;
    for idx in 0..n_data_rows {
        sheet.copy_row_style(n_row_style, n_row_data_start + idx);
    }

    for (idx, row) in normalized.rows.iter().enumerate() {
        let n_row = n_row_data_start + idx;
        let if_group_first = normalized
            .group_of(idx)
            .is_none_or(|group| group.n_row_start == idx);
        if if_group_first {
            sheet.set_value(n_row, layout.n_col_carton, derive_text_value(&row.carton_id));
        } else {
            sheet.clear_value(n_row, layout.n_col_carton);
        }
        sheet.set_value(n_row, layout.n_col_color, derive_text_value(&row.color));
        sheet.set_value(n_row, layout.n_col_sku, derive_text_value(&row.sku));
        sheet.set_value(n_row, layout.n_col_material, derive_text_value(&row.material_code));

        for (n_size, value) in derive_row_size_values(normalized, idx).iter().enumerate() {
            sheet.set_value(
                n_row,
                layout.n_col_size_start + n_size,
                derive_output_value(value, false),
            );
        }
        for mapping in &layout.l_column_mappings {
            let if_round = layout.l_cols_round.contains(&mapping.n_col_dst);
            sheet.set_value(
                n_row,
                mapping.n_col_dst,
                derive_output_value(normalized.raw(idx, mapping.n_col_src), if_round),
            );
        }
    }

    for group in normalized.groups.iter().filter(|group| group.if_split()) {
        let n_row_first = n_row_data_start + group.n_row_start;
        let n_row_last = n_row_data_start + group.n_row_end;
        for col in std::iter::once(layout.n_col_carton).chain(layout.l_cols_merge.iter().copied()) {
            let n_removed = sheet
                .merge_or_replace(SpecMergeRange::vertical(col, n_row_first, n_row_last))
                .map_err(|err| derive_layout_error(err.to_string()))?;
            if n_removed > 0 {
                l_warnings.push(format!(
                    "carton {}: replaced {n_removed} colliding merge(s) in column {col}",
                    group.carton_id
                ));
            }
        }
    }
    // #endregion

    // Reserved area below the data is rebuilt from scratch.
    let n_row_reserved_end = layout.n_row_reserved_end + n_data_rows;
    let n_merges_cleared = sheet.clear_rows(n_row_style, n_row_reserved_end);
    if n_merges_cleared > 0 {
        debug!(n_merges_cleared, sheet = ctx.sheet_name, "cleared reserved area merges");
    }

    let n_row_summary = n_row_style + layout.n_rows_summary_gap;
    let n_row_summary_end = write_summary_block(&mut sheet, summary, layout, n_row_summary)
        .map_err(|err| derive_layout_error(err.to_string()))?;
    let n_row_breakdown = n_row_summary + layout.n_row_breakdown_offset;
    let n_row_breakdown_end = write_breakdown_block(&mut sheet, l_breakdown, layout, n_row_breakdown);

    let n_row_block_end = n_row_summary_end.max(n_row_breakdown_end);
    if n_row_block_end > n_row_reserved_end {
        l_warnings.push(format!(
            "summary blocks end at row {} beyond the reserved area ending at row {}",
            n_row_block_end + 1,
            n_row_reserved_end + 1
        ));
    }

    Ok(SpecGeneratedSheet {
        n_table_idx: normalized.n_table_idx,
        sheet,
        sheet_name: ctx.sheet_name.to_string(),
        order_number: normalized.order_number.clone(),
        n_row_data_start,
        n_data_rows,
        n_row_summary,
        n_row_block_end,
        warnings: l_warnings,
    })
}

fn derive_text_value(text: &str) -> EnumCellValue {
    EnumCellValue::from(text)
}

/// Numbers (numeric text included) become numeric cells, optionally rounded.
fn derive_output_value(value: &EnumCellValue, if_round: bool) -> EnumCellValue {
    match derive_numeric(value) {
        Some(n) if if_round => EnumCellValue::Number(round3(n)),
        Some(n) => EnumCellValue::Number(n),
        None => value.clone(),
    }
}

/// Value written into the PO-line / model # header cells.
pub fn derive_po_line(normalized: &SpecNormalizedTable, source: EnumPoLineSource) -> String {
    match source {
        EnumPoLineSource::OrderNumber => normalized.order_number.clone(),
        EnumPoLineSource::SkuTrimmed => {
            let c_sku = normalized
                .rows
                .first()
                .map(|row| row.sku.as_str())
                .unwrap_or_default();
            let n_chars = c_sku.chars().count();
            if n_chars > 2 {
                c_sku.chars().take(n_chars - 2).collect()
            } else {
                c_sku.to_string()
            }
        }
    }
}

fn write_header_fields(
    sheet: &mut SheetModel,
    normalized: &SpecNormalizedTable,
    ctx: &SpecLayoutContext<'_>,
) {
    let layout = ctx.layout;
    let c_po_line = derive_po_line(normalized, layout.enum_po_line_source);
    let c_sap_po = match layout.enum_sap_po_style {
        EnumSapPoStyle::SheetName => ctx.sheet_name.to_string(),
        EnumSapPoStyle::Doubled if normalized.order_number.is_empty() => String::new(),
        EnumSapPoStyle::Doubled => {
            format!("{} / {}", normalized.order_number, normalized.order_number)
        }
    };

    let (row, col) = layout.cell_po_line;
    sheet.set_value(row, col, c_po_line.clone());
    let (row, col) = layout.cell_model_no;
    sheet.set_value(row, col, c_po_line);
    let (row, col) = layout.cell_sap_po;
    sheet.set_value(row, col, c_sap_po);
    let (row, col) = layout.cell_model_name;
    sheet.set_value(row, col, normalized.model_name.clone());
    let (row, col) = layout.cell_ship_to;
    sheet.set_value(row, col, normalized.side_text.clone());
    for (row, col) in &layout.l_cells_clear {
        sheet.clear_value(*row, *col);
    }
}

/// Summary header plus one label/value row per total; returns the last row used.
fn write_summary_block(
    sheet: &mut SheetModel,
    summary: &SpecReportSummary,
    layout: &SpecTemplateLayout,
    n_row_summary: usize,
) -> Result<usize, XlsxModelError> {
    let dict_fmt = derive_default_xlsx_formats();
    let derive_fmt = |key: EnumFmtKey| dict_fmt.get(&key).cloned().unwrap_or_default();
    let fmt_label = derive_fmt(EnumFmtKey::Text).with_(SpecCellFormat {
        align: Some("left".to_string()),
        ..Default::default()
    });
    let (n_col_label, n_col_value) = (layout.n_col_summary_label, layout.n_col_summary_value);

    let n_row_end = n_row_summary + TUP_SUMMARY_LABELS.len();
    sheet.unmerge_overlapping(&SpecMergeRange::new(n_row_summary, n_col_label, n_row_end, n_col_value));

    sheet.write(n_row_summary, n_col_label, C_LABEL_SUMMARY, derive_fmt(EnumFmtKey::Header));
    sheet.write(n_row_summary, n_col_value, EnumCellValue::None, derive_fmt(EnumFmtKey::Header));
    if n_col_value > n_col_label {
        sheet.merge_or_replace(SpecMergeRange::new(n_row_summary, n_col_label, n_row_summary, n_col_value))?;
    }

    let l_values = [
        (summary.total_carton, EnumFmtKey::Integer),
        (round3(summary.total_net_net_weight), EnumFmtKey::Decimal),
        (round3(summary.total_net_weight), EnumFmtKey::Decimal),
        (round3(summary.total_gross_weight), EnumFmtKey::Decimal),
        (round3(summary.total_cbm), EnumFmtKey::Decimal),
    ];
    for (offset, (c_label, (n_value, enum_fmt))) in
        TUP_SUMMARY_LABELS.iter().zip(l_values).enumerate()
    {
        let n_row = n_row_summary + 1 + offset;
        sheet.write(n_row, n_col_label, *c_label, fmt_label.clone());
        sheet.write(n_row, n_col_value, n_value, derive_fmt(enum_fmt));
    }
    Ok(n_row_end)
}

/// Color x size grid with a totals row; returns the last row used.
fn write_breakdown_block(
    sheet: &mut SheetModel,
    l_breakdown: &[SpecColorBreakdownEntry],
    layout: &SpecTemplateLayout,
    n_row_header: usize,
) -> usize {
    let dict_fmt = derive_default_xlsx_formats();
    let derive_fmt = |key: EnumFmtKey| dict_fmt.get(&key).cloned().unwrap_or_default();
    let fmt_header = derive_fmt(EnumFmtKey::Header);
    let fmt_value = derive_fmt(EnumFmtKey::Text);
    let fmt_total = fmt_value.with_(SpecCellFormat {
        bold: Some(true),
        ..Default::default()
    });

    let n_col_start = layout.n_col_breakdown_start;
    let n_col_total = n_col_start + N_SIZES + 1;
    let n_row_total = n_row_header + l_breakdown.len() + 1;
    let range_block = SpecMergeRange::new(n_row_header, n_col_start, n_row_total, n_col_total);
    sheet.unmerge_overlapping(&range_block);

    sheet.write(n_row_header, n_col_start, layout.c_breakdown_color_label, fmt_header.clone());
    for (n_size, c_label) in TUP_SIZE_LABELS.iter().enumerate() {
        sheet.write(n_row_header, n_col_start + 1 + n_size, *c_label, fmt_header.clone());
    }
    sheet.write(n_row_header, n_col_total, C_LABEL_TOTAL, fmt_header.clone());

    for (offset, entry) in l_breakdown.iter().enumerate() {
        let n_row = n_row_header + 1 + offset;
        sheet.write(n_row, n_col_start, entry.color.as_str(), fmt_value.clone());
        for (n_size, n_qty) in entry.size_quantities.iter().enumerate() {
            sheet.write(n_row, n_col_start + 1 + n_size, *n_qty, fmt_value.clone());
        }
        sheet.write(n_row, n_col_total, entry.total, fmt_total.clone());
    }

    let (l_totals, n_grand_total) = derive_breakdown_totals(l_breakdown);
    sheet.write(n_row_total, n_col_start, C_LABEL_TOTAL, fmt_header.clone());
    for (n_size, n_qty) in l_totals.iter().enumerate() {
        sheet.write(n_row_total, n_col_start + 1 + n_size, *n_qty, fmt_total.clone());
    }
    sheet.write(n_row_total, n_col_total, n_grand_total, fmt_total);

    sheet.apply_grid_border(&range_block, &SpecCellBorder::uniform(N_BORDER_THIN));
    n_row_total
}
