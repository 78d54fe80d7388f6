//! Report templates: the built-in default per layout version and user-supplied workbooks.

use std::collections::BTreeMap;

use packlist_io_xlsx::{
    EnumFmtKey, SheetModel, SpecCellFormat, SpecMergeRange, XlsxModelError,
    derive_default_xlsx_formats, read_template_sheet,
};
use tracing::debug;

use crate::conf::{
    C_LABEL_CARTON_HEADER, C_LABEL_SHIP_TO, C_LABEL_SUMMARY, N_COLS_SHIP_TO_BOX,
    N_ROWS_SHIP_TO_BOX, N_SIZES, TUP_SIZE_LABELS, TUP_SUMMARY_LABELS,
};
use crate::spec::{ReportError, SpecTemplateLayout};

const C_TITLE: &str = "PACKING LIST";
const C_DRAFT_STAMP: &str = "DRAFT";
const C_FOOTER: &str = "Prepared by:";

/// Last column written by the layout (mapping destinations included).
pub fn derive_last_layout_col(layout: &SpecTemplateLayout) -> usize {
    layout
        .l_column_mappings
        .iter()
        .map(|mapping| mapping.n_col_dst)
        .chain(std::iter::once(layout.n_col_size_start + N_SIZES - 1))
        .max()
        .unwrap_or(layout.n_col_size_start + N_SIZES - 1)
}

/// Template used when no workbook is supplied.
///
/// Carries the same landmarks a hand-made template has: title, header
/// fields, the ship-to box, the table header, one style row and placeholder
/// content in the reserved summary area.
pub fn build_default_template(layout: &SpecTemplateLayout) -> Result<SheetModel, XlsxModelError> {
    let dict_fmt = derive_default_xlsx_formats();
    let derive_fmt = |key: EnumFmtKey| dict_fmt.get(&key).cloned().unwrap_or_default();
    let n_col_last = derive_last_layout_col(layout);

    let mut sheet = SheetModel::new(layout.c_sheet_name);
    for (col, width) in &layout.l_col_widths {
        sheet.set_column_width(*col, *width);
    }

    sheet.write(1, layout.n_col_carton, C_TITLE, derive_fmt(EnumFmtKey::Title));
    sheet.merge(SpecMergeRange::new(1, layout.n_col_carton, 1, n_col_last))?;
    sheet.set_row_height(1, 24.0);

    for (row, col) in &layout.l_cells_clear {
        sheet.write(*row, *col, C_DRAFT_STAMP, derive_fmt(EnumFmtKey::Header));
    }

    // #region ShipToBox
    let (n_row_ship, n_col_ship) = layout.cell_ship_to;
    if let Some(n_row_label) = n_row_ship.checked_sub(1) {
        sheet.write(n_row_label, n_col_ship, C_LABEL_SHIP_TO, derive_fmt(EnumFmtKey::Header));
    }
    sheet.merge(SpecMergeRange::new(
        n_row_ship,
        n_col_ship,
        n_row_ship + N_ROWS_SHIP_TO_BOX - 2,
        n_col_ship + N_COLS_SHIP_TO_BOX - 1,
    ))?;
    // #endregion

    for (cell, c_label) in [
        (layout.cell_po_line, "PO-Line"),
        (layout.cell_sap_po, "SAP PO#"),
        (layout.cell_model_no, "Model #"),
        (layout.cell_model_name, "Model Name"),
    ] {
        let (row, col) = cell;
        if let Some(n_row_label) = row.checked_sub(1) {
            sheet.write(n_row_label, col, c_label, derive_fmt(EnumFmtKey::Header));
        }
    }

    for (col, c_label) in derive_table_header_labels(layout) {
        sheet.write(layout.n_row_table_header, col, c_label, derive_fmt(EnumFmtKey::Header));
    }
    sheet.set_row_height(layout.n_row_table_header, 30.0);

    // Reserved area placeholders, replaced on every generated sheet.
    let n_row_placeholder = layout.n_row_data_start + layout.n_rows_summary_gap + 1;
    sheet.write(
        n_row_placeholder,
        layout.n_col_summary_label,
        C_LABEL_SUMMARY,
        derive_fmt(EnumFmtKey::Header),
    );
    sheet.merge(SpecMergeRange::new(
        n_row_placeholder,
        layout.n_col_summary_label,
        n_row_placeholder,
        layout.n_col_summary_value,
    ))?;
    for (offset, c_label) in TUP_SUMMARY_LABELS.iter().enumerate() {
        sheet.write(
            n_row_placeholder + 1 + offset,
            layout.n_col_summary_label,
            *c_label,
            derive_fmt(EnumFmtKey::Text),
        );
    }

    sheet.write(layout.n_row_reserved_end + 2, layout.n_col_carton, C_FOOTER, SpecCellFormat::default());

    apply_layout_presets(&mut sheet, layout);
    Ok(sheet)
}

/// Load the `Report` worksheet of a user template and style it with the layout presets.
pub fn load_template(v_bytes: &[u8], layout: &SpecTemplateLayout) -> Result<SheetModel, ReportError> {
    let mut sheet = read_template_sheet(v_bytes, layout.c_sheet_name).map_err(|err| match err {
        XlsxModelError::SheetNotFound { name, available } => {
            ReportError::TemplateSheetMissing { name, available }
        }
        err => ReportError::Xlsx(err),
    })?;
    debug!(
        n_cells = sheet.cells().count(),
        n_merges = sheet.merges().len(),
        "loaded user template"
    );

    for (col, width) in &layout.l_col_widths {
        sheet.set_column_width(*col, *width);
    }
    apply_layout_presets(&mut sheet, layout);
    Ok(sheet)
}

/// Resolve the template for a run: the supplied workbook or the built-in one.
pub fn resolve_template(
    v_bytes: Option<&[u8]>,
    layout: &SpecTemplateLayout,
) -> Result<SheetModel, ReportError> {
    match v_bytes {
        Some(v_bytes) => load_template(v_bytes, layout),
        None => Ok(build_default_template(layout)?),
    }
}

/// Column labels of the report table header.
pub fn derive_table_header_labels(layout: &SpecTemplateLayout) -> BTreeMap<usize, &'static str> {
    let mut dict_labels = BTreeMap::from([
        (layout.n_col_carton, C_LABEL_CARTON_HEADER),
        (layout.n_col_color, "Color"),
        (layout.n_col_sku, "S4 HANA SKU"),
        (layout.n_col_material, "ECC Material No"),
    ]);
    for (n_size, c_label) in TUP_SIZE_LABELS.iter().enumerate() {
        dict_labels.insert(layout.n_col_size_start + n_size, *c_label);
    }
    for mapping in &layout.l_column_mappings {
        dict_labels.insert(mapping.n_col_dst, mapping.c_field);
    }
    dict_labels
}

/// Formats of the data-start (style) row, by column.
pub fn derive_style_row_formats(layout: &SpecTemplateLayout) -> BTreeMap<usize, SpecCellFormat> {
    let dict_fmt = derive_default_xlsx_formats();
    let derive_fmt = |key: EnumFmtKey| dict_fmt.get(&key).cloned().unwrap_or_default();

    let mut dict_row = BTreeMap::new();
    for col in [layout.n_col_carton, layout.n_col_color, layout.n_col_sku, layout.n_col_material] {
        dict_row.insert(col, derive_fmt(EnumFmtKey::Text));
    }
    for n_size in 0..N_SIZES {
        dict_row.insert(layout.n_col_size_start + n_size, derive_fmt(EnumFmtKey::Integer));
    }
    for mapping in &layout.l_column_mappings {
        dict_row.insert(mapping.n_col_dst, derive_fmt(mapping.enum_fmt));
    }
    dict_row
}

/// Style the table header, the style row and the header field cells.
///
/// Existing values are kept; only formats are replaced.
fn apply_layout_presets(sheet: &mut SheetModel, layout: &SpecTemplateLayout) {
    let dict_fmt = derive_default_xlsx_formats();
    let derive_fmt = |key: EnumFmtKey| dict_fmt.get(&key).cloned().unwrap_or_default();

    for col in derive_table_header_labels(layout).into_keys() {
        sheet.set_format(layout.n_row_table_header, col, derive_fmt(EnumFmtKey::Header));
    }
    for (col, format) in derive_style_row_formats(layout) {
        sheet.set_format(layout.n_row_data_start, col, format);
    }
    for (row, col) in [
        layout.cell_po_line,
        layout.cell_sap_po,
        layout.cell_model_no,
        layout.cell_model_name,
    ] {
        sheet.set_format(row, col, derive_fmt(EnumFmtKey::Text));
    }
    let (n_row_ship, n_col_ship) = layout.cell_ship_to;
    sheet.set_format(n_row_ship, n_col_ship, derive_fmt(EnumFmtKey::Block));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::derive_template_layout;
    use crate::spec::EnumTemplateVersion;
    use packlist_io_xlsx::{EnumCellValue, render_workbook};

    #[test]
    fn test_default_template_has_landmarks() {
        let layout = derive_template_layout(EnumTemplateVersion::V2Extended);
        let sheet = build_default_template(&layout).expect("template builds");

        assert_eq!(sheet.name(), "Report");
        assert_eq!(sheet.find_text(C_LABEL_SHIP_TO), vec![(7, 6)]);
        assert_eq!(
            sheet.value(layout.n_row_table_header, layout.n_col_carton),
            &EnumCellValue::from(C_LABEL_CARTON_HEADER)
        );
        assert_eq!(
            sheet.value(layout.n_row_table_header, 21),
            &EnumCellValue::from("CBM")
        );
        assert!(sheet.format(layout.n_row_data_start, 15).is_some());
        assert!(sheet.merge_at(8, 6).is_some());
        assert_eq!(sheet.find_text(C_FOOTER), vec![(layout.n_row_reserved_end + 2, 2)]);
    }

    #[test]
    fn test_legacy_template_has_fewer_mapped_columns() {
        let layout = derive_template_layout(EnumTemplateVersion::V1Legacy);
        let sheet = build_default_template(&layout).expect("template builds");
        assert!(sheet.value(layout.n_row_table_header, 21).is_empty());
        assert_eq!(
            sheet.value(layout.n_row_table_header, 15),
            &EnumCellValue::from("TOTAL N.W.")
        );
    }

    #[test]
    fn test_load_template_round_trip_and_missing_sheet() {
        let layout = derive_template_layout(EnumTemplateVersion::V2Extended);
        let sheet = build_default_template(&layout).expect("template builds");
        let (v_bytes, _) =
            render_workbook(&[&sheet], SpecCellFormat::default()).expect("template renders");

        let loaded = load_template(&v_bytes, &layout).expect("template loads");
        assert_eq!(loaded.find_text(C_LABEL_SHIP_TO), vec![(7, 6)]);
        assert_eq!(loaded.merges().len(), sheet.merges().len());

        let mut other = sheet.clone();
        other.set_name("Sheet1");
        let (v_bytes, _) =
            render_workbook(&[&other], SpecCellFormat::default()).expect("template renders");
        match load_template(&v_bytes, &layout) {
            Err(ReportError::TemplateSheetMissing { name, available }) => {
                assert_eq!(name, "Report");
                assert_eq!(available, vec!["Sheet1".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
