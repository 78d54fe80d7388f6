//! Header signature, thresholds and versioned template layouts.

use packlist_io_xlsx::EnumFmtKey;

use crate::spec::{
    EnumPoLineSource, EnumSapPoStyle, EnumTemplateVersion, SpecColumnMapping, SpecTemplateLayout,
};

/// Expected packing-list header, position-sensitive.
pub const TUP_HEADER_SIGNATURE: [&str; 21] = [
    "CASE NOS",
    "SA4 PO NO#",
    "CARTON PO NO#",
    "SAP STYLE NO",
    "STYLE NAME #",
    "S4 Material",
    "Material No#",
    "COLOR",
    "Size",
    "Total QTY",
    "CARTON",
    "QTY / CARTON",
    "TOTAL QTY",
    "N.N.W / ctn",
    "TOTAL N.N.W.",
    "N.W / ctn",
    "TOTAL N.W.",
    "G.W. / ctn",
    "TOTAL G.W.",
    "MEAS. CM",
    "TOTAL CBM",
];

pub const IDX_SIG_CASE_NOS: usize = 0;
pub const IDX_SIG_PO_NO: usize = 1;
pub const IDX_SIG_S4_MATERIAL: usize = 5;
pub const IDX_SIG_MATERIAL_NO: usize = 6;
pub const IDX_SIG_COLOR: usize = 7;
/// OS source for split cartons.
pub const IDX_SIG_TOTAL_QTY: usize = 9;
pub const IDX_SIG_CARTON: usize = 10;
/// OS source for single cartons.
pub const IDX_SIG_QTY_PER_CARTON: usize = 11;
pub const IDX_SIG_TOTAL_UNITS: usize = 12;
pub const IDX_SIG_TOTAL_NNW: usize = 14;
pub const IDX_SIG_TOTAL_NW: usize = 16;
pub const IDX_SIG_GW_PER_CTN: usize = 17;
pub const IDX_SIG_TOTAL_GW: usize = 18;
pub const IDX_SIG_TOTAL_CBM: usize = 20;

/// Signature positions whose values must be numeric.
pub const TUP_IDX_SIG_NUMERIC: [usize; 9] = [
    IDX_SIG_TOTAL_QTY,
    IDX_SIG_CARTON,
    IDX_SIG_QTY_PER_CARTON,
    IDX_SIG_TOTAL_UNITS,
    IDX_SIG_TOTAL_NNW,
    IDX_SIG_TOTAL_NW,
    IDX_SIG_GW_PER_CTN,
    IDX_SIG_TOTAL_GW,
    IDX_SIG_TOTAL_CBM,
];

pub const N_SIZES: usize = 7;
pub const TUP_SIZE_LABELS: [&str; N_SIZES] = ["OS", "XS", "S", "M", "L", "XL", "XXL"];

pub const N_MATCH_DISTANCE_MAX: usize = 2;
pub const N_MATCH_RATIO_MIN: f64 = 0.90;
pub const TUP_MATERIAL_PREFIXES_ALLOWED: [&str; 2] = ["X", "L"];

/// Decimal places kept for weights and volumes.
pub const N_DECIMALS: i32 = 3;

/// Side-panel text rows (inclusive) and column of the source sheet.
pub const TUP_ROWS_SIDE_TEXT: (usize, usize) = (14, 19);
pub const N_COL_SIDE_TEXT: usize = 2;

pub const C_LABEL_SUMMARY: &str = "Summary";
pub const C_LABEL_TOTAL: &str = "Total";
pub const C_LABEL_SHIP_TO: &str = "Ship to";
pub const C_LABEL_CARTON_HEADER: &str = "Carton#";
pub const TUP_SUMMARY_LABELS: [&str; 5] = [
    "Total Carton",
    "Total Net Net Weight",
    "Total Net Weight",
    "Total Gross Weight",
    "Total CBM",
];

/// Rows spanned by the ship-to box, label included.
pub const N_ROWS_SHIP_TO_BOX: usize = 5;
/// Columns spanned by the ship-to box.
pub const N_COLS_SHIP_TO_BOX: usize = 6;

fn derive_mapping(
    n_col_src: usize,
    n_col_dst: usize,
    c_field: &'static str,
    enum_fmt: EnumFmtKey,
) -> SpecColumnMapping {
    SpecColumnMapping {
        n_col_src,
        n_col_dst,
        c_field,
        enum_fmt,
    }
}

/// Layout contract for `version`.
pub fn derive_template_layout(version: EnumTemplateVersion) -> SpecTemplateLayout {
    match version {
        EnumTemplateVersion::V2Extended => derive_template_layout_v2(),
        EnumTemplateVersion::V1Legacy => derive_template_layout_v1(),
    }
}

fn derive_template_layout_v2() -> SpecTemplateLayout {
    SpecTemplateLayout {
        enum_version: EnumTemplateVersion::V2Extended,
        c_sheet_name: "Report",
        n_row_data_start: 19,
        n_row_table_header: 18,
        n_row_reserved_end: 35,
        n_col_carton: 2,
        n_col_color: 3,
        n_col_sku: 4,
        n_col_material: 5,
        n_col_size_start: 6,
        l_column_mappings: vec![
            derive_mapping(10, 13, "CARTON", EnumFmtKey::Integer),
            derive_mapping(12, 14, "TOTAL QTY", EnumFmtKey::Integer),
            derive_mapping(14, 15, "TOTAL N.N.W.", EnumFmtKey::Decimal),
            derive_mapping(16, 16, "TOTAL N.W.", EnumFmtKey::Decimal),
            derive_mapping(17, 17, "G.W. / ctn", EnumFmtKey::Decimal),
            derive_mapping(18, 18, "TOTAL G.W.", EnumFmtKey::Decimal),
            derive_mapping(19, 19, "MEAS. CM", EnumFmtKey::Text),
            derive_mapping(20, 20, "TOTAL CBM", EnumFmtKey::Decimal),
            derive_mapping(20, 21, "CBM", EnumFmtKey::Decimal),
        ],
        l_cols_merge: (13..=21).collect(),
        l_cols_round: vec![15, 16, 20, 21],
        cell_po_line: (13, 3),
        cell_model_no: (15, 3),
        cell_sap_po: (13, 4),
        cell_model_name: (15, 4),
        cell_ship_to: (8, 6),
        l_cells_clear: vec![(6, 4)],
        enum_po_line_source: EnumPoLineSource::SkuTrimmed,
        enum_sap_po_style: EnumSapPoStyle::SheetName,
        n_col_summary_label: 3,
        n_col_summary_value: 4,
        n_rows_summary_gap: 1,
        n_col_breakdown_start: 5,
        n_row_breakdown_offset: 1,
        c_breakdown_color_label: "Color",
        l_col_widths: vec![
            (0, 2.0),
            (1, 2.0),
            (2, 10.0),
            (3, 22.0),
            (4, 18.0),
            (5, 16.0),
            (19, 14.0),
        ],
    }
}

fn derive_template_layout_v1() -> SpecTemplateLayout {
    SpecTemplateLayout {
        enum_version: EnumTemplateVersion::V1Legacy,
        l_column_mappings: vec![
            derive_mapping(10, 13, "CARTON", EnumFmtKey::Integer),
            derive_mapping(12, 14, "TOTAL QTY", EnumFmtKey::Integer),
            derive_mapping(16, 15, "TOTAL N.W.", EnumFmtKey::Decimal),
            derive_mapping(18, 16, "TOTAL G.W.", EnumFmtKey::Decimal),
            derive_mapping(20, 20, "TOTAL CBM", EnumFmtKey::Decimal),
        ],
        l_cols_merge: Vec::new(),
        l_cols_round: vec![15, 16, 20],
        enum_po_line_source: EnumPoLineSource::OrderNumber,
        enum_sap_po_style: EnumSapPoStyle::Doubled,
        n_row_breakdown_offset: 7,
        c_breakdown_color_label: "Colour",
        ..derive_template_layout_v2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_keep_mappings_inside_reserved_columns() {
        for version in [EnumTemplateVersion::V1Legacy, EnumTemplateVersion::V2Extended] {
            let layout = derive_template_layout(version);
            assert_eq!(layout.enum_version, version);
            assert_eq!(layout.n_row_data_start, layout.n_row_table_header + 1);
            for mapping in &layout.l_column_mappings {
                assert!(mapping.n_col_src < TUP_HEADER_SIGNATURE.len());
                assert!(mapping.n_col_dst >= layout.n_col_size_start + N_SIZES);
            }
            for col in &layout.l_cols_round {
                assert!(
                    layout
                        .l_column_mappings
                        .iter()
                        .any(|mapping| mapping.n_col_dst == *col)
                );
            }
        }
    }

    #[test]
    fn test_signature_indices_point_at_expected_labels() {
        assert_eq!(TUP_HEADER_SIGNATURE[IDX_SIG_TOTAL_QTY], "Total QTY");
        assert_eq!(TUP_HEADER_SIGNATURE[IDX_SIG_QTY_PER_CARTON], "QTY / CARTON");
        assert_eq!(TUP_HEADER_SIGNATURE[IDX_SIG_TOTAL_CBM], "TOTAL CBM");
        assert_eq!(TUP_HEADER_SIGNATURE[IDX_SIG_MATERIAL_NO], "Material No#");
    }
}
