//! XLSX constants and default preset factories.

use std::collections::BTreeMap;

use crate::spec::SpecCellFormat;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Sheet name Excel reserves for itself (case-insensitive).
pub const C_EXCEL_RESERVED_SHEET_NAME: &str = "History";

/// Thin border style code.
pub const N_BORDER_THIN: i64 = 1;
/// Medium border style code.
pub const N_BORDER_MEDIUM: i64 = 2;

/// Three-decimal display format used for weights and volumes.
pub const C_NUM_FORMAT_DECIMAL_3: &str = "0.000";

/// Canonical format preset keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnumFmtKey {
    /// Generic text cell format.
    Text,
    /// Integer number format.
    Integer,
    /// Three-decimal number format.
    Decimal,
    /// Bold centered header cell.
    Header,
    /// Large bold title.
    Title,
    /// Wrapped multi-line text block.
    Block,
}

/// Build default named format presets used by report templates.
pub fn derive_default_xlsx_formats() -> BTreeMap<EnumFmtKey, SpecCellFormat> {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some("Arial".to_string()),
        font_size: Some(10),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    };
    let cfg_boxed_fmt_spec = cfg_base_fmt_spec.with_(SpecCellFormat {
        border: Some(N_BORDER_THIN),
        align: Some("center".to_string()),
        ..Default::default()
    });

    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert(EnumFmtKey::Text, cfg_boxed_fmt_spec.clone());
    dict_fmt.insert(
        EnumFmtKey::Header,
        cfg_boxed_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            text_wrap: Some(true),
            bg_color: Some("#D9E1F2".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumFmtKey::Integer,
        cfg_boxed_fmt_spec.with_(SpecCellFormat {
            num_format: Some("0".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumFmtKey::Decimal,
        cfg_boxed_fmt_spec.with_(SpecCellFormat {
            num_format: Some(C_NUM_FORMAT_DECIMAL_3.to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumFmtKey::Title,
        cfg_base_fmt_spec.with_(SpecCellFormat {
            font_size: Some(16),
            bold: Some(true),
            align: Some("center".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumFmtKey::Block,
        cfg_base_fmt_spec.with_(SpecCellFormat {
            text_wrap: Some(true),
            align: Some("left".to_string()),
            valign: Some("top".to_string()),
            ..Default::default()
        }),
    );

    dict_fmt
}
