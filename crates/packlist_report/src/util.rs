//! Stateless helpers shared by the pipeline stages.

use std::path::Path;
use std::sync::LazyLock;

use packlist_io_xlsx::EnumCellValue;
use regex::Regex;

use crate::conf::N_DECIMALS;

static WHITESPACE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));
static XLSX_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.xlsx?$").expect("suffix pattern compiles"));

/// Collapse whitespace runs (newlines included) to one space, trim, lowercase.
pub fn normalize_header_text(text: &str) -> String {
    WHITESPACE_RUN_RE
        .replace_all(text, " ")
        .trim()
        .to_lowercase()
}

/// Round half away from zero to `n_decimals` places.
pub fn round_decimals(value: f64, n_decimals: i32) -> f64 {
    let n_factor = 10f64.powi(n_decimals);
    (value * n_factor).round() / n_factor
}

/// Round to the report precision (three decimals).
pub fn round3(value: f64) -> f64 {
    round_decimals(value, N_DECIMALS)
}

/// Numeric view of a cell; `nan`/`none` text counts as missing.
pub fn derive_numeric(value: &EnumCellValue) -> Option<f64> {
    if let EnumCellValue::String(s) = value {
        let c_lower = s.trim().to_ascii_lowercase();
        if c_lower == "nan" || c_lower == "none" {
            return None;
        }
    }
    value.as_number()
}

/// Trimmed display text of a cell.
pub fn derive_text(value: &EnumCellValue) -> String {
    value.to_text().trim().to_string()
}

/// Upload base name: file stem without directories and without `.xls`/`.xlsx`.
pub fn derive_base_name(file_name: &str) -> String {
    let c_file = Path::new(file_name)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let c_base = XLSX_SUFFIX_RE.replace(&c_file, "").trim().to_string();
    if c_base.is_empty() {
        "Report".to_string()
    } else {
        c_base
    }
}

/// Clamp a requested worker count to the available parallelism.
pub(crate) fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header_text_collapses_newlines() {
        assert_eq!(normalize_header_text("  TOTAL\nN.N.W. "), "total n.n.w.");
        assert_eq!(normalize_header_text("QTY  /\tCARTON"), "qty / carton");
    }

    #[test]
    fn test_round3_half_away_from_zero() {
        assert_eq!(round3(1.23449), 1.234);
        assert_eq!(round3(2.0006), 2.001);
        assert_eq!(round3(-0.0006), -0.001);
    }

    #[test]
    fn test_derive_numeric_accepts_numeric_text() {
        assert_eq!(derive_numeric(&EnumCellValue::from(" 12.5 ")), Some(12.5));
        assert_eq!(derive_numeric(&EnumCellValue::Number(3.0)), Some(3.0));
        assert_eq!(derive_numeric(&EnumCellValue::from("nan")), None);
        assert_eq!(derive_numeric(&EnumCellValue::from("60*40*30")), None);
        assert_eq!(derive_numeric(&EnumCellValue::None), None);
    }

    #[test]
    fn test_derive_base_name_strips_directory_and_suffix() {
        assert_eq!(derive_base_name("/tmp/in/TK List.XLSX"), "TK List");
        assert_eq!(derive_base_name("packing.xls"), "packing");
        assert_eq!(derive_base_name(""), "Report");
    }

    #[test]
    fn test_calculate_worker_limit_never_zero() {
        assert_eq!(calculate_worker_limit(Some(0)), 1);
        assert!(calculate_worker_limit(None) >= 1);
    }
}
