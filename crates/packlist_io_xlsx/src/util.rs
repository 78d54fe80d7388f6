//! Stateless helper utilities used by the sheet model, reader and writer.

use std::collections::BTreeSet;

use crate::conf::{
    C_EXCEL_RESERVED_SHEET_NAME, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};

/// Base-name length kept when a collision suffix is appended.
const N_LEN_SHEET_NAME_BASE_ON_COLLISION: usize = 28;

////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
///
/// Names may not start or end with `'`, and the reserved `History` gets `replace_to` appended.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = trim_sheet_name(&c_name).to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }
    if c_name.eq_ignore_ascii_case(C_EXCEL_RESERVED_SHEET_NAME) {
        c_name.push_str(if replace_to.is_empty() { "_" } else { replace_to });
    }

    let c_name: String = c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect();
    trim_sheet_name(&c_name).to_string()
}

fn trim_sheet_name(name: &str) -> &str {
    name.trim_matches(|chr: char| chr.is_whitespace() || chr == '\'')
}

/// Create suffixed sheet name (`base_2`, `base_3`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, suffix_idx: usize) -> String {
    let c_sheet_name_suffix = format!("_{suffix_idx}");
    let n_len_base_name_max = usize::min(
        N_LEN_SHEET_NAME_BASE_ON_COLLISION,
        N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len()),
    );

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

/// Return `name` if unused, else the first free suffixed identifier.
///
/// Sheet names compare case-insensitively, so `set_names_existing` holds
/// lowercased names; the returned name keeps its case.
pub fn derive_unique_sheet_name(name: &str, set_names_existing: &mut BTreeSet<String>) -> String {
    if set_names_existing.insert(name.to_lowercase()) {
        return name.to_string();
    }

    let mut n_idx = 2usize;
    loop {
        let candidate = create_sheet_identifier(name, n_idx);
        if set_names_existing.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n_idx += 1;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellAddressing

/// Zero-based column index to Excel letters (`0 -> A`, `27 -> AB`).
pub fn derive_column_letter(col_idx: usize) -> String {
    let mut n_rest = col_idx + 1;
    let mut l_chars = Vec::new();
    while n_rest > 0 {
        let n_rem = (n_rest - 1) % 26;
        l_chars.push((b'A' + n_rem as u8) as char);
        n_rest = (n_rest - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

pub(crate) fn cast_row_num(value: usize) -> Result<u32, String> {
    if value >= N_NROWS_EXCEL_MAX {
        return Err(format!("row index overflow: {value}"));
    }
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

pub(crate) fn cast_col_num(value: usize) -> Result<u16, String> {
    if value >= N_NCOLS_EXCEL_MAX {
        return Err(format!("column index overflow: {value}"));
    }
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RangeUtils

/// Convert sorted indices to contiguous inclusive ranges.
pub fn derive_contiguous_ranges(sorted_indices: &[usize]) -> Vec<(usize, usize)> {
    let Some(n_first) = sorted_indices.first() else {
        return vec![];
    };

    let mut l_contiguous_ranges = Vec::new();
    let mut n_idx_start = *n_first;
    let mut n_idx_end = *n_first;

    for idx in &sorted_indices[1..] {
        if *idx == n_idx_end + 1 {
            n_idx_end = *idx;
        } else {
            l_contiguous_ranges.push((n_idx_start, n_idx_end));
            n_idx_start = *idx;
            n_idx_end = *idx;
        }
    }

    l_contiguous_ranges.push((n_idx_start, n_idx_end));
    l_contiguous_ranges
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
