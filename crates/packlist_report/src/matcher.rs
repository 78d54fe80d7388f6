//! Fuzzy header-row matching and source column resolution.

use packlist_io_xlsx::EnumCellValue;
use strsim::levenshtein;

use crate::conf::{N_SIZES, TUP_SIZE_LABELS};
use crate::spec::SpecMatchOptions;
use crate::util::{derive_text, normalize_header_text};

/// Whether `row` matches `signature` with the default thresholds.
pub fn is_header_match(row: &[EnumCellValue], signature: &[&str]) -> bool {
    is_header_match_with(row, signature, &SpecMatchOptions::default())
}

/// Whether `row` matches `signature` position by position.
///
/// A position matches when the normalized texts are equal or within
/// `n_distance_max` edits; the row matches when the matched ratio reaches
/// `n_ratio_min` and the row is at least as long as the signature.
pub fn is_header_match_with(
    row: &[EnumCellValue],
    signature: &[&str],
    options: &SpecMatchOptions,
) -> bool {
    if signature.is_empty() || row.len() < signature.len() {
        return false;
    }

    let n_matched = signature
        .iter()
        .zip(row)
        .filter(|(label, cell)| {
            is_label_match(&derive_text(cell), label, options.n_distance_max)
        })
        .count();

    n_matched as f64 / signature.len() as f64 >= options.n_ratio_min
}

fn is_label_match(text: &str, label: &str, n_distance_max: usize) -> bool {
    let c_text = normalize_header_text(text);
    let c_label = normalize_header_text(label);
    c_text == c_label || levenshtein(&c_text, &c_label) <= n_distance_max
}

/// Resolve every signature label to a header column.
///
/// The label's own position wins when it matches; otherwise the first exact
/// normalized match anywhere in the header, then the closest label within the
/// distance limit. Unresolved labels yield `None`.
pub fn locate_signature_columns(
    header: &[EnumCellValue],
    signature: &[&str],
    options: &SpecMatchOptions,
) -> Vec<Option<usize>> {
    let l_texts: Vec<String> = header
        .iter()
        .map(|cell| normalize_header_text(&derive_text(cell)))
        .collect();

    signature
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            let c_label = normalize_header_text(label);
            if let Some(c_text) = l_texts.get(idx)
                && (*c_text == c_label || levenshtein(c_text, &c_label) <= options.n_distance_max)
            {
                return Some(idx);
            }
            if let Some(n_col) = l_texts.iter().position(|c_text| *c_text == c_label) {
                return Some(n_col);
            }
            l_texts
                .iter()
                .enumerate()
                .filter(|(_, c_text)| !c_text.is_empty())
                .map(|(n_col, c_text)| (levenshtein(c_text, &c_label), n_col))
                .filter(|(n_distance, _)| *n_distance <= options.n_distance_max)
                .min()
                .map(|(_, n_col)| n_col)
        })
        .collect()
}

/// Columns labelled exactly `OS`, `XS`, ..., `XXL` (trimmed, case-insensitive).
pub fn locate_size_columns(header: &[EnumCellValue]) -> [Option<usize>; N_SIZES] {
    let mut l_cols = [None; N_SIZES];
    for (n_size, label) in TUP_SIZE_LABELS.iter().enumerate() {
        l_cols[n_size] = header
            .iter()
            .position(|cell| derive_text(cell).eq_ignore_ascii_case(label));
    }
    l_cols
}
