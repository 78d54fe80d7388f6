//! Forward-fill of sparse per-carton fields and carton grouping.

use packlist_io_xlsx::EnumCellValue;

use crate::conf::{
    IDX_SIG_CARTON, IDX_SIG_CASE_NOS, IDX_SIG_COLOR, IDX_SIG_MATERIAL_NO, IDX_SIG_PO_NO,
    IDX_SIG_S4_MATERIAL, TUP_HEADER_SIGNATURE, TUP_IDX_SIG_NUMERIC, TUP_MATERIAL_PREFIXES_ALLOWED,
};
use crate::matcher::{locate_signature_columns, locate_size_columns};
use crate::spec::{
    SpecCartonGroup, SpecExtractedTable, SpecMatchOptions, SpecNormalizedRow, SpecNormalizedTable,
    SpecReportOptions, SpecSoftIssue, SpecSourceColumns,
};
use crate::util::{derive_numeric, derive_text};

/// Normalizer settings.
#[derive(Debug, Clone)]
pub struct SpecNormalizeOptions {
    pub spec_match: SpecMatchOptions,
    /// Accepted prefixes of the secondary material code.
    pub material_prefixes: Vec<String>,
}

impl Default for SpecNormalizeOptions {
    fn default() -> Self {
        Self {
            spec_match: SpecMatchOptions::default(),
            material_prefixes: TUP_MATERIAL_PREFIXES_ALLOWED
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl From<&SpecReportOptions> for SpecNormalizeOptions {
    fn from(options: &SpecReportOptions) -> Self {
        Self {
            spec_match: SpecMatchOptions::from(options),
            material_prefixes: options.material_prefixes.clone(),
        }
    }
}

/// Forward-fill one extracted table and partition it into carton groups.
pub fn normalize_table(
    table: &SpecExtractedTable,
    options: &SpecNormalizeOptions,
) -> SpecNormalizedTable {
    let header = table.header().to_vec();
    let columns = SpecSourceColumns {
        l_cols_signature: locate_signature_columns(
            &header,
            &TUP_HEADER_SIGNATURE,
            &options.spec_match,
        ),
        l_cols_size: locate_size_columns(&header),
    };

    let mut l_soft_issues = Vec::new();
    for (idx, label) in TUP_HEADER_SIGNATURE.iter().enumerate() {
        if columns.col(idx).is_none() {
            l_soft_issues.push(SpecSoftIssue {
                row: table.n_row_start + 1,
                column: label.to_string(),
                issue: "column not found in header; field treated as empty".to_string(),
                value: String::new(),
            });
        }
    }

    let data_rows = table.data_rows().to_vec();
    let derive_cell = |row: &[EnumCellValue], idx_sig: usize| -> EnumCellValue {
        columns
            .col(idx_sig)
            .and_then(|n_col| row.get(n_col))
            .cloned()
            .unwrap_or_default()
    };

    let mut l_rows: Vec<SpecNormalizedRow> = Vec::with_capacity(data_rows.len());
    let mut row_prev = SpecNormalizedRow::default();
    for (idx, row) in data_rows.iter().enumerate() {
        let n_row_sheet = table.sheet_row_of(idx) + 1;
        let mut row_norm = row_prev.clone();

        let c_carton = derive_text(&derive_cell(row, IDX_SIG_CASE_NOS));
        if !c_carton.is_empty() {
            row_norm.carton_id = c_carton;
        }
        let c_color = derive_text(&derive_cell(row, IDX_SIG_COLOR));
        if !c_color.is_empty() {
            row_norm.color = c_color;
        }
        let c_sku = derive_text(&derive_cell(row, IDX_SIG_S4_MATERIAL));
        if !c_sku.is_empty() {
            row_norm.sku = c_sku;
        }

        let value_material = derive_cell(row, IDX_SIG_MATERIAL_NO);
        let c_material = derive_text(&value_material);
        if is_material_code_accepted(&value_material, &options.material_prefixes) {
            row_norm.material_code = c_material;
        } else if !c_material.is_empty() {
            l_soft_issues.push(SpecSoftIssue {
                row: n_row_sheet,
                column: TUP_HEADER_SIGNATURE[IDX_SIG_MATERIAL_NO].to_string(),
                issue: format!(
                    "material code does not start with {}; previous code kept",
                    options.material_prefixes.join("/")
                ),
                value: c_material,
            });
        }

        if let Some(n_units) = derive_numeric(&derive_cell(row, IDX_SIG_CARTON)) {
            row_norm.units_factor = Some(n_units);
        }

        for idx_sig in TUP_IDX_SIG_NUMERIC {
            let value = derive_cell(row, idx_sig);
            if !value.is_empty() && derive_numeric(&value).is_none() {
                l_soft_issues.push(SpecSoftIssue {
                    row: n_row_sheet,
                    column: TUP_HEADER_SIGNATURE[idx_sig].to_string(),
                    issue: "non-numeric value in numeric column".to_string(),
                    value: derive_text(&value),
                });
            }
        }
        if row_norm.color.is_empty() {
            l_soft_issues.push(SpecSoftIssue {
                row: n_row_sheet,
                column: TUP_HEADER_SIGNATURE[IDX_SIG_COLOR].to_string(),
                issue: "data row without color".to_string(),
                value: String::new(),
            });
        }

        row_prev = row_norm.clone();
        l_rows.push(row_norm);
    }

    let groups = derive_carton_groups(&mut l_rows);
    let l_carton_occurrences = derive_carton_occurrences(&l_rows);
    let order_number = data_rows
        .first()
        .map(|row| derive_text(&derive_cell(row, IDX_SIG_PO_NO)))
        .unwrap_or_default();

    SpecNormalizedTable {
        n_table_idx: table.n_table_idx,
        header,
        data_rows,
        rows: l_rows,
        groups,
        l_carton_occurrences,
        columns,
        model_name: table.model_name.clone(),
        side_text: table.side_text.clone(),
        order_number,
        n_row_start: table.n_row_start,
        soft_issues: l_soft_issues,
    }
}

/// Text values starting with an allowed prefix pass; numbers never do.
fn is_material_code_accepted(value: &EnumCellValue, l_prefixes: &[String]) -> bool {
    match value {
        EnumCellValue::String(s) => {
            let c_code = s.trim();
            !c_code.is_empty() && l_prefixes.iter().any(|prefix| c_code.starts_with(prefix.as_str()))
        }
        _ => false,
    }
}

/// Maximal runs of equal consecutive carton ids; records each row's group index.
fn derive_carton_groups(l_rows: &mut [SpecNormalizedRow]) -> Vec<SpecCartonGroup> {
    let mut l_groups: Vec<SpecCartonGroup> = Vec::new();
    for (idx, row) in l_rows.iter_mut().enumerate() {
        match l_groups.last_mut() {
            Some(group) if group.carton_id == row.carton_id => {
                group.n_row_end = idx;
                group.n_rows += 1;
            }
            _ => l_groups.push(SpecCartonGroup {
                carton_id: row.carton_id.clone(),
                n_row_start: idx,
                n_row_end: idx,
                n_rows: 1,
            }),
        }
        row.n_group_idx = l_groups.len() - 1;
    }
    l_groups
}

fn derive_carton_occurrences(l_rows: &[SpecNormalizedRow]) -> Vec<(String, usize)> {
    let mut l_occurrences: Vec<(String, usize)> = Vec::new();
    for row in l_rows.iter().filter(|row| !row.carton_id.is_empty()) {
        match l_occurrences.iter_mut().find(|(id, _)| *id == row.carton_id) {
            Some((_, n_count)) => *n_count += 1,
            None => l_occurrences.push((row.carton_id.clone(), 1)),
        }
    }
    l_occurrences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::tests::{data_row, header_row};

    fn table_from(l_data: Vec<Vec<EnumCellValue>>) -> SpecExtractedTable {
        let mut rows = vec![header_row()];
        rows.extend(l_data);
        SpecExtractedTable {
            n_table_idx: 0,
            rows,
            model_name: String::new(),
            side_text: String::new(),
            n_row_start: 4,
        }
    }

    fn with_cell(mut row: Vec<EnumCellValue>, col: usize, value: EnumCellValue) -> Vec<EnumCellValue> {
        row[col] = value;
        row
    }

    #[test]
    fn test_forward_fill_uses_nearest_preceding_value() {
        let table = table_from(vec![
            with_cell(data_row("", ""), 5, EnumCellValue::from("SKU-A01")),
            data_row("7", "Red"),
            data_row("", ""),
            with_cell(data_row("8", ""), 5, EnumCellValue::from("SKU-B02")),
        ]);
        let normalized = normalize_table(&table, &SpecNormalizeOptions::default());

        let l_cartons: Vec<&str> = normalized.rows.iter().map(|row| row.carton_id.as_str()).collect();
        let l_colors: Vec<&str> = normalized.rows.iter().map(|row| row.color.as_str()).collect();
        let l_skus: Vec<&str> = normalized.rows.iter().map(|row| row.sku.as_str()).collect();
        assert_eq!(l_cartons, vec!["", "7", "7", "8"]);
        assert_eq!(l_colors, vec!["", "Red", "Red", "Red"]);
        assert_eq!(l_skus, vec!["SKU-A01", "SKU-A01", "SKU-A01", "SKU-B02"]);
        assert_eq!(normalized.order_number, "4500001");
        assert!(normalized.soft_issues.iter().any(|issue| issue.row == 6 && issue.column == "COLOR"));
    }

    #[test]
    fn test_material_code_gate_keeps_previous_code() {
        let table = table_from(vec![
            with_cell(data_row("1", "Red"), 6, EnumCellValue::from("X1001")),
            with_cell(data_row("2", "Red"), 6, EnumCellValue::from("Z9999")),
            with_cell(data_row("3", "Red"), 6, EnumCellValue::Number(42.0)),
            with_cell(data_row("4", "Red"), 6, EnumCellValue::from("L2002")),
        ]);
        let normalized = normalize_table(&table, &SpecNormalizeOptions::default());

        let l_codes: Vec<&str> = normalized.rows.iter().map(|row| row.material_code.as_str()).collect();
        assert_eq!(l_codes, vec!["X1001", "X1001", "X1001", "L2002"]);
        let n_rejected = normalized
            .soft_issues
            .iter()
            .filter(|issue| issue.column == "Material No#")
            .count();
        assert_eq!(n_rejected, 2);
    }

    #[test]
    fn test_carton_groups_partition_rows_and_split_repeats() {
        let table = table_from(vec![
            data_row("1", "Red"),
            data_row("", "Red"),
            data_row("2", "Blue"),
            data_row("1", "Red"),
            data_row("", "Red"),
        ]);
        let normalized = normalize_table(&table, &SpecNormalizeOptions::default());

        let l_spans: Vec<(usize, usize)> = normalized
            .groups
            .iter()
            .map(|group| (group.n_row_start, group.n_row_end))
            .collect();
        assert_eq!(l_spans, vec![(0, 1), (2, 2), (3, 4)]);

        let n_covered: usize = normalized.groups.iter().map(|group| group.n_rows).sum();
        assert_eq!(n_covered, normalized.n_data_rows());
        for pair in normalized.groups.windows(2) {
            assert_eq!(pair[0].n_row_end + 1, pair[1].n_row_start);
        }
        assert_eq!(
            normalized.l_carton_occurrences,
            vec![("1".to_string(), 4), ("2".to_string(), 1)]
        );
        assert_eq!(normalized.group_of(4).map(|group| group.n_rows), Some(2));
    }

    #[test]
    fn test_units_factor_and_non_numeric_issues() {
        let table = table_from(vec![
            with_cell(data_row("1", "Red"), 10, EnumCellValue::Number(2.0)),
            with_cell(data_row("2", "Red"), 16, EnumCellValue::from("n/a")),
        ]);
        let normalized = normalize_table(&table, &SpecNormalizeOptions::default());

        assert_eq!(normalized.rows[1].units_factor, Some(2.0));
        assert!(
            normalized
                .soft_issues
                .iter()
                .any(|issue| issue.column == "TOTAL N.W." && issue.value == "n/a")
        );
    }
}
