//! Strict comparison of generated cells against their source values.

use packlist_io_xlsx::{EnumCellValue, derive_column_letter};

use crate::conf::{IDX_SIG_CASE_NOS, TUP_HEADER_SIGNATURE};
use crate::spec::{
    SpecGeneratedSheet, SpecNormalizedTable, SpecStrictMismatch, SpecTemplateLayout,
    SpecValidationReport,
};
use crate::util::{derive_numeric, derive_text};

/// Absolute tolerance for numeric cells (three-decimal rounding plus float noise).
const N_NUMERIC_TOLERANCE: f64 = 0.0005 + 1e-9;

/// Compare every mapped cell of `generated` with the source row it came from.
///
/// Carton ids are checked on the first row of each group only; the other
/// rows of a split carton are blank by construction.
pub fn validate_generated_sheet(
    generated: &SpecGeneratedSheet,
    normalized: &SpecNormalizedTable,
    layout: &SpecTemplateLayout,
) -> Vec<SpecStrictMismatch> {
    let mut l_mismatches = Vec::new();
    let sheet = &generated.sheet;

    for idx in 0..normalized.n_data_rows() {
        let n_row = generated.n_row_data_start + idx;
        let mut check = |n_col: usize, c_field: &str, original: &EnumCellValue| {
            let generated_value = sheet.value(n_row, n_col);
            if !is_value_equivalent(original, generated_value) {
                l_mismatches.push(SpecStrictMismatch {
                    order_number: generated.order_number.clone(),
                    row: n_row + 1,
                    column: derive_column_letter(n_col),
                    field_name: c_field.to_string(),
                    original_value: derive_text(original),
                    generated_value: derive_text(generated_value),
                });
            }
        };

        let if_group_first = normalized
            .group_of(idx)
            .is_none_or(|group| group.n_row_start == idx);
        if if_group_first
            && let Some(n_col_src) = normalized.columns.col(IDX_SIG_CASE_NOS)
        {
            let value_src = normalized.raw(idx, n_col_src);
            // a blank source carton is forward-filled, so only explicit ids are compared
            if !value_src.is_empty() {
                check(
                    layout.n_col_carton,
                    TUP_HEADER_SIGNATURE[IDX_SIG_CASE_NOS],
                    value_src,
                );
            }
        }

        for mapping in &layout.l_column_mappings {
            check(
                mapping.n_col_dst,
                mapping.c_field,
                normalized.raw(idx, mapping.n_col_src),
            );
        }
    }

    l_mismatches
}

/// Numbers match within the rounding tolerance; everything else by trimmed text.
fn is_value_equivalent(original: &EnumCellValue, generated: &EnumCellValue) -> bool {
    match (derive_numeric(original), derive_numeric(generated)) {
        (Some(n_original), Some(n_generated)) => {
            (n_original - n_generated).abs() <= N_NUMERIC_TOLERANCE
        }
        _ => derive_text(original) == derive_text(generated),
    }
}

/// Collect soft issues of every table and the strict mismatches found.
pub fn derive_validation_report<'a>(
    l_normalized: impl IntoIterator<Item = &'a SpecNormalizedTable>,
    l_mismatches: Vec<SpecStrictMismatch>,
) -> SpecValidationReport {
    SpecValidationReport {
        soft_issues: l_normalized
            .into_iter()
            .flat_map(|normalized| normalized.soft_issues.iter().cloned())
            .collect(),
        strict_mismatches: l_mismatches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{normalized_from, weighted_row};
    use crate::aggregate::{SpecAggregateOptions, aggregate_table};
    use crate::conf::derive_template_layout;
    use crate::layout::{SpecLayoutContext, write_report_sheet};
    use crate::spec::EnumTemplateVersion;
    use crate::template::build_default_template;

    fn generate(
        normalized: &SpecNormalizedTable,
        layout: &SpecTemplateLayout,
    ) -> SpecGeneratedSheet {
        let template = build_default_template(layout).expect("template builds");
        let (summary, l_breakdown) = aggregate_table(normalized, &SpecAggregateOptions::default());
        let ctx = SpecLayoutContext {
            layout,
            sheet_name: "PO",
        };
        write_report_sheet(&template, normalized, &summary, &l_breakdown, &ctx)
            .expect("layout succeeds")
    }

    #[test]
    fn test_generated_sheet_matches_source() {
        let normalized = normalized_from(
            vec![
                weighted_row("1", "Red", 20.0, 10.0, Some(2.0), 3.14159),
                weighted_row("", "Red", 20.0, 10.0, None, 0.0),
                weighted_row("2", "Blue", 5.0, 5.0, Some(1.0), 1.0),
            ],
            &[],
        );
        for version in [EnumTemplateVersion::V1Legacy, EnumTemplateVersion::V2Extended] {
            let layout = derive_template_layout(version);
            let generated = generate(&normalized, &layout);
            assert!(validate_generated_sheet(&generated, &normalized, &layout).is_empty());
        }
    }

    #[test]
    fn test_tampered_cell_is_reported() {
        let normalized = normalized_from(
            vec![weighted_row("1", "Red", 20.0, 10.0, Some(2.0), 3.0)],
            &[],
        );
        let layout = derive_template_layout(EnumTemplateVersion::V2Extended);
        let mut generated = generate(&normalized, &layout);
        generated
            .sheet
            .set_value(layout.n_row_data_start, 16, EnumCellValue::Number(3.5));
        generated
            .sheet
            .set_value(layout.n_row_data_start, layout.n_col_carton, "9");

        let l_mismatches = validate_generated_sheet(&generated, &normalized, &layout);
        assert_eq!(l_mismatches.len(), 2);
        assert_eq!(l_mismatches[0].column, "C");
        assert_eq!(l_mismatches[1].column, "Q");
        assert_eq!(l_mismatches[1].row, layout.n_row_data_start + 1);
        assert_eq!(l_mismatches[1].field_name, "TOTAL N.W.");
        assert_eq!(l_mismatches[1].original_value, "3");
        assert_eq!(l_mismatches[1].generated_value, "3.5");
    }

    #[test]
    fn test_validation_report_serializes_camel_case() {
        let report = derive_validation_report(
            std::iter::empty(),
            vec![SpecStrictMismatch {
                order_number: "PO1".to_string(),
                row: 20,
                column: "N".to_string(),
                field_name: "CARTON".to_string(),
                original_value: "1".to_string(),
                generated_value: "2".to_string(),
            }],
        );
        let json = serde_json::to_value(&report).expect("report serializes");
        assert_eq!(json["strictMismatches"][0]["orderNumber"], "PO1");
        assert_eq!(json["strictMismatches"][0]["fieldName"], "CARTON");
        assert!(json["softIssues"].as_array().is_some_and(Vec::is_empty));
    }
}
