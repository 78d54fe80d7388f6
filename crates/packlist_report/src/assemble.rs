//! Sheet naming and workbook assembly (separate and combined artifacts).

use std::collections::BTreeSet;

use packlist_io_xlsx::{
    N_BORDER_MEDIUM, SheetModel, SpecCellFormat, SpecMergeRange, derive_contiguous_ranges,
    derive_unique_sheet_name, render_workbook, sanitize_sheet_name,
};
use tracing::{debug, warn};

use crate::conf::{
    C_LABEL_CARTON_HEADER, C_LABEL_SHIP_TO, C_LABEL_SUMMARY, C_LABEL_TOTAL, N_COLS_SHIP_TO_BOX,
    N_ROWS_SHIP_TO_BOX, N_SIZES, TUP_SUMMARY_LABELS,
};
use crate::spec::{EnumOutputMode, ReportError, SpecArtifact, SpecGeneratedSheet};

/// Final sheet names, in input order.
///
/// Candidates are the order numbers (`Report {n}` when blank), sanitized and
/// truncated; collisions get a `_{k}` suffix. The first occurrence keeps its name.
pub fn derive_sheet_names<S: AsRef<str>>(l_order_numbers: &[S]) -> Vec<String> {
    let mut set_names_existing = BTreeSet::new();
    l_order_numbers
        .iter()
        .enumerate()
        .map(|(idx, order_number)| {
            let c_order = order_number.as_ref().trim();
            let c_candidate = if c_order.is_empty() {
                format!("Report {}", idx + 1)
            } else {
                c_order.to_string()
            };
            derive_unique_sheet_name(&sanitize_sheet_name(&c_candidate, "_"), &mut set_names_existing)
        })
        .collect()
}

/// Render the requested artifacts for `l_sheets`.
pub fn assemble_artifacts(
    l_sheets: &[SpecGeneratedSheet],
    mode: EnumOutputMode,
    base_name: &str,
    if_combined_borders: bool,
) -> Result<Vec<SpecArtifact>, ReportError> {
    let fmt_default = SpecCellFormat {
        font_name: Some("Arial".to_string()),
        font_size: Some(10),
        ..Default::default()
    };
    let mut l_artifacts = Vec::new();

    if mode.if_separate() {
        for generated in l_sheets {
            let (v_bytes, report) = render_workbook(&[&generated.sheet], fmt_default.clone())?;
            for msg in &report.warnings {
                warn!(sheet = generated.sheet_name.as_str(), "{msg}");
            }
            l_artifacts.push(SpecArtifact {
                file_name: format!("{base_name}-{}.xlsx", generated.sheet_name),
                bytes: v_bytes,
                sheet_names: report.sheets,
            });
        }
    }

    if mode.if_combined() && !l_sheets.is_empty() {
        let l_models: Vec<SheetModel> = l_sheets
            .iter()
            .map(|generated| {
                let mut sheet = generated.sheet.clone();
                if if_combined_borders {
                    let n_boxes = apply_combined_borders(&mut sheet);
                    debug!(sheet = generated.sheet_name.as_str(), n_boxes, "re-derived border boxes");
                }
                sheet
            })
            .collect();
        let l_refs: Vec<&SheetModel> = l_models.iter().collect();
        let (v_bytes, report) = render_workbook(&l_refs, fmt_default)?;
        for msg in &report.warnings {
            warn!("{msg}");
        }
        l_artifacts.push(SpecArtifact {
            file_name: format!("{base_name}Report.xlsx"),
            bytes: v_bytes,
            sheet_names: report.sheets,
        });
    }

    Ok(l_artifacts)
}

////////////////////////////////////////////////////////////////////////////////
// #region CombinedBorders

/// Draw medium boxes around the main table, ship-to panel, summary and breakdown.
///
/// Every box is located by its marker text, not by row arithmetic. Returns
/// the number of boxes drawn.
pub fn apply_combined_borders(sheet: &mut SheetModel) -> usize {
    let l_ranges: Vec<SpecMergeRange> = [
        derive_table_box(sheet),
        derive_ship_to_box(sheet),
        derive_summary_box(sheet),
        derive_breakdown_box(sheet),
    ]
    .into_iter()
    .flatten()
    .collect();

    for range in &l_ranges {
        sheet.apply_box_border(range, N_BORDER_MEDIUM);
    }
    l_ranges.len()
}

fn is_cell_filled(sheet: &SheetModel, row: usize, col: usize) -> bool {
    !sheet.value(row, col).is_empty()
}

/// Header row (`Carton#`) through the last contiguous non-empty row below it.
fn derive_table_box(sheet: &SheetModel) -> Option<SpecMergeRange> {
    let (n_row_header, n_col_first) = sheet.find_text(C_LABEL_CARTON_HEADER).into_iter().min()?;
    let n_col_last = sheet
        .cells()
        .filter(|((row, col), cell)| {
            *row == n_row_header && *col >= n_col_first && !cell.value.is_empty()
        })
        .map(|((_, col), _)| *col)
        .max()
        .unwrap_or(n_col_first);

    let n_row_max = sheet.max_row()?;
    let l_rows_filled: Vec<usize> = (n_row_header..=n_row_max)
        .filter(|row| {
            (n_col_first..=n_col_last).any(|col| {
                is_cell_filled(sheet, *row, col) || sheet.merge_at(*row, col).is_some()
            })
        })
        .collect();
    let (_, n_row_last) = derive_contiguous_ranges(&l_rows_filled).into_iter().next()?;
    Some(SpecMergeRange::new(n_row_header, n_col_first, n_row_last, n_col_last))
}

fn derive_ship_to_box(sheet: &SheetModel) -> Option<SpecMergeRange> {
    let (row, col) = sheet.find_text(C_LABEL_SHIP_TO).into_iter().min()?;
    Some(SpecMergeRange::new(
        row,
        col,
        row + N_ROWS_SHIP_TO_BOX - 1,
        col + N_COLS_SHIP_TO_BOX - 1,
    ))
}

/// `Summary` header through its label rows; width from the header merge.
fn derive_summary_box(sheet: &SheetModel) -> Option<SpecMergeRange> {
    let (row, col) = sheet.find_text(C_LABEL_SUMMARY).into_iter().max()?;
    let n_col_end = sheet
        .merge_at(row, col)
        .map(|merge| merge.col_end)
        .unwrap_or(col + 1);
    let n_row_end = (row + 1..=row + TUP_SUMMARY_LABELS.len())
        .take_while(|n_row| is_cell_filled(sheet, *n_row, col))
        .last()
        .unwrap_or(row);
    Some(SpecMergeRange::new(row, col, n_row_end, n_col_end))
}

/// Breakdown grid: a `Total` header cell whose row starts with a color label,
/// down to the `Total` row in the label column.
fn derive_breakdown_box(sheet: &SheetModel) -> Option<SpecMergeRange> {
    let l_totals = sheet.find_text(C_LABEL_TOTAL);
    l_totals.iter().find_map(|(n_row_header, n_col_total)| {
        let n_col_label = n_col_total.checked_sub(N_SIZES + 1)?;
        let n_row_total = l_totals
            .iter()
            .filter(|(row, col)| *col == n_col_label && row > n_row_header)
            .map(|(row, _)| *row)
            .min()?;
        let c_label = sheet.value(*n_row_header, n_col_label).to_text();
        let if_color_label = c_label.trim().eq_ignore_ascii_case("color")
            || c_label.trim().eq_ignore_ascii_case("colour");
        if_color_label.then(|| SpecMergeRange::new(*n_row_header, n_col_label, n_row_total, *n_col_total))
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{normalized_from, weighted_row};
    use crate::aggregate::{SpecAggregateOptions, aggregate_table};
    use crate::conf::derive_template_layout;
    use crate::layout::{SpecLayoutContext, write_report_sheet};
    use crate::spec::{EnumTemplateVersion, SpecTemplateLayout};
    use crate::template::build_default_template;
    use packlist_io_xlsx::{N_BORDER_THIN, read_sheet_names};

    fn generate(layout: &SpecTemplateLayout, sheet_name: &str) -> SpecGeneratedSheet {
        let normalized = normalized_from(
            vec![
                weighted_row("1", "Red", 20.0, 10.0, Some(1.0), 2.0),
                weighted_row("", "Blue", 20.0, 10.0, None, 0.0),
                weighted_row("2", "Blue", 5.0, 5.0, Some(1.0), 1.0),
            ],
            &[],
        );
        let template = build_default_template(layout).expect("template builds");
        let (summary, l_breakdown) = aggregate_table(&normalized, &SpecAggregateOptions::default());
        let ctx = SpecLayoutContext { layout, sheet_name };
        write_report_sheet(&template, &normalized, &summary, &l_breakdown, &ctx)
            .expect("layout succeeds")
    }

    #[test]
    fn test_sheet_names_are_deduplicated_in_order() {
        let l_names = derive_sheet_names(&["4500001", "4500001", "4500001"]);
        assert_eq!(l_names, vec!["4500001", "4500001_2", "4500001_3"]);

        let l_names = derive_sheet_names(&["PO/1", "", "a".repeat(40).as_str()]);
        assert_eq!(l_names[0], "PO_1");
        assert_eq!(l_names[1], "Report 2");
        assert_eq!(l_names[2].chars().count(), 31);

        let l_names = derive_sheet_names(&["po1", "PO1", "Po1"]);
        assert_eq!(l_names, vec!["po1", "PO1_2", "Po1_3"]);
    }

    #[test]
    fn test_combined_borders_found_by_marker_text() {
        let layout = derive_template_layout(EnumTemplateVersion::V2Extended);
        let generated = generate(&layout, "PO");
        let mut sheet = generated.sheet.clone();

        assert_eq!(apply_combined_borders(&mut sheet), 4);

        let n_row_last_data = layout.n_row_data_start + 2;
        let fmt = sheet.format(n_row_last_data, layout.n_col_carton).expect("formatted");
        assert_eq!(fmt.left, Some(N_BORDER_MEDIUM));
        assert_eq!(fmt.bottom, Some(N_BORDER_MEDIUM));
        let fmt = sheet
            .format(generated.n_row_summary + 5, layout.n_col_summary_value)
            .expect("formatted");
        assert_eq!(fmt.bottom, Some(N_BORDER_MEDIUM));
        assert_eq!(fmt.right, Some(N_BORDER_MEDIUM));

        let n_row_breakdown = generated.n_row_summary + layout.n_row_breakdown_offset;
        let fmt = sheet
            .format(n_row_breakdown + 1, layout.n_col_breakdown_start + 3)
            .expect("formatted");
        assert_eq!(fmt.left, Some(N_BORDER_THIN));
        let fmt = sheet
            .format(n_row_breakdown, layout.n_col_breakdown_start + 8)
            .expect("formatted");
        assert_eq!(fmt.top, Some(N_BORDER_MEDIUM));
        assert_eq!(fmt.right, Some(N_BORDER_MEDIUM));
    }

    #[test]
    fn test_assemble_both_modes_names_artifacts() {
        let layout = derive_template_layout(EnumTemplateVersion::V2Extended);
        let l_sheets = vec![generate(&layout, "PO1"), generate(&layout, "PO1_2")];

        let l_artifacts = assemble_artifacts(&l_sheets, EnumOutputMode::Both, "TK List", true)
            .expect("artifacts render");
        let l_files: Vec<&str> = l_artifacts.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(l_files, vec!["TK List-PO1.xlsx", "TK List-PO1_2.xlsx", "TK ListReport.xlsx"]);
        for artifact in &l_artifacts {
            assert!(artifact.bytes.starts_with(b"PK"));
        }
        assert_eq!(
            read_sheet_names(&l_artifacts[2].bytes).expect("combined workbook reads"),
            vec!["PO1".to_string(), "PO1_2".to_string()]
        );

        let l_artifacts = assemble_artifacts(&l_sheets, EnumOutputMode::Separate, "x", false)
            .expect("artifacts render");
        assert_eq!(l_artifacts.len(), 2);
    }
}
