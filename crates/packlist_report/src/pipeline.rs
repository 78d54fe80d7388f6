//! End-to-end report generation: read, segment, normalize, aggregate, lay out, assemble.

use packlist_io_xlsx::{SheetModel, SpecSourceWorkbook, read_workbook};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{SpecAggregateOptions, aggregate_table};
use crate::assemble::{assemble_artifacts, derive_sheet_names};
use crate::conf::{TUP_HEADER_SIGNATURE, derive_template_layout};
use crate::layout::{SpecLayoutContext, write_report_sheet};
use crate::normalize::{SpecNormalizeOptions, normalize_table};
use crate::report::{ReportRun, ReportRunBuilder};
use crate::segment::{SpecSegmentOptions, segment_sheet};
use crate::spec::{
    ReportError, SpecArtifact, SpecColorBreakdownEntry, SpecGeneratedSheet, SpecMatchOptions,
    SpecNormalizedTable, SpecReportOptions, SpecReportSummary, SpecStrictMismatch,
    SpecTemplateLayout, SpecValidationReport,
};
use crate::template::resolve_template;
use crate::util::{calculate_worker_limit, derive_base_name};
use crate::validate::{derive_validation_report, validate_generated_sheet};

/// Totals of one generated sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecSheetTotals {
    pub sheet_name: String,
    pub summary: SpecReportSummary,
    pub breakdown: Vec<SpecColorBreakdownEntry>,
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct SpecGenerateOutput {
    pub artifacts: Vec<SpecArtifact>,
    pub sheets: Vec<SpecGeneratedSheet>,
    pub totals: Vec<SpecSheetTotals>,
    pub validation: SpecValidationReport,
    pub report: ReportRun,
}

/// Detected table, as listed by [`inspect_workbook`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecTableOverview {
    pub n_table_idx: usize,
    /// One-based sheet row of the header.
    pub n_row_header: usize,
    pub n_data_rows: usize,
    pub order_number: String,
    pub model_name: String,
    pub n_soft_issues: usize,
}

/// Sheet choice and detected tables of an upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecWorkbookInspection {
    pub sheet_names: Vec<String>,
    pub source_sheet: String,
    pub tables: Vec<SpecTableOverview>,
}

type SpecAggregatedTable = (SpecNormalizedTable, SpecReportSummary, Vec<SpecColorBreakdownEntry>);

/// Generate report workbooks from packing-list workbook bytes.
///
/// `v_template` is an optional user template workbook; the built-in template
/// of `options.template_version` is used otherwise.
///
/// Returns [`ReportError`] for input-shape problems (no worksheet, no header,
/// no data rows) and template problems. Failures of single tables are
/// recorded in [`ReportRun::failures`] while the other tables continue.
pub fn generate_reports(
    v_bytes: &[u8],
    file_name: &str,
    options: &SpecReportOptions,
    v_template: Option<&[u8]>,
) -> Result<SpecGenerateOutput, ReportError> {
    check_options(options)?;
    let source = read_workbook(v_bytes)?;
    let layout = derive_template_layout(options.template_version);
    let template = resolve_template(v_template, &layout)?;
    generate_reports_from_source(&source, &derive_base_name(file_name), options, &layout, &template)
}

/// Same as [`generate_reports`] on an already decoded workbook.
pub fn generate_reports_from_source(
    source: &SpecSourceWorkbook,
    base_name: &str,
    options: &SpecReportOptions,
    layout: &SpecTemplateLayout,
    template: &SheetModel,
) -> Result<SpecGenerateOutput, ReportError> {
    let mut builder = ReportRunBuilder::default();
    let sheet = &source.source_sheet;

    let spec_segment = SpecSegmentOptions {
        spec_match: SpecMatchOptions::from(options),
        model_name: options.model_name.clone(),
    };
    let l_tables = segment_sheet(sheet, &TUP_HEADER_SIGNATURE, &spec_segment);
    if l_tables.is_empty() {
        return Err(ReportError::NoHeaderFound {
            sheet: sheet.name.clone(),
            n_rows: sheet.n_rows(),
            sheet_names: source.sheet_names.clone(),
        });
    }
    builder.add_tables_found(l_tables.len() as u64);
    info!(sheet = %sheet.name, n_tables = l_tables.len(), "detected packing-list tables");

    let mut l_tables_data = Vec::with_capacity(l_tables.len());
    for table in &l_tables {
        if table.data_rows().is_empty() {
            let msg = format!(
                "table {} (header on row {}) has no data rows; skipped",
                table.n_table_idx,
                table.n_row_start + 1
            );
            warn!("{msg}");
            builder.add_skipped();
            builder.add_warning(msg);
        } else {
            l_tables_data.push(table);
        }
    }
    if l_tables_data.is_empty() {
        return Err(ReportError::NoDataRows {
            n_tables: l_tables.len(),
        });
    }

    let n_workers_max = calculate_worker_limit(options.num_workers_max);
    let spec_normalize = SpecNormalizeOptions::from(options);
    let spec_aggregate = SpecAggregateOptions {
        weight_policy: options.weight_policy,
    };
    let l_aggregated: Vec<SpecAggregatedTable> =
        map_tables_parallel(l_tables_data, n_workers_max, &mut builder, |table| {
            let normalized = normalize_table(table, &spec_normalize);
            let (summary, l_breakdown) = aggregate_table(&normalized, &spec_aggregate);
            (normalized, summary, l_breakdown)
        });

    let l_order_numbers: Vec<&str> = l_aggregated
        .iter()
        .map(|(normalized, _, _)| normalized.order_number.as_str())
        .collect();
    let l_sheet_names = derive_sheet_names(&l_order_numbers);
    debug!(?l_sheet_names, "derived sheet names");

    let if_strict_validation = options.if_strict_validation;
    let l_jobs: Vec<(&SpecAggregatedTable, &str)> = l_aggregated
        .iter()
        .zip(l_sheet_names.iter().map(String::as_str))
        .collect();
    let l_results = map_tables_parallel(l_jobs, n_workers_max, &mut builder, |(aggregated, sheet_name)| {
        let (normalized, summary, l_breakdown) = aggregated;
        let ctx = SpecLayoutContext { layout, sheet_name };
        let generated = write_report_sheet(template, normalized, summary, l_breakdown, &ctx)?;
        let l_mismatches = if if_strict_validation {
            validate_generated_sheet(&generated, normalized, layout)
        } else {
            Vec::new()
        };
        Ok::<_, ReportError>((generated, l_mismatches))
    });

    let mut l_sheets = Vec::new();
    let mut l_totals = Vec::new();
    let mut l_mismatches: Vec<SpecStrictMismatch> = Vec::new();
    let mut err_first: Option<ReportError> = None;
    for ((normalized, summary, l_breakdown), result) in l_aggregated.iter().zip(l_results) {
        match result {
            Ok((generated, l_sheet_mismatches)) => {
                builder.add_generated(generated.n_data_rows);
                for msg in &generated.warnings {
                    builder.add_warning(format!("{}: {msg}", generated.sheet_name));
                }
                l_totals.push(SpecSheetTotals {
                    sheet_name: generated.sheet_name.clone(),
                    summary: *summary,
                    breakdown: l_breakdown.clone(),
                });
                l_mismatches.extend(l_sheet_mismatches);
                l_sheets.push(generated);
            }
            Err(err) => {
                warn!(n_table_idx = normalized.n_table_idx, error = %err, "table skipped");
                builder.add_failure(normalized.n_table_idx, err.to_string());
                err_first.get_or_insert(err);
            }
        }
    }
    if l_sheets.is_empty() {
        return Err(err_first.unwrap_or(ReportError::NoDataRows {
            n_tables: l_tables.len(),
        }));
    }

    let validation = derive_validation_report(
        l_aggregated.iter().map(|(normalized, _, _)| normalized),
        l_mismatches,
    );
    if !validation.strict_mismatches.is_empty() {
        warn!(
            n_mismatches = validation.strict_mismatches.len(),
            "generated cells differ from their source"
        );
    }

    let artifacts = assemble_artifacts(
        &l_sheets,
        options.output_mode,
        base_name,
        options.if_combined_borders,
    )?;
    builder.add_artifacts(artifacts.len() as u64);

    let report = builder.build();
    info!("{report}");
    Ok(SpecGenerateOutput {
        artifacts,
        sheets: l_sheets,
        totals: l_totals,
        validation,
        report,
    })
}

/// List sheets, the chosen source sheet and the tables found in it.
pub fn inspect_workbook(
    v_bytes: &[u8],
    options: &SpecReportOptions,
) -> Result<SpecWorkbookInspection, ReportError> {
    check_options(options)?;
    let source = read_workbook(v_bytes)?;
    let spec_segment = SpecSegmentOptions {
        spec_match: SpecMatchOptions::from(options),
        model_name: options.model_name.clone(),
    };
    let spec_normalize = SpecNormalizeOptions::from(options);

    let tables = segment_sheet(&source.source_sheet, &TUP_HEADER_SIGNATURE, &spec_segment)
        .iter()
        .map(|table| {
            let normalized = normalize_table(table, &spec_normalize);
            SpecTableOverview {
                n_table_idx: table.n_table_idx,
                n_row_header: table.n_row_start + 1,
                n_data_rows: normalized.n_data_rows(),
                order_number: normalized.order_number,
                model_name: normalized.model_name,
                n_soft_issues: normalized.soft_issues.len(),
            }
        })
        .collect();

    Ok(SpecWorkbookInspection {
        source_sheet: source.source_sheet.name.clone(),
        sheet_names: source.sheet_names,
        tables,
    })
}

fn check_options(options: &SpecReportOptions) -> Result<(), ReportError> {
    if !(options.match_ratio_min > 0.0 && options.match_ratio_min <= 1.0) {
        return Err(ReportError::Options(format!(
            "match_ratio_min must be in (0, 1], got {}",
            options.match_ratio_min
        )));
    }
    if options
        .material_prefixes
        .iter()
        .all(|prefix| prefix.trim().is_empty())
    {
        return Err(ReportError::Options(
            "material_prefixes needs at least one non-empty prefix".to_string(),
        ));
    }
    if options.num_workers_max == Some(0) {
        return Err(ReportError::Options("num_workers_max must be >= 1".to_string()));
    }
    Ok(())
}

/// Run `f` over `l_items` on a rayon pool, in input order.
///
/// Serial when one worker is requested or the pool cannot be built.
fn map_tables_parallel<T, R, F>(
    l_items: Vec<T>,
    n_workers_max: usize,
    builder: &mut ReportRunBuilder,
    f: F,
) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync + Send,
{
    if n_workers_max <= 1 || l_items.len() <= 1 {
        return l_items.into_iter().map(f).collect();
    }

    let thread_pool = ThreadPoolBuilder::new().num_threads(n_workers_max).build();
    let Ok(thread_pool) = thread_pool else {
        builder.add_warning(format!(
            "Failed to initialize thread pool (workers={n_workers_max}); fallback to serial processing."
        ));
        return l_items.into_iter().map(f).collect();
    };

    thread_pool.install(|| l_items.into_par_iter().map(&f).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::weighted_row;
    use crate::segment::tests::header_row;
    use crate::spec::{EnumOutputMode, EnumTemplateVersion};
    use packlist_io_xlsx::{
        EnumCellValue, SpecCellFormat, SpecRawSheet, read_raw_sheet, read_sheet_names,
        render_workbook,
    };

    fn rows_to_sheet(name: &str, l_rows: &[Vec<EnumCellValue>]) -> SheetModel {
        let mut sheet = SheetModel::new(name);
        for (row, l_cells) in l_rows.iter().enumerate() {
            for (col, value) in l_cells.iter().enumerate() {
                if !value.is_empty() {
                    sheet.set_value(row, col, value.clone());
                }
            }
        }
        sheet
    }

    fn packing_list_rows(order_number: &str) -> Vec<Vec<EnumCellValue>> {
        let mut l_rows = vec![Vec::new(); 2];
        l_rows.push(vec![EnumCellValue::from("Trail Runner")]);
        l_rows.push(Vec::new());
        l_rows.push(header_row());
        for (carton, color, n_cartons) in [
            ("1", "Red", Some(1.0)),
            ("", "Red", None),
            ("", "Blue", None),
            ("2", "Blue", Some(1.0)),
            ("", "Blue", None),
        ] {
            let mut row = weighted_row(carton, color, 12.0, 6.0, n_cartons, 1.5);
            row[1] = EnumCellValue::from(order_number);
            row[5] = EnumCellValue::from("SKU-77-OS");
            row[6] = EnumCellValue::from("X0001");
            l_rows.push(row);
        }
        l_rows
    }

    fn workbook_bytes(l_sheets: &[SheetModel]) -> Vec<u8> {
        let l_refs: Vec<&SheetModel> = l_sheets.iter().collect();
        render_workbook(&l_refs, SpecCellFormat::default())
            .expect("workbook renders")
            .0
    }

    fn source_of(l_rows: Vec<Vec<EnumCellValue>>) -> SpecSourceWorkbook {
        SpecSourceWorkbook {
            sheet_names: vec!["PL".to_string()],
            source_sheet: SpecRawSheet::from_rows("PL", l_rows),
        }
    }

    fn run_source(
        source: &SpecSourceWorkbook,
        options: &SpecReportOptions,
    ) -> Result<SpecGenerateOutput, ReportError> {
        let layout = derive_template_layout(options.template_version);
        let template = resolve_template(None, &layout)?;
        generate_reports_from_source(source, "Upload", options, &layout, &template)
    }

    #[test]
    fn test_generate_reports_from_workbook_bytes() {
        let v_bytes = workbook_bytes(&[
            rows_to_sheet("Cover", &[vec![EnumCellValue::from("cover page")]]),
            rows_to_sheet("PL", &packing_list_rows("4500123")),
        ]);
        let output = generate_reports(&v_bytes, "in/TK List.xlsx", &SpecReportOptions::default(), None)
            .expect("reports generate");

        let l_files: Vec<&str> = output.artifacts.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(l_files, vec!["TK List-4500123.xlsx", "TK ListReport.xlsx"]);
        assert_eq!(output.report.cnt_tables_generated, 1);
        assert_eq!(output.report.cnt_data_rows, 5);
        assert_eq!(output.totals[0].summary.total_carton, 2.0);
        assert_eq!(output.totals[0].summary.total_net_weight, 3.0);
        assert!(output.validation.strict_mismatches.is_empty());

        let sheet = read_raw_sheet(&output.artifacts[0].bytes, "4500123").expect("artifact reads");
        assert_eq!(sheet.cell(19, 3), &EnumCellValue::from("Red"));
        assert_eq!(sheet.cell(15, 4), &EnumCellValue::from("Trail Runner"));
    }

    #[test]
    fn test_duplicate_orders_and_empty_table_are_reported() {
        let mut l_rows = packing_list_rows("4500123");
        l_rows.push(Vec::new());
        l_rows.push(header_row());
        l_rows.push(Vec::new());
        l_rows.extend(packing_list_rows("4500123").into_iter().skip(4));
        let options = SpecReportOptions {
            output_mode: EnumOutputMode::Combined,
            num_workers_max: Some(2),
            ..Default::default()
        };

        let output = run_source(&source_of(l_rows), &options).expect("reports generate");
        assert_eq!(output.report.cnt_tables_found, 3);
        assert_eq!(output.report.cnt_tables_skipped, 1);
        assert_eq!(output.report.cnt_tables_generated, 2);
        assert_eq!(output.artifacts.len(), 1);
        assert_eq!(
            read_sheet_names(&output.artifacts[0].bytes).expect("combined reads"),
            vec!["4500123".to_string(), "4500123_2".to_string()]
        );
    }

    #[test]
    fn test_orders_differing_in_case_get_distinct_sheets() {
        let mut l_rows = packing_list_rows("po1");
        l_rows.push(Vec::new());
        l_rows.extend(packing_list_rows("PO1").into_iter().skip(4));
        let options = SpecReportOptions {
            output_mode: EnumOutputMode::Combined,
            num_workers_max: Some(1),
            ..Default::default()
        };

        let output = run_source(&source_of(l_rows), &options).expect("reports generate");
        assert_eq!(output.report.cnt_tables_generated, 2);
        assert_eq!(
            read_sheet_names(&output.artifacts[0].bytes).expect("combined reads"),
            vec!["po1".to_string(), "PO1_2".to_string()]
        );
    }

    #[test]
    fn test_missing_header_and_missing_data_are_input_errors() {
        let source = source_of(vec![vec![EnumCellValue::from("hello")]; 4]);
        match run_source(&source, &SpecReportOptions::default()) {
            Err(ReportError::NoHeaderFound { sheet, n_rows, .. }) => {
                assert_eq!(sheet, "PL");
                assert_eq!(n_rows, 4);
            }
            other => panic!("unexpected result: {:?}", other.map(|o| o.report)),
        }

        let source = source_of(vec![header_row(), Vec::new(), header_row()]);
        assert!(matches!(
            run_source(&source, &SpecReportOptions::default()),
            Err(ReportError::NoDataRows { n_tables: 2 })
        ));
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let options = SpecReportOptions {
            match_ratio_min: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            generate_reports(&[], "x.xlsx", &options, None),
            Err(ReportError::Options(_))
        ));
    }

    #[test]
    fn test_inspect_lists_tables_of_second_sheet() {
        let v_bytes = workbook_bytes(&[
            rows_to_sheet("Cover", &[]),
            rows_to_sheet("PL", &packing_list_rows("4500999")),
        ]);
        let inspection = inspect_workbook(&v_bytes, &SpecReportOptions::default())
            .expect("workbook inspects");
        assert_eq!(inspection.source_sheet, "PL");
        assert_eq!(inspection.tables.len(), 1);
        assert_eq!(inspection.tables[0].n_row_header, 5);
        assert_eq!(inspection.tables[0].order_number, "4500999");
        assert_eq!(inspection.tables[0].model_name, "Trail Runner");
    }

    #[test]
    fn test_legacy_version_runs_serially() {
        let options = SpecReportOptions {
            template_version: EnumTemplateVersion::V1Legacy,
            output_mode: EnumOutputMode::Separate,
            num_workers_max: Some(1),
            ..Default::default()
        };
        let output = run_source(&source_of(packing_list_rows("PO-1")), &options)
            .expect("reports generate");
        assert_eq!(output.artifacts.len(), 1);
        assert_eq!(
            output.sheets[0].sheet.value(13, 4),
            &EnumCellValue::from("PO-1 / PO-1")
        );
    }
}
