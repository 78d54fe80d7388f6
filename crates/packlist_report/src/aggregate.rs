//! Shipment totals and the color x size unit breakdown.

use packlist_io_xlsx::EnumCellValue;

use crate::conf::{
    IDX_SIG_CARTON, IDX_SIG_QTY_PER_CARTON, IDX_SIG_TOTAL_CBM, IDX_SIG_TOTAL_GW, IDX_SIG_TOTAL_NNW,
    IDX_SIG_TOTAL_NW, IDX_SIG_TOTAL_QTY, N_SIZES,
};
use crate::spec::{
    EnumWeightPolicy, SpecColorBreakdownEntry, SpecNormalizedTable, SpecReportSummary,
};
use crate::util::{derive_numeric, round3};

/// Aggregation settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecAggregateOptions {
    pub weight_policy: EnumWeightPolicy,
}

/// Source column of the OS quantity for data row `idx`.
///
/// Rows of a split carton (contiguous group of more than one row) read
/// `Total QTY`; single-row cartons read `QTY / CARTON`.
pub fn derive_os_source_col(normalized: &SpecNormalizedTable, idx: usize) -> Option<usize> {
    let if_split = normalized
        .group_of(idx)
        .is_some_and(|group| group.if_split());
    if if_split {
        normalized.columns.col(IDX_SIG_TOTAL_QTY)
    } else {
        normalized.columns.col(IDX_SIG_QTY_PER_CARTON)
    }
}

/// Raw OS..XXL cells of data row `idx`; missing size columns are empty.
pub fn derive_row_size_values(
    normalized: &SpecNormalizedTable,
    idx: usize,
) -> [EnumCellValue; N_SIZES] {
    let mut l_values: [EnumCellValue; N_SIZES] = Default::default();
    if let Some(n_col) = derive_os_source_col(normalized, idx) {
        l_values[0] = normalized.raw(idx, n_col).clone();
    }
    for n_size in 1..N_SIZES {
        if let Some(n_col) = normalized.columns.l_cols_size[n_size] {
            l_values[n_size] = normalized.raw(idx, n_col).clone();
        }
    }
    l_values
}

/// Numeric OS..XXL quantities of data row `idx` (non-numeric counts as zero).
pub fn derive_row_size_quantities(normalized: &SpecNormalizedTable, idx: usize) -> [f64; N_SIZES] {
    derive_row_size_values(normalized, idx).map(|value| derive_numeric(&value).unwrap_or(0.0))
}

/// Compute the shipment summary and the color breakdown of one table.
///
/// Pure function of its inputs.
pub fn aggregate_table(
    normalized: &SpecNormalizedTable,
    options: &SpecAggregateOptions,
) -> (SpecReportSummary, Vec<SpecColorBreakdownEntry>) {
    (
        derive_report_summary(normalized, options.weight_policy),
        derive_color_breakdown(normalized),
    )
}

fn derive_report_summary(
    normalized: &SpecNormalizedTable,
    weight_policy: EnumWeightPolicy,
) -> SpecReportSummary {
    let l_rows_weighted: Vec<usize> = match weight_policy {
        EnumWeightPolicy::PerCartonGroup => normalized
            .groups
            .iter()
            .map(|group| group.n_row_start)
            .collect(),
        EnumWeightPolicy::PerRow => (0..normalized.n_data_rows()).collect(),
    };
    let derive_total = |idx_sig: usize| -> f64 {
        let Some(n_col) = normalized.columns.col(idx_sig) else {
            return 0.0;
        };
        let n_sum: f64 = l_rows_weighted
            .iter()
            .map(|idx| round3(derive_numeric(normalized.raw(*idx, n_col)).unwrap_or(0.0)))
            .sum();
        round3(n_sum).max(0.0)
    };

    let n_cartons: f64 = normalized
        .groups
        .iter()
        .map(|group| {
            normalized
                .columns
                .col(IDX_SIG_CARTON)
                .and_then(|n_col| derive_numeric(normalized.raw(group.n_row_start, n_col)))
                .filter(|n_count| *n_count > 0.0)
                .unwrap_or(1.0)
        })
        .sum();

    SpecReportSummary {
        total_carton: n_cartons.floor(),
        total_net_net_weight: derive_total(IDX_SIG_TOTAL_NNW),
        total_net_weight: derive_total(IDX_SIG_TOTAL_NW),
        total_gross_weight: derive_total(IDX_SIG_TOTAL_GW),
        total_cbm: derive_total(IDX_SIG_TOTAL_CBM),
    }
}

/// Per-color size quantities multiplied by the carried units-per-carton factor.
fn derive_color_breakdown(normalized: &SpecNormalizedTable) -> Vec<SpecColorBreakdownEntry> {
    let mut l_entries: Vec<SpecColorBreakdownEntry> = Vec::new();
    for (idx, row) in normalized.rows.iter().enumerate() {
        if row.color.is_empty() {
            continue;
        }
        let n_factor = row.units_factor.unwrap_or(0.0);
        let l_quantities = derive_row_size_quantities(normalized, idx);

        let n_entry = match l_entries.iter().position(|entry| entry.color == row.color) {
            Some(n_entry) => n_entry,
            None => {
                l_entries.push(SpecColorBreakdownEntry {
                    color: row.color.clone(),
                    size_quantities: [0.0; N_SIZES],
                    total: 0.0,
                });
                l_entries.len() - 1
            }
        };
        let entry = &mut l_entries[n_entry];
        for (n_size, n_qty) in l_quantities.iter().enumerate() {
            entry.size_quantities[n_size] += n_qty * n_factor;
        }
    }

    for entry in &mut l_entries {
        entry.total = entry.size_quantities.iter().sum();
    }
    l_entries
}

/// Column sums of the breakdown, one per size, plus the grand total.
pub fn derive_breakdown_totals(l_entries: &[SpecColorBreakdownEntry]) -> ([f64; N_SIZES], f64) {
    let mut l_totals = [0.0; N_SIZES];
    for entry in l_entries {
        for (n_size, n_qty) in entry.size_quantities.iter().enumerate() {
            l_totals[n_size] += n_qty;
        }
    }
    let n_grand_total = l_entries.iter().map(|entry| entry.total).sum();
    (l_totals, n_grand_total)
}
