//! Run report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// One table that could not be turned into a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecTableFailure {
    /// Zero-based table index in sheet order.
    pub n_table_idx: usize,
    /// Error text.
    pub message: String,
}

/// Aggregate counters and diagnostics for one `generate_reports` run.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ReportRun {
    /// Header occurrences found in the source sheet.
    pub cnt_tables_found: u64,
    /// Tables turned into report sheets.
    pub cnt_tables_generated: u64,
    /// Tables without data rows.
    pub cnt_tables_skipped: u64,
    /// Data rows across generated tables.
    pub cnt_data_rows: u64,
    /// Workbooks produced.
    pub cnt_artifacts: u64,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
    /// Per-table failures.
    pub failures: Vec<SpecTableFailure>,
}

impl ReportRun {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_tables_found".to_string(), self.cnt_tables_found);
        dict_counts.insert("cnt_tables_generated".to_string(), self.cnt_tables_generated);
        dict_counts.insert("cnt_tables_skipped".to_string(), self.cnt_tables_skipped);
        dict_counts.insert("cnt_tables_failed".to_string(), self.failure_count() as u64);
        dict_counts.insert("cnt_data_rows".to_string(), self.cnt_data_rows);
        dict_counts.insert("cnt_artifacts".to_string(), self.cnt_artifacts);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} tables={} generated={} skipped={} failed={} rows={} artifacts={} warnings={}",
            dict_counts["cnt_tables_found"],
            dict_counts["cnt_tables_generated"],
            dict_counts["cnt_tables_skipped"],
            dict_counts["cnt_tables_failed"],
            dict_counts["cnt_data_rows"],
            dict_counts["cnt_artifacts"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[REPORT]"))
    }
}

/// Mutable accumulator for run statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportRunBuilder {
    /// See [`ReportRun::cnt_tables_found`].
    pub cnt_tables_found: u64,
    /// See [`ReportRun::cnt_tables_generated`].
    pub cnt_tables_generated: u64,
    /// See [`ReportRun::cnt_tables_skipped`].
    pub cnt_tables_skipped: u64,
    /// See [`ReportRun::cnt_data_rows`].
    pub cnt_data_rows: u64,
    /// See [`ReportRun::cnt_artifacts`].
    pub cnt_artifacts: u64,
    /// See [`ReportRun::warnings`].
    pub warnings: Vec<String>,
    /// See [`ReportRun::failures`].
    pub failures: Vec<SpecTableFailure>,
}

impl ReportRunBuilder {
    pub fn add_tables_found(&mut self, value: u64) {
        self.cnt_tables_found += value;
    }

    /// Count one generated table and its data rows.
    pub fn add_generated(&mut self, n_data_rows: usize) {
        self.cnt_tables_generated += 1;
        self.cnt_data_rows += n_data_rows as u64;
    }

    pub fn add_skipped(&mut self) {
        self.cnt_tables_skipped += 1;
    }

    pub fn add_artifacts(&mut self, value: u64) {
        self.cnt_artifacts += value;
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Add one table-scoped failure.
    pub fn add_failure(&mut self, n_table_idx: usize, message: String) {
        self.failures.push(SpecTableFailure {
            n_table_idx,
            message,
        });
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportRun {
        ReportRun {
            cnt_tables_found: self.cnt_tables_found,
            cnt_tables_generated: self.cnt_tables_generated,
            cnt_tables_skipped: self.cnt_tables_skipped,
            cnt_data_rows: self.cnt_data_rows,
            cnt_artifacts: self.cnt_artifacts,
            warnings: self.warnings,
            failures: self.failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_run_to_dict_and_format() {
        let mut builder = ReportRunBuilder::default();
        builder.add_tables_found(3);
        builder.add_generated(5);
        builder.add_generated(2);
        builder.add_skipped();
        builder.add_artifacts(3);
        builder.add_warning("w".to_string());
        let report = builder.build();

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_tables_found"], 3);
        assert_eq!(dict_counts["cnt_tables_generated"], 2);
        assert_eq!(dict_counts["cnt_data_rows"], 7);
        assert_eq!(dict_counts["cnt_tables_failed"], 0);

        let txt = report.format("[REPORT]");
        assert_eq!(
            txt,
            "[REPORT] tables=3 generated=2 skipped=1 failed=0 rows=7 artifacts=3 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
    }
}
