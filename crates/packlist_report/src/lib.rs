//! `packlist_report`:
//! Packing-list to shipment-report pipeline.
//!
//! Modules:
//! - `matcher`   : fuzzy header signature matching
//! - `segment`   : table segmentation of the source sheet
//! - `normalize` : forward-fill and carton grouping
//! - `aggregate` : shipment totals and color breakdown
//! - `template`  : built-in and user templates
//! - `layout`    : report sheet filling
//! - `validate`  : strict cell comparison
//! - `assemble`  : sheet naming and workbook artifacts
//! - `pipeline`  : end-to-end orchestration
//! - `report`    : run-time report model
//! - `remote`    : remote endpoint client (feature `remote`)
//! - `conf`/`spec`/`util` : constants, models and helpers

pub mod aggregate;
pub mod assemble;
pub mod conf;
pub mod layout;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
#[cfg(feature = "remote")]
pub mod remote;
pub mod report;
pub mod segment;
pub mod spec;
pub mod template;
mod util;
pub mod validate;

pub use aggregate::{SpecAggregateOptions, aggregate_table};
pub use assemble::{apply_combined_borders, assemble_artifacts, derive_sheet_names};
pub use conf::{TUP_HEADER_SIGNATURE, derive_template_layout};
pub use layout::{SpecLayoutContext, write_report_sheet};
pub use matcher::{is_header_match, is_header_match_with};
pub use normalize::{SpecNormalizeOptions, normalize_table};
pub use pipeline::{
    SpecGenerateOutput, SpecSheetTotals, SpecTableOverview, SpecWorkbookInspection,
    generate_reports, generate_reports_from_source, inspect_workbook,
};
#[cfg(feature = "remote")]
pub use remote::{RemoteError, post_generate_reports};
pub use report::{ReportRun, ReportRunBuilder, SpecTableFailure};
pub use segment::{SpecSegmentOptions, segment_sheet};
pub use spec::{
    EnumOutputMode, EnumTemplateVersion, EnumWeightPolicy, ReportError, SpecArtifact,
    SpecColorBreakdownEntry, SpecGeneratedSheet, SpecReportOptions, SpecReportSummary,
    SpecStrictMismatch, SpecSoftIssue, SpecValidationReport,
};
pub use template::{build_default_template, load_template};
pub use util::derive_base_name;
