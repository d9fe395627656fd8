//! Corpus Quality Reports
//!
//! Aggregates pass/fail outcomes globally and per category, maps pass rates
//! to letter grades, and renders the result as JSON, text or markdown.
//!
//! ## Grade Bands
//!
//! - **A**: ≥95%
//! - **B**: 85-94%
//! - **C**: 70-84%
//! - **D**: 50-69%
//! - **F**: <50%
//! - **N/A**: nothing to grade

mod format;
mod report;
mod types;

#[cfg(test)]
mod tests;

pub use format::{format_report_json, format_report_markdown, format_report_text};
pub use report::{QualityReport, QualityReportAggregator, SCHEMA_VERSION};
pub use types::{pass_rate, CategoryStats, Grade, Priority, Recommendation};
