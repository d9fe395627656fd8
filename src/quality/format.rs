//! Quality Report Formatting
//!
//! Text, markdown and JSON rendering for quality reports.

use super::report::QualityReport;
use crate::error::{CribaError, Result};
use crate::labeling::RiskTier;

fn percent(rate: Option<f64>) -> String {
    rate.map(|r| format!("{:.1}%", r * 100.0))
        .unwrap_or_else(|| "-".to_string())
}

/// Format quality report as text
pub fn format_report_text(report: &QualityReport) -> String {
    let mut output = String::new();

    output.push_str("Corpus Quality Report\n");
    output.push_str(&"═".repeat(64));
    output.push_str("\n\n");

    output.push_str(&format!(
        "  {:20} {:8} {:8} {:8} {:6}\n",
        "Category", "Passed", "Failed", "Rate", "Grade"
    ));
    output.push_str(&format!(
        "  {:20} {:8} {:8} {:8} {:6}\n",
        "─".repeat(20),
        "─".repeat(8),
        "─".repeat(8),
        "─".repeat(8),
        "─".repeat(6)
    ));
    for (category, stats) in &report.by_category {
        output.push_str(&format!(
            "  {:20} {:>8} {:>8} {:>8} {} {}\n",
            category,
            stats.passed,
            stats.failed,
            percent(stats.pass_rate),
            stats.grade.symbol(),
            stats.grade.icon(),
        ));
    }

    output.push('\n');
    output.push_str(&"─".repeat(64));
    output.push('\n');
    output.push_str(&format!(
        "Total: {}  Passed: {}  Failed: {} ({} undetermined)\n",
        report.total, report.passed, report.failed, report.undetermined
    ));
    output.push_str(&format!(
        "Pass rate: {}  Grade: {} {}\n",
        percent(report.pass_rate),
        report.grade.symbol(),
        report.grade.icon()
    ));

    if !report.top_suspicious.is_empty() {
        output.push_str("\nMost suspicious features:\n");
        for score in &report.top_suspicious {
            output.push_str(&format!(
                "  {:20} {:.3}  ({} failing, {} passing)\n",
                score.feature.name(),
                score.score,
                score.failed_with,
                score.passed_with
            ));
        }
    }

    if !report.recommendations.is_empty() {
        output.push_str("\nRecommendations:\n");
        for rec in &report.recommendations {
            output.push_str(&format!("  • [{}] {}\n", rec.priority, rec.action));
        }
    }

    output
}

/// Format quality report as markdown
pub fn format_report_markdown(report: &QualityReport) -> String {
    let mut lines = vec![
        "# Corpus Quality Report".to_string(),
        String::new(),
        format!("Generated: {}", report.generated_at.to_rfc3339()),
        String::new(),
        "## Key Metrics".to_string(),
        String::new(),
        "| Metric | Value |".to_string(),
        "|--------|-------|".to_string(),
        format!("| total | {} |", report.total),
        format!("| passed | {} |", report.passed),
        format!("| failed | {} |", report.failed),
        format!("| undetermined | {} |", report.undetermined),
        format!("| pass_rate | {} |", percent(report.pass_rate)),
        format!("| success_rate | {:.1}% |", report.success_rate()),
        format!("| grade | {} |", report.grade),
        String::new(),
        "## Categories".to_string(),
        String::new(),
        "| Category | Passed | Failed | Rate | Grade |".to_string(),
        "|----------|--------|--------|------|-------|".to_string(),
    ];
    for (category, stats) in &report.by_category {
        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            category,
            stats.passed,
            stats.failed,
            percent(stats.pass_rate),
            stats.grade
        ));
    }

    lines.push(String::new());
    lines.push("## Risk Distribution".to_string());
    lines.push(String::new());
    for tier in RiskTier::ALL {
        lines.push(format!("- **{}**: {}", tier, report.tier_count(tier)));
    }

    lines.push(String::new());
    lines.push("## Top Blocking Patterns".to_string());
    lines.push(String::new());
    for score in &report.top_suspicious {
        lines.push(format!(
            "- {}: {:.3} ({} affected)",
            score.feature, score.score, score.failed_with
        ));
    }

    lines.push(String::new());
    lines.push("## Recommendations".to_string());
    lines.push(String::new());
    for (i, rec) in report.recommendations.iter().take(5).enumerate() {
        lines.push(format!("{}. [{}] {}", i + 1, rec.priority, rec.action));
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

/// Format quality report as JSON
pub fn format_report_json(report: &QualityReport) -> Result<String> {
    serde_json::to_string_pretty(report)
        .map_err(|e| CribaError::computation(format!("JSON serialization failed: {}", e)))
}
