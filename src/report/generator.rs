//! Markdown and JSON report generation.
//!
//! This module renders an analysis, its derived citation figures and its
//! trend into a Markdown document or pretty-printed JSON.

use crate::analysis::{CitationScore, Trend};
use crate::models::{Analysis, CitationResult, CompetitorAggregate, Recommendation};
use crate::report::{Report, ReportMetadata, ReportOptions};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportOptions) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# LLM Navigator Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report, options));
    output.push_str(&generate_score_section(
        &report.analysis,
        &report.citation,
        &report.trend,
        report.previous_score,
    ));
    output.push_str(&generate_insights_section(&report.analysis.insights));
    output.push_str(&generate_metrics_section(&report.analysis));

    if options.include_queries {
        if let Some(ref results) = report.analysis.citation_results {
            output.push_str(&generate_queries_section(results));
        }
    }

    output.push_str(&generate_competitors_section(
        &report.competitors,
        options.include_contexts,
    ));
    output.push_str(&generate_recommendations_section(
        &report.analysis.recommendations,
    ));
    output.push_str(&generate_failed_queries_section(&report.failed_queries));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Website:** {}\n", metadata.website));
    section.push_str(&format!("- **Analysis ID:** `{}`\n", metadata.analysis_id));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **User:** {}\n", metadata.user));
    section.push_str(&format!("- **Provider:** `{}`\n", metadata.provider));
    section.push_str(&format!("- **Mode:** {}\n", metadata.mode));
    section.push_str(&format!("- **Queries:** {}\n", metadata.queries_total));
    if metadata.queries_failed > 0 {
        section.push_str(&format!(
            "- **Queries Failed:** {}\n",
            metadata.queries_failed
        ));
    }
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report, options: &ReportOptions) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Score](#score)\n");

    if !report.analysis.insights.is_empty() {
        toc.push_str("- [Insights](#insights)\n");
    }

    toc.push_str("- [Sub-metrics](#sub-metrics)\n");

    if options.include_queries && report.analysis.citation_results.is_some() {
        toc.push_str("- [Queries](#queries)\n");
    }

    toc.push_str("- [Competitors](#competitors)\n");

    if !report.analysis.recommendations.is_empty() {
        toc.push_str("- [Recommendations](#recommendations)\n");
    }
    if !report.failed_queries.is_empty() {
        toc.push_str("- [Failed Queries](#failed-queries)\n");
    }

    toc.push('\n');

    toc
}

/// Generate the score section with trend.
fn generate_score_section(
    analysis: &Analysis,
    citation: &CitationScore,
    trend: &Trend,
    previous_score: Option<u8>,
) -> String {
    let mut section = String::new();

    section.push_str("## Score\n\n");

    if analysis.simulated {
        section.push_str("> ⚠️ **Simulated data.** These figures were generated, not measured.\n\n");
    }

    section.push_str("| Score | Citation Rate | Cited | Trend |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");

    let cited = if citation.insufficient_data {
        "no data".to_string()
    } else {
        format!("{} / {}", citation.cited, citation.total)
    };
    let trend_cell = match previous_score {
        Some(previous) => format!(
            "{} {} ({} vs {})",
            trend.direction.emoji(),
            trend.direction,
            trend.signed_delta(),
            previous
        ),
        None => format!("{} first analysis", trend.direction.emoji()),
    };

    section.push_str(&format!(
        "| **{}** | {}% | {} | {} |\n\n",
        analysis.score, citation.rate, cited, trend_cell
    ));

    section
}

/// Generate the insights section.
fn generate_insights_section(insights: &str) -> String {
    if insights.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Insights\n\n");
    section.push_str(insights);
    section.push_str("\n\n");

    section
}

/// Generate the sub-metrics table.
fn generate_metrics_section(analysis: &Analysis) -> String {
    let mut section = String::new();

    section.push_str("## Sub-metrics\n\n");
    section.push_str("| Metric | Score |\n");
    section.push_str("|:---|:---:|\n");

    for (name, value) in analysis.metrics.entries() {
        section.push_str(&format!("| {} | {} |\n", name, value));
    }
    section.push('\n');

    section
}

/// Generate the per-query table.
fn generate_queries_section(results: &[CitationResult]) -> String {
    let mut section = String::new();

    section.push_str("## Queries\n\n");

    if results.is_empty() {
        section.push_str("No query results.\n\n");
        return section;
    }

    section.push_str("| # | Query | Cited | Competitors Cited |\n");
    section.push_str("|:---:|:---|:---:|:---|\n");

    for (i, result) in results.iter().enumerate() {
        let competitors = if result.competitors.is_empty() {
            "-".to_string()
        } else {
            result
                .competitors
                .iter()
                .map(|c| c.domain.as_str())
                .filter(|d| !d.trim().is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        };
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            i + 1,
            escape_cell(&result.query),
            if result.is_cited { "✅" } else { "❌" },
            competitors
        ));
    }
    section.push('\n');

    section
}

/// Generate the competitor ranking.
fn generate_competitors_section(competitors: &[CompetitorAggregate], with_contexts: bool) -> String {
    let mut section = String::new();

    section.push_str("## Competitors\n\n");

    if competitors.is_empty() {
        section.push_str("No competitor data: no other domains were cited.\n\n");
        return section;
    }

    section.push_str("| Rank | Domain | Citations |\n");
    section.push_str("|:---:|:---|:---:|\n");

    for (i, competitor) in competitors.iter().enumerate() {
        section.push_str(&format!(
            "| {} | `{}` | {} |\n",
            i + 1,
            competitor.domain,
            competitor.count
        ));
    }
    section.push('\n');

    if with_contexts {
        for competitor in competitors.iter().filter(|c| !c.contexts.is_empty()) {
            section.push_str(&format!("### {}\n\n", competitor.domain));
            for context in &competitor.contexts {
                section.push_str(&format!("- {}\n", context));
            }
            section.push('\n');
        }
    }

    section
}

/// Generate the recommendations section.
fn generate_recommendations_section(recommendations: &[Recommendation]) -> String {
    if recommendations.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Recommendations\n\n");

    for (i, rec) in recommendations.iter().enumerate() {
        section.push_str(&format!(
            "{}. {} **{}** ({}, {} priority): {}\n",
            i + 1,
            rec.priority.emoji(),
            rec.title,
            rec.category,
            rec.priority,
            rec.description
        ));
    }
    section.push('\n');

    section
}

/// Generate the failed-queries section.
fn generate_failed_queries_section(failed: &[(String, String)]) -> String {
    if failed.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Failed Queries\n\n");
    section.push_str("These queries got no answer and are not part of the score:\n\n");
    for (query, error) in failed {
        section.push_str(&format!("- \"{}\": {}\n", query, error));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by LLM Navigator*\n");

    footer
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{build_analysis, compare_scores, AnalysisRequest};
    use crate::models::{AnalysisMode, AnalysisResult};

    fn create_test_report(previous: Option<u8>) -> Report {
        let request = AnalysisRequest {
            user_id: "me@example.com".to_string(),
            website: "example.com".to_string(),
            keywords: vec!["best crm".to_string(), "crm | pricing".to_string()],
            mode: AnalysisMode::Aeo,
            top_competitors: 10,
            context_cap: 5,
        };
        let results = vec![
            CitationResult::new("best crm", true).with_competitor("acme.com", Some("Free tier")),
            CitationResult::new("crm | pricing", false).with_competitor("beta.io", None),
        ];
        let eval = build_analysis(&request, AnalysisResult::Real { results });
        let trend = compare_scores(eval.analysis.score, previous);

        Report::new(
            eval,
            trend,
            previous,
            "test-model".to_string(),
            vec![("crm migration".to_string(), "timed out".to_string())],
            12.5,
        )
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report(Some(30));
        let markdown = generate_markdown_report(&report, &ReportOptions::default());

        assert!(markdown.contains("# LLM Navigator Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Score"));
        assert!(markdown.contains("## Competitors"));
        assert!(markdown.contains("`acme.com`"));
        assert!(markdown.contains("- Free tier"));
        assert!(markdown.contains("crm \\| pricing"));
        assert!(markdown.contains("📈 Up (+20 vs 30)"));
        assert!(markdown.contains("## Failed Queries"));
        assert!(markdown.contains("**Queries Failed:** 1"));
    }

    #[test]
    fn test_first_analysis_and_options() {
        let report = create_test_report(None);
        let options = ReportOptions {
            include_contexts: false,
            include_queries: false,
        };
        let markdown = generate_markdown_report(&report, &options);

        assert!(markdown.contains("first analysis"));
        assert!(!markdown.contains("## Queries"));
        assert!(!markdown.contains("- Free tier"));
    }

    #[test]
    fn test_empty_competitors_section() {
        let section = generate_competitors_section(&[], true);
        assert!(section.contains("No competitor data"));
    }

    #[test]
    fn test_simulated_banner() {
        let mut report = create_test_report(None);
        report.analysis.simulated = true;
        let markdown = generate_markdown_report(&report, &ReportOptions::default());
        assert!(markdown.contains("Simulated data"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report(Some(50));
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"website\""));
        assert!(json.contains("\"competitors\""));
        assert!(json.contains("\"direction\": \"stable\""));
    }
}
