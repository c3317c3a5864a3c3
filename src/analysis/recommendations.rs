//! Rule-based insights and recommendations.

use crate::analysis::scorer::CitationScore;
use crate::models::{CitationResult, CompetitorAggregate, MetricScores, Priority, Recommendation};

/// How many uncited queries are named in a recommendation.
const MAX_NAMED_QUERIES: usize = 3;

fn recommendation(priority: Priority, category: &str, title: &str, description: String) -> Recommendation {
    Recommendation {
        title: title.to_string(),
        description,
        priority,
        category: category.to_string(),
    }
}

fn metric_advice(metric: &str) -> &'static str {
    match metric {
        "Content Clarity" => "Lead pages with a direct, one-paragraph answer before the details.",
        "Semantic Richness" => "Cover related entities and sub-topics so answers can quote you in context.",
        "Structured Data" => "Add schema.org markup (FAQPage, Product, Organization) to key pages.",
        "Natural Language" => "Phrase headings as the questions users actually ask assistants.",
        _ => "Align page titles and headings with the queries you want to be cited for.",
    }
}

/// Build recommendations, highest priority first.
pub fn build_recommendations(
    score: &CitationScore,
    results: &[CitationResult],
    competitors: &[CompetitorAggregate],
    metrics: &MetricScores,
) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if score.insufficient_data {
        recs.push(recommendation(
            Priority::High,
            "Coverage",
            "Add test queries",
            "No query results were available. Add the questions your customers ask AI \
             assistants and run the analysis again."
                .to_string(),
        ));
        return recs;
    }

    let (priority, title, description) = match score.rate {
        0..=29 => (
            Priority::High,
            "Publish answer-ready content",
            format!(
                "Your site was cited in only {}% of queries. Create pages that answer these \
                 questions directly and link them from your main navigation.",
                score.rate
            ),
        ),
        30..=59 => (
            Priority::Medium,
            "Strengthen topical authority",
            format!(
                "Your site was cited in {}% of queries. Deepen coverage of the topics where \
                 competitors are cited instead.",
                score.rate
            ),
        ),
        _ => (
            Priority::Low,
            "Keep coverage fresh",
            format!(
                "Your site was cited in {}% of queries. Keep cited pages up to date and extend \
                 them to neighbouring questions.",
                score.rate
            ),
        ),
    };
    recs.push(recommendation(priority, "Visibility", title, description));

    if let Some(top) = competitors.first() {
        let priority = if top.count >= score.cited {
            Priority::High
        } else {
            Priority::Medium
        };
        let mut description = format!(
            "{} was cited {} time(s) where your site was not the only answer.",
            top.domain, top.count
        );
        if let Some(context) = top.contexts.first() {
            description.push_str(&format!(" Example: \"{}\"", context));
        }
        recs.push(recommendation(
            priority,
            "Competitors",
            &format!("Study why {} is cited", top.domain),
            description,
        ));
    }

    let uncited: Vec<&str> = results
        .iter()
        .filter(|r| !r.is_cited)
        .map(|r| r.query.as_str())
        .collect();
    if !uncited.is_empty() {
        let mut named = uncited
            .iter()
            .take(MAX_NAMED_QUERIES)
            .map(|q| format!("\"{}\"", q))
            .collect::<Vec<_>>()
            .join(", ");
        if uncited.len() > MAX_NAMED_QUERIES {
            named.push_str(&format!(" and {} more", uncited.len() - MAX_NAMED_QUERIES));
        }
        recs.push(recommendation(
            Priority::Medium,
            "Coverage",
            "Target uncited queries",
            format!("You were not cited for {}.", named),
        ));
    }

    let (metric, value) = metrics.weakest();
    if value < 60 {
        recs.push(recommendation(
            if value < 40 { Priority::Medium } else { Priority::Low },
            "Content",
            &format!("Improve {}", metric.to_lowercase()),
            format!("{} scored {}. {}", metric, value, metric_advice(metric)),
        ));
    }

    // Stable: equal priorities keep rule order.
    recs.sort_by(|a, b| b.priority.cmp(&a.priority));
    recs
}

/// One-paragraph summary of an analysis.
pub fn build_insights(
    website: &str,
    score: &CitationScore,
    competitors: &[CompetitorAggregate],
) -> String {
    if score.insufficient_data {
        return format!(
            "No query results were available for {}, so no citation rate could be computed.",
            website
        );
    }

    let mut insights = format!(
        "{} was {} ({}%).",
        website,
        score.summary(),
        score.rate
    );

    match competitors.first() {
        Some(top) => insights.push_str(&format!(
            " The most cited competitor is {} with {} citation(s) across {} competing domain(s).",
            top.domain,
            top.count,
            competitors.len()
        )),
        None => insights.push_str(" No competing domains were cited."),
    }

    insights
}
