//! Competitor extraction.
//!
//! Merges the per-query competitor mentions of an analysis into one ranking
//! of domains by how often they were cited.

use crate::models::{CitationResult, CompetitorAggregate};
use crate::provider::domain::normalize_domain;
use std::collections::HashMap;
use tracing::debug;

/// Default number of distinct context snippets kept per domain.
pub const DEFAULT_CONTEXT_CAP: usize = 5;

/// Rank competitor domains by citation count.
///
/// Domains are merged after normalization. Contexts are deduplicated by exact
/// (case-sensitive) match and kept in first-seen order, at most `context_cap`
/// per domain (a cap below 1 is treated as 1). Ties in count keep the order
/// in which domains first appeared. Mentions without a domain are skipped.
pub fn extract_competitors(
    results: &[CitationResult],
    context_cap: usize,
) -> Vec<CompetitorAggregate> {
    let context_cap = context_cap.max(1);
    let mut ranked: Vec<CompetitorAggregate> = Vec::new();
    // domain -> index into `ranked`, which is in first-seen order
    let mut index: HashMap<String, usize> = HashMap::new();

    for result in results {
        for citation in &result.competitors {
            let domain = normalize_domain(&citation.domain);
            if domain.is_empty() {
                debug!("Skipping competitor without domain in '{}'", result.query);
                continue;
            }

            let existing = index.get(&domain).copied();
            let entry = match existing {
                Some(i) => {
                    ranked[i].count += 1;
                    &mut ranked[i]
                }
                None => {
                    index.insert(domain.clone(), ranked.len());
                    ranked.push(CompetitorAggregate {
                        domain,
                        count: 1,
                        contexts: Vec::new(),
                    });
                    let last = ranked.len() - 1;
                    &mut ranked[last]
                }
            };

            if let Some(context) = citation.context.as_deref() {
                if entry.contexts.len() < context_cap
                    && !entry.contexts.iter().any(|c| c == context)
                {
                    entry.contexts.push(context.to_string());
                }
            }
        }
    }

    // Stable: equal counts stay in first-seen order.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// The `k` most cited competitors.
pub fn top_competitors(
    results: &[CitationResult],
    k: usize,
    context_cap: usize,
) -> Vec<CompetitorAggregate> {
    let mut ranked = extract_competitors(results, context_cap);
    ranked.truncate(k);
    ranked
}

/// Share of all competitor mentions taken by the top domain, 0-100.
pub fn top_competitor_share(ranked: &[CompetitorAggregate]) -> u8 {
    let total: usize = ranked.iter().map(|c| c.count).sum();
    match ranked.first() {
        Some(top) if total > 0 => ((200 * top.count + total) / (2 * total)) as u8,
        _ => 0,
    }
}
