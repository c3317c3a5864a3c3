//! Turning free-form provider answers into [`CitationResult`] records.
//!
//! The prompt asks the model to finish its answer with one JSON object per
//! cited website. Models do not always comply, so when no JSON lines are
//! found the whole answer is scanned for domain mentions instead.

use crate::models::{CitationResult, CompetitorCitation};
use crate::provider::domain::{find_domains, is_same_site, normalize_domain};
use serde_json::Value;
use tracing::debug;

/// Longest context snippet kept per mention, in characters.
const MAX_CONTEXT_CHARS: usize = 240;

/// System prompt for citation queries.
pub const CITATION_SYSTEM_PROMPT: &str = r#"You are a helpful assistant answering a user's question.
Answer naturally and recommend specific websites, products or services where relevant.
After your answer, list every website you mentioned or relied on, one JSON object per line:
{"domain": "example.com", "context": "one sentence on why it is cited"}"#;

/// Build the user prompt for a single keyword/query.
pub fn build_prompt(query: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(query.trim());
    prompt.push_str("\n\nEnd your answer with the JSON lines listing the cited websites.");
    prompt
}

/// A domain mention pulled out of an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Mention {
    domain: String,
    context: Option<String>,
}

/// Parse a provider answer for `query` into a citation result for `target`.
///
/// Competitors are listed once per answer (first context wins) and never
/// include the target site.
pub fn parse_citation_response(query: &str, target: &str, response: &str) -> CitationResult {
    let mut mentions = parse_json_mentions(response);
    if mentions.is_empty() {
        debug!("No JSON citation lines for '{}', scanning prose", query);
        mentions = scan_prose_mentions(response);
    }

    let is_cited = mentions.iter().any(|m| is_same_site(&m.domain, target))
        || find_domains(response)
            .iter()
            .any(|d| is_same_site(d, target));

    let mut result = CitationResult::new(query, is_cited);
    for mention in mentions {
        if result.competitors.iter().any(|c| c.domain == mention.domain) {
            continue;
        }
        result
            .competitors
            .push(CompetitorCitation::new(mention.domain, mention.context));
    }
    result.exclude_target(target);

    debug!(
        "Parsed '{}': cited={}, competitors={}",
        query,
        result.is_cited,
        result.competitors.len()
    );
    result
}

/// Parse JSON lines of the form `{"domain": ..., "context": ...}`.
fn parse_json_mentions(response: &str) -> Vec<Mention> {
    let mut mentions = Vec::new();

    for line in response.lines() {
        let line = line.trim().trim_start_matches(['-', '*']).trim();
        if line.is_empty() || !line.starts_with('{') {
            continue;
        }

        if let Ok(json) = serde_json::from_str::<Value>(line) {
            if let Some(mention) = json_to_mention(&json) {
                mentions.push(mention);
            }
        }
    }

    mentions
}

fn json_to_mention(json: &Value) -> Option<Mention> {
    let raw = json["domain"].as_str().or_else(|| json["url"].as_str())?;
    let domain = normalize_domain(raw);
    if domain.is_empty() {
        return None;
    }

    let context = json["context"]
        .as_str()
        .or_else(|| json["reason"].as_str())
        .map(clean_context)
        .filter(|c| !c.is_empty());

    Some(Mention { domain, context })
}

/// Scan prose sentence by sentence; each mention carries its sentence.
fn scan_prose_mentions(response: &str) -> Vec<Mention> {
    let mut mentions = Vec::new();

    for sentence in split_sentences(response) {
        let context = clean_context(sentence);
        for domain in find_domains(sentence) {
            mentions.push(Mention {
                domain,
                context: if context.is_empty() {
                    None
                } else {
                    Some(context.clone())
                },
            });
        }
    }

    mentions
}

/// Split text into sentences at line breaks and at `.`/`!`/`?` followed by
/// whitespace. Dots inside domains never end a sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();

    for line in text.lines() {
        let mut start = 0;
        for (idx, ch) in line.char_indices() {
            if !matches!(ch, '.' | '!' | '?') {
                continue;
            }
            let end = idx + ch.len_utf8();
            let next = line[end..].chars().next();
            if next.map_or(true, char::is_whitespace) {
                let sentence = line[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
        }

        let tail = line[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail);
        }
    }

    sentences
}

/// Strip list markers and emphasis, collapse whitespace, cap the length.
fn clean_context(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_start_matches(|c: char| c == '-' || c == '*' || c == '•' || c.is_whitespace());
    let collapsed = trimmed
        .replace("**", "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.chars().count() > MAX_CONTEXT_CHARS {
        let mut cut: String = collapsed.chars().take(MAX_CONTEXT_CHARS).collect();
        cut.push('…');
        cut
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_lines() {
        let response = r#"For a small team, HubSpot and Pipedrive are solid picks.

{"domain": "https://www.hubspot.com", "context": "Free CRM tier"}
{"domain": "pipedrive.com", "context": "Sales pipeline focus"}
{"domain": "example.com", "context": "Target site"}
"#;
        let result = parse_citation_response("best crm", "example.com", response);

        assert!(result.is_cited);
        assert_eq!(result.competitors.len(), 2);
        assert_eq!(result.competitors[0].domain, "hubspot.com");
        assert_eq!(
            result.competitors[0].context.as_deref(),
            Some("Free CRM tier")
        );
        assert_eq!(result.competitors[1].domain, "pipedrive.com");
    }

    #[test]
    fn test_parse_prose_fallback() {
        let response = "You could try acme.com for pricing. \
                        Many teams also like beta.io! Neither mentions the target.";
        let result = parse_citation_response("cheap crm", "example.com", response);

        assert!(!result.is_cited);
        assert_eq!(result.competitors.len(), 2);
        assert_eq!(result.competitors[0].domain, "acme.com");
        assert_eq!(
            result.competitors[0].context.as_deref(),
            Some("You could try acme.com for pricing.")
        );
        assert_eq!(
            result.competitors[1].context.as_deref(),
            Some("Many teams also like beta.io!")
        );
    }

    #[test]
    fn test_target_mentioned_only_in_prose_counts_as_cited() {
        let response = "See docs.example.com for a guide.\n{\"domain\": \"acme.com\"}";
        let result = parse_citation_response("guide", "example.com", response);

        assert!(result.is_cited);
        assert_eq!(result.competitors.len(), 1);
        assert_eq!(result.competitors[0].domain, "acme.com");
        assert!(result.competitors[0].context.is_none());
    }

    #[test]
    fn test_duplicate_mentions_listed_once() {
        let response = "acme.com is great. I repeat, acme.com is great.";
        let result = parse_citation_response("q", "example.com", response);

        assert_eq!(result.competitors.len(), 1);
        assert_eq!(
            result.competitors[0].context.as_deref(),
            Some("acme.com is great.")
        );
    }

    #[test]
    fn test_empty_response() {
        let result = parse_citation_response("q", "example.com", "");
        assert!(!result.is_cited);
        assert!(result.competitors.is_empty());
    }

    #[test]
    fn test_json_line_without_domain_is_ignored() {
        let response = "{\"context\": \"no domain here\"}\n{\"url\": \"beta.io\"}";
        let result = parse_citation_response("q", "example.com", response);

        assert_eq!(result.competitors.len(), 1);
        assert_eq!(result.competitors[0].domain, "beta.io");
    }

    #[test]
    fn test_split_sentences_keeps_domains_intact() {
        let sentences = split_sentences("Try acme.com today. Or beta.io?\n- gamma.dev");
        assert_eq!(sentences, vec!["Try acme.com today.", "Or beta.io?", "- gamma.dev"]);
    }

    #[test]
    fn test_clean_context() {
        assert_eq!(clean_context("  - **Acme**   is  cheap "), "Acme is cheap");
        let long = "x".repeat(300);
        assert_eq!(clean_context(&long).chars().count(), MAX_CONTEXT_CHARS + 1);
    }

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt("  best crm for startups ");
        assert!(prompt.starts_with("best crm for startups\n"));
        assert!(prompt.contains("JSON lines"));
    }
}
