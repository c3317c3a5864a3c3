//! AI provider access.
//!
//! Providers are text-generation endpoints. This module sends one prompt per
//! keyword, optionally caches the answers, and parses them into
//! [`CitationResult`] records for the scoring core.

pub mod client;
pub mod domain;
pub mod parser;

pub use client::{ClientConfig, OllamaClient};

use crate::models::CitationResult;
use crate::store::KeyValueStore;
use anyhow::Result;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Something that can answer a prompt with free-form text.
#[allow(async_fn_in_trait)]
pub trait CitationProvider {
    /// Name used in cache keys and reports (usually the model name).
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Caches provider answers in a [`KeyValueStore`].
///
/// Answers are keyed by provider name and prompt. Nothing is ever evicted
/// here; eviction is whatever the wrapped store does.
pub struct CachedProvider<P, S> {
    inner: P,
    store: Mutex<S>,
}

impl<P: CitationProvider, S: KeyValueStore> CachedProvider<P, S> {
    pub fn new(inner: P, store: S) -> Self {
        Self {
            inner,
            store: Mutex::new(store),
        }
    }

    fn cache_key(&self, prompt: &str) -> String {
        format!("response:{}:{}", self.inner.name(), prompt)
    }
}

impl<P: CitationProvider, S: KeyValueStore> CitationProvider for CachedProvider<P, S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let key = self.cache_key(prompt);

        {
            let store = self
                .store
                .lock()
                .map_err(|_| anyhow::anyhow!("response cache lock poisoned"))?;
            if let Some(cached) = store.get(&key)? {
                debug!("Cache hit for {}", key);
                return Ok(cached);
            }
        }

        let answer = self.inner.complete(prompt).await?;

        let mut store = self
            .store
            .lock()
            .map_err(|_| anyhow::anyhow!("response cache lock poisoned"))?;
        if let Err(e) = store.set(&key, answer.clone()) {
            warn!("Failed to cache provider answer: {}", e);
        }

        Ok(answer)
    }
}

/// Results of querying every keyword.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    /// Parsed results, in keyword order, for the queries that succeeded.
    pub results: Vec<CitationResult>,
    /// Keywords whose query failed, with the error message.
    pub failed: Vec<(String, String)>,
}

/// Ask the provider every keyword and parse the answers for `target`.
///
/// Up to `concurrency` requests run at once; results keep keyword order.
/// Individual failures are logged and reported in [`QueryOutcome::failed`];
/// the call only errors when every query failed.
pub async fn query_citations<P: CitationProvider>(
    provider: &P,
    target: &str,
    keywords: &[String],
    concurrency: usize,
    progress: Option<&ProgressBar>,
) -> Result<QueryOutcome> {
    info!(
        "Querying {} for {} keywords (concurrency {})",
        provider.name(),
        keywords.len(),
        concurrency
    );

    let answers: Vec<(&String, Result<String>)> = stream::iter(keywords)
        .map(|keyword| async move {
            let prompt = parser::build_prompt(keyword);
            let answer = provider.complete(&prompt).await;
            if let Some(pb) = progress {
                pb.inc(1);
            }
            (keyword, answer)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut outcome = QueryOutcome::default();
    for (keyword, answer) in answers {
        match answer {
            Ok(text) => outcome
                .results
                .push(parser::parse_citation_response(keyword, target, &text)),
            Err(e) => {
                warn!("Query '{}' failed: {}", keyword, e);
                outcome.failed.push((keyword.clone(), e.to_string()));
            }
        }
    }

    if outcome.results.is_empty() && !outcome.failed.is_empty() {
        let (keyword, error) = &outcome.failed[0];
        return Err(anyhow::anyhow!(
            "All {} queries failed (first: '{}': {})",
            outcome.failed.len(),
            keyword,
            error
        ));
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers from a fixed script; prompts containing "fail" error out.
    struct ScriptedProvider {
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl CitationProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if prompt.contains("fail") {
                anyhow::bail!("provider unavailable");
            }
            if prompt.contains("crm") {
                Ok("example.com and acme.com are both good.".to_string())
            } else {
                Ok("{\"domain\": \"beta.io\", \"context\": \"popular\"}".to_string())
            }
        }
    }

    fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_query_citations_keeps_order_and_parses() {
        let provider = ScriptedProvider::new();
        let kws = keywords(&["best crm", "invoicing tool", "crm for startups"]);

        let outcome = tokio_test::block_on(query_citations(&provider, "example.com", &kws, 2, None))
            .unwrap();

        assert!(outcome.failed.is_empty());
        let queries: Vec<&str> = outcome.results.iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queries, vec!["best crm", "invoicing tool", "crm for startups"]);
        assert!(outcome.results[0].is_cited);
        assert!(!outcome.results[1].is_cited);
        assert_eq!(outcome.results[1].competitors[0].domain, "beta.io");
    }

    #[test]
    fn test_partial_failures_are_reported() {
        let provider = ScriptedProvider::new();
        let kws = keywords(&["best crm", "please fail"]);

        let outcome = tokio_test::block_on(query_citations(&provider, "example.com", &kws, 1, None))
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "please fail");
    }

    #[test]
    fn test_all_failures_error() {
        let provider = ScriptedProvider::new();
        let kws = keywords(&["fail one", "fail two"]);

        let result = tokio_test::block_on(query_citations(&provider, "example.com", &kws, 4, None));
        assert!(result.is_err());
    }

    #[test]
    fn test_no_keywords_is_empty_outcome() {
        let provider = ScriptedProvider::new();
        let outcome =
            tokio_test::block_on(query_citations(&provider, "example.com", &[], 4, None)).unwrap();
        assert!(outcome.results.is_empty());
        assert!(outcome.failed.is_empty());
    }

    #[test]
    fn test_cached_provider_reuses_answers() {
        let cached = CachedProvider::new(ScriptedProvider::new(), MemoryStore::new());

        let first = tokio_test::block_on(cached.complete("best crm")).unwrap();
        let second = tokio_test::block_on(cached.complete("best crm")).unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);

        let store = cached.store.lock().unwrap();
        assert!(store
            .get("response:scripted:best crm")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_cached_provider_does_not_cache_errors() {
        let cached = CachedProvider::new(ScriptedProvider::new(), MemoryStore::new());

        assert!(tokio_test::block_on(cached.complete("fail")).is_err());
        assert!(tokio_test::block_on(cached.complete("fail")).is_err());
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }
}
