//! Concurrent query execution with per-query failure isolation.
//!
//! Queries fan out to spawned tasks gated by a semaphore and fan back in
//! as they complete. Results are keyed by query text; the submission order
//! is kept alongside so consumers can iterate deterministically.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::client::SearchClient;
use super::result::SearchResult;
use crate::error::SearchError;

/// Results of one batch, keyed by query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResults {
    order: Vec<String>,
    results: HashMap<String, SearchResult>,
}

impl QueryResults {
    /// Builds a result set with a single entry.
    #[must_use]
    pub fn single(query: impl Into<String>, result: SearchResult) -> Self {
        let query = query.into();
        let mut results = HashMap::with_capacity(1);
        results.insert(query.clone(), result);
        Self {
            order: vec![query],
            results,
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` when no query was submitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Result for `query`.
    #[must_use]
    pub fn get(&self, query: &str) -> Option<&SearchResult> {
        self.results.get(query)
    }

    /// Queries in submission order.
    #[must_use]
    pub fn queries(&self) -> &[String] {
        &self.order
    }

    /// `(query, result)` pairs in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SearchResult)> {
        self.order
            .iter()
            .filter_map(|q| self.results.get(q).map(|r| (q.as_str(), r)))
    }

    /// Number of error-shaped entries.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.results.values().filter(|r| r.is_error()).count()
    }
}

/// Runs batches of queries against a [`SearchClient`] with bounded
/// concurrency.
pub struct QueryExecutor {
    client: Arc<dyn SearchClient>,
    max_concurrency: usize,
    top_citations: usize,
}

impl QueryExecutor {
    /// Creates an executor.
    ///
    /// `max_concurrency` is clamped to at least 1. Each answer keeps its
    /// first `top_citations` citations.
    #[must_use]
    pub fn new(client: Arc<dyn SearchClient>, max_concurrency: usize, top_citations: usize) -> Self {
        Self {
            client,
            max_concurrency: max_concurrency.max(1),
            top_citations,
        }
    }

    /// Executes `queries` concurrently, keeping the first `top_citations`
    /// citations of each answer.
    ///
    /// Every distinct query yields exactly one entry. Repeated query strings
    /// are collapsed to their first occurrence. A failed or panicked search
    /// becomes an error entry without affecting its siblings.
    pub async fn execute(&self, queries: &[String]) -> QueryResults {
        self.run(queries, Some(self.top_citations)).await
    }

    /// Like [`Self::execute`], but keeps every citation.
    pub async fn execute_all_citations(&self, queries: &[String]) -> QueryResults {
        self.run(queries, None).await
    }

    async fn run(&self, queries: &[String], citation_limit: Option<usize>) -> QueryResults {
        let mut seen = HashSet::with_capacity(queries.len());
        let order: Vec<String> = queries
            .iter()
            .filter(|q| seen.insert(q.as_str()))
            .cloned()
            .collect();
        if order.len() < queries.len() {
            debug!(
                submitted = queries.len(),
                distinct = order.len(),
                "collapsed duplicate queries"
            );
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut in_flight = FuturesUnordered::new();

        for query in &order {
            let sem = Arc::clone(&semaphore);
            let client = Arc::clone(&self.client);
            let q = query.clone();
            let handle = tokio::spawn(async move {
                let Ok(_permit) = sem.acquire_owned().await else {
                    return SearchResult::error("search pool closed");
                };
                client.search(&q).await
            });
            let q = query.clone();
            in_flight.push(async move { (q, handle.await) });
        }

        let mut results = HashMap::with_capacity(order.len());
        while let Some((query, joined)) = in_flight.next().await {
            let result = match joined {
                Ok(result) => match citation_limit {
                    Some(n) => result.truncate_citations(n),
                    None => result,
                },
                Err(e) => {
                    let err = SearchError::Task(e.to_string());
                    warn!(query = %query, error = %err, "search task failed");
                    SearchResult::error(err.to_string())
                }
            };
            debug!(query = %query, failed = result.is_error(), "search completed");
            results.insert(query, result);
        }

        debug_assert_eq!(results.len(), order.len());
        QueryResults { order, results }
    }
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("max_concurrency", &self.max_concurrency)
            .field("top_citations", &self.top_citations)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::search::result::Citation;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers every query; fails the ones containing "fail", panics on
    /// "panic". Tracks peak concurrency.
    #[derive(Default)]
    struct FakeSearch {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SearchClient for FakeSearch {
        async fn search(&self, query: &str) -> SearchResult {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            // Later queries finish first.
            let delay = 40_u64.saturating_sub(query.len() as u64);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            assert!(!query.contains("panic"), "search exploded");
            if query.contains("fail") {
                return SearchResult::error("HTTP 500: upstream");
            }
            SearchResult::Answer {
                answer: format!("answer to {query}"),
                citations: vec![
                    Citation {
                        url: format!("https://{}.one", query.len()),
                        title: None,
                        snippet: None,
                    },
                    Citation {
                        url: format!("https://{}.two", query.len()),
                        title: None,
                        snippet: None,
                    },
                ],
            }
        }
    }

    fn queries(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_every_query_has_one_entry() {
        let executor = QueryExecutor::new(Arc::new(FakeSearch::default()), 3, 1);
        let batch = queries(&["a", "bb fail", "ccc", "dddd"]);
        let results = executor.execute(&batch).await;
        assert_eq!(results.len(), 4);
        assert_eq!(results.failures(), 1);
        assert_eq!(results.queries(), batch.as_slice());
        match results.get("bb fail") {
            Some(SearchResult::Error { message }) => assert!(!message.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let executor = QueryExecutor::new(Arc::new(FakeSearch::default()), 3, 1);
        let results = executor.execute(&[]).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let search = Arc::new(FakeSearch::default());
        let executor = QueryExecutor::new(Arc::clone(&search) as Arc<dyn SearchClient>, 2, 1);
        let batch = queries(&["q1", "q22", "q333", "q4444", "q55555", "q666666"]);
        let results = executor.execute(&batch).await;
        assert_eq!(results.len(), 6);
        assert!(search.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_citations_truncated_to_top_n() {
        let executor = QueryExecutor::new(Arc::new(FakeSearch::default()), 3, 1);
        let results = executor.execute(&queries(&["x"])).await;
        match results.get("x") {
            Some(SearchResult::Answer { citations, .. }) => assert_eq!(citations.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_all_citations_skips_truncation() {
        let executor = QueryExecutor::new(Arc::new(FakeSearch::default()), 3, 1);
        let results = executor.execute_all_citations(&queries(&["x"])).await;
        match results.get("x") {
            Some(SearchResult::Answer { citations, .. }) => assert_eq!(citations.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_search_is_isolated() {
        let executor = QueryExecutor::new(Arc::new(FakeSearch::default()), 3, 1);
        let results = executor.execute(&queries(&["ok one", "panic now", "ok two"])).await;
        assert_eq!(results.len(), 3);
        assert!(results.get("panic now").is_some_and(SearchResult::is_error));
        assert!(results.get("ok two").is_some_and(|r| !r.is_error()));
    }

    #[tokio::test]
    async fn test_duplicates_collapse_to_first_occurrence() {
        let executor = QueryExecutor::new(Arc::new(FakeSearch::default()), 3, 1);
        let results = executor.execute(&queries(&["same", "other", "same"])).await;
        assert_eq!(results.len(), 2);
        let order: Vec<&str> = results.iter().map(|(q, _)| q).collect();
        assert_eq!(order, vec!["same", "other"]);
    }
}
