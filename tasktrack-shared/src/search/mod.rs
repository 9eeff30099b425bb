//! Search aggregator
//!
//! Runs one query against projects and tasks concurrently and merges the hits
//! into a flat list of [`SearchResult`]s: projects first, then tasks, each in
//! the index's own order. There is no ranking.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tasktrack_shared::search::{Aggregator, StoreIndex};
//! use tasktrack_shared::store::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let index = StoreIndex::new(Arc::new(MemoryStore::new()));
//! let aggregator = Aggregator::new(Arc::new(index));
//!
//! for hit in aggregator.search("login").await? {
//!     println!("{} {} {}", hit.kind, hit.id, hit.title);
//! }
//! # Ok(())
//! # }
//! ```

mod index;
mod normalize;

pub use index::{SearchIndex, StoreIndex};
pub use normalize::{normalize, NormalizeError};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::store::StoreError;

/// A raw hit as returned by a [`SearchIndex`]
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Default cap on results per query
pub const DEFAULT_MAX_RESULTS: usize = 50;

/// What a result points at
///
/// Serialized as a plain string. Values other than `project` and `task`
/// pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SearchResultType {
    Project,
    Task,
    Other(String),
}

impl SearchResultType {
    pub fn as_str(&self) -> &str {
        match self {
            SearchResultType::Project => "project",
            SearchResultType::Task => "task",
            SearchResultType::Other(other) => other,
        }
    }
}

impl From<String> for SearchResultType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "project" => SearchResultType::Project,
            "task" => SearchResultType::Task,
            _ => SearchResultType::Other(value),
        }
    }
}

impl fmt::Display for SearchResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SearchResultType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SearchResultType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SearchResultType::from)
    }
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: SearchResultType,

    pub title: String,
    pub description: String,
}

/// Error type for search
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failure inside a non-store index
    #[error("search index error: {0}")]
    Index(String),
}

/// Merges project and task hits for a query
#[derive(Clone)]
pub struct Aggregator {
    index: Arc<dyn SearchIndex>,
    max_results: usize,
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregator")
            .field("max_results", &self.max_results)
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self {
            index,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Searches projects and tasks
    ///
    /// A blank query returns no results without touching the index. Documents
    /// that can't be normalized are logged and skipped.
    ///
    /// # Errors
    ///
    /// Propagates the first index failure.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let (projects, tasks) = tokio::try_join!(
            self.index.project_hits(query),
            self.index.task_hits(query)
        )?;

        let project_results = flatten(projects, SearchResultType::Project);
        let task_results = flatten(tasks, SearchResultType::Task);

        let mut results: Vec<SearchResult> = project_results.chain(task_results).collect();
        results.truncate(self.max_results);

        debug!(query = %query, hits = results.len(), "Search completed");
        Ok(results)
    }
}

fn flatten(
    docs: Vec<Document>,
    fallback_type: SearchResultType,
) -> impl Iterator<Item = SearchResult> {
    docs.into_iter().filter_map(move |doc| {
        match normalize(&doc, fallback_type.clone()) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(error = %e, kind = %fallback_type, "Dropping malformed search hit");
                None
            }
        }
    })
}
