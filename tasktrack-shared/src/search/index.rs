//! Sources of raw search hits.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Document, SearchError};
use crate::store::SharedStore;

/// Something that can find projects and tasks matching a query
///
/// Hits are raw JSON documents; they are flattened by the aggregator, so an
/// index may return array-wrapped fields.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn project_hits(&self, query: &str) -> Result<Vec<Document>, SearchError>;
    async fn task_hits(&self, query: &str) -> Result<Vec<Document>, SearchError>;
}

/// Index backed directly by the domain store's substring search
#[derive(Clone)]
pub struct StoreIndex {
    store: SharedStore,
}

impl StoreIndex {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

fn into_document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

#[async_trait]
impl SearchIndex for StoreIndex {
    async fn project_hits(&self, query: &str) -> Result<Vec<Document>, SearchError> {
        let projects = self.store.search_projects(query).await?;

        Ok(projects
            .into_iter()
            .map(|p| {
                into_document(json!({
                    "id": p.id.to_string(),
                    "type": "project",
                    "name": p.name,
                    "description": p.description,
                }))
            })
            .collect())
    }

    async fn task_hits(&self, query: &str) -> Result<Vec<Document>, SearchError> {
        let tasks = self.store.search_tasks(query).await?;

        Ok(tasks
            .into_iter()
            .map(|t| {
                into_document(json!({
                    "id": t.id.to_string(),
                    "type": "task",
                    "title": t.title,
                    "description": t.description,
                }))
            })
            .collect())
    }
}
