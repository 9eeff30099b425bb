/// Search aggregation over the in-memory store
///
/// Run with: cargo test --test search_tests

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tasktrack_shared::lifecycle::{Lifecycle, NewProject, NewTask};
use tasktrack_shared::search::{Aggregator, SearchResultType, StoreIndex};
use tasktrack_shared::store::{MemoryStore, SharedStore};
use uuid::Uuid;

struct Fixture {
    aggregator: Aggregator,
    project_id: Uuid,
    task_id: Uuid,
}

async fn fixture() -> Fixture {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let lifecycle = Lifecycle::new(store.clone());
    let actor = Uuid::new_v4();

    let project = lifecycle
        .create_project(
            actor,
            NewProject {
                name: "Alpha Launch".to_string(),
                description: Some("First release of the product".to_string()),
                start_date: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
                end_date: Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let task = lifecycle
        .create_task(
            actor,
            NewTask {
                title: "Fix login bug".to_string(),
                description: Some("Users on 100% zoom can't log in".to_string()),
                project_id: Some(project.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    Fixture {
        aggregator: Aggregator::new(Arc::new(StoreIndex::new(store))),
        project_id: project.id,
        task_id: task.id,
    }
}

#[tokio::test]
async fn test_empty_query_returns_nothing() {
    let f = fixture().await;
    assert!(f.aggregator.search("").await.unwrap().is_empty());
    assert!(f.aggregator.search("   ").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_finds_project_by_name() {
    let f = fixture().await;
    let results = f.aggregator.search("alpha").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].kind, SearchResultType::Project);
    assert_eq!(results[0].id, f.project_id.to_string());
    assert_eq!(results[0].title, "Alpha Launch");
}

#[tokio::test]
async fn test_finds_task_by_title() {
    let f = fixture().await;
    let results = f.aggregator.search("LOGIN").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].kind, SearchResultType::Task);
    assert_eq!(results[0].id, f.task_id.to_string());
}

#[tokio::test]
async fn test_description_match_and_order() {
    let f = fixture().await;

    // "r" hits the project description and the task description
    let results = f.aggregator.search(" r ").await.unwrap();
    let kinds: Vec<_> = results.iter().map(|r| r.kind.clone()).collect();
    assert_eq!(kinds, vec![SearchResultType::Project, SearchResultType::Task]);

    let again = f.aggregator.search("r").await.unwrap();
    assert_eq!(results, again);
}

#[tokio::test]
async fn test_wildcards_are_literal() {
    let f = fixture().await;

    let results = f.aggregator.search("100%").await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(f.aggregator.search("%%").await.unwrap().is_empty());
    assert!(f.aggregator.search("_x_").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_no_match() {
    let f = fixture().await;
    assert!(f.aggregator.search("zebra").await.unwrap().is_empty());
}
