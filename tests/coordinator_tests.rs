//! Draft state tests: cache loading, snapshots after save, partial-save recovery.

mod common;

use batchsave::config::BatchConfig;
use batchsave::state::{LoadOutcome, StateError};
use batchsave::{
    BatchSaveOrchestrator, EntityCoordinator, RelatedEntityManager, SaveDependency, SaveError,
    SaveOptions,
};
use common::{record, MemoryCache, MockTransport};
use serde_json::json;

fn orchestrator(transport: MockTransport) -> BatchSaveOrchestrator<MockTransport> {
    BatchSaveOrchestrator::new(transport, BatchConfig::default())
}

fn field_cache() -> MemoryCache {
    MemoryCache::with_table(
        "fields",
        vec![
            record(json!({"id": 1, "name": "North", "area": 12.5})),
            record(json!({"id": 2, "name": "South", "area": 30})),
        ],
    )
}

// Loading
#[tokio::test]
async fn test_load_from_cache_sets_snapshot() {
    let mut coordinator = EntityCoordinator::new("fields");
    let outcome = coordinator.load(&field_cache(), 2).await.unwrap();

    assert_eq!(outcome, LoadOutcome::Loaded);
    assert_eq!(coordinator.current().unwrap()["name"], json!("South"));
    assert!(!coordinator.has_changes());
    assert!(!coordinator.is_loading());
}

#[tokio::test]
async fn test_load_missing_row() {
    let mut coordinator = EntityCoordinator::new("fields");
    let err = coordinator.load(&field_cache(), 99).await.unwrap_err();
    assert!(matches!(err, StateError::NotFound { id: 99, .. }));
    assert!(!coordinator.is_loading());
}

#[tokio::test]
async fn test_load_before_cache_ready() {
    let mut cache = field_cache();
    cache.initialized = false;
    let mut coordinator = EntityCoordinator::new("fields");
    let err = coordinator.load(&cache, 1).await.unwrap_err();
    assert!(matches!(err, StateError::CacheNotReady));
}

#[tokio::test]
async fn test_load_unknown_table_surfaces_cache_error() {
    let mut coordinator = EntityCoordinator::new("equipment");
    let err = coordinator.load(&field_cache(), 1).await.unwrap_err();
    assert!(matches!(err, StateError::Cache(_)));
    assert!(err.to_string().contains("equipment"));
}

#[tokio::test]
async fn test_load_skipped_while_in_flight() {
    let mut coordinator = EntityCoordinator::new("fields");
    assert!(coordinator.begin_load());

    let outcome = coordinator.load(&field_cache(), 1).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Skipped);
    assert!(coordinator.current().is_none());

    coordinator.abort_load();
    let outcome = coordinator.load(&field_cache(), 1).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded);
}

// Saving
#[tokio::test]
async fn test_save_new_entity_commits_id() {
    let orch = orchestrator(MockTransport::new().then_assign_ids(77));
    let mut coordinator = EntityCoordinator::new("equipment");
    coordinator.start_new(record(json!({"name": "", "is_active": true})));
    coordinator.set_field("name", json!("Combine"));
    assert!(coordinator.has_changes());

    let outcome = coordinator.save(&orch, &SaveOptions::default()).await.unwrap();
    assert_eq!(outcome.main_id, Some(77));
    assert_eq!(coordinator.current().unwrap()["id"], json!(77));
    assert!(!coordinator.has_changes());
}

#[tokio::test]
async fn test_failed_save_keeps_edits() {
    let orch = orchestrator(
        MockTransport::new().then_reply(200, json!({"success": false, "error": "locked"})),
    );
    let mut coordinator = EntityCoordinator::new("fields");
    coordinator.load(&field_cache(), 1).await.unwrap();
    coordinator.set_field("name", json!("North-East"));

    let err = coordinator.save(&orch, &SaveOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), "server");
    assert!(coordinator.has_changes());

    coordinator.reset();
    assert!(!coordinator.has_changes());
    assert_eq!(coordinator.current().unwrap()["name"], json!("North"));
}

#[tokio::test]
async fn test_save_with_related_commits_both_sides() {
    let transport = MockTransport::new().then_assign_ids(10).then_assign_ids(20);
    let orch = orchestrator(transport);
    let deps = [SaveDependency::on_main("counterparty_banks", "counterparty_id")];

    let mut coordinator = EntityCoordinator::new("counterparties");
    coordinator.start_new(record(json!({"name": "Agro"})));
    let mut banks = RelatedEntityManager::new("counterparty_id");
    let first = banks.add(record(json!({"bik": "044525225"})));
    banks.add(record(json!({"bik": "044525974"})));
    banks.set_primary(first);

    let outcome = coordinator
        .save_with_related(&mut banks, &orch, "counterparty_banks", &deps, &SaveOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.main_id, Some(10));
    assert!(!coordinator.has_changes());
    assert!(!banks.has_changes());
    let ids: Vec<_> = banks.entities().iter().map(|row| row["id"].clone()).collect();
    assert_eq!(ids, vec![json!(20), json!(21)]);
    assert!(banks
        .entities()
        .iter()
        .all(|row| row["counterparty_id"] == json!(10)));
    assert_eq!(banks.primary().unwrap()["bik"], json!("044525225"));
}

#[tokio::test]
async fn test_partial_save_then_retry() {
    let transport = MockTransport::new()
        .then_assign_ids(10)
        .then_reply(
            200,
            json!({
                "success": false,
                "validationErrors": [{"field": "bik", "error": "PATTERN", "message": "BIK must have 9 digits"}]
            }),
        )
        .then_assign_ids(30);
    let orch = orchestrator(transport);
    let deps = [SaveDependency::on_main("counterparty_banks", "counterparty_id")];

    let mut coordinator = EntityCoordinator::new("counterparties");
    coordinator.start_new(record(json!({"name": "Agro"})));
    let mut banks = RelatedEntityManager::new("counterparty_id");
    let bad = banks.add(record(json!({"bik": "123"})));

    let err = coordinator
        .save_with_related(&mut banks, &orch, "counterparty_banks", &deps, &SaveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SaveError::PartialSave { main_id: 10, .. }));
    assert!(!coordinator.has_changes());
    assert_eq!(coordinator.current().unwrap()["id"], json!(10));
    assert!(banks.has_changes());

    banks.update(bad, record(json!({"bik": "044525225"})));
    let ids = coordinator
        .retry_related(&mut banks, &orch, "counterparty_banks", &deps, &SaveOptions::default())
        .await
        .unwrap();
    assert_eq!(ids, vec![Some(30)]);
    assert!(!banks.has_changes());

    let requests = orch.transport().requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].operations[0].data["counterparty_id"], json!(10));
    assert_eq!(requests[2].operations[0].data["bik"], json!("044525225"));
}

#[tokio::test]
async fn test_main_saved_without_id_keeps_drafts() {
    let orch = orchestrator(MockTransport::new().then_reply(200, json!({"success": true})));
    let deps = [SaveDependency::on_main("counterparty_banks", "counterparty_id")];

    let mut coordinator = EntityCoordinator::new("counterparties");
    coordinator.start_new(record(json!({"name": "Agro"})));
    let mut banks = RelatedEntityManager::new("counterparty_id");
    banks.add(record(json!({"bik": "044525225"})));

    let err = coordinator
        .save_with_related(&mut banks, &orch, "counterparty_banks", &deps, &SaveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SaveError::MainSavedWithoutId { .. }));
    assert!(err.main_committed());
    assert!(coordinator.has_changes());
    assert!(!coordinator.current().unwrap().contains_key("id"));
    assert!(banks.has_changes());
    assert_eq!(orch.transport().requests().len(), 1);
}

#[tokio::test]
async fn test_retry_requires_saved_main() {
    let orch = orchestrator(MockTransport::new());
    let mut coordinator = EntityCoordinator::new("counterparties");
    coordinator.start_new(record(json!({"name": "Agro"})));
    let mut banks = RelatedEntityManager::new("counterparty_id");
    banks.add(record(json!({"bik": "044525225"})));

    let err = coordinator
        .retry_related(&mut banks, &orch, "counterparty_banks", &[], &SaveOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_request");
    assert!(orch.transport().requests().is_empty());
}
