#[path = "common/mod.rs"]
mod common;

use common::{GatedBackend, settle};
use procure_sync::SyncError;
use procure_sync::sync::{DetailOrchestrator, DetailPlan, DetailStage, RelatedData};
use serde_json::json;

fn request_plan() -> DetailPlan {
    DetailPlan::new("requests")
        .by_parent("approvals", "approvals")
        .referenced("supplier", "suppliers", "supplierId")
}

#[tokio::test]
async fn test_switching_ids_discards_previous_load() {
    let backend = GatedBackend::new();
    let detail = DetailOrchestrator::new(request_plan(), backend.clone());

    detail.load("1").unwrap();
    backend.wait_for_calls(1).await;
    let second = detail.load("2").unwrap();
    backend.wait_for_calls(2).await;
    assert_eq!(backend.paths(), vec!["/requests/1", "/requests/2"]);

    backend.respond(0, json!({"id": 1, "supplierId": 10}));
    settle().await;
    let snapshot = detail.snapshot();
    assert_eq!(snapshot.id.as_deref(), Some("2"));
    assert_eq!(snapshot.root, None, "root of id 1 never shown");

    backend.respond(1, json!({"id": 2, "supplierId": 20}));
    backend.wait_for_calls(4).await;
    assert_eq!(backend.path(2), "/approvals/by-parent/2");
    assert_eq!(backend.path(3), "/suppliers/20");

    backend.respond(2, json!([]));
    backend.respond(3, json!({"id": 20, "name": "Acme"}));
    second.await.unwrap();

    let snapshot = detail.snapshot();
    assert_eq!(snapshot.root, Some(json!({"id": 2, "supplierId": 20})));
    assert_eq!(snapshot.stage, DetailStage::Ready);
    assert_eq!(
        snapshot.related["supplier"].as_one().map(|s| s["name"].clone()),
        Some(json!("Acme"))
    );
}

#[tokio::test]
async fn test_loading_holds_until_every_dependent_settles() {
    let backend = GatedBackend::new();
    let detail = DetailOrchestrator::new(request_plan(), backend.clone());

    let handle = detail.load("5").unwrap();
    backend.wait_for_calls(1).await;
    backend.respond(0, json!({"id": 5, "supplierId": 9}));
    backend.wait_for_calls(3).await;

    let snapshot = detail.snapshot();
    assert!(snapshot.loading);
    assert_eq!(snapshot.stage, DetailStage::Related);
    assert!(snapshot.root.is_some(), "root shown as soon as it arrives");

    backend.respond(1, json!([{"id": 100, "decision": "approved"}]));
    settle().await;
    let snapshot = detail.snapshot();
    assert!(snapshot.loading);
    assert!(snapshot.related.is_empty(), "related data lands in one update");

    backend.respond(2, json!({"id": 9}));
    handle.await.unwrap();

    let snapshot = detail.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(snapshot.stage, DetailStage::Ready);
    assert_eq!(snapshot.related["approvals"].as_many().len(), 1);
    assert!(snapshot.degraded.is_empty());
}

#[tokio::test]
async fn test_repeat_load_of_same_id_is_ignored() {
    let backend = GatedBackend::new();
    let detail = DetailOrchestrator::new(DetailPlan::new("requests"), backend.clone());

    let handle = detail.load("1").unwrap();
    assert!(detail.load("1").is_none());
    backend.wait_for_calls(1).await;
    settle().await;
    assert_eq!(backend.call_count(), 1);

    backend.respond(0, json!({"id": 1}));
    handle.await.unwrap();
    assert!(detail.reload().is_some(), "reload is explicit");
    backend.wait_for_calls(2).await;
}

#[tokio::test]
async fn test_chained_fetch_uses_id_from_related_result() {
    let backend = GatedBackend::new();
    let plan = DetailPlan::new("approvals")
        .referenced("request", "requests", "requestId")
        .chained("specs", "request", "specs", "id");
    let detail = DetailOrchestrator::new(plan, backend.clone());

    let handle = detail.load("3").unwrap();
    backend.wait_for_calls(1).await;
    backend.respond(0, json!({"id": 3, "requestId": "REQ-7"}));
    backend.wait_for_calls(2).await;
    assert_eq!(backend.path(1), "/requests/REQ-7");

    backend.respond(1, json!({"id": 70}));
    backend.wait_for_calls(3).await;
    assert_eq!(backend.path(2), "/specs/by-parent/70");
    assert_eq!(detail.stage(), DetailStage::Chained);

    backend.respond(2, json!([{"id": 1}, {"id": 2}]));
    handle.await.unwrap();

    let snapshot = detail.snapshot();
    assert_eq!(snapshot.related["specs"].as_many().len(), 2);
    assert_eq!(snapshot.stage, DetailStage::Ready);
}

#[tokio::test]
async fn test_chained_fetch_skipped_without_anchor() {
    let backend = GatedBackend::new();
    let plan = DetailPlan::new("approvals")
        .referenced("request", "requests", "requestId")
        .chained("specs", "request", "specs", "id");
    let detail = DetailOrchestrator::new(plan, backend.clone());

    let handle = detail.load("3").unwrap();
    backend.wait_for_calls(1).await;
    backend.respond(0, json!({"id": 3}));
    handle.await.unwrap();

    assert_eq!(backend.call_count(), 1);
    let snapshot = detail.snapshot();
    assert_eq!(snapshot.related["request"], RelatedData::One(None));
    assert_eq!(snapshot.related["specs"], RelatedData::Many(Vec::new()));
}

#[tokio::test]
async fn test_failed_dependent_degrades_instead_of_failing() {
    let backend = GatedBackend::new();
    let detail = DetailOrchestrator::new(request_plan(), backend.clone());

    let handle = detail.load("5").unwrap();
    backend.wait_for_calls(1).await;
    backend.respond(0, json!({"id": 5, "supplierId": 9}));
    backend.wait_for_calls(3).await;
    backend.fail(1, SyncError::Status {
        status: 500,
        body: String::new(),
    });
    backend.fail(2, SyncError::NotFound("suppliers/9".to_string()));
    handle.await.unwrap();

    let snapshot = detail.snapshot();
    assert_eq!(snapshot.stage, DetailStage::Ready);
    assert_eq!(snapshot.error, None);
    assert!(snapshot.degraded.contains("approvals"));
    assert!(
        !snapshot.degraded.contains("supplier"),
        "missing reference is just empty"
    );
    assert_eq!(snapshot.related["approvals"], RelatedData::Many(Vec::new()));
}

#[tokio::test]
async fn test_root_failure_is_surfaced() {
    let backend = GatedBackend::new();
    let detail = DetailOrchestrator::new(request_plan(), backend.clone());

    let handle = detail.load("404").unwrap();
    backend.wait_for_calls(1).await;
    backend.fail(0, SyncError::NotFound("requests/404".to_string()));
    handle.await.unwrap();

    let snapshot = detail.snapshot();
    assert_eq!(snapshot.stage, DetailStage::Failed);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.error.as_deref(), Some("'requests/404' not found"));
    assert_eq!(backend.call_count(), 1, "no dependents without a root");
}

#[tokio::test]
async fn test_cancelled_root_is_not_an_error() {
    let backend = GatedBackend::new();
    let detail = DetailOrchestrator::new(request_plan(), backend.clone());

    let handle = detail.load("1").unwrap();
    backend.wait_for_calls(1).await;
    backend.fail(0, SyncError::Cancelled);
    handle.await.unwrap();

    let snapshot = detail.snapshot();
    assert_eq!(snapshot.stage, DetailStage::Cancelled);
    assert_eq!(snapshot.error, None);
}

#[tokio::test]
async fn test_close_aborts_in_flight_load() {
    let backend = GatedBackend::new();
    let detail = DetailOrchestrator::new(request_plan(), backend.clone());

    let handle = detail.load("1").unwrap();
    backend.wait_for_calls(1).await;
    detail.close();

    assert!(handle.await.unwrap_err().is_cancelled());
    backend.respond(0, json!({"id": 1}));
    settle().await;

    let snapshot = detail.snapshot();
    assert_eq!(snapshot.stage, DetailStage::Idle);
    assert_eq!(snapshot.root, None);
    assert_eq!(backend.call_count(), 1);
}
