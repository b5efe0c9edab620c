#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::oneshot;

use procure_sync::sync::FocusSurface;
use procure_sync::{Backend, Entity, PageEnvelope, PageRequest, PageResult, Result, SyncError};

struct RecordedCall {
    path: String,
    params: Vec<(String, String)>,
    reply: Option<oneshot::Sender<Result<Value>>>,
}

/// Backend whose every call blocks until the test answers it.
///
/// Calls are numbered in the order they reach the backend, so tests can
/// resolve them out of order.
#[derive(Default)]
pub struct GatedBackend {
    calls: Mutex<Vec<RecordedCall>>,
}

impl GatedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn gate(&self, path: String, params: Vec<(String, String)>) -> Result<Value> {
        let (tx, rx) = oneshot::channel();
        self.calls.lock().push(RecordedCall {
            path,
            params,
            reply: Some(tx),
        });
        rx.await.unwrap_or(Err(SyncError::Cancelled))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn path(&self, index: usize) -> String {
        self.calls.lock()[index].path.clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.path.clone()).collect()
    }

    pub fn params(&self, index: usize) -> Vec<(String, String)> {
        self.calls.lock()[index].params.clone()
    }

    pub fn param(&self, index: usize, name: &str) -> Option<String> {
        self.params(index)
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn param_values(&self, index: usize, name: &str) -> Vec<String> {
        self.params(index)
            .into_iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value)
            .collect()
    }

    /// Answer call `index`. Answers to aborted calls are dropped.
    pub fn respond(&self, index: usize, value: Value) {
        self.reply(index, Ok(value));
    }

    pub fn fail(&self, index: usize, error: SyncError) {
        self.reply(index, Err(error));
    }

    fn reply(&self, index: usize, result: Result<Value>) {
        let sender = self.calls.lock()[index]
            .reply
            .take()
            .unwrap_or_else(|| panic!("call {index} already answered"));
        let _ = sender.send(result);
    }

    /// Let spawned tasks run until at least `count` calls have arrived.
    pub async fn wait_for_calls(&self, count: usize) {
        for _ in 0..500 {
            if self.call_count() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!(
            "expected {count} backend calls, saw {}: {:?}",
            self.call_count(),
            self.paths()
        );
    }
}

#[async_trait::async_trait]
impl Backend for GatedBackend {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResult> {
        let value = self
            .gate(format!("/{}", request.collection), request.params())
            .await?;
        let envelope: PageEnvelope = serde_json::from_value(value)?;
        Ok(PageResult::from_envelope(envelope, request.key.page))
    }

    async fn fetch_entity(&self, collection: &str, id: &str) -> Result<Entity> {
        self.gate(format!("/{collection}/{id}"), Vec::new()).await
    }

    async fn fetch_related(&self, collection: &str, parent_id: &str) -> Result<Vec<Entity>> {
        let value = self
            .gate(format!("/{collection}/by-parent/{parent_id}"), Vec::new())
            .await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Page envelope with one `{id, name}` entity per id.
pub fn page_json(number: u32, ids: &[i64], total_pages: Option<u32>) -> Value {
    let content: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "id": id, "name": format!("item {id}") }))
        .collect();
    json!({
        "content": content,
        "totalElements": total_pages.map(|_| 99),
        "totalPages": total_pages,
        "number": number,
    })
}

pub fn ids(items: &[Entity]) -> Vec<i64> {
    items.iter().filter_map(|item| item["id"].as_i64()).collect()
}

/// Give every ready task a chance to run.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Rendering layer double: remembers input values, the active control and
/// every programmatic focus call.
#[derive(Default)]
pub struct FakeSurface {
    values: Mutex<BTreeMap<String, String>>,
    active: Mutex<Option<String>>,
    focus_calls: Mutex<Vec<(String, usize)>>,
}

impl FakeSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The user typed `value` into `field`, which holds focus.
    pub fn type_into(&self, field: &str, value: &str) {
        self.values
            .lock()
            .insert(field.to_string(), value.to_string());
        *self.active.lock() = Some(field.to_string());
    }

    /// A re-render replaced the focused element.
    pub fn lose_focus(&self) {
        *self.active.lock() = None;
    }

    pub fn click(&self, field: &str) {
        *self.active.lock() = Some(field.to_string());
    }

    pub fn focus_calls(&self) -> Vec<(String, usize)> {
        self.focus_calls.lock().clone()
    }

    pub fn clear_focus_calls(&self) {
        self.focus_calls.lock().clear();
    }
}

impl FocusSurface for FakeSurface {
    fn active_field(&self) -> Option<String> {
        self.active.lock().clone()
    }

    fn field_value(&self, name: &str) -> Option<String> {
        self.values.lock().get(name).cloned()
    }

    fn focus_field(&self, name: &str, cursor: usize) {
        *self.active.lock() = Some(name.to_string());
        self.focus_calls.lock().push((name.to_string(), cursor));
    }
}

/// Runs the `procure` binary in an isolated temp directory.
pub struct ProcureTest {
    pub temp_dir: tempfile::TempDir,
}

impl ProcureTest {
    pub fn new() -> Self {
        ProcureTest {
            temp_dir: tempfile::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `procure.yaml` into the working directory.
    pub fn write_config(&self, yaml: &str) {
        std::fs::write(self.temp_dir.path().join("procure.yaml"), yaml)
            .expect("Failed to write config");
    }

    pub fn run(&self, args: &[&str]) -> std::process::Output {
        std::process::Command::new(env!("CARGO_BIN_EXE_procure"))
            .args(args)
            .current_dir(self.temp_dir.path())
            .env_remove("PROCURE_API_URL")
            .env_remove("PROCURE_API_TOKEN")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute procure command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Command {:?} should have failed\nstdout: {}",
            args,
            String::from_utf8_lossy(&output.stdout)
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }
}
