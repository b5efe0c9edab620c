use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::commands::format_entity_line;
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::remote::HttpBackend;
use crate::sync::{DetailOrchestrator, DetailPlan, DetailSnapshot, RelatedData};

#[derive(Debug, Clone, Default)]
pub struct ShowOptions {
    pub collection: String,
    pub id: String,
    /// (name, collection) pairs fetched by parent id
    pub related: Vec<(String, String)>,
    /// (name, collection, field) triples fetched by a root field
    pub referenced: Vec<(String, String, String)>,
    /// (name, after, collection, id_field) chained fetches
    pub chained: Vec<(String, String, String, String)>,
    pub json: bool,
}

impl ShowOptions {
    pub fn plan(&self) -> DetailPlan {
        let mut plan = DetailPlan::new(&self.collection);
        for (name, collection) in &self.related {
            plan = plan.by_parent(name, collection);
        }
        for (name, collection, field) in &self.referenced {
            plan = plan.referenced(name, collection, field);
        }
        for (name, after, collection, id_field) in &self.chained {
            plan = plan.chained(name, after, collection, id_field);
        }
        plan
    }
}

/// Load a detail view and print the root with its related data.
pub async fn cmd_show(config: &Config, options: ShowOptions) -> Result<()> {
    let backend = Arc::new(HttpBackend::from_config(config)?);
    let detail = DetailOrchestrator::new(options.plan(), backend);

    if let Some(handle) = detail.load(&options.id) {
        handle
            .await
            .map_err(|e| SyncError::Other(format!("detail task failed: {e}")))?;
    }

    let snapshot = detail.snapshot();
    if let Some(error) = snapshot.error {
        return Err(SyncError::Other(error));
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&snapshot_to_json(&snapshot))?);
        return Ok(());
    }

    if let Some(root) = &snapshot.root {
        println!("{}", serde_json::to_string_pretty(root)?);
    }
    for (name, data) in &snapshot.related {
        let marker = if snapshot.degraded.contains(name) {
            " (unavailable)"
        } else {
            ""
        };
        println!("\n{name}{marker}:");
        match data {
            RelatedData::Many(items) if items.is_empty() => println!("  (none)"),
            RelatedData::Many(items) => {
                for item in items {
                    println!("{}", format_entity_line(item));
                }
            }
            RelatedData::One(Some(entity)) => println!("{}", format_entity_line(entity)),
            RelatedData::One(None) => println!("  (none)"),
        }
    }

    Ok(())
}

fn snapshot_to_json(snapshot: &DetailSnapshot) -> Value {
    let related: Map<String, Value> = snapshot
        .related
        .iter()
        .map(|(name, data)| {
            let value = match data {
                RelatedData::Many(items) => Value::Array(items.clone()),
                RelatedData::One(entity) => entity.clone().unwrap_or(Value::Null),
            };
            (name.clone(), value)
        })
        .collect();

    json!({
        "id": snapshot.id,
        "stage": snapshot.stage.to_string(),
        "root": snapshot.root,
        "related": related,
        "degraded": snapshot.degraded,
    })
}
