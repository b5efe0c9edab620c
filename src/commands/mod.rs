mod config;
mod list;
mod show;

pub use config::{cmd_config_paths, cmd_config_show};
pub use list::{ListOptions, cmd_list, open_list};
pub use show::{ShowOptions, cmd_show};

use serde_json::Value;

use crate::remote::Entity;

/// Single-line rendering of an entity for text output.
pub fn format_entity_line(entity: &Entity) -> String {
    let id = match entity.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "-".to_string(),
    };
    let label = ["name", "title", "innerId", "description"]
        .iter()
        .find_map(|field| entity.get(*field).and_then(Value::as_str))
        .unwrap_or_default();
    format!("{id:>8}  {label}")
}
