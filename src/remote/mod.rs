//! Backend contract consumed by the synchronization engine.
//!
//! The engine talks to one REST backend through the [`Backend`] trait:
//! offset-paginated collections, single roots by id, and related
//! collections keyed by a parent id.

pub mod http;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::QueryKey;

pub use http::HttpBackend;

/// Entities are opaque to the engine; field semantics belong to the views.
pub type Entity = serde_json::Value;

/// Page envelope returned by collection endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope {
    #[serde(default)]
    pub content: Vec<Entity>,
    #[serde(default)]
    pub total_elements: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub number: Option<u32>,
}

/// One fetched page, as the engine sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T = Entity> {
    pub items: Vec<T>,
    pub total_elements: Option<u64>,
    pub total_pages: Option<u32>,
    pub page_number: u32,
}

impl PageResult {
    /// Normalize an envelope fetched for `requested_page`.
    pub fn from_envelope(envelope: PageEnvelope, requested_page: u32) -> Self {
        Self {
            page_number: envelope.number.unwrap_or(requested_page),
            total_elements: envelope.total_elements,
            total_pages: envelope.total_pages,
            items: envelope.content,
        }
    }
}

/// A request for one page of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub collection: String,
    pub key: QueryKey,
    /// Fixed flags for the active tab.
    pub tab_params: BTreeMap<String, String>,
}

impl PageRequest {
    pub fn params(&self) -> Vec<(String, String)> {
        self.key.to_params(&self.tab_params)
    }
}

/// Transport used by list controllers and detail orchestrators.
///
/// Dropping a returned future must abort the underlying request where the
/// transport supports it.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// `GET /{collection}?page=..&size=..&...`
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResult>;

    /// `GET /{collection}/{id}`. A 404 maps to [`crate::SyncError::NotFound`].
    async fn fetch_entity(&self, collection: &str, id: &str) -> Result<Entity>;

    /// `GET /{collection}/by-parent/{parent_id}`. No matches is an empty vec.
    async fn fetch_related(&self, collection: &str, parent_id: &str) -> Result<Vec<Entity>>;
}

/// Render an entity field as an id string (strings verbatim, numbers formatted).
pub fn entity_id(entity: &Entity, field: &str) -> Option<String> {
    match entity.get(field)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_decoding() {
        let envelope: PageEnvelope = serde_json::from_value(json!({
            "content": [{"id": 1}, {"id": 2}],
            "totalElements": 42,
            "totalPages": 3,
            "size": 20,
            "number": 1
        }))
        .unwrap();

        let page = PageResult::from_envelope(envelope, 1);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages, Some(3));
        assert_eq!(page.total_elements, Some(42));
        assert_eq!(page.page_number, 1);
    }

    #[test]
    fn test_envelope_with_missing_totals() {
        let envelope: PageEnvelope = serde_json::from_value(json!({ "content": [] })).unwrap();
        let page = PageResult::from_envelope(envelope, 5);
        assert_eq!(page.page_number, 5);
        assert_eq!(page.total_pages, None);
    }

    #[test]
    fn test_entity_id_accepts_strings_and_numbers() {
        let entity = json!({"id": 17, "requestId": "REQ-9", "empty": ""});
        assert_eq!(entity_id(&entity, "id").as_deref(), Some("17"));
        assert_eq!(entity_id(&entity, "requestId").as_deref(), Some("REQ-9"));
        assert_eq!(entity_id(&entity, "empty"), None);
        assert_eq!(entity_id(&entity, "missing"), None);
    }
}
