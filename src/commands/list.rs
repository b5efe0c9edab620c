use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::commands::format_entity_line;
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::prefs::{FilePreferences, PreferenceStore};
use crate::query::SortCycle;
use crate::remote::{Backend, HttpBackend};
use crate::sync::{FetchHandle, ListController, TableSpec};

/// Everything `procure list` can be asked for.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub collection: String,
    pub filters: Vec<(String, String)>,
    pub multi: Vec<(String, String)>,
    pub sort_clicks: Vec<String>,
    pub sort_cycle: SortCycle,
    pub tab: Option<String>,
    pub tab_flags: Vec<(String, String)>,
    pub year: Option<i32>,
    pub page_size: Option<u32>,
    pub pages: u32,
    /// Restore and save the tab and page size across runs
    pub remember: bool,
    pub json: bool,
}

/// Build the controller for `options`.
///
/// An explicit `--tab` or `--page-size` wins over a remembered one and is
/// remembered in turn. Tab flags are remembered per tab so a restored tab
/// sends the flags it was saved with. Returns the fetch issued by applying
/// the explicit arguments, if any.
pub fn open_list<B: Backend + 'static>(
    config: &Config,
    options: &ListOptions,
    backend: Arc<B>,
    prefs: Option<Arc<dyn PreferenceStore>>,
) -> (ListController<B>, Option<FetchHandle>) {
    let mut spec = TableSpec::from_config(&options.collection, &options.collection, config)
        .with_sort_cycle(options.sort_cycle);
    for (field, _) in &options.filters {
        spec = spec.with_text_filters(field.clone(), [field.clone()]);
    }

    match &options.tab {
        Some(tab) => {
            if let Some(prefs) = &prefs {
                let flags: Map<String, Value> = options
                    .tab_flags
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                prefs.save(&tab_flags_key(&spec, tab), Value::Object(flags));
            }
            spec = spec.with_tab(tab.clone(), options.tab_flags.clone());
        }
        None => {
            let remembered = prefs.as_ref().and_then(|prefs| {
                let tab = prefs.load(&spec.pref_key("tab"))?.as_str()?.to_string();
                let flags = prefs.load(&tab_flags_key(&spec, &tab));
                Some((tab, flags))
            });
            if let Some((tab, flags)) = remembered {
                let flags: Vec<(String, String)> = flags
                    .as_ref()
                    .and_then(Value::as_object)
                    .into_iter()
                    .flatten()
                    .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                    .collect();
                spec = spec.with_tab(tab, flags);
            }
        }
    }

    let mut builder = ListController::builder(spec, backend);
    if let Some(prefs) = prefs {
        builder = builder.preferences(prefs);
    }
    let list = builder.build();

    let mut latest = options.tab.as_deref().and_then(|tab| list.set_tab(Some(tab)));
    if let Some(size) = options.page_size
        && let Some(next) = list.set_page_size(size)
        && let Some(previous) = latest.replace(next)
    {
        previous.abort();
    }
    (list, latest)
}

fn tab_flags_key(spec: &TableSpec, tab: &str) -> String {
    spec.pref_key(&format!("tab_flags.{tab}"))
}

/// Drive a list controller through the requested interactions and print the result.
pub async fn cmd_list(config: &Config, options: ListOptions) -> Result<()> {
    let backend = Arc::new(HttpBackend::from_config(config)?);

    let mut prefs: Option<Arc<dyn PreferenceStore>> = None;
    if options.remember
        && let Some(path) = FilePreferences::default_path()
    {
        prefs = Some(Arc::new(FilePreferences::open(path)?));
    }
    let (list, first) = open_list(config, &options, backend, prefs);

    // Each interaction supersedes the fetch issued by the one before it.
    let mut latest: Option<FetchHandle> = first;
    let mut supersede = |next: Option<FetchHandle>| {
        if let Some(next) = next
            && let Some(previous) = latest.replace(next)
        {
            previous.abort();
        }
    };

    supersede(list.load());
    for (field, value) in &options.filters {
        list.input(field, value, value.chars().count());
    }
    supersede(list.flush());
    for (field, value) in &options.multi {
        supersede(list.toggle_option(field, value));
    }
    for field in &options.sort_clicks {
        supersede(list.click_sort(field));
    }
    supersede(list.set_year(options.year));

    if let Some(handle) = latest.take() {
        settle(handle).await?;
    }
    for _ in 1..options.pages.max(1) {
        match list.load_more() {
            Some(handle) => settle(handle).await?,
            None => break,
        }
    }

    let snapshot = list.snapshot();
    if let Some(error) = snapshot.error {
        return Err(SyncError::Other(error));
    }

    if options.json {
        let tab_flags = list.spec().tab_params_for(snapshot.key.tab.as_deref());
        let output = json!({
            "query": snapshot.key.query_string(&tab_flags),
            "items": snapshot.items,
            "totalElements": snapshot.total_elements,
            "totalPages": snapshot.total_pages,
            "loadedPage": snapshot.loaded_page,
            "hasMore": snapshot.has_more,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for item in &snapshot.items {
        println!("{}", format_entity_line(item));
    }
    let total = snapshot
        .total_elements
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".to_string());
    println!(
        "\n{} of {total} loaded{}",
        snapshot.items.len(),
        if snapshot.has_more { ", more available" } else { "" }
    );

    Ok(())
}

async fn settle(handle: FetchHandle) -> Result<()> {
    handle
        .await
        .map_err(|e| SyncError::Other(format!("fetch task failed: {e}")))
}
