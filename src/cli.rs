use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use crate::query::SortCycle;

#[derive(Parser)]
#[command(name = "procure")]
#[command(about = "Query a procurement backend the way the dashboard views do")]
#[command(version)]
pub struct Cli {
    /// Read configuration from this file instead of the search paths
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log engine activity at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a filtered, sorted collection, optionally several pages deep
    #[command(visible_alias = "ls")]
    List {
        /// Collection path, e.g. `requests`
        collection: String,

        /// Text filter as field=value, can be repeated
        #[arg(short, long = "filter", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,

        /// Multi-select option as field=value, can be repeated
        #[arg(short, long = "multi", value_parser = parse_key_value)]
        multi: Vec<(String, String)>,

        /// Click a sort header, can be repeated (clicking twice sorts descending)
        #[arg(short, long = "sort")]
        sort: Vec<String>,

        /// Sort cycle for header clicks: two-state or three-state
        #[arg(long, default_value = "two-state", value_parser = parse_sort_cycle)]
        sort_cycle: SortCycle,

        /// Active tab name
        #[arg(long)]
        tab: Option<String>,

        /// Fixed request flag for the active tab as key=value, can be repeated
        #[arg(long = "tab-flag", value_parser = parse_key_value, requires = "tab")]
        tab_flags: Vec<(String, String)>,

        /// Year filter
        #[arg(long)]
        year: Option<i32>,

        /// Page size (defaults to the configured one)
        #[arg(long)]
        page_size: Option<u32>,

        /// Number of pages to accumulate
        #[arg(long, default_value = "1")]
        pages: u32,

        /// Remember the tab and page size between runs
        #[arg(long)]
        remember: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load one entity with its related collections
    Show {
        /// Collection path of the root entity
        collection: String,

        /// Root entity ID
        id: String,

        /// Related collection by parent as name=collection, can be repeated
        #[arg(long = "related", value_parser = parse_key_value)]
        related: Vec<(String, String)>,

        /// Referenced entity as name=collection:field, can be repeated
        #[arg(long = "referenced", value_parser = parse_referenced)]
        referenced: Vec<ReferencedArg>,

        /// Chained fetch as name=after:collection[:id_field], can be repeated
        #[arg(long = "chained", value_parser = parse_chained)]
        chained: Vec<ChainedArg>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the paths searched for the configuration file
    Paths,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencedArg {
    pub name: String,
    pub collection: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainedArg {
    pub name: String,
    pub after: String,
    pub collection: String,
    pub id_field: String,
}

pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_referenced(s: &str) -> Result<ReferencedArg, String> {
    let (name, target) = parse_key_value(s)?;
    let (collection, field) = target
        .split_once(':')
        .filter(|(c, f)| !c.is_empty() && !f.is_empty())
        .ok_or_else(|| format!("expected name=collection:field, got '{s}'"))?;
    Ok(ReferencedArg {
        name,
        collection: collection.to_string(),
        field: field.to_string(),
    })
}

fn parse_chained(s: &str) -> Result<ChainedArg, String> {
    let (name, target) = parse_key_value(s)?;
    let parts: Vec<&str> = target.split(':').collect();
    let (after, collection, id_field) = match parts.as_slice() {
        [after, collection] => (*after, *collection, "id"),
        [after, collection, id_field] => (*after, *collection, *id_field),
        _ => return Err(format!("expected name=after:collection[:id_field], got '{s}'")),
    };
    if after.is_empty() || collection.is_empty() || id_field.is_empty() {
        return Err(format!("empty segment in '{s}'"));
    }
    Ok(ChainedArg {
        name,
        after: after.to_string(),
        collection: collection.to_string(),
        id_field: id_field.to_string(),
    })
}

fn parse_sort_cycle(s: &str) -> Result<SortCycle, String> {
    SortCycle::from_str(s).map_err(|_| "Invalid sort cycle. Must be one of: two-state, three-state".to_string())
}
