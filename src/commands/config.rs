use owo_colors::OwoColorize;
use serde_json::json;

use crate::config::Config;
use crate::error::Result;

/// Mask a sensitive value by showing only the first 2 and last 2 characters
fn mask_sensitive_value(value: &str) -> String {
    let char_count = value.chars().count();
    if char_count > 4 {
        let first: String = value.chars().take(2).collect();
        let last: String = value.chars().skip(char_count - 2).collect();
        format!("{first}...{last}")
    } else {
        "****".to_string()
    }
}

/// Show the effective configuration, with the token masked
pub fn cmd_config_show(config: &Config, output_json: bool) -> Result<()> {
    let token = config.api_token().map(|t| mask_sensitive_value(&t));

    if output_json {
        let output = json!({
            "api_url": config.api_url,
            "api_token": token,
            "debounce_ms": config.debounce_ms,
            "page_size": config.page_size,
            "request_timeout_secs": config.request_timeout_secs,
            "scroll_threshold_px": config.scroll_threshold_px,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}\n", "Configuration:".cyan().bold());
    println!("{}: {}", "api_url".cyan(), config.api_url);
    match token {
        Some(token) => println!("{}: {token}", "api_token".cyan()),
        None => println!("{}: {}", "api_token".cyan(), "not configured".dimmed()),
    }
    println!("{}: {}ms", "debounce".cyan(), config.debounce_ms);
    println!("{}: {}", "page_size".cyan(), config.page_size);
    println!("{}: {}s", "request_timeout".cyan(), config.request_timeout_secs);
    println!("{}: {}px", "scroll_threshold".cyan(), config.scroll_threshold_px);

    Ok(())
}

/// Print the config search paths, marking the ones that exist
pub fn cmd_config_paths() -> Result<()> {
    for path in Config::search_paths() {
        let marker = if path.exists() {
            "found".green().to_string()
        } else {
            "missing".dimmed().to_string()
        };
        println!("{}  [{marker}]", path.display());
    }
    Ok(())
}
