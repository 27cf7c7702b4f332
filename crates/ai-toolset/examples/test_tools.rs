//! Exercise the toolset against real services.
//!
//! Run with: cargo run -p ai-toolset --example test_tools
//!
//! Reads `AI_TOOLSET_*` variables for search credentials and, when
//! `HASS_TOKEN` is set, connects to Home Assistant for the home tools.

use std::collections::HashMap;
use std::sync::Arc;

use ai_toolset::{default_registry, ToolRegistry, ToolsetConfig, API_PROMPT};
use hass_host::HassClient;
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ai_toolset=debug".parse()?)
                .add_directive("hass_host=debug".parse()?),
        )
        .init();

    println!("=== AI Toolset Test ===\n");
    println!("{}\n", API_PROMPT);

    let config = ToolsetConfig::from_env()?.with_code_executor(true);
    let mut registry = default_registry(&config)?;

    let has_host = match HassClient::from_env() {
        Ok(client) => {
            registry.set_host(Arc::new(client));
            true
        }
        Err(e) => {
            println!("Home Assistant not configured ({}), home tools will report it.\n", e);
            false
        }
    };

    println!("Registered tools:");
    for (name, desc) in registry.get_descriptions() {
        println!("  - {}: {}", name, desc);
    }
    println!();

    test_code_executor(&registry).await;
    test_web_search(&registry).await;
    test_url_fetch(&registry).await;
    if has_host {
        test_home(&registry).await;
    }

    println!("\n=== All tests completed ===");
    Ok(())
}

fn params(value: Value) -> HashMap<String, Value> {
    value
        .as_object()
        .map(|m| m.clone().into_iter().collect())
        .unwrap_or_default()
}

fn report(label: &str, output: &ai_toolset::ToolOutput) {
    if output.success {
        println!("  [PASS] {}", label);
    } else {
        println!("  [FAIL] {}: {}", label, output.error().unwrap_or("unknown error"));
    }
}

async fn test_code_executor(registry: &ToolRegistry) {
    println!("--- Testing code_executor ---");

    let output = registry
        .invoke("code_executor", params(json!({"code": "print([1, 2, 3].map(x => x * x).join(' '))"})))
        .await;
    report("squares", &output);
    println!("  output: {}", output.get("output").unwrap_or(&Value::Null));

    let output = registry
        .invoke("code_executor", params(json!({"code": "undefinedFunction()"})))
        .await;
    if output.success {
        println!("  [FAIL] undefined function should have failed");
    } else {
        println!("  [PASS] error reported: {}", output.error().unwrap_or_default());
    }

    println!();
}

async fn test_web_search(registry: &ToolRegistry) {
    println!("--- Testing web_search ---");
    println!("  (Requires network access and a search key)");

    let output = registry
        .invoke("web_search", params(json!({"query": "rust programming language", "max_results": 3})))
        .await;
    report("text search", &output);
    if let Some(results) = output.get("results").and_then(|r| r.as_array()) {
        for result in results {
            println!("    {} - {}", result["title"], result["url"]);
        }
    }

    println!();
}

async fn test_url_fetch(registry: &ToolRegistry) {
    println!("--- Testing url_fetch ---");
    println!("  (Requires network access)");

    let output = registry
        .invoke("url_fetch", params(json!({"url": "https://example.com", "max_length": 200})))
        .await;
    report("example.com", &output);
    println!("  title: {}", output.get("title").unwrap_or(&Value::Null));

    let output = registry
        .invoke("url_fetch", params(json!({"url": "not-a-url"})))
        .await;
    if output.success {
        println!("  [FAIL] Invalid URL should have failed");
    } else {
        println!("  [PASS] Invalid URL correctly returned error");
    }

    println!();
}

async fn test_home(registry: &ToolRegistry) {
    println!("--- Testing home tools ---");

    let output = registry
        .invoke("music_find", params(json!({"query": "jazz", "limit": 5})))
        .await;
    report("music_find", &output);
    println!("  {}", output.get("message").unwrap_or(&Value::Null));

    println!();
}
