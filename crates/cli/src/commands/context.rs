//! `medchat context`: ask a running gateway for the unified memory context.

use anyhow::{Context as _, bail};
use serde_json::Value;

pub async fn run(
    base_url: &str,
    query: &str,
    conversation_id: Option<String>,
    types: Option<String>,
) -> anyhow::Result<()> {
    let url = format!("{}/api/memory/context", base_url.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .get(&url)
        .query(&query_params(query, conversation_id, types))
        .send()
        .await
        .with_context(|| format!("Failed to reach gateway at {base_url}"))?;

    let status = response.status();
    let body: Value = response.json().await.context("Gateway returned invalid JSON")?;
    if !status.is_success() {
        bail!("Gateway returned {status}: {}", detail_of(&body));
    }

    print_context(&body);
    Ok(())
}

fn query_params(
    query: &str,
    conversation_id: Option<String>,
    types: Option<String>,
) -> Vec<(&'static str, String)> {
    let mut params = vec![("query", query.to_string())];
    if let Some(id) = conversation_id {
        params.push(("conversation_id", id));
    }
    if let Some(types) = types {
        params.push(("memory_types", types));
    }
    params
}

fn detail_of(body: &Value) -> String {
    match &body["detail"] {
        Value::String(s) => s.clone(),
        Value::Null => body.to_string(),
        other => other.to_string(),
    }
}

fn print_context(body: &Value) {
    println!("🧠 Memory Context");
    println!("=================");
    if let Some(sources) = body["sources"].as_object() {
        for (memory_type, contributed) in sources {
            let marker = if contributed.as_bool().unwrap_or(false) { "✅" } else { "  " };
            println!("  {marker} {memory_type}");
        }
    }
    if let Some(failed) = body["failed_types"].as_array().filter(|f| !f.is_empty()) {
        println!("  ⚠️  Failed: {}", Value::Array(failed.clone()));
    }
    if body["truncated"].as_bool().unwrap_or(false) {
        println!("  (context truncated)");
    }

    match body["context"].as_str() {
        Some(context) if !context.is_empty() => println!("\n{context}"),
        _ => println!("\n  No relevant memory found."),
    }
}
