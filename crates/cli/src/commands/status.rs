//! `medchat status`: configuration and provider status.

use medchat_config::{AppConfig, PROVIDER_PRIORITY};
use medchat_providers::{ProviderManager, ProviderStatus, build_from_config};
use std::sync::Arc;
use std::time::Duration;

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    println!("🩺 MedChat Status");
    println!("=================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Environment:  {}", config.environment);
    println!("  Provider:     {}", config.default_provider);
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "  Memory:       {}",
        if config.memory.enabled {
            config
                .memory
                .enabled_types()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            "disabled".to_string()
        }
    );
    println!(
        "  Languages:    {} (default {})",
        config.medical.supported_languages.join(", "),
        config.medical.default_language
    );

    let router = Arc::new(build_from_config(&config));
    let manager = ProviderManager::new(router, Duration::from_secs(config.request_timeout_secs));
    let health = manager.health_check_all().await;

    println!("\n  LLM providers:");
    for name in PROVIDER_PRIORITY {
        let marker = match health.providers.get(name) {
            Some(ProviderStatus::Healthy) => "✅ healthy",
            Some(ProviderStatus::Unhealthy) => "❌ unhealthy",
            _ => "⚪ not configured",
        };
        println!("    {name:<10} {marker}  (model {})", config.model_for(name));
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file, using defaults and environment");
    }

    Ok(())
}
