//! Provider router: holds one provider per configured vendor and resolves
//! requests to one of them.

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::{GROQ_BASE_URL, OPENAI_BASE_URL, OpenAiCompatProvider};
use medchat_config::{AppConfig, PROVIDER_PRIORITY};
use medchat_core::error::ProviderError;
use medchat_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    pub fn default_name(&self) -> &str {
        &self.default_provider
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Registered provider names, in priority order.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_by_key(|name| {
            PROVIDER_PRIORITY
                .iter()
                .position(|p| p == name)
                .unwrap_or(PROVIDER_PRIORITY.len())
        });
        names
    }
}

/// Build providers from configuration.
///
/// Only providers with an API key are registered.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for name in PROVIDER_PRIORITY {
        let Some(api_key) = config.api_key(name) else {
            tracing::debug!(provider = name, "No API key, provider not registered");
            continue;
        };
        let api_url = config.providers.get(name).and_then(|p| p.api_url.clone());

        let provider: Arc<dyn Provider> = if name == "anthropic" {
            let mut p = AnthropicProvider::new(api_key);
            if let Some(url) = api_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        } else {
            let base_url = api_url.unwrap_or_else(|| default_base_url(name).to_string());
            Arc::new(OpenAiCompatProvider::new(name, base_url, api_key))
        };

        tracing::info!(provider = name, model = %config.model_for(name), "Registered LLM provider");
        router.register(name, provider);
    }

    router
}

/// Get the default base URL for the OpenAI-compatible vendors.
fn default_base_url(provider_name: &str) -> &'static str {
    match provider_name {
        "groq" => GROQ_BASE_URL,
        _ => OPENAI_BASE_URL,
    }
}

/// The outcome of provider selection.
#[derive(Clone)]
pub struct SelectedProvider {
    pub name: String,
    pub model: String,
    pub provider: Arc<dyn Provider>,
}

impl std::fmt::Debug for SelectedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedProvider")
            .field("name", &self.name)
            .field("model", &self.model)
            .finish()
    }
}

/// Resolve the provider for one request.
///
/// A requested provider must be known and have an API key. With no request
/// the configured default is used, which `AppConfig::resolve_default_provider`
/// has already pointed at a key-bearing provider when one exists.
pub fn select_provider(
    requested: Option<&str>,
    config: &AppConfig,
    router: &ProviderRouter,
) -> Result<SelectedProvider, ProviderError> {
    let name = requested
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| config.default_provider.clone());

    if !PROVIDER_PRIORITY.contains(&name.as_str()) {
        return Err(ProviderError::Unsupported(format!(
            "{name}. Supported providers: {}",
            PROVIDER_PRIORITY.join(", ")
        )));
    }

    let not_configured =
        || ProviderError::NotConfigured(format!("{} API key is not configured", capitalize(&name)));

    if !config.has_api_key(&name) {
        return Err(not_configured());
    }

    let provider = router.get(&name).ok_or_else(not_configured)?;

    Ok(SelectedProvider {
        model: config.model_for(&name),
        name,
        provider,
    })
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
