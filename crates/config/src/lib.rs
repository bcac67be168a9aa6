//! Configuration loading, validation, and management for MedChat.
//!
//! Loads configuration from `~/.medchat/config.toml`, then applies
//! environment variable overrides (API keys, models, memory weights, CORS
//! origins). The default provider is resolved against the available API
//! keys after overrides are applied.

use medchat_core::memory::MemoryType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Provider names in fallback priority order.
pub const PROVIDER_PRIORITY: [&str; 3] = ["openai", "anthropic", "groq"];

/// The root configuration structure.
///
/// Maps directly to `~/.medchat/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Display name reported by health endpoints
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Deployment environment ("development", "production", ...)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Per-provider credentials and models
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Timeout applied to each outbound LLM call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Locations of the external stores
    #[serde(default)]
    pub stores: StoresConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Medical chat configuration
    #[serde(default)]
    pub medical: MedicalConfig,
}

fn default_app_name() -> String {
    "MedChat".into()
}
fn default_environment() -> String {
    "development".into()
}
fn default_provider() -> String {
    "openai".into()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

/// Credentials and model for one provider.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Overrides the provider's default model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Overrides the provider's default base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field(
                "api_key",
                &if self.api_key.is_some() { "[REDACTED]" } else { "None" },
            )
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub anthropic: ProviderConfig,
    #[serde(default)]
    pub groq: ProviderConfig,
}

impl ProvidersConfig {
    pub fn get(&self, name: &str) -> Option<&ProviderConfig> {
        match name {
            "openai" => Some(&self.openai),
            "anthropic" => Some(&self.anthropic),
            "groq" => Some(&self.groq),
            _ => None,
        }
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut ProviderConfig> {
        match name {
            "openai" => Some(&mut self.openai),
            "anthropic" => Some(&mut self.anthropic),
            "groq" => Some(&mut self.groq),
            _ => None,
        }
    }
}

/// Default model for each known provider.
pub fn default_model(provider: &str) -> &'static str {
    match provider {
        "anthropic" => "claude-3-sonnet-20240229",
        "groq" => "llama-3.3-70b-versatile",
        _ => "gpt-4o",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Master switch for all memory lookups and writes
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub short_term: bool,

    #[serde(default = "default_true")]
    pub semantic: bool,

    #[serde(default = "default_true")]
    pub episodic: bool,

    #[serde(default = "default_true")]
    pub procedural: bool,

    /// How long short-term entries live
    #[serde(default = "default_short_term_ttl")]
    pub short_term_ttl_secs: u64,

    /// Per-type weights in [0, 1]
    #[serde(default = "default_memory_weights")]
    pub weights: HashMap<MemoryType, f32>,

    /// Results requested from each store during aggregation
    #[serde(default = "default_limit_per_type")]
    pub limit_per_type: usize,

    /// Upper bound on the rendered context, in characters
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Per-store search timeout during aggregation
    #[serde(default = "default_backend_timeout")]
    pub backend_timeout_secs: u64,
}

fn default_short_term_ttl() -> u64 {
    3600
}
fn default_limit_per_type() -> usize {
    5
}
fn default_max_context_chars() -> usize {
    128_000
}
fn default_backend_timeout() -> u64 {
    5
}

/// Default per-type memory weights.
pub fn default_memory_weights() -> HashMap<MemoryType, f32> {
    HashMap::from([
        (MemoryType::ShortTerm, 1.0),
        (MemoryType::Semantic, 1.0),
        (MemoryType::Episodic, 0.5),
        (MemoryType::Procedural, 0.8),
    ])
}

impl MemoryConfig {
    /// Memory types switched on, in section order. Empty when memory is off.
    pub fn enabled_types(&self) -> Vec<MemoryType> {
        if !self.enabled {
            return Vec::new();
        }
        MemoryType::ALL
            .into_iter()
            .filter(|t| self.is_type_enabled(*t))
            .collect()
    }

    pub fn is_type_enabled(&self, memory_type: MemoryType) -> bool {
        match memory_type {
            MemoryType::ShortTerm => self.short_term,
            MemoryType::Semantic => self.semantic,
            MemoryType::Episodic => self.episodic,
            MemoryType::Procedural => self.procedural,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            short_term: true,
            semantic: true,
            episodic: true,
            procedural: true,
            short_term_ttl_secs: default_short_term_ttl(),
            weights: default_memory_weights(),
            limit_per_type: default_limit_per_type(),
            max_context_chars: default_max_context_chars(),
            backend_timeout_secs: default_backend_timeout(),
        }
    }
}

/// Where the external stores live. Reported by status commands.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoresConfig {
    #[serde(default = "default_mongo_uri")]
    pub mongo_uri: String,
    #[serde(default = "default_mongo_db")]
    pub mongo_db_name: String,
    #[serde(default = "default_redis_host")]
    pub redis_host: String,
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,
    #[serde(default)]
    pub redis_db: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_password: Option<String>,
    #[serde(default = "default_chroma_host")]
    pub chroma_host: String,
    #[serde(default = "default_chroma_port")]
    pub chroma_port: u16,
    #[serde(default = "default_neo4j_uri")]
    pub neo4j_uri: String,
}

fn default_mongo_uri() -> String {
    "mongodb://localhost:27017/medchat".into()
}
fn default_mongo_db() -> String {
    "medchat".into()
}
fn default_redis_host() -> String {
    "localhost".into()
}
fn default_redis_port() -> u16 {
    6379
}
fn default_chroma_host() -> String {
    "localhost".into()
}
fn default_chroma_port() -> u16 {
    8001
}
fn default_neo4j_uri() -> String {
    "neo4j://localhost:7687".into()
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            mongo_uri: default_mongo_uri(),
            mongo_db_name: default_mongo_db(),
            redis_host: default_redis_host(),
            redis_port: default_redis_port(),
            redis_db: 0,
            redis_password: None,
            chroma_host: default_chroma_host(),
            chroma_port: default_chroma_port(),
            neo4j_uri: default_neo4j_uri(),
        }
    }
}

impl std::fmt::Debug for StoresConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoresConfig")
            .field("mongo_uri", &self.mongo_uri)
            .field("mongo_db_name", &self.mongo_db_name)
            .field("redis_host", &self.redis_host)
            .field("redis_port", &self.redis_port)
            .field("redis_db", &self.redis_db)
            .field(
                "redis_password",
                &if self.redis_password.is_some() { "[REDACTED]" } else { "None" },
            )
            .field("chroma_host", &self.chroma_host)
            .field("chroma_port", &self.chroma_port)
            .field("neo4j_uri", &self.neo4j_uri)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins; `["*"]` allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Maximum accepted request body
    #[serde(default = "default_body_limit")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origins: default_cors_origins(),
            max_body_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalConfig {
    /// Disclaimer attached to every medical chat response
    #[serde(default = "default_disclaimer")]
    pub disclaimer: String,

    #[serde(default = "default_language")]
    pub default_language: String,

    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<String>,

    /// Idle minutes before a chat session is discarded
    #[serde(default = "default_conversation_timeout")]
    pub conversation_timeout_minutes: i64,

    /// Messages kept per session
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// Knowledge items injected into the prompt
    #[serde(default = "default_max_knowledge")]
    pub max_knowledge_items: usize,

    /// Conservative sampling for medical accuracy
    #[serde(default = "default_medical_temperature")]
    pub temperature: f32,

    #[serde(default = "default_medical_max_tokens")]
    pub max_tokens: u32,
}

fn default_disclaimer() -> String {
    "Esta información es solo para fines educativos y no reemplaza el consejo médico \
     profesional. Consulte siempre con su médico."
        .into()
}
fn default_language() -> String {
    "es".into()
}
fn default_supported_languages() -> Vec<String> {
    vec!["es".into(), "en".into()]
}
fn default_conversation_timeout() -> i64 {
    30
}
fn default_max_history() -> usize {
    10
}
fn default_max_message_chars() -> usize {
    1000
}
fn default_max_knowledge() -> usize {
    5
}
fn default_medical_temperature() -> f32 {
    0.3
}
fn default_medical_max_tokens() -> u32 {
    1500
}

impl Default for MedicalConfig {
    fn default() -> Self {
        Self {
            disclaimer: default_disclaimer(),
            default_language: default_language(),
            supported_languages: default_supported_languages(),
            conversation_timeout_minutes: default_conversation_timeout(),
            max_history: default_max_history(),
            max_message_chars: default_max_message_chars(),
            max_knowledge_items: default_max_knowledge(),
            temperature: default_medical_temperature(),
            max_tokens: default_medical_max_tokens(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.medchat/config.toml)
    /// and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.resolve_default_provider();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        for name in PROVIDER_PRIORITY {
            let upper = name.to_uppercase();
            let key = non_empty(&format!("{upper}_API_KEY"));
            let model = non_empty(&format!("{upper}_MODEL"));
            if let Some(provider) = self.providers.get_mut(name) {
                if key.is_some() {
                    provider.api_key = key;
                }
                if model.is_some() {
                    provider.model = model;
                }
            }
        }

        if let Some(provider) = non_empty("DEFAULT_LLM_PROVIDER") {
            self.default_provider = provider.to_lowercase();
        }

        if let Some(enabled) = non_empty("MEMORY_ENABLED").and_then(|v| parse_bool(&v)) {
            self.memory.enabled = enabled;
        }
        for memory_type in MemoryType::ALL {
            let key = format!("ENABLE_{}_MEMORY", memory_type.as_str().to_uppercase());
            if let Some(flag) = non_empty(&key).and_then(|v| parse_bool(&v)) {
                match memory_type {
                    MemoryType::ShortTerm => self.memory.short_term = flag,
                    MemoryType::Semantic => self.memory.semantic = flag,
                    MemoryType::Episodic => self.memory.episodic = flag,
                    MemoryType::Procedural => self.memory.procedural = flag,
                }
            }
        }
        if let Some(raw) = non_empty("MEMORY_WEIGHTS") {
            self.memory.weights = parse_memory_weights(&raw);
        }

        if let Some(raw) = non_empty("CORS_ORIGINS") {
            self.gateway.cors_origins = parse_cors_origins(&raw);
        }
        if let Some(host) = non_empty("MEDCHAT_HOST") {
            self.gateway.host = host;
        }
        if let Some(port) = non_empty("MEDCHAT_PORT").and_then(|v| v.parse().ok()) {
            self.gateway.port = port;
        }

        if let Some(disclaimer) = non_empty("MEDICAL_DISCLAIMER") {
            self.medical.disclaimer = disclaimer;
        }
        if let Some(minutes) = non_empty("CONVERSATION_TIMEOUT_MINUTES").and_then(|v| v.parse().ok())
        {
            self.medical.conversation_timeout_minutes = minutes;
        }
        if let Some(secs) = non_empty("REQUEST_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = secs;
        }

        if let Some(uri) = non_empty("MONGO_URI") {
            self.stores.mongo_uri = uri;
        }
        if let Some(host) = non_empty("REDIS_HOST") {
            self.stores.redis_host = host;
        }
        if let Some(port) = non_empty("REDIS_PORT").and_then(|v| v.parse().ok()) {
            self.stores.redis_port = port;
        }
        if let Some(uri) = non_empty("NEO4J_URI") {
            self.stores.neo4j_uri = uri;
        }
    }

    /// If the default provider has no API key, switch to the first provider
    /// in priority order that has one. Otherwise keep the configured name,
    /// even if it is unusable; health checks report it.
    pub fn resolve_default_provider(&mut self) -> &str {
        if !self.has_api_key(&self.default_provider) {
            let fallback = PROVIDER_PRIORITY
                .into_iter()
                .find(|name| *name != self.default_provider && self.has_api_key(name));
            match fallback {
                Some(name) => {
                    tracing::warn!(
                        configured = %self.default_provider,
                        fallback = name,
                        "Default provider has no API key, falling back"
                    );
                    self.default_provider = name.to_string();
                }
                None => {
                    tracing::warn!(
                        provider = %self.default_provider,
                        "No LLM provider has an API key configured"
                    );
                }
            }
        }
        &self.default_provider
    }

    /// The non-empty API key configured for `provider`, if any.
    pub fn api_key(&self, provider: &str) -> Option<&str> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.as_deref())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn has_api_key(&self, provider: &str) -> bool {
        self.api_key(provider).is_some()
    }

    /// Model to request from `provider`.
    pub fn model_for(&self, provider: &str) -> String {
        self.providers
            .get(provider)
            .and_then(|p| p.model.clone())
            .unwrap_or_else(|| default_model(provider).to_string())
    }

    /// Providers with an API key, in priority order.
    pub fn configured_providers(&self) -> Vec<&'static str> {
        PROVIDER_PRIORITY
            .into_iter()
            .filter(|name| self.has_api_key(name))
            .collect()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".medchat")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !PROVIDER_PRIORITY.contains(&self.default_provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "default_provider must be one of {PROVIDER_PRIORITY:?}, got '{}'",
                self.default_provider
            )));
        }

        for (memory_type, weight) in &self.memory.weights {
            if !(0.0..=1.0).contains(weight) {
                return Err(ConfigError::ValidationError(format!(
                    "memory weight for {memory_type} must be within [0, 1]"
                )));
            }
        }

        if self.memory.limit_per_type == 0 {
            return Err(ConfigError::ValidationError(
                "memory.limit_per_type must be > 0".into(),
            ));
        }

        if self.memory.max_context_chars == 0 {
            return Err(ConfigError::ValidationError(
                "memory.max_context_chars must be > 0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.medical.temperature) {
            return Err(ConfigError::ValidationError(
                "medical.temperature must be between 0.0 and 1.0".into(),
            ));
        }

        if !self
            .medical
            .supported_languages
            .contains(&self.medical.default_language)
        {
            return Err(ConfigError::ValidationError(format!(
                "medical.default_language '{}' is not a supported language",
                self.medical.default_language
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            environment: default_environment(),
            default_provider: default_provider(),
            providers: ProvidersConfig::default(),
            request_timeout_secs: default_request_timeout(),
            memory: MemoryConfig::default(),
            stores: StoresConfig::default(),
            gateway: GatewayConfig::default(),
            medical: MedicalConfig::default(),
        }
    }
}

/// Parse memory weights from a JSON object. Invalid JSON or unknown memory
/// types fall back to the defaults.
pub fn parse_memory_weights(raw: &str) -> HashMap<MemoryType, f32> {
    match serde_json::from_str::<HashMap<MemoryType, f32>>(raw) {
        Ok(weights) => weights,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid MEMORY_WEIGHTS, using defaults");
            default_memory_weights()
        }
    }
}

/// Parse CORS origins from a JSON array or a comma-separated list.
pub fn parse_cors_origins(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        if let Ok(origins) = serde_json::from_str::<Vec<String>>(trimmed) {
            return origins;
        }
    }
    trimmed
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
