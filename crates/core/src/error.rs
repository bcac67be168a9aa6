//! Error types for the MedChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the HTTP layer maps them
//! onto status codes.

use thiserror::Error;

/// The top-level error type for all MedChat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request validation ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Agent errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Patient records ---
    #[error("Patient error: {0}")]
    Patient(#[from] PatientError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A request that is well-formed JSON but semantically invalid.
#[derive(Debug, Clone, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("{0}")]
    NotConfigured(String),

    #[error("Unsupported LLM provider: {0}")]
    Unsupported(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether this error stems from the caller's choice of provider rather
    /// than from the provider itself failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotConfigured(_) | Self::Unsupported(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Failed to store in {memory_type} memory: {reason}")]
    Storage { memory_type: String, reason: String },

    #[error("Failed to search {memory_type} memory: {reason}")]
    Retrieval { memory_type: String, reason: String },

    #[error("Connection to {0} memory failed")]
    Connection(String),

    #[error("Invalid memory input: {0}")]
    InvalidInput(String),

    #[error("Memory type not available: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Agent already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Error generating response: {0}")]
    Generation(String),
}

#[derive(Debug, Clone, Error)]
pub enum PatientError {
    #[error("Patient {0} not found")]
    NotFound(String),

    #[error("Patient with ID {0} already exists")]
    Conflict(String),

    #[error("Patient store failure: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn not_configured_is_a_client_error() {
        let err = ProviderError::NotConfigured("Groq API key is not configured".into());
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Groq API key is not configured");
        assert!(!ProviderError::Timeout("30s".into()).is_client_error());
    }

    #[test]
    fn memory_error_names_the_store() {
        let err = MemoryError::Retrieval {
            memory_type: "episodic".into(),
            reason: "connection refused".into(),
        };
        assert!(err.to_string().contains("episodic"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn validation_error_mentions_field() {
        let err = ValidationError::new("message", "Message cannot be empty");
        assert_eq!(err.to_string(), "message: Message cannot be empty");
    }
}
