//! LLM service: provider selection plus a bounded completion call.

use crate::router::{ProviderRouter, SelectedProvider, select_provider};
use medchat_config::AppConfig;
use medchat_core::error::ProviderError;
use medchat_core::message::Message;
use medchat_core::provider::{ProviderRequest, Usage};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that provides accurate information.";

/// Per-call knobs for [`LlmService`].
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Requested provider; `None` uses the configured default
    pub provider: Option<String>,
    /// Replaces the default system prompt
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            provider: None,
            system_prompt: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

/// A completed generation.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub usage: Option<Usage>,
    pub elapsed: Duration,
}

/// Entry point for every LLM call in MedChat.
///
/// No retries; a failed or timed-out call surfaces as a `ProviderError`.
pub struct LlmService {
    router: Arc<ProviderRouter>,
    config: Arc<AppConfig>,
    timeout: Duration,
}

impl LlmService {
    pub fn new(router: Arc<ProviderRouter>, config: Arc<AppConfig>) -> Self {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        Self {
            router,
            config,
            timeout,
        }
    }

    pub fn router(&self) -> &Arc<ProviderRouter> {
        &self.router
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Resolve a provider without calling it.
    pub fn select(&self, requested: Option<&str>) -> Result<SelectedProvider, ProviderError> {
        select_provider(requested, &self.config, &self.router)
    }

    /// Answer `query`, appending `context` to the system prompt when present.
    pub async fn generate_response(
        &self,
        query: &str,
        context: Option<&str>,
        opts: &GenerateOptions,
    ) -> Result<LlmReply, ProviderError> {
        let mut system = opts
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
            system.push_str(
                "\n\nYou have access to the following information that may help answer \
                 the user's question. Use this information if relevant, but you don't \
                 have to use it all:\n\n",
            );
            system.push_str(context);
        }

        let messages = vec![Message::system(system), Message::user(query)];
        self.chat(messages, opts).await
    }

    /// Send a prepared message list to the selected provider.
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        opts: &GenerateOptions,
    ) -> Result<LlmReply, ProviderError> {
        let selected = self.select(opts.provider.as_deref())?;

        let mut request = ProviderRequest::new(selected.model.clone(), messages);
        request.temperature = opts.temperature;
        request.max_tokens = opts.max_tokens;

        let started = Instant::now();
        let response =
            match tokio::time::timeout(self.timeout, selected.provider.complete(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    warn!(provider = %selected.name, error = %e, "LLM request failed");
                    return Err(e);
                }
                Err(_) => {
                    warn!(
                        provider = %selected.name,
                        timeout_secs = self.timeout.as_secs(),
                        "LLM request timed out"
                    );
                    return Err(ProviderError::Timeout(format!(
                        "{} did not respond within {}s",
                        selected.name,
                        self.timeout.as_secs()
                    )));
                }
            };
        let elapsed = started.elapsed();

        info!(
            provider = %selected.name,
            model = %response.model,
            elapsed_ms = elapsed.as_millis() as u64,
            tokens = response.usage.map(|u| u.total_tokens).unwrap_or(0),
            "LLM response received"
        );

        Ok(LlmReply {
            text: response.message.content,
            provider: selected.name,
            model: response.model,
            usage: response.usage,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medchat_core::message::Role;
    use medchat_core::provider::{Provider, ProviderResponse};
    use std::sync::Mutex;

    /// Records the last request and answers with a fixed text.
    struct RecordingProvider {
        last: Mutex<Option<ProviderRequest>>,
        delay: Duration,
    }

    impl RecordingProvider {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                last: Mutex::new(None),
                delay,
            })
        }
    }

    #[async_trait]
    impl Provider for RecordingProvider {
        fn name(&self) -> &str {
            "openai"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(self.delay).await;
            let model = request.model.clone();
            *self.last.lock().unwrap() = Some(request);
            Ok(ProviderResponse {
                message: Message::assistant("respuesta"),
                usage: None,
                model,
            })
        }
    }

    fn service(provider: Arc<RecordingProvider>, timeout_secs: u64) -> LlmService {
        let mut config = AppConfig::default();
        config.providers.openai.api_key = Some("sk-test".into());
        config.request_timeout_secs = timeout_secs;
        let mut router = ProviderRouter::new("openai");
        router.register("openai", provider);
        LlmService::new(Arc::new(router), Arc::new(config))
    }

    #[tokio::test]
    async fn generate_response_builds_system_and_user_messages() {
        let provider = RecordingProvider::new(Duration::ZERO);
        let llm = service(provider.clone(), 30);

        let reply = llm
            .generate_response("¿Qué es Ozempic?", Some("Document 1: semaglutide"), &GenerateOptions::default())
            .await
            .unwrap();

        assert_eq!(reply.text, "respuesta");
        assert_eq!(reply.provider, "openai");
        assert_eq!(reply.model, "gpt-4o");

        let request = provider.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.starts_with(DEFAULT_SYSTEM_PROMPT));
        assert!(request.messages[0].content.ends_with("Document 1: semaglutide"));
        assert_eq!(request.messages[1].content, "¿Qué es Ozempic?");
    }

    #[tokio::test]
    async fn blank_context_is_not_appended() {
        let provider = RecordingProvider::new(Duration::ZERO);
        let llm = service(provider.clone(), 30);
        let opts = GenerateOptions {
            system_prompt: Some("Custom".into()),
            temperature: 0.2,
            max_tokens: Some(100),
            ..Default::default()
        };
        llm.generate_response("hi", Some("  "), &opts).await.unwrap();

        let request = provider.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.messages[0].content, "Custom");
        assert_eq!(request.max_tokens, Some(100));
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let provider = RecordingProvider::new(Duration::from_secs(60));
        let llm = service(provider, 1);
        let err = llm
            .generate_response("hi", None, &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    #[tokio::test]
    async fn unconfigured_provider_fails_before_calling() {
        let provider = RecordingProvider::new(Duration::ZERO);
        let llm = service(provider.clone(), 30);
        let opts = GenerateOptions {
            provider: Some("groq".into()),
            ..Default::default()
        };
        let err = llm.generate_response("hi", None, &opts).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(provider.last.lock().unwrap().is_none());
    }
}
