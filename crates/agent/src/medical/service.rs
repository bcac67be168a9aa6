use super::Language;
use super::knowledge::{KnowledgeBase, KnowledgeItem};
use super::session::{SessionStore, SessionSummary};
use chrono::{DateTime, Utc};
use medchat_config::MedicalConfig;
use medchat_core::error::ValidationError;
use medchat_core::message::Message;
use medchat_providers::{GenerateOptions, LlmService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

const SYSTEM_PROMPT_ES: &str = "Eres un asistente médico especializado en el tratamiento de la \
obesidad con medicamentos GLP-1 (como Ozempic/Semaglutide). Tu papel es:

RESPONSABILIDADES:
- Proporcionar información precisa sobre tratamientos GLP-1
- Ayudar con técnicas de inyección y manejo de efectos secundarios
- Ofrecer orientación sobre expectativas del tratamiento
- Detectar situaciones que requieren atención médica inmediata

LIMITACIONES IMPORTANTES:
- NO puedes diagnosticar condiciones médicas
- NO puedes cambiar dosis de medicamentos
- SIEMPRE recomienda consultar con el médico para decisiones médicas importantes
- Mantén un tono profesional pero empático

INFORMACIÓN MÉDICA RELEVANTE:
{knowledge}

Responde en español de manera clara, precisa y comprensible. Incluye el disclaimer médico \
cuando sea apropiado.";

const SYSTEM_PROMPT_EN: &str = "You are a medical assistant specialized in obesity treatment \
with GLP-1 medications (like Ozempic/Semaglutide). Your role is:

RESPONSIBILITIES:
- Provide accurate information about GLP-1 treatments
- Help with injection techniques and side effect management
- Offer guidance on treatment expectations
- Detect situations requiring immediate medical attention

IMPORTANT LIMITATIONS:
- You CANNOT diagnose medical conditions
- You CANNOT change medication doses
- ALWAYS recommend consulting with doctor for important medical decisions
- Maintain a professional but empathetic tone

RELEVANT MEDICAL INFORMATION:
{knowledge}

Respond in English clearly, accurately and understandably. Include medical disclaimer when \
appropriate.";

const FALLBACK_ES: &str = "Lo siento, no puedo procesar su consulta en este momento. \
Por favor consulte con su médico tratante.";

const FALLBACK_EN: &str = "I'm sorry, I cannot process your query at this time. \
Please consult with your healthcare provider.";

/// Incoming medical question.
#[derive(Debug, Clone, Deserialize)]
pub struct MedicalChatRequest {
    pub message: String,
    /// Defaults to the configured language
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub patient_id: Option<String>,
}

impl MedicalChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            language: None,
            session_id: None,
            patient_id: None,
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn patient(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MedicalReply {
    pub message: String,
    pub session_id: String,
    pub language: Language,
    pub timestamp: DateTime<Utc>,
    pub medical_disclaimer: String,
    /// `false` when the answer is the canned fallback
    pub context_preserved: bool,
    pub knowledge_sources: usize,
    pub response_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MedicalHealth {
    pub llm_configured: bool,
    pub knowledge_base_loaded: bool,
    pub active_sessions: usize,
    pub service_status: &'static str,
}

/// Medical chat over the knowledge base and per-session history.
pub struct MedicalChatService {
    llm: Arc<LlmService>,
    knowledge: KnowledgeBase,
    sessions: SessionStore,
    config: MedicalConfig,
}

impl MedicalChatService {
    pub fn new(llm: Arc<LlmService>, config: &MedicalConfig) -> Self {
        let timeout = chrono::Duration::minutes(config.conversation_timeout_minutes.max(1));
        Self {
            llm,
            knowledge: KnowledgeBase::new(),
            sessions: SessionStore::new(timeout, config.max_history),
            config: config.clone(),
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Answer one question. Only validation fails; LLM errors produce the
    /// fallback reply.
    pub async fn chat(&self, request: MedicalChatRequest) -> Result<MedicalReply, ValidationError> {
        let started = Instant::now();
        let (message, language) = self.validate(&request)?;
        let patient_id = request.patient_id.as_deref();

        let (session_id, history) = self
            .sessions
            .get_or_create(request.session_id.as_deref(), language, patient_id)
            .await;
        info!(
            session_id = %session_id,
            patient_id = patient_id.unwrap_or("-"),
            language = %language,
            "Medical chat request"
        );

        let knowledge =
            self.knowledge
                .relevant(message, language, self.config.max_knowledge_items);
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(build_system_prompt(language, &knowledge)));
        messages.extend(history);
        messages.push(Message::user(message));

        let opts = GenerateOptions {
            provider: None,
            system_prompt: None,
            temperature: self.config.temperature,
            max_tokens: Some(self.config.max_tokens),
        };

        let (text, context_preserved) = match self.llm.chat(messages, &opts).await {
            Ok(reply) => {
                let text = reply.text.trim().to_string();
                self.sessions
                    .record_exchange(&session_id, message, &text)
                    .await;
                (text, true)
            }
            Err(e) => {
                error!(
                    session_id = %session_id,
                    patient_id = patient_id.unwrap_or("-"),
                    error = %e,
                    "Medical chat failed, returning fallback"
                );
                (fallback_message(language).to_string(), false)
            }
        };

        let response_time_ms = started.elapsed().as_millis() as u64;
        info!(
            session_id = %session_id,
            patient_id = patient_id.unwrap_or("-"),
            knowledge_sources = knowledge.len(),
            context_preserved,
            response_time_ms,
            "Medical chat response"
        );

        Ok(MedicalReply {
            message: text,
            session_id,
            language,
            timestamp: Utc::now(),
            medical_disclaimer: self.config.disclaimer.clone(),
            context_preserved,
            knowledge_sources: knowledge.len(),
            response_time_ms,
        })
    }

    pub async fn session_context(&self, session_id: &str) -> Option<SessionSummary> {
        self.sessions.summary(session_id).await
    }

    pub async fn health(&self) -> MedicalHealth {
        MedicalHealth {
            llm_configured: self.llm.select(None).is_ok(),
            knowledge_base_loaded: self.knowledge.is_loaded(),
            active_sessions: self.sessions.active_count().await,
            service_status: "operational",
        }
    }

    fn validate<'a>(
        &self,
        request: &'a MedicalChatRequest,
    ) -> Result<(&'a str, Language), ValidationError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ValidationError::new("message", "Message cannot be empty"));
        }
        let max = self.config.max_message_chars;
        if message.chars().count() > max {
            return Err(ValidationError::new(
                "message",
                format!("Message must be at most {max} characters"),
            ));
        }

        let code = request
            .language
            .as_deref()
            .unwrap_or(&self.config.default_language);
        let language: Language = code.parse()?;
        if !self
            .config
            .supported_languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language.as_str()))
        {
            return Err(ValidationError::new(
                "language",
                format!("Language '{language}' is not enabled"),
            ));
        }

        Ok((message, language))
    }
}

fn build_system_prompt(language: Language, knowledge: &[KnowledgeItem]) -> String {
    let listing = knowledge
        .iter()
        .map(|item| format!("- {}: {}", item.title, item.content))
        .collect::<Vec<_>>()
        .join("\n");
    let template = match language {
        Language::Es => SYSTEM_PROMPT_ES,
        Language::En => SYSTEM_PROMPT_EN,
    };
    template.replace("{knowledge}", &listing)
}

fn fallback_message(language: Language) -> &'static str {
    match language {
        Language::Es => FALLBACK_ES,
        Language::En => FALLBACK_EN,
    }
}
