//! Per-session conversation context for medical chat.

use super::Language;
use chrono::{DateTime, Duration, Utc};
use medchat_core::message::Message;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// One medical chat session.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub session_id: String,
    pub language: Language,
    pub patient_id: Option<String>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl ConversationContext {
    pub fn new(session_id: impl Into<String>, language: Language, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            language,
            patient_id: None,
            messages: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Append a message, keeping only the newest `max_history`.
    pub fn push(&mut self, message: Message, max_history: usize) {
        self.last_activity = message.timestamp;
        self.messages.push(message);
        if self.messages.len() > max_history {
            let excess = self.messages.len() - max_history;
            self.messages.drain(..excess);
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.last_activity > timeout
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            language: self.language,
            patient_id: self.patient_id.clone(),
            message_count: self.messages.len(),
            created_at: self.created_at,
            last_activity: self.last_activity,
        }
    }
}

/// What the session-context endpoint reports. Message bodies are omitted.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub language: Language,
    pub patient_id: Option<String>,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// In-process session table.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, ConversationContext>>,
    timeout: Duration,
    max_history: usize,
}

impl SessionStore {
    pub fn new(timeout: Duration, max_history: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout,
            max_history: max_history.max(1),
        }
    }

    /// Open a session and return its id plus the history to replay.
    ///
    /// A missing id gets a fresh uuid. An expired session is replaced by an
    /// empty one under the same id. Every other expired session is dropped
    /// on the way.
    pub async fn get_or_create(
        &self,
        session_id: Option<&str>,
        language: Language,
        patient_id: Option<&str>,
    ) -> (String, Vec<Message>) {
        self.get_or_create_at(session_id, language, patient_id, Utc::now())
            .await
    }

    pub(crate) async fn get_or_create_at(
        &self,
        session_id: Option<&str>,
        language: Language,
        patient_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> (String, Vec<Message>) {
        let session_id = session_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut sessions = self.sessions.write().await;
        let purged = Self::retain_live(&mut sessions, now, self.timeout);
        if purged > 0 {
            debug!(purged, "Dropped expired sessions");
        }

        let context = sessions
            .entry(session_id.clone())
            .or_insert_with(|| ConversationContext::new(session_id.clone(), language, now));
        if let Some(patient_id) = patient_id {
            context.patient_id = Some(patient_id.to_string());
        }

        (session_id, context.messages.clone())
    }

    /// Record a completed question and answer.
    pub async fn record_exchange(&self, session_id: &str, user: &str, assistant: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(context) = sessions.get_mut(session_id) {
            context.push(Message::user(user), self.max_history);
            context.push(Message::assistant(assistant), self.max_history);
        }
    }

    pub async fn summary(&self, session_id: &str) -> Option<SessionSummary> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(ConversationContext::summary)
    }

    /// Drop every expired session. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        Self::retain_live(&mut sessions, Utc::now(), self.timeout)
    }

    /// Sessions that have not yet expired.
    pub async fn active_count(&self) -> usize {
        self.active_count_at(Utc::now()).await
    }

    pub(crate) async fn active_count_at(&self, now: DateTime<Utc>) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|ctx| !ctx.is_expired_at(now, self.timeout))
            .count()
    }

    fn retain_live(
        sessions: &mut HashMap<String, ConversationContext>,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> usize {
        let before = sessions.len();
        sessions.retain(|_, ctx| !ctx.is_expired_at(now, timeout));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Duration::minutes(30), 10)
    }

    #[tokio::test]
    async fn creates_session_with_generated_id() {
        let store = store();
        let (id, history) = store.get_or_create(None, Language::Es, None).await;
        assert!(Uuid::parse_str(&id).is_ok());
        assert!(history.is_empty());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn history_is_replayed_and_capped() {
        let store = store();
        let (id, _) = store.get_or_create(Some("s1"), Language::En, None).await;
        for i in 0..7 {
            store
                .record_exchange(&id, &format!("q{i}"), &format!("a{i}"))
                .await;
        }

        let (_, history) = store.get_or_create(Some("s1"), Language::En, None).await;
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].content, "q2");
        assert_eq!(history[9].content, "a6");
    }

    #[tokio::test]
    async fn expired_session_is_replaced() {
        let store = store();
        let start = Utc::now();
        store
            .get_or_create_at(Some("s1"), Language::Es, Some("p1"), start)
            .await;
        store.record_exchange("s1", "hola", "buenas").await;

        let later = Utc::now() + Duration::minutes(31);
        let (id, history) = store
            .get_or_create_at(Some("s1"), Language::En, None, later)
            .await;
        assert_eq!(id, "s1");
        assert!(history.is_empty());

        let summary = store.summary("s1").await.unwrap();
        assert_eq!(summary.language, Language::En);
        assert_eq!(summary.patient_id, None);
    }

    #[tokio::test]
    async fn summary_reports_counts() {
        let store = store();
        store
            .get_or_create(Some("s1"), Language::Es, Some("p-9"))
            .await;
        store.record_exchange("s1", "hola", "buenas").await;

        let summary = store.summary("s1").await.unwrap();
        assert_eq!(summary.message_count, 2);
        assert_eq!(summary.patient_id.as_deref(), Some("p-9"));
        assert!(store.summary("missing").await.is_none());
    }

    #[tokio::test]
    async fn purge_drops_only_expired() {
        let store = SessionStore::new(Duration::minutes(30), 10);
        store
            .get_or_create_at(
                Some("old"),
                Language::Es,
                None,
                Utc::now() - Duration::hours(2),
            )
            .await;
        assert_eq!(store.active_count().await, 0);
        assert_eq!(store.purge_expired().await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn opening_a_session_evicts_stale_ones() {
        let store = store();
        let start = Utc::now();
        for id in ["a", "b", "c"] {
            store.get_or_create_at(Some(id), Language::Es, None, start).await;
        }
        assert_eq!(store.len().await, 3);

        let later = start + Duration::minutes(31);
        assert_eq!(store.active_count_at(later).await, 0);

        let (fresh, _) = store.get_or_create_at(None, Language::Es, None, later).await;
        assert_eq!(store.len().await, 1);
        assert!(store.summary(&fresh).await.is_some());
        assert!(store.summary("a").await.is_none());
    }
}
