//! Provider health summary across all known vendors.

use crate::router::ProviderRouter;
use medchat_config::PROVIDER_PRIORITY;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Healthy,
    Unhealthy,
    NotConfigured,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    /// Healthy if at least one provider answered its health check
    pub status: ProviderStatus,
    pub providers: BTreeMap<String, ProviderStatus>,
}

/// Runs health checks against every registered provider.
pub struct ProviderManager {
    router: Arc<ProviderRouter>,
    timeout: Duration,
}

impl ProviderManager {
    pub fn new(router: Arc<ProviderRouter>, timeout: Duration) -> Self {
        Self { router, timeout }
    }

    /// Check all providers concurrently. Unregistered vendors report
    /// `not_configured`.
    pub async fn health_check_all(&self) -> ProviderHealth {
        let checks = PROVIDER_PRIORITY.into_iter().map(|name| async move {
            let Some(provider) = self.router.get(name) else {
                return (name, ProviderStatus::NotConfigured);
            };
            let status = match tokio::time::timeout(self.timeout, provider.health_check()).await {
                Ok(Ok(true)) => ProviderStatus::Healthy,
                Ok(Ok(false)) => ProviderStatus::Unhealthy,
                Ok(Err(e)) => {
                    tracing::warn!(provider = name, error = %e, "Provider health check failed");
                    ProviderStatus::Unhealthy
                }
                Err(_) => {
                    tracing::warn!(provider = name, "Provider health check timed out");
                    ProviderStatus::Unhealthy
                }
            };
            (name, status)
        });

        let providers: BTreeMap<String, ProviderStatus> = futures::future::join_all(checks)
            .await
            .into_iter()
            .map(|(name, status)| (name.to_string(), status))
            .collect();

        let status = if providers.values().any(|s| *s == ProviderStatus::Healthy) {
            ProviderStatus::Healthy
        } else {
            ProviderStatus::Unhealthy
        };

        ProviderHealth { status, providers }
    }
}
