// ── Session ──
//
// One authenticated conversation with a device's server. Owns the HTTP
// client, the credential manager and the root cancellation token every
// poller and aggregator derives its tokens from.

use std::future::Future;
use std::sync::Arc;

use secrecy::SecretString;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use voltwatch_api::models::{CostResponse, HistoryResponse};
use voltwatch_api::transport::{TlsMode, TransportConfig};
use voltwatch_api::EnergyClient;

use crate::config::{SessionConfig, TlsVerification};
use crate::cost::Tariff;
use crate::credential::{CredentialManager, TokenStore};
use crate::error::CoreError;
use crate::model::Period;

/// Cheaply cloneable handle; clones share credentials and cancellation.
#[derive(Clone, Debug)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    config: SessionConfig,
    client: EnergyClient,
    credentials: CredentialManager,
    cancel: CancellationToken,
}

impl Session {
    /// Build the HTTP client from `config` and bind it to `store`.
    pub fn new(config: SessionConfig, store: Arc<dyn TokenStore>) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let client = EnergyClient::new(config.url.clone(), config.device_id.clone(), &transport)?;
        let credentials = CredentialManager::new(
            client.clone(),
            config.username.clone(),
            config.password.clone(),
            store,
        );
        debug!(url = %config.url, device = %config.device_id, "session created");
        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                client,
                credentials,
                cancel: CancellationToken::new(),
            }),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn device_id(&self) -> &str {
        &self.inner.config.device_id
    }

    pub fn tariff(&self) -> &Tariff {
        &self.inner.config.tariff
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.inner.credentials
    }

    /// Root token; cancelling it stops every poller and query of the session.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    // ── Authorized endpoints ─────────────────────────────────────────

    /// Latest raw reading, unnormalized.
    pub async fn latest_reading(&self, cancel: &CancellationToken) -> Result<Value, CoreError> {
        let client = &self.inner.client;
        self.authorized(cancel, |token| async move { client.latest_reading(&token, cancel).await })
            .await
    }

    pub async fn history(
        &self,
        period: Period,
        date: &str,
        cancel: &CancellationToken,
    ) -> Result<HistoryResponse, CoreError> {
        let client = &self.inner.client;
        let period = period.as_ref();
        self.authorized(cancel, |token| async move {
            client.history(&token, period, date, cancel).await
        })
        .await
    }

    pub async fn costs(
        &self,
        period: Period,
        date: &str,
        cancel: &CancellationToken,
    ) -> Result<CostResponse, CoreError> {
        let client = &self.inner.client;
        let period = period.as_ref();
        self.authorized(cancel, |token| async move {
            client.costs(&token, period, date, cancel).await
        })
        .await
    }

    /// Run `op` with the current token. A rejected token is invalidated
    /// and `op` is retried exactly once with a freshly acquired one; a
    /// second rejection is surfaced (and that token invalidated too).
    async fn authorized<T, F, Fut>(&self, cancel: &CancellationToken, op: F) -> Result<T, CoreError>
    where
        F: Fn(SecretString) -> Fut,
        Fut: Future<Output = Result<T, voltwatch_api::Error>>,
    {
        let credentials = &self.inner.credentials;
        let credential = credentials.ensure(cancel).await?;

        match op(credential.token.clone()).await {
            Err(e) if e.is_auth_expired() => {
                warn!(error = %e, "token rejected, re-authenticating");
                credentials.invalidate_rejected(&credential)?;
                let fresh = credentials.ensure(cancel).await?;
                match op(fresh.token.clone()).await {
                    Err(e) if e.is_auth_expired() => {
                        credentials.invalidate_rejected(&fresh)?;
                        Err(e.into())
                    }
                    other => other.map_err(CoreError::from),
                }
            }
            other => other.map_err(CoreError::from),
        }
    }
}

fn build_transport(config: &SessionConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
        retries: config.retries,
        retry_delay: config.retry_delay,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
