// Bearer-token authentication
//
// Exchanges fixed client credentials for a token at the login endpoint.
// Persistence and single-flight acquisition live in the core's
// credential manager; this module only speaks the wire protocol.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::EnergyClient;
use crate::error::Error;
use crate::executor::ApiRequest;
use crate::models::LoginResponse;

/// A bearer token and the moment it was issued to us.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: SecretString,
    pub acquired_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            acquired_at: Utc::now(),
        }
    }
}

impl EnergyClient {
    /// Authenticate with username/password: `POST /api/auth/login`.
    ///
    /// Any non-2xx answer, or a 2xx answer without a `token`, is an
    /// [`Error::Authentication`]. Transient failures are retried by the
    /// executor like any other call.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<Credential, Error> {
        let url = self.endpoint(&["api", "auth", "login"])?;
        debug!("logging in at {}", url);

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let value = self
            .executor()
            .execute(&ApiRequest::post_json(url, body), self.retries(), cancel)
            .await
            .map_err(|e| match e {
                Error::Http { status, message } => Error::Authentication {
                    message: format!("login failed (HTTP {status}): {message}"),
                },
                other => other,
            })?;

        let resp: LoginResponse =
            serde_json::from_value(value).map_err(|e| Error::Authentication {
                message: format!("unexpected login response: {e}"),
            })?;

        let token = resp
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Authentication {
                message: "login response did not contain a token".into(),
            })?;

        debug!("login successful");
        Ok(Credential::new(token))
    }
}
