// Energy API HTTP client
//
// Wraps the fetch executor with endpoint URL construction for one device.
// Authentication lives in `auth.rs` as inherent methods on the same type.

use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::executor::{ApiRequest, FetchExecutor};
use crate::models::{CostResponse, HistoryResponse};
use crate::transport::TransportConfig;

/// Raw HTTP client for one device on an energy-telemetry server.
///
/// Endpoint methods take the bearer token explicitly: the caller owns the
/// credential lifecycle and decides what to do on a 401.
#[derive(Debug, Clone)]
pub struct EnergyClient {
    executor: FetchExecutor,
    base_url: Url,
    device_id: String,
    retries: u32,
}

impl EnergyClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the server root (e.g. `http://192.168.1.7:5000`); a
    /// path prefix is kept, so reverse-proxied deployments work too.
    pub fn new(base_url: Url, device_id: String, transport: &TransportConfig) -> Result<Self, Error> {
        let executor = FetchExecutor::new(transport)?;
        Ok(Self {
            executor,
            base_url,
            device_id,
            retries: transport.retries,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        device_id: String,
        transport: &TransportConfig,
    ) -> Self {
        Self {
            executor: FetchExecutor::with_client(http, transport),
            base_url,
            device_id,
            retries: transport.retries,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn executor(&self) -> &FetchExecutor {
        &self.executor
    }

    /// Retry budget applied to every call.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Append path segments to the base URL. Segments are percent-encoded,
    /// so device ids with spaces or slashes stay in one segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Latest raw reading: `GET /api/energy/{device}`.
    ///
    /// Returned untyped; field coercion is the caller's job.
    pub async fn latest_reading(
        &self,
        token: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<Value, Error> {
        let url = self.endpoint(&["api", "energy", &self.device_id])?;
        debug!("GET {url}");
        let request = ApiRequest::get(url).bearer(token);
        self.executor.execute(&request, self.retries, cancel).await
    }

    /// Period-scoped samples and summary:
    /// `GET /energy/history/{device}?period=&date=&aggregation=mean`.
    pub async fn history(
        &self,
        token: &SecretString,
        period: &str,
        date: &str,
        cancel: &CancellationToken,
    ) -> Result<HistoryResponse, Error> {
        let url = self.endpoint(&["energy", "history", &self.device_id])?;
        debug!("GET {url} period={period} date={date}");
        let request = ApiRequest::get(url)
            .bearer(token)
            .query("period", period)
            .query("date", date)
            .query("aggregation", "mean");
        self.get_typed(&request, cancel).await
    }

    /// Time-of-use cost report: `GET /energy/costs/{device}?period=&date=`.
    pub async fn costs(
        &self,
        token: &SecretString,
        period: &str,
        date: &str,
        cancel: &CancellationToken,
    ) -> Result<CostResponse, Error> {
        let url = self.endpoint(&["energy", "costs", &self.device_id])?;
        debug!("GET {url} period={period} date={date}");
        let request = ApiRequest::get(url)
            .bearer(token)
            .query("period", period)
            .query("date", date);
        self.get_typed(&request, cancel).await
    }

    async fn get_typed<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<T, Error> {
        let value = self.executor.execute(request, self.retries, cancel).await?;
        serde_json::from_value(value.clone()).map_err(|e| Error::Deserialization {
            message: format!("{e} (url: {})", request.url()),
            body: value.to_string(),
        })
    }
}
