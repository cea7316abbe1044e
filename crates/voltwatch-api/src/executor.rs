// Resilient fetch executor
//
// Executes one JSON-over-HTTP call with a hard per-attempt timeout and a
// bounded retry loop for transient failures. Non-2xx responses are never
// retried here -- the auth-refresh policy lives one layer up in the core.

use std::time::Duration;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// A single outbound request, rebuilt for every attempt.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    url: Url,
    query: Vec<(String, String)>,
    bearer: Option<SecretString>,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            query: Vec::new(),
            bearer: None,
            body: None,
        }
    }

    pub fn post_json(url: Url, body: Value) -> Self {
        Self {
            method: Method::POST,
            url,
            query: Vec::new(),
            bearer: None,
            body: Some(body),
        }
    }

    /// Attach `Authorization: Bearer <token>`.
    pub fn bearer(mut self, token: &SecretString) -> Self {
        self.bearer = Some(token.clone());
        self
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_owned(), value.into()));
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    fn to_builder(&self, http: &reqwest::Client) -> reqwest::RequestBuilder {
        let mut builder = http
            .request(self.method.clone(), self.url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        if let Some(ref token) = self.bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(ref body) = self.body {
            builder = builder.json(body);
        }
        builder
    }
}

/// Runs [`ApiRequest`]s with timeout, retry and cancellation discipline.
///
/// At most `retries + 1` attempts are made. Only transport failures and
/// timeouts are retried, with a fixed `retry_delay` between attempts.
/// Every wait races the caller's [`CancellationToken`].
#[derive(Debug, Clone)]
pub struct FetchExecutor {
    http: reqwest::Client,
    timeout: Duration,
    retry_delay: Duration,
}

impl FetchExecutor {
    /// Build an executor with a fresh `reqwest::Client`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, transport))
    }

    /// Wrap a pre-built `reqwest::Client`, taking timing from `transport`.
    pub fn with_client(http: reqwest::Client, transport: &TransportConfig) -> Self {
        Self {
            http,
            timeout: transport.timeout,
            retry_delay: transport.retry_delay,
        }
    }

    /// Execute `request`, returning the decoded JSON body.
    ///
    /// Exhausting the retry budget yields [`Error::Connectivity`] carrying
    /// the number of attempts made.
    pub async fn execute(
        &self,
        request: &ApiRequest,
        retries: u32,
        cancel: &CancellationToken,
    ) -> Result<Value, Error> {
        let max_attempts = retries.saturating_add(1);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!(method = %request.method, url = %request.url, attempt, "sending request");

            let err = match self.attempt(request, cancel).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => e,
                Err(e) => return Err(e),
            };

            if attempt >= max_attempts {
                warn!(url = %request.url, attempts = attempt, error = %err, "retries exhausted");
                return Err(Error::Connectivity {
                    attempts: attempt,
                    reason: err.to_string(),
                });
            }

            warn!(
                url = %request.url,
                remaining = max_attempts - attempt,
                error = %err,
                "transient failure, retrying"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(self.retry_delay) => {}
            }
        }
    }

    /// One attempt. Dropping the inner future on timeout or cancellation
    /// aborts the in-flight connection.
    async fn attempt(&self, request: &ApiRequest, cancel: &CancellationToken) -> Result<Value, Error> {
        let send = async {
            let resp = request.to_builder(&self.http).send().await?;
            read_json(resp).await
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            res = tokio::time::timeout(self.timeout, send) => match res {
                Ok(inner) => inner,
                Err(_) => Err(Error::Timeout { timeout: self.timeout }),
            },
        }
    }
}

/// Characters of an undecodable body kept in the error message.
const PREVIEW_CHARS: usize = 200;

async fn read_json(resp: reqwest::Response) -> Result<Value, Error> {
    let status = resp.status();
    let body = resp.text().await?;
    trace!(%status, len = body.len(), "response received");

    if !status.is_success() {
        return Err(http_error(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| {
        let preview = body
            .char_indices()
            .nth(PREVIEW_CHARS)
            .map_or(body.as_str(), |(i, _)| &body[..i]);
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })
}

/// Build [`Error::Http`] from an error body, falling back to an empty object.
fn http_error(status: reqwest::StatusCode, body: &str) -> Error {
    let parsed: Value = serde_json::from_str(body).unwrap_or_else(|_| Value::Object(Default::default()));
    let message = ["message", "error"]
        .iter()
        .find_map(|key| parsed.get(key).and_then(Value::as_str))
        .map_or_else(
            || format!("HTTP error! status: {}", status.as_u16()),
            str::to_owned,
        );
    Error::Http {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_prefers_message_field() {
        let err = http_error(
            reqwest::StatusCode::NOT_FOUND,
            r#"{"error":"Not found","message":"no such device"}"#,
        );
        match err {
            Error::Http { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "no such device");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[test]
    fn http_error_falls_back_when_body_is_not_json() {
        let err = http_error(reqwest::StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        match err {
            Error::Http { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "HTTP error! status: 502");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[test]
    fn request_builder_accumulates_query_pairs() {
        let url = Url::parse("http://localhost/energy").expect("valid url");
        let req = ApiRequest::get(url)
            .query("period", "month")
            .query("date", "2025-05");
        assert_eq!(req.query.len(), 2);
        assert_eq!(*req.method(), Method::GET);
        assert!(req.bearer.is_none());
    }
}
