use crate::{Error, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use roulette_types::api::{
    BalanceResponse, ErrorResponse, HistoryResponse, LoginRequest, MessageResponse,
    RegisterRequest, SessionResponse, SpinRequest, SpinResponse, StatsResponse,
    UpdateAccountRequest,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_BALANCE_POLL_INTERVAL: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry behaviour for requests that fail with a transient status or connection error.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Retry POSTs too. Off by default: a retried spin may be settled twice.
    pub retry_non_idempotent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            retry_non_idempotent: false,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Connection settings for [`Client`] and the balance poller.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub retry: RetryPolicy,
    pub balance_poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            balance_poll_interval: DEFAULT_BALANCE_POLL_INTERVAL,
        }
    }
}

impl ClientConfig {
    /// Read `ROULETTE_BASE_URL` and `ROULETTE_BALANCE_POLL_MS`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("ROULETTE_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(raw) = std::env::var("ROULETTE_BALANCE_POLL_MS") {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                Error::InvalidConfig(format!("ROULETTE_BALANCE_POLL_MS={raw} is not a number"))
            })?;
            if millis == 0 {
                return Err(Error::InvalidConfig(
                    "ROULETTE_BALANCE_POLL_MS must be positive".to_string(),
                ));
            }
            config.balance_poll_interval = Duration::from_millis(millis);
        }
        Ok(config)
    }
}

/// HTTP client for the spin service.
///
/// Holds the session token returned by `register`/`login` and attaches it to every
/// authenticated request.
pub struct Client {
    pub(crate) base_url: Url,
    http: reqwest::Client,
    retry: RetryPolicy,
    token: RwLock<Option<String>>,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidScheme(scheme.to_string())),
        }
        // Keep any path prefix when joining endpoint paths
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url,
            http,
            retry: RetryPolicy::default(),
            token: RwLock::new(None),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(&config.base_url)?.with_retry_policy(config.retry.clone()))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reuse an existing session token.
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_token(Some(token.into()));
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_token(&self, token: Option<String>) {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token;
    }

    fn require_token(&self) -> Result<String> {
        self.token().ok_or(Error::NotAuthenticated)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<SessionResponse> {
        let url = self.base_url.join("api/register")?;
        let response = self.post_json_with_retry(url, request).await?;
        let session: SessionResponse = decode(response).await?;
        self.set_token(Some(session.token.clone()));
        debug!(username = %session.username, "registered");
        Ok(session)
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<SessionResponse> {
        let url = self.base_url.join("api/login")?;
        let response = self.post_json_with_retry(url, request).await?;
        let session: SessionResponse = decode(response).await?;
        self.set_token(Some(session.token.clone()));
        debug!(username = %session.username, "logged in");
        Ok(session)
    }

    /// Invalidate the session on the service and forget the token locally.
    pub async fn logout(&self) -> Result<()> {
        self.require_token()?;
        let url = self.base_url.join("api/logout")?;
        let response = self
            .post_json_with_retry(url, &serde_json::json!({}))
            .await?;
        let _: MessageResponse = decode(response).await?;
        self.set_token(None);
        Ok(())
    }

    /// Submit one round of bets for an authoritative spin.
    pub async fn submit_spin(&self, request: &SpinRequest) -> Result<SpinResponse> {
        self.require_token()?;
        let url = self.base_url.join("api/spin")?;
        let response = self.post_json_with_retry(url, request).await?;
        decode(response).await
    }

    pub async fn fetch_balance(&self) -> Result<BalanceResponse> {
        self.require_token()?;
        let url = self.base_url.join("api/balance")?;
        let response = self.get_with_retry(url).await?;
        decode(response).await
    }

    pub async fn change_password(&self, request: &UpdateAccountRequest) -> Result<MessageResponse> {
        self.require_token()?;
        let url = self.base_url.join("api/update-account")?;
        let response = self.post_json_with_retry(url, request).await?;
        decode(response).await
    }

    /// Settled bets, newest first.
    pub async fn history(&self, limit: Option<usize>) -> Result<HistoryResponse> {
        self.require_token()?;
        let mut url = self.base_url.join("api/history")?;
        if let Some(limit) = limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        let response = self.get_with_retry(url).await?;
        decode(response).await
    }

    pub async fn stats(&self) -> Result<StatsResponse> {
        self.require_token()?;
        let url = self.base_url.join("api/stats")?;
        let response = self.get_with_retry(url).await?;
        decode(response).await
    }

    pub(crate) async fn get_with_retry(&self, url: Url) -> Result<Response> {
        self.send_with_retry("GET", &url, true, || {
            self.authorize(self.http.get(url.clone()))
        })
        .await
    }

    pub(crate) async fn post_json_with_retry<T>(&self, url: Url, body: &T) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        let retryable = self.retry.retry_non_idempotent;
        self.send_with_retry("POST", &url, retryable, || {
            self.authorize(self.http.post(url.clone()).json(body))
        })
        .await
    }

    async fn send_with_retry<F>(
        &self,
        method: &'static str,
        url: &Url,
        retryable: bool,
        build: F,
    ) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let max_attempts = if retryable {
            self.retry.max_attempts.max(1)
        } else {
            1
        };
        let mut attempt = 0;
        loop {
            attempt += 1;
            match build().send().await {
                Ok(response)
                    if is_retryable_status(response.status()) && attempt < max_attempts =>
                {
                    debug!(
                        method,
                        url = %url,
                        status = %response.status(),
                        attempt,
                        "retrying request"
                    );
                }
                Ok(response) => return Ok(response),
                Err(err) if is_retryable_error(&err) && attempt < max_attempts => {
                    warn!(method, url = %url, attempt, ?err, "request failed, retrying");
                }
                Err(err) => return Err(err.into()),
            }
            tokio::time::sleep(self.retry.backoff(attempt)).await;
        }
    }
}

/// Decode a JSON body, mapping non-2xx responses to errors.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        return Err(Error::Failed(status));
    }
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(payload) => Err(Error::Rejected {
            status,
            message: payload.error,
        }),
        Err(_) => Err(Error::FailedWithBody { status, body }),
    }
}
