//! Request executor
//!
//! [`ApiClient::request`] performs one logical call: it attaches the bearer
//! token, bounds every attempt with a timer, classifies failures into
//! [`ApiError`] and retries through the shared [`RetryExecutor`].
//!
//! By default only idempotent methods (GET, HEAD, OPTIONS, PUT, DELETE) are
//! retried. POST and PATCH run once unless the caller opts in with
//! [`RequestOptions::retry_non_idempotent`] or supplies its own condition.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shoplink_common::auth::AccessTokenProvider;
use shoplink_common::resilience::policies::PredicateRetry;
use shoplink_common::resilience::{Jitter, RetryConfig, RetryExecutor};
use shoplink_domain::{ApiConfig, ShopLinkError};
use tracing::{debug, info, instrument, warn};

use super::errors::{is_retryable, ApiError};
use crate::http::HttpClient;

/// Caller-supplied retry decision
pub type RetryCondition = Arc<dyn Fn(&ApiError) -> bool + Send + Sync>;

/// Reaction to a response that reports an expired session
#[async_trait]
pub trait AuthExpiredHandler: Send + Sync {
    async fn on_auth_expired(&self, error: &ApiError);
}

/// Default handler: log and do nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuthExpired;

#[async_trait]
impl AuthExpiredHandler for LogAuthExpired {
    async fn on_auth_expired(&self, error: &ApiError) {
        warn!(status = ?error.status(), code = ?error.code(), "Authentication expired");
    }
}

/// Drops all auth state through the token provider
pub struct ClearTokensOnExpiry {
    provider: Arc<dyn AccessTokenProvider>,
}

impl ClearTokensOnExpiry {
    pub fn new(provider: Arc<dyn AccessTokenProvider>) -> Self {
        Self { provider }
    }
}

impl fmt::Debug for ClearTokensOnExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClearTokensOnExpiry").finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthExpiredHandler for ClearTokensOnExpiry {
    async fn on_auth_expired(&self, error: &ApiError) {
        info!(status = ?error.status(), "Authentication expired; clearing tokens");
        if let Err(e) = self.provider.invalidate().await {
            warn!(error = %e, "Failed to clear tokens after auth expiry");
        }
    }
}

/// Per-call options for [`ApiClient::request`]
#[derive(Clone)]
pub struct RequestOptions {
    method: Method,
    body: Option<Value>,
    headers: Vec<(String, String)>,
    enable_retry: bool,
    timeout: Option<Duration>,
    retry_condition: Option<RetryCondition>,
    retry_non_idempotent: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("method", &self.method)
            .field("has_body", &self.body.is_some())
            .field("headers", &self.headers.len())
            .field("enable_retry", &self.enable_retry)
            .field("timeout", &self.timeout)
            .field("custom_retry_condition", &self.retry_condition.is_some())
            .field("retry_non_idempotent", &self.retry_non_idempotent)
            .finish()
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            headers: Vec::new(),
            enable_retry: true,
            timeout: None,
            retry_condition: None,
            retry_non_idempotent: false,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Serialize `body` as the JSON request body.
    ///
    /// # Errors
    /// Returns an `INVALID_REQUEST` error if `body` cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| {
            ApiError::invalid_request(format!("Failed to serialize request body: {e}"))
        })?;
        self.body = Some(value);
        Ok(self)
    }

    /// Add a header. Caller headers override the defaults.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Per-attempt timeout for this call only.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_retry(mut self) -> Self {
        self.enable_retry = false;
        self
    }

    /// Replace the default retry decision.
    pub fn retry_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&ApiError) -> bool + Send + Sync + 'static,
    {
        self.retry_condition = Some(Arc::new(condition));
        self
    }

    /// Let POST and PATCH retry under the default condition.
    pub fn retry_non_idempotent(mut self) -> Self {
        self.retry_non_idempotent = true;
        self
    }
}

fn is_idempotent(method: &Method) -> bool {
    [Method::GET, Method::HEAD, Method::OPTIONS, Method::PUT, Method::DELETE].contains(method)
}

/// Authenticated JSON client for the ShopLink backend
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
    retry: RetryConfig,
    auth: Arc<dyn AccessTokenProvider>,
    on_auth_expired: Arc<dyn AuthExpiredHandler>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client with the default HTTP transport and auth-expiry handler.
    ///
    /// # Errors
    /// Returns `ShopLinkError::Config` if `config` does not validate or the
    /// transport cannot be built.
    pub fn new(
        config: &ApiConfig,
        auth: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, ShopLinkError> {
        Self::builder().config(config.clone()).auth(auth).build()
    }

    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Perform one logical call and decode the JSON response.
    ///
    /// Empty and 204/205 responses decode from JSON `null`, so `()` and
    /// `Option<T>` work as response types.
    ///
    /// # Errors
    /// Returns the [`ApiError`] of the final attempt.
    #[instrument(
        skip(self, path, options),
        fields(method = %options.method, path = tracing::field::Empty)
    )]
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let url = self.resolve_url(path)?;
        // Query strings can carry reset or verification tokens
        tracing::Span::current().record("path", url.path());
        let headers = parse_headers(&options.headers)?;
        let timeout = options.timeout.unwrap_or(self.timeout);

        let method = &options.method;
        let body = options.body.as_ref();
        let (url, headers) = (&url, &headers);
        let attempt = move || self.attempt::<T>(method, url, body, headers, timeout);

        if !options.enable_retry {
            return attempt().await;
        }

        let condition = self.retry_condition(&options);
        let policy = PredicateRetry::new(move |error: &ApiError| condition(error));
        RetryExecutor::new(self.retry.clone(), policy).execute(attempt).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(path, RequestOptions::new(Method::GET)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(path, RequestOptions::new(Method::POST).json(body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(path, RequestOptions::new(Method::PUT).json(body)?).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(path, RequestOptions::new(Method::PATCH).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(path, RequestOptions::new(Method::DELETE)).await
    }

    fn resolve_url(&self, path: &str) -> Result<Url, ApiError> {
        let full = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.is_empty() || path.starts_with('/') || path.starts_with('?') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        };
        Url::parse(&full)
            .map_err(|e| ApiError::invalid_request(format!("Invalid request URL '{full}': {e}")))
    }

    fn retry_condition(&self, options: &RequestOptions) -> RetryCondition {
        if let Some(condition) = &options.retry_condition {
            return Arc::clone(condition);
        }
        if options.retry_non_idempotent || is_idempotent(&options.method) {
            return Arc::new(is_retryable);
        }
        Arc::new(|_: &ApiError| false)
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&Value>,
        extra_headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.auth.access_token().await {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                ApiError::invalid_request("Access token is not a valid header value")
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        for (name, value) in extra_headers {
            headers.insert(name.clone(), value.clone());
        }

        let mut builder = self.http.request(method.clone(), url.clone()).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body.to_string());
        }

        let exchange = async {
            let response = self.http.send(builder).await?;
            self.handle_response(response).await
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                debug!(timeout_ms = timeout.as_millis(), "Request attempt timed out");
                Err(ApiError::timeout())
            }
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            let body = serde_json::from_str::<Value>(&text)
                .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
            let error = ApiError::from_response(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                &body,
            );
            if error.is_auth_expired() {
                self.on_auth_expired.on_auth_expired(&error).await;
            }
            return Err(error);
        }

        decode_body(status, &text)
    }
}

fn decode_body<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T, ApiError> {
    let empty = status == StatusCode::NO_CONTENT
        || status == StatusCode::RESET_CONTENT
        || text.trim().is_empty();
    let parsed =
        if empty { serde_json::from_value(Value::Null) } else { serde_json::from_str(text) };
    parsed.map_err(|e| {
        ApiError::malformed(status.as_u16(), format!("Failed to parse response body: {e}"))
    })
}

fn parse_headers(headers: &[(String, String)]) -> Result<HeaderMap, ApiError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ApiError::invalid_request(format!("Invalid header name '{name}'")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ApiError::invalid_request(format!("Invalid value for header '{name}'")))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiConfig>,
    auth: Option<Arc<dyn AccessTokenProvider>>,
    on_auth_expired: Option<Arc<dyn AuthExpiredHandler>>,
    http: Option<HttpClient>,
    jitter: Option<Jitter>,
}

impl ApiClientBuilder {
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn auth(mut self, auth: Arc<dyn AccessTokenProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn on_auth_expired(mut self, handler: Arc<dyn AuthExpiredHandler>) -> Self {
        self.on_auth_expired = Some(handler);
        self
    }

    pub fn http_client(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    pub fn retry_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// # Errors
    /// Returns `ShopLinkError::Config` when no token provider was given, the
    /// API config is invalid, or the transport cannot be built.
    pub fn build(self) -> Result<ApiClient, ShopLinkError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let auth = self
            .auth
            .ok_or_else(|| ShopLinkError::Config("ApiClient requires a token provider".into()))?;
        let http = match self.http {
            Some(http) => http,
            None => HttpClient::new()?,
        };
        let retry = RetryConfig {
            max_retries: config.retry_attempts,
            base_delay: config.retry_delay,
            max_delay: config.max_retry_delay,
            jitter: self.jitter.unwrap_or_default(),
        };

        debug!(
            base_url = %config.base_url,
            timeout_ms = config.timeout.as_millis(),
            max_retries = retry.max_retries,
            "API client created"
        );

        Ok(ApiClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            retry,
            auth,
            on_auth_expired: self.on_auth_expired.unwrap_or_else(|| Arc::new(LogAuthExpired)),
        })
    }
}
