use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::sleep;

use crate::{
    classify::classify_response,
    endpoint::{join_url, normalize_base_url},
    transport::{ReqwestTransport, Transport, TransportError, TransportRequest},
    ApiError, ClientOptions, Expect, QueryParams, RequestSpec, Response, Result,
};

#[derive(Clone)]
/// Base client for a JSON REST API.
///
/// Clones share the connection pool and the authorization header.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    default_headers: HeaderMap,
    authorization: Arc<RwLock<Option<HeaderValue>>>,
    options: ClientOptions,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let authorization = self.current_authorization().map(|_| "<redacted>");
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .field("authorization", &authorization)
            .field("options", &self.options)
            .finish()
    }
}

impl ApiClient {
    /// Creates a client for `base_url` using a pooled reqwest transport.
    ///
    /// Trailing slashes on the base URL are removed.
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self::with_transport(base_url, ReqwestTransport::new())
    }

    /// Creates a client that sends every request through `transport`.
    pub fn with_transport(base_url: impl AsRef<str>, transport: impl Transport + 'static) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        default_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        Self {
            transport: Arc::new(transport),
            base_url: normalize_base_url(base_url.as_ref()),
            default_headers,
            authorization: Arc::new(RwLock::new(None)),
            options: ClientOptions::default(),
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `RESTBASE_BASE_URL`: API base URL (required)
    /// - `RESTBASE_TOKEN`: bearer token (optional)
    pub fn from_env() -> std::result::Result<Self, String> {
        let base_url = std::env::var("RESTBASE_BASE_URL")
            .map_err(|_| "missing RESTBASE_BASE_URL environment variable".to_owned())?;
        if base_url.trim().is_empty() {
            return Err("RESTBASE_BASE_URL is set but empty".to_owned());
        }
        let client = Self::new(base_url);
        if let Ok(token) = std::env::var("RESTBASE_TOKEN") {
            if !token.trim().is_empty() {
                client
                    .set_bearer_token(token.trim())
                    .map_err(|err| format!("RESTBASE_TOKEN is not usable: {err}"))?;
            }
        }
        Ok(client)
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Adds or replaces a header sent on every request.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_ref().as_bytes())
            .map_err(|err| ApiError::InvalidHeader(format!("{}: {err}", name.as_ref())))?;
        let mut value = HeaderValue::from_str(value.as_ref())
            .map_err(|err| ApiError::InvalidHeader(format!("{name}: {err}")))?;
        if is_credential_header(&name) {
            value.set_sensitive(true);
        }
        self.default_headers.insert(name, value);
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Resolves `endpoint` against the base URL.
    pub fn url_for(&self, endpoint: &str) -> String {
        join_url(&self.base_url, endpoint)
    }

    /// Sends `Authorization: <scheme> <token>` on every later request.
    ///
    /// Calling it again replaces the value; requests already in flight keep
    /// the header they were built with. Concurrent updates are last-writer-wins.
    pub fn set_auth_header(&self, token: &str, scheme: &str) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("{scheme} {token}"))
            .map_err(|err| ApiError::InvalidHeader(format!("authorization: {err}")))?;
        value.set_sensitive(true);
        *self
            .authorization
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(value);
        Ok(())
    }

    /// Shorthand for [`ApiClient::set_auth_header`] with the `Bearer` scheme.
    pub fn set_bearer_token(&self, token: &str) -> Result<()> {
        self.set_auth_header(token, "Bearer")
    }

    pub fn clear_auth_header(&self) {
        *self
            .authorization
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Sends a GET request and checks the status against `expect`.
    ///
    /// Pass `200` for the usual case, a set such as `[200, 204]`, or
    /// [`Expect::Any`] to reject only statuses `>= 400`.
    pub async fn get<Q, E>(&self, endpoint: &str, query: Q, expect: E) -> Result<Response>
    where
        Q: Into<QueryParams>,
        E: Into<Expect>,
    {
        self.send(RequestSpec::get(endpoint).query(query).expect(expect))
            .await
    }

    /// Sends a GET request and decodes the JSON body.
    ///
    /// A body that is not valid JSON for `T` yields [`ApiError::Decode`].
    pub async fn get_json<T, Q, E>(&self, endpoint: &str, query: Q, expect: E) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Into<QueryParams>,
        E: Into<Expect>,
    {
        self.get(endpoint, query, expect).await?.json()
    }

    /// Sends a POST request with a JSON body.
    pub async fn post<B, E>(&self, endpoint: &str, body: &B, expect: E) -> Result<Response>
    where
        B: Serialize + ?Sized,
        E: Into<Expect>,
    {
        self.send(RequestSpec::post(endpoint).json(body)?.expect(expect))
            .await
    }

    pub async fn put<B, E>(&self, endpoint: &str, body: &B, expect: E) -> Result<Response>
    where
        B: Serialize + ?Sized,
        E: Into<Expect>,
    {
        self.send(RequestSpec::put(endpoint).json(body)?.expect(expect))
            .await
    }

    pub async fn patch<B, E>(&self, endpoint: &str, body: &B, expect: E) -> Result<Response>
    where
        B: Serialize + ?Sized,
        E: Into<Expect>,
    {
        self.send(RequestSpec::patch(endpoint).json(body)?.expect(expect))
            .await
    }

    pub async fn delete<E: Into<Expect>>(&self, endpoint: &str, expect: E) -> Result<Response> {
        self.send(RequestSpec::delete(endpoint).expect(expect)).await
    }

    /// Executes `spec` with retry and checks the status against `spec.expect`.
    pub async fn send(&self, spec: RequestSpec) -> Result<Response> {
        let request = TransportRequest {
            method: spec.method,
            url: self.url_for(&spec.endpoint),
            headers: self.request_headers()?,
            query: spec.query.0,
            body: spec.body,
            timeout: spec
                .timeout
                .unwrap_or_else(|| Duration::from_millis(self.options.timeout_ms)),
        };
        let response = self.send_with_retry(request).await?;
        classify_response(response, &spec.expect)
    }

    /// Like [`ApiClient::send`], then decodes the JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<T> {
        self.send(spec).await?.json()
    }

    fn current_authorization(&self) -> Option<HeaderValue> {
        self.authorization
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn request_headers(&self) -> Result<HeaderMap> {
        let user_agent = HeaderValue::from_str(&self.options.user_agent)
            .map_err(|err| ApiError::InvalidHeader(format!("user-agent: {err}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, user_agent);
        for (name, value) in &self.default_headers {
            headers.insert(name.clone(), value.clone());
        }
        if let Some(authorization) = self.current_authorization() {
            headers.insert(header::AUTHORIZATION, authorization);
        }
        Ok(headers)
    }

    /// Runs up to `max_retries + 1` attempts, returning the first response
    /// of any status. Only transport failures are retried.
    async fn send_with_retry(&self, request: TransportRequest) -> Result<Response> {
        let mut attempt = 0usize;
        loop {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                method = %request.method,
                url = %request.url,
                attempt,
                "sending request"
            );

            match self.transport.send(request.clone()).await {
                Ok(response) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        method = %request.method,
                        url = %request.url,
                        attempt,
                        status = response.status,
                        "received response"
                    );
                    return Ok(response);
                }
                Err(err) => {
                    if attempt < self.options.max_retries {
                        self.wait_before_retry(attempt, &request, &err).await;
                        attempt += 1;
                        continue;
                    }

                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        method = %request.method,
                        url = %request.url,
                        attempt,
                        error = %err,
                        "request failed, retries exhausted"
                    );
                    return Err(ApiError::TransportExhausted {
                        attempts: attempt + 1,
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    async fn wait_before_retry(
        &self,
        attempt: usize,
        request: &TransportRequest,
        err: &TransportError,
    ) {
        let delay = backoff_delay(self.options.retry_backoff_ms, attempt);

        #[cfg(feature = "tracing")]
        tracing::warn!(
            method = %request.method,
            url = %request.url,
            attempt,
            error = %err,
            timeout = err.is_timeout(),
            delay_ms = delay.as_millis() as u64,
            "request attempt failed, retrying"
        );
        #[cfg(not(feature = "tracing"))]
        let _ = (request, err);

        sleep(delay).await;
    }
}

/// Headers whose values are hidden from `Debug` output.
fn is_credential_header(name: &HeaderName) -> bool {
    *name == header::AUTHORIZATION
        || *name == header::PROXY_AUTHORIZATION
        || *name == header::COOKIE
}

/// `unit_ms * 2^attempt`, saturating instead of overflowing.
fn backoff_delay(unit_ms: u64, attempt: usize) -> Duration {
    let multiplier = u32::try_from(attempt)
        .ok()
        .and_then(|exp| 1u64.checked_shl(exp))
        .unwrap_or(u64::MAX);
    Duration::from_millis(unit_ms.saturating_mul(multiplier))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::header;

    use super::{backoff_delay, ApiClient};
    use crate::{ApiError, ClientOptions};

    #[test]
    fn backoff_doubles_per_attempt() {
        let delays: Vec<_> = (0..4).map(|attempt| backoff_delay(1_000, attempt)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
    }

    #[test]
    fn backoff_saturates() {
        assert_eq!(backoff_delay(1_000, 200), Duration::from_millis(u64::MAX));
        assert_eq!(backoff_delay(0, 5), Duration::ZERO);
    }

    #[test]
    fn base_url_trailing_slash_removed() {
        let client = ApiClient::new("https://api.example.com/v1/");
        assert_eq!(client.base_url(), "https://api.example.com/v1");
        assert_eq!(client.url_for("/users"), "https://api.example.com/v1/users");
    }

    #[test]
    fn default_headers_are_sent() {
        let client = ApiClient::new("https://api.example.com");
        let headers = client.request_headers().expect("headers must build");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::ACCEPT], "application/json");
        assert!(headers[header::USER_AGENT]
            .to_str()
            .expect("ascii user agent")
            .starts_with("restbase-http/"));
        assert!(headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn auth_header_set_replaced_and_cleared() {
        let client = ApiClient::new("https://api.example.com");
        client.set_auth_header("abc", "Token").expect("valid header");
        assert_eq!(
            client.request_headers().expect("headers")[header::AUTHORIZATION],
            "Token abc"
        );

        client.set_bearer_token("def").expect("valid header");
        assert_eq!(
            client.request_headers().expect("headers")[header::AUTHORIZATION],
            "Bearer def"
        );

        client.clear_auth_header();
        assert!(client
            .request_headers()
            .expect("headers")
            .get(header::AUTHORIZATION)
            .is_none());
    }

    #[test]
    fn clones_share_authorization() {
        let client = ApiClient::new("https://api.example.com");
        let clone = client.clone();
        client.set_bearer_token("shared").expect("valid header");
        assert_eq!(
            clone.request_headers().expect("headers")[header::AUTHORIZATION],
            "Bearer shared"
        );
    }

    #[test]
    fn invalid_auth_header_rejected() {
        let client = ApiClient::new("https://api.example.com");
        let err = client
            .set_bearer_token("bad\ntoken")
            .expect_err("must reject newline");
        assert!(matches!(err, ApiError::InvalidHeader(_)));
    }

    #[test]
    fn custom_header_overrides_default() {
        let client = ApiClient::new("https://api.example.com")
            .with_header("accept", "text/plain")
            .expect("valid header")
            .with_header("X-Request-Source", "tests")
            .expect("valid header");
        let headers = client.request_headers().expect("headers");
        assert_eq!(headers[header::ACCEPT], "text/plain");
        assert_eq!(headers["x-request-source"], "tests");
    }

    #[test]
    fn invalid_user_agent_is_reported() {
        let client = ApiClient::new("https://api.example.com").with_options(ClientOptions {
            user_agent: "bad\r\nagent".to_owned(),
            ..ClientOptions::default()
        });
        assert!(matches!(
            client.request_headers(),
            Err(ApiError::InvalidHeader(_))
        ));
    }

    #[test]
    fn debug_redacts_authorization_set_as_default_header() {
        let client = ApiClient::new("https://api.example.com")
            .with_header("Authorization", "Bearer s3cret")
            .expect("valid header")
            .with_header("X-Trace", "visible")
            .expect("valid header");
        let debug = format!("{client:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("visible"));

        let headers = client.request_headers().expect("headers");
        assert_eq!(headers[header::AUTHORIZATION], "Bearer s3cret");
        assert!(headers[header::AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let client = ApiClient::new("https://api.example.com");
        client.set_bearer_token("secret-token").expect("valid header");
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }
}
