//! Connection layer underneath [`ApiClient`](crate::ApiClient).
//!
//! A [`Transport`] sends one request and returns either a fully read
//! response (any status) or a [`TransportError`]. Retrying and status
//! interpretation happen above this layer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::{Method, Response};

/// One attempt handed to a [`Transport`].
#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub method: Method,
    /// Absolute URL without the query string.
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    /// Already serialized JSON body.
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

/// A network level failure: no response was received.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    timeout: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: true,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.timeout
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            timeout: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

/// Sends requests over some connection context.
///
/// Implementations are shared by every clone of a client and may be called
/// from many tasks at once.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<Response, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: TransportRequest) -> Result<Response, TransportError> {
        (**self).send(request).await
    }
}

/// Default transport backed by one pooled `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an already configured client, e.g. one with custom TLS or proxy settings.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<Response, TransportError> {
        let mut builder = self
            .http
            .request(request.method.into(), &request.url)
            .headers(request.headers)
            .timeout(request.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        // A body that cannot be read counts as a failed attempt.
        let body = response.text().await?;

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
