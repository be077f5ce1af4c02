use std::time::Duration;

use serde::Serialize;

use crate::{ApiError, Expect, Method};

/// Query string parameters, sent in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams(pub Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one `key=value` pair; repeated keys are kept.
    pub fn push(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.push((key.into(), value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<()> for QueryParams {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for QueryParams {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for QueryParams {
    fn from(pairs: [(K, V); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// A single call: method, endpoint and everything sent with it.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    /// Path relative to the client base URL, or an absolute URL.
    pub endpoint: String,
    pub query: QueryParams,
    /// Serialized JSON body.
    pub body: Option<Vec<u8>>,
    pub expect: Expect,
    /// Overrides the client timeout for this call.
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    /// Creates a request expecting `200 OK`.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            query: QueryParams::default(),
            body: None,
            expect: Expect::Status(200),
            timeout: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Post, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Put, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Patch, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Delete, endpoint)
    }

    pub fn query<Q: Into<QueryParams>>(mut self, query: Q) -> Self {
        self.query = query.into();
        self
    }

    /// Attaches `body` encoded as JSON.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let encoded =
            serde_json::to_vec(body).map_err(|err| ApiError::Encode(err.to_string()))?;
        self.body = Some(encoded);
        Ok(self)
    }

    pub fn expect<E: Into<Expect>>(mut self, expect: E) -> Self {
        self.expect = expect.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
