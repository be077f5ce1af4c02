//! `restbase-http` is a reusable async base client for JSON REST APIs.
//!
//! [`ApiClient`] resolves endpoints against a base URL, sends default and
//! authorization headers, retries transport failures with exponential
//! backoff and turns unexpected statuses into typed errors:
//! - [`ApiClient::get`] / [`ApiClient::get_json`]
//! - [`ApiClient::post`], [`ApiClient::put`], [`ApiClient::patch`], [`ApiClient::delete`]
//! - [`ApiClient::send`] for a custom [`RequestSpec`]

mod classify;
mod client;
mod endpoint;
mod error;
mod options;
mod params;
mod transport;
mod types;

pub use client::ApiClient;
pub use error::ApiError;
pub use options::ClientOptions;
pub use params::{QueryParams, RequestSpec};
pub use transport::{ReqwestTransport, Transport, TransportError, TransportRequest};
pub use types::{Expect, Method, Response};

pub type Result<T> = std::result::Result<T, ApiError>;
