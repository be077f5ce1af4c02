use std::fmt;

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::ApiError;

/// HTTP method of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
        }
    }
}

/// Which status codes count as success for a call.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Expect {
    /// No explicit expectation; only statuses `>= 400` are errors.
    #[default]
    Any,
    /// Exactly this status is accepted.
    Status(u16),
    /// Any status in the set is accepted. An empty set behaves like
    /// [`Expect::Any`].
    OneOf(Vec<u16>),
}

impl Expect {
    /// Returns `true` if `status` satisfies the explicit part of the
    /// expectation. [`Expect::Any`] accepts every status.
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            Self::Any => true,
            Self::Status(code) => *code == status,
            Self::OneOf(codes) => codes.is_empty() || codes.contains(&status),
        }
    }
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any status < 400"),
            Self::OneOf(codes) if codes.is_empty() => f.write_str("any status < 400"),
            Self::Status(code) => write!(f, "{code}"),
            Self::OneOf(codes) => {
                f.write_str("one of [")?;
                for (index, code) in codes.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{code}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<u16> for Expect {
    fn from(code: u16) -> Self {
        Self::Status(code)
    }
}

impl From<Vec<u16>> for Expect {
    fn from(codes: Vec<u16>) -> Self {
        Self::OneOf(codes)
    }
}

impl<const N: usize> From<[u16; N]> for Expect {
    fn from(codes: [u16; N]) -> Self {
        Self::OneOf(codes.into())
    }
}

impl From<Option<u16>> for Expect {
    fn from(code: Option<u16>) -> Self {
        code.map_or(Self::Any, Self::Status)
    }
}

/// A fully received HTTP response.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl Response {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns a header value by case-insensitive name, if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// Decodes the body as JSON.
    ///
    /// Failures are reported as [`ApiError::Decode`] carrying this
    /// response's status, never as a status error.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|err| ApiError::Decode {
            status: self.status,
            message: format!("invalid JSON response body: {err}"),
            body: self.body.clone(),
        })
    }
}
