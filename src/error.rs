use crate::Expect;

/// Error type returned by this crate.
///
/// Once a request reaches the transport, it yields either a usable value or
/// exactly one of [`ApiError::TransportExhausted`], [`ApiError::UnexpectedStatus`]
/// or [`ApiError::Decode`]. Only `TransportExhausted` is produced after
/// retrying; a received response is never retried regardless of its status.
///
/// [`ApiError::Encode`] and [`ApiError::InvalidHeader`] are setup errors: they
/// are raised while building the request (body serialization, header
/// validation) and mean no transport call was made.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Every attempt failed before a response was received.
    #[error("request failed after {attempts} attempts: {message}")]
    TransportExhausted {
        /// Number of transport invocations made (`max_retries + 1`).
        attempts: usize,
        /// Message of the last transport failure.
        message: String,
    },
    /// A response was received but its status did not satisfy the expectation.
    #[error("unexpected status: expected {expected}, got {status}: {body}")]
    UnexpectedStatus {
        status: u16,
        expected: Expect,
        body: String,
    },
    /// The response was accepted but its body could not be decoded.
    #[error("decode error (status {status}): {message}")]
    Decode {
        status: u16,
        message: String,
        body: String,
    },
    /// The request body could not be serialized to JSON.
    #[error("encode error: {0}")]
    Encode(String),
    /// A configured header name or value is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

impl ApiError {
    /// HTTP status of the received response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } | Self::Decode { status, .. } => Some(*status),
            Self::TransportExhausted { .. } | Self::Encode(_) | Self::InvalidHeader(_) => None,
        }
    }

    /// Raw response body kept for diagnostics, if a response was received.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::UnexpectedStatus { body, .. } | Self::Decode { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns `true` for errors raised before any transport call.
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Encode(_) | Self::InvalidHeader(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::TransportExhausted { .. })
    }
}
