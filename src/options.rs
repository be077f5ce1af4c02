/// Configures HTTP timeout, retry behavior and client identity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Backoff unit in milliseconds; attempt `k` waits `retry_backoff_ms * 2^k`.
    pub retry_backoff_ms: u64,
    /// Value of the `User-Agent` header sent on every request.
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 3,
            retry_backoff_ms: 1_000,
            user_agent: concat!("restbase-http/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}
