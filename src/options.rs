/// Configures HTTP timeout and retry pacing.
///
/// How often a failed request is retried is not configurable: the bound is
/// policy, owned by [`crate::classify`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Base retry backoff in milliseconds (exponential strategy).
    pub retry_backoff_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            retry_backoff_ms: 250,
        }
    }
}
