use crate::WebmailError;

/// Retry bound applied to server faults and unclassified failures.
const MAX_ATTEMPTS: u32 = 3;

/// Outcome of a call site's domain handler.
///
/// Replaces the looser "boolean or no answer" protocol: a handler either
/// recognizes the error and makes the final call, or explicitly has no
/// opinion and leaves the decision to the fallback policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    /// The handler recognized the error code and decided. A
    /// `retry: false` result is expected to have already applied its
    /// caller-visible side effect (field error, session invalidation).
    Handled {
        /// Whether the caller should re-issue the request.
        retry: bool,
    },
    /// The error code means nothing to this call site.
    Unhandled,
}

/// Decides whether a failed request should be re-issued.
///
/// Decision order, first match wins:
/// 1. transport errors (no response received) are assumed transient and
///    always retried
/// 2. 500 gets a bounded retry: `attempt < 3`
/// 3. 504 gateway timeouts are retried without bound
/// 4. anything else is offered to the call site's [`Decision`] handler
/// 5. errors the handler leaves [`Decision::Unhandled`] fall back to the
///    bounded retry, with a diagnostic trace
///
/// Centralizing 1–3 and 5 means a call site only encodes the status codes
/// that are meaningful to it. The classifier never performs the retry
/// itself; scheduling and backoff belong to the caller.
pub fn classify<H>(attempt: u32, error: &WebmailError, handler: &mut H) -> bool
where
    H: FnMut(u32, &WebmailError) -> Decision,
{
    match error {
        WebmailError::Transport(_) => true,
        WebmailError::Status { status: 500, .. } => attempt < MAX_ATTEMPTS,
        WebmailError::Status { status: 504, .. } => true,
        _ => match handler(attempt, error) {
            Decision::Handled { retry } => retry,
            Decision::Unhandled => {
                tracing::warn!(attempt, %error, "unclassified request failure");
                attempt < MAX_ATTEMPTS
            }
        },
    }
}
