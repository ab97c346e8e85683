/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum WebmailError {
    /// Network or request execution error from `reqwest` — no response
    /// was received.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Status { status: u16, body: String },
    /// Response body decoding error on an otherwise successful request.
    #[error("decode error: {0}")]
    Decode(String),
}

impl WebmailError {
    /// Status code of a [`WebmailError::Status`] error, `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body of a [`WebmailError::Status`] error, `None` otherwise.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}
