//! `webmail-http` is the API/session layer of a webmail client: a thin
//! async HTTP wrapper over the mail server's REST endpoints, a retry
//! classification policy shared by every call, a persistent session-token
//! store with an explicit invalidation signal, and a cached, deduplicated
//! current-user query.
//!
//! - [`WebmailClient`] — one typed method per endpoint, each carrying its
//!   call-site retry policy
//! - [`classify`] — the shared retry decision function
//! - [`SessionStore`] — owns the token, publishes [`SessionSnapshot`]s
//! - [`SessionQuery`] — the shared "who am I" query

mod client;
mod error;
mod form;
mod options;
mod query;
mod retry;
mod session;
mod types;

pub use client::WebmailClient;
pub use error::WebmailError;
pub use form::{FieldErrors, FormSink};
pub use options::ClientOptions;
pub use query::{QueryState, SessionQuery};
pub use retry::{classify, Decision};
pub use session::{
    FileTokenStorage, MemoryTokenStorage, SessionSnapshot, SessionStore, TokenStorage,
};
pub use types::{Credentials, LoginResponse, Mail, OutgoingMail, Registration, User};

pub type Result<T> = std::result::Result<T, WebmailError>;
