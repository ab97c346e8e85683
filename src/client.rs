use std::fmt;
use std::time::Duration;

use reqwest::{header, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;

use crate::{
    retry::{classify, Decision},
    types::ConflictBody,
    ClientOptions, Credentials, FormSink, LoginResponse, Mail, OutgoingMail, Registration, Result,
    SessionStore, User, WebmailError,
};

#[derive(Clone)]
/// HTTP client for the webmail REST API.
///
/// Every request resolves the current token from the shared [`SessionStore`]
/// and attaches it verbatim as the `Authorization` header; with no token the
/// request goes out unauthenticated and failures surface as the server's 401.
///
/// Each operation carries its own domain policy for terminal client errors
/// (see [`crate::classify`]); transport and server faults are retried
/// uniformly, with exponential backoff, before the error is returned.
///
/// Cloning is cheap; clones share the session store.
pub struct WebmailClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
    options: ClientOptions,
}

impl fmt::Debug for WebmailClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebmailClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .field("options", &self.options)
            .finish()
    }
}

impl WebmailClient {
    /// Creates a client against `base_url` with an empty in-memory session.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_session(base_url, SessionStore::in_memory())
    }

    /// Creates a client sharing an existing session store, typically one
    /// backed by [`crate::FileTokenStorage`] so the session survives a
    /// restart.
    pub fn with_session(base_url: impl Into<String>, session: SessionStore) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            session,
            options: ClientOptions::default(),
        }
    }

    /// Applies client options such as timeout and retry backoff.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// The session store this client attaches tokens from.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Authenticates with `POST /login` and stores the returned token in
    /// the session.
    ///
    /// Terminal client errors mark a form field and are not retried:
    /// 400 → `username`, 401 → `password`, 404 → `username`.
    pub async fn login(&self, credentials: &Credentials, form: &dyn FormSink) -> Result<()> {
        tracing::debug!(username = %credentials.username, "login");
        let body = self
            .send(Method::POST, "/login", Some(credentials), |_, error| {
                match error.status() {
                    Some(400) => {
                        form.set_field_error("username", "Bad input, unexpected error");
                        Decision::Handled { retry: false }
                    }
                    Some(401) => {
                        form.set_field_error("password", "Incorrect password");
                        Decision::Handled { retry: false }
                    }
                    Some(404) => {
                        form.set_field_error("username", "User not found");
                        Decision::Handled { retry: false }
                    }
                    _ => Decision::Unhandled,
                }
            })
            .await?;
        let response: LoginResponse = decode(&body)?;
        self.session.set_token(&response.jwt);
        Ok(())
    }

    /// Creates an account with `POST /user` and returns the created user.
    /// The session is left untouched; the caller is expected to log in next.
    ///
    /// Terminal client errors mark a form field and are not retried:
    /// 400 → `username`; 409 → the field named in the response body
    /// (default `username`) with the server-supplied message (default
    /// "Unknown error").
    pub async fn register(&self, registration: &Registration, form: &dyn FormSink) -> Result<User> {
        tracing::debug!(username = %registration.username, "register");
        let body = self
            .send(Method::POST, "/user", Some(registration), |_, error| {
                match error.status() {
                    Some(400) => {
                        form.set_field_error("username", "Bad input, unexpected error");
                        Decision::Handled { retry: false }
                    }
                    Some(409) => {
                        let conflict: ConflictBody = error
                            .body()
                            .and_then(|body| serde_json::from_str(body).ok())
                            .unwrap_or_default();
                        form.set_field_error(
                            conflict.field.as_deref().unwrap_or("username"),
                            conflict.error.as_deref().unwrap_or("Unknown error"),
                        );
                        Decision::Handled { retry: false }
                    }
                    _ => Decision::Unhandled,
                }
            })
            .await?;
        decode(&body)
    }

    /// Fetches the logged-in user via `GET /me`.
    ///
    /// A terminal 401 invalidates the session. Most callers want this
    /// through [`crate::SessionQuery`], which caches and deduplicates it.
    pub async fn me(&self) -> Result<User> {
        tracing::debug!("me");
        let body = self
            .send(Method::GET, "/me", None::<&()>, self.expire_session())
            .await?;
        decode(&body)
    }

    /// Lists all users via `GET /users`. A terminal 401 invalidates the
    /// session.
    pub async fn users(&self) -> Result<Vec<User>> {
        tracing::debug!("users");
        let body = self
            .send(Method::GET, "/users", None::<&()>, self.expire_session())
            .await?;
        decode(&body)
    }

    /// Queues a mail for delivery via `POST /mail`.
    ///
    /// Terminal client errors mark a form field and are not retried:
    /// 400 → `username`, the generic bad-input field shared by every form
    /// policy here. The 500 arm below is shadowed by the classifier's
    /// bounded server-fault retry; it stays so the compose policy lists
    /// every code the endpoint is documented to return.
    pub async fn send_mail(&self, mail: &OutgoingMail, form: &dyn FormSink) -> Result<()> {
        tracing::debug!(to = %mail.to, "send_mail");
        self.send(Method::POST, "/mail", Some(mail), |_, error| {
            match error.status() {
                Some(400) => {
                    form.set_field_error("username", "Bad input, unexpected error");
                    Decision::Handled { retry: false }
                }
                Some(500) => {
                    form.set_field_error("to", "Unknown error");
                    Decision::Handled { retry: false }
                }
                _ => Decision::Unhandled,
            }
        })
        .await?;
        Ok(())
    }

    /// Lists sent mail via `GET /mails`. A terminal 401 invalidates the
    /// session.
    pub async fn mails(&self) -> Result<Vec<Mail>> {
        tracing::debug!("mails");
        let body = self
            .send(Method::GET, "/mails", None::<&()>, self.expire_session())
            .await?;
        decode(&body)
    }

    /// Ends the session: clears the stored token and publishes the
    /// invalidation snapshot. Purely local, no request is made.
    pub fn logout(&self) {
        tracing::debug!("logout");
        self.session.invalidate();
    }

    /// Domain policy shared by the authenticated queries: a 401 means the
    /// session expired, so invalidate it and stop.
    fn expire_session(&self) -> impl FnMut(u32, &WebmailError) -> Decision + '_ {
        move |_, error| match error.status() {
            Some(401) => {
                tracing::debug!("unauthorized response, invalidating session");
                self.session.invalidate();
                Decision::Handled { retry: false }
            }
            _ => Decision::Unhandled,
        }
    }

    /// Sends one logical request, re-issuing it while the classifier says
    /// to retry. Returns the raw body of the first successful response.
    async fn send<B, H>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        mut handler: H,
    ) -> Result<String>
    where
        B: Serialize + ?Sized,
        H: FnMut(u32, &WebmailError) -> Decision,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0u32;
        loop {
            // The token is re-read on every attempt: a retry is a fresh
            // request and must observe session writes made in the meantime.
            let mut request = self
                .http
                .request(method.clone(), &url)
                .timeout(Duration::from_millis(self.options.timeout_ms));
            if let Some(token) = self.session.token() {
                request = request.header(header::AUTHORIZATION, token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let error = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.map_err(WebmailError::Transport)?;
                    if status.is_success() {
                        return Ok(text);
                    }
                    WebmailError::Status {
                        status: status.as_u16(),
                        body: text,
                    }
                }
                Err(err) => WebmailError::Transport(err),
            };

            if classify(attempt, &error, &mut handler) {
                self.wait_before_retry(attempt).await;
                attempt += 1;
                continue;
            }
            return Err(error);
        }
    }

    /// Exponential backoff sleep before the next retry attempt.
    async fn wait_before_retry(&self, attempt: u32) {
        let multiplier = 1u64 << attempt.min(16);
        let delay_ms = self.options.retry_backoff_ms.saturating_mul(multiplier);
        tracing::debug!(attempt, delay_ms, "retrying request");
        sleep(Duration::from_millis(delay_ms)).await;
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|err| WebmailError::Decode(format!("invalid response JSON: {err}; body: {body}")))
}
