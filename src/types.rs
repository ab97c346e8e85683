use serde::{Deserialize, Serialize};

/// Body of `POST /login`.
#[derive(Clone, Debug, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Body of `POST /user`.
#[derive(Clone, Debug, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Successful `POST /login` response.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub jwt: String,
}

/// User record as returned by `GET /me`, `GET /users` and `POST /user`.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
}

/// Body of `POST /mail`.
#[derive(Clone, Debug, Serialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Sent-mail record as returned by `GET /mails`.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct Mail {
    pub id: i64,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// `409 Conflict` body from `POST /user`. Both fields are optional on the
/// wire; defaults are applied at the call site.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ConflictBody {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
