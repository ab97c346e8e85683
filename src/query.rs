use tokio::sync::{watch, Mutex};

use crate::{User, WebmailClient};

/// Observable state of the current-user query: what a UI surface needs to
/// render a spinner, an error line, or the user record.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryState {
    pub is_loading: bool,
    pub is_error: bool,
    /// Human-readable message of the terminal failure, if any.
    pub error: Option<String>,
    pub user: Option<User>,
}

/// Cached, deduplicated "who am I" query.
///
/// Every surface that needs the logged-in user shares one `SessionQuery`
/// (the query itself is the fixed cache identity). Concurrent callers
/// collapse onto a single underlying `GET /me` request, and the result is
/// cached until the session changes — a login or an invalidation bumps the
/// session generation and makes the entry stale.
///
/// A terminal 401 invalidates the session exactly once per terminal
/// outcome: the one deduplicated fetch applies it, and the cached error is
/// then served without re-firing the effect.
pub struct SessionQuery {
    client: WebmailClient,
    state: watch::Sender<QueryState>,
    cache: Mutex<Option<CacheEntry>>,
}

struct CacheEntry {
    generation: u64,
    result: Result<User, String>,
}

impl SessionQuery {
    /// Wraps a client; the query observes the client's session store.
    pub fn new(client: WebmailClient) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Self {
            client,
            state,
            cache: Mutex::new(None),
        }
    }

    /// Returns the current user, fetching at most once per session
    /// generation. On failure the error is the human-readable message shown
    /// to the user, falling back to "Unknown error".
    pub async fn current_user(&self) -> Result<User, String> {
        let mut cache = self.cache.lock().await;

        if let Some(entry) = cache.as_ref() {
            if entry.generation == self.client.session().snapshot().generation {
                return entry.result.clone();
            }
        }

        self.state.send_replace(QueryState {
            is_loading: true,
            ..QueryState::default()
        });

        let result = self.client.me().await.map_err(|err| {
            let message = err.to_string();
            if message.is_empty() {
                "Unknown error".to_owned()
            } else {
                message
            }
        });

        // Stamped with the generation observed after the fetch: a terminal
        // 401 bumps the generation mid-fetch, and the error must stay
        // cached under the new generation instead of refetching (and
        // re-invalidating) on the next read.
        *cache = Some(CacheEntry {
            generation: self.client.session().snapshot().generation,
            result: result.clone(),
        });

        self.state.send_replace(match &result {
            Ok(user) => QueryState {
                user: Some(user.clone()),
                ..QueryState::default()
            },
            Err(message) => QueryState {
                is_error: true,
                error: Some(message.clone()),
                ..QueryState::default()
            },
        });

        result
    }

    /// Last published state; does not trigger a fetch.
    pub fn state(&self) -> QueryState {
        self.state.borrow().clone()
    }

    /// Watches the query state; subscribers observe loading and terminal
    /// transitions of fetches driven by [`SessionQuery::current_user`].
    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.state.subscribe()
    }
}
