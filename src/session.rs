use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::watch;

/// Point-in-time view of the session, published on every token write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SessionSnapshot {
    /// Monotonic counter, bumped on every token write. Results cached under
    /// an older generation are stale.
    pub generation: u64,
    /// Whether a token is currently held.
    pub authenticated: bool,
}

/// Where the session token lives between runs.
///
/// Implementations are best-effort: I/O failures are logged and swallowed,
/// the in-memory token remains authoritative for the current process.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> Option<String>;
    fn store(&self, token: &str);
    fn remove(&self);
}

/// Ephemeral storage; the session dies with the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Option<String> {
        self.lock().clone()
    }

    fn store(&self, token: &str) {
        *self.lock() = Some(token.to_owned());
    }

    fn remove(&self) {
        *self.lock() = None;
    }
}

impl MemoryTokenStorage {
    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Token file under the platform data directory.
///
/// One fixed location per platform: a fresh process restores the session
/// from it, and removing it is a durable logout.
#[derive(Clone, Debug)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    /// Default location: `<data_dir>/webmail-http/token`.
    ///
    /// Returns `None` when the platform exposes no data directory.
    pub fn new() -> Option<Self> {
        let dir = dirs::data_dir()?;
        Some(Self::at_path(dir.join("webmail-http").join("token")))
    }

    /// Uses an explicit token file path.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(token) => {
                let token = token.trim();
                (!token.is_empty()).then(|| token.to_owned())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "failed to read session token");
                None
            }
        }
    }

    fn store(&self, token: &str) {
        let result = self
            .path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| std::fs::write(&self.path, token));
        if let Err(err) = result {
            tracing::warn!(path = %self.path.display(), %err, "failed to persist session token");
        }
    }

    fn remove(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "failed to remove session token");
            }
        }
    }
}

/// Owns the authentication token.
///
/// All reads and writes of the token go through this store; writers are
/// serialized relative to readers, so a request never observes a
/// half-updated token. [`SessionStore::invalidate`] publishes an
/// unauthenticated [`SessionSnapshot`] — the explicit signal the hosting
/// application reacts to (resetting cached queries, navigating to the
/// login surface) instead of an environment-level page reload.
///
/// Cloning is cheap; clones share the same token and snapshot channel.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Box<dyn TokenStorage>,
    token: RwLock<Option<String>>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("snapshot", &self.snapshot())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl SessionStore {
    /// Creates a store, restoring any token `storage` holds from a
    /// previous run.
    pub fn new(storage: impl TokenStorage + 'static) -> Self {
        let token = storage.load();
        let (snapshot, _) = watch::channel(SessionSnapshot {
            generation: 0,
            authenticated: token.is_some(),
        });
        Self {
            inner: Arc::new(Inner {
                storage: Box::new(storage),
                token: RwLock::new(token),
                snapshot,
            }),
        }
    }

    /// In-memory store for tests and single-run sessions.
    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStorage::default())
    }

    /// Current token, if any.
    pub fn token(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stores the token of a freshly authenticated session.
    pub fn set_token(&self, token: &str) {
        {
            let mut guard = self
                .inner
                .token
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            self.inner.storage.store(token);
            *guard = Some(token.to_owned());
        }
        self.publish(true);
    }

    /// Clears the token, both in memory and in persistent storage, and
    /// publishes the invalidation snapshot. The clear is visible to every
    /// request dispatched afterwards.
    pub fn invalidate(&self) {
        {
            let mut guard = self
                .inner
                .token
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            self.inner.storage.remove();
            *guard = None;
        }
        self.publish(false);
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        *self.inner.snapshot.borrow()
    }

    /// Watches for session changes; the hosting application subscribes here
    /// to observe invalidation.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot.subscribe()
    }

    fn publish(&self, authenticated: bool) {
        self.inner.snapshot.send_modify(|snapshot| {
            snapshot.generation += 1;
            snapshot.authenticated = authenticated;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{FileTokenStorage, SessionStore, TokenStorage};

    #[test]
    fn starts_empty_and_unauthenticated() {
        let store = SessionStore::in_memory();
        assert_eq!(store.token(), None);
        assert!(!store.snapshot().authenticated);
        assert_eq!(store.snapshot().generation, 0);
    }

    #[test]
    fn set_then_invalidate_clears_immediately() {
        let store = SessionStore::in_memory();
        store.set_token("tok-1");
        assert_eq!(store.token().as_deref(), Some("tok-1"));
        assert!(store.snapshot().authenticated);

        store.invalidate();
        assert_eq!(store.token(), None);
        assert!(!store.snapshot().authenticated);
    }

    #[test]
    fn every_write_bumps_the_generation() {
        let store = SessionStore::in_memory();
        store.set_token("a");
        store.set_token("b");
        store.invalidate();
        assert_eq!(store.snapshot().generation, 3);
    }

    #[test]
    fn subscriber_observes_invalidation() {
        let store = SessionStore::in_memory();
        let receiver = store.subscribe();
        store.set_token("tok-1");
        store.invalidate();
        let snapshot = *receiver.borrow();
        assert!(!snapshot.authenticated);
        assert_eq!(snapshot.generation, 2);
    }

    #[test]
    fn file_storage_survives_a_reload() {
        let dir = tempfile::tempdir().expect("must create temp dir");
        let path = dir.path().join("token");

        let store = SessionStore::new(FileTokenStorage::at_path(&path));
        store.set_token("persisted-tok");
        drop(store);

        // A fresh store over the same path restores the token.
        let reloaded = SessionStore::new(FileTokenStorage::at_path(&path));
        assert_eq!(reloaded.token().as_deref(), Some("persisted-tok"));
        assert!(reloaded.snapshot().authenticated);
    }

    #[test]
    fn file_storage_remove_clears_the_key() {
        let dir = tempfile::tempdir().expect("must create temp dir");
        let path = dir.path().join("token");
        let storage = FileTokenStorage::at_path(&path);

        storage.store("tok");
        assert_eq!(storage.load().as_deref(), Some("tok"));

        storage.remove();
        assert_eq!(storage.load(), None);
        // Removing an absent key is not an error.
        storage.remove();
    }
}
