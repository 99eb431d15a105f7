use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::error::WalletError;
use crate::types::{LedgerId, NetworkId};

pub type SessionKey = (LedgerId, NetworkId);

/// One memoized session per (ledger, network).
///
/// Concurrent first calls for a key share a single construction. A failed
/// construction leaves the entry empty so the next call retries.
pub struct SessionCache<S: ?Sized> {
    entries: Mutex<HashMap<SessionKey, Arc<OnceCell<Arc<S>>>>>,
}

impl<S: ?Sized> Default for SessionCache<S> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<S: ?Sized + Send + Sync> SessionCache<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live session for `key`, running `open` only if none exists.
    pub async fn get_or_open<F, Fut>(&self, key: SessionKey, open: F) -> Result<Arc<S>, WalletError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<S>, WalletError>>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(key).or_default())
        };
        let session = cell.get_or_try_init(open).await?;
        Ok(Arc::clone(session))
    }

    /// Drops the live session for `key`. Returns whether one was dropped.
    ///
    /// A construction still in flight is left alone: its callers and any
    /// later caller share its result.
    pub async fn reset(&self, key: SessionKey) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.get(&key) {
            Some(cell) if cell.initialized() => {
                entries.remove(&key);
                true
            }
            _ => false,
        }
    }

    pub async fn contains(&self, key: SessionKey) -> bool {
        self.entries
            .lock()
            .await
            .get(&key)
            .is_some_and(|cell| cell.initialized())
    }
}
