use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::error::WalletError;

/// Supplies fresh derivation indices when the caller does not pass one.
#[async_trait]
pub trait IndexSequence: Send + Sync {
    async fn next(&self) -> Result<u32, WalletError>;
}

/// In-process counter. Indices are not persisted across runs.
#[derive(Debug, Default)]
pub struct CounterSequence {
    next: AtomicU32,
}

impl CounterSequence {
    pub fn starting_at(index: u32) -> Self {
        Self {
            next: AtomicU32::new(index),
        }
    }
}

#[async_trait]
impl IndexSequence for CounterSequence {
    async fn next(&self) -> Result<u32, WalletError> {
        // Stay below the hardened range.
        let index = self
            .next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < 1 << 31).then_some(n + 1)
            })
            .map_err(|_| WalletError::DerivationFailed("index sequence exhausted".into()))?;
        Ok(index)
    }
}
