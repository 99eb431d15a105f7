//! Cached, dual-indexed registry of issued assets on one ledger.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};

use crate::error::WalletError;
use crate::ledger::AssetSource;
use crate::types::{AssetId, AssetKey, LedgerId};

/// Metadata of one issued asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: AssetId,
    pub symbol: String,
    pub decimals: u8,
    /// Issuing contract, where the ledger has one.
    pub contract: Option<String>,
    pub document_uri: Option<String>,
    pub name: Option<String>,
}

impl Asset {
    pub fn new(id: impl Into<AssetId>, symbol: &str, decimals: u8) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.to_string(),
            decimals,
            contract: None,
            document_uri: None,
            name: None,
        }
    }

    pub fn with_contract(mut self, contract: &str) -> Self {
        self.contract = Some(contract.to_string());
        self
    }
}

/// Position of the next page in an asset listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    Start,
    /// Rows with a numeric id of at least this value.
    LowerBound(u64),
    /// Rows whose text id sorts after this value.
    After(String),
}

impl PageCursor {
    /// Cursor for the page following a row with `id`; `None` when nothing
    /// can follow it.
    fn following(id: &AssetId) -> Option<PageCursor> {
        match id {
            AssetId::Numeric(n) => n.checked_add(1).map(PageCursor::LowerBound),
            AssetId::Text(s) => Some(PageCursor::After(s.clone())),
        }
    }

    fn advances_past(&self, previous: &PageCursor) -> bool {
        match (previous, self) {
            (PageCursor::Start, _) => true,
            (PageCursor::LowerBound(a), PageCursor::LowerBound(b)) => b > a,
            (PageCursor::After(a), PageCursor::After(b)) => b > a,
            _ => true,
        }
    }
}

/// One page of an asset listing.
#[derive(Debug, Clone, Default)]
pub struct AssetPage {
    pub rows: Vec<Asset>,
    /// Whether more rows follow this page.
    pub more: bool,
}

/// Immutable snapshot of every known asset, indexed by id and by symbol.
#[derive(Debug, Default)]
pub struct Registry {
    by_id: HashMap<AssetId, Asset>,
    by_symbol: HashMap<String, Vec<AssetId>>,
}

impl Registry {
    fn from_rows(
        ledger: LedgerId,
        rows: Vec<Asset>,
        pinned: &HashMap<AssetId, u8>,
    ) -> Result<Self, WalletError> {
        let mut registry = Registry::default();

        for mut asset in rows {
            asset.id = asset.id.canonical();
            let known = registry
                .by_id
                .get(&asset.id)
                .map(|a| a.decimals)
                .or_else(|| pinned.get(&asset.id).copied());
            if let Some(known) = known {
                if known != asset.decimals {
                    return Err(WalletError::AssetPrecisionConflict {
                        ledger,
                        asset: asset.id.to_string(),
                        known,
                        reported: asset.decimals,
                    });
                }
            }
            if registry.by_id.contains_key(&asset.id) {
                continue;
            }

            registry
                .by_symbol
                .entry(asset.symbol.clone())
                .or_default()
                .push(asset.id.clone());
            registry.by_id.insert(asset.id.clone(), asset);
        }

        Ok(registry)
    }

    pub fn get(&self, id: &AssetId) -> Option<&Asset> {
        self.by_id.get(&id.canonical())
    }

    /// Every id listed under `symbol`, in listing order.
    pub fn ids_for_symbol(&self, symbol: &str) -> &[AssetId] {
        self.by_symbol.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.by_id.values()
    }
}

/// Lazily built registry for one ledger.
///
/// The first lookup runs a full pagination sweep; concurrent callers share
/// that sweep. Precisions seen by any successful load are pinned for the
/// lifetime of the registry, including across `invalidate`.
pub struct AssetRegistry {
    ledger: LedgerId,
    cell: RwLock<Arc<OnceCell<Arc<Registry>>>>,
    pinned: Mutex<HashMap<AssetId, u8>>,
}

impl AssetRegistry {
    pub fn new(ledger: LedgerId) -> Self {
        Self {
            ledger,
            cell: RwLock::new(Arc::new(OnceCell::new())),
            pinned: Mutex::new(HashMap::new()),
        }
    }

    pub fn ledger(&self) -> LedgerId {
        self.ledger
    }

    /// Whether a build or `set` is currently cached.
    pub async fn is_loaded(&self) -> bool {
        self.cell.read().await.initialized()
    }

    /// The full registry, building it on first use.
    pub async fn list<S>(&self, source: &S) -> Result<Arc<Registry>, WalletError>
    where
        S: AssetSource + ?Sized,
    {
        let cell = self.cell.read().await.clone();
        let registry = cell.get_or_try_init(|| self.build(source)).await?;
        Ok(Arc::clone(registry))
    }

    /// Metadata for `id`. An unknown id after a build is an error; the
    /// registry is not rebuilt.
    pub async fn info<S>(&self, source: &S, id: &AssetId) -> Result<Asset, WalletError>
    where
        S: AssetSource + ?Sized,
    {
        let registry = self.list(source).await?;
        registry
            .get(id)
            .cloned()
            .ok_or_else(|| WalletError::AssetNotFound {
                ledger: self.ledger,
                asset: id.to_string(),
            })
    }

    /// The single asset listed under `symbol`.
    pub async fn resolve_symbol<S>(&self, source: &S, symbol: &str) -> Result<Asset, WalletError>
    where
        S: AssetSource + ?Sized,
    {
        let registry = self.list(source).await?;
        match registry.ids_for_symbol(symbol) {
            [] => Err(WalletError::AssetNotFound {
                ledger: self.ledger,
                asset: symbol.to_string(),
            }),
            [id] => registry.get(id).cloned().ok_or_else(|| WalletError::AssetNotFound {
                ledger: self.ledger,
                asset: symbol.to_string(),
            }),
            many => Err(WalletError::AmbiguousSymbol {
                ledger: self.ledger,
                symbol: symbol.to_string(),
                candidates: many.iter().map(ToString::to_string).collect(),
            }),
        }
    }

    pub async fn lookup<S>(&self, source: &S, key: &AssetKey) -> Result<Asset, WalletError>
    where
        S: AssetSource + ?Sized,
    {
        match key {
            AssetKey::Id(id) => self.info(source, id).await,
            AssetKey::Symbol(symbol) => self.resolve_symbol(source, symbol).await,
        }
    }

    /// Replaces the cached registry wholesale.
    pub async fn set(&self, entries: Vec<Asset>) -> Result<(), WalletError> {
        let registry = {
            let mut pinned = self.lock_pinned();
            let registry = Registry::from_rows(self.ledger, entries, &pinned)?;
            pin_all(&mut pinned, &registry);
            registry
        };

        info!(ledger = %self.ledger, assets = registry.len(), "asset registry replaced");
        let filled = OnceCell::new_with(Some(Arc::new(registry)));
        *self.cell.write().await = Arc::new(filled);
        Ok(())
    }

    /// Drops the cached registry; the next lookup rebuilds it.
    pub async fn invalidate(&self) {
        *self.cell.write().await = Arc::new(OnceCell::new());
    }

    fn lock_pinned(&self) -> std::sync::MutexGuard<'_, HashMap<AssetId, u8>> {
        // A poisoned map only ever holds fully inserted entries.
        self.pinned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn build<S>(&self, source: &S) -> Result<Arc<Registry>, WalletError>
    where
        S: AssetSource + ?Sized,
    {
        let mut cursor = PageCursor::Start;
        let mut rows = Vec::new();
        let mut pages = 0usize;

        loop {
            let page = source
                .asset_page(&cursor)
                .await
                .map_err(|source| WalletError::Ledger {
                    ledger: self.ledger,
                    source,
                })?;
            pages += 1;

            let next = page.rows.last().and_then(|row| PageCursor::following(&row.id));
            let more = page.more;
            let empty = page.rows.is_empty();
            rows.extend(page.rows);

            if !more {
                break;
            }
            if empty {
                warn!(ledger = %self.ledger, pages, "asset source reported more rows on an empty page; ending sweep");
                break;
            }
            match next {
                Some(next) if next.advances_past(&cursor) => cursor = next,
                _ => {
                    warn!(ledger = %self.ledger, pages, ?cursor, "asset cursor did not advance; ending sweep");
                    break;
                }
            }
        }

        let registry = {
            let mut pinned = self.lock_pinned();
            let registry = Registry::from_rows(self.ledger, rows, &pinned)?;
            pin_all(&mut pinned, &registry);
            registry
        };

        info!(ledger = %self.ledger, pages, assets = registry.len(), "asset registry built");
        Ok(Arc::new(registry))
    }
}

fn pin_all(pinned: &mut HashMap<AssetId, u8>, registry: &Registry) {
    for asset in registry.assets() {
        pinned.insert(asset.id.clone(), asset.decimals);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerError;
    use crate::types::AssetRef;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves fixed pages keyed by cursor and counts every request.
    struct PagedSource {
        pages: Vec<(PageCursor, AssetPage)>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl PagedSource {
        fn new(pages: Vec<(PageCursor, AssetPage)>) -> Self {
            Self {
                pages,
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AssetSource for PagedSource {
        async fn asset_page(&self, cursor: &PageCursor) -> Result<AssetPage, LedgerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.pages
                .iter()
                .find(|(c, _)| c == cursor)
                .map(|(_, page)| page.clone())
                .ok_or_else(|| LedgerError::Rejected(format!("no page at {cursor:?}")))
        }
    }

    fn page(rows: Vec<Asset>, more: bool) -> AssetPage {
        AssetPage { rows, more }
    }

    fn two_page_source() -> PagedSource {
        PagedSource::new(vec![
            (
                PageCursor::Start,
                page(vec![Asset::new(1u64, "USD", 2), Asset::new(2u64, "EUR", 2)], true),
            ),
            (
                PageCursor::LowerBound(3),
                page(vec![Asset::new(3u64, "USD", 6)], false),
            ),
        ])
    }

    #[tokio::test]
    async fn builds_once_across_pages() {
        let source = two_page_source();
        let registry = AssetRegistry::new(LedgerId::Bitcoin);

        let first = registry.list(&source).await.unwrap();
        let second = registry.list(&source).await.unwrap();

        assert_eq!(first.len(), 3);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn both_indexes_agree() {
        let source = two_page_source();
        let registry = AssetRegistry::new(LedgerId::Bitcoin);
        let built = registry.list(&source).await.unwrap();

        for asset in built.assets() {
            assert!(built.ids_for_symbol(&asset.symbol).contains(&asset.id));
        }
        assert_eq!(built.ids_for_symbol("USD").len(), 2);
    }

    #[tokio::test]
    async fn unknown_id_does_not_rebuild() {
        let source = two_page_source();
        let registry = AssetRegistry::new(LedgerId::Bitcoin);
        registry.list(&source).await.unwrap();

        let err = registry.info(&source, &AssetId::Numeric(99)).await.unwrap_err();
        assert!(matches!(err, WalletError::AssetNotFound { .. }));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn symbol_resolution() {
        let source = two_page_source();
        let registry = AssetRegistry::new(LedgerId::Ethereum);

        let eur = registry.resolve_symbol(&source, "EUR").await.unwrap();
        assert_eq!(eur.id, AssetId::Numeric(2));

        let err = registry.resolve_symbol(&source, "USD").await.unwrap_err();
        match err {
            WalletError::AmbiguousSymbol { candidates, .. } => {
                assert_eq!(candidates, vec!["1".to_string(), "3".to_string()]);
            }
            other => panic!("unexpected: {other}"),
        }

        assert!(matches!(
            registry.resolve_symbol(&source, "GBP").await,
            Err(WalletError::AssetNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn text_ids_paginate_after_last_row() {
        let source = PagedSource::new(vec![
            (PageCursor::Start, page(vec![Asset::new("aa", "A", 0)], true)),
            (
                PageCursor::After("aa".into()),
                page(vec![Asset::new("bb", "B", 0)], false),
            ),
        ]);
        let registry = AssetRegistry::new(LedgerId::Bitcoin);
        assert_eq!(registry.list(&source).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_page_with_more_ends_sweep() {
        let source = PagedSource::new(vec![
            (PageCursor::Start, page(vec![Asset::new(1u64, "A", 0)], true)),
            (PageCursor::LowerBound(2), page(vec![], true)),
        ]);
        let registry = AssetRegistry::new(LedgerId::Bitcoin);
        assert_eq!(registry.list(&source).await.unwrap().len(), 1);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn non_advancing_cursor_ends_sweep() {
        // The second page repeats an earlier id, so the cursor would go backwards.
        let source = PagedSource::new(vec![
            (PageCursor::Start, page(vec![Asset::new(5u64, "A", 0)], true)),
            (PageCursor::LowerBound(6), page(vec![Asset::new(1u64, "B", 0)], true)),
        ]);
        let registry = AssetRegistry::new(LedgerId::Bitcoin);
        assert_eq!(registry.list(&source).await.unwrap().len(), 2);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn conflicting_precision_in_one_sweep_fails() {
        let source = PagedSource::new(vec![(
            PageCursor::Start,
            page(vec![Asset::new(1u64, "A", 2), Asset::new(1u64, "A", 8)], false),
        )]);
        let registry = AssetRegistry::new(LedgerId::Bitcoin);
        let err = registry.list(&source).await.unwrap_err();
        assert!(matches!(
            err,
            WalletError::AssetPrecisionConflict { known: 2, reported: 8, .. }
        ));
        assert!(!registry.is_loaded().await);
    }

    #[tokio::test]
    async fn pinned_precision_survives_invalidate() {
        let registry = AssetRegistry::new(LedgerId::Bitcoin);
        registry.set(vec![Asset::new(1u64, "A", 2)]).await.unwrap();
        registry.invalidate().await;

        let source = PagedSource::new(vec![(
            PageCursor::Start,
            page(vec![Asset::new(1u64, "A", 4)], false),
        )]);
        assert!(matches!(
            registry.list(&source).await,
            Err(WalletError::AssetPrecisionConflict { .. })
        ));
    }

    #[tokio::test]
    async fn set_replaces_without_source_calls() {
        let source = two_page_source();
        let registry = AssetRegistry::new(LedgerId::Ethereum);
        registry
            .set(vec![Asset::new("0xabc", "TKN", 6).with_contract("0xabc")])
            .await
            .unwrap();

        let asset = registry.info(&source, &AssetId::from("0xabc")).await.unwrap();
        assert_eq!(asset.decimals, 6);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn invalidate_forces_rebuild() {
        let source = two_page_source();
        let registry = AssetRegistry::new(LedgerId::Bitcoin);
        registry.list(&source).await.unwrap();
        registry.invalidate().await;
        assert!(!registry.is_loaded().await);
        registry.list(&source).await.unwrap();
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test]
    async fn source_failure_leaves_registry_empty() {
        let source = PagedSource::new(vec![]);
        let registry = AssetRegistry::new(LedgerId::Bitcoin);
        assert!(matches!(
            registry.list(&source).await,
            Err(WalletError::Ledger { .. })
        ));
        assert!(!registry.is_loaded().await);
    }

    #[tokio::test]
    async fn hex_ids_match_regardless_of_case() {
        const LISTED: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
        const CHECKSUMMED: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
        let source = PagedSource::new(vec![(
            PageCursor::Start,
            page(vec![Asset::new(LISTED, "USDC", 6).with_contract(LISTED)], false),
        )]);
        let registry = AssetRegistry::new(LedgerId::Ethereum);

        let key = match AssetRef::parse(&format!("ETH:{CHECKSUMMED}")).unwrap() {
            AssetRef::Token { key, .. } => key,
            other => panic!("unexpected: {other}"),
        };
        assert_eq!(registry.lookup(&source, &key).await.unwrap().decimals, 6);
        assert!(registry.info(&source, &AssetId::from(CHECKSUMMED)).await.is_ok());

        registry
            .set(vec![Asset::new(CHECKSUMMED, "USDC", 6)])
            .await
            .unwrap();
        assert!(registry.info(&source, &AssetId::from(LISTED)).await.is_ok());
    }

    #[tokio::test]
    async fn cancelled_build_leaves_registry_unloaded() {
        let mut source = two_page_source();
        source.delay = Some(Duration::from_millis(200));
        let registry = AssetRegistry::new(LedgerId::Bitcoin);

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), registry.list(&source)).await;
        assert!(timed_out.is_err());
        assert!(!registry.is_loaded().await);

        source.delay = None;
        assert_eq!(registry.list(&source).await.unwrap().len(), 3);
        assert!(registry.is_loaded().await);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_build() {
        let mut source = two_page_source();
        source.delay = Some(Duration::from_millis(20));
        let source = Arc::new(source);
        let registry = Arc::new(AssetRegistry::new(LedgerId::Bitcoin));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let source = Arc::clone(&source);
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.list(source.as_ref()).await.map(|r| r.len())
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 3);
        }
        assert_eq!(source.calls(), 2);
    }
}
