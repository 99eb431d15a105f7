//! The wallet façade: one object exposing send, balance and address
//! operations over every configured ledger.

use std::fmt;
use std::sync::Arc;

use chain_btc::transaction::{build_consolidated, build_unsigned, estimate_fee, UnsignedBtcTx};
use chain_btc::utxo::{build_spends, select_consolidated};
use chain_eth::erc20::{self, DEFAULT_TRANSFER_GAS};
use chain_eth::transaction::{build_erc20_transfer, build_transfer, TRANSFER_GAS};
use tracing::{debug, info, warn};

use crate::amount::{self, denormalize, normalize, AmountInput, ScaledAmount};
use crate::config::{ResolvedLedger, SpendStrategy, WalletConfig};
use crate::derivation::{self, DerivedAddress};
use crate::error::{SendStage, WalletError};
use crate::ledger::{
    AccountConnector, AccountSession, LedgerError, TokenIssue, TokenMint, TokenTransfer,
    UtxoConnector, UtxoSession,
};
use crate::mnemonic::MasterSeed;
use crate::registry::{Asset, AssetRegistry, Registry};
use crate::sequence::{CounterSequence, IndexSequence};
use crate::session::SessionCache;
use crate::signer::{AccountSigner, LocalAccountSigner, LocalUtxoSigner, UtxoSigner};
use crate::types::{AssetId, AssetKey, AssetRef, LedgerId, NetworkId, SignedTransaction};

/// Index of the address every send spends from and returns change to.
pub const SPEND_INDEX: u32 = 0;

type Staged<T> = Result<T, (SendStage, WalletError)>;

trait AtStage<T> {
    fn at(self, stage: SendStage) -> Staged<T>;
}

impl<T, E: Into<WalletError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: SendStage) -> Staged<T> {
        self.map_err(|e| (stage, e.into()))
    }
}

fn adapter(ledger: LedgerId) -> impl Fn(LedgerError) -> WalletError {
    move |source| WalletError::Ledger { ledger, source }
}

/// A transaction accepted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub txid: String,
    /// `None` when the adapter built the transaction itself (issued tokens
    /// on an unspent-output ledger).
    pub signed: Option<SignedTransaction>,
}

/// A signed transaction the ledger did not accept. Pass `signed` to
/// [`Wallet::rebroadcast`] to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedBroadcast {
    pub signed: SignedTransaction,
    pub cause: LedgerError,
}

/// Outcome of a send, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub ledger: LedgerId,
    pub asset: String,
    pub from: String,
    pub to: String,
    pub amount: ScaledAmount,
    pub submitted: Vec<Submission>,
    pub failed: Vec<FailedBroadcast>,
}

impl SendReport {
    /// Some transactions went out and some did not.
    pub fn is_partial(&self) -> bool {
        !self.submitted.is_empty() && !self.failed.is_empty()
    }

    pub fn txids(&self) -> Vec<&str> {
        self.submitted.iter().map(|s| s.txid.as_str()).collect()
    }
}

/// Most decimals an issued token may declare.
pub const MAX_ISSUED_DECIMALS: u8 = 9;

/// A token to issue on the unspent-output ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct NewToken {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub document_uri: String,
    /// Initial supply in display units. `None` creates only the mint baton.
    pub initial_supply: Option<AmountInput>,
}

/// Outcome of a token genesis or mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueReport {
    pub token: AssetId,
    pub txid: String,
    /// Supply added, in minimal units.
    pub amount: ScaledAmount,
    pub decimals: u8,
}

/// A balance in minimal units with the precision needed to display it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub symbol: String,
    pub amount: ScaledAmount,
    pub decimals: u8,
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", denormalize(self.amount, self.decimals), self.symbol)
    }
}

struct UtxoLedger {
    target: ResolvedLedger,
    connector: Option<Arc<dyn UtxoConnector>>,
    signer: Arc<dyn UtxoSigner>,
    sessions: Arc<SessionCache<dyn UtxoSession>>,
    assets: AssetRegistry,
}

struct AccountLedger {
    target: ResolvedLedger,
    connector: Option<Arc<dyn AccountConnector>>,
    signer: Arc<dyn AccountSigner>,
    sessions: Arc<SessionCache<dyn AccountSession>>,
    assets: AssetRegistry,
}

pub struct WalletBuilder {
    config: WalletConfig,
    seed: MasterSeed,
    utxo_connector: Option<Arc<dyn UtxoConnector>>,
    account_connector: Option<Arc<dyn AccountConnector>>,
    utxo_signer: Arc<dyn UtxoSigner>,
    account_signer: Arc<dyn AccountSigner>,
    utxo_sessions: Option<Arc<SessionCache<dyn UtxoSession>>>,
    account_sessions: Option<Arc<SessionCache<dyn AccountSession>>>,
    sequence: Arc<dyn IndexSequence>,
}

impl WalletBuilder {
    pub fn new(config: WalletConfig, seed: MasterSeed) -> Self {
        Self {
            config,
            seed,
            utxo_connector: None,
            account_connector: None,
            utxo_signer: Arc::new(LocalUtxoSigner),
            account_signer: Arc::new(LocalAccountSigner),
            utxo_sessions: None,
            account_sessions: None,
            sequence: Arc::new(CounterSequence::default()),
        }
    }

    pub fn utxo_connector(mut self, connector: Arc<dyn UtxoConnector>) -> Self {
        self.utxo_connector = Some(connector);
        self
    }

    pub fn account_connector(mut self, connector: Arc<dyn AccountConnector>) -> Self {
        self.account_connector = Some(connector);
        self
    }

    pub fn utxo_signer(mut self, signer: Arc<dyn UtxoSigner>) -> Self {
        self.utxo_signer = signer;
        self
    }

    pub fn account_signer(mut self, signer: Arc<dyn AccountSigner>) -> Self {
        self.account_signer = signer;
        self
    }

    /// Shares a session cache with other wallets in the process.
    pub fn utxo_sessions(mut self, sessions: Arc<SessionCache<dyn UtxoSession>>) -> Self {
        self.utxo_sessions = Some(sessions);
        self
    }

    pub fn account_sessions(mut self, sessions: Arc<SessionCache<dyn AccountSession>>) -> Self {
        self.account_sessions = Some(sessions);
        self
    }

    pub fn index_sequence(mut self, sequence: Arc<dyn IndexSequence>) -> Self {
        self.sequence = sequence;
        self
    }

    /// Resolves each ledger's network selector once.
    pub fn build(self) -> Result<Wallet, WalletError> {
        self.config.check()?;
        let btc_target = self.config.selector(LedgerId::Bitcoin).resolve(LedgerId::Bitcoin)?;
        let eth_target = self.config.selector(LedgerId::Ethereum).resolve(LedgerId::Ethereum)?;
        info!(
            bitcoin = %btc_target.network,
            ethereum = %eth_target.network,
            strategy = ?self.config.spend_strategy,
            "wallet ready"
        );

        Ok(Wallet {
            utxo: UtxoLedger {
                target: btc_target,
                connector: self.utxo_connector,
                signer: self.utxo_signer,
                sessions: self.utxo_sessions.unwrap_or_default(),
                assets: AssetRegistry::new(LedgerId::Bitcoin),
            },
            account: AccountLedger {
                target: eth_target,
                connector: self.account_connector,
                signer: self.account_signer,
                sessions: self.account_sessions.unwrap_or_default(),
                assets: AssetRegistry::new(LedgerId::Ethereum),
            },
            config: self.config,
            seed: self.seed,
            sequence: self.sequence,
        })
    }
}

pub struct Wallet {
    config: WalletConfig,
    seed: MasterSeed,
    sequence: Arc<dyn IndexSequence>,
    utxo: UtxoLedger,
    account: AccountLedger,
}

impl Wallet {
    pub fn builder(config: WalletConfig, seed: MasterSeed) -> WalletBuilder {
        WalletBuilder::new(config, seed)
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn network(&self, ledger: LedgerId) -> NetworkId {
        self.target(ledger).network
    }

    fn target(&self, ledger: LedgerId) -> &ResolvedLedger {
        match ledger {
            LedgerId::Bitcoin => &self.utxo.target,
            LedgerId::Ethereum => &self.account.target,
        }
    }

    fn assets(&self, ledger: LedgerId) -> &AssetRegistry {
        match ledger {
            LedgerId::Bitcoin => &self.utxo.assets,
            LedgerId::Ethereum => &self.account.assets,
        }
    }

    async fn utxo_session(&self) -> Result<Arc<dyn UtxoSession>, WalletError> {
        let side = &self.utxo;
        let ledger = LedgerId::Bitcoin;
        let network = side.target.network;
        let connector = side.connector.as_ref().ok_or_else(|| {
            WalletError::Config(format!("no {ledger} connector configured"))
        })?;
        side.sessions
            .get_or_open((ledger, network), || async {
                let session = connector
                    .connect(&side.target)
                    .await
                    .map_err(|source| WalletError::SessionInit { ledger, network, source })?;
                info!(%ledger, %network, endpoint = %side.target.endpoint, "session opened");
                Ok(session)
            })
            .await
    }

    async fn account_session(&self) -> Result<Arc<dyn AccountSession>, WalletError> {
        let side = &self.account;
        let ledger = LedgerId::Ethereum;
        let network = side.target.network;
        let connector = side.connector.as_ref().ok_or_else(|| {
            WalletError::Config(format!("no {ledger} connector configured"))
        })?;
        side.sessions
            .get_or_open((ledger, network), || async {
                let session = connector
                    .connect(&side.target)
                    .await
                    .map_err(|source| WalletError::SessionInit { ledger, network, source })?;
                info!(%ledger, %network, endpoint = %side.target.endpoint, "session opened");
                Ok(session)
            })
            .await
    }

    /// Drops the cached session for `ledger`; the next call reconnects.
    pub async fn reset_session(&self, ledger: LedgerId) -> bool {
        let key = (ledger, self.network(ledger));
        let dropped = match ledger {
            LedgerId::Bitcoin => self.utxo.sessions.reset(key).await,
            LedgerId::Ethereum => self.account.sessions.reset(key).await,
        };
        if dropped {
            info!(%ledger, network = %key.1, "session reset");
        }
        dropped
    }

    fn derive(&self, ledger: LedgerId, index: u32) -> Result<DerivedAddress, WalletError> {
        derivation::derive_address(self.seed.as_bytes(), ledger, self.network(ledger), index)
    }

    /// Derives the address at `index`, or at the next index from the
    /// sequence when none is given.
    pub async fn new_address(
        &self,
        ledger: LedgerId,
        index: Option<u32>,
    ) -> Result<DerivedAddress, WalletError> {
        let index = match index {
            Some(index) => index,
            None => self.sequence.next().await?,
        };
        let derived = self.derive(ledger, index)?;
        debug!(%ledger, path = %derived.path, address = %derived.address, "address derived");
        Ok(derived)
    }

    pub fn validate_address(&self, ledger: LedgerId, candidate: &str) -> Result<(), WalletError> {
        derivation::validate_address(ledger, self.network(ledger), candidate)
    }

    /// Registry operations for `ledger`, opening its session on demand.
    pub fn registry(&self, ledger: LedgerId) -> RegistryHandle<'_> {
        RegistryHandle {
            wallet: self,
            ledger,
        }
    }

    async fn lookup_asset(&self, ledger: LedgerId, key: &AssetKey) -> Result<Asset, WalletError> {
        match ledger {
            LedgerId::Bitcoin => {
                let session = self.utxo_session().await?;
                self.utxo.assets.lookup(&*session, key).await
            }
            LedgerId::Ethereum => {
                let session = self.account_session().await?;
                self.account.assets.lookup(&*session, key).await
            }
        }
    }

    /// Balance of `asset` held by `address`, or by the spend address.
    pub async fn balance(&self, asset: &str, address: Option<&str>) -> Result<Balance, WalletError> {
        let asset_ref = AssetRef::parse(asset)?;
        let ledger = asset_ref.ledger();
        let owner = match address {
            Some(address) => {
                self.validate_address(ledger, address)?;
                address.to_string()
            }
            None => self.derive(ledger, SPEND_INDEX)?.address,
        };

        let balance = match (&asset_ref, ledger) {
            (AssetRef::Native(_), LedgerId::Bitcoin) => {
                let session = self.utxo_session().await?;
                let sat = session.balance(&owner).await.map_err(adapter(ledger))?;
                native_balance(ledger, sat.into())
            }
            (AssetRef::Native(_), LedgerId::Ethereum) => {
                let session = self.account_session().await?;
                let wei = session.balance(&owner).await.map_err(adapter(ledger))?;
                native_balance(ledger, wei)
            }
            (AssetRef::Token { key, .. }, LedgerId::Bitcoin) => {
                let token = self.lookup_asset(ledger, key).await?;
                let session = self.utxo_session().await?;
                let amount = session
                    .token_balance(&owner, &token.id)
                    .await
                    .map_err(adapter(ledger))?;
                token_balance(&token, amount)
            }
            (AssetRef::Token { key, .. }, LedgerId::Ethereum) => {
                let token = self.lookup_asset(ledger, key).await?;
                let contract = contract_of(&token)?;
                let session = self.account_session().await?;
                let data = erc20::encode_balance_of(&owner)?;
                let returned = session.call(&contract, &data).await.map_err(adapter(ledger))?;
                token_balance(&token, erc20::decode_uint256(&returned)?.into())
            }
        };

        debug!(%ledger, asset = %asset_ref, owner = %owner, balance = %balance, "balance fetched");
        Ok(balance)
    }

    /// Issues a new token from the spend address, which keeps the mint
    /// baton. The token definition is checked before any network call. The
    /// registry is dropped afterwards so the next lookup lists the token.
    pub async fn create_token(&self, token: NewToken) -> Result<IssueReport, WalletError> {
        let ledger = LedgerId::Bitcoin;
        let symbol = required("symbol", &token.symbol)?;
        let name = required("name", &token.name)?;
        let document_uri = required("document_uri", &token.document_uri)?;
        if token.decimals > MAX_ISSUED_DECIMALS {
            return Err(WalletError::InvalidToken(format!(
                "decimals {} exceeds {MAX_ISSUED_DECIMALS}",
                token.decimals
            )));
        }
        let initial_supply = match token.initial_supply {
            Some(supply) => normalize(supply, token.decimals)?,
            None => ScaledAmount::ZERO,
        };

        let session = self.utxo_session().await?;
        let issuer = self.derive(ledger, SPEND_INDEX)?;
        let issue = TokenIssue {
            symbol,
            name,
            decimals: token.decimals,
            document_uri,
            initial_supply,
            issuer: issuer.address.clone(),
        };
        let issued = session
            .create_token(&issue, &issuer.spend_key)
            .await
            .map_err(|source| WalletError::Broadcast { ledger, failed: 1, source })?;
        self.utxo.assets.invalidate().await;

        info!(%ledger, token = %issued.id, symbol = %issue.symbol, txid = %issued.txid, "token created");
        Ok(IssueReport {
            token: issued.id,
            txid: issued.txid,
            amount: initial_supply,
            decimals: issue.decimals,
        })
    }

    /// Mints `amount` more of an issued token whose baton the spend address
    /// holds. The amount is scaled by the token's registry precision.
    pub async fn mint_token(
        &self,
        asset: &str,
        amount: impl Into<AmountInput>,
    ) -> Result<IssueReport, WalletError> {
        let (ledger, key) = match AssetRef::parse(asset)? {
            AssetRef::Token {
                ledger: ledger @ LedgerId::Bitcoin,
                key,
            } => (ledger, key),
            other => {
                return Err(WalletError::InvalidToken(format!(
                    "{other} is not an issued token on an unspent-output ledger"
                )))
            }
        };
        let amount = amount.into();
        amount::check_syntax(&amount)?;

        let session = self.utxo_session().await?;
        let token = self.utxo.assets.lookup(&*session, &key).await?;
        let scaled = positive(normalize(&amount, token.decimals))?;
        let issuer = self.derive(ledger, SPEND_INDEX)?;
        let mint = TokenMint {
            token: token.id.clone(),
            issuer: issuer.address.clone(),
            amount: scaled,
        };
        let txid = session
            .mint_token(&mint, &issuer.spend_key)
            .await
            .map_err(|source| WalletError::Broadcast { ledger, failed: 1, source })?;

        info!(%ledger, token = %token.id, amount = %scaled, %txid, "token minted");
        Ok(IssueReport {
            token: token.id,
            txid,
            amount: scaled,
            decimals: token.decimals,
        })
    }

    /// Pays `amount` of `asset` to `to` from the spend address.
    ///
    /// The asset reference, the recipient and the amount syntax are checked
    /// before any network call; those failures are returned as-is. Later
    /// failures are wrapped in [`WalletError::Send`] with the stage reached.
    pub async fn send(
        &self,
        asset: &str,
        to: &str,
        amount: impl Into<AmountInput>,
    ) -> Result<SendReport, WalletError> {
        let asset_ref = AssetRef::parse(asset)?;
        let ledger = asset_ref.ledger();
        self.validate_address(ledger, to)?;
        let amount = amount.into();
        amount::check_syntax(&amount)?;

        info!(%ledger, asset = %asset_ref, %to, "send started");
        let result = match ledger {
            LedgerId::Bitcoin => self.send_utxo(&asset_ref, to, &amount).await,
            LedgerId::Ethereum => self.send_account(&asset_ref, to, &amount).await,
        };

        match result {
            Ok(report) => {
                info!(
                    %ledger,
                    asset = %asset_ref,
                    submitted = report.submitted.len(),
                    failed = report.failed.len(),
                    "send finished"
                );
                Ok(report)
            }
            Err((stage, source)) => {
                warn!(%ledger, asset = %asset_ref, %stage, error = %source, "send failed");
                Err(WalletError::Send {
                    stage,
                    ledger,
                    asset: asset_ref.to_string(),
                    source: Box::new(source),
                })
            }
        }
    }

    async fn send_utxo(&self, asset: &AssetRef, to: &str, amount: &AmountInput) -> Staged<SendReport> {
        let ledger = LedgerId::Bitcoin;
        let network = self.utxo.target.network;

        let session = self.utxo_session().await.at(SendStage::ResolveSession)?;
        let from = self.derive(ledger, SPEND_INDEX).at(SendStage::ResolveAddress)?;
        debug!(%ledger, from = %from.address, "spend address resolved");

        if let AssetRef::Token { key, .. } = asset {
            let token = self
                .utxo
                .assets
                .lookup(&*session, key)
                .await
                .at(SendStage::NormalizeAmount)?;
            let scaled = positive(normalize(amount, token.decimals)).at(SendStage::NormalizeAmount)?;
            let transfer = TokenTransfer {
                token: token.id.clone(),
                from: from.address.clone(),
                to: to.to_string(),
                amount: scaled,
                change_to: from.address.clone(),
            };
            let txid = session
                .send_token(&transfer, &from.spend_key)
                .await
                .map_err(|source| WalletError::Broadcast { ledger, failed: 1, source })
                .at(SendStage::Broadcast)?;
            info!(%ledger, token = %token.id, %txid, "token transfer submitted");
            return Ok(SendReport {
                ledger,
                asset: asset.to_string(),
                from: from.address,
                to: to.to_string(),
                amount: scaled,
                submitted: vec![Submission { txid, signed: None }],
                failed: Vec::new(),
            });
        }

        let scaled = positive(normalize(amount, ledger.native_decimals())).at(SendStage::NormalizeAmount)?;
        let target_sat = scaled.to_u64().at(SendStage::NormalizeAmount)?;

        let utxos = session
            .unspent_outputs(&from.address)
            .await
            .map_err(adapter(ledger))
            .at(SendStage::SelectCoins)?;
        let rate = match self.utxo.target.fee_rate_override {
            Some(rate) => rate,
            None => session
                .fee_rate()
                .await
                .map_err(adapter(ledger))
                .at(SendStage::SelectCoins)?,
        };

        let unsigned: Vec<UnsignedBtcTx> = match self.config.spend_strategy {
            SpendStrategy::PerOutput => {
                let flat_fee = estimate_fee(1, 2, rate).at(SendStage::SelectCoins)?;
                let requests = build_spends(&utxos, target_sat, flat_fee, to, &from.address)
                    .at(SendStage::SelectCoins)?;
                info!(%ledger, requests = requests.len(), fee_each = flat_fee, "outputs selected");
                requests
                    .iter()
                    .map(|request| build_unsigned(request, network.btc()))
                    .collect::<Result<Vec<_>, _>>()
                    .at(SendStage::Build)?
            }
            SpendStrategy::Consolidated => {
                let selection = select_consolidated(&utxos, target_sat, rate).at(SendStage::SelectCoins)?;
                info!(
                    %ledger,
                    inputs = selection.selected.len(),
                    fee = selection.fee_sat,
                    change = ?selection.change_sat,
                    "outputs selected"
                );
                vec![build_consolidated(&selection, to, target_sat, &from.address, network.btc())
                    .at(SendStage::Build)?]
            }
        };

        // Sign everything before the first broadcast.
        let signed = unsigned
            .iter()
            .map(|tx| self.utxo.signer.sign(tx, &from.spend_key))
            .collect::<Result<Vec<_>, _>>()
            .at(SendStage::Sign)?;

        let mut submitted = Vec::with_capacity(signed.len());
        let mut failed = Vec::new();
        for tx in signed {
            match session.broadcast(&tx.raw).await {
                Ok(txid) => {
                    info!(%ledger, %txid, "transaction broadcast");
                    submitted.push(Submission { txid, signed: Some(tx) });
                }
                Err(cause) => {
                    warn!(%ledger, txid = ?tx.hash, error = %cause, "broadcast failed");
                    failed.push(FailedBroadcast { signed: tx, cause });
                }
            }
        }

        if submitted.is_empty() {
            let failures = failed.len();
            let source = failed
                .into_iter()
                .next()
                .map(|f| f.cause)
                .unwrap_or_else(|| LedgerError::Other("nothing to broadcast".into()));
            return Err((
                SendStage::Broadcast,
                WalletError::Broadcast { ledger, failed: failures, source },
            ));
        }

        Ok(SendReport {
            ledger,
            asset: asset.to_string(),
            from: from.address,
            to: to.to_string(),
            amount: scaled,
            submitted,
            failed,
        })
    }

    async fn send_account(&self, asset: &AssetRef, to: &str, amount: &AmountInput) -> Staged<SendReport> {
        let ledger = LedgerId::Ethereum;
        let chain_id = self.account.target.network.eth().chain_id();

        let session = self.account_session().await.at(SendStage::ResolveSession)?;
        let from = self.derive(ledger, SPEND_INDEX).at(SendStage::ResolveAddress)?;
        debug!(%ledger, from = %from.address, "spend address resolved");

        let (scaled, token) = match asset {
            AssetRef::Native(_) => {
                let scaled = positive(normalize(amount, ledger.native_decimals()))
                    .at(SendStage::NormalizeAmount)?;
                (scaled, None)
            }
            AssetRef::Token { key, .. } => {
                let token = self
                    .account
                    .assets
                    .lookup(&*session, key)
                    .await
                    .at(SendStage::NormalizeAmount)?;
                let scaled = positive(normalize(amount, token.decimals)).at(SendStage::NormalizeAmount)?;
                (scaled, Some(token))
            }
        };

        let nonce = session
            .pending_nonce(&from.address)
            .await
            .map_err(adapter(ledger))
            .at(SendStage::Build)?;
        let quote = session.fee_quote().await.map_err(adapter(ledger)).at(SendStage::Build)?;
        let fees = quote.with_multiplier(self.config.gas_multiplier_percent);

        let mut tx = match &token {
            None => {
                let value = scaled.to_u128().at(SendStage::Build)?;
                build_transfer(chain_id, nonce, to, value, fees, TRANSFER_GAS).at(SendStage::Build)?
            }
            Some(token) => {
                let contract = contract_of(token).at(SendStage::Build)?;
                build_erc20_transfer(
                    chain_id,
                    nonce,
                    &contract,
                    to,
                    scaled.as_u256(),
                    fees,
                    DEFAULT_TRANSFER_GAS,
                )
                .at(SendStage::Build)?
            }
        };
        tx.gas_limit = session
            .estimate_gas(&from.address, &tx)
            .await
            .map_err(adapter(ledger))
            .at(SendStage::Build)?;
        debug!(%ledger, nonce, gas = tx.gas_limit, max_fee = fees.max_fee_per_gas, "transaction built");

        let signed = self.account.signer.sign(&tx, &from.spend_key).at(SendStage::Sign)?;

        let txid = session
            .broadcast(&signed.raw)
            .await
            .map_err(|source| WalletError::Broadcast { ledger, failed: 1, source })
            .at(SendStage::Broadcast)?;
        info!(%ledger, %txid, "transaction broadcast");

        Ok(SendReport {
            ledger,
            asset: asset.to_string(),
            from: from.address,
            to: to.to_string(),
            amount: scaled,
            submitted: vec![Submission { txid, signed: Some(signed) }],
            failed: Vec::new(),
        })
    }

    /// Submits a previously signed transaction again.
    pub async fn rebroadcast(&self, signed: &SignedTransaction) -> Result<String, WalletError> {
        let ledger = signed.ledger;
        let result = match ledger {
            LedgerId::Bitcoin => self.utxo_session().await?.broadcast(&signed.raw).await,
            LedgerId::Ethereum => self.account_session().await?.broadcast(&signed.raw).await,
        };
        let txid = result.map_err(|source| WalletError::Broadcast { ledger, failed: 1, source })?;
        info!(%ledger, %txid, "transaction rebroadcast");
        Ok(txid)
    }
}

fn positive(amount: Result<ScaledAmount, WalletError>) -> Result<ScaledAmount, WalletError> {
    let amount = amount?;
    if amount.is_zero() {
        return Err(WalletError::AmountPrecision("payment amount must be positive".into()));
    }
    Ok(amount)
}

fn required(field: &str, value: &str) -> Result<String, WalletError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(WalletError::InvalidToken(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn native_balance(ledger: LedgerId, amount: ScaledAmount) -> Balance {
    Balance {
        symbol: ledger.symbol().to_string(),
        amount,
        decimals: ledger.native_decimals(),
    }
}

fn token_balance(token: &Asset, amount: ScaledAmount) -> Balance {
    Balance {
        symbol: token.symbol.clone(),
        amount,
        decimals: token.decimals,
    }
}

/// Issuing contract of an account-ledger token: the listed contract, or the
/// id itself when the id is the contract address.
fn contract_of(token: &Asset) -> Result<String, WalletError> {
    match (&token.contract, &token.id) {
        (Some(contract), _) => Ok(contract.clone()),
        (None, AssetId::Text(id)) if id.starts_with("0x") => Ok(id.clone()),
        (None, id) => Err(WalletError::TransactionBuild {
            ledger: LedgerId::Ethereum,
            reason: format!("asset {id} has no issuing contract"),
        }),
    }
}

/// Registry operations bound to one ledger of a [`Wallet`].
pub struct RegistryHandle<'a> {
    wallet: &'a Wallet,
    ledger: LedgerId,
}

impl RegistryHandle<'_> {
    pub async fn list(&self) -> Result<Arc<Registry>, WalletError> {
        let assets = self.wallet.assets(self.ledger);
        match self.ledger {
            LedgerId::Bitcoin => assets.list(&*self.wallet.utxo_session().await?).await,
            LedgerId::Ethereum => assets.list(&*self.wallet.account_session().await?).await,
        }
    }

    pub async fn info(&self, id: &AssetId) -> Result<Asset, WalletError> {
        self.wallet
            .lookup_asset(self.ledger, &AssetKey::Id(id.clone()))
            .await
    }

    pub async fn resolve_symbol(&self, symbol: &str) -> Result<Asset, WalletError> {
        self.wallet
            .lookup_asset(self.ledger, &AssetKey::Symbol(symbol.to_string()))
            .await
    }

    pub async fn set(&self, entries: Vec<Asset>) -> Result<(), WalletError> {
        self.wallet.assets(self.ledger).set(entries).await
    }

    pub async fn invalidate(&self) {
        self.wallet.assets(self.ledger).invalidate().await
    }

    pub async fn is_loaded(&self) -> bool {
        self.wallet.assets(self.ledger).is_loaded().await
    }
}
