use std::fmt;

use bip32::{DerivationPath, XPrv};
use k256::ecdsa::SigningKey;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::WalletError;
use crate::types::{LedgerId, NetworkId};

/// A 32-byte secp256k1 secret scalar, wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SpendKey([u8; 32]);

impl SpendKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for SpendKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpendKey(..)")
    }
}

/// An address with the key that controls it.
#[derive(Debug, Clone)]
pub struct DerivedAddress {
    pub ledger: LedgerId,
    pub network: NetworkId,
    pub address: String,
    pub path: String,
    pub spend_key: SpendKey,
}

/// Derivation path of the receive address at `index`.
///
/// - unspent-output ledger: `m/84'/{coin}'/0'/0/{index}` (BIP-84, P2WPKH)
/// - account ledger: `m/44'/60'/0'/0/{index}` (BIP-44)
pub fn derivation_path(ledger: LedgerId, network: NetworkId, index: u32) -> String {
    match ledger {
        LedgerId::Bitcoin => format!("m/84'/{}'/0'/0/{index}", network.btc().coin_type()),
        LedgerId::Ethereum => format!("m/44'/60'/0'/0/{index}"),
    }
}

struct Secp256k1Key {
    secret: SpendKey,
    public_compressed: [u8; 33],
}

fn derive_secp256k1_key(seed: &[u8], path_str: &str) -> Result<Secp256k1Key, WalletError> {
    let path: DerivationPath = path_str
        .parse()
        .map_err(|e: bip32::Error| WalletError::DerivationFailed(format!("{path_str}: {e}")))?;

    let xprv = XPrv::derive_from_path(seed, &path)
        .map_err(|e| WalletError::DerivationFailed(e.to_string()))?;

    let mut private_key_bytes: [u8; 32] = xprv.to_bytes().into();
    let signing_key = SigningKey::from_bytes(&private_key_bytes.into())
        .map_err(|e| WalletError::DerivationFailed(e.to_string()));
    let secret = SpendKey(private_key_bytes);
    private_key_bytes.zeroize();
    let signing_key = signing_key?;

    let public_compressed: [u8; 33] = signing_key
        .verifying_key()
        .to_sec1_bytes()
        .as_ref()
        .try_into()
        .map_err(|_| WalletError::DerivationFailed("invalid public key length".into()))?;

    Ok(Secp256k1Key {
        secret,
        public_compressed,
    })
}

/// Derives the address and spend key at `index`. Deterministic for a given
/// seed, ledger, network and index.
pub fn derive_address(
    seed: &[u8],
    ledger: LedgerId,
    network: NetworkId,
    index: u32,
) -> Result<DerivedAddress, WalletError> {
    let path = derivation_path(ledger, network, index);
    let key = derive_secp256k1_key(seed, &path)?;

    let address = match ledger {
        LedgerId::Bitcoin => {
            chain_btc::address::pubkey_to_p2wpkh_address(&key.public_compressed, network.btc())?
        }
        LedgerId::Ethereum => {
            chain_eth::address::pubkey_bytes_to_eth_address(&key.public_compressed)?
        }
    };

    Ok(DerivedAddress {
        ledger,
        network,
        address,
        path,
        spend_key: key.secret,
    })
}

/// Checks `candidate` against the ledger's address rules for `network`.
/// Never coerces: a candidate is either accepted as given or rejected.
pub fn validate_address(
    ledger: LedgerId,
    network: NetworkId,
    candidate: &str,
) -> Result<(), WalletError> {
    match ledger {
        LedgerId::Bitcoin => chain_btc::address::validate_address(candidate, network.btc())?,
        LedgerId::Ethereum => chain_eth::address::validate_address(candidate)?,
    }
    Ok(())
}
