//! Signing seam. The defaults sign in-process with the derived spend key;
//! hosts holding keys elsewhere provide their own implementations.

use chain_btc::transaction::UnsignedBtcTx;
use chain_eth::transaction::EthTransaction;

use crate::derivation::SpendKey;
use crate::error::WalletError;
use crate::types::{LedgerId, SignedTransaction};

pub trait UtxoSigner: Send + Sync {
    fn sign(&self, tx: &UnsignedBtcTx, key: &SpendKey) -> Result<SignedTransaction, WalletError>;
}

pub trait AccountSigner: Send + Sync {
    fn sign(&self, tx: &EthTransaction, key: &SpendKey) -> Result<SignedTransaction, WalletError>;
}

/// P2WPKH witness signing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalUtxoSigner;

impl UtxoSigner for LocalUtxoSigner {
    fn sign(&self, tx: &UnsignedBtcTx, key: &SpendKey) -> Result<SignedTransaction, WalletError> {
        let signed = chain_btc::transaction::sign_transaction(tx, key.as_bytes())?;
        Ok(SignedTransaction {
            ledger: LedgerId::Bitcoin,
            raw: signed.raw,
            hash: Some(signed.txid),
        })
    }
}

/// EIP-1559 signing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAccountSigner;

impl AccountSigner for LocalAccountSigner {
    fn sign(&self, tx: &EthTransaction, key: &SpendKey) -> Result<SignedTransaction, WalletError> {
        let signed = chain_eth::transaction::sign_transaction(tx, key.as_bytes())?;
        Ok(SignedTransaction {
            ledger: LedgerId::Ethereum,
            raw: signed.raw_tx,
            hash: Some(signed.tx_hash),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_btc::utxo::{ChangeOutput, SpendRequest, Utxo};
    use chain_eth::transaction::{build_transfer, Eip1559Fees, TRANSFER_GAS};

    use crate::derivation::derive_address;
    use crate::mnemonic::SeedMaterial;
    use crate::types::NetworkId;

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn key_for(ledger: LedgerId) -> crate::derivation::DerivedAddress {
        let seed = SeedMaterial::parse(PHRASE).unwrap().to_seed().unwrap();
        derive_address(seed.as_bytes(), ledger, NetworkId::Main, 0).unwrap()
    }

    #[test]
    fn utxo_signer_produces_segwit_bytes() {
        let derived = key_for(LedgerId::Bitcoin);
        let request = SpendRequest {
            input: Utxo {
                txid: "aa".repeat(32),
                vout: 1,
                amount_sat: 100_000,
                script_pubkey: vec![0x00, 0x14, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x00, 0x11, 0x22, 0x33, 0x44],
            },
            pay_to: "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4".into(),
            payment_sat: 50_000,
            change: Some(ChangeOutput {
                address: derived.address.clone(),
                amount_sat: 49_000,
            }),
            fee_sat: 1_000,
        };
        let unsigned =
            chain_btc::transaction::build_unsigned(&request, NetworkId::Main.btc()).unwrap();

        let signed = LocalUtxoSigner.sign(&unsigned, &derived.spend_key).unwrap();
        assert_eq!(signed.ledger, LedgerId::Bitcoin);
        // version 2, then segwit marker and flag
        assert_eq!(&signed.raw[..6], &[0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(signed.hash.unwrap().len(), 64);
    }

    #[test]
    fn account_signer_produces_typed_envelope() {
        let derived = key_for(LedgerId::Ethereum);
        let fees = Eip1559Fees {
            max_priority_fee_per_gas: 1_000_000_000,
            max_fee_per_gas: 30_000_000_000,
        };
        let tx = build_transfer(
            1,
            0,
            "0x000000000000000000000000000000000000dEaD",
            1_000,
            fees,
            TRANSFER_GAS,
        )
        .unwrap();

        let signed = LocalAccountSigner.sign(&tx, &derived.spend_key).unwrap();
        assert_eq!(signed.ledger, LedgerId::Ethereum);
        assert_eq!(signed.raw[0], 0x02);
        let hash = signed.hash.unwrap();
        assert!(hash.starts_with("0x"));
        assert_eq!(hash.len(), 66);
    }
}
