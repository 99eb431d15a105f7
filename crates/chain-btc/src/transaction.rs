use bitcoin::absolute::LockTime;
use bitcoin::address::Address;
use bitcoin::hashes::Hash;
use bitcoin::script::ScriptBuf;
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{
    Amount, CompressedPublicKey, OutPoint, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};

use crate::address::parse_for_network;
use crate::error::BtcError;
use crate::network::BtcNetwork;
use crate::utxo::{Selection, SpendRequest, Utxo};

/// Estimated virtual size of a P2WPKH input (in vbytes).
/// Breakdown: 41 bytes non-witness + ~27 witness bytes / 4 = ~68 vbytes per input.
const P2WPKH_INPUT_VBYTES: u64 = 68;

/// Estimated virtual size of any output (in vbytes).
const OUTPUT_VBYTES: u64 = 31;

/// Fixed transaction overhead (in vbytes): version + locktime + segwit marker/flag + counts.
const TX_OVERHEAD_VBYTES: u64 = 11;

/// An unsigned Bitcoin transaction ready for signing.
#[derive(Debug, Clone)]
pub struct UnsignedBtcTx {
    /// The bitcoin transaction with empty witnesses.
    pub tx: Transaction,
    /// The UTXOs being spent (in the same order as the transaction inputs).
    /// Needed for computing sighashes during signing.
    pub prevouts: Vec<TxOut>,
}

/// A signed transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBtcTx {
    pub raw: Vec<u8>,
    pub txid: String,
}

impl SignedBtcTx {
    pub fn raw_hex(&self) -> String {
        hex::encode(&self.raw)
    }
}

/// Estimate the fee for a P2WPKH transaction.
///
/// Computes `estimated_vsize * fee_rate_sat_vbyte` where the vsize is derived
/// from the number of inputs and outputs using P2WPKH weight estimates. A
/// fee that does not fit in a `u64` is an [`BtcError::InvalidAmount`].
pub fn estimate_fee(
    num_inputs: usize,
    num_outputs: usize,
    fee_rate_sat_vbyte: u64,
) -> Result<u64, BtcError> {
    (num_inputs as u64)
        .checked_mul(P2WPKH_INPUT_VBYTES)
        .and_then(|inputs| {
            (num_outputs as u64)
                .checked_mul(OUTPUT_VBYTES)?
                .checked_add(inputs)?
                .checked_add(TX_OVERHEAD_VBYTES)
        })
        .and_then(|vsize| vsize.checked_mul(fee_rate_sat_vbyte))
        .ok_or_else(|| {
            BtcError::InvalidAmount(format!(
                "fee for {num_inputs} inputs and {num_outputs} outputs at \
                 {fee_rate_sat_vbyte} sat/vB overflows"
            ))
        })
}

fn to_input(utxo: &Utxo) -> Result<(TxIn, TxOut), BtcError> {
    let txid: Txid = utxo
        .txid
        .parse()
        .map_err(|e| BtcError::TransactionBuildError(format!("invalid txid: {e}")))?;

    let input = TxIn {
        previous_output: OutPoint::new(txid, utxo.vout),
        script_sig: ScriptBuf::new(), // Empty for segwit.
        sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
        witness: Witness::default(),
    };
    let prevout = TxOut {
        value: Amount::from_sat(utxo.amount_sat),
        script_pubkey: ScriptBuf::from(utxo.script_pubkey.clone()),
    };
    Ok((input, prevout))
}

fn pay(address: &Address, amount_sat: u64) -> TxOut {
    TxOut {
        value: Amount::from_sat(amount_sat),
        script_pubkey: address.script_pubkey(),
    }
}

fn assemble(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs,
        output: outputs,
    }
}

/// Build the single-input transaction described by a [`SpendRequest`].
pub fn build_unsigned(request: &SpendRequest, network: BtcNetwork) -> Result<UnsignedBtcTx, BtcError> {
    let recipient = parse_for_network(&request.pay_to, network, "recipient")?;
    let (input, prevout) = to_input(&request.input)?;

    let mut outputs = vec![pay(&recipient, request.payment_sat)];
    if let Some(change) = &request.change {
        let change_addr = parse_for_network(&change.address, network, "change")?;
        outputs.push(pay(&change_addr, change.amount_sat));
    }

    Ok(UnsignedBtcTx {
        tx: assemble(vec![input], outputs),
        prevouts: vec![prevout],
    })
}

/// Build one transaction spending every UTXO in `selection`.
pub fn build_consolidated(
    selection: &Selection,
    recipient: &str,
    amount_sat: u64,
    change_address: &str,
    network: BtcNetwork,
) -> Result<UnsignedBtcTx, BtcError> {
    let recipient_addr = parse_for_network(recipient, network, "recipient")?;

    let mut inputs = Vec::with_capacity(selection.selected.len());
    let mut prevouts = Vec::with_capacity(selection.selected.len());
    for utxo in &selection.selected {
        let (input, prevout) = to_input(utxo)?;
        inputs.push(input);
        prevouts.push(prevout);
    }

    let mut outputs = vec![pay(&recipient_addr, amount_sat)];
    if let Some(change_sat) = selection.change_sat {
        let change_addr = parse_for_network(change_address, network, "change")?;
        outputs.push(pay(&change_addr, change_sat));
    }

    Ok(UnsignedBtcTx {
        tx: assemble(inputs, outputs),
        prevouts,
    })
}

/// Sign an unsigned P2WPKH transaction with the given private key.
///
/// All inputs are assumed to be controlled by the same key. The private key
/// must be a 32-byte secp256k1 scalar.
pub fn sign_transaction(
    unsigned_tx: &UnsignedBtcTx,
    private_key: &[u8; 32],
) -> Result<SignedBtcTx, BtcError> {
    if unsigned_tx.prevouts.len() != unsigned_tx.tx.input.len() {
        return Err(BtcError::SigningError(format!(
            "{} prevouts for {} inputs",
            unsigned_tx.prevouts.len(),
            unsigned_tx.tx.input.len()
        )));
    }

    let secp = Secp256k1::new();
    let secret_key = SecretKey::from_slice(private_key)
        .map_err(|e| BtcError::InvalidPrivateKey(format!("invalid secret key: {e}")))?;
    let public_key = bitcoin::secp256k1::PublicKey::from_secret_key(&secp, &secret_key);
    let compressed_pk = CompressedPublicKey(public_key);
    let script_code = ScriptBuf::new_p2wpkh(&compressed_pk.wpubkey_hash());

    let mut signed_tx = unsigned_tx.tx.clone();
    let mut sighash_cache = SighashCache::new(&unsigned_tx.tx);

    for (input_index, prevout) in unsigned_tx.prevouts.iter().enumerate() {
        let sighash = sighash_cache
            .p2wpkh_signature_hash(input_index, &script_code, prevout.value, EcdsaSighashType::All)
            .map_err(|e| BtcError::SigningError(format!("sighash computation failed: {e}")))?;

        let msg = Message::from_digest(sighash.to_byte_array());
        let signature = secp.sign_ecdsa(&msg, &secret_key);

        // DER signature followed by the sighash type byte.
        let mut sig_bytes = signature.serialize_der().to_vec();
        sig_bytes.push(EcdsaSighashType::All as u8);

        let mut witness = Witness::new();
        witness.push(&sig_bytes);
        witness.push(public_key.serialize());

        signed_tx.input[input_index].witness = witness;
    }

    Ok(SignedBtcTx {
        raw: bitcoin::consensus::serialize(&signed_tx),
        txid: signed_tx.compute_txid().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utxo::{build_spends, select_consolidated, ChangeOutput};

    const MAINNET_ADDR: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

    fn make_test_utxo(txid: &str, vout: u32, amount_sat: u64) -> Utxo {
        Utxo {
            txid: txid.to_string(),
            vout,
            amount_sat,
            script_pubkey: hex::decode(format!("0014{}", "ab".repeat(20))).unwrap(),
        }
    }

    fn request(change: Option<ChangeOutput>) -> SpendRequest {
        SpendRequest {
            input: make_test_utxo(&"a".repeat(64), 0, 100_000),
            pay_to: MAINNET_ADDR.to_string(),
            payment_sat: 50_000,
            change,
            fee_sat: 141,
        }
    }

    #[test]
    fn estimate_fee_basic() {
        // 1 input, 2 outputs: 11 + 68 + 62 = 141 vbytes at 1 sat/vbyte = 141
        assert_eq!(estimate_fee(1, 2, 1).unwrap(), 141);
    }

    #[test]
    fn estimate_fee_scales_with_inputs() {
        let fee_1 = estimate_fee(1, 2, 10).unwrap();
        let fee_2 = estimate_fee(2, 2, 10).unwrap();
        assert_eq!(fee_2 - fee_1, P2WPKH_INPUT_VBYTES * 10);
    }

    #[test]
    fn estimate_fee_zero_rate() {
        assert_eq!(estimate_fee(5, 5, 0).unwrap(), 0);
    }

    #[test]
    fn estimate_fee_overflow_is_an_error() {
        assert!(matches!(
            estimate_fee(1, 2, u64::MAX),
            Err(BtcError::InvalidAmount(_))
        ));
        assert!(matches!(
            estimate_fee(usize::MAX, 1, 1),
            Err(BtcError::InvalidAmount(_))
        ));
    }

    #[test]
    fn build_request_with_change_has_two_outputs() {
        let req = request(Some(ChangeOutput {
            address: MAINNET_ADDR.to_string(),
            amount_sat: 49_859,
        }));
        let unsigned = build_unsigned(&req, BtcNetwork::Mainnet).unwrap();
        assert_eq!(unsigned.tx.input.len(), 1);
        assert_eq!(unsigned.tx.output.len(), 2);
        assert_eq!(unsigned.tx.output[0].value.to_sat(), 50_000);
        assert_eq!(unsigned.tx.output[1].value.to_sat(), 49_859);
        assert_eq!(unsigned.prevouts[0].value.to_sat(), 100_000);
    }

    #[test]
    fn build_request_without_change_has_one_output() {
        let unsigned = build_unsigned(&request(None), BtcNetwork::Mainnet).unwrap();
        assert_eq!(unsigned.tx.output.len(), 1);
    }

    #[test]
    fn build_rejects_invalid_recipient() {
        let mut req = request(None);
        req.pay_to = "not_a_valid_address".into();
        assert!(matches!(
            build_unsigned(&req, BtcNetwork::Mainnet),
            Err(BtcError::InvalidAddress(_))
        ));
    }

    #[test]
    fn build_rejects_wrong_network() {
        assert!(build_unsigned(&request(None), BtcNetwork::Testnet).is_err());
    }

    #[test]
    fn build_rejects_malformed_txid() {
        let mut req = request(None);
        req.input.txid = "zz".into();
        assert!(matches!(
            build_unsigned(&req, BtcNetwork::Mainnet),
            Err(BtcError::TransactionBuildError(_))
        ));
    }

    #[test]
    fn sign_produces_txid_and_segwit_bytes() {
        let unsigned = build_unsigned(&request(None), BtcNetwork::Mainnet).unwrap();
        let signed = sign_transaction(&unsigned, &[0xcd; 32]).unwrap();
        assert!(signed.raw.len() > 100);
        assert_eq!(signed.txid.len(), 64);
        // version 2, then segwit marker and flag
        assert_eq!(&signed.raw[..6], &[0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(signed.raw_hex(), hex::encode(&signed.raw));
    }

    #[test]
    fn sign_rejects_invalid_key() {
        let unsigned = build_unsigned(&request(None), BtcNetwork::Mainnet).unwrap();
        assert!(matches!(
            sign_transaction(&unsigned, &[0u8; 32]),
            Err(BtcError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn fan_out_plan_builds_and_signs_on_testnet() {
        let secp = Secp256k1::new();
        let secret_key = SecretKey::from_slice(&[0x42; 32]).unwrap();
        let public_key = bitcoin::secp256k1::PublicKey::from_secret_key(&secp, &secret_key);
        let addr = bitcoin::Address::p2wpkh(&CompressedPublicKey(public_key), bitcoin::Network::Testnet)
            .to_string();

        let utxos = vec![
            make_test_utxo(&"ab".repeat(32), 0, 200_000),
            make_test_utxo(&"cd".repeat(32), 1, 80_000),
        ];
        let plan = build_spends(&utxos, 250_000, estimate_fee(1, 2, 2).unwrap(), &addr, &addr).unwrap();
        assert_eq!(plan.len(), 2);

        let mut txids = Vec::new();
        for req in &plan {
            let unsigned = build_unsigned(req, BtcNetwork::Testnet).unwrap();
            let signed = sign_transaction(&unsigned, &[0x42; 32]).unwrap();
            txids.push(signed.txid);
        }
        assert_ne!(txids[0], txids[1]);
    }

    #[test]
    fn consolidated_selection_builds_and_signs() {
        let utxos = vec![
            make_test_utxo(&"a".repeat(64), 0, 30_000),
            make_test_utxo(&"b".repeat(64), 0, 30_000),
        ];
        let selection = select_consolidated(&utxos, 55_000, 1).unwrap();
        let unsigned =
            build_consolidated(&selection, MAINNET_ADDR, 55_000, MAINNET_ADDR, BtcNetwork::Mainnet)
                .unwrap();
        assert_eq!(unsigned.tx.input.len(), 2);
        assert_eq!(unsigned.tx.output.len(), 2);

        let signed = sign_transaction(&unsigned, &[0xcd; 32]).unwrap();
        assert!(signed.raw.len() > 200);
    }
}
