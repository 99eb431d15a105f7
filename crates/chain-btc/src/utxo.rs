use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::error::BtcError;

/// Outputs at or below this value are not worth creating; they fold into the fee.
pub const DUST_THRESHOLD_SAT: u64 = 546;

/// A single unspent transaction output (UTXO).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    /// Transaction ID as a hex string (big-endian / display order).
    pub txid: String,
    /// Output index within the transaction.
    pub vout: u32,
    /// Value in satoshis.
    pub amount_sat: u64,
    /// The locking script (scriptPubKey) serialized bytes.
    pub script_pubkey: Vec<u8>,
}

/// Change returned to the wallet by a spend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeOutput {
    pub address: String,
    pub amount_sat: u64,
}

/// One transaction of a fan-out payment: spends exactly one UTXO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendRequest {
    pub input: Utxo,
    pub pay_to: String,
    pub payment_sat: u64,
    pub change: Option<ChangeOutput>,
    pub fee_sat: u64,
}

impl SpendRequest {
    /// Sum of every output plus the fee; always equals the input value.
    pub fn outputs_plus_fee(&self) -> u64 {
        self.payment_sat + self.change.as_ref().map_or(0, |c| c.amount_sat) + self.fee_sat
    }
}

/// Descending by value; ties by txid then vout ascending so plans are
/// reproducible for the same input set.
fn by_value_desc(a: &Utxo, b: &Utxo) -> Ordering {
    b.amount_sat
        .cmp(&a.amount_sat)
        .then_with(|| a.txid.cmp(&b.txid))
        .then_with(|| a.vout.cmp(&b.vout))
}

/// Plan a payment of `target_sat` as one single-input transaction per UTXO.
///
/// UTXOs are consumed largest first. Each charges `flat_fee_sat`; a UTXO not
/// worth more than the fee is skipped. The UTXO that crosses the target pays
/// the remainder and returns the rest (minus fee) to `change_to`.
///
/// Nothing is returned unless the full target is covered. Payment or change
/// outputs can come out at or below [`DUST_THRESHOLD_SAT`]; they are still
/// planned and logged at `warn`, and nodes may refuse to relay them.
pub fn build_spends(
    utxos: &[Utxo],
    target_sat: u64,
    flat_fee_sat: u64,
    pay_to: &str,
    change_to: &str,
) -> Result<Vec<SpendRequest>, BtcError> {
    if target_sat == 0 {
        return Err(BtcError::InvalidAmount("payment amount must be positive".into()));
    }

    let mut sorted: Vec<&Utxo> = utxos.iter().collect();
    sorted.sort_by(|a, b| by_value_desc(a, b));

    let mut remainder = target_sat;
    let mut requests = Vec::new();

    for utxo in sorted {
        if remainder == 0 {
            break;
        }
        if utxo.amount_sat <= flat_fee_sat {
            debug!(
                txid = %utxo.txid,
                vout = utxo.vout,
                value = utxo.amount_sat,
                fee = flat_fee_sat,
                "skipping utxo that cannot cover its own fee"
            );
            continue;
        }

        let net = utxo.amount_sat - flat_fee_sat;
        if net <= remainder {
            requests.push(SpendRequest {
                input: utxo.clone(),
                pay_to: pay_to.to_string(),
                payment_sat: net,
                change: None,
                fee_sat: flat_fee_sat,
            });
            remainder -= net;
        } else {
            requests.push(SpendRequest {
                input: utxo.clone(),
                pay_to: pay_to.to_string(),
                payment_sat: remainder,
                change: Some(ChangeOutput {
                    address: change_to.to_string(),
                    amount_sat: net - remainder,
                }),
                fee_sat: flat_fee_sat,
            });
            remainder = 0;
        }
    }

    if remainder > 0 {
        let available = utxos
            .iter()
            .map(|u| u.amount_sat.saturating_sub(flat_fee_sat))
            .fold(0u64, u64::saturating_add);
        return Err(BtcError::InsufficientFunds {
            needed: target_sat,
            available,
        });
    }

    for request in &requests {
        let change_sat = request.change.as_ref().map(|c| c.amount_sat);
        if request.payment_sat <= DUST_THRESHOLD_SAT
            || change_sat.is_some_and(|c| c <= DUST_THRESHOLD_SAT)
        {
            warn!(
                txid = %request.input.txid,
                vout = request.input.vout,
                payment = request.payment_sat,
                change = ?change_sat,
                dust = DUST_THRESHOLD_SAT,
                "spend creates a dust output"
            );
        }
    }

    debug!(
        transactions = requests.len(),
        target = target_sat,
        "planned per-output spends"
    );
    Ok(requests)
}

/// Result of consolidated selection: several inputs feeding one transaction.
#[derive(Debug, Clone)]
pub struct Selection {
    /// The selected UTXOs, largest first.
    pub selected: Vec<Utxo>,
    /// Total value of the selected UTXOs in satoshis.
    pub total_sat: u64,
    /// Fee charged by the transaction, including any folded dust change.
    pub fee_sat: u64,
    /// Change above the dust threshold, if any.
    pub change_sat: Option<u64>,
}

/// Select UTXOs to cover `target_sat` plus estimated fees in one transaction.
///
/// Largest-first. The fee is computed for a P2WPKH transaction with the
/// selected input count and two outputs; change at or below
/// [`DUST_THRESHOLD_SAT`] is dropped and the single-output fee is charged
/// plus the dropped change.
pub fn select_consolidated(
    utxos: &[Utxo],
    target_sat: u64,
    fee_rate_sat_vbyte: u64,
) -> Result<Selection, BtcError> {
    if target_sat == 0 {
        return Err(BtcError::InvalidAmount("payment amount must be positive".into()));
    }
    if utxos.is_empty() {
        return Err(BtcError::InsufficientFunds {
            needed: target_sat,
            available: 0,
        });
    }

    let mut sorted: Vec<&Utxo> = utxos.iter().collect();
    sorted.sort_by(|a, b| by_value_desc(a, b));

    let mut selected: Vec<Utxo> = Vec::new();
    let mut total_sat: u64 = 0;

    for utxo in sorted {
        selected.push(utxo.clone());
        total_sat = total_sat.saturating_add(utxo.amount_sat);

        let fee_two = crate::transaction::estimate_fee(selected.len(), 2, fee_rate_sat_vbyte)?;
        if total_sat >= target_sat.saturating_add(fee_two) {
            let change = total_sat - target_sat - fee_two;
            let (fee_sat, change_sat) = if change > DUST_THRESHOLD_SAT {
                (fee_two, Some(change))
            } else {
                // Single output: everything above the payment goes to the fee.
                (total_sat - target_sat, None)
            };
            return Ok(Selection {
                selected,
                total_sat,
                fee_sat,
                change_sat,
            });
        }

        // A single-output transaction might still fit without change.
        let fee_one = crate::transaction::estimate_fee(selected.len(), 1, fee_rate_sat_vbyte)?;
        if total_sat >= target_sat.saturating_add(fee_one) {
            return Ok(Selection {
                selected,
                fee_sat: total_sat - target_sat,
                total_sat,
                change_sat: None,
            });
        }
    }

    let fee = crate::transaction::estimate_fee(selected.len(), 1, fee_rate_sat_vbyte)?;
    Err(BtcError::InsufficientFunds {
        needed: target_sat.saturating_add(fee),
        available: total_sat,
    })
}
