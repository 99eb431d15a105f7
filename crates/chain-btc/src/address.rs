use bitcoin::address::{Address, NetworkUnchecked};
use bitcoin::CompressedPublicKey;

use crate::error::BtcError;
use crate::network::BtcNetwork;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const BECH32_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Derive a P2WPKH (native SegWit bech32) address from a compressed public key.
pub fn pubkey_to_p2wpkh_address(
    pubkey_bytes: &[u8; 33],
    network: BtcNetwork,
) -> Result<String, BtcError> {
    let compressed_pk = CompressedPublicKey::from_slice(pubkey_bytes).map_err(|e| {
        BtcError::InvalidPublicKey(format!("failed to parse compressed public key: {e}"))
    })?;

    Ok(Address::p2wpkh(&compressed_pk, network.to_bitcoin_network()).to_string())
}

/// Check an address against the lexical rules of `network`: required
/// prefix, length, and character set. Does not verify the checksum.
pub fn check_format(address: &str, network: BtcNetwork) -> Result<(), BtcError> {
    let hrp_prefix = format!("{}1", network.bech32_hrp());
    let lower = address.to_ascii_lowercase();

    if lower.starts_with(&hrp_prefix) {
        return check_bech32_format(address, &hrp_prefix);
    }

    let first = address
        .chars()
        .next()
        .ok_or_else(|| BtcError::InvalidAddress("empty address".into()))?;
    if !network.legacy_prefixes().contains(&first) {
        return Err(BtcError::InvalidAddress(format!(
            "'{address}' does not carry a {network} prefix"
        )));
    }
    if !(26..=35).contains(&address.len()) {
        return Err(BtcError::InvalidAddress(format!(
            "base58 address length {} outside 26..=35",
            address.len()
        )));
    }
    if let Some(bad) = address.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
        return Err(BtcError::InvalidAddress(format!(
            "character '{bad}' is not base58"
        )));
    }
    Ok(())
}

fn check_bech32_format(address: &str, hrp_prefix: &str) -> Result<(), BtcError> {
    let has_lower = address.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = address.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(BtcError::InvalidAddress("bech32 address mixes case".into()));
    }

    // 20-byte witness programs and 32-byte witness programs.
    let data_len = address.len() - hrp_prefix.len();
    if data_len != 39 && data_len != 59 {
        return Err(BtcError::InvalidAddress(format!(
            "bech32 address length {} is not a v0/v1 program length",
            address.len()
        )));
    }

    let data = address[hrp_prefix.len()..].to_ascii_lowercase();
    if let Some(bad) = data.chars().find(|c| !BECH32_CHARSET.contains(*c)) {
        return Err(BtcError::InvalidAddress(format!(
            "character '{bad}' is not bech32"
        )));
    }
    Ok(())
}

/// Validate an address for `network`.
///
/// The lexical rule is checked first; the checksum and the encoded network
/// are then verified by the `bitcoin` crate.
pub fn validate_address(address: &str, network: BtcNetwork) -> Result<(), BtcError> {
    check_format(address, network)?;

    let parsed = address
        .parse::<Address<NetworkUnchecked>>()
        .map_err(|e| BtcError::InvalidAddress(format!("failed to parse address: {e}")))?;

    if !parsed.is_valid_for_network(network.to_bitcoin_network()) {
        return Err(BtcError::InvalidAddress(format!(
            "'{address}' is not a {network} address"
        )));
    }
    Ok(())
}

/// Parse an address and require it to belong to `network`.
pub(crate) fn parse_for_network(
    address: &str,
    network: BtcNetwork,
    role: &str,
) -> Result<Address, BtcError> {
    address
        .parse::<Address<NetworkUnchecked>>()
        .map_err(|e| BtcError::InvalidAddress(format!("invalid {role} address: {e}")))?
        .require_network(network.to_bitcoin_network())
        .map_err(|e| BtcError::InvalidAddress(format!("{role} address wrong network: {e}")))
}
