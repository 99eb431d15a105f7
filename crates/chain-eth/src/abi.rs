//! Minimal ABI encoding for contract calls with static 32-byte arguments.

use alloy_primitives::U256;

use crate::error::EthError;

/// A single ABI-encoded parameter.
#[derive(Debug, Clone)]
pub enum AbiParam {
    /// A 20-byte address, left-padded to 32 bytes.
    Address([u8; 20]),
    /// A 256-bit unsigned integer, big-endian.
    Uint256(U256),
}

/// Encodes `selector || word(params[0]) || word(params[1]) || ...`.
pub fn encode_function_call(selector: [u8; 4], params: &[AbiParam]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + params.len() * 32);
    data.extend_from_slice(&selector);

    for param in params {
        data.extend_from_slice(&encode_param(param));
    }

    data
}

fn encode_param(param: &AbiParam) -> [u8; 32] {
    match param {
        AbiParam::Address(addr) => {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(addr);
            word
        }
        AbiParam::Uint256(value) => value.to_be_bytes::<32>(),
    }
}

/// Decodes the first 32-byte word of return data as a uint256.
pub fn decode_word(data: &[u8]) -> Result<U256, EthError> {
    if data.len() < 32 {
        return Err(EthError::EncodingError(format!(
            "expected at least 32 bytes for uint256, got {}",
            data.len()
        )));
    }
    Ok(U256::from_be_slice(&data[..32]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_address_param() {
        let mut addr = [0u8; 20];
        addr[0] = 0xde;
        addr[19] = 0xad;

        let word = encode_param(&AbiParam::Address(addr));
        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], &addr);
    }

    #[test]
    fn encode_uint256_param_is_big_endian() {
        let word = encode_param(&AbiParam::Uint256(U256::from(0x0102u64)));
        assert_eq!(word[30], 0x01);
        assert_eq!(word[31], 0x02);
        assert_eq!(&word[..30], &[0u8; 30]);
    }

    #[test]
    fn selector_only_call() {
        let selector = [0xa9, 0x05, 0x9c, 0xbb];
        assert_eq!(encode_function_call(selector, &[]), selector.to_vec());
    }

    #[test]
    fn call_with_two_params_is_68_bytes() {
        let selector = [0xa9, 0x05, 0x9c, 0xbb];
        let mut addr = [0u8; 20];
        addr[19] = 0x01;

        let params = [AbiParam::Address(addr), AbiParam::Uint256(U256::from(100u64))];
        let data = encode_function_call(selector, &params);

        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &selector);
        assert_eq!(data[35], 0x01);
        assert_eq!(data[67], 100);
    }

    #[test]
    fn decode_word_reads_first_32_bytes() {
        let mut data = vec![0u8; 64];
        data[31] = 42;
        data[63] = 99;
        assert_eq!(decode_word(&data).unwrap(), U256::from(42u64));
    }

    #[test]
    fn decode_word_too_short() {
        assert!(decode_word(&[0u8; 16]).is_err());
    }
}
