use alloy_primitives::U256;

use crate::abi::{decode_word, encode_function_call, AbiParam};
use crate::address::parse_address;
use crate::error::EthError;

/// Function selector for `transfer(address,uint256)`.
const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Function selector for `balanceOf(address)`.
const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// Gas limit used when a token transfer cannot be estimated.
pub const DEFAULT_TRANSFER_GAS: u64 = 65_000;

/// Encodes an ERC-20 `transfer(address,uint256)` call.
pub fn encode_transfer(to: &str, amount: U256) -> Result<Vec<u8>, EthError> {
    let addr = parse_address(to)?;
    let params = [AbiParam::Address(addr), AbiParam::Uint256(amount)];
    Ok(encode_function_call(TRANSFER_SELECTOR, &params))
}

/// Encodes an ERC-20 `balanceOf(address)` call.
pub fn encode_balance_of(owner: &str) -> Result<Vec<u8>, EthError> {
    let addr = parse_address(owner)?;
    Ok(encode_function_call(BALANCE_OF_SELECTOR, &[AbiParam::Address(addr)]))
}

/// Decodes a `balanceOf` (or any single-uint256) return value.
pub fn decode_uint256(data: &[u8]) -> Result<U256, EthError> {
    decode_word(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEAD: &str = "0x000000000000000000000000000000000000dEaD";

    #[test]
    fn transfer_layout() {
        let data = encode_transfer(DEAD, U256::from(100u64)).unwrap();
        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &TRANSFER_SELECTOR);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(data[34], 0xde);
        assert_eq!(data[35], 0xad);
        assert_eq!(data[67], 0x64);
        assert_eq!(&data[36..67], &[0u8; 31]);
    }

    #[test]
    fn transfer_one_token_with_18_decimals() {
        let one = U256::from(1_000_000_000_000_000_000u64);
        let data = encode_transfer("0xdead000000000000000000000000000000000000", one).unwrap();

        assert_eq!(hex::encode(&data[..4]), "a9059cbb");
        assert!(hex::encode(&data[4..36]).starts_with("000000000000000000000000dead"));
        assert!(hex::encode(&data[36..68]).ends_with("0de0b6b3a7640000"));
    }

    #[test]
    fn transfer_rejects_bad_recipient() {
        assert!(encode_transfer("not-an-address", U256::ZERO).is_err());
    }

    #[test]
    fn balance_of_layout() {
        let data = encode_balance_of(DEAD).unwrap();
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &BALANCE_OF_SELECTOR);
    }

    #[test]
    fn decode_balance() {
        let mut data = [0u8; 32];
        data[30] = 0x01;
        assert_eq!(decode_uint256(&data).unwrap(), U256::from(256u64));
    }
}
