use thiserror::Error;

/// Account-ledger operation errors.
#[derive(Debug, Error)]
pub enum EthError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("checksum mismatch for address {0}")]
    InvalidChecksum(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("invalid network: {0}")]
    InvalidNetwork(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_address() {
        let err = EthError::InvalidAddress("bad length".into());
        assert_eq!(err.to_string(), "invalid address: bad length");
    }

    #[test]
    fn display_invalid_checksum() {
        let err = EthError::InvalidChecksum("0xAbC".into());
        assert_eq!(err.to_string(), "checksum mismatch for address 0xAbC");
    }

    #[test]
    fn display_encoding_error() {
        let err = EthError::EncodingError("rlp overflow".into());
        assert_eq!(err.to_string(), "encoding error: rlp overflow");
    }

    #[test]
    fn display_invalid_network() {
        let err = EthError::InvalidNetwork("moon".into());
        assert_eq!(err.to_string(), "invalid network: moon");
    }

    #[test]
    fn error_trait_is_implemented() {
        let err: Box<dyn std::error::Error> =
            Box::new(EthError::InvalidPrivateKey("test".into()));
        assert!(err.to_string().contains("test"));
    }
}
