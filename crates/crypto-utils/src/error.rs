use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("key derivation failed: {0}")]
    KdfFailed(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_decryption_failed() {
        let err = CryptoError::DecryptionFailed("tag mismatch".into());
        assert_eq!(err.to_string(), "decryption failed: tag mismatch");
    }

    #[test]
    fn display_kdf_failed() {
        let err = CryptoError::KdfFailed("out of memory".into());
        assert_eq!(err.to_string(), "key derivation failed: out of memory");
    }

    #[test]
    fn display_invalid_input() {
        let err = CryptoError::InvalidInput("salt must be 16 bytes".into());
        assert_eq!(err.to_string(), "invalid input: salt must be 16 bytes");
    }
}
