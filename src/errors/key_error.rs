use thiserror::Error;

/// Failures in key-pair lifecycle and direct RSA encryption/decryption.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("no key pair found for identity `{identity}`")]
    NotFound { identity: String },

    #[error("wrong password for identity `{identity}`")]
    WrongPassword { identity: String },

    #[error("persisted key material for `{identity}` is corrupt: {reason}")]
    Corrupt { identity: String, reason: String },

    /// Direct RSA-OAEP encryption is bounded by the key modulus minus the
    /// padding overhead. Callers must never pass oversized plaintext.
    #[error("plaintext of {len} bytes exceeds the {max}-byte bound for direct encryption")]
    PayloadTooLarge { len: usize, max: usize },

    /// Decryption rejected the ciphertext. Reaching this after reassembly
    /// means a fragment was substituted, truncated, or stitched at a wrong
    /// boundary; garbage plaintext is never returned instead.
    #[error("ciphertext failed to decrypt; corrupt or incorrectly reassembled")]
    CorruptCiphertext,

    #[error("RSA error: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("invalid key length: {0}")]
    InvalidLength(#[from] crypto_common::InvalidLength),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
