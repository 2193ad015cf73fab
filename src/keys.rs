use aes_gcm_siv::{
    aead::{Aead, KeyInit},
    Aes256GcmSiv, Nonce,
};
use log::{debug, info};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::KeyError;

const KEY_BITS: usize = 2048;
const KDF_ROUNDS: u32 = 100_000;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// A generated asymmetric pair. The private half only ever touches disk
/// wrapped under the sealing cipher.
pub struct KeyPair {
    pub public_key: RsaPublicKey,
    pub private_key: RsaPrivateKey,
}

/// On-disk form of the private key: PKCS#8 DER sealed with AES-256-GCM-SIV
/// under a password-derived key.
#[derive(Serialize, Deserialize, Debug)]
struct SealedKey {
    salt: Vec<u8>,
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
}

/// Generates, persists, and loads the key pair for one distributing
/// identity, and performs the OAEP encrypt/decrypt primitives the rest of
/// the protocol builds on.
pub struct KeyManager {
    key_dir: PathBuf,
    identity: String,
}

impl KeyManager {
    pub fn new(key_dir: impl Into<PathBuf>, identity: impl Into<String>) -> Self {
        KeyManager {
            key_dir: key_dir.into(),
            identity: identity.into(),
        }
    }

    fn private_path(&self) -> PathBuf {
        self.key_dir.join(format!("{}_private.key", self.identity))
    }

    fn public_path(&self) -> PathBuf {
        self.key_dir.join(format!("{}_public.pem", self.identity))
    }

    /// Creates a fresh pair and persists both halves, overwriting any prior
    /// pair for this identity. Rotation keeps no history.
    pub fn generate(&self, password: &str) -> Result<KeyPair, KeyError> {
        info!("generating {}-bit key pair for `{}`", KEY_BITS, self.identity);
        let private_key = RsaPrivateKey::new(&mut OsRng, KEY_BITS)?;
        let public_key = RsaPublicKey::from(&private_key);

        let der = private_key
            .to_pkcs8_der()
            .map_err(|e| self.corrupt(format!("PKCS#8 encoding failed: {}", e)))?;

        let mut salt = vec![0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut nonce = vec![0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let cipher = Aes256GcmSiv::new_from_slice(&derive_seal_key(password, &salt))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), der.as_bytes())
            .map_err(|e| self.corrupt(format!("sealing failed: {}", e)))?;

        let sealed = SealedKey {
            salt,
            nonce,
            ciphertext,
        };
        fs::create_dir_all(&self.key_dir)?;
        let encoded = bincode::serialize(&sealed)
            .map_err(|e| self.corrupt(format!("serialization failed: {}", e)))?;
        write_replacing(&self.private_path(), &encoded)?;

        let pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| self.corrupt(format!("PEM encoding failed: {}", e)))?;
        write_replacing(&self.public_path(), pem.as_bytes())?;

        debug!(
            "persisted key pair under {} (public digest {})",
            self.key_dir.display(),
            hex::encode(&Sha256::digest(pem.as_bytes())[..8]),
        );
        Ok(KeyPair {
            public_key,
            private_key,
        })
    }

    /// Unseals the persisted private key. An authentication failure on the
    /// sealing cipher means the password is wrong; anything unparseable
    /// before or after that point means the material is corrupt.
    pub fn load_private(&self, password: &str) -> Result<KeyPair, KeyError> {
        let raw = self.read_key_file(&self.private_path())?;
        let sealed: SealedKey = bincode::deserialize(&raw)
            .map_err(|e| self.corrupt(format!("unreadable sealed key: {}", e)))?;
        if sealed.salt.len() != SALT_LEN || sealed.nonce.len() != NONCE_LEN {
            return Err(self.corrupt(format!(
                "sealed key carries a {}-byte salt and {}-byte nonce",
                sealed.salt.len(),
                sealed.nonce.len()
            )));
        }

        let cipher = Aes256GcmSiv::new_from_slice(&derive_seal_key(password, &sealed.salt))?;
        let der = cipher
            .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_ref())
            .map_err(|_| KeyError::WrongPassword {
                identity: self.identity.clone(),
            })?;

        let private_key = RsaPrivateKey::from_pkcs8_der(&der)
            .map_err(|e| self.corrupt(format!("unsealed key is not PKCS#8: {}", e)))?;
        let public_key = RsaPublicKey::from(&private_key);
        Ok(KeyPair {
            public_key,
            private_key,
        })
    }

    /// The persisted public half, for handing to a distributing peer.
    pub fn load_public(&self) -> Result<RsaPublicKey, KeyError> {
        let pem = self.public_key_pem()?;
        RsaPublicKey::from_public_key_pem(&pem)
            .map_err(|e| self.corrupt(format!("bad public key PEM: {}", e)))
    }

    pub fn public_key_pem(&self) -> Result<String, KeyError> {
        let raw = self.read_key_file(&self.public_path())?;
        String::from_utf8(raw).map_err(|e| self.corrupt(format!("public key not UTF-8: {}", e)))
    }

    /// Direct OAEP encryption under the recipient's public key. Bounded by
    /// the modulus minus padding overhead; oversized plaintext is rejected,
    /// never truncated.
    pub fn encrypt(&self, plaintext: &[u8], recipient: &RsaPublicKey) -> Result<Vec<u8>, KeyError> {
        let max = max_plaintext_len(recipient);
        if plaintext.len() > max {
            return Err(KeyError::PayloadTooLarge {
                len: plaintext.len(),
                max,
            });
        }
        let ciphertext = recipient.encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)?;
        Ok(ciphertext)
    }

    /// OAEP decryption with the persisted private key. Bit-level corruption
    /// surfaces as `CorruptCiphertext`; garbage is never returned.
    pub fn decrypt(&self, ciphertext: &[u8], password: &str) -> Result<Vec<u8>, KeyError> {
        let pair = self.load_private(password)?;
        pair.private_key
            .decrypt(Oaep::new::<Sha256>(), ciphertext)
            .map_err(|_| KeyError::CorruptCiphertext)
    }

    /// OAEP encryption in as many blocks as the plaintext needs. For
    /// artifacts like the order metadata, whose length grows with the worker
    /// count and can exceed the single-call bound.
    pub fn encrypt_blocks(
        &self,
        plaintext: &[u8],
        recipient: &RsaPublicKey,
    ) -> Result<Vec<u8>, KeyError> {
        let max = max_plaintext_len(recipient);
        let mut ciphertext = Vec::with_capacity(plaintext.len().div_ceil(max) * recipient.size());
        for chunk in plaintext.chunks(max) {
            let block = recipient.encrypt(&mut OsRng, Oaep::new::<Sha256>(), chunk)?;
            ciphertext.extend_from_slice(&block);
        }
        Ok(ciphertext)
    }

    /// Counterpart of `encrypt_blocks`. Each block is one modulus in size;
    /// a stream that is empty, ragged, or corrupt anywhere fails whole.
    pub fn decrypt_blocks(&self, ciphertext: &[u8], password: &str) -> Result<Vec<u8>, KeyError> {
        let pair = self.load_private(password)?;
        let block_len = pair.private_key.size();
        if ciphertext.is_empty() || ciphertext.len() % block_len != 0 {
            return Err(KeyError::CorruptCiphertext);
        }
        let mut plaintext = Vec::new();
        for block in ciphertext.chunks(block_len) {
            let part = pair
                .private_key
                .decrypt(Oaep::new::<Sha256>(), block)
                .map_err(|_| KeyError::CorruptCiphertext)?;
            plaintext.extend_from_slice(&part);
        }
        Ok(plaintext)
    }

    fn read_key_file(&self, path: &Path) -> Result<Vec<u8>, KeyError> {
        match fs::read(path) {
            Ok(raw) => Ok(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(KeyError::NotFound {
                identity: self.identity.clone(),
            }),
            Err(e) => Err(KeyError::Io(e)),
        }
    }

    fn corrupt(&self, reason: String) -> KeyError {
        KeyError::Corrupt {
            identity: self.identity.clone(),
            reason,
        }
    }
}

/// Largest plaintext OAEP-SHA-256 can carry under this key: modulus bytes
/// minus two digests minus two.
pub fn max_plaintext_len(key: &RsaPublicKey) -> usize {
    key.size() - 2 * Sha256::output_size() - 2
}

fn derive_seal_key(password: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, KDF_ROUNDS, &mut key);
    key
}

// write to a sibling tmp file and rename so a crash cannot leave a
// half-written key behind
fn write_replacing(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}
