//! AES-256-GCM authenticated encryption.
//!
//! Every message gets a fresh random 96-bit IV which is bound into the
//! cipher as the GCM nonce. Optional additional authenticated data is mixed
//! into the tag, so a payload sealed under one AAD cannot be opened under
//! another.
//!
//! ## Usage
//!
//! ```rust
//! use bitebase_common::crypto::CipherService;
//!
//! let key = CipherService::generate_key();
//! let cipher = CipherService::new(&key)?.with_aad(b"BiteBase".to_vec());
//!
//! let sealed = cipher.encrypt_to_string("4111 1111 1111 1111")?;
//! assert_eq!(cipher.decrypt_from_string(&sealed)?, "4111 1111 1111 1111");
//! # Ok::<(), bitebase_common::error::CommonError>(())
//! ```

use std::fmt;
use std::str::FromStr;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CommonError, CommonResult};

/// Key length in bytes for AES-256
pub const KEY_LEN: usize = 32;
/// IV (GCM nonce) length in bytes
pub const IV_LEN: usize = 12;
/// Authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// Sealed message split into its IV, tag and ciphertext.
///
/// The string form is `ivHex:tagHex:ciphertextHex`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    pub iv: [u8; IV_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl fmt::Display for SealedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", hex::encode(self.iv), hex::encode(self.tag), hex::encode(&self.ciphertext))
    }
}

impl FromStr for SealedPayload {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(iv), Some(tag), Some(ciphertext), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CommonError::encoding("expected ivHex:tagHex:ciphertextHex"));
        };

        let iv: [u8; IV_LEN] = hex::decode(iv)?
            .try_into()
            .map_err(|_| CommonError::encoding(format!("IV must be {IV_LEN} bytes")))?;
        let tag: [u8; TAG_LEN] = hex::decode(tag)?
            .try_into()
            .map_err(|_| CommonError::encoding(format!("tag must be {TAG_LEN} bytes")))?;

        Ok(Self { iv, tag, ciphertext: hex::decode(ciphertext)? })
    }
}

/// AES-256-GCM cipher with a fixed key and AAD.
#[derive(Clone)]
pub struct CipherService {
    cipher: Aes256Gcm,
    aad: Vec<u8>,
}

impl fmt::Debug for CipherService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherService")
            .field("key", &"[REDACTED]")
            .field("aad_len", &self.aad.len())
            .finish()
    }
}

impl CipherService {
    /// Create a cipher from a raw 32-byte key.
    pub fn new(key: &[u8]) -> CommonResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CommonError::crypto(format!(
                "Encryption key must be exactly {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CommonError::crypto(format!("Failed to create cipher: {e}")))?;
        Ok(Self { cipher, aad: Vec::new() })
    }

    /// Create a cipher from a 64-character hex key.
    pub fn from_hex(key_hex: &str) -> CommonResult<Self> {
        let key = hex::decode(key_hex.trim())?;
        Self::new(&key)
    }

    /// Bind `aad` into every tag produced or checked by this cipher.
    #[must_use]
    pub fn with_aad(mut self, aad: Vec<u8>) -> Self {
        self.aad = aad;
        self
    }

    /// Generate a random 32-byte key.
    pub fn generate_key() -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Seal `plaintext` under a fresh random IV.
    pub fn encrypt(&self, plaintext: &[u8]) -> CommonResult<SealedPayload> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let mut sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&iv), Payload { msg: plaintext, aad: &self.aad })
            .map_err(|e| CommonError::crypto(format!("Encryption failed: {e}")))?;

        // aes-gcm appends the tag to the ciphertext
        let split = sealed.len().saturating_sub(TAG_LEN);
        let tag: [u8; TAG_LEN] = sealed[split..]
            .try_into()
            .map_err(|_| CommonError::crypto("Cipher output is shorter than the tag"))?;
        sealed.truncate(split);

        Ok(SealedPayload { iv, tag, ciphertext: sealed })
    }

    /// Open a sealed payload, failing if any part was tampered with.
    pub fn decrypt(&self, payload: &SealedPayload) -> CommonResult<Vec<u8>> {
        let mut combined = Vec::with_capacity(payload.ciphertext.len() + TAG_LEN);
        combined.extend_from_slice(&payload.ciphertext);
        combined.extend_from_slice(&payload.tag);

        self.cipher
            .decrypt(Nonce::from_slice(&payload.iv), Payload { msg: &combined, aad: &self.aad })
            .map_err(|_| CommonError::crypto("Decryption failed: authentication tag mismatch"))
    }

    /// Seal UTF-8 text into the `ivHex:tagHex:ciphertextHex` form.
    pub fn encrypt_to_string(&self, plaintext: &str) -> CommonResult<String> {
        Ok(self.encrypt(plaintext.as_bytes())?.to_string())
    }

    /// Open the `ivHex:tagHex:ciphertextHex` form back into text.
    pub fn decrypt_from_string(&self, sealed: &str) -> CommonResult<String> {
        let payload: SealedPayload = sealed.parse()?;
        let plaintext = self.decrypt(&payload)?;
        String::from_utf8(plaintext)
            .map_err(|e| CommonError::encoding(format!("Decrypted data is not UTF-8: {e}")))
    }
}
