//! Credential Encryption Service
//!
//! Encrypts stored API passwords with AES-256-CBC and authenticates the
//! ciphertext with HMAC-SHA-256, keyed from the site's two auth keys.
//! The on-disk format is `base64(iv || hmac || ciphertext)`.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

const IV_LEN: usize = 16;
const MAC_LEN: usize = 32;
const KEY_LEN: usize = 32;

/// Cypher error
#[derive(Debug, thiserror::Error)]
pub enum CypherError {
    #[error("auth key must be at least {IV_LEN} bytes")]
    AuthKeyTooShort,
    #[error("secure auth key must not be empty")]
    SecureAuthKeyEmpty,
}

/// Site auth keys the cypher derives its material from.
#[derive(Debug, Clone)]
pub struct CypherKeys {
    /// Key the AES key and MAC key are derived from
    pub secure_auth_key: String,
    /// Key the IV is taken from
    pub auth_key: String,
}

impl CypherKeys {
    pub fn new(secure_auth_key: &str, auth_key: &str) -> Self {
        Self {
            secure_auth_key: secure_auth_key.to_string(),
            auth_key: auth_key.to_string(),
        }
    }
}

/// Symmetric cypher for credential storage.
#[derive(Clone)]
pub struct Cypher {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
    /// Full hex digest of the secure auth key, used as the MAC key
    mac_key: String,
}

impl std::fmt::Debug for Cypher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cypher").finish_non_exhaustive()
    }
}

impl Cypher {
    /// Build a cypher from the site auth keys. Key material that is too
    /// short to fill the IV or AES key is rejected up front.
    pub fn new(keys: &CypherKeys) -> Result<Self, CypherError> {
        if keys.secure_auth_key.is_empty() {
            return Err(CypherError::SecureAuthKeyEmpty);
        }
        if keys.auth_key.len() < IV_LEN {
            return Err(CypherError::AuthKeyTooShort);
        }

        // 64 hex chars; the first 32 bytes key the block cipher, the
        // whole digest keys the MAC.
        let mac_key = sha256_hex(&keys.secure_auth_key);

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&mac_key.as_bytes()[..KEY_LEN]);

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&keys.auth_key.as_bytes()[..IV_LEN]);

        Ok(Self { key, iv, mac_key })
    }

    /// Encrypt a credential for storage.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let raw = Aes256CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        let hmac = self.mac(&raw);

        let mut out = Vec::with_capacity(IV_LEN + MAC_LEN + raw.len());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&hmac);
        out.extend_from_slice(&raw);

        BASE64.encode(out)
    }

    /// Decrypt a stored credential. Returns an empty string when the
    /// value cannot be decrypted or fails authentication, never a wrong
    /// plaintext.
    pub fn decrypt(&self, cyphertext: &str) -> String {
        if cyphertext.is_empty() {
            return String::new();
        }

        let decoded = match BASE64.decode(cyphertext) {
            Ok(decoded) => decoded,
            Err(_) => return String::new(),
        };

        if decoded.len() < IV_LEN + MAC_LEN {
            return String::new();
        }

        // The leading IV bytes are part of the storage format; the
        // cipher IV always derives from the auth key.
        let hmac = &decoded[IV_LEN..IV_LEN + MAC_LEN];
        let raw = &decoded[IV_LEN + MAC_LEN..];

        let mut mac = match HmacSha256::new_from_slice(self.mac_key.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(raw);
        if mac.verify_slice(hmac).is_err() {
            return String::new();
        }

        let plaintext = match Aes256CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(raw)
        {
            Ok(plaintext) => plaintext,
            Err(_) => return String::new(),
        };

        String::from_utf8(plaintext).unwrap_or_default()
    }

    fn mac(&self, raw: &[u8]) -> [u8; MAC_LEN] {
        // HMAC accepts keys of any length, so construction cannot fail.
        let mut mac = HmacSha256::new_from_slice(self.mac_key.as_bytes())
            .unwrap_or_else(|_| HmacSha256::new(&Default::default()));
        mac.update(raw);
        mac.finalize().into_bytes().into()
    }
}

/// Lowercase hex SHA-256 digest of a string.
fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
