//! Secret field encryption with AES-256-GCM
//!
//! Secret settings are stored as
//! `encrypted:<nonce-hex>:<tag-hex>:<ciphertext-hex>`, so ciphertext and
//! plaintext can sit side by side in one record and be told apart by prefix.
//!
//! New values use a 16-byte nonce. Values written with a 12-byte nonce
//! still decrypt.
//!
//! Neither direction returns an error: a failure is logged and the input is
//! handed back unchanged.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{Aes256Gcm, AesGcm};
use sha2::{Digest, Sha256};
use shared::models::settings::{SettingValue, SettingsRecord};
use thiserror::Error;
use zeroize::Zeroize;

/// Marks a stored string as ciphertext
pub const ENCRYPTED_PREFIX: &str = "encrypted:";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 16;
const LEGACY_NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Only used when `SETTINGS_ENCRYPTION_KEY` is unset in development
const DEVELOPMENT_KEY: &[u8; KEY_LEN] = b"usmn-dev-only-settings-key-00000";

/// AES-256-GCM with a 16-byte nonce
type Aes256Gcm16 = AesGcm<Aes256, U16>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("value is not in encrypted:<nonce>:<tag>:<ciphertext> form")]
    Malformed,

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("unsupported nonce length: {0}")]
    NonceLength(usize),

    #[error("unsupported tag length: {0}")]
    TagLength(usize),

    #[error("invalid key")]
    InvalidKey,

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed (wrong key or tampered data)")]
    Authentication,

    #[error("decrypted data is not valid UTF-8")]
    Utf8,
}

/// Where the active key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// 64 hex characters, decoded
    Hex,
    /// First 32 bytes of a long secret
    Raw,
    /// SHA-256 of a short secret
    Hashed,
    /// No secret configured; never acceptable outside development
    DevelopmentFallback,
}

/// 32-byte symmetric key, wiped on drop
#[derive(Clone)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
    source: KeySource,
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl DerivedKey {
    pub fn source(&self) -> KeySource {
        self.source
    }

    pub fn is_development(&self) -> bool {
        self.source == KeySource::DevelopmentFallback
    }
}

/// Derive the settings key from the operator secret
pub fn derive_key(secret: Option<&str>) -> DerivedKey {
    let Some(secret) = secret.filter(|s| !s.trim().is_empty()) else {
        tracing::warn!(
            "SETTINGS_ENCRYPTION_KEY is not set, using the development-only key. \
             Secrets stored with it are NOT protected."
        );
        return DerivedKey {
            bytes: *DEVELOPMENT_KEY,
            source: KeySource::DevelopmentFallback,
        };
    };

    let mut bytes = [0u8; KEY_LEN];

    if secret.len() == KEY_LEN * 2 && hex::decode_to_slice(secret, &mut bytes).is_ok() {
        return DerivedKey {
            bytes,
            source: KeySource::Hex,
        };
    }

    let raw = secret.as_bytes();
    if raw.len() >= KEY_LEN {
        bytes.copy_from_slice(&raw[..KEY_LEN]);
        return DerivedKey {
            bytes,
            source: KeySource::Raw,
        };
    }

    bytes.copy_from_slice(&Sha256::digest(raw));
    DerivedKey {
        bytes,
        source: KeySource::Hashed,
    }
}

/// Encrypts and decrypts secret settings values
#[derive(Clone)]
pub struct SecretCodec {
    key: DerivedKey,
}

impl std::fmt::Debug for SecretCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCodec")
            .field("key_source", &self.key.source)
            .finish_non_exhaustive()
    }
}

impl SecretCodec {
    pub fn new(key: DerivedKey) -> Self {
        Self { key }
    }

    pub fn from_secret(secret: Option<&str>) -> Self {
        Self::new(derive_key(secret))
    }

    pub fn key_source(&self) -> KeySource {
        self.key.source
    }

    pub fn is_encrypted(value: &str) -> bool {
        value.starts_with(ENCRYPTED_PREFIX)
    }

    /// Encrypt a plaintext value
    ///
    /// Empty or whitespace-only input is returned as-is.
    pub fn encrypt(&self, plaintext: &str) -> String {
        if plaintext.trim().is_empty() {
            return plaintext.to_string();
        }
        match self.try_encrypt(plaintext) {
            Ok(ciphertext) => ciphertext,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encrypt secret value");
                plaintext.to_string()
            }
        }
    }

    /// Decrypt a stored value
    ///
    /// Plaintext passes through untouched.
    pub fn decrypt(&self, value: &str) -> String {
        if !Self::is_encrypted(value) {
            return value.to_string();
        }
        match self.try_decrypt(value) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::error!(error = %e, "Failed to decrypt secret value");
                value.to_string()
            }
        }
    }

    /// Encrypt the named fields that hold non-empty plaintext strings
    pub fn encrypt_fields(&self, record: &SettingsRecord, fields: &[&str]) -> SettingsRecord {
        let mut out = record.clone();
        for field in fields {
            if let Some(SettingValue::Text(value)) = record.get(*field)
                && !value.is_empty()
                && !Self::is_encrypted(value)
            {
                out.insert(field.to_string(), SettingValue::Text(self.encrypt(value)));
            }
        }
        out
    }

    /// Decrypt the named fields that hold ciphertext
    pub fn decrypt_fields(&self, record: &SettingsRecord, fields: &[&str]) -> SettingsRecord {
        let mut out = record.clone();
        for field in fields {
            if let Some(SettingValue::Text(value)) = record.get(*field)
                && Self::is_encrypted(value)
            {
                out.insert(field.to_string(), SettingValue::Text(self.decrypt(value)));
            }
        }
        out
    }

    fn try_encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let cipher =
            Aes256Gcm16::new_from_slice(&self.key.bytes).map_err(|_| CryptoError::InvalidKey)?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = cipher
            .encrypt_in_place_detached(GenericArray::from_slice(&nonce), b"", &mut buffer)
            .map_err(|_| CryptoError::Encrypt)?;

        Ok(format!(
            "{ENCRYPTED_PREFIX}{}:{}:{}",
            hex::encode(nonce),
            hex::encode(tag),
            hex::encode(&buffer)
        ))
    }

    fn try_decrypt(&self, value: &str) -> Result<String, CryptoError> {
        let body = value
            .strip_prefix(ENCRYPTED_PREFIX)
            .ok_or(CryptoError::Malformed)?;

        let mut parts = body.split(':');
        let (Some(nonce_hex), Some(tag_hex), Some(ciphertext_hex), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::Malformed);
        };

        let nonce = hex::decode(nonce_hex)?;
        let tag = hex::decode(tag_hex)?;
        let mut buffer = hex::decode(ciphertext_hex)?;

        if tag.len() != TAG_LEN {
            return Err(CryptoError::TagLength(tag.len()));
        }

        match nonce.len() {
            NONCE_LEN => open::<Aes256Gcm16>(&self.key.bytes, &nonce, &tag, &mut buffer)?,
            LEGACY_NONCE_LEN => open::<Aes256Gcm>(&self.key.bytes, &nonce, &tag, &mut buffer)?,
            n => return Err(CryptoError::NonceLength(n)),
        }

        String::from_utf8(buffer).map_err(|_| CryptoError::Utf8)
    }
}

/// Caller guarantees nonce and tag lengths match `C`
fn open<C: AeadInPlace + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    tag: &[u8],
    buffer: &mut [u8],
) -> Result<(), CryptoError> {
    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::InvalidKey)?;
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            b"",
            buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| CryptoError::Authentication)
}
