//! Key material and signature handling.
//!
//! Keys are loaded from [`KeyInfo`] once, validated against their declared
//! algorithm, and then used through pure sign/verify functions.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{KeyInfo, SignatureInfo};
use crate::error::{Error, Result};

/// Signing algorithm families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    Ed25519,
}

impl KeyAlgorithm {
    /// Stable configuration tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            KeyAlgorithm::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ed25519" => Ok(KeyAlgorithm::Ed25519),
            other => Err(Error::UnsupportedAlgorithm(format!("key type {other:?}"))),
        }
    }
}

/// A detached signature.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        hex::decode(s)
            .map(Self)
            .map_err(|e| Error::Serialization(format!("signature hex: {e}")))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Signature({}...)", &hex[..hex.len().min(16)])
    }
}

/// A validated private key.
#[derive(Clone)]
pub enum PrivateKey {
    Ed25519(SigningKey),
}

impl PrivateKey {
    /// Decode raw key bytes for the given algorithm.
    ///
    /// Ed25519 accepts a 32-byte seed, or the 64-byte `seed || public` form
    /// whose public half must match the seed.
    pub fn from_bytes(algorithm: KeyAlgorithm, bytes: &[u8]) -> Result<Self> {
        match algorithm {
            KeyAlgorithm::Ed25519 => match bytes.len() {
                32 => {
                    let mut seed = [0u8; 32];
                    seed.copy_from_slice(bytes);
                    Ok(PrivateKey::Ed25519(SigningKey::from_bytes(&seed)))
                }
                64 => {
                    let mut seed = [0u8; 32];
                    seed.copy_from_slice(&bytes[..32]);
                    let key = SigningKey::from_bytes(&seed);
                    if key.verifying_key().as_bytes()[..] != bytes[32..] {
                        return Err(Error::InvalidKeyConfig(
                            "ed25519 private key: public half does not match seed".into(),
                        ));
                    }
                    Ok(PrivateKey::Ed25519(key))
                }
                n => Err(Error::InvalidKeyConfig(format!(
                    "ed25519 private key must be 32 or 64 bytes, got {n}"
                ))),
            },
        }
    }

    /// Load from configuration.
    pub fn from_key_info(info: &KeyInfo) -> Result<Self> {
        let algorithm = algorithm_of(info)?;
        let bytes = load_material(info)?;
        Self::from_bytes(algorithm, &bytes)
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PrivateKey::Ed25519(_) => KeyAlgorithm::Ed25519,
        }
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Ed25519(key) => PublicKey::Ed25519(key.verifying_key()),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}, {:?})", self.algorithm(), self.public_key())
    }
}

/// A validated public key.
#[derive(Clone, PartialEq, Eq)]
pub enum PublicKey {
    Ed25519(VerifyingKey),
}

impl PublicKey {
    /// Decode raw key bytes for the given algorithm.
    pub fn from_bytes(algorithm: KeyAlgorithm, bytes: &[u8]) -> Result<Self> {
        match algorithm {
            KeyAlgorithm::Ed25519 => {
                let arr: [u8; 32] = bytes.try_into().map_err(|_| {
                    Error::InvalidKeyConfig(format!(
                        "ed25519 public key must be 32 bytes, got {}",
                        bytes.len()
                    ))
                })?;
                let key = VerifyingKey::from_bytes(&arr).map_err(|e| {
                    Error::InvalidKeyConfig(format!("ed25519 public key: {e}"))
                })?;
                Ok(PublicKey::Ed25519(key))
            }
        }
    }

    /// Load from configuration.
    pub fn from_key_info(info: &KeyInfo) -> Result<Self> {
        let algorithm = algorithm_of(info)?;
        let bytes = load_material(info)?;
        Self::from_bytes(algorithm, &bytes)
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PublicKey::Ed25519(_) => KeyAlgorithm::Ed25519,
        }
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        match self {
            PublicKey::Ed25519(key) => hex::encode(key.as_bytes()),
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", &self.to_hex()[..16])
    }
}

/// Sign `payload` with `key`.
pub fn sign(key: &PrivateKey, payload: &[u8]) -> Signature {
    match key {
        PrivateKey::Ed25519(signing_key) => {
            Signature(signing_key.sign(payload).to_bytes().to_vec())
        }
    }
}

/// Verify `signature` over `payload` with `key`.
///
/// Malformed signatures verify as `false`.
pub fn verify(key: &PublicKey, payload: &[u8], signature: &Signature) -> bool {
    match key {
        PublicKey::Ed25519(verifying_key) => {
            let Ok(bytes) = <[u8; 64]>::try_from(signature.as_bytes()) else {
                return false;
            };
            let sig = DalekSignature::from_bytes(&bytes);
            verifying_key.verify(payload, &sig).is_ok()
        }
    }
}

/// Signs and verifies with the keys named by a [`SignatureInfo`].
///
/// Either key may be absent. Keys are loaded and validated when the provider
/// is built, so misconfiguration never waits for the first call.
#[derive(Debug, Clone, Default)]
pub struct SignatureProvider {
    private: Option<PrivateKey>,
    public: Option<PublicKey>,
}

impl SignatureProvider {
    /// Build from configuration.
    ///
    /// Fails with `UnsupportedAlgorithm` for unknown tags and
    /// `InvalidKeyConfig` for bad material or mixed algorithm families.
    pub fn new(info: &SignatureInfo) -> Result<Self> {
        let private = if info.private.is_configured() {
            Some(PrivateKey::from_key_info(&info.private)?)
        } else {
            None
        };
        let public = if info.public.is_configured() {
            Some(PublicKey::from_key_info(&info.public)?)
        } else {
            None
        };

        if let (Some(private), Some(public)) = (&private, &public) {
            if private.algorithm() != public.algorithm() {
                return Err(Error::InvalidKeyConfig(format!(
                    "private key is {} but public key is {}",
                    private.algorithm(),
                    public.algorithm()
                )));
            }
        }

        Ok(Self { private, public })
    }

    /// Build directly from loaded keys.
    pub fn from_keys(private: Option<PrivateKey>, public: Option<PublicKey>) -> Self {
        Self { private, public }
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private.as_ref()
    }

    pub fn public_key(&self) -> Option<&PublicKey> {
        self.public.as_ref()
    }

    pub fn can_sign(&self) -> bool {
        self.private.is_some()
    }

    /// Sign with the configured private key.
    pub fn sign(&self, payload: &[u8]) -> Result<Signature> {
        let key = self
            .private
            .as_ref()
            .ok_or_else(|| Error::InvalidKeyConfig("no private key configured".into()))?;
        Ok(sign(key, payload))
    }

    /// Verify with the configured public key. `false` when none is configured.
    pub fn verify(&self, payload: &[u8], signature: &Signature) -> bool {
        self.public
            .as_ref()
            .is_some_and(|key| verify(key, payload, signature))
    }
}

fn algorithm_of(info: &KeyInfo) -> Result<KeyAlgorithm> {
    if !info.is_configured() {
        return Err(Error::InvalidKeyConfig("key type is not set".into()));
    }
    info.key_type.parse()
}

fn load_material(info: &KeyInfo) -> Result<Vec<u8>> {
    let text = match (&info.key, &info.path) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidKeyConfig(format!("reading key file {}: {e}", path.display()))
        })?,
        (None, None) => {
            return Err(Error::InvalidKeyConfig(format!(
                "{} key has neither inline material nor a path",
                info.key_type
            )))
        }
    };
    hex::decode(text.trim()).map_err(|e| Error::InvalidKeyConfig(format!("key hex: {e}")))
}
