//! PKI annotator: data carries its own signature.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use trust_sdk_core::{
    crypto, Annotation, AnnotationKind, Error, KeyInfo, PrivateKey, PublicKey, Result, Signature,
};

use crate::annotator::{Annotator, Notary};
use crate::context::AnnotationContext;

/// A JSON document pairing content with a hex signature over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signable {
    pub seed: String,
    pub signature: String,
}

impl Signable {
    /// Sign `seed` with `key`.
    pub fn new(seed: impl Into<String>, key: &PrivateKey) -> Self {
        let seed = seed.into();
        let signature = crypto::sign(key, seed.as_bytes()).to_hex();
        Self { seed, signature }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Whether the signature covers `seed` under `key`. Malformed signatures
    /// do not verify.
    pub fn verify(&self, key: &PublicKey) -> bool {
        match Signature::from_hex(&self.signature) {
            Ok(sig) => crypto::verify(key, self.seed.as_bytes(), &sig),
            Err(_) => false,
        }
    }
}

/// Verifies the signature embedded in a [`Signable`] payload.
#[derive(Debug, Clone)]
pub struct PkiAnnotator {
    notary: Notary,
    public_key: PublicKey,
}

impl PkiAnnotator {
    pub fn new(notary: Notary, public_key: PublicKey) -> Self {
        Self { notary, public_key }
    }

    /// Load the verification key, mapping any problem with it to
    /// `InvalidKeyConfig`.
    pub fn load_public_key(info: &KeyInfo) -> Result<PublicKey> {
        PublicKey::from_key_info(info).map_err(|e| match e {
            e @ Error::InvalidKeyConfig(_) => e,
            other => Error::InvalidKeyConfig(other.to_string()),
        })
    }
}

#[async_trait]
impl Annotator for PkiAnnotator {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Pki
    }

    async fn execute(&self, ctx: &AnnotationContext, data: &[u8]) -> Result<Annotation> {
        ctx.check()?;
        let signable = Signable::from_bytes(data)?;
        let ok = signable.verify(&self.public_key);
        Ok(self.notary.annotate(AnnotationKind::Pki, data, ok))
    }
}
