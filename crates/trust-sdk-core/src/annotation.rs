//! Annotation: the atomic trust record.
//!
//! An annotation states whether one trust property held for one unit of data.
//! It is immutable once built; a changed assessment is a new annotation.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use uuid::Uuid;

use crate::canonical::signing_bytes;
use crate::crypto::{self, PrivateKey, PublicKey, Signature};
use crate::error::Error;
use crate::hash::HashAlgorithm;

/// The annotator variant that produced an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    #[serde(rename = "src")]
    Source,
    #[serde(rename = "pki")]
    Pki,
    #[serde(rename = "pki-http")]
    PkiHttp,
    #[serde(rename = "tpm")]
    Tpm,
    #[serde(rename = "tls")]
    Tls,
    #[serde(rename = "attestation")]
    Attestation,
}

impl AnnotationKind {
    /// Kinds that can be selected by tag in the SDK configuration.
    pub const CONFIGURABLE: [AnnotationKind; 5] = [
        AnnotationKind::Pki,
        AnnotationKind::PkiHttp,
        AnnotationKind::Source,
        AnnotationKind::Tpm,
        AnnotationKind::Tls,
    ];

    /// Stable wire tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            AnnotationKind::Source => "src",
            AnnotationKind::Pki => "pki",
            AnnotationKind::PkiHttp => "pki-http",
            AnnotationKind::Tpm => "tpm",
            AnnotationKind::Tls => "tls",
            AnnotationKind::Attestation => "attestation",
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "src" => Ok(AnnotationKind::Source),
            "pki" => Ok(AnnotationKind::Pki),
            "pki-http" => Ok(AnnotationKind::PkiHttp),
            "tpm" => Ok(AnnotationKind::Tpm),
            "tls" => Ok(AnnotationKind::Tls),
            "attestation" => Ok(AnnotationKind::Attestation),
            other => Err(Error::UnknownAnnotatorType(other.to_string())),
        }
    }
}

/// A signed trust record.
///
/// The JSON form of this struct is the wire contract with downstream
/// consumers: field names are stable and only `signature` may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    id: Uuid,
    key: String,
    hash: HashAlgorithm,
    host: String,
    kind: AnnotationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    is_satisfied: bool,
    timestamp: DateTime<Utc>,
}

impl Annotation {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Hex digest of the annotated data.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Algorithm that produced [`Annotation::key`].
    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    /// Hex signature over [`Annotation::signing_bytes`], if signed.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn is_satisfied(&self) -> bool {
        self.is_satisfied
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The message covered by the signature.
    pub fn signing_bytes(&self) -> Vec<u8> {
        signing_bytes(self)
    }

    /// Check the signature against `key`. Unsigned annotations never verify.
    pub fn verify_signature(&self, key: &PublicKey) -> bool {
        let Some(hex_sig) = &self.signature else {
            return false;
        };
        match Signature::from_hex(hex_sig) {
            Ok(sig) => crypto::verify(key, &self.signing_bytes(), &sig),
            Err(_) => false,
        }
    }

    /// Whether `data` hashes to this annotation's key under its declared
    /// algorithm.
    pub fn matches_data(&self, data: &[u8]) -> bool {
        self.hash.hex_digest(data) == self.key
    }
}

/// Builder for annotations.
#[derive(Debug, Clone)]
pub struct AnnotationBuilder {
    kind: AnnotationKind,
    hash: HashAlgorithm,
    host: String,
    key: String,
    is_satisfied: bool,
    timestamp: Option<DateTime<Utc>>,
}

impl AnnotationBuilder {
    pub fn new(kind: AnnotationKind, hash: HashAlgorithm, host: impl Into<String>) -> Self {
        Self {
            kind,
            hash,
            host: host.into(),
            key: String::new(),
            is_satisfied: false,
            timestamp: None,
        }
    }

    /// Derive the key from the annotated bytes.
    pub fn data(mut self, data: &[u8]) -> Self {
        self.key = self.hash.hex_digest(data);
        self
    }

    pub fn satisfied(mut self, is_satisfied: bool) -> Self {
        self.is_satisfied = is_satisfied;
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Build an unsigned annotation with a fresh id.
    pub fn build(self) -> Annotation {
        Annotation {
            id: Uuid::new_v4(),
            key: self.key,
            hash: self.hash,
            host: self.host,
            kind: self.kind,
            signature: None,
            is_satisfied: self.is_satisfied,
            timestamp: self.timestamp.unwrap_or_else(now_millis),
        }
    }

    /// Build and sign over the canonical encoding.
    pub fn sign(self, key: &PrivateKey) -> Annotation {
        let mut annotation = self.build();
        let sig = crypto::sign(key, &annotation.signing_bytes());
        annotation.signature = Some(sig.to_hex());
        annotation
    }

    /// Sign when a key is given, otherwise build unsigned.
    pub fn finish(self, key: Option<&PrivateKey>) -> Annotation {
        match key {
            Some(key) => self.sign(key),
            None => self.build(),
        }
    }
}

/// Hands out non-decreasing millisecond timestamps for one host.
///
/// Wall clocks can step backwards; annotations from one host must not.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> DateTime<Utc> {
        let now = now_millis();
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let stamp = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }
}

fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(now)
}
