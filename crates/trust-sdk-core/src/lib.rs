//! # Trust SDK Core
//!
//! Pure primitives for the Trust SDK: key material, signatures, content
//! hashes, and the [`Annotation`] record with its canonical encoding.
//!
//! ## Key Types
//!
//! - [`Annotation`] - A signed statement that one trust property held for one
//!   unit of data
//! - [`SignatureProvider`] - Validated signing/verification keys
//! - [`HashAlgorithm`] - Hash-agile content fingerprints
//! - [`SdkInfo`] / [`StreamInfo`] - Configuration consumed by the SDK
//! - [`Context`] - Cancellation and deadlines for suspending calls
//!
//! ## Canonicalization
//!
//! Annotations are signed over deterministic CBOR. See [`canonical`].

pub mod annotation;
pub mod canonical;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod hash;

pub use annotation::{Annotation, AnnotationBuilder, AnnotationKind, MonotonicClock};
pub use canonical::signing_bytes;
pub use config::{
    Endpoint, KeyInfo, LedgerConfig, MockConfig, MqttConfig, SdkInfo, SignatureInfo,
    StreamConfig, StreamInfo, TlsPolicy, TlsVersion, TpmConfig,
};
pub use context::Context;
pub use crypto::{KeyAlgorithm, PrivateKey, PublicKey, Signature, SignatureProvider};
pub use error::{Error, Result};
pub use hash::HashAlgorithm;
