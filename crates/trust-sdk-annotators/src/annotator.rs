//! The annotator contract and the shared record-building state.

use std::sync::Arc;

use async_trait::async_trait;

use trust_sdk_core::{
    Annotation, AnnotationBuilder, AnnotationKind, HashAlgorithm, MonotonicClock, PrivateKey,
    Result, SdkInfo,
};

use crate::context::AnnotationContext;

/// A strategy that checks one trust property of some data and records the
/// outcome as an [`Annotation`].
///
/// Implementations are stateless with respect to calls and may be invoked
/// concurrently. A failed check is an annotation with `is_satisfied = false`;
/// an `Err` means the check could not be carried out.
#[async_trait]
pub trait Annotator: Send + Sync {
    /// The kind recorded on every annotation this annotator produces.
    fn kind(&self) -> AnnotationKind;

    /// Annotate `data`.
    ///
    /// Returns `Cancelled`/`Timeout` without doing any work when the context
    /// is already done.
    async fn execute(&self, ctx: &AnnotationContext, data: &[u8]) -> Result<Annotation>;
}

/// Host identity, hash choice, signing key and clock shared by the
/// annotators of one SDK instance.
#[derive(Debug, Clone)]
pub struct Notary {
    host: String,
    hash: HashAlgorithm,
    key: Option<PrivateKey>,
    clock: Arc<MonotonicClock>,
}

impl Notary {
    pub fn new(
        host: impl Into<String>,
        hash: HashAlgorithm,
        key: Option<PrivateKey>,
        clock: Arc<MonotonicClock>,
    ) -> Self {
        Self {
            host: host.into(),
            hash,
            key,
            clock,
        }
    }

    /// Load the signing key named by `cfg` (if any). The public key is not
    /// touched here.
    pub fn from_sdk_info(cfg: &SdkInfo, clock: Arc<MonotonicClock>) -> Result<Self> {
        let private = &cfg.signature.private;
        let key = if private.is_configured() {
            Some(PrivateKey::from_key_info(private)?)
        } else {
            None
        };
        Ok(Self::new(cfg.host.clone(), cfg.hash, key, clock))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn signs(&self) -> bool {
        self.key.is_some()
    }

    pub fn signing_key(&self) -> Option<&PrivateKey> {
        self.key.as_ref()
    }

    /// Build the record for `data`, signed when a key is configured.
    pub fn annotate(&self, kind: AnnotationKind, data: &[u8], is_satisfied: bool) -> Annotation {
        let annotation = AnnotationBuilder::new(kind, self.hash, self.host.clone())
            .data(data)
            .satisfied(is_satisfied)
            .timestamp(self.clock.now())
            .finish(self.key.as_ref());

        tracing::debug!(
            id = %annotation.id(),
            kind = %kind,
            satisfied = is_satisfied,
            signed = annotation.signature().is_some(),
            "annotation created"
        );
        annotation
    }
}
