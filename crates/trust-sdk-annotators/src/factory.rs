//! Builds annotators from configuration tags.

use std::sync::Arc;

use trust_sdk_core::{
    AnnotationKind, Error, MonotonicClock, PublicKey, Result, SdkInfo, TlsPolicy, TpmConfig,
};

use crate::annotator::{Annotator, Notary};
use crate::attestation::{AttestationAnnotator, AttestationProvider, DeviceAttestor};
use crate::pki::PkiAnnotator;
use crate::pki_http::PkiHttpAnnotator;
use crate::source::SourceAnnotator;
use crate::tls::TlsAnnotator;
use crate::tpm::TpmAnnotator;

/// Builds annotators that share one host identity, signing key and clock.
///
/// The signing key is loaded when the factory is created. A public key that
/// cannot be loaded only fails the tags that verify with it.
#[derive(Clone)]
pub struct AnnotatorFactory {
    notary: Notary,
    public_key: Option<PublicKey>,
    public_key_error: Option<String>,
    tls: TlsPolicy,
    tpm: TpmConfig,
    tags: Vec<String>,
    attestor: Arc<dyn AttestationProvider>,
}

impl AnnotatorFactory {
    /// A factory with its own clock.
    pub fn new(cfg: &SdkInfo) -> Result<Self> {
        Self::with_clock(cfg, Arc::new(MonotonicClock::new()))
    }

    /// A factory stamping annotations from `clock`.
    pub fn with_clock(cfg: &SdkInfo, clock: Arc<MonotonicClock>) -> Result<Self> {
        let notary = Notary::from_sdk_info(cfg, clock)?;

        // Only the verifying annotators need a public key; remember why it is
        // unusable so they can fail with a precise message.
        let (public_key, public_key_error) = if cfg.signature.public.is_configured() {
            match PkiAnnotator::load_public_key(&cfg.signature.public) {
                Ok(key) => (Some(key), None),
                Err(e) => (None, Some(e.to_string())),
            }
        } else {
            (None, Some("public key type is not set".to_string()))
        };

        if let (Some(private), Some(public)) = (notary.signing_key(), &public_key) {
            if private.algorithm() != public.algorithm() {
                return Err(Error::InvalidKeyConfig(format!(
                    "private key is {} but public key is {}",
                    private.algorithm(),
                    public.algorithm()
                )));
            }
        }

        Ok(Self {
            notary,
            public_key,
            public_key_error,
            tls: cfg.tls,
            tpm: cfg.tpm.clone(),
            tags: cfg.annotators.clone(),
            attestor: Arc::new(DeviceAttestor::new(cfg.tpm.device_paths.clone())),
        })
    }

    /// Replace the default device-node attestor.
    pub fn with_attestor(mut self, attestor: Arc<dyn AttestationProvider>) -> Self {
        self.attestor = attestor;
        self
    }

    /// Build the annotator for one configuration tag.
    ///
    /// Recognised tags are `pki`, `pki-http`, `src`, `tpm` and `tls`; anything
    /// else fails with `UnknownAnnotatorType`.
    pub fn build(&self, tag: &str) -> Result<Box<dyn Annotator>> {
        let kind: AnnotationKind = tag.parse()?;
        let notary = self.notary.clone();
        let annotator: Box<dyn Annotator> = match kind {
            AnnotationKind::Source => Box::new(SourceAnnotator::new(notary)),
            AnnotationKind::Pki => Box::new(PkiAnnotator::new(notary, self.require_public_key()?)),
            AnnotationKind::PkiHttp => {
                Box::new(PkiHttpAnnotator::new(notary, self.require_public_key()?))
            }
            AnnotationKind::Tpm => Box::new(TpmAnnotator::new(notary, self.attestor.clone())),
            AnnotationKind::Tls => Box::new(TlsAnnotator::new(notary, self.tls)),
            AnnotationKind::Attestation => {
                return Err(Error::UnknownAnnotatorType(tag.to_string()));
            }
        };
        tracing::debug!(kind = %kind, "annotator built");
        Ok(annotator)
    }

    /// The source annotator, which needs no configuration beyond the notary.
    pub fn source(&self) -> SourceAnnotator {
        SourceAnnotator::new(self.notary.clone())
    }

    /// Build the identity-bound attestation annotator, which is not
    /// selectable by tag.
    pub fn attestation(&self) -> AttestationAnnotator {
        AttestationAnnotator::new(
            self.notary.clone(),
            self.attestor.clone(),
            self.tpm.expected_device_id.clone(),
        )
    }

    /// Build every configured annotator, in configuration order.
    pub fn build_all(&self) -> Result<Vec<Box<dyn Annotator>>> {
        self.tags.iter().map(|tag| self.build(tag)).collect()
    }

    fn require_public_key(&self) -> Result<PublicKey> {
        self.public_key.clone().ok_or_else(|| {
            Error::InvalidKeyConfig(
                self.public_key_error
                    .clone()
                    .unwrap_or_else(|| "public key unavailable".to_string()),
            )
        })
    }
}

/// Build a single annotator for `tag` from `cfg`.
pub fn new_annotator(tag: &str, cfg: &SdkInfo) -> Result<Box<dyn Annotator>> {
    AnnotatorFactory::new(cfg)?.build(tag)
}
