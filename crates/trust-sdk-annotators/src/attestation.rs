//! Platform attestation: the collaborator seam and the identity-binding
//! annotator built on it.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use trust_sdk_core::{Annotation, AnnotationKind, Error, Result};

use crate::annotator::{Annotator, Notary};
use crate::context::AnnotationContext;

/// Outcome of asking the platform for a quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Whether the platform produced a quote that passed its own checks.
    pub valid: bool,
    /// Identity of the device that produced the quote, when known.
    pub device_id: Option<String>,
}

/// Source of platform quotes (a TPM driver, a remote attestation service).
///
/// Implementations return `AttestationUnavailable` when they cannot be
/// reached; that is never reported as a failed quote.
#[async_trait]
pub trait AttestationProvider: Send + Sync {
    async fn quote(&self, nonce: &[u8]) -> Result<Quote>;
}

/// Probes well-known TPM device nodes.
///
/// A present device node yields a valid quote identified by its path. No
/// device node at all is a negative result; any other I/O failure means the
/// platform could not be asked.
#[derive(Debug, Clone)]
pub struct DeviceAttestor {
    paths: Vec<PathBuf>,
}

impl DeviceAttestor {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl AttestationProvider for DeviceAttestor {
    async fn quote(&self, _nonce: &[u8]) -> Result<Quote> {
        for path in &self.paths {
            match tokio::fs::metadata(path).await {
                Ok(_) => {
                    return Ok(Quote {
                        valid: true,
                        device_id: Some(path.display().to_string()),
                    })
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(Error::AttestationUnavailable(format!(
                        "{}: {e}",
                        path.display()
                    )))
                }
            }
        }
        Ok(Quote {
            valid: false,
            device_id: None,
        })
    }
}

/// Ask `provider` for a quote over `data`, honouring the context.
pub(crate) async fn request_quote(
    provider: &dyn AttestationProvider,
    notary: &Notary,
    ctx: &AnnotationContext,
    data: &[u8],
) -> Result<Quote> {
    ctx.check()?;
    let nonce = notary.hash().digest(data);
    ctx.ctx().run(provider.quote(&nonce)).await
}

/// Attestation bound to a specific device identity.
///
/// Satisfied only when the quote is valid and, if an expected device id is
/// configured, the quote came from that device.
#[derive(Clone)]
pub struct AttestationAnnotator {
    notary: Notary,
    provider: Arc<dyn AttestationProvider>,
    expected_device_id: Option<String>,
}

impl AttestationAnnotator {
    pub fn new(
        notary: Notary,
        provider: Arc<dyn AttestationProvider>,
        expected_device_id: Option<String>,
    ) -> Self {
        Self {
            notary,
            provider,
            expected_device_id,
        }
    }
}

#[async_trait]
impl Annotator for AttestationAnnotator {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Attestation
    }

    async fn execute(&self, ctx: &AnnotationContext, data: &[u8]) -> Result<Annotation> {
        let quote = request_quote(self.provider.as_ref(), &self.notary, ctx, data).await?;
        let bound = match &self.expected_device_id {
            Some(expected) => quote.device_id.as_deref() == Some(expected.as_str()),
            None => true,
        };
        Ok(self
            .notary
            .annotate(AnnotationKind::Attestation, data, quote.valid && bound))
    }
}
