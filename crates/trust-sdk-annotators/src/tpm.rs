//! TPM annotator: is this data produced on a platform with a working TPM?

use std::sync::Arc;

use async_trait::async_trait;

use trust_sdk_core::{Annotation, AnnotationKind, Result};

use crate::annotator::{Annotator, Notary};
use crate::attestation::{request_quote, AttestationProvider};
use crate::context::AnnotationContext;

#[derive(Clone)]
pub struct TpmAnnotator {
    notary: Notary,
    provider: Arc<dyn AttestationProvider>,
}

impl TpmAnnotator {
    pub fn new(notary: Notary, provider: Arc<dyn AttestationProvider>) -> Self {
        Self { notary, provider }
    }
}

#[async_trait]
impl Annotator for TpmAnnotator {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Tpm
    }

    async fn execute(&self, ctx: &AnnotationContext, data: &[u8]) -> Result<Annotation> {
        let quote = request_quote(self.provider.as_ref(), &self.notary, ctx, data).await?;
        Ok(self.notary.annotate(AnnotationKind::Tpm, data, quote.valid))
    }
}
