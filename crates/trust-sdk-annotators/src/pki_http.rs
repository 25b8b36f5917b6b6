//! PKI-over-HTTP annotator: the signature arrives as request metadata.

use async_trait::async_trait;
use http::header::HeaderName;
use http::HeaderMap;

use trust_sdk_core::{
    crypto, Annotation, AnnotationKind, Error, HashAlgorithm, PublicKey, Result, Signature,
};

use crate::annotator::{Annotator, Notary};
use crate::context::AnnotationContext;
use crate::request::{CONTENT_HASH, CONTENT_HASH_ALGORITHM, CONTENT_SIGNATURE};

/// Checks the metadata written by [`RequestHandler`](crate::RequestHandler)
/// against the received body.
#[derive(Debug, Clone)]
pub struct PkiHttpAnnotator {
    notary: Notary,
    public_key: PublicKey,
}

impl PkiHttpAnnotator {
    pub fn new(notary: Notary, public_key: PublicKey) -> Self {
        Self { notary, public_key }
    }

    fn check_metadata(&self, headers: &HeaderMap, body: &[u8]) -> Result<bool> {
        let digest = header(headers, &CONTENT_HASH)?;
        let algorithm = header(headers, &CONTENT_HASH_ALGORITHM)?;
        let signature = header(headers, &CONTENT_SIGNATURE)?;

        // Metadata we cannot interpret is a failed check, not a local error.
        let Ok(algorithm) = algorithm.parse::<HashAlgorithm>() else {
            tracing::debug!(algorithm, "unrecognised content hash algorithm");
            return Ok(false);
        };
        let Ok(signature) = Signature::from_hex(signature) else {
            return Ok(false);
        };

        let body_matches = algorithm.hex_digest(body) == digest;
        let signature_valid = crypto::verify(&self.public_key, digest.as_bytes(), &signature);
        Ok(body_matches && signature_valid)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Result<&'a str> {
    headers
        .get(name)
        .ok_or_else(|| Error::MissingSignatureMetadata(format!("header {name} not present")))?
        .to_str()
        .map_err(|_| Error::MissingSignatureMetadata(format!("header {name} is not ASCII")))
}

#[async_trait]
impl Annotator for PkiHttpAnnotator {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::PkiHttp
    }

    async fn execute(&self, ctx: &AnnotationContext, data: &[u8]) -> Result<Annotation> {
        ctx.check()?;
        let headers = ctx.headers().ok_or_else(|| {
            Error::MissingSignatureMetadata("no request metadata in context".into())
        })?;
        let ok = self.check_metadata(headers, data)?;
        Ok(self.notary.annotate(AnnotationKind::PkiHttp, data, ok))
    }
}
