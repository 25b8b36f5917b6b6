//! Source annotator: baseline provenance for locally originated data.

use async_trait::async_trait;

use trust_sdk_core::{Annotation, AnnotationKind, Result};

use crate::annotator::{Annotator, Notary};
use crate::context::AnnotationContext;

/// Always satisfied; records that this host produced these exact bytes.
#[derive(Debug, Clone)]
pub struct SourceAnnotator {
    notary: Notary,
}

impl SourceAnnotator {
    pub fn new(notary: Notary) -> Self {
        Self { notary }
    }
}

#[async_trait]
impl Annotator for SourceAnnotator {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Source
    }

    async fn execute(&self, ctx: &AnnotationContext, data: &[u8]) -> Result<Annotation> {
        ctx.check()?;
        Ok(self.notary.annotate(AnnotationKind::Source, data, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use trust_sdk_core::{Context, Error, HashAlgorithm, MonotonicClock};
    use trust_sdk_testkit::generators::{hash_algorithm, payload};
    use trust_sdk_testkit::TestFixture;

    fn annotator(hash: HashAlgorithm) -> (SourceAnnotator, TestFixture) {
        let fixture = TestFixture::with_seed([1u8; 32]);
        let notary = Notary::new(
            "src-host",
            hash,
            Some(fixture.private.clone()),
            Arc::new(MonotonicClock::new()),
        );
        (SourceAnnotator::new(notary), fixture)
    }

    #[tokio::test]
    async fn test_source_is_satisfied_and_signed() {
        let (annotator, fixture) = annotator(HashAlgorithm::Sha256);
        let ctx = AnnotationContext::default();
        let a = annotator.execute(&ctx, b"foo").await.unwrap();

        assert_eq!(a.kind(), AnnotationKind::Source);
        assert!(a.is_satisfied());
        assert_eq!(
            a.key(),
            "2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae"
        );
        assert_eq!(a.host(), "src-host");
        assert!(a.verify_signature(&fixture.public));
    }

    #[tokio::test]
    async fn test_unsigned_without_key() {
        let notary = Notary::new(
            "h",
            HashAlgorithm::Sha256,
            None,
            Arc::new(MonotonicClock::new()),
        );
        let a = SourceAnnotator::new(notary)
            .execute(&AnnotationContext::default(), b"foo")
            .await
            .unwrap();
        assert!(a.signature().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let (annotator, _) = annotator(HashAlgorithm::Sha256);
        let ctx = Context::background();
        ctx.cancel();
        let result = annotator.execute(&ctx.into(), b"foo").await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    proptest! {
        #[test]
        fn prop_source_key_is_declared_hash(alg in hash_algorithm(), data in payload(1024)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (annotator, _) = annotator(alg);
            let a = rt.block_on(annotator.execute(&AnnotationContext::default(), &data)).unwrap();

            prop_assert!(a.is_satisfied());
            prop_assert_eq!(a.hash(), alg);
            prop_assert_eq!(a.key(), alg.hex_digest(&data));
        }
    }
}
