//! TLS annotator: did the data arrive over an acceptable TLS session?

use async_trait::async_trait;

use trust_sdk_core::{Annotation, AnnotationKind, Error, Result, TlsPolicy};

use crate::annotator::{Annotator, Notary};
use crate::context::{AnnotationContext, TlsInfo};

#[derive(Debug, Clone)]
pub struct TlsAnnotator {
    notary: Notary,
    policy: TlsPolicy,
}

impl TlsAnnotator {
    pub fn new(notary: Notary, policy: TlsPolicy) -> Self {
        Self { notary, policy }
    }

    fn meets_policy(&self, tls: &TlsInfo) -> bool {
        tls.handshake_complete
            && tls.version >= self.policy.min_version
            && (!self.policy.require_peer_certificate || !tls.peer_certificates.is_empty())
    }
}

#[async_trait]
impl Annotator for TlsAnnotator {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Tls
    }

    async fn execute(&self, ctx: &AnnotationContext, data: &[u8]) -> Result<Annotation> {
        ctx.check()?;
        let tls = ctx.tls().ok_or(Error::NoTlsContext)?;
        let ok = self.meets_policy(tls);
        Ok(self.notary.annotate(AnnotationKind::Tls, data, ok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::tests::notary;
    use trust_sdk_core::{Context, TlsVersion};

    fn session(version: TlsVersion, with_cert: bool) -> TlsInfo {
        TlsInfo {
            version,
            handshake_complete: true,
            peer_certificates: if with_cert { vec![vec![0x30, 0x82]] } else { vec![] },
            server_name: Some("ingest.local".into()),
        }
    }

    async fn run(policy: TlsPolicy, tls: Option<TlsInfo>) -> Result<Annotation> {
        let mut ctx = AnnotationContext::new(Context::background());
        if let Some(tls) = tls {
            ctx = ctx.with_tls(tls);
        }
        TlsAnnotator::new(notary(), policy).execute(&ctx, b"foo").await
    }

    #[tokio::test]
    async fn test_modern_session_with_certificate() {
        let a = run(TlsPolicy::default(), Some(session(TlsVersion::Tls13, true)))
            .await
            .unwrap();
        assert_eq!(a.kind(), AnnotationKind::Tls);
        assert!(a.is_satisfied());
    }

    #[tokio::test]
    async fn test_old_protocol_fails_policy() {
        let a = run(TlsPolicy::default(), Some(session(TlsVersion::Tls11, true)))
            .await
            .unwrap();
        assert!(!a.is_satisfied());
    }

    #[tokio::test]
    async fn test_missing_certificate() {
        let strict = run(TlsPolicy::default(), Some(session(TlsVersion::Tls12, false)))
            .await
            .unwrap();
        assert!(!strict.is_satisfied());

        let lenient = TlsPolicy {
            require_peer_certificate: false,
            ..TlsPolicy::default()
        };
        let a = run(lenient, Some(session(TlsVersion::Tls12, false)))
            .await
            .unwrap();
        assert!(a.is_satisfied());
    }

    #[tokio::test]
    async fn test_incomplete_handshake() {
        let mut tls = session(TlsVersion::Tls13, true);
        tls.handshake_complete = false;
        let a = run(TlsPolicy::default(), Some(tls)).await.unwrap();
        assert!(!a.is_satisfied());
    }

    #[tokio::test]
    async fn test_no_tls_context_is_an_error() {
        let result = run(TlsPolicy::default(), None).await;
        assert!(matches!(result, Err(Error::NoTlsContext)));
    }
}
