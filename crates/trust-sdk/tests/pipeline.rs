//! End-to-end: configuration in, published batches out.

use proptest::prelude::*;
use tracing::Span;

use trust_sdk::{
    AnnotationContext, AnnotationKind, Context, Error, HashAlgorithm, MockStreamProvider,
    RequestHandler, Sdk, SdkInfo, StreamInfo,
};
use trust_sdk_testkit::TestFixture;

async fn connected(info: SdkInfo) -> (Sdk, MockStreamProvider) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mock = MockStreamProvider::default();
    let sdk = Sdk::with_provider(info, Box::new(mock.clone()), Span::none()).unwrap();
    sdk.bootstrap(&Context::background()).await.unwrap();
    (sdk, mock)
}

#[tokio::test]
async fn test_create_publishes_one_batch() {
    let fixture = TestFixture::new();
    let (sdk, mock) = connected(fixture.sdk_info(&["src", "pki"])).await;
    let data = fixture.signable("foo");

    let batch = sdk.create(&AnnotationContext::default(), &data).await.unwrap();

    let published = mock.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0], batch);
    assert_eq!(batch.len(), 2);
    for a in &batch {
        assert!(a.is_satisfied());
        assert_eq!(a.host(), "test-host");
        assert!(a.matches_data(&data));
        assert!(a.verify_signature(&fixture.public));
    }
    assert_eq!(batch[0].kind(), AnnotationKind::Source);
    assert_eq!(batch[1].kind(), AnnotationKind::Pki);
}

#[tokio::test]
async fn test_forged_payload_is_published_unsatisfied() {
    let fixture = TestFixture::new();
    let (sdk, mock) = connected(fixture.sdk_info(&["pki"])).await;

    let batch = sdk
        .transit(&AnnotationContext::default(), &fixture.forged_signable("foo", "bar"))
        .await
        .unwrap();

    assert_eq!(batch.len(), 1);
    assert!(!batch[0].is_satisfied());
    assert_eq!(mock.published().len(), 1);
}

#[tokio::test]
async fn test_mutate_batch_shape() {
    let fixture = TestFixture::new();
    let (sdk, mock) = connected(fixture.sdk_info(&["src", "pki"])).await;
    let old = b"raw reading".to_vec();
    let new = fixture.signable("calibrated reading");

    let batch = sdk
        .mutate(&AnnotationContext::default(), &old, &new)
        .await
        .unwrap();

    assert_eq!(batch.len(), 3);
    assert_eq!(batch[0].kind(), AnnotationKind::Source);
    assert!(batch[0].matches_data(&old));
    assert!(batch[1..].iter().all(|a| a.matches_data(&new)));
    assert_eq!(mock.published(), vec![batch]);
}

#[tokio::test]
async fn test_every_action_publishes_separately() {
    let fixture = TestFixture::new();
    let (sdk, mock) = connected(fixture.sdk_info(&["src"])).await;
    let ctx = AnnotationContext::default();

    sdk.create(&ctx, b"a").await.unwrap();
    sdk.transit(&ctx, b"b").await.unwrap();
    sdk.publish(&ctx, b"c").await.unwrap();
    sdk.close().await.unwrap();

    let published = mock.published();
    assert_eq!(published.len(), 3);
    let timestamps: Vec<_> = published.iter().map(|b| b[0].timestamp()).collect();
    assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
    assert!(!mock.is_connected());
}

#[tokio::test]
async fn test_signed_request_round_trip() {
    let sender = TestFixture::new();
    let (sdk, _) = connected(sender.sdk_info(&["pki-http", "src"])).await;

    let request = http::Request::post("/ingest")
        .body(b"payload".to_vec())
        .unwrap();
    let request = RequestHandler::new(request, &sender.signature_info())
        .unwrap()
        .into_signed()
        .unwrap();
    let ctx = AnnotationContext::for_request(Context::background(), &request);

    let batch = sdk.create(&ctx, request.body()).await.unwrap();
    assert_eq!(batch[0].kind(), AnnotationKind::PkiHttp);
    assert!(batch[0].is_satisfied());
}

#[tokio::test]
async fn test_delivery_failure_is_returned() {
    let fixture = TestFixture::new();
    let mock = MockStreamProvider::failing();
    let sdk = Sdk::with_provider(fixture.sdk_info(&["src"]), Box::new(mock), Span::none()).unwrap();
    sdk.bootstrap(&Context::background()).await.unwrap();

    let err = sdk
        .create(&AnnotationContext::default(), b"foo")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DeliveryFailed { .. }));
}

#[tokio::test]
async fn test_cancelled_call() {
    let fixture = TestFixture::new();
    let (sdk, mock) = connected(fixture.sdk_info(&["src"])).await;
    let ctx = Context::background();
    ctx.cancel();

    let result = sdk.create(&AnnotationContext::new(ctx), b"foo").await;
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(mock.published().is_empty());
}

#[test]
fn test_configuration_errors_surface_at_construction() {
    let fixture = TestFixture::new();

    let mut info = fixture.sdk_info(&["src"]);
    info.stream = StreamInfo {
        stream_type: "invalid".into(),
        ..Default::default()
    };
    assert!(matches!(
        Sdk::new(info, Span::none()),
        Err(Error::UnknownStreamType(_))
    ));

    let info = fixture.sdk_info(&["src", "invalid"]);
    assert!(matches!(
        Sdk::new(info, Span::none()),
        Err(Error::UnknownAnnotatorType(_))
    ));
}

#[test]
fn test_sdk_from_json_config() {
    let fixture = TestFixture::new();
    let json = format!(
        r#"{{
            "host": "edge-7",
            "hash": "blake3",
            "signature": {{"private": {{"type": "ed25519", "key": "{}"}}}},
            "annotators": ["src"],
            "stream": {{"type": "mock", "config": {{"simulateFailure": false}}}}
        }}"#,
        fixture.private_hex()
    );
    let info = SdkInfo::from_json(&json).unwrap();
    assert_eq!(info.hash, HashAlgorithm::Blake3);

    let sdk = Sdk::new(info, Span::none()).unwrap();
    assert_eq!(sdk.annotators().count(), 1);
    assert_eq!(sdk.provider().stream_type(), trust_sdk::StreamType::Mock);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_source_annotation_fingerprints_payload(
        data in proptest::collection::vec(any::<u8>(), 0..512)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let fixture = TestFixture::new();
        let batch = rt.block_on(async {
            let (sdk, _) = connected(fixture.sdk_info(&["src"])).await;
            sdk.create(&AnnotationContext::default(), &data).await.unwrap()
        });

        prop_assert_eq!(batch.len(), 1);
        prop_assert_eq!(batch[0].key(), HashAlgorithm::Sha256.hex_digest(&data));
        prop_assert!(batch[0].verify_signature(&fixture.public));
    }
}
