//! Proptest generators for property-based testing.

use proptest::prelude::*;

use trust_sdk_core::{
    Annotation, AnnotationBuilder, AnnotationKind, HashAlgorithm, KeyAlgorithm, PrivateKey,
};

/// Generate a random Ed25519 private key.
pub fn private_key() -> impl Strategy<Value = PrivateKey> {
    any::<[u8; 32]>().prop_map(|seed| match PrivateKey::from_bytes(KeyAlgorithm::Ed25519, &seed) {
        Ok(key) => key,
        Err(e) => panic!("32-byte ed25519 seed rejected: {e}"),
    })
}

/// Generate a supported hash algorithm.
pub fn hash_algorithm() -> impl Strategy<Value = HashAlgorithm> {
    prop_oneof![
        Just(HashAlgorithm::Sha256),
        Just(HashAlgorithm::Sha512),
        Just(HashAlgorithm::Blake3),
    ]
}

/// Generate any annotation kind.
pub fn annotation_kind() -> impl Strategy<Value = AnnotationKind> {
    prop_oneof![
        Just(AnnotationKind::Source),
        Just(AnnotationKind::Pki),
        Just(AnnotationKind::PkiHttp),
        Just(AnnotationKind::Tpm),
        Just(AnnotationKind::Tls),
        Just(AnnotationKind::Attestation),
    ]
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a host name.
pub fn host() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,31}".prop_map(String::from)
}

/// Generate an annotator tag outside the recognised set.
pub fn unknown_annotator_tag() -> impl Strategy<Value = String> {
    "[a-z-]{1,12}".prop_filter("recognised tag", |s| {
        !matches!(s.as_str(), "pki" | "pki-http" | "src" | "tpm" | "tls")
    })
}

/// Parameters for generating an annotation.
#[derive(Debug, Clone)]
pub struct AnnotationParams {
    pub key: PrivateKey,
    pub kind: AnnotationKind,
    pub hash: HashAlgorithm,
    pub host: String,
    pub satisfied: bool,
    pub data: Vec<u8>,
}

impl Arbitrary for AnnotationParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            private_key(),
            annotation_kind(),
            hash_algorithm(),
            host(),
            any::<bool>(),
            payload(512),
        )
            .prop_map(|(key, kind, hash, host, satisfied, data)| AnnotationParams {
                key,
                kind,
                hash,
                host,
                satisfied,
                data,
            })
            .boxed()
    }
}

/// Generate a signed annotation from parameters.
pub fn annotation_from_params(params: &AnnotationParams) -> Annotation {
    AnnotationBuilder::new(params.kind, params.hash, params.host.clone())
        .data(&params.data)
        .satisfied(params.satisfied)
        .sign(&params.key)
}
