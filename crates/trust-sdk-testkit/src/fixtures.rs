//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use rand::RngCore;
use serde_json::json;

use trust_sdk_core::{
    crypto, HashAlgorithm, KeyAlgorithm, KeyInfo, MockConfig, PrivateKey, PublicKey, SdkInfo,
    SignatureInfo, StreamConfig, StreamInfo,
};

/// A test fixture holding one Ed25519 key pair.
pub struct TestFixture {
    seed: [u8; 32],
    pub private: PrivateKey,
    pub public: PublicKey,
}

impl TestFixture {
    /// Create a fixture with a random key.
    pub fn new() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::with_seed(seed)
    }

    /// Create with a deterministic key from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        let private = match PrivateKey::from_bytes(KeyAlgorithm::Ed25519, &seed) {
            Ok(key) => key,
            Err(e) => panic!("32-byte ed25519 seed rejected: {e}"),
        };
        let public = private.public_key();
        Self {
            seed,
            private,
            public,
        }
    }

    /// Hex of the private seed.
    pub fn private_hex(&self) -> String {
        hex::encode(self.seed)
    }

    /// Inline private and public keys.
    pub fn signature_info(&self) -> SignatureInfo {
        SignatureInfo {
            public: KeyInfo::inline("ed25519", self.public.to_hex()),
            private: KeyInfo::inline("ed25519", self.private_hex()),
        }
    }

    /// SDK configuration with this key, the given annotators and a mock stream.
    pub fn sdk_info(&self, annotators: &[&str]) -> SdkInfo {
        SdkInfo {
            host: "test-host".to_string(),
            hash: HashAlgorithm::Sha256,
            signature: self.signature_info(),
            annotators: annotators.iter().map(|s| s.to_string()).collect(),
            stream: mock_stream_info(),
            ..Default::default()
        }
    }

    /// JSON `{seed, signature}` document signed by this fixture's key.
    pub fn signable(&self, seed: &str) -> Vec<u8> {
        let signature = crypto::sign(&self.private, seed.as_bytes());
        signable_json(seed, &signature.to_hex())
    }

    /// JSON `{seed, signature}` whose signature covers `signed` rather than
    /// `seed`.
    pub fn forged_signable(&self, seed: &str, signed: &str) -> Vec<u8> {
        let signature = crypto::sign(&self.private, signed.as_bytes());
        signable_json(seed, &signature.to_hex())
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream info selecting the in-memory provider.
pub fn mock_stream_info() -> StreamInfo {
    StreamInfo {
        stream_type: "mock".to_string(),
        config: StreamConfig::Mock(MockConfig::default()),
    }
}

fn signable_json(seed: &str, signature_hex: &str) -> Vec<u8> {
    json!({ "seed": seed, "signature": signature_hex })
        .to_string()
        .into_bytes()
}

/// Create multiple fixtures with distinct deterministic keys.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}
