//! Signs outbound requests so the receiver can run the PKI-over-HTTP check.
//!
//! The body is left untouched; the integrity metadata travels in headers, so
//! receivers that know nothing about it still see the same request.

use http::header::{HeaderName, HeaderValue};
use http::Request;

use trust_sdk_core::{
    crypto, Error, HashAlgorithm, KeyAlgorithm, PrivateKey, Result, SignatureInfo,
};

/// Hex digest of the request body.
pub const CONTENT_HASH: HeaderName = HeaderName::from_static("content-hash");

/// Hash algorithm tag used for [`CONTENT_HASH`].
pub const CONTENT_HASH_ALGORITHM: HeaderName = HeaderName::from_static("content-hash-algorithm");

/// Hex signature over the ASCII bytes of the [`CONTENT_HASH`] value.
pub const CONTENT_SIGNATURE: HeaderName = HeaderName::from_static("content-signature");

/// An outbound request that can carry signed integrity metadata.
///
/// Construction only checks the key algorithm tags; key material is loaded by
/// [`add_signature`](Self::add_signature).
#[derive(Debug)]
pub struct RequestHandler<B> {
    request: Request<B>,
    signature: SignatureInfo,
    hash: HashAlgorithm,
}

impl<B: AsRef<[u8]>> RequestHandler<B> {
    /// Wrap `request` for SHA-256 content hashing.
    pub fn new(request: Request<B>, info: &SignatureInfo) -> Result<Self> {
        Self::with_hash(request, info, HashAlgorithm::Sha256)
    }

    /// Wrap `request`, hashing the body with `hash` when signing.
    ///
    /// Fails with `InvalidKeyConfig` when the private key type is missing or
    /// unrecognised, or when a configured public key type is unrecognised or
    /// of a different family.
    pub fn with_hash(request: Request<B>, info: &SignatureInfo, hash: HashAlgorithm) -> Result<Self> {
        check_algorithms(info)?;
        Ok(Self {
            request,
            signature: info.clone(),
            hash,
        })
    }

    /// Hash the body, sign the hex digest and write the three headers.
    ///
    /// Fails with `InvalidKeyConfig` when the private key material cannot be
    /// loaded. The request is left unchanged on failure.
    pub fn add_signature(&mut self) -> Result<()> {
        let key = PrivateKey::from_key_info(&self.signature.private).map_err(|e| match e {
            e @ Error::InvalidKeyConfig(_) => e,
            other => Error::InvalidKeyConfig(other.to_string()),
        })?;

        let digest = self.hash.hex_digest(self.request.body().as_ref());
        let signature = crypto::sign(&key, digest.as_bytes()).to_hex();
        let digest_value = header_value(&digest)?;
        let signature_value = header_value(&signature)?;

        let headers = self.request.headers_mut();
        headers.insert(CONTENT_HASH, digest_value);
        headers.insert(CONTENT_HASH_ALGORITHM, HeaderValue::from_static(self.hash.as_str()));
        headers.insert(CONTENT_SIGNATURE, signature_value);

        tracing::debug!(
            method = %self.request.method(),
            uri = %self.request.uri(),
            hash = %self.hash,
            "signed outbound request"
        );
        Ok(())
    }

    /// [`add_signature`](Self::add_signature) and unwrap the request.
    pub fn into_signed(mut self) -> Result<Request<B>> {
        self.add_signature()?;
        Ok(self.request)
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn request(&self) -> &Request<B> {
        &self.request
    }

    pub fn into_request(self) -> Request<B> {
        self.request
    }
}

/// Wrap `request` for SHA-256 content hashing.
pub fn new_request_handler<B: AsRef<[u8]>>(
    request: Request<B>,
    info: &SignatureInfo,
) -> Result<RequestHandler<B>> {
    RequestHandler::new(request, info)
}

fn check_algorithms(info: &SignatureInfo) -> Result<KeyAlgorithm> {
    let private_alg = parse_algorithm("private", &info.private.key_type)?;
    if info.public.is_configured() {
        let public_alg = parse_algorithm("public", &info.public.key_type)?;
        if public_alg != private_alg {
            return Err(Error::InvalidKeyConfig(format!(
                "private key is {private_alg} but public key is {public_alg}"
            )));
        }
    }
    Ok(private_alg)
}

fn parse_algorithm(which: &str, tag: &str) -> Result<KeyAlgorithm> {
    if tag.trim().is_empty() {
        return Err(Error::InvalidKeyConfig(format!("{which} key type is not set")));
    }
    tag.parse()
        .map_err(|_| Error::InvalidKeyConfig(format!("{which} key type {tag:?} is not recognised")))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trust_sdk_core::{KeyInfo, Signature};
    use trust_sdk_testkit::TestFixture;

    fn sample_request() -> Request<Vec<u8>> {
        Request::post("/foo?param=value&foo=bar&baz=batman")
            .header("content-type", "application/json")
            .body(br#"{"key":"keyA","value":"This is some test data"}"#.to_vec())
            .unwrap()
    }

    #[test]
    fn test_type_only_key_constructs() {
        let info = SignatureInfo {
            private: KeyInfo {
                key_type: "ed25519".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut handler = new_request_handler(sample_request(), &info).unwrap();
        assert!(handler.request().headers().get(&CONTENT_SIGNATURE).is_none());

        // No material to sign with, and nothing written.
        assert!(matches!(handler.add_signature(), Err(Error::InvalidKeyConfig(_))));
        assert!(handler.request().headers().get(&CONTENT_HASH).is_none());
    }

    #[test]
    fn test_valid_ed25519_key() {
        let fixture = TestFixture::new();
        let info = SignatureInfo {
            private: KeyInfo::inline("ed25519", fixture.private_hex()),
            ..Default::default()
        };
        let request = new_request_handler(sample_request(), &info)
            .unwrap()
            .into_signed()
            .unwrap();
        let headers = request.headers();

        let digest = headers[&CONTENT_HASH].to_str().unwrap();
        assert_eq!(digest, HashAlgorithm::Sha256.hex_digest(request.body()));
        assert_eq!(headers[&CONTENT_HASH_ALGORITHM], "sha256");

        let sig = Signature::from_hex(headers[&CONTENT_SIGNATURE].to_str().unwrap()).unwrap();
        assert!(crypto::verify(&fixture.public, digest.as_bytes(), &sig));
    }

    #[test]
    fn test_body_untouched() {
        let fixture = TestFixture::new();
        let original = sample_request().into_body();
        let request = RequestHandler::new(sample_request(), &fixture.signature_info())
            .unwrap()
            .into_signed()
            .unwrap();
        assert_eq!(request.into_body(), original);
    }

    #[test]
    fn test_invalid_public_key_type() {
        let info = SignatureInfo {
            public: KeyInfo {
                key_type: "invalid".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            RequestHandler::new(sample_request(), &info),
            Err(Error::InvalidKeyConfig(_))
        ));
    }

    #[test]
    fn test_unrecognised_private_key_type() {
        let fixture = TestFixture::new();
        let info = SignatureInfo {
            private: KeyInfo::inline("rsa", fixture.private_hex()),
            ..Default::default()
        };
        assert!(matches!(
            RequestHandler::new(sample_request(), &info),
            Err(Error::InvalidKeyConfig(_))
        ));
    }

    #[test]
    fn test_mismatched_public_key_type() {
        let fixture = TestFixture::new();
        let mut info = fixture.signature_info();
        info.public.key_type = "secp256k1".into();
        assert!(RequestHandler::new(sample_request(), &info).is_err());
    }

    #[test]
    fn test_blake3_body_hash() {
        let fixture = TestFixture::new();
        let request = RequestHandler::with_hash(
            sample_request(),
            &fixture.signature_info(),
            HashAlgorithm::Blake3,
        )
        .unwrap()
        .into_signed()
        .unwrap();
        assert_eq!(request.headers()[&CONTENT_HASH_ALGORITHM], "blake3");
    }
}
