//! # Trust SDK Annotators
//!
//! Strategies that check one trust property of a unit of data and record
//! the result as a signed [`Annotation`](trust_sdk_core::Annotation).
//!
//! | tag        | annotator            | satisfied when                                  |
//! |------------|----------------------|-------------------------------------------------|
//! | `src`      | [`SourceAnnotator`]  | always (baseline provenance)                    |
//! | `pki`      | [`PkiAnnotator`]     | the embedded signature verifies                 |
//! | `pki-http` | [`PkiHttpAnnotator`] | request metadata matches the body and verifies  |
//! | `tpm`      | [`TpmAnnotator`]     | the platform returns a valid quote              |
//! | `tls`      | [`TlsAnnotator`]     | the session meets the TLS policy                |
//!
//! [`AttestationAnnotator`] additionally binds the quote to an expected
//! device identity and is constructed explicitly rather than by tag.
//!
//! Annotators never turn an infrastructure failure into a negative result:
//! if the check cannot run, `execute` returns an error.
//!
//! [`RequestHandler`] is the sending side of the `pki-http` check.

pub mod annotator;
pub mod attestation;
pub mod context;
pub mod factory;
pub mod pki;
pub mod pki_http;
pub mod request;
pub mod source;
pub mod tls;
pub mod tpm;

pub use annotator::{Annotator, Notary};
pub use attestation::{AttestationAnnotator, AttestationProvider, DeviceAttestor, Quote};
pub use context::{AnnotationContext, TlsInfo};
pub use factory::{new_annotator, AnnotatorFactory};
pub use pki::{PkiAnnotator, Signable};
pub use pki_http::PkiHttpAnnotator;
pub use request::{
    new_request_handler, RequestHandler, CONTENT_HASH, CONTENT_HASH_ALGORITHM, CONTENT_SIGNATURE,
};
pub use source::SourceAnnotator;
pub use tls::TlsAnnotator;
pub use tpm::TpmAnnotator;
