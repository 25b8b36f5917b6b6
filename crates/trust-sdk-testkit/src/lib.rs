//! # Trust SDK Testkit
//!
//! Testing utilities for the Trust SDK.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Key pairs, SDK configurations and signed documents
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust
//! use trust_sdk_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let cfg = fixture.sdk_info(&["src", "pki"]);
//! let data = fixture.signable("foo");
//! assert_eq!(cfg.annotators.len(), 2);
//! assert!(!data.is_empty());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use trust_sdk_testkit::generators::{annotation_from_params, AnnotationParams};
//!
//! proptest! {
//!     #[test]
//!     fn annotation_verifies(params: AnnotationParams) {
//!         let a = annotation_from_params(&params);
//!         prop_assert!(a.verify_signature(&params.key.public_key()));
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{mock_stream_info, multi_party_fixtures, TestFixture};
pub use generators::{annotation_from_params, AnnotationParams};
