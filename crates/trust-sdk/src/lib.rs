//! # Trust SDK
//!
//! Attach signed trust annotations to data and publish them downstream.
//!
//! Each call runs every configured [`Annotator`] over the data, producing
//! one [`Annotation`] per annotator, and publishes the results as a single
//! batch through a [`StreamProvider`].
//!
//! ## Crates
//!
//! - `trust-sdk-core` - annotations, keys, hashes, configuration, errors
//! - `trust-sdk-annotators` - the annotators and the request handler
//! - `trust-sdk-stream` - MQTT, ledger and in-memory transports
//!
//! ## Example
//!
//! ```no_run
//! use trust_sdk::{AnnotationContext, Context, Sdk, SdkInfo};
//!
//! # async fn run() -> trust_sdk::Result<()> {
//! let info = SdkInfo::from_json(r#"{
//!     "host": "edge-7",
//!     "annotators": ["src"],
//!     "stream": {"type": "mock"}
//! }"#)?;
//! let sdk = Sdk::new(info, tracing::Span::current())?;
//! let ctx = AnnotationContext::new(Context::background());
//! sdk.bootstrap(ctx.ctx()).await?;
//! sdk.create(&ctx, b"temperature=21.5").await?;
//! sdk.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod sdk;

pub use sdk::{Action, Sdk};

pub use trust_sdk_annotators::{
    new_annotator, new_request_handler, AnnotationContext, Annotator, AnnotatorFactory,
    AttestationProvider, RequestHandler, Signable, TlsInfo,
};
pub use trust_sdk_core::{
    Annotation, AnnotationKind, Context, Error, HashAlgorithm, KeyInfo, Result, SdkInfo,
    SignatureInfo, SignatureProvider, StreamConfig, StreamInfo,
};
pub use trust_sdk_stream::{new_stream_provider, MockStreamProvider, StreamProvider, StreamType};
