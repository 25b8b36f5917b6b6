//! Per-call context handed to annotators.

use http::{HeaderMap, Request};
use serde::{Deserialize, Serialize};

use trust_sdk_core::{Context, Result, TlsVersion};

/// Transport-layer session state observed for an inbound connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsInfo {
    pub version: TlsVersion,
    pub handshake_complete: bool,
    /// DER-encoded peer certificate chain, leaf first.
    #[serde(default)]
    pub peer_certificates: Vec<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
}

/// Cancellation plus whatever request/session state the caller has.
#[derive(Debug, Clone, Default)]
pub struct AnnotationContext {
    ctx: Context,
    headers: Option<HeaderMap>,
    tls: Option<TlsInfo>,
}

impl AnnotationContext {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            headers: None,
            tls: None,
        }
    }

    /// Context carrying the metadata of an inbound request.
    pub fn for_request<B>(ctx: Context, request: &Request<B>) -> Self {
        Self::new(ctx).with_headers(request.headers().clone())
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_tls(mut self, tls: TlsInfo) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        self.headers.as_ref()
    }

    pub fn tls(&self) -> Option<&TlsInfo> {
        self.tls.as_ref()
    }

    /// Fail fast on cancellation or an expired deadline.
    pub fn check(&self) -> Result<()> {
        self.ctx.check()
    }
}

impl From<Context> for AnnotationContext {
    fn from(ctx: Context) -> Self {
        Self::new(ctx)
    }
}
