//! The stream provider seam.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use trust_sdk_core::{Annotation, Context, Error, Result};

/// Delivers annotation batches to a downstream transport.
///
/// Lifecycle: `connect` → `publish`* → `close`. `connect` and `close` are
/// idempotent. `publish` on a provider that is not connected fails with
/// [`Error::NotConnected`]. Each published batch reaches the transport as
/// one message; batches are never split or interleaved.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    fn stream_type(&self) -> StreamType;

    async fn connect(&self, ctx: &Context) -> Result<()>;

    async fn publish(&self, ctx: &Context, batch: Vec<Annotation>) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Transport selected by `StreamInfo::stream_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    Mqtt,
    Ledger,
    Mock,
}

impl StreamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Mqtt => "mqtt",
            StreamType::Ledger => "ledger",
            StreamType::Mock => "mock",
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mqtt" => Ok(StreamType::Mqtt),
            "ledger" => Ok(StreamType::Ledger),
            "mock" => Ok(StreamType::Mock),
            other => Err(Error::UnknownStreamType(other.to_string())),
        }
    }
}

/// Wire form of a batch: a JSON array of annotations.
pub fn encode_batch(batch: &[Annotation]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(batch)?)
}

/// Inverse of [`encode_batch`].
pub fn decode_batch(bytes: &[u8]) -> Result<Vec<Annotation>> {
    Ok(serde_json::from_slice(bytes)?)
}
