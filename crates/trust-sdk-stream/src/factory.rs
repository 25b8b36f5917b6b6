//! Builds stream providers from configuration.

use tracing::Span;

use trust_sdk_core::{Error, Result, StreamConfig, StreamInfo};

use crate::ledger::LedgerStreamProvider;
use crate::mock::MockStreamProvider;
use crate::mqtt::MqttStreamProvider;
use crate::provider::{StreamProvider, StreamType};

/// Build the provider named by `info.stream_type`.
///
/// The provider logs under `span`. Fails with `UnknownStreamType` for an
/// unrecognised type and `InvalidStreamConfig` when `info.config` does not
/// have the shape that type needs. The mock accepts any shape.
pub fn new_stream_provider(info: &StreamInfo, span: Span) -> Result<Box<dyn StreamProvider>> {
    let stream_type: StreamType = info.stream_type.parse()?;
    let provider: Box<dyn StreamProvider> = match (stream_type, &info.config) {
        (StreamType::Mqtt, StreamConfig::Mqtt(config)) => {
            Box::new(MqttStreamProvider::new(config.clone(), span)?)
        }
        (StreamType::Ledger, StreamConfig::Ledger(config)) => {
            Box::new(LedgerStreamProvider::new(config.clone(), span)?)
        }
        (StreamType::Mock, StreamConfig::Mock(config)) => {
            Box::new(MockStreamProvider::new(config.clone(), span))
        }
        (StreamType::Mock, _) => Box::new(MockStreamProvider::new(Default::default(), span)),
        (expected, other) => {
            return Err(Error::InvalidStreamConfig(format!(
                "{expected} stream needs {expected} config, got {}",
                other.shape()
            )));
        }
    };
    tracing::debug!(stream = %stream_type, "stream provider built");
    Ok(provider)
}
