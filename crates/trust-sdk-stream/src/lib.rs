//! # Trust SDK Stream
//!
//! Transports that deliver annotation batches downstream.
//!
//! | type     | provider                 | delivery                                   |
//! |----------|--------------------------|--------------------------------------------|
//! | `mqtt`   | [`MqttStreamProvider`]   | one message per batch on every topic       |
//! | `ledger` | [`LedgerStreamProvider`] | one ledger message, confirmed on inclusion |
//! | `mock`   | [`MockStreamProvider`]   | recorded in memory                         |
//!
//! Batches go over the wire as a JSON array of annotations
//! ([`encode_batch`]).

pub mod backoff;
pub mod factory;
pub mod ledger;
pub mod mock;
pub mod mqtt;
pub mod provider;

pub use backoff::Backoff;
pub use factory::new_stream_provider;
pub use ledger::{HttpLedgerClient, LedgerClient, LedgerError, LedgerStreamProvider, MessageId};
pub use mock::MockStreamProvider;
pub use mqtt::{MqttClient, MqttError, MqttStreamProvider};
pub use provider::{decode_batch, encode_batch, StreamProvider, StreamType};
