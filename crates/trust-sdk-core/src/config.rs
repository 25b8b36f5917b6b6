//! Configuration structs consumed read-only by the SDK.
//!
//! Loading the configuration document is the host's job; these types only
//! describe its shape. Tags stay as strings here and are validated into typed
//! enums by the factories, so a bad tag surfaces as a domain error rather than
//! a parse failure.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::hash::HashAlgorithm;

/// Root SDK configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkInfo {
    /// Identity of the producing node or service.
    #[serde(default)]
    pub host: String,

    /// Hash algorithm used for annotation keys.
    #[serde(default)]
    pub hash: HashAlgorithm,

    /// Signing and verification keys.
    #[serde(default)]
    pub signature: SignatureInfo,

    /// Ordered annotator tags to run for every piece of data.
    #[serde(default)]
    pub annotators: Vec<String>,

    /// Transport used to publish annotation batches.
    #[serde(default)]
    pub stream: StreamInfo,

    #[serde(default)]
    pub tls: TlsPolicy,

    #[serde(default)]
    pub tpm: TpmConfig,
}

impl SdkInfo {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A key reference: algorithm tag plus inline hex material or a path to a
/// file holding hex material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Algorithm tag. Empty means the key is not configured.
    #[serde(rename = "type", default)]
    pub key_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Hex-encoded key material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl KeyInfo {
    /// Inline key of the given algorithm.
    pub fn inline(key_type: impl Into<String>, hex_key: impl Into<String>) -> Self {
        Self {
            key_type: key_type.into(),
            path: None,
            key: Some(hex_key.into()),
        }
    }

    /// File-backed key of the given algorithm.
    pub fn from_path(key_type: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            key_type: key_type.into(),
            path: Some(path.into()),
            key: None,
        }
    }

    /// Whether an algorithm tag has been set.
    pub fn is_configured(&self) -> bool {
        !self.key_type.trim().is_empty()
    }
}

/// Signing configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    #[serde(default)]
    pub public: KeyInfo,
    #[serde(default)]
    pub private: KeyInfo,
}

/// Transport description. The shape of `config` must match `stream_type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    #[serde(rename = "type", default)]
    pub stream_type: String,

    #[serde(default)]
    pub config: StreamConfig,
}

/// Transport-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamConfig {
    Mqtt(MqttConfig),
    Ledger(LedgerConfig),
    Mock(MockConfig),
    #[default]
    None,
}

impl StreamConfig {
    /// Short label for diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            StreamConfig::Mqtt(_) => "mqtt",
            StreamConfig::Ledger(_) => "ledger",
            StreamConfig::Mock(_) => "mock",
            StreamConfig::None => "none",
        }
    }
}

/// Network endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: default_mqtt_port(),
        }
    }
}

/// MQTT broker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MqttConfig {
    pub provider: Endpoint,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// 0 (at most once) or 1 (at least once).
    #[serde(default = "default_qos")]
    pub qos: u8,

    /// MQTT clean-session flag.
    #[serde(default = "default_true")]
    pub cleanness: bool,

    #[serde(default = "default_topics")]
    pub topics: Vec<String>,

    /// Delivery attempts per publish before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u16,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            provider: Endpoint::default(),
            client_id: default_client_id(),
            user: None,
            password: None,
            qos: default_qos(),
            cleanness: true,
            topics: default_topics(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

/// Distributed-ledger node settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LedgerConfig {
    /// Base URL of the ledger node API.
    pub node: String,

    #[serde(default = "default_channel")]
    pub channel: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on waiting for inclusion when the caller sets no deadline.
    #[serde(default = "default_confirmation_timeout_ms")]
    pub confirmation_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            node: "http://localhost:14265".to_string(),
            channel: default_channel(),
            poll_interval_ms: default_poll_interval_ms(),
            confirmation_timeout_ms: default_confirmation_timeout_ms(),
        }
    }
}

/// In-memory transport settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MockConfig {
    /// Fail every publish with `DeliveryFailed`.
    #[serde(default)]
    pub simulate_failure: bool,
}

/// TLS protocol versions, ordered oldest to newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "SSLv3")]
    Ssl3,
    #[serde(rename = "TLSv1.0")]
    Tls10,
    #[serde(rename = "TLSv1.1")]
    Tls11,
    #[serde(rename = "TLSv1.2")]
    Tls12,
    #[serde(rename = "TLSv1.3")]
    Tls13,
}

/// Policy evaluated by the TLS annotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsPolicy {
    #[serde(default = "default_min_tls")]
    pub min_version: TlsVersion,

    #[serde(default = "default_true")]
    pub require_peer_certificate: bool,
}

impl Default for TlsPolicy {
    fn default() -> Self {
        Self {
            min_version: default_min_tls(),
            require_peer_certificate: true,
        }
    }
}

/// Settings for the platform attestation annotators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TpmConfig {
    /// Device nodes probed by the default attestor, in order.
    #[serde(default = "default_tpm_paths")]
    pub device_paths: Vec<PathBuf>,

    /// Device identity the attestation annotator must observe, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_device_id: Option<String>,
}

impl Default for TpmConfig {
    fn default() -> Self {
        Self {
            device_paths: default_tpm_paths(),
            expected_device_id: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "trust-sdk".to_string()
}

fn default_qos() -> u8 {
    1
}

fn default_topics() -> Vec<String> {
    vec!["annotations".to_string()]
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    100
}

fn default_keep_alive_secs() -> u16 {
    30
}

fn default_channel() -> String {
    "annotations".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_confirmation_timeout_ms() -> u64 {
    60_000
}

fn default_min_tls() -> TlsVersion {
    TlsVersion::Tls12
}

fn default_tpm_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("/dev/tpm0"), PathBuf::from("/dev/tpmrm0")]
}
