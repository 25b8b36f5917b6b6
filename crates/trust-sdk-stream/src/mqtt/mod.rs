//! MQTT broker transport.

pub mod client;
pub mod codec;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::Span;

use trust_sdk_core::{Annotation, Context, Error, MqttConfig, Result};

use crate::backoff::Backoff;
use crate::provider::{encode_batch, StreamProvider, StreamType};

pub use client::{MqttClient, MqttError};

#[derive(Debug, Default)]
struct Session {
    open: bool,
    client: Option<MqttClient>,
}

/// Publishes each batch as one message to every configured topic.
///
/// A lost connection is re-established inside `publish`, with exponential
/// backoff, up to `max_attempts` attempts per batch. A broker that stops
/// answering counts as a lost connection after one keep-alive interval.
#[derive(Debug)]
pub struct MqttStreamProvider {
    config: MqttConfig,
    session: Mutex<Session>,
    span: Span,
}

impl MqttStreamProvider {
    pub fn new(config: MqttConfig, span: Span) -> Result<Self> {
        if config.qos > 1 {
            return Err(Error::InvalidStreamConfig(format!(
                "mqtt qos {} is not supported",
                config.qos
            )));
        }
        if config.topics.is_empty() {
            return Err(Error::InvalidStreamConfig("mqtt topics are empty".into()));
        }
        let fields = config
            .topics
            .iter()
            .map(|t| ("topic", t.as_str()))
            .chain([("client id", config.client_id.as_str())])
            .chain(config.user.as_deref().map(|u| ("user", u)))
            .chain(config.password.as_deref().map(|p| ("password", p)));
        for (name, value) in fields {
            if value.len() > codec::MAX_STRING_LEN {
                return Err(Error::InvalidStreamConfig(format!(
                    "mqtt {name} is {} bytes, limit is {}",
                    value.len(),
                    codec::MAX_STRING_LEN
                )));
            }
        }
        Ok(Self {
            config,
            session: Mutex::new(Session::default()),
            span,
        })
    }

    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    async fn open_client(&self, ctx: &Context) -> Result<MqttClient> {
        ctx.run(async {
            MqttClient::connect(&self.config)
                .await
                .map_err(|e| delivery_failed(1, &e))
        })
        .await
    }

    /// One delivery attempt: reconnect if needed, then send to every topic
    /// from `next_topic` on, advancing it as acks arrive.
    async fn deliver(
        &self,
        session: &mut Session,
        payload: &Bytes,
        next_topic: &mut usize,
    ) -> std::result::Result<(), MqttError> {
        if session.client.is_none() {
            session.client = Some(MqttClient::connect(&self.config).await?);
        }
        let Some(client) = session.client.as_mut() else {
            return Err(MqttError::Closed);
        };
        while let Some(topic) = self.config.topics.get(*next_topic) {
            client.publish(topic, payload.clone(), self.config.qos).await?;
            *next_topic += 1;
        }
        Ok(())
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }
}

#[async_trait]
impl StreamProvider for MqttStreamProvider {
    fn stream_type(&self) -> StreamType {
        StreamType::Mqtt
    }

    async fn connect(&self, ctx: &Context) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.open && session.client.is_some() {
            return Ok(());
        }
        let client = self.open_client(ctx).await?;
        session.client = Some(client);
        session.open = true;
        tracing::info!(
            parent: &self.span,
            host = %self.config.provider.host,
            port = self.config.provider.port,
            "mqtt connected"
        );
        Ok(())
    }

    async fn publish(&self, ctx: &Context, batch: Vec<Annotation>) -> Result<()> {
        let payload = Bytes::from(encode_batch(&batch)?);

        // Held for the whole batch so concurrent publishes never interleave.
        let mut session = self.session.lock().await;
        if !session.open {
            return Err(Error::NotConnected);
        }

        let max_attempts = self.max_attempts();
        let mut backoff = Backoff::from_base(Duration::from_millis(self.config.backoff_base_ms));
        // Topics already acknowledged are not re-sent after a reconnect.
        let mut next_topic = 0;
        let mut attempt = 0;

        loop {
            attempt += 1;
            ctx.check()?;

            let delivered = ctx
                .run(async {
                    Ok(self.deliver(&mut session, &payload, &mut next_topic).await)
                })
                .await;
            let result = match delivered {
                Ok(result) => result,
                Err(e) => {
                    session.client = None;
                    return Err(e);
                }
            };

            match result {
                Ok(()) => {
                    tracing::debug!(
                        parent: &self.span,
                        annotations = batch.len(),
                        topics = self.config.topics.len(),
                        attempt,
                        "batch published"
                    );
                    return Ok(());
                }
                Err(e) => {
                    // A half-finished exchange leaves the session unusable.
                    session.client = None;
                    ctx.check()?;
                    if !e.is_transient() || attempt >= max_attempts {
                        tracing::warn!(
                            parent: &self.span,
                            attempt,
                            error = %e,
                            "mqtt delivery failed"
                        );
                        return Err(delivery_failed(attempt, &e));
                    }
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        parent: &self.span,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "mqtt publish failed, retrying"
                    );
                    ctx.sleep(delay).await?;
                }
            }
        }
    }

    async fn close(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if !session.open {
            return Ok(());
        }
        session.open = false;
        if let Some(client) = session.client.take() {
            client.disconnect().await.map_err(|e| delivery_failed(1, &e))?;
        }
        tracing::info!(parent: &self.span, "mqtt disconnected");
        Ok(())
    }
}

fn delivery_failed(attempts: u32, e: &MqttError) -> Error {
    Error::DeliveryFailed {
        attempts,
        reason: e.to_string(),
    }
}
