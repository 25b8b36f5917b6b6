//! A single MQTT session over TCP.

use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use trust_sdk_core::MqttConfig;

use super::codec::{self, CodecError, Connect, Packet, Publish};

#[derive(Debug, Error)]
pub enum MqttError {
    #[error("i/o: {0}")]
    Io(#[from] io::Error),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    #[error("broker refused connection (return code {0})")]
    Refused(u8),

    #[error("unexpected packet from broker: {0}")]
    Unexpected(String),

    #[error("broker closed the connection")]
    Closed,

    #[error("no {0} from broker within {1:?}")]
    TimedOut(&'static str, Duration),
}

/// Response wait used when keep-alive is disabled.
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for CONNACK or PUBACK: one keep-alive interval.
pub fn response_timeout(config: &MqttConfig) -> Duration {
    match config.keep_alive_secs {
        0 => DEFAULT_RESPONSE_TIMEOUT,
        secs => Duration::from_secs(u64::from(secs)),
    }
}

impl MqttError {
    /// Whether a fresh session might succeed where this one failed.
    ///
    /// A refused CONNECT (bad credentials, rejected client id) will be
    /// refused again.
    pub fn is_transient(&self) -> bool {
        !matches!(self, MqttError::Refused(_) | MqttError::Codec(_))
    }
}

/// Connected MQTT session. Dropping it closes the socket without a
/// DISCONNECT.
#[derive(Debug)]
pub struct MqttClient {
    stream: TcpStream,
    read_buf: BytesMut,
    next_packet_id: u16,
    response_timeout: Duration,
}

impl MqttClient {
    /// Open a TCP connection and complete the CONNECT/CONNACK handshake.
    ///
    /// Fails with `TimedOut` when the whole handshake takes longer than
    /// [`response_timeout`].
    pub async fn connect(config: &MqttConfig) -> Result<Self, MqttError> {
        let wait = response_timeout(config);
        timeout(wait, Self::handshake(config, wait))
            .await
            .map_err(|_| MqttError::TimedOut("CONNACK", wait))?
    }

    async fn handshake(config: &MqttConfig, response_timeout: Duration) -> Result<Self, MqttError> {
        let addr = (config.provider.host.as_str(), config.provider.port);
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        let mut client = Self {
            stream,
            read_buf: BytesMut::with_capacity(1024),
            next_packet_id: 1,
            response_timeout,
        };

        client
            .send(&Packet::Connect(Connect {
                client_id: config.client_id.clone(),
                clean_session: config.cleanness,
                keep_alive: config.keep_alive_secs,
                username: config.user.clone(),
                password: config.password.clone(),
            }))
            .await?;

        match client.read_packet().await? {
            Packet::ConnAck { return_code: 0, .. } => Ok(client),
            Packet::ConnAck { return_code, .. } => Err(MqttError::Refused(return_code)),
            other => Err(MqttError::Unexpected(format!("{other:?}"))),
        }
    }

    /// Publish one message. With QoS 1 this waits for the matching PUBACK,
    /// failing with `TimedOut` after one response timeout.
    pub async fn publish(&mut self, topic: &str, payload: Bytes, qos: u8) -> Result<(), MqttError> {
        let packet_id = (qos > 0).then(|| self.take_packet_id());
        self.send(&Packet::Publish(Publish {
            topic: topic.to_string(),
            qos,
            packet_id,
            payload,
        }))
        .await?;

        let Some(expected) = packet_id else {
            return Ok(());
        };
        let wait = self.response_timeout;
        timeout(wait, self.await_puback(expected))
            .await
            .map_err(|_| MqttError::TimedOut("PUBACK", wait))?
    }

    async fn await_puback(&mut self, expected: u16) -> Result<(), MqttError> {
        loop {
            match self.read_packet().await? {
                Packet::PubAck { packet_id } if packet_id == expected => return Ok(()),
                // A stale ack from an earlier attempt, or a keep-alive reply.
                Packet::PubAck { .. } | Packet::PingResp => continue,
                other => return Err(MqttError::Unexpected(format!("{other:?}"))),
            }
        }
    }

    /// Send DISCONNECT and shut the socket down.
    pub async fn disconnect(mut self) -> Result<(), MqttError> {
        self.send(&Packet::Disconnect).await?;
        self.stream.shutdown().await?;
        Ok(())
    }

    fn take_packet_id(&mut self) -> u16 {
        let id = self.next_packet_id;
        // Packet id 0 is reserved.
        self.next_packet_id = self.next_packet_id.checked_add(1).unwrap_or(1);
        id
    }

    async fn send(&mut self, packet: &Packet) -> Result<(), MqttError> {
        let mut buf = BytesMut::new();
        codec::encode(packet, &mut buf)?;
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_packet(&mut self) -> Result<Packet, MqttError> {
        loop {
            if let Some(packet) = codec::decode(&mut self.read_buf)? {
                return Ok(packet);
            }
            if self.stream.read_buf(&mut self.read_buf).await? == 0 {
                return Err(MqttError::Closed);
            }
        }
    }
}
