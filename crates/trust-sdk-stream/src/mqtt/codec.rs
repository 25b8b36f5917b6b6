//! MQTT 3.1.1 packet encoding.
//!
//! Covers the packets a publishing client exchanges with a broker: CONNECT,
//! CONNACK, PUBLISH (QoS 0 and 1), PUBACK, PINGREQ, PINGRESP and DISCONNECT.
//! Both directions are implemented so tests can play the broker.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Protocol level for MQTT 3.1.1.
pub const PROTOCOL_LEVEL: u8 = 4;

/// Largest remaining length expressible in four length bytes.
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

mod packet_type {
    pub const CONNECT: u8 = 1;
    pub const CONNACK: u8 = 2;
    pub const PUBLISH: u8 = 3;
    pub const PUBACK: u8 = 4;
    pub const PINGREQ: u8 = 12;
    pub const PINGRESP: u8 = 13;
    pub const DISCONNECT: u8 = 14;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed packet: {0}")]
    Malformed(String),

    #[error("unsupported packet type {0}")]
    UnsupportedPacket(u8),

    #[error("packet of {0} bytes exceeds the MQTT size limit")]
    TooLarge(usize),
}

/// CONNECT packet contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    pub client_id: String,
    pub clean_session: bool,
    pub keep_alive: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// PUBLISH packet contents. `packet_id` is present iff `qos > 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub topic: String,
    pub qos: u8,
    pub packet_id: Option<u16>,
    pub payload: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Connect(Connect),
    ConnAck { session_present: bool, return_code: u8 },
    Publish(Publish),
    PubAck { packet_id: u16 },
    PingReq,
    PingResp,
    Disconnect,
}

/// Append the wire form of `packet` to `buf`.
pub fn encode(packet: &Packet, buf: &mut BytesMut) -> Result<(), CodecError> {
    let mut body = BytesMut::new();
    let header = match packet {
        Packet::Connect(c) => {
            put_str(&mut body, "MQTT")?;
            body.put_u8(PROTOCOL_LEVEL);
            let mut flags = 0u8;
            if c.username.is_some() {
                flags |= 0x80;
            }
            if c.password.is_some() {
                flags |= 0x40;
            }
            if c.clean_session {
                flags |= 0x02;
            }
            body.put_u8(flags);
            body.put_u16(c.keep_alive);
            put_str(&mut body, &c.client_id)?;
            if let Some(user) = &c.username {
                put_str(&mut body, user)?;
            }
            if let Some(pass) = &c.password {
                put_str(&mut body, pass)?;
            }
            packet_type::CONNECT << 4
        }
        Packet::ConnAck {
            session_present,
            return_code,
        } => {
            body.put_u8(u8::from(*session_present));
            body.put_u8(*return_code);
            packet_type::CONNACK << 4
        }
        Packet::Publish(p) => {
            if p.qos > 1 {
                return Err(CodecError::Malformed(format!("qos {} not supported", p.qos)));
            }
            put_str(&mut body, &p.topic)?;
            match (p.qos, p.packet_id) {
                (0, None) => {}
                (1, Some(id)) => body.put_u16(id),
                _ => {
                    return Err(CodecError::Malformed(
                        "packet id must be present exactly when qos > 0".into(),
                    ))
                }
            }
            body.put_slice(&p.payload);
            (packet_type::PUBLISH << 4) | (p.qos << 1)
        }
        Packet::PubAck { packet_id } => {
            body.put_u16(*packet_id);
            packet_type::PUBACK << 4
        }
        Packet::PingReq => packet_type::PINGREQ << 4,
        Packet::PingResp => packet_type::PINGRESP << 4,
        Packet::Disconnect => packet_type::DISCONNECT << 4,
    };

    if body.len() > MAX_REMAINING_LENGTH {
        return Err(CodecError::TooLarge(body.len()));
    }
    buf.put_u8(header);
    put_remaining_length(buf, body.len());
    buf.put_slice(&body);
    Ok(())
}

/// Decode one packet from the front of `buf`.
///
/// Returns `Ok(None)` and leaves `buf` untouched when more bytes are needed.
pub fn decode(buf: &mut BytesMut) -> Result<Option<Packet>, CodecError> {
    if buf.is_empty() {
        return Ok(None);
    }
    let Some((remaining, len_bytes)) = read_remaining_length(&buf[1..])? else {
        return Ok(None);
    };
    let total = 1 + len_bytes + remaining;
    if buf.len() < total {
        return Ok(None);
    }

    let mut frame = buf.split_to(total);
    let header = frame.get_u8();
    frame.advance(len_bytes);
    let mut body = frame.freeze();

    let packet = match header >> 4 {
        packet_type::CONNECT => Packet::Connect(decode_connect(&mut body)?),
        packet_type::CONNACK => {
            need(&body, 2)?;
            Packet::ConnAck {
                session_present: body.get_u8() & 0x01 == 1,
                return_code: body.get_u8(),
            }
        }
        packet_type::PUBLISH => {
            let qos = (header >> 1) & 0x03;
            if qos > 1 {
                return Err(CodecError::Malformed(format!("qos {qos} not supported")));
            }
            let topic = get_str(&mut body)?;
            let packet_id = if qos > 0 {
                need(&body, 2)?;
                Some(body.get_u16())
            } else {
                None
            };
            Packet::Publish(Publish {
                topic,
                qos,
                packet_id,
                payload: body,
            })
        }
        packet_type::PUBACK => {
            need(&body, 2)?;
            Packet::PubAck {
                packet_id: body.get_u16(),
            }
        }
        packet_type::PINGREQ => Packet::PingReq,
        packet_type::PINGRESP => Packet::PingResp,
        packet_type::DISCONNECT => Packet::Disconnect,
        other => return Err(CodecError::UnsupportedPacket(other)),
    };
    Ok(Some(packet))
}

fn decode_connect(body: &mut Bytes) -> Result<Connect, CodecError> {
    let protocol = get_str(body)?;
    if protocol != "MQTT" {
        return Err(CodecError::Malformed(format!("protocol name {protocol:?}")));
    }
    need(body, 4)?;
    let level = body.get_u8();
    if level != PROTOCOL_LEVEL {
        return Err(CodecError::Malformed(format!("protocol level {level}")));
    }
    let flags = body.get_u8();
    let keep_alive = body.get_u16();
    let client_id = get_str(body)?;
    let username = if flags & 0x80 != 0 {
        Some(get_str(body)?)
    } else {
        None
    };
    let password = if flags & 0x40 != 0 {
        Some(get_str(body)?)
    } else {
        None
    };
    Ok(Connect {
        client_id,
        clean_session: flags & 0x02 != 0,
        keep_alive,
        username,
        password,
    })
}

/// Longest string a two-byte length prefix can describe.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

fn put_str(buf: &mut BytesMut, s: &str) -> Result<(), CodecError> {
    let len = u16::try_from(s.len()).map_err(|_| CodecError::TooLarge(s.len()))?;
    buf.put_u16(len);
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn get_str(buf: &mut Bytes) -> Result<String, CodecError> {
    need(buf, 2)?;
    let len = buf.get_u16() as usize;
    need(buf, len)?;
    let raw = buf.split_to(len);
    String::from_utf8(raw.to_vec()).map_err(|_| CodecError::Malformed("string is not UTF-8".into()))
}

fn need(buf: &Bytes, n: usize) -> Result<(), CodecError> {
    if buf.remaining() < n {
        return Err(CodecError::Malformed(format!(
            "expected {n} more bytes, have {}",
            buf.remaining()
        )));
    }
    Ok(())
}

fn put_remaining_length(buf: &mut BytesMut, mut len: usize) {
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if len == 0 {
            break;
        }
    }
}

/// Returns `(length, bytes used)`, or `None` if the field is incomplete.
fn read_remaining_length(buf: &[u8]) -> Result<Option<(usize, usize)>, CodecError> {
    let mut value = 0usize;
    let mut multiplier = 1usize;
    for (i, byte) in buf.iter().enumerate() {
        if i == 4 {
            return Err(CodecError::Malformed("remaining length exceeds 4 bytes".into()));
        }
        value += (*byte & 0x7f) as usize * multiplier;
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
        multiplier *= 128;
    }
    if buf.len() >= 4 {
        return Err(CodecError::Malformed("remaining length exceeds 4 bytes".into()));
    }
    Ok(None)
}
