//! Canonical CBOR encoding of annotations.
//!
//! The signature on an annotation covers these bytes, not the JSON wire
//! form, so the signed message is independent of field order, whitespace or
//! timestamp formatting on the wire. Rules (RFC 8949 core deterministic):
//! - Map keys are small integers, sorted by encoded bytes
//! - Integers use the smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are i64 milliseconds)

use ciborium::value::{Integer, Value};

use crate::annotation::Annotation;

/// Field keys. Keys 0-23 encode as single bytes.
mod keys {
    pub const ID: u64 = 0;
    pub const KEY: u64 = 1;
    pub const HASH: u64 = 2;
    pub const HOST: u64 = 3;
    pub const KIND: u64 = 4;
    pub const IS_SATISFIED: u64 = 5;
    pub const TIMESTAMP: u64 = 6;
}

/// Encode every field of `annotation` except its signature.
pub fn signing_bytes(annotation: &Annotation) -> Vec<u8> {
    let value = annotation_to_cbor_value(annotation);
    let mut buf = Vec::with_capacity(128);
    encode_value_to(&mut buf, &value);
    buf
}

fn annotation_to_cbor_value(annotation: &Annotation) -> Value {
    let entries = vec![
        (
            Value::Integer(keys::ID.into()),
            Value::Text(annotation.id().to_string()),
        ),
        (
            Value::Integer(keys::KEY.into()),
            Value::Text(annotation.key().to_string()),
        ),
        (
            Value::Integer(keys::HASH.into()),
            Value::Text(annotation.hash().as_str().to_string()),
        ),
        (
            Value::Integer(keys::HOST.into()),
            Value::Text(annotation.host().to_string()),
        ),
        (
            Value::Integer(keys::KIND.into()),
            Value::Text(annotation.kind().as_str().to_string()),
        ),
        (
            Value::Integer(keys::IS_SATISFIED.into()),
            Value::Bool(annotation.is_satisfied()),
        ),
        (
            Value::Integer(keys::TIMESTAMP.into()),
            Value::Integer(annotation.timestamp().timestamp_millis().into()),
        ),
    ];
    Value::Map(entries)
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Map(entries) => encode_map_canonical(buf, entries),
        // Only the value kinds built above reach the encoder.
        _ => buf.push(0xf6),
    }
}

fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut encoded: Vec<(Vec<u8>, Vec<u8>)> = entries
        .iter()
        .map(|(k, v)| {
            let mut kb = Vec::new();
            encode_value_to(&mut kb, k);
            let mut vb = Vec::new();
            encode_value_to(&mut vb, v);
            (kb, vb)
        })
        .collect();
    encoded.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, encoded.len() as u64);
    for (k, v) in encoded {
        buf.extend_from_slice(&k);
        buf.extend_from_slice(&v);
    }
}
