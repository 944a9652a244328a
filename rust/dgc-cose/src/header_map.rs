// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use minicbor::data::Type;
use minicbor::{Decoder, Encoder};

use crate::error::{cbor_encode_error, CoseError};

/// COSE header label for the algorithm identifier.
pub const HEADER_ALG: i64 = 1;
/// COSE header label for the key identifier.
pub const HEADER_KID: i64 = 4;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum HeaderKey {
    Int(i64),
    Text(String),
}

impl From<i64> for HeaderKey {
    fn from(v: i64) -> Self {
        HeaderKey::Int(v)
    }
}

impl From<&str> for HeaderKey {
    fn from(v: &str) -> Self {
        HeaderKey::Text(v.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Int(i64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<HeaderValue>),
    Map(BTreeMap<HeaderKey, HeaderValue>),
    Bool(bool),
    Null,
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        HeaderValue::Int(v)
    }
}

impl From<Vec<u8>> for HeaderValue {
    fn from(v: Vec<u8>) -> Self {
        HeaderValue::Bytes(v)
    }
}

impl From<&[u8]> for HeaderValue {
    fn from(v: &[u8]) -> Self {
        HeaderValue::Bytes(v.to_vec())
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Text(v.to_string())
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        HeaderValue::Bool(v)
    }
}

/// A decoded header map together with the exact CBOR bytes it came from.
///
/// For protected headers the bytes are what the signature covers, so they are
/// kept verbatim and never re-serialized.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CoseHeaderMap {
    encoded_map_cbor: Vec<u8>,
    map: BTreeMap<HeaderKey, HeaderValue>,
}

impl CoseHeaderMap {
    /// Build a header map from entries, encoding it canonically.
    pub fn from_map(map: BTreeMap<HeaderKey, HeaderValue>) -> Result<Self, CoseError> {
        let encoded_map_cbor = encode_header_map(&map)?;
        Ok(Self { encoded_map_cbor, map })
    }

    pub fn encoded_map_cbor(&self) -> &[u8] {
        &self.encoded_map_cbor
    }

    pub fn get(&self, key: i64) -> Option<&HeaderValue> {
        self.map.get(&HeaderKey::Int(key))
    }

    pub fn get_i64(&self, key: i64) -> Option<i64> {
        self.get(key).and_then(|v| match v {
            HeaderValue::Int(i) => Some(*i),
            _ => None,
        })
    }

    pub fn get_bytes(&self, key: i64) -> Option<&[u8]> {
        self.get(key).and_then(|v| match v {
            HeaderValue::Bytes(b) => Some(b.as_slice()),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn map(&self) -> &BTreeMap<HeaderKey, HeaderValue> {
        &self.map
    }

    pub(crate) fn from_parts(encoded_map_cbor: Vec<u8>, map: BTreeMap<HeaderKey, HeaderValue>) -> Self {
        Self { encoded_map_cbor, map }
    }
}

/// Encode a header map with keys in deterministic order (bytewise order of
/// their encodings, RFC 8949 section 4.2.1).
pub fn encode_header_map(map: &BTreeMap<HeaderKey, HeaderValue>) -> Result<Vec<u8>, CoseError> {
    let mut out = Vec::new();
    write_map(&mut out, map)?;
    Ok(out)
}

fn write_map(out: &mut Vec<u8>, map: &BTreeMap<HeaderKey, HeaderValue>) -> Result<(), CoseError> {
    let mut entries = Vec::with_capacity(map.len());
    for (k, v) in map {
        let mut key_bytes = Vec::new();
        {
            let mut enc = Encoder::new(&mut key_bytes);
            match k {
                HeaderKey::Int(i) => enc.i64(*i).map_err(cbor_encode_error)?,
                HeaderKey::Text(s) => enc.str(s).map_err(cbor_encode_error)?,
            };
        }
        entries.push((key_bytes, v));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    Encoder::new(&mut *out).map(entries.len() as u64).map_err(cbor_encode_error)?;
    for (key_bytes, value) in entries {
        out.extend_from_slice(&key_bytes);
        write_value(out, value)?;
    }
    Ok(())
}

fn write_value(out: &mut Vec<u8>, value: &HeaderValue) -> Result<(), CoseError> {
    let mut enc = Encoder::new(&mut *out);
    match value {
        HeaderValue::Int(i) => {
            enc.i64(*i).map_err(cbor_encode_error)?;
        }
        HeaderValue::Bytes(b) => {
            enc.bytes(b).map_err(cbor_encode_error)?;
        }
        HeaderValue::Text(s) => {
            enc.str(s).map_err(cbor_encode_error)?;
        }
        HeaderValue::Bool(b) => {
            enc.bool(*b).map_err(cbor_encode_error)?;
        }
        HeaderValue::Null => {
            enc.null().map_err(cbor_encode_error)?;
        }
        HeaderValue::Array(items) => {
            enc.array(items.len() as u64).map_err(cbor_encode_error)?;
            for item in items {
                write_value(out, item)?;
            }
        }
        HeaderValue::Map(m) => write_map(out, m)?,
    }
    Ok(())
}

pub(crate) fn decode_header_map_from_cbor(bytes: &[u8]) -> Result<BTreeMap<HeaderKey, HeaderValue>, CoseError> {
    // Empty bstr means empty map for protected headers.
    if bytes.is_empty() {
        return Ok(BTreeMap::new());
    }

    let mut dec = Decoder::new(bytes);
    let map = decode_header_map_from_decoder(&mut dec)?;

    if dec.position() != bytes.len() {
        return Err(CoseError::Format("trailing bytes after header map".to_string()));
    }

    Ok(map)
}

pub(crate) fn decode_header_map_from_decoder(
    dec: &mut Decoder<'_>,
) -> Result<BTreeMap<HeaderKey, HeaderValue>, CoseError> {
    let len = dec
        .map()
        .map_err(|e| CoseError::Format(format!("failed to read map: {e}")))?
        .ok_or_else(|| CoseError::Format("indefinite-length maps are not supported".to_string()))?;

    let mut map = BTreeMap::new();
    for _ in 0..len {
        let key = decode_header_key(dec)?;
        let value = decode_header_value(dec)?;
        if map.insert(key.clone(), value).is_some() {
            return Err(CoseError::Format(format!("duplicate header label {key:?}")));
        }
    }

    Ok(map)
}

fn is_integer(t: Type) -> bool {
    matches!(
        t,
        Type::I8 | Type::I16 | Type::I32 | Type::I64 | Type::Int | Type::U8 | Type::U16 | Type::U32 | Type::U64
    )
}

fn datatype(dec: &Decoder<'_>) -> Result<Type, CoseError> {
    dec.datatype().map_err(|e| CoseError::Format(e.to_string()))
}

fn decode_header_key(dec: &mut Decoder<'_>) -> Result<HeaderKey, CoseError> {
    match datatype(dec)? {
        t if is_integer(t) => {
            let i = dec
                .i64()
                .map_err(|e| CoseError::Format(format!("failed to decode int header key: {e}")))?;
            Ok(HeaderKey::Int(i))
        }
        Type::String => {
            let s = dec
                .str()
                .map_err(|e| CoseError::Format(format!("failed to decode text header key: {e}")))?;
            Ok(HeaderKey::Text(s.to_string()))
        }
        other => Err(CoseError::Format(format!("unsupported header key type: {other:?}"))),
    }
}

fn decode_header_value(dec: &mut Decoder<'_>) -> Result<HeaderValue, CoseError> {
    let fmt = |e: minicbor::decode::Error| CoseError::Format(e.to_string());
    match datatype(dec)? {
        Type::Null => {
            dec.null().map_err(fmt)?;
            Ok(HeaderValue::Null)
        }
        Type::Bool => Ok(HeaderValue::Bool(dec.bool().map_err(fmt)?)),
        Type::Bytes => Ok(HeaderValue::Bytes(dec.bytes().map_err(fmt)?.to_vec())),
        Type::String => Ok(HeaderValue::Text(dec.str().map_err(fmt)?.to_string())),
        t if is_integer(t) => Ok(HeaderValue::Int(dec.i64().map_err(fmt)?)),
        Type::Array => {
            let len = dec
                .array()
                .map_err(|e| CoseError::Format(format!("failed to read array: {e}")))?
                .ok_or_else(|| CoseError::Format("indefinite-length arrays are not supported".to_string()))?;
            let mut out = Vec::with_capacity(len.min(64) as usize);
            for _ in 0..len {
                out.push(decode_header_value(dec)?);
            }
            Ok(HeaderValue::Array(out))
        }
        Type::Map => Ok(HeaderValue::Map(decode_header_map_from_decoder(dec)?)),
        other => Err(CoseError::Format(format!("unsupported header value type: {other:?}"))),
    }
}
