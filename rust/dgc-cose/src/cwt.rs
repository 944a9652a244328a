// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! CBOR Web Token claims (RFC 8392) carrying a health certificate.
//!
//! ```text
//! { 1: iss, 4: exp, 6: iat, -260: { 1: dgc_v1 } }
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use minicbor::data::Type;
use minicbor::{Decoder, Encoder};

use crate::error::{cbor_decode_error, cbor_encode_error, CoseError};

pub const CLAIM_ISSUER: i64 = 1;
pub const CLAIM_EXPIRATION: i64 = 4;
pub const CLAIM_ISSUED_AT: i64 = 6;
/// Health certificate claim (`hcert`).
pub const CLAIM_HCERT: i64 = -260;
/// Key of the v1 DGC inside the `hcert` claim.
pub const HCERT_DGC_V1: i64 = 1;

/// How the DGC payload is placed under `-260/1`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// Opaque bytes, written as a CBOR byte string.
    #[default]
    ByteString,
    /// The payload is itself a CBOR item and is embedded as is.
    EmbeddedCbor,
}

/// An immutable CWT claim set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cwt {
    issuer: Option<String>,
    issued_at: Option<i64>,
    expiration: Option<i64>,
    dgc_v1: Vec<u8>,
    payload_encoding: PayloadEncoding,
}

impl Cwt {
    pub fn builder() -> CwtBuilder {
        CwtBuilder::default()
    }

    /// The issuing country.
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    pub fn issued_at(&self) -> Option<SystemTime> {
        self.issued_at.map(from_numeric_date)
    }

    pub fn expiration(&self) -> Option<SystemTime> {
        self.expiration.map(from_numeric_date)
    }

    /// The raw DGC payload bytes.
    ///
    /// For an embedded CBOR payload these are the encoded item.
    pub fn dgc_v1(&self) -> &[u8] {
        &self.dgc_v1
    }

    pub fn into_dgc_v1(self) -> Vec<u8> {
        self.dgc_v1
    }

    pub fn payload_encoding(&self) -> PayloadEncoding {
        self.payload_encoding
    }

    /// Encode the claims as a CBOR map with keys in deterministic order.
    pub fn encode(&self) -> Result<Vec<u8>, CoseError> {
        let entries = [
            self.issuer.is_some(),
            self.expiration.is_some(),
            self.issued_at.is_some(),
            true,
        ]
        .iter()
        .filter(|present| **present)
        .count();

        let mut out = Vec::with_capacity(32 + self.dgc_v1.len());
        {
            let mut enc = Encoder::new(&mut out);
            enc.map(entries as u64).map_err(cbor_encode_error)?;
            if let Some(iss) = &self.issuer {
                enc.i64(CLAIM_ISSUER).map_err(cbor_encode_error)?;
                enc.str(iss).map_err(cbor_encode_error)?;
            }
            if let Some(exp) = self.expiration {
                enc.i64(CLAIM_EXPIRATION).map_err(cbor_encode_error)?;
                enc.i64(exp).map_err(cbor_encode_error)?;
            }
            if let Some(iat) = self.issued_at {
                enc.i64(CLAIM_ISSUED_AT).map_err(cbor_encode_error)?;
                enc.i64(iat).map_err(cbor_encode_error)?;
            }
            enc.i64(CLAIM_HCERT).map_err(cbor_encode_error)?;
            enc.map(1).map_err(cbor_encode_error)?;
            enc.i64(HCERT_DGC_V1).map_err(cbor_encode_error)?;
            if self.payload_encoding == PayloadEncoding::ByteString {
                enc.bytes(&self.dgc_v1).map_err(cbor_encode_error)?;
            }
        }
        if self.payload_encoding == PayloadEncoding::EmbeddedCbor {
            out.extend_from_slice(&self.dgc_v1);
        }
        Ok(out)
    }

    /// Decode a claim set.
    ///
    /// Unknown claims are skipped. `iat` and `exp` are optional here; the
    /// `hcert` claim with a v1 payload is required.
    pub fn decode(input: &[u8]) -> Result<Self, CoseError> {
        let mut dec = Decoder::new(input);
        let len = dec
            .map()
            .map_err(|e| cbor_decode_error("CWT is not a map", e))?
            .ok_or_else(|| CoseError::Format("indefinite-length maps are not supported".to_string()))?;

        let mut issuer = None;
        let mut issued_at = None;
        let mut expiration = None;
        let mut dgc = None;

        for _ in 0..len {
            let key = match dec.datatype().map_err(|e| cbor_decode_error("failed to read claim key", e))? {
                Type::String => {
                    dec.skip().map_err(|e| cbor_decode_error("failed to skip claim key", e))?;
                    None
                }
                _ => Some(dec.i64().map_err(|e| cbor_decode_error("unsupported claim key", e))?),
            };

            match key {
                Some(CLAIM_ISSUER) => {
                    let iss = dec.str().map_err(|e| cbor_decode_error("iss is not a text string", e))?;
                    issuer = Some(iss.to_string());
                }
                Some(CLAIM_ISSUED_AT) => issued_at = Some(decode_numeric_date(&mut dec, "iat")?),
                Some(CLAIM_EXPIRATION) => expiration = Some(decode_numeric_date(&mut dec, "exp")?),
                Some(CLAIM_HCERT) => dgc = decode_hcert(&mut dec, input)?,
                _ => dec.skip().map_err(|e| cbor_decode_error("failed to skip claim", e))?,
            }
        }

        if dec.position() != input.len() {
            return Err(CoseError::Format("trailing bytes after CWT".to_string()));
        }

        let (dgc_v1, payload_encoding) =
            dgc.ok_or_else(|| CoseError::Format("missing hcert claim with a v1 payload".to_string()))?;

        Ok(Self {
            issuer,
            issued_at,
            expiration,
            dgc_v1,
            payload_encoding,
        })
    }
}

fn decode_numeric_date(dec: &mut Decoder<'_>, claim: &str) -> Result<i64, CoseError> {
    let t = dec.datatype().map_err(|e| cbor_decode_error(claim, e))?;
    match t {
        Type::F16 | Type::F32 | Type::F64 => {
            let f = dec.f64().map_err(|e| cbor_decode_error(claim, e))?;
            if !f.is_finite() {
                return Err(CoseError::Format(format!("{claim} is not a finite number")));
            }
            Ok(f.trunc() as i64)
        }
        _ => dec
            .i64()
            .map_err(|e| CoseError::Format(format!("{claim} is not a NumericDate: {e}"))),
    }
}

fn decode_hcert(dec: &mut Decoder<'_>, input: &[u8]) -> Result<Option<(Vec<u8>, PayloadEncoding)>, CoseError> {
    let len = dec
        .map()
        .map_err(|e| cbor_decode_error("hcert claim is not a map", e))?
        .ok_or_else(|| CoseError::Format("indefinite-length maps are not supported".to_string()))?;

    let mut found = None;
    for _ in 0..len {
        let key = dec.i64().map_err(|e| cbor_decode_error("unsupported hcert key", e))?;
        if key != HCERT_DGC_V1 {
            dec.skip().map_err(|e| cbor_decode_error("failed to skip hcert entry", e))?;
            continue;
        }

        let t = dec.datatype().map_err(|e| cbor_decode_error("failed to read DGC payload", e))?;
        if matches!(t, Type::Bytes) {
            let b = dec.bytes().map_err(|e| cbor_decode_error("failed to read DGC payload", e))?;
            found = Some((b.to_vec(), PayloadEncoding::ByteString));
        } else {
            let start = dec.position();
            dec.skip().map_err(|e| cbor_decode_error("failed to read DGC payload", e))?;
            found = Some((input[start..dec.position()].to_vec(), PayloadEncoding::EmbeddedCbor));
        }
    }
    Ok(found)
}

/// Builder for [`Cwt`].
#[derive(Debug, Default, Clone)]
pub struct CwtBuilder {
    issuer: Option<String>,
    issued_at: Option<SystemTime>,
    expiration: Option<SystemTime>,
    dgc_v1: Option<Vec<u8>>,
    payload_encoding: PayloadEncoding,
}

impl CwtBuilder {
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn issued_at(mut self, at: SystemTime) -> Self {
        self.issued_at = Some(at);
        self
    }

    pub fn expiration(mut self, at: SystemTime) -> Self {
        self.expiration = Some(at);
        self
    }

    pub fn dgc_v1(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.dgc_v1 = Some(payload.into());
        self
    }

    pub fn payload_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.payload_encoding = encoding;
        self
    }

    /// Check the claims and freeze them. Timestamps are truncated to seconds.
    pub fn build(self) -> Result<Cwt, CoseError> {
        let issuer = self
            .issuer
            .filter(|i| !i.is_empty())
            .ok_or_else(|| CoseError::InvalidClaims("issuer must be a non-empty country code".to_string()))?;
        let issued_at = self
            .issued_at
            .map(to_numeric_date)
            .ok_or_else(|| CoseError::InvalidClaims("issued-at is required".to_string()))?;
        let expiration = self
            .expiration
            .map(to_numeric_date)
            .ok_or_else(|| CoseError::InvalidClaims("expiration is required".to_string()))?;
        if expiration <= issued_at {
            return Err(CoseError::InvalidClaims(
                "expiration must be after issued-at".to_string(),
            ));
        }
        let dgc_v1 = self
            .dgc_v1
            .ok_or_else(|| CoseError::InvalidClaims("DGC payload is required".to_string()))?;

        if self.payload_encoding == PayloadEncoding::EmbeddedCbor {
            let mut dec = Decoder::new(&dgc_v1);
            dec.skip()
                .map_err(|e| CoseError::InvalidClaims(format!("DGC payload is not a CBOR item: {e}")))?;
            if dgc_v1.is_empty() || dec.position() != dgc_v1.len() {
                return Err(CoseError::InvalidClaims(
                    "DGC payload must be exactly one CBOR item".to_string(),
                ));
            }
        }

        Ok(Cwt {
            issuer: Some(issuer),
            issued_at: Some(issued_at),
            expiration: Some(expiration),
            dgc_v1,
            payload_encoding: self.payload_encoding,
        })
    }
}

/// Seconds since the Unix epoch; earlier times are negative.
pub fn to_numeric_date(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

pub fn from_numeric_date(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}
