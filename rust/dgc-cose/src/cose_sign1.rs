// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! COSE_Sign1 (RFC 9052 section 4.2).
//!
//! ```text
//! COSE_Sign1 = [ protected: bstr, unprotected: map, payload: bstr, signature: bstr ]
//! ```
//!
//! The signature covers the `Sig_structure`:
//!
//! ```text
//! [ "Signature1", protected: bstr, external_aad: bstr, payload: bstr ]
//! ```

use std::collections::BTreeMap;

use minicbor::data::{Tag, Type};
use minicbor::{Decoder, Encoder};

use crate::algorithms::{CryptoBackend, KeyFamily, PrivateKey, SignatureAlgorithm};
use crate::error::{cbor_decode_error, cbor_encode_error, CoseError};
use crate::header_map::{
    decode_header_map_from_cbor, decode_header_map_from_decoder, encode_header_map, CoseHeaderMap, HeaderKey,
    HeaderValue, HEADER_ALG, HEADER_KID,
};

pub const COSE_SIGN1_TAG: u64 = 18;
/// CBOR tag for a CWT, which may wrap the COSE_Sign1 tag.
pub const CWT_TAG: u64 = 61;
pub const SIG_STRUCTURE_CONTEXT_SIGNATURE1: &str = "Signature1";
/// Length of a DGC key identifier in bytes.
pub const KID_LEN: usize = 8;

/// A COSE_Sign1 message, either signed locally or parsed from bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct CoseSign1 {
    pub protected_headers: CoseHeaderMap,
    pub unprotected_headers: CoseHeaderMap,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl CoseSign1 {
    /// Parse COSE_Sign1 bytes. Equivalent to [`parse_cose_sign1`].
    pub fn decode(input: &[u8]) -> Result<Self, CoseError> {
        parse_cose_sign1(input)
    }

    /// The `alg` protected header.
    pub fn algorithm(&self) -> Result<SignatureAlgorithm, CoseError> {
        let id = self
            .protected_headers
            .get_i64(HEADER_ALG)
            .ok_or(CoseError::MissingHeader("alg"))?;
        SignatureAlgorithm::from_cose_id(id).ok_or(CoseError::UnsupportedAlgorithm(id))
    }

    /// The `kid` protected header. It must be exactly [`KID_LEN`] bytes.
    pub fn kid(&self) -> Result<&[u8], CoseError> {
        let kid = self
            .protected_headers
            .get_bytes(HEADER_KID)
            .ok_or(CoseError::MissingHeader("kid"))?;
        check_kid_len(kid)?;
        Ok(kid)
    }

    /// Verify the signature with a DER SubjectPublicKeyInfo.
    ///
    /// The algorithm named in the protected header must belong to the key's
    /// family; no other algorithm is tried.
    pub fn verify_signature(&self, spki_der: &[u8], backend: &dyn CryptoBackend) -> Result<(), CoseError> {
        let alg = self.algorithm()?;

        let family = KeyFamily::from_spki_der(spki_der).map_err(|e| CoseError::Signature(e.to_string()))?;
        if alg.key_family() != family {
            return Err(CoseError::Signature(format!(
                "algorithm {alg:?} does not apply to a {family} key"
            )));
        }

        // The exact protected bytes that were parsed, never a re-serialization.
        let tbs = encode_signature1_sig_structure(self.protected_headers.encoded_map_cbor(), &self.payload)?;
        backend.verify(alg, spki_der, &tbs, &self.signature)
    }

    /// Encode as a tagged COSE_Sign1.
    pub fn encode(&self) -> Result<Vec<u8>, CoseError> {
        let protected = self.protected_headers.encoded_map_cbor();
        let unprotected = encode_header_map(self.unprotected_headers.map())?;

        let mut out = Vec::with_capacity(16 + protected.len() + unprotected.len() + self.payload.len() + self.signature.len());
        {
            let mut enc = Encoder::new(&mut out);
            enc.tag(Tag::new(COSE_SIGN1_TAG)).map_err(cbor_encode_error)?;
            enc.array(4).map_err(cbor_encode_error)?;
            enc.bytes(protected).map_err(cbor_encode_error)?;
        }
        out.extend_from_slice(&unprotected);
        {
            let mut enc = Encoder::new(&mut out);
            enc.bytes(&self.payload).map_err(cbor_encode_error)?;
            enc.bytes(&self.signature).map_err(cbor_encode_error)?;
        }
        Ok(out)
    }
}

/// Builder for a COSE_Sign1 that has not been signed yet.
#[derive(Debug, Default, Clone)]
pub struct CoseSign1Builder {
    protected: BTreeMap<HeaderKey, HeaderValue>,
    unprotected: BTreeMap<HeaderKey, HeaderValue>,
    content: Option<Vec<u8>>,
}

impl CoseSign1Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protected_attribute(mut self, key: impl Into<HeaderKey>, value: impl Into<HeaderValue>) -> Self {
        self.protected.insert(key.into(), value.into());
        self
    }

    pub fn unprotected_attribute(mut self, key: impl Into<HeaderKey>, value: impl Into<HeaderValue>) -> Self {
        self.unprotected.insert(key.into(), value.into());
        self
    }

    pub fn content(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.content = Some(payload.into());
        self
    }

    /// Freeze the headers and content.
    ///
    /// `alg` and `kid` must be present as protected attributes and `alg` must
    /// be a supported algorithm.
    pub fn build(self) -> Result<UnsignedCoseSign1, CoseError> {
        let alg_id = match self.protected.get(&HeaderKey::Int(HEADER_ALG)) {
            Some(HeaderValue::Int(id)) => *id,
            _ => return Err(CoseError::MissingHeader("alg")),
        };
        let alg = SignatureAlgorithm::from_cose_id(alg_id).ok_or(CoseError::UnsupportedAlgorithm(alg_id))?;
        match self.protected.get(&HeaderKey::Int(HEADER_KID)) {
            Some(HeaderValue::Bytes(kid)) => check_kid_len(kid)?,
            _ => return Err(CoseError::MissingHeader("kid")),
        }
        let payload = self
            .content
            .ok_or_else(|| CoseError::Format("COSE_Sign1 content was not set".to_string()))?;

        // Serialized once: the same bytes feed the Sig_structure and the encoding.
        let protected = CoseHeaderMap::from_map(self.protected)?;
        let unprotected = CoseHeaderMap::from_map(self.unprotected)?;

        Ok(UnsignedCoseSign1 {
            alg,
            protected,
            unprotected,
            payload,
        })
    }
}

/// A COSE_Sign1 with frozen headers and payload, ready to be signed.
#[derive(Debug, Clone)]
pub struct UnsignedCoseSign1 {
    alg: SignatureAlgorithm,
    protected: CoseHeaderMap,
    unprotected: CoseHeaderMap,
    payload: Vec<u8>,
}

impl UnsignedCoseSign1 {
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.alg
    }

    pub fn protected_headers(&self) -> &CoseHeaderMap {
        &self.protected
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The bytes the signature is computed over.
    pub fn sig_structure(&self) -> Result<Vec<u8>, CoseError> {
        encode_signature1_sig_structure(self.protected.encoded_map_cbor(), &self.payload)
    }

    pub fn sign(self, key: &PrivateKey, backend: &dyn CryptoBackend) -> Result<CoseSign1, CoseError> {
        if key.key_family() != self.alg.key_family() {
            return Err(CoseError::UnsupportedKey(format!(
                "{:?} requires a {} key, got {}",
                self.alg,
                self.alg.key_family(),
                key.key_family()
            )));
        }

        let tbs = self.sig_structure()?;
        let signature = backend.sign(self.alg, key, &tbs)?;

        Ok(CoseSign1 {
            protected_headers: self.protected,
            unprotected_headers: self.unprotected,
            payload: self.payload,
            signature,
        })
    }
}

fn check_kid_len(kid: &[u8]) -> Result<(), CoseError> {
    if kid.len() != KID_LEN {
        return Err(CoseError::Format(format!(
            "kid must be {KID_LEN} bytes, got {}",
            kid.len()
        )));
    }
    Ok(())
}

fn datatype(dec: &Decoder<'_>) -> Result<Type, CoseError> {
    dec.datatype().map_err(|e| cbor_decode_error("failed to read CBOR item", e))
}

fn expect_tag(dec: &mut Decoder<'_>, expected: u64) -> Result<(), CoseError> {
    let tag = dec.tag().map_err(|e| cbor_decode_error("failed to read CBOR tag", e))?;
    if tag != Tag::new(expected) {
        return Err(CoseError::Format(format!("unexpected CBOR tag (expected {expected})")));
    }
    Ok(())
}

/// Parse a COSE_Sign1 structure from its CBOR encoding.
///
/// Accepts an untagged array, tag 18, or tag 61 wrapping tag 18. Every
/// structural problem is reported as [`CoseError::Format`].
pub fn parse_cose_sign1(input: &[u8]) -> Result<CoseSign1, CoseError> {
    if input.is_empty() {
        return Err(CoseError::Format("empty input".to_string()));
    }

    let mut dec = Decoder::new(input);

    if matches!(datatype(&dec)?, Type::Tag) {
        let mut probe = dec.clone();
        let tag = probe.tag().map_err(|e| cbor_decode_error("failed to read CBOR tag", e))?;
        if tag == Tag::new(CWT_TAG) {
            dec = probe;
            if matches!(datatype(&dec)?, Type::Tag) {
                expect_tag(&mut dec, COSE_SIGN1_TAG)?;
            }
        } else {
            expect_tag(&mut dec, COSE_SIGN1_TAG)?;
        }
    }

    let len = dec
        .array()
        .map_err(|e| cbor_decode_error("top-level item is not an array", e))?
        .ok_or_else(|| CoseError::Format("indefinite-length arrays are not supported".to_string()))?;

    if len != 4 {
        return Err(CoseError::Format("array length was not 4".to_string()));
    }

    // protected headers (bstr)
    let protected_bstr = dec
        .bytes()
        .map_err(|e| cbor_decode_error("failed to read protected headers (bstr)", e))?
        .to_vec();

    let protected_map = decode_header_map_from_cbor(&protected_bstr)?;

    // unprotected headers (map)
    if !matches!(datatype(&dec)?, Type::Map) {
        return Err(CoseError::Format("unprotected headers are not a map".to_string()));
    }
    let unprotected_map = decode_header_map_from_decoder(&mut dec)?;

    // payload (bstr); detached payloads are not used for DGCs
    let payload = match datatype(&dec)? {
        Type::Bytes => dec
            .bytes()
            .map_err(|e| cbor_decode_error("failed to read payload (bstr)", e))?
            .to_vec(),
        Type::Null => return Err(CoseError::Format("detached payload is not supported".to_string())),
        _ => return Err(CoseError::Format("payload is not a bstr".to_string())),
    };

    // signature (bstr)
    let signature = dec
        .bytes()
        .map_err(|e| cbor_decode_error("failed to read signature (bstr)", e))?
        .to_vec();

    if dec.position() != input.len() {
        return Err(CoseError::Format("trailing bytes after COSE_Sign1".to_string()));
    }

    Ok(CoseSign1 {
        protected_headers: CoseHeaderMap::from_parts(protected_bstr, protected_map),
        unprotected_headers: CoseHeaderMap::from_parts(Vec::new(), unprotected_map),
        payload,
        signature,
    })
}

/// Encode the `Sig_structure` for COSE_Sign1 with an empty external AAD.
pub fn encode_signature1_sig_structure(protected: &[u8], payload: &[u8]) -> Result<Vec<u8>, CoseError> {
    let mut out = Vec::with_capacity(32 + protected.len() + payload.len());
    {
        let mut enc = Encoder::new(&mut out);
        enc.array(4).map_err(cbor_encode_error)?;
        enc.str(SIG_STRUCTURE_CONTEXT_SIGNATURE1).map_err(cbor_encode_error)?;
        enc.bytes(protected).map_err(cbor_encode_error)?;
        enc.bytes(&[]).map_err(cbor_encode_error)?; // external_aad empty bstr
        enc.bytes(payload).map_err(cbor_encode_error)?;
    }
    Ok(out)
}
