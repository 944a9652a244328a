// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! COSE_Sign1 build, sign, encode and parse.

use dgc_cose::{
    encode_signature1_sig_structure, parse_cose_sign1, CoseError, CoseSign1Builder, PrivateKey, RustCryptoBackend,
    SignatureAlgorithm, HEADER_ALG, HEADER_KID,
};
use minicbor::data::Tag;
use rand_core::OsRng;

const KID: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

fn es256_key() -> PrivateKey {
    PrivateKey::from(p256::ecdsa::SigningKey::random(&mut OsRng))
}

fn sign_es256(key: &PrivateKey, payload: &[u8]) -> Vec<u8> {
    CoseSign1Builder::new()
        .protected_attribute(HEADER_ALG, SignatureAlgorithm::ES256.cose_id())
        .protected_attribute(HEADER_KID, KID.as_slice())
        .content(payload)
        .build()
        .unwrap()
        .sign(key, &RustCryptoBackend)
        .unwrap()
        .encode()
        .unwrap()
}

// Helper to build a minimal COSE_Sign1 with controlled type mistakes.
fn encode_sign1(protected: &[u8], unprotected_is_map: bool, payload_is_bytes: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let mut enc = minicbor::Encoder::new(&mut out);

    enc.array(4).unwrap();
    enc.bytes(protected).unwrap();
    if unprotected_is_map {
        enc.map(0).unwrap();
    } else {
        enc.array(0).unwrap();
    }
    if payload_is_bytes {
        enc.bytes(b"payload").unwrap();
    } else {
        enc.null().unwrap();
    }
    enc.bytes(&[0u8; 64]).unwrap();
    out
}

#[test]
fn signed_message_round_trips_and_verifies() {
    let key = es256_key();
    let spki = key.public_key_spki_der().unwrap();
    let bytes = sign_es256(&key, b"claims");

    // Tagged with 18.
    assert_eq!(&bytes[..2], &[0xD2, 0x84]);

    let parsed = parse_cose_sign1(&bytes).unwrap();
    assert_eq!(parsed.algorithm().unwrap(), SignatureAlgorithm::ES256);
    assert_eq!(parsed.kid().unwrap(), KID);
    assert_eq!(parsed.payload, b"claims");
    assert!(parsed.unprotected_headers.is_empty());
    parsed.verify_signature(&spki, &RustCryptoBackend).unwrap();

    // Re-encoding a parsed message reproduces the input.
    assert_eq!(parsed.encode().unwrap(), bytes);
}

#[test]
fn protected_header_is_canonical() {
    let unsigned = CoseSign1Builder::new()
        .protected_attribute(HEADER_KID, KID.as_slice())
        .protected_attribute(HEADER_ALG, -7i64)
        .content(b"x".as_slice())
        .build()
        .unwrap();

    // { 1: -7, 4: h'0102030405060708' }
    let mut expected = vec![0xA2, 0x01, 0x26, 0x04, 0x48];
    expected.extend_from_slice(&KID);
    assert_eq!(unsigned.protected_headers().encoded_map_cbor(), expected.as_slice());

    let sig_structure = unsigned.sig_structure().unwrap();
    assert_eq!(
        sig_structure,
        encode_signature1_sig_structure(&expected, b"x").unwrap()
    );
}

#[test]
fn build_requires_alg_and_kid() {
    let err = CoseSign1Builder::new()
        .protected_attribute(HEADER_KID, KID.as_slice())
        .content(b"x".as_slice())
        .build()
        .unwrap_err();
    assert!(matches!(err, CoseError::MissingHeader("alg")));

    let err = CoseSign1Builder::new()
        .protected_attribute(HEADER_ALG, -7i64)
        .content(b"x".as_slice())
        .build()
        .unwrap_err();
    assert!(matches!(err, CoseError::MissingHeader("kid")));

    let err = CoseSign1Builder::new()
        .protected_attribute(HEADER_ALG, -35i64)
        .protected_attribute(HEADER_KID, KID.as_slice())
        .content(b"x".as_slice())
        .build()
        .unwrap_err();
    assert!(matches!(err, CoseError::UnsupportedAlgorithm(-35)));
}

#[test]
fn sign_rejects_key_of_other_family() {
    let rsa = rsa::RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
    let err = CoseSign1Builder::new()
        .protected_attribute(HEADER_ALG, SignatureAlgorithm::ES256.cose_id())
        .protected_attribute(HEADER_KID, KID.as_slice())
        .content(b"x".as_slice())
        .build()
        .unwrap()
        .sign(&PrivateKey::from(rsa), &RustCryptoBackend)
        .unwrap_err();
    assert!(matches!(err, CoseError::UnsupportedKey(_)));
}

#[test]
fn ps256_sign_and_verify() {
    let rsa = rsa::RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
    let key = PrivateKey::from(rsa);
    let spki = key.public_key_spki_der().unwrap();

    let bytes = CoseSign1Builder::new()
        .protected_attribute(HEADER_ALG, SignatureAlgorithm::PS256.cose_id())
        .protected_attribute(HEADER_KID, KID.as_slice())
        .content(b"rsa".as_slice())
        .build()
        .unwrap()
        .sign(&key, &RustCryptoBackend)
        .unwrap()
        .encode()
        .unwrap();

    let parsed = parse_cose_sign1(&bytes).unwrap();
    parsed.verify_signature(&spki, &RustCryptoBackend).unwrap();

    // Same message, but the header claims ES256 for an RSA key: never falls back.
    let es256_key = es256_key();
    let err = parsed
        .verify_signature(&es256_key.public_key_spki_der().unwrap(), &RustCryptoBackend)
        .unwrap_err();
    assert!(matches!(err, CoseError::Signature(_)));
}

#[test]
fn verify_detects_tampered_signature_and_payload() {
    let key = es256_key();
    let spki = key.public_key_spki_der().unwrap();
    let parsed = parse_cose_sign1(&sign_es256(&key, b"claims")).unwrap();

    let mut bad_sig = parsed.clone();
    bad_sig.signature[10] ^= 0x01;
    assert!(matches!(
        bad_sig.verify_signature(&spki, &RustCryptoBackend),
        Err(CoseError::Signature(_))
    ));

    let mut bad_payload = parsed.clone();
    bad_payload.payload[0] ^= 0x80;
    assert!(matches!(
        bad_payload.verify_signature(&spki, &RustCryptoBackend),
        Err(CoseError::Signature(_))
    ));
}

#[test]
fn parse_accepts_untagged_and_cwt_tagged() {
    let key = es256_key();
    let tagged = sign_es256(&key, b"p");

    // Strip tag 18.
    let untagged = tagged[1..].to_vec();
    assert_eq!(parse_cose_sign1(&untagged).unwrap().payload, b"p");

    // Tag 61 around tag 18.
    let mut cwt_tagged = Vec::new();
    minicbor::Encoder::new(&mut cwt_tagged).tag(Tag::new(61)).unwrap();
    cwt_tagged.extend_from_slice(&tagged);
    assert_eq!(parse_cose_sign1(&cwt_tagged).unwrap().payload, b"p");
}

#[test]
fn parse_rejects_other_tags() {
    let mut msg = Vec::new();
    minicbor::Encoder::new(&mut msg).tag(Tag::new(98)).unwrap();
    msg.extend_from_slice(&encode_sign1(&[0xA1, 0x01, 0x26], true, true));
    assert!(matches!(parse_cose_sign1(&msg), Err(CoseError::Format(_))));
}

#[test]
fn parse_rejects_structural_errors() {
    assert!(matches!(parse_cose_sign1(&[]), Err(CoseError::Format(_))));

    let protected_map = vec![0xA1, 0x01, 0x26]; // {1: -7}
    let err = parse_cose_sign1(&encode_sign1(&protected_map, false, true)).unwrap_err();
    assert!(err.to_string().contains("unprotected"));

    let err = parse_cose_sign1(&encode_sign1(&protected_map, true, false)).unwrap_err();
    assert!(err.to_string().contains("detached"));

    // Protected header bytes that are not a map.
    let err = parse_cose_sign1(&encode_sign1(&[0x83, 0x01, 0x02, 0x03], true, true)).unwrap_err();
    assert!(matches!(err, CoseError::Format(_)));

    let mut trailing = encode_sign1(&protected_map, true, true);
    trailing.push(0x00);
    let err = parse_cose_sign1(&trailing).unwrap_err();
    assert!(err.to_string().contains("trailing"));
}

#[test]
fn missing_headers_are_reported_on_parsed_message() {
    let parsed = parse_cose_sign1(&encode_sign1(&[], true, true)).unwrap();
    assert!(matches!(parsed.algorithm(), Err(CoseError::MissingHeader("alg"))));
    assert!(matches!(parsed.kid(), Err(CoseError::MissingHeader("kid"))));
}

#[test]
fn kid_must_be_eight_bytes() {
    let err = CoseSign1Builder::new()
        .protected_attribute(HEADER_ALG, -7i64)
        .protected_attribute(HEADER_KID, vec![0u8; 32])
        .content(b"x".as_slice())
        .build()
        .unwrap_err();
    assert!(matches!(err, CoseError::Format(_)), "{err:?}");

    let mut protected = Vec::new();
    {
        let mut enc = minicbor::Encoder::new(&mut protected);
        enc.map(2).unwrap();
        enc.i64(HEADER_ALG).unwrap().i64(-7).unwrap();
        enc.i64(HEADER_KID).unwrap().bytes(&[0u8; 32]).unwrap();
    }
    let parsed = parse_cose_sign1(&encode_sign1(&protected, true, true)).unwrap();
    assert!(matches!(parsed.kid(), Err(CoseError::Format(_))));
    assert_eq!(parsed.algorithm().unwrap(), SignatureAlgorithm::ES256);
}

#[test]
fn duplicate_header_labels_are_rejected() {
    // {1: -7, 1: -7}
    let protected = [0xA2, 0x01, 0x26, 0x01, 0x26];
    let err = parse_cose_sign1(&encode_sign1(&protected, true, true)).unwrap_err();
    assert!(matches!(err, CoseError::Format(_)), "{err:?}");

    // Unprotected map {4: h'', 4: h''}
    let mut bytes = Vec::new();
    let mut enc = minicbor::Encoder::new(&mut bytes);
    enc.array(4).unwrap();
    enc.bytes(&[]).unwrap();
    enc.map(2).unwrap();
    enc.i64(HEADER_KID).unwrap().bytes(&[]).unwrap();
    enc.i64(HEADER_KID).unwrap().bytes(&[]).unwrap();
    enc.bytes(b"payload").unwrap();
    enc.bytes(&[0u8; 64]).unwrap();
    assert!(matches!(parse_cose_sign1(&bytes), Err(CoseError::Format(_))));
}
