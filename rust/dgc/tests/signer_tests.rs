// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod common;

use common::*;
use dgc::cose::{parse_cose_sign1, Cwt, HEADER_ALG, HEADER_KID};
use dgc::{compute_kid, DgcError, DgcSigner, PayloadEncoding, SignatureAlgorithm, SignerCredential, SignerSettings};

#[test]
fn signer_caches_certificate_metadata() {
    let id = p256_identity("SE");
    let signer = signer(&id);

    assert_eq!(signer.signer_country(), "SE");
    assert_eq!(signer.kid(), compute_kid(&id.cert_der));
    assert_eq!(signer.algorithm(), SignatureAlgorithm::ES256);
    assert_eq!(signer.certificate_der(), id.cert_der.as_slice());
    assert!(signer.signer_expiration() > at(Y2030));
}

#[test]
fn rsa_keys_sign_with_ps256() {
    let signer = signer(rsa_identity());
    assert_eq!(signer.algorithm(), SignatureAlgorithm::PS256);
    assert_eq!(signer.signer_country(), "DE");
}

#[test]
fn signed_token_carries_alg_kid_and_claims() {
    let id = p256_identity("SE");
    let signer = signer(&id);
    let token = signer.sign(b"test-payload", at(Y2030)).unwrap();

    // Tagged COSE_Sign1.
    assert_eq!(token[0], 0xD2);

    let message = parse_cose_sign1(&token).unwrap();
    assert_eq!(message.protected_headers.get_i64(HEADER_ALG), Some(-7));
    assert_eq!(message.protected_headers.get_bytes(HEADER_KID), Some(signer.kid().as_ref()));
    assert!(message.unprotected_headers.is_empty());

    let claims = Cwt::decode(&message.payload).unwrap();
    assert_eq!(claims.issuer(), Some("SE"));
    assert_eq!(claims.issued_at(), Some(at(Y2024)));
    assert_eq!(claims.expiration(), Some(at(Y2030)));
    assert_eq!(claims.dgc_v1(), b"test-payload");
    assert_eq!(claims.payload_encoding(), PayloadEncoding::ByteString);
}

#[test]
fn expiration_beyond_certificate_still_signs() {
    let id = p256_identity("SE");
    let signer = signer(&id);
    assert!(signer.sign(b"late", at(Y2036)).is_ok());
}

#[test]
fn expiration_before_issued_at_is_rejected() {
    let signer = signer(&p256_identity("SE"));
    let err = signer.sign(b"p", at(Y2023)).unwrap_err();
    assert!(matches!(err, DgcError::Format(_)), "{err:?}");
}

#[test]
fn certificate_without_country_is_rejected() {
    let id = p256_identity_valid(None, (2021, 1, 1), (2035, 1, 1));
    let err = DgcSigner::new(credential(&id)).unwrap_err();
    assert!(matches!(err, DgcError::Certificate(_)), "{err:?}");
}

#[test]
fn key_must_match_certificate() {
    let a = p256_identity("SE");
    let b = p256_identity("SE");
    let err = SignerCredential::from_pkcs8_der(&a.key_der, &b.cert_der).unwrap_err();
    assert!(matches!(err, DgcError::UnsupportedKey(_)), "{err:?}");

    let err = SignerCredential::from_pkcs8_der(&a.key_der, &rsa_identity().cert_der).unwrap_err();
    assert!(matches!(err, DgcError::UnsupportedKey(_)), "{err:?}");
}

#[test]
fn unsupported_private_key_is_rejected() {
    let id = p256_identity("SE");
    let err = SignerCredential::from_pkcs8_der(b"not a key", &id.cert_der).unwrap_err();
    assert!(matches!(err, DgcError::UnsupportedKey(_)), "{err:?}");
}

#[test]
fn malformed_certificate_is_rejected() {
    let id = p256_identity("SE");
    let err = SignerCredential::from_pkcs8_der(&id.key_der, b"not a certificate").unwrap_err();
    assert!(matches!(err, DgcError::Certificate(_)), "{err:?}");
}

#[test]
fn algorithm_override_must_fit_key() {
    let id = p256_identity("SE");
    let settings = SignerSettings::default().with_algorithm(SignatureAlgorithm::PS256);
    let err = DgcSigner::with_settings(credential(&id), settings).unwrap_err();
    assert!(matches!(err, DgcError::UnsupportedKey(_)), "{err:?}");

    let settings = SignerSettings::default().with_algorithm(SignatureAlgorithm::ES256);
    let signer = DgcSigner::with_settings(credential(&id), settings).unwrap();
    assert_eq!(signer.algorithm(), SignatureAlgorithm::ES256);
}

#[test]
fn embedded_cbor_payload_is_not_wrapped() {
    let id = p256_identity("SE");
    let settings = SignerSettings::default()
        .with_signing_time(at(Y2024))
        .with_payload_encoding(PayloadEncoding::EmbeddedCbor);
    let signer = DgcSigner::with_settings(credential(&id), settings).unwrap();

    // {"v": 1}
    let payload = [0xA1, 0x61, 0x76, 0x01];
    let token = signer.sign(&payload, at(Y2030)).unwrap();

    let claims = Cwt::decode(&parse_cose_sign1(&token).unwrap().payload).unwrap();
    assert_eq!(claims.payload_encoding(), PayloadEncoding::EmbeddedCbor);
    assert_eq!(claims.dgc_v1(), &payload);

    // Not a single CBOR item.
    assert!(matches!(signer.sign(&[0xA1], at(Y2030)), Err(DgcError::Format(_))));
}
