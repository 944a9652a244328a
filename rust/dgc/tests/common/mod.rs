// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared helpers for `dgc` integration tests: test identities with
//! controlled validity windows, fixed clocks and small certificate providers.

#![allow(dead_code)]

use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dgc::{
    CertificateProvider, DgcSigner, DgcVerifier, ProviderError, SignerCredential, SignerSettings,
    StaticCertificateProvider, VerifierSettings,
};
use rcgen::{date_time_ymd, CertificateParams, DistinguishedName, DnType, KeyPair};
use rsa::pkcs8::{EncodePrivateKey as _, LineEnding};

pub const Y2021: u64 = 1_609_459_200;
pub const Y2022: u64 = 1_640_995_200;
pub const Y2023: u64 = 1_672_531_200;
pub const Y2024: u64 = 1_704_067_200;
pub const Y2025: u64 = 1_735_689_600;
pub const Y2030: u64 = 1_893_456_000;
pub const Y2036: u64 = 2_082_758_400;

pub fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

/// A PKCS#8 private key and its self-signed certificate.
#[derive(Clone)]
pub struct Identity {
    pub key_der: Vec<u8>,
    pub cert_der: Vec<u8>,
}

fn self_signed(key: &KeyPair, country: Option<&str>, not_before: (i32, u8, u8), not_after: (i32, u8, u8)) -> Vec<u8> {
    let mut params = CertificateParams::new(vec!["dsc.example".to_string()]).unwrap();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, "DGC Document Signer");
    if let Some(c) = country {
        dn.push(DnType::CountryName, c);
    }
    params.distinguished_name = dn;
    params.not_before = date_time_ymd(not_before.0, not_before.1, not_before.2);
    params.not_after = date_time_ymd(not_after.0, not_after.1, not_after.2);
    params.self_signed(key).unwrap().der().to_vec()
}

pub fn p256_identity_valid(country: Option<&str>, not_before: (i32, u8, u8), not_after: (i32, u8, u8)) -> Identity {
    let key = KeyPair::generate().unwrap();
    Identity {
        cert_der: self_signed(&key, country, not_before, not_after),
        key_der: key.serialize_der(),
    }
}

/// A P-256 identity valid 2021-01-01 through 2035-01-01.
pub fn p256_identity(country: &str) -> Identity {
    p256_identity_valid(Some(country), (2021, 1, 1), (2035, 1, 1))
}

/// A shared RSA-2048 identity for country "DE", valid 2021 through 2035.
pub fn rsa_identity() -> &'static Identity {
    static IDENTITY: OnceLock<Identity> = OnceLock::new();
    IDENTITY.get_or_init(|| {
        let mut rng = rand_core::OsRng;
        let private_key = rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let pem = private_key.to_pkcs8_pem(LineEnding::LF).unwrap();
        let key = KeyPair::from_pkcs8_pem_and_sign_algo(&pem, &rcgen::PKCS_RSA_SHA256).unwrap();
        Identity {
            cert_der: self_signed(&key, Some("DE"), (2021, 1, 1), (2035, 1, 1)),
            key_der: private_key.to_pkcs8_der().unwrap().as_bytes().to_vec(),
        }
    })
}

pub fn credential(id: &Identity) -> SignerCredential {
    SignerCredential::from_pkcs8_der(&id.key_der, &id.cert_der).unwrap()
}

/// A signer whose `iat` is fixed at 2024-01-01.
pub fn signer(id: &Identity) -> DgcSigner {
    DgcSigner::with_settings(credential(id), SignerSettings::default().with_signing_time(at(Y2024))).unwrap()
}

/// A verifier whose clock is fixed at 2025-01-01.
pub fn verifier() -> DgcVerifier {
    DgcVerifier::with_settings(VerifierSettings::default().with_verification_time(at(Y2025)))
}

pub fn trust(ids: &[&Identity]) -> StaticCertificateProvider {
    let mut provider = StaticCertificateProvider::new();
    for id in ids {
        provider.add_certificate(&id.cert_der).unwrap();
    }
    provider
}

/// Returns its certificates for every KID, in order.
pub struct AnyKidProvider(pub Vec<Vec<u8>>);

impl CertificateProvider for AnyKidProvider {
    fn resolve(&self, _kid: &[u8], _country: Option<&str>) -> Result<Vec<Vec<u8>>, ProviderError> {
        Ok(self.0.clone())
    }
}

pub struct FailingProvider;

impl CertificateProvider for FailingProvider {
    fn resolve(&self, _kid: &[u8], _country: Option<&str>) -> Result<Vec<Vec<u8>>, ProviderError> {
        Err(ProviderError::Message("trust list unavailable".to_string()))
    }
}

/// Flip the lowest bit of the first byte of `needle` inside `haystack`.
pub fn flip_bit_in(haystack: &mut [u8], needle: &[u8]) {
    let pos = haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("needle not found");
    haystack[pos] ^= 0x01;
}
