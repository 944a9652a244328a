// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Certificate metadata used by the signer and verifier.
//!
//! This is parsing only. Certificate signatures and chains are not checked
//! here; trust comes from the certificate provider.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use x509_parser::certificate::X509Certificate;

use crate::kid::{compute_kid, Kid};
use crate::CertificateError;

/// Parsed view of a DER certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    der: Vec<u8>,
    kid: Kid,
    subject: String,
    country: Option<String>,
    spki_der: Vec<u8>,
    not_before: SystemTime,
    not_after: SystemTime,
}

impl CertificateInfo {
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let cert = parse(der)?;
        let validity = cert.validity();

        Ok(Self {
            der: der.to_vec(),
            kid: compute_kid(der),
            subject: cert.subject().to_string(),
            country: subject_country(&cert).ok(),
            spki_der: cert.tbs_certificate.subject_pki.raw.to_vec(),
            not_before: system_time(validity.not_before.timestamp()),
            not_after: system_time(validity.not_after.timestamp()),
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn kid(&self) -> Kid {
        self.kid
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The subject country, if the subject carries one.
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// DER SubjectPublicKeyInfo.
    pub fn spki_der(&self) -> &[u8] {
        &self.spki_der
    }

    pub fn not_before(&self) -> SystemTime {
        self.not_before
    }

    pub fn not_after(&self) -> SystemTime {
        self.not_after
    }

    /// Fails with [`CertificateError::NotValidAt`] outside `[not_before, not_after]`.
    pub fn check_validity_at(&self, at: SystemTime) -> Result<(), CertificateError> {
        if at < self.not_before || at > self.not_after {
            return Err(CertificateError::NotValidAt {
                subject: self.subject.clone(),
                at,
                not_before: self.not_before,
                not_after: self.not_after,
            });
        }
        Ok(())
    }
}

fn parse(der: &[u8]) -> Result<X509Certificate<'_>, CertificateError> {
    let (rest, cert) =
        x509_parser::parse_x509_certificate(der).map_err(|e| CertificateError::Parse(e.to_string()))?;
    if !rest.is_empty() {
        return Err(CertificateError::Parse("trailing bytes after certificate".to_string()));
    }
    Ok(cert)
}

fn subject_country(cert: &X509Certificate<'_>) -> Result<String, CertificateError> {
    let attr = cert
        .subject()
        .iter_country()
        .next()
        .ok_or(CertificateError::MissingCountry)?;
    let country = attr
        .as_str()
        .map_err(|_| CertificateError::MissingCountry)?;
    if country.is_empty() {
        return Err(CertificateError::MissingCountry);
    }
    Ok(country.to_string())
}

/// Country code (OID 2.5.4.6) of a DER certificate's subject.
///
/// The first country attribute wins; it must have a string type.
pub fn extract_country(cert_der: &[u8]) -> Result<String, CertificateError> {
    subject_country(&parse(cert_der)?)
}

fn system_time(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}
