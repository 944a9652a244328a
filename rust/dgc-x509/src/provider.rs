// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Certificate lookup for signature verification.

use std::sync::Arc;

use crate::certificate::CertificateInfo;
use crate::kid::Kid;
use crate::CertificateError;

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("{0}")]
    Message(String),
}

/// Resolves candidate signer certificates.
///
/// Contract:
/// - Return `Ok(vec![])` when nothing matches; that is not an error.
/// - The returned order is a priority order: the verifier accepts the first
///   candidate whose signature checks out.
/// - Return `Err(...)` only when the lookup itself failed (e.g. a remote trust
///   list could not be fetched).
pub trait CertificateProvider: Send + Sync {
    /// Candidate DER certificates for `kid`, optionally narrowed to an issuing country.
    fn resolve(&self, kid: &[u8], country: Option<&str>) -> Result<Vec<Vec<u8>>, ProviderError>;
}

impl<T: CertificateProvider + ?Sized> CertificateProvider for Arc<T> {
    fn resolve(&self, kid: &[u8], country: Option<&str>) -> Result<Vec<Vec<u8>>, ProviderError> {
        (**self).resolve(kid, country)
    }
}

impl<T: CertificateProvider + ?Sized> CertificateProvider for &T {
    fn resolve(&self, kid: &[u8], country: Option<&str>) -> Result<Vec<Vec<u8>>, ProviderError> {
        (**self).resolve(kid, country)
    }
}

#[derive(Debug, Clone)]
struct TrustEntry {
    kid: Kid,
    country: Option<String>,
    der: Vec<u8>,
}

/// In-memory trust list.
///
/// Entries are returned in insertion order. A country hint only filters out
/// entries whose country is known and different.
#[derive(Debug, Default, Clone)]
pub struct StaticCertificateProvider {
    entries: Vec<TrustEntry>,
}

impl StaticCertificateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust a certificate under its computed KID and subject country.
    pub fn add_certificate(&mut self, der: &[u8]) -> Result<Kid, CertificateError> {
        let info = CertificateInfo::from_der(der)?;
        let kid = info.kid();
        self.entries.push(TrustEntry {
            kid,
            country: info.country().map(str::to_string),
            der: der.to_vec(),
        });
        Ok(kid)
    }

    pub fn with_certificate(mut self, der: &[u8]) -> Result<Self, CertificateError> {
        self.add_certificate(der)?;
        Ok(self)
    }

    /// Trust a certificate under an explicit KID and country, as published in
    /// a trust list. The certificate is stored as given.
    pub fn add_entry(&mut self, kid: Kid, country: Option<&str>, der: Vec<u8>) {
        self.entries.push(TrustEntry {
            kid,
            country: country.map(str::to_string),
            der,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CertificateProvider for StaticCertificateProvider {
    fn resolve(&self, kid: &[u8], country: Option<&str>) -> Result<Vec<Vec<u8>>, ProviderError> {
        let out: Vec<Vec<u8>> = self
            .entries
            .iter()
            .filter(|e| e.kid.as_ref() == kid)
            .filter(|e| match (country, e.country.as_deref()) {
                (Some(hint), Some(c)) => hint.eq_ignore_ascii_case(c),
                _ => true,
            })
            .map(|e| e.der.clone())
            .collect();

        tracing::trace!("resolved {} certificate(s) for kid {:02x?}", out.len(), kid);
        Ok(out)
    }
}
