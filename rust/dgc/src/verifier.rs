// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::SystemTime;

use dgc_cose::{parse_cose_sign1, CoseSign1, Cwt, SignatureAlgorithm};
use dgc_x509::{CertificateInfo, CertificateProvider};

use crate::error::DgcError;
use crate::settings::{CertificateValidityTime, VerifierSettings};

/// The outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    /// The raw DGC payload.
    pub payload: Vec<u8>,
    /// The issuing country from the `iss` claim.
    pub issuer: Option<String>,
    pub issued_at: Option<SystemTime>,
    pub expiration: Option<SystemTime>,
    /// DER of the certificate whose key verified the signature.
    pub signer_certificate: Vec<u8>,
}

/// Authenticates signed DGC tokens against a certificate provider.
#[derive(Debug, Clone, Default)]
pub struct DgcVerifier {
    settings: VerifierSettings,
}

impl DgcVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: VerifierSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// Verify COSE_Sign1 bytes and return the authenticated claims.
    ///
    /// Candidates from `provider` are tried in order; the first whose key
    /// verifies the signature is the signer. Expiration is checked only after
    /// a signer was found.
    pub fn verify(&self, cwt: &[u8], provider: &dyn CertificateProvider) -> Result<VerificationResult, DgcError> {
        let message = parse_cose_sign1(cwt)?;
        let kid = message.kid()?;
        let alg = message.algorithm()?;

        // Used only to narrow the lookup; the claims are not trusted yet.
        let country_hint = Cwt::decode(&message.payload)
            .ok()
            .and_then(|claims| claims.issuer().map(str::to_string));

        let candidates = provider.resolve(kid, country_hint.as_deref())?;
        tracing::trace!(
            "checking {} candidate certificate(s) for kid {:02x?} using {alg:?}",
            candidates.len(),
            kid
        );

        let signer = self
            .find_signer(&message, alg, &candidates)
            .ok_or_else(|| DgcError::Signature("no valid certificate found".to_string()))?;

        let claims = Cwt::decode(&message.payload)?;
        let now = self.settings.now();

        match self.settings.certificate_validity {
            CertificateValidityTime::VerificationTime => signer.check_validity_at(now)?,
            CertificateValidityTime::IssuedAt => signer.check_validity_at(claims.issued_at().unwrap_or(now))?,
            CertificateValidityTime::Expiration => {
                signer.check_validity_at(claims.expiration().unwrap_or(now))?
            }
            CertificateValidityTime::Skip => {}
        }

        match claims.expiration() {
            Some(expired_at) if self.settings.enforce_expiration && now > expired_at => {
                return Err(DgcError::TokenExpired { expired_at });
            }
            Some(_) => {}
            None => tracing::warn!("signed DGC does not contain an expiration time"),
        }

        tracing::debug!(
            "verified DGC from {} signed by '{}'",
            claims.issuer().unwrap_or("<unknown issuer>"),
            signer.subject()
        );

        Ok(VerificationResult {
            issuer: claims.issuer().map(str::to_string),
            issued_at: claims.issued_at(),
            expiration: claims.expiration(),
            payload: claims.into_dgc_v1(),
            signer_certificate: signer.der().to_vec(),
        })
    }

    fn find_signer(
        &self,
        message: &CoseSign1,
        alg: SignatureAlgorithm,
        candidates: &[Vec<u8>],
    ) -> Option<CertificateInfo> {
        for der in candidates {
            let cert = match CertificateInfo::from_der(der) {
                Ok(cert) => cert,
                Err(e) => {
                    tracing::debug!("skipping unparsable candidate certificate: {e}");
                    continue;
                }
            };

            match message.verify_signature(cert.spki_der(), self.settings.backend.as_ref()) {
                Ok(()) => return Some(cert),
                Err(e) => tracing::debug!("{alg:?} signature does not verify with '{}': {e}", cert.subject()),
            }
        }
        None
    }
}
