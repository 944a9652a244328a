// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::SystemTime;

use dgc_cose::{CoseSign1Builder, Cwt, PrivateKey, SignatureAlgorithm, HEADER_ALG, HEADER_KID};
use dgc_x509::{CertificateError, CertificateInfo, Kid};

use crate::error::DgcError;
use crate::settings::SignerSettings;

/// An issuer's private key and its DER certificate.
#[derive(Debug, Clone)]
pub struct SignerCredential {
    key: PrivateKey,
    certificate: CertificateInfo,
}

impl SignerCredential {
    /// Pair a private key with its certificate.
    ///
    /// The certificate's public key must be the key's public half.
    pub fn new(key: PrivateKey, cert_der: &[u8]) -> Result<Self, DgcError> {
        let certificate = CertificateInfo::from_der(cert_der)?;
        if !key.matches_spki_der(certificate.spki_der()) {
            return Err(DgcError::UnsupportedKey(format!(
                "{} private key does not match the public key of '{}'",
                key.key_family(),
                certificate.subject()
            )));
        }
        Ok(Self { key, certificate })
    }

    /// Load a PKCS#8 DER private key (P-256 or RSA) and a DER certificate.
    pub fn from_pkcs8_der(key_der: &[u8], cert_der: &[u8]) -> Result<Self, DgcError> {
        Self::new(PrivateKey::from_pkcs8_der(key_der)?, cert_der)
    }

    pub fn certificate(&self) -> &CertificateInfo {
        &self.certificate
    }
}

/// Produces signed DGC tokens (tagged COSE_Sign1 bytes).
///
/// Country, KID, certificate expiration and algorithm are derived once from
/// the credential.
#[derive(Debug, Clone)]
pub struct DgcSigner {
    credential: SignerCredential,
    country: String,
    kid: Kid,
    not_after: SystemTime,
    algorithm: SignatureAlgorithm,
    settings: SignerSettings,
}

impl DgcSigner {
    pub fn new(credential: SignerCredential) -> Result<Self, DgcError> {
        Self::with_settings(credential, SignerSettings::default())
    }

    /// Fails with [`DgcError::Certificate`] when the certificate subject has no
    /// country, and with [`DgcError::UnsupportedKey`] when an algorithm override
    /// does not fit the key.
    pub fn with_settings(credential: SignerCredential, settings: SignerSettings) -> Result<Self, DgcError> {
        let cert = credential.certificate();
        let country = cert
            .country()
            .ok_or(CertificateError::MissingCountry)?
            .to_string();
        let kid = cert.kid();
        let not_after = cert.not_after();

        let family = credential.key.key_family();
        let algorithm = match settings.algorithm {
            Some(alg) if alg.key_family() != family => {
                return Err(DgcError::UnsupportedKey(format!(
                    "{alg:?} cannot be used with a {family} key"
                )));
            }
            Some(alg) => alg,
            None => SignatureAlgorithm::for_key_family(family),
        };

        tracing::debug!("signer for country {country} with kid {kid} uses {algorithm:?}");

        Ok(Self {
            credential,
            country,
            kid,
            not_after,
            algorithm,
            settings,
        })
    }

    /// Sign `payload` as a DGC that expires at `expiration`.
    pub fn sign(&self, payload: &[u8], expiration: SystemTime) -> Result<Vec<u8>, DgcError> {
        if expiration > self.not_after {
            tracing::warn!(
                "DGC expiration {expiration:?} is after the signer certificate expiration {:?}",
                self.not_after
            );
        }

        let issued_at = self.settings.signing_time.unwrap_or_else(SystemTime::now);
        let claims = Cwt::builder()
            .issuer(self.country.as_str())
            .issued_at(issued_at)
            .expiration(expiration)
            .dgc_v1(payload)
            .payload_encoding(self.settings.payload_encoding)
            .build()?;

        let unsigned = CoseSign1Builder::new()
            .protected_attribute(HEADER_ALG, self.algorithm.cose_id())
            .protected_attribute(HEADER_KID, self.kid.as_ref())
            .content(claims.encode()?)
            .build()?;

        let signed = unsigned.sign(&self.credential.key, self.settings.backend.as_ref())?;
        Ok(signed.encode()?)
    }

    pub fn signer_country(&self) -> &str {
        &self.country
    }

    /// The signer certificate's not-after time.
    pub fn signer_expiration(&self) -> SystemTime {
        self.not_after
    }

    pub fn kid(&self) -> Kid {
        self.kid
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn certificate_der(&self) -> &[u8] {
        self.credential.certificate.der()
    }
}
