// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use dgc_cose::{CryptoBackend, PayloadEncoding, RustCryptoBackend, SignatureAlgorithm};

/// Which instant the signer certificate's validity window is checked against.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum CertificateValidityTime {
    /// The time of verification.
    #[default]
    VerificationTime,
    /// The token's `iat` claim. Falls back to the verification time when the claim is absent.
    IssuedAt,
    /// The token's `exp` claim: the certificate must still be valid when the
    /// token expires. Falls back to the verification time when the claim is absent.
    Expiration,
    /// Do not check the certificate validity window.
    Skip,
}

#[derive(Clone)]
pub struct SignerSettings {
    pub(crate) algorithm: Option<SignatureAlgorithm>,
    pub(crate) payload_encoding: PayloadEncoding,
    pub(crate) signing_time: Option<SystemTime>,
    pub(crate) backend: Arc<dyn CryptoBackend>,
}

impl SignerSettings {
    /// Sign with `alg` instead of the algorithm derived from the key.
    ///
    /// The algorithm must still fit the key family.
    pub fn with_algorithm(mut self, alg: SignatureAlgorithm) -> Self {
        self.algorithm = Some(alg);
        self
    }

    pub fn with_payload_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.payload_encoding = encoding;
        self
    }

    /// Use a fixed `iat` instead of the current time.
    pub fn with_signing_time(mut self, at: SystemTime) -> Self {
        self.signing_time = Some(at);
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn CryptoBackend>) -> Self {
        self.backend = backend;
        self
    }
}

impl Default for SignerSettings {
    fn default() -> Self {
        Self {
            algorithm: None,
            payload_encoding: PayloadEncoding::default(),
            signing_time: None,
            backend: Arc::new(RustCryptoBackend),
        }
    }
}

impl fmt::Debug for SignerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerSettings")
            .field("algorithm", &self.algorithm)
            .field("payload_encoding", &self.payload_encoding)
            .field("signing_time", &self.signing_time)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct VerifierSettings {
    pub(crate) certificate_validity: CertificateValidityTime,
    /// If true, a token whose `exp` has passed fails with `TokenExpired`.
    pub(crate) enforce_expiration: bool,
    pub(crate) verification_time: Option<SystemTime>,
    pub(crate) backend: Arc<dyn CryptoBackend>,
}

impl VerifierSettings {
    pub fn with_certificate_validity(mut self, policy: CertificateValidityTime) -> Self {
        self.certificate_validity = policy;
        self
    }

    /// Report an expired token as valid. Callers can still inspect
    /// [`crate::VerificationResult::expiration`].
    pub fn without_expiration_check(mut self) -> Self {
        self.enforce_expiration = false;
        self
    }

    /// Verify as of `at` instead of the current time.
    pub fn with_verification_time(mut self, at: SystemTime) -> Self {
        self.verification_time = Some(at);
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn CryptoBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub(crate) fn now(&self) -> SystemTime {
        self.verification_time.unwrap_or_else(SystemTime::now)
    }
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            certificate_validity: CertificateValidityTime::default(),
            enforce_expiration: true,
            verification_time: None,
            backend: Arc::new(RustCryptoBackend),
        }
    }
}

impl fmt::Debug for VerifierSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierSettings")
            .field("certificate_validity", &self.certificate_validity)
            .field("enforce_expiration", &self.enforce_expiration)
            .field("verification_time", &self.verification_time)
            .finish_non_exhaustive()
    }
}
