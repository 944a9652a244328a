// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use dgc_cose::CoseError;
use dgc_encoding::EncodingError;
use dgc_x509::{CertificateError, ProviderError};

use crate::external::{BarcodeError, SchemaError};

/// Errors surfaced by signing, verification and decoding.
///
/// Structural problems with the input are [`DgcError::Format`]. Anything that
/// means the token could not be authenticated is [`DgcError::Signature`] and
/// is never reported as an expiration.
#[derive(thiserror::Error, Debug)]
pub enum DgcError {
    /// Malformed Base45, Zlib, CBOR or COSE input.
    #[error("format error: {0}")]
    Format(String),

    /// The signature did not verify, or no trusted certificate matched.
    #[error("signature error: {0}")]
    Signature(String),

    /// The signature verified but the signer certificate is outside its validity window.
    #[error("certificate expired: {0}")]
    CertificateExpired(String),

    /// The signature verified but the claims' expiration has passed.
    #[error("signed DGC has expired at {expired_at:?}")]
    TokenExpired { expired_at: std::time::SystemTime },

    /// Certificate metadata is malformed or incomplete.
    #[error("certificate error: {0}")]
    Certificate(#[source] CertificateError),

    /// The signer key is not a P-256 or RSA key, or does not fit the certificate.
    #[error("unsupported key: {0}")]
    UnsupportedKey(String),

    /// The certificate provider failed.
    #[error("certificate lookup failed: {0}")]
    CertificateLookup(#[source] ProviderError),

    #[error(transparent)]
    Barcode(#[from] BarcodeError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl DgcError {
    /// True for both certificate and claims expiration.
    pub fn is_expiration(&self) -> bool {
        matches!(self, DgcError::CertificateExpired(_) | DgcError::TokenExpired { .. })
    }
}

impl From<EncodingError> for DgcError {
    fn from(e: EncodingError) -> Self {
        DgcError::Format(e.to_string())
    }
}

impl From<CoseError> for DgcError {
    fn from(e: CoseError) -> Self {
        match e {
            CoseError::Format(_) | CoseError::MissingHeader(_) | CoseError::InvalidClaims(_) => {
                DgcError::Format(e.to_string())
            }
            CoseError::UnsupportedKey(msg) => DgcError::UnsupportedKey(msg),
            CoseError::UnsupportedAlgorithm(_)
            | CoseError::Signature(_)
            | CoseError::Signing(_)
            | CoseError::Encode(_) => DgcError::Signature(e.to_string()),
        }
    }
}

impl From<CertificateError> for DgcError {
    fn from(e: CertificateError) -> Self {
        match e {
            CertificateError::NotValidAt { .. } => DgcError::CertificateExpired(e.to_string()),
            other => DgcError::Certificate(other),
        }
    }
}

impl From<ProviderError> for DgcError {
    fn from(e: ProviderError) -> Self {
        DgcError::CertificateLookup(e)
    }
}
