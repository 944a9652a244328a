// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! X.509 helpers for Digital Green Certificates: KID derivation, subject
//! country and validity extraction, and the certificate provider interface
//! the verifier resolves signer certificates through.

pub mod certificate;
pub mod kid;
pub mod provider;

use std::time::SystemTime;

pub use certificate::{extract_country, CertificateInfo};
pub use kid::{compute_kid, Kid, KID_LEN};
pub use provider::{CertificateProvider, ProviderError, StaticCertificateProvider};

#[derive(thiserror::Error, Debug)]
pub enum CertificateError {
    #[error("invalid certificate DER: {0}")]
    Parse(String),

    #[error("missing country in certificate subject")]
    MissingCountry,

    #[error("certificate '{subject}' is not valid at {at:?} (valid {not_before:?} to {not_after:?})")]
    NotValidAt {
        subject: String,
        at: SystemTime,
        not_before: SystemTime,
        not_after: SystemTime,
    },
}
