// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Digital Green Certificate signing, verification and decoding.
//!
//! ```text
//! sign:   payload -> CWT claims -> COSE_Sign1 -> [HC1: Base45(Zlib(..))]
//! decode: [HC1:] Base45 -> Zlib -> COSE_Sign1 -> certificate lookup -> signature -> expiration -> payload
//! ```
//!
//! The lower layers are re-exported so most callers only depend on this crate.

mod decoder;
mod encoder;
mod error;
mod external;
mod settings;
mod signer;
mod verifier;

pub use decoder::DgcDecoder;
pub use encoder::DgcEncoder;
pub use error::DgcError;
pub use external::{BarcodeDecoder, BarcodeError, SchemaError, SchemaMapper};
pub use settings::{CertificateValidityTime, SignerSettings, VerifierSettings};
pub use signer::{DgcSigner, SignerCredential};
pub use verifier::{DgcVerifier, VerificationResult};

pub use dgc_cose::{CryptoBackend, PayloadEncoding, PrivateKey, RustCryptoBackend, SignatureAlgorithm};
pub use dgc_x509::{compute_kid, CertificateProvider, Kid, ProviderError, StaticCertificateProvider};

pub use dgc_cose as cose;
pub use dgc_encoding as encoding;
pub use dgc_x509 as x509;
