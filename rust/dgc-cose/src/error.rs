// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;

#[derive(thiserror::Error, Debug)]
pub enum CoseError {
    /// The input is not a well-formed COSE_Sign1 or CWT structure.
    #[error("malformed COSE structure: {0}")]
    Format(String),

    /// A required header parameter is absent.
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    /// The `alg` header names an algorithm outside the supported set.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(i64),

    #[error("failed to encode CBOR: {0}")]
    Encode(String),

    /// The signature did not verify, or could not be checked with the given key.
    #[error("signature verification failed: {0}")]
    Signature(String),

    #[error("signing failed: {0}")]
    Signing(String),

    /// The key is neither P-256 nor RSA.
    #[error("unsupported key: {0}")]
    UnsupportedKey(String),

    /// Claims violate the CWT invariants.
    #[error("invalid claims: {0}")]
    InvalidClaims(String),
}

pub(crate) fn cbor_encode_error<E: Display>(e: E) -> CoseError {
    CoseError::Encode(e.to_string())
}

pub(crate) fn cbor_decode_error(context: &str, e: minicbor::decode::Error) -> CoseError {
    CoseError::Format(format!("{context}: {e}"))
}
