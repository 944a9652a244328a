// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! COSE_Sign1 envelope and CWT claims for Digital Green Certificates.
//!
//! - [`Cwt`] / [`CwtBuilder`]: the signed claim set.
//! - [`CoseSign1Builder`] -> [`UnsignedCoseSign1`] -> [`CoseSign1`]: staged construction and signing.
//! - [`parse_cose_sign1`]: the decode side.
//! - [`CryptoBackend`]: the sign/verify primitives per [`SignatureAlgorithm`].

pub mod algorithms;
pub mod cose_sign1;
pub mod cwt;
pub mod error;
pub mod header_map;

pub use algorithms::{CryptoBackend, KeyFamily, PrivateKey, RustCryptoBackend, SignatureAlgorithm};
pub use cose_sign1::{
    encode_signature1_sig_structure, parse_cose_sign1, CoseSign1, CoseSign1Builder, UnsignedCoseSign1,
    COSE_SIGN1_TAG, CWT_TAG, KID_LEN, SIG_STRUCTURE_CONTEXT_SIGNATURE1,
};
pub use cwt::{from_numeric_date, to_numeric_date, Cwt, CwtBuilder, PayloadEncoding};
pub use error::CoseError;
pub use header_map::{encode_header_map, CoseHeaderMap, HeaderKey, HeaderValue, HEADER_ALG, HEADER_KID};
