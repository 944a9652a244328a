// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

pub const KID_LEN: usize = 8;

/// Key identifier: the first 8 bytes of SHA-256 over a certificate's DER encoding.
///
/// Only used to look certificates up. It asserts nothing about the certificate.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Kid([u8; KID_LEN]);

impl Kid {
    pub fn new(bytes: [u8; KID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KID_LEN] {
        &self.0
    }

    /// Standard Base64, as used by published trust lists.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl TryFrom<&[u8]> for Kid {
    type Error = std::array::TryFromSliceError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(bytes.try_into()?))
    }
}

impl AsRef<[u8]> for Kid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Kid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kid({})", self.to_base64())
    }
}

impl fmt::Display for Kid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

/// Compute the KID of a DER-encoded certificate.
pub fn compute_kid(cert_der: &[u8]) -> Kid {
    let digest = Sha256::digest(cert_der);
    let mut kid = [0u8; KID_LEN];
    kid.copy_from_slice(&digest[..KID_LEN]);
    Kid(kid)
}
