// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Signature algorithms and the cryptographic backend that implements them.
//!
//! The algorithm set is closed: ES256 for P-256 keys, PS256 for RSA keys.
//! Orchestration code only talks to [`CryptoBackend`], so a different
//! implementation (HSM, platform crypto) can be swapped in without touching
//! the signer or verifier.

use std::fmt;

use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::OsRng;
use rsa::pkcs8::{DecodePrivateKey as _, DecodePublicKey as _, EncodePublicKey as _};
use rsa::pss;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use signature::{RandomizedSigner as _, SignatureEncoding as _, Signer as _, Verifier as _};

use crate::error::CoseError;

/// Public key families the algorithms apply to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// Elliptic curve key on NIST P-256.
    EcP256,
    Rsa,
}

impl KeyFamily {
    /// Determine the key family of a DER SubjectPublicKeyInfo.
    pub fn from_spki_der(spki_der: &[u8]) -> Result<Self, CoseError> {
        if p256::PublicKey::from_public_key_der(spki_der).is_ok() {
            return Ok(KeyFamily::EcP256);
        }
        if RsaPublicKey::from_public_key_der(spki_der).is_ok() {
            return Ok(KeyFamily::Rsa);
        }
        Err(CoseError::UnsupportedKey(
            "public key is neither P-256 nor RSA".to_string(),
        ))
    }
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyFamily::EcP256 => f.write_str("EC P-256"),
            KeyFamily::Rsa => f.write_str("RSA"),
        }
    }
}

/// Supported COSE algorithms (IANA COSE Algorithms registry).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum SignatureAlgorithm {
    /// ECDSA w/ SHA-256 over P-256.
    ES256 = -7,
    /// RSASSA-PSS w/ SHA-256.
    PS256 = -37,
}

impl SignatureAlgorithm {
    /// The value carried in the COSE `alg` header.
    pub fn cose_id(self) -> i64 {
        self as i64
    }

    pub fn from_cose_id(id: i64) -> Option<Self> {
        match id {
            -7 => Some(SignatureAlgorithm::ES256),
            -37 => Some(SignatureAlgorithm::PS256),
            _ => None,
        }
    }

    pub fn key_family(self) -> KeyFamily {
        match self {
            SignatureAlgorithm::ES256 => KeyFamily::EcP256,
            SignatureAlgorithm::PS256 => KeyFamily::Rsa,
        }
    }

    /// The default algorithm for a key family.
    pub fn for_key_family(family: KeyFamily) -> Self {
        match family {
            KeyFamily::EcP256 => SignatureAlgorithm::ES256,
            KeyFamily::Rsa => SignatureAlgorithm::PS256,
        }
    }
}

/// A private signing key.
#[derive(Clone)]
pub enum PrivateKey {
    EcP256(p256::ecdsa::SigningKey),
    Rsa(RsaPrivateKey),
}

impl PrivateKey {
    /// Load a PKCS#8 DER private key. Only P-256 and RSA keys are accepted.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, CoseError> {
        if let Ok(sk) = p256::ecdsa::SigningKey::from_pkcs8_der(der) {
            return Ok(PrivateKey::EcP256(sk));
        }
        if let Ok(sk) = RsaPrivateKey::from_pkcs8_der(der) {
            return Ok(PrivateKey::Rsa(sk));
        }
        Err(CoseError::UnsupportedKey(
            "private key is neither a PKCS#8 P-256 nor RSA key".to_string(),
        ))
    }

    pub fn key_family(&self) -> KeyFamily {
        match self {
            PrivateKey::EcP256(_) => KeyFamily::EcP256,
            PrivateKey::Rsa(_) => KeyFamily::Rsa,
        }
    }

    /// True if `spki_der` holds this key's public half.
    ///
    /// Keys are compared decoded, so a compressed P-256 point matches.
    pub fn matches_spki_der(&self, spki_der: &[u8]) -> bool {
        match self {
            PrivateKey::EcP256(sk) => p256::PublicKey::from_public_key_der(spki_der)
                .map(|pk| pk == p256::PublicKey::from(sk.verifying_key()))
                .unwrap_or(false),
            PrivateKey::Rsa(sk) => RsaPublicKey::from_public_key_der(spki_der)
                .map(|pk| pk == RsaPublicKey::from(sk))
                .unwrap_or(false),
        }
    }

    /// DER SubjectPublicKeyInfo of the matching public key.
    pub fn public_key_spki_der(&self) -> Result<Vec<u8>, CoseError> {
        let doc = match self {
            PrivateKey::EcP256(sk) => sk.verifying_key().to_public_key_der(),
            PrivateKey::Rsa(sk) => RsaPublicKey::from(sk).to_public_key_der(),
        };
        doc.map(|d| d.as_bytes().to_vec())
            .map_err(|e| CoseError::UnsupportedKey(format!("failed to encode public key: {e}")))
    }
}

impl From<p256::ecdsa::SigningKey> for PrivateKey {
    fn from(sk: p256::ecdsa::SigningKey) -> Self {
        PrivateKey::EcP256(sk)
    }
}

impl From<RsaPrivateKey> for PrivateKey {
    fn from(sk: RsaPrivateKey) -> Self {
        PrivateKey::Rsa(sk)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKey").field(&self.key_family()).finish()
    }
}

/// Sign and verify primitives keyed by algorithm.
///
/// Implementations must be safe to share between threads. The key family has
/// already been checked against the algorithm when these are called.
pub trait CryptoBackend: Send + Sync {
    /// Sign `tbs` and return the signature in its COSE encoding.
    fn sign(&self, alg: SignatureAlgorithm, key: &PrivateKey, tbs: &[u8]) -> Result<Vec<u8>, CoseError>;

    /// Verify a COSE-encoded signature over `tbs` with a DER SubjectPublicKeyInfo.
    fn verify(&self, alg: SignatureAlgorithm, spki_der: &[u8], tbs: &[u8], signature: &[u8]) -> Result<(), CoseError>;
}

/// Pure-Rust backend on `p256` and `rsa`.
#[derive(Debug, Default, Copy, Clone)]
pub struct RustCryptoBackend;

impl CryptoBackend for RustCryptoBackend {
    fn sign(&self, alg: SignatureAlgorithm, key: &PrivateKey, tbs: &[u8]) -> Result<Vec<u8>, CoseError> {
        match (alg, key) {
            (SignatureAlgorithm::ES256, PrivateKey::EcP256(sk)) => {
                let sig: p256::ecdsa::Signature = sk
                    .try_sign(tbs)
                    .map_err(|e| CoseError::Signing(format!("ES256: {e}")))?;
                // COSE carries ECDSA signatures as the raw `r || s` concatenation.
                Ok(sig.to_bytes().to_vec())
            }
            (SignatureAlgorithm::PS256, PrivateKey::Rsa(sk)) => {
                let signer = pss::SigningKey::<Sha256>::new(sk.clone());
                let sig = signer
                    .try_sign_with_rng(&mut OsRng, tbs)
                    .map_err(|e| CoseError::Signing(format!("PS256: {e}")))?;
                Ok(sig.to_vec())
            }
            (alg, key) => Err(CoseError::UnsupportedKey(format!(
                "{alg:?} cannot sign with a {} key",
                key.key_family()
            ))),
        }
    }

    fn verify(&self, alg: SignatureAlgorithm, spki_der: &[u8], tbs: &[u8], signature: &[u8]) -> Result<(), CoseError> {
        match alg {
            SignatureAlgorithm::ES256 => verify_ecdsa_p256(spki_der, tbs, signature),
            SignatureAlgorithm::PS256 => verify_rsa_pss(spki_der, tbs, signature),
        }
    }
}

/// Verify ES256 (P-256 ECDSA).
fn verify_ecdsa_p256(spki_der: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), CoseError> {
    let pk = p256::PublicKey::from_public_key_der(spki_der)
        .map_err(|e| CoseError::Signature(format!("bad P-256 public key: {e}")))?;

    // Convert to SEC1 encoded point bytes expected by the ECDSA verifying key.
    let ep = pk.to_encoded_point(false);
    let vk = p256::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
        .map_err(|e| CoseError::Signature(format!("bad P-256 public key: {e}")))?;

    let signature = p256::ecdsa::Signature::from_slice(sig)
        .map_err(|e| CoseError::Signature(format!("bad ES256 signature: {e}")))?;
    vk.verify(msg, &signature)
        .map_err(|_| CoseError::Signature("ES256 signature mismatch".to_string()))
}

/// Verify PS256 (RSASSA-PSS + SHA-256).
fn verify_rsa_pss(spki_der: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), CoseError> {
    let key = RsaPublicKey::from_public_key_der(spki_der)
        .map_err(|e| CoseError::Signature(format!("bad RSA public key: {e}")))?;
    let vk = pss::VerifyingKey::<Sha256>::new(key);
    let signature = pss::Signature::try_from(sig)
        .map_err(|e| CoseError::Signature(format!("bad PS256 signature bytes: {e}")))?;
    vk.verify(msg, &signature)
        .map_err(|_| CoseError::Signature("PS256 signature mismatch".to_string()))
}
