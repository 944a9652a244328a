// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::SystemTime;

use crate::error::DgcError;
use crate::signer::DgcSigner;

/// Signs payloads straight into transport strings.
#[derive(Debug, Clone)]
pub struct DgcEncoder {
    signer: DgcSigner,
}

impl DgcEncoder {
    pub fn new(signer: DgcSigner) -> Self {
        Self { signer }
    }

    pub fn signer(&self) -> &DgcSigner {
        &self.signer
    }

    /// `HC1:` + Base45(Zlib(signed COSE_Sign1)).
    pub fn sign_and_encode(&self, payload: &[u8], expiration: SystemTime) -> Result<String, DgcError> {
        let cwt = self.signer.sign(payload, expiration)?;
        Ok(dgc_encoding::encode_transport(&cwt)?)
    }
}
