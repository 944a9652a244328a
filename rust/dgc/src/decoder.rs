// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;

use dgc_x509::CertificateProvider;

use crate::error::DgcError;
use crate::external::{BarcodeDecoder, BarcodeError, SchemaMapper};
use crate::verifier::{DgcVerifier, VerificationResult};

/// Turns a transport string, barcode image or raw CWT into verified payload bytes.
///
/// Any failing stage aborts the whole pipeline.
#[derive(Clone)]
pub struct DgcDecoder {
    provider: Arc<dyn CertificateProvider>,
    verifier: DgcVerifier,
    barcode_decoder: Option<Arc<dyn BarcodeDecoder>>,
}

impl DgcDecoder {
    pub fn new(provider: Arc<dyn CertificateProvider>) -> Self {
        Self {
            provider,
            verifier: DgcVerifier::default(),
            barcode_decoder: None,
        }
    }

    pub fn with_verifier(mut self, verifier: DgcVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_barcode_decoder(mut self, decoder: Arc<dyn BarcodeDecoder>) -> Self {
        self.barcode_decoder = Some(decoder);
        self
    }

    /// Decode and verify a transport string (`HC1:` + Base45), returning the full result.
    pub fn decode_to_result(&self, transport: impl AsRef<[u8]>) -> Result<VerificationResult, DgcError> {
        let text = std::str::from_utf8(transport.as_ref())
            .map_err(|e| DgcError::Format(format!("transport data is not text: {e}")))?;
        let cwt = dgc_encoding::decode_transport(text)?;
        self.verifier.verify(&cwt, self.provider.as_ref())
    }

    /// Decode and verify a transport string, returning the payload bytes.
    pub fn decode_to_bytes(&self, transport: impl AsRef<[u8]>) -> Result<Vec<u8>, DgcError> {
        Ok(self.decode_to_result(transport)?.payload)
    }

    /// Read a barcode image, then decode and verify its text.
    pub fn decode_barcode_to_bytes(
        &self,
        image: &[u8],
        hints: &HashMap<String, String>,
    ) -> Result<Vec<u8>, DgcError> {
        let decoder = self
            .barcode_decoder
            .as_ref()
            .ok_or_else(|| BarcodeError("no barcode decoder configured".to_string()))?;
        let text = decoder.decode(image, hints)?;
        tracing::trace!("barcode decoded into {} characters", text.len());
        self.decode_to_bytes(text)
    }

    /// Verify COSE_Sign1 bytes that have already been unpacked from transport.
    pub fn decode_raw_to_bytes(&self, cwt: &[u8]) -> Result<Vec<u8>, DgcError> {
        Ok(self.verifier.verify(cwt, self.provider.as_ref())?.payload)
    }

    pub fn decode<M: SchemaMapper>(&self, transport: impl AsRef<[u8]>, mapper: &M) -> Result<M::Output, DgcError> {
        let bytes = self.decode_to_bytes(transport)?;
        Ok(mapper.bytes_to_payload(&bytes)?)
    }

    pub fn decode_barcode<M: SchemaMapper>(
        &self,
        image: &[u8],
        hints: &HashMap<String, String>,
        mapper: &M,
    ) -> Result<M::Output, DgcError> {
        let bytes = self.decode_barcode_to_bytes(image, hints)?;
        Ok(mapper.bytes_to_payload(&bytes)?)
    }

    pub fn decode_raw<M: SchemaMapper>(&self, cwt: &[u8], mapper: &M) -> Result<M::Output, DgcError> {
        let bytes = self.decode_raw_to_bytes(cwt)?;
        Ok(mapper.bytes_to_payload(&bytes)?)
    }
}

impl std::fmt::Debug for DgcDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DgcDecoder")
            .field("verifier", &self.verifier)
            .field("has_barcode_decoder", &self.barcode_decoder.is_some())
            .finish_non_exhaustive()
    }
}
