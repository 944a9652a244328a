// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Collaborators the decoder consumes but does not implement.

use std::collections::HashMap;

#[derive(thiserror::Error, Debug)]
#[error("barcode error: {0}")]
pub struct BarcodeError(pub String);

#[derive(thiserror::Error, Debug)]
#[error("schema error: {0}")]
pub struct SchemaError(pub String);

/// Reads the text of a 2D barcode from an image.
pub trait BarcodeDecoder: Send + Sync {
    /// Fails with [`BarcodeError`] when no decodable symbol is found.
    fn decode(&self, image: &[u8], hints: &HashMap<String, String>) -> Result<String, BarcodeError>;
}

/// Maps verified DGC payload bytes to a domain object.
pub trait SchemaMapper {
    type Output;

    /// Fails with [`SchemaError`] when the payload does not have the expected structure.
    fn bytes_to_payload(&self, bytes: &[u8]) -> Result<Self::Output, SchemaError>;
}

impl<F, T> SchemaMapper for F
where
    F: Fn(&[u8]) -> Result<T, SchemaError>,
{
    type Output = T;

    fn bytes_to_payload(&self, bytes: &[u8]) -> Result<T, SchemaError> {
        self(bytes)
    }
}
