// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Transport framing for Digital Green Certificates.
//!
//! A signed CWT travels as `HC1:` followed by the Base45 encoding of its
//! Zlib-compressed bytes:
//!
//! ```text
//! "HC1:" Base45(Zlib(COSE_Sign1))
//! ```

pub mod base45;
pub mod zlib;

pub use zlib::{compress, decompress, is_compressed, MAX_INFLATED_LEN};

/// Header prefix of a version 1 DGC transport string.
pub const DGC_V1_HEADER: &str = "HC1:";

#[derive(thiserror::Error, Debug)]
pub enum EncodingError {
    #[error("invalid Base45 character {character:?} at index {index}")]
    InvalidBase45Character { index: usize, character: char },

    #[error("invalid Base45 length {0}")]
    InvalidBase45Length(usize),

    #[error("Base45 group at offset {offset} is out of range")]
    Base45Overflow { offset: usize },

    #[error("missing ZLIB header")]
    MissingZlibHeader,

    #[error("failed to inflate ZLIB data: {0}")]
    Inflate(#[source] std::io::Error),

    #[error("failed to deflate data: {0}")]
    Deflate(#[source] std::io::Error),
}

/// Remove the `HC1:` prefix if present.
///
/// A missing prefix is tolerated and logged.
pub fn strip_header(text: &str) -> &str {
    match text.strip_prefix(DGC_V1_HEADER) {
        Some(rest) => {
            tracing::trace!(
                "stripped {DGC_V1_HEADER} header, Base45 encoding is {} characters long",
                rest.len()
            );
            rest
        }
        None => {
            tracing::info!("missing header {DGC_V1_HEADER}");
            text
        }
    }
}

/// Produce the transport string for signed CWT bytes.
pub fn encode_transport(cwt: &[u8]) -> Result<String, EncodingError> {
    let compressed = zlib::compress(cwt)?;
    let mut out = String::with_capacity(DGC_V1_HEADER.len() + compressed.len() / 2 * 3 + 2);
    out.push_str(DGC_V1_HEADER);
    out.push_str(&base45::encode(&compressed));
    Ok(out)
}

/// Recover signed CWT bytes from a transport string.
///
/// The header is optional and so is compression.
pub fn decode_transport(text: &str) -> Result<Vec<u8>, EncodingError> {
    let base45 = strip_header(text);

    tracing::trace!("Base45 decoding into a compressed CWT");
    let compressed = base45::decode(base45)?;
    tracing::trace!("compressed CWT is {} bytes long", compressed.len());

    let cwt = zlib::decompress(&compressed, true)?;
    tracing::trace!("inflated data into CWT of length {}", cwt.len());
    Ok(cwt)
}
