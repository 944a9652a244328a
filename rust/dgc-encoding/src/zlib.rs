// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Zlib (RFC 1950) framing for signed CWTs.

use std::io::{self, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::EncodingError;

/// Returns true if `data` starts with a Zlib stream header.
///
/// The first byte (CMF) must name the deflate method with a window of at most
/// 32K, and the 16-bit header must be a multiple of 31 (FCHECK).
pub fn is_compressed(data: &[u8]) -> bool {
    let [cmf, flg, ..] = data else {
        return false;
    };
    let method = cmf & 0x0F;
    let window = cmf >> 4;
    let header = ((*cmf as u16) << 8) | (*flg as u16);
    method == 8 && window <= 7 && header % 31 == 0
}

/// Largest inflated CWT accepted, well above anything a QR code carries.
pub const MAX_INFLATED_LEN: usize = 64 * 1024;

/// Inflate a Zlib stream of at most [`MAX_INFLATED_LEN`] inflated bytes.
///
/// When the header is missing and `allow_raw` is set, the input is taken to be
/// already decompressed and returned as is. Some producers skip compression.
pub fn decompress(data: &[u8], allow_raw: bool) -> Result<Vec<u8>, EncodingError> {
    if !is_compressed(data) {
        if allow_raw {
            tracing::info!("data to inflate is missing the ZLIB header, assuming uncompressed data");
            return Ok(data.to_vec());
        }
        return Err(EncodingError::MissingZlibHeader);
    }

    let mut out = Vec::with_capacity(data.len() * 2);
    ZlibDecoder::new(data)
        .take(MAX_INFLATED_LEN as u64 + 1)
        .read_to_end(&mut out)
        .map_err(EncodingError::Inflate)?;
    if out.len() > MAX_INFLATED_LEN {
        return Err(EncodingError::Inflate(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("inflated data exceeds {MAX_INFLATED_LEN} bytes"),
        )));
    }
    Ok(out)
}

/// Deflate `data` into a Zlib stream at the best compression level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, EncodingError> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len()), Compression::best());
    encoder.write_all(data).map_err(EncodingError::Deflate)?;
    encoder.finish().map_err(EncodingError::Deflate)
}
