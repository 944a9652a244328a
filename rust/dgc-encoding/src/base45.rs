// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Base45 (RFC 9285).
//!
//! Two input bytes `[a, b]` form `n = a * 256 + b`, written as three symbols
//! `c d e` with `n = c + d * 45 + e * 45^2`. A trailing single byte is written
//! as two symbols.

use crate::EncodingError;

const ALPHABET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

fn symbol_value(index: usize, c: u8) -> Result<u32, EncodingError> {
    let v = match c {
        b'0'..=b'9' => c - b'0',
        b'A'..=b'Z' => c - b'A' + 10,
        b' ' => 36,
        b'$' => 37,
        b'%' => 38,
        b'*' => 39,
        b'+' => 40,
        b'-' => 41,
        b'.' => 42,
        b'/' => 43,
        b':' => 44,
        _ => return Err(EncodingError::InvalidBase45Character { index, character: c as char }),
    };
    Ok(v as u32)
}

/// Encode bytes into Base45 text.
pub fn encode(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len().div_ceil(2) * 3);

    let mut chunks = input.chunks_exact(2);
    for pair in &mut chunks {
        let mut n = (pair[0] as usize) * 256 + pair[1] as usize;
        for _ in 0..3 {
            out.push(ALPHABET[n % 45] as char);
            n /= 45;
        }
    }

    if let [last] = chunks.remainder() {
        let n = *last as usize;
        out.push(ALPHABET[n % 45] as char);
        out.push(ALPHABET[n / 45] as char);
    }

    out
}

/// Decode Base45 text into bytes.
///
/// Fails on symbols outside the alphabet, on a dangling single symbol, and on
/// groups whose value does not fit the bytes they encode.
pub fn decode(input: &str) -> Result<Vec<u8>, EncodingError> {
    let bytes = input.as_bytes();
    if bytes.len() % 3 == 1 {
        return Err(EncodingError::InvalidBase45Length(bytes.len()));
    }

    let mut out = Vec::with_capacity(bytes.len() / 3 * 2 + 1);

    for (group, chunk) in bytes.chunks(3).enumerate() {
        let offset = group * 3;
        let mut n = 0u32;
        let mut factor = 1u32;
        for (i, c) in chunk.iter().enumerate() {
            n += symbol_value(offset + i, *c)? * factor;
            factor *= 45;
        }

        if chunk.len() == 3 {
            if n > 0xFFFF {
                return Err(EncodingError::Base45Overflow { offset });
            }
            out.push((n >> 8) as u8);
            out.push((n & 0xFF) as u8);
        } else {
            if n > 0xFF {
                return Err(EncodingError::Base45Overflow { offset });
            }
            out.push(n as u8);
        }
    }

    Ok(out)
}
