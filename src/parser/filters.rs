//! PDF Stream Filters
//!
//! FlateDecode per ISO 32000-1 Section 7.4.4 and the PNG predictor
//! preprocessing used by cross-reference streams, per RFC 2083 Section 6.
//! No other filters are decoded; streams carrying them pass through the
//! system as opaque bytes.

use super::{ParseError, ParseResult};
use flate2::read::ZlibDecoder;
use std::io::Read;

/// Decode FlateDecode (zlib/deflate) compressed data
pub fn decode_flate(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut result = Vec::new();
    decoder
        .read_to_end(&mut result)
        .map_err(|e| ParseError::StreamDecode(format!("flate decode error: {e}")))?;
    Ok(result)
}

/// Reverse the PNG row predictor over `data`.
///
/// Each encoded row is one filter-tag byte followed by `row_len` data
/// bytes; the reconstruction for each tag follows RFC 2083 Section 6 with
/// a one-byte pixel. Returns the concatenated data columns, tags stripped.
pub fn png_predictor(data: &[u8], row_len: usize) -> ParseResult<Vec<u8>> {
    if row_len == 0 {
        return Err(ParseError::StreamDecode(
            "predictor row length is zero".to_string(),
        ));
    }
    let stride = row_len + 1;
    if data.len() % stride != 0 {
        return Err(ParseError::StreamDecode(format!(
            "predictor data length {} is not a multiple of row stride {stride}",
            data.len()
        )));
    }

    let mut out = Vec::with_capacity(data.len() / stride * row_len);
    let mut prev = vec![0u8; row_len];

    for chunk in data.chunks_exact(stride) {
        let tag = chunk[0];
        let mut row = chunk[1..].to_vec();

        match tag {
            0 => {}
            1 => {
                for i in 1..row_len {
                    row[i] = row[i].wrapping_add(row[i - 1]);
                }
            }
            2 => {
                for i in 0..row_len {
                    row[i] = row[i].wrapping_add(prev[i]);
                }
            }
            3 => {
                for i in 0..row_len {
                    let left = if i > 0 { row[i - 1] as u16 } else { 0 };
                    let avg = ((left + prev[i] as u16) / 2) as u8;
                    row[i] = row[i].wrapping_add(avg);
                }
            }
            4 => {
                for i in 0..row_len {
                    let a = if i > 0 { row[i - 1] } else { 0 };
                    let b = prev[i];
                    let c = if i > 0 { prev[i - 1] } else { 0 };
                    row[i] = row[i].wrapping_add(paeth(a, b, c));
                }
            }
            other => {
                return Err(ParseError::StreamDecode(format!(
                    "unknown predictor filter tag {other}"
                )))
            }
        }

        out.extend_from_slice(&row);
        prev.copy_from_slice(&row);
    }

    Ok(out)
}

/// The Paeth predictor: of (left, above, upper-left), pick the neighbor
/// closest to `left + above - upper_left`.
fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i32 + b as i32 - c as i32;
    let pa = (p - a as i32).abs();
    let pb = (p - b as i32).abs();
    let pc = (p - c as i32).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
