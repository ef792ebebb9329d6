//! Cross-Reference Streams
//!
//! PDF 1.5+ replacement for the classic xref table, per ISO 32000-1
//! Section 7.5.8. The stream payload is a sequence of fixed-width binary
//! rows, optionally preprocessed with a PNG predictor; each row describes
//! one object as free, in-use at a byte offset, or stored inside an
//! object stream.

use super::filters::{decode_flate, png_predictor};
use super::objects::PdfDictionary;
use super::xref::XrefTable;
use super::{ParseError, ParseResult};

/// Decode an xref stream's raw payload into `table`.
///
/// `dict` is the stream dictionary (which doubles as the trailer), `raw`
/// the undecoded stream bytes.
pub fn decode_xref_stream(
    dict: &PdfDictionary,
    raw: &[u8],
    table: &mut XrefTable,
) -> ParseResult<()> {
    let widths = field_widths(dict)?;
    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(ParseError::Syntax {
            position: 0,
            message: "/W widths sum to zero".to_string(),
        });
    }

    let data = match dict.get("/Filter").and_then(|f| f.as_name()) {
        Some("/FlateDecode") => decode_flate(raw)?,
        Some(other) => {
            return Err(ParseError::Unsupported(format!(
                "xref stream filter {other}"
            )))
        }
        None => raw.to_vec(),
    };

    let data = match predictor_params(dict)? {
        Some(_columns) => png_predictor(&data, row_len)?,
        None => data,
    };

    let subsections = index_subsections(dict)?;

    let mut rows = data.chunks_exact(row_len);
    'all: for (start, count) in subsections {
        for n in 0..count {
            let Some(row) = rows.next() else { break 'all };
            let id = (start + n) as u32;

            let (flag, rest) = row.split_at(widths[0]);
            let (f2, f3) = rest.split_at(widths[1]);
            // A zero-width first field defaults the row type to in-use.
            let flag = if widths[0] == 0 { 1 } else { be_bytes(flag) };

            match flag {
                0 => {}
                1 => table.insert_offset(id, be_bytes(f3) as u16, be_bytes(f2)),
                2 => table.insert_compressed(id, be_bytes(f2) as u32, be_bytes(f3) as u32),
                _ => {}
            }
        }
    }

    Ok(())
}

/// The three field widths from `/W`
fn field_widths(dict: &PdfDictionary) -> ParseResult<[usize; 3]> {
    let w = dict
        .get("/W")
        .and_then(|w| w.as_array())
        .ok_or_else(|| ParseError::MissingKey("/W".to_string()))?;
    if w.len() != 3 {
        return Err(ParseError::Syntax {
            position: 0,
            message: format!("/W must have 3 elements, found {}", w.len()),
        });
    }
    let mut widths = [0usize; 3];
    for (i, v) in w.iter().enumerate() {
        widths[i] = v.as_integer().ok_or_else(|| ParseError::Syntax {
            position: 0,
            message: "non-integer width in /W".to_string(),
        })? as usize;
    }
    Ok(widths)
}

/// `/Index` pairs, defaulting to `[0 /Size]`
fn index_subsections(dict: &PdfDictionary) -> ParseResult<Vec<(u64, u64)>> {
    if let Some(index) = dict.get("/Index").and_then(|v| v.as_array()) {
        let mut pairs = Vec::new();
        let mut i = 0;
        while i + 1 < index.len() {
            let start = index[i].as_integer().ok_or_else(|| ParseError::Syntax {
                position: 0,
                message: "non-integer in /Index".to_string(),
            })?;
            let count = index[i + 1]
                .as_integer()
                .ok_or_else(|| ParseError::Syntax {
                    position: 0,
                    message: "non-integer in /Index".to_string(),
                })?;
            pairs.push((start as u64, count as u64));
            i += 2;
        }
        Ok(pairs)
    } else {
        let size = dict
            .get("/Size")
            .and_then(|v| v.as_integer())
            .ok_or_else(|| ParseError::MissingKey("/Size".to_string()))?;
        Ok(vec![(0, size as u64)])
    }
}

/// Validate `/DecodeParms` and return the column count when a PNG
/// predictor is in effect. Only `/Columns <= 4` and `/Predictor <= 12`
/// are accepted.
fn predictor_params(dict: &PdfDictionary) -> ParseResult<Option<usize>> {
    let Some(parms) = dict.get("/DecodeParms").and_then(|p| p.as_dict()) else {
        return Ok(None);
    };

    let columns = parms
        .get("/Columns")
        .and_then(|c| c.as_integer())
        .unwrap_or(0);
    let predictor = parms
        .get("/Predictor")
        .and_then(|p| p.as_integer())
        .unwrap_or(0);

    if columns > 4 || predictor > 12 {
        return Err(ParseError::Unsupported(format!(
            "/DecodeParms with /Columns {columns} /Predictor {predictor}"
        )));
    }

    if predictor >= 10 {
        Ok(Some(columns as usize))
    } else if predictor > 1 {
        Err(ParseError::Unsupported(format!(
            "non-PNG predictor {predictor}"
        )))
    } else {
        Ok(None)
    }
}

fn be_bytes(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}
