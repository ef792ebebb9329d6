//! PDF Object Streams
//!
//! Containers holding multiple compressed objects (`/Type /ObjStm`),
//! per ISO 32000-1 Section 7.5.7. The decompressed payload starts with
//! `/N` pairs of `(sub-object id, relative offset)`; object bodies follow
//! from `/First` onwards.

use super::filters::decode_flate;
use super::lexer::{Lexer, Token};
use super::objects::{PdfDictionary, PdfValue};
use super::{ParseError, ParseResult};

/// A decoded object stream
pub struct ObjectStream {
    data: Vec<u8>,
    first: usize,
    pairs: Vec<(u32, usize)>,
}

impl ObjectStream {
    /// Decode a container object's dictionary and raw stream payload
    pub fn parse(dict: &PdfDictionary, raw: &[u8]) -> ParseResult<Self> {
        match dict.get("/Type").and_then(|t| t.as_name()) {
            Some("/ObjStm") => {}
            Some(other) => {
                return Err(ParseError::Unsupported(format!(
                    "expected /ObjStm container, got {other}"
                )))
            }
            None => {
                return Err(ParseError::Unsupported(
                    "container object has no /Type".to_string(),
                ))
            }
        }

        let n = dict
            .get("/N")
            .and_then(|v| v.as_integer())
            .ok_or_else(|| ParseError::MissingKey("/N".to_string()))?;
        if n <= 0 {
            return Err(ParseError::Syntax {
                position: 0,
                message: "object stream has no sub-objects".to_string(),
            });
        }
        let first = dict
            .get("/First")
            .and_then(|v| v.as_integer())
            .ok_or_else(|| ParseError::MissingKey("/First".to_string()))?
            as usize;

        if dict.contains_key("/DecodeParms") {
            return Err(ParseError::Unsupported(
                "predictor on an object stream".to_string(),
            ));
        }
        let data = match dict.get("/Filter").and_then(|f| f.as_name()) {
            Some("/FlateDecode") => decode_flate(raw)?,
            Some(other) => {
                return Err(ParseError::Unsupported(format!(
                    "object stream filter {other}"
                )))
            }
            None => raw.to_vec(),
        };

        let mut lexer = Lexer::new(&data);
        let mut pairs = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let sub_id = expect_int(&mut lexer)? as u32;
            let offset = expect_int(&mut lexer)? as usize;
            pairs.push((sub_id, offset));
        }

        Ok(ObjectStream { data, first, pairs })
    }

    /// Number of sub-objects in the container
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Parse the sub-object at `index`, returning its id and value
    pub fn value_at(&self, index: usize) -> ParseResult<(u32, PdfValue)> {
        let &(sub_id, offset) = self.pairs.get(index).ok_or_else(|| ParseError::Syntax {
            position: 0,
            message: format!(
                "object stream index {index} out of range ({} objects)",
                self.pairs.len()
            ),
        })?;

        let mut lexer = Lexer::at(&self.data, self.first + offset);
        let value = PdfValue::parse(&mut lexer)?;
        Ok((sub_id, value))
    }
}

fn expect_int(lexer: &mut Lexer) -> ParseResult<i64> {
    match lexer.next_token()? {
        Token::Word(w) => w.parse::<i64>().map_err(|_| ParseError::Syntax {
            position: lexer.position(),
            message: format!("expected integer in object stream header, got: {w}"),
        }),
        Token::Eof => Err(ParseError::UnexpectedEof),
        other => Err(ParseError::UnexpectedToken {
            expected: "integer".to_string(),
            found: format!("{other:?}"),
        }),
    }
}
