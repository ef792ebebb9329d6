//! PDF Cross-Reference Table
//!
//! The two lookup maps built from classic xref tables (ISO 32000-1
//! Section 7.5.4) and cross-reference streams (Section 7.5.8), plus
//! `startxref` discovery and classic-table parsing.
//!
//! Revisions chained through `/Prev` are read newest-first; an object id
//! already recorded is never overwritten by an older revision.

use super::lexer::{Lexer, Token};
use super::{ParseError, ParseResult};
use std::collections::HashMap;

/// How many trailing bytes to scan for the final `startxref`
const STARTXREF_WINDOW: usize = 1500;

/// Cross-reference lookup maps.
///
/// An object id lives in at most one of the two maps: `offsets` for
/// objects stored directly in the file, `compressed` for objects stored
/// inside an object stream.
#[derive(Debug, Default)]
pub struct XrefTable {
    /// id -> generation -> byte offset
    offsets: HashMap<u32, HashMap<u16, u64>>,
    /// id -> (container object stream id, index within the container)
    compressed: HashMap<u32, (u32, u32)>,
}

impl XrefTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn known(&self, id: u32) -> bool {
        self.offsets.contains_key(&id) || self.compressed.contains_key(&id)
    }

    /// Record an in-use entry unless a newer revision already claimed the id
    pub fn insert_offset(&mut self, id: u32, gen: u16, offset: u64) {
        if self.known(id) {
            return;
        }
        self.offsets.insert(id, HashMap::from([(gen, offset)]));
    }

    /// Record a compressed-object entry unless the id is already claimed
    pub fn insert_compressed(&mut self, id: u32, container: u32, index: u32) {
        if self.known(id) {
            return;
        }
        self.compressed.insert(id, (container, index));
    }

    pub fn offset(&self, id: u32, gen: u16) -> Option<u64> {
        self.offsets.get(&id)?.get(&gen).copied()
    }

    pub fn has_offset(&self, id: u32) -> bool {
        self.offsets.contains_key(&id)
    }

    pub fn compressed_location(&self, id: u32) -> Option<(u32, u32)> {
        self.compressed.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.offsets.len() + self.compressed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty() && self.compressed.is_empty()
    }
}

/// Find the byte offset the final `startxref` points at by tokenizing the
/// tail of the document.
pub fn find_startxref(data: &[u8]) -> ParseResult<usize> {
    let start = data.len().saturating_sub(STARTXREF_WINDOW);
    let mut lexer = Lexer::at(data, start);

    loop {
        match lexer.next_token()? {
            Token::Word(ref w) if w == "startxref" => {
                let offset_token = lexer.next_token()?;
                let Token::Word(offset) = offset_token else {
                    return Err(ParseError::InvalidXRef);
                };
                return offset.parse::<usize>().map_err(|_| ParseError::Syntax {
                    position: lexer.position(),
                    message: format!("invalid startxref offset: {offset}"),
                });
            }
            Token::Eof => {
                return Err(ParseError::Syntax {
                    position: data.len(),
                    message: "startxref not found".to_string(),
                })
            }
            _ => {}
        }
    }
}

/// Parse the subsections of a classic xref table. The `xref` keyword has
/// already been consumed; this reads rows up to and including the
/// `trailer` keyword.
pub fn parse_classic_sections(lexer: &mut Lexer, table: &mut XrefTable) -> ParseResult<()> {
    loop {
        let token = lexer.next_token()?;
        let start = match token {
            Token::Word(ref w) if w == "trailer" => return Ok(()),
            Token::Word(w) => parse_int(&w, lexer.position())?,
            Token::Eof => return Err(ParseError::UnexpectedEof),
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "subsection start or trailer".to_string(),
                    found: format!("{other:?}"),
                })
            }
        };
        let count = expect_int(lexer)?;

        for i in 0..count {
            let offset = expect_int(lexer)?;
            let gen = expect_int(lexer)?;
            let status = match lexer.next_token()? {
                Token::Word(w) => w,
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "n or f".to_string(),
                        found: format!("{other:?}"),
                    })
                }
            };
            match status.as_str() {
                "n" => table.insert_offset((start + i) as u32, gen as u16, offset),
                "f" => {}
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "n or f".to_string(),
                        found: other.to_string(),
                    })
                }
            }
        }
    }
}

fn expect_int(lexer: &mut Lexer) -> ParseResult<u64> {
    match lexer.next_token()? {
        Token::Word(w) => parse_int(&w, lexer.position()),
        Token::Eof => Err(ParseError::UnexpectedEof),
        other => Err(ParseError::UnexpectedToken {
            expected: "integer".to_string(),
            found: format!("{other:?}"),
        }),
    }
}

fn parse_int(word: &str, position: usize) -> ParseResult<u64> {
    word.parse::<u64>().map_err(|_| ParseError::Syntax {
        position,
        message: format!("expected integer, got: {word}"),
    })
}
