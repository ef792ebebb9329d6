//! PDF Parser Module
//!
//! Implements a native reader for the PDF file format according to
//! ISO 32000-1: tokenizer, object parser, cross-reference tables (classic
//! and stream form), object streams, and page-level queries.

pub mod lexer;
pub mod objects;
pub mod filters;
pub mod xref;
pub mod xref_stream;
pub mod object_stream;
pub mod reader;

pub use self::objects::{ObjectRef, PdfDictionary, PdfObject, PdfValue};
pub use self::reader::{PageBox, PdfReader};

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// PDF Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Invalid object reference: {0} {1} R")]
    InvalidReference(u32, u16),

    #[error("Object header mismatch: expected {expected_id} {expected_gen} obj, found {found_id} {found_gen} obj")]
    ObjectMismatch {
        expected_id: u32,
        expected_gen: u16,
        found_id: u32,
        found_gen: u16,
    },

    #[error("Missing required key: {0}")]
    MissingKey(String),

    #[error("Invalid cross-reference table")]
    InvalidXRef,

    #[error("Page tree count mismatch: /Count is {count} but {found} pages were collected")]
    PageCountMismatch { count: usize, found: usize },

    #[error("Page {0} does not exist")]
    PageNotFound(usize),

    #[error("Document has no pages")]
    NoPages,

    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    #[error("Stream decode error: {0}")]
    StreamDecode(String),
}
