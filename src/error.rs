use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] crate::parser::ParseError),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Invalid page number: {0}")]
    InvalidPageNumber(usize),

    #[error("No box dimensions available for {0}")]
    MissingBox(String),

    #[error("Template {0} is not registered")]
    UnknownTemplate(usize),

    #[error("No source document selected")]
    NoSource,
}

pub type Result<T> = std::result::Result<T, PdfError>;
