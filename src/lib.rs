//! # pdf-import
//!
//! Import pages from existing PDF files so a PDF-generation library can
//! embed them as reusable Form XObjects.
//!
//! The crate has two halves. The [`parser`] module reads a source
//! document: it builds the cross-reference maps (classic tables and
//! PDF 1.5 cross-reference streams, including PNG-predictor decoding and
//! object streams), resolves indirect references on demand, and answers
//! page-level queries. The [`writer`] module re-emits a selected page as
//! a Form XObject together with every object it transitively references,
//! renumbering all indirect references into an id space chosen by the
//! embedding generator.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_import::Importer;
//!
//! # fn main() -> pdf_import::Result<()> {
//! let mut importer = Importer::new();
//! importer.set_source_file("document.pdf")?;
//!
//! // Wrap page 1, clipped to its MediaBox, as a template
//! let tpl = importer.import_page(1, "/MediaBox")?;
//!
//! // Emit the Form XObject and its dependencies
//! importer.set_next_object_id(100)?;
//! let templates = importer.put_form_xobjects()?;
//! let objects = importer.get_imported_objects()?;
//!
//! // Place the template at (10, 20) scaled to 100x150 units
//! let (name, sx, sy, tx, ty) = importer.use_template(tpl, 10.0, 20.0, 100.0, 150.0)?;
//! # let _ = (templates, objects, name, sx, sy, tx, ty);
//! # Ok(())
//! # }
//! ```
//!
//! Lower-level access goes through [`parser::PdfReader`] for document
//! queries and [`writer::PdfWriter`] for import and emission, one reader
//! per source document and one writer per target document.

pub mod compression;
pub mod error;
pub mod importer;
pub mod parser;
pub mod writer;

pub use error::{PdfError, Result};
pub use importer::Importer;
pub use parser::{ObjectRef, PageBox, ParseError, ParseResult, PdfDictionary, PdfObject,
    PdfReader, PdfValue};
pub use writer::{ObjectId, PdfWriter};
