//! PDF Reader
//!
//! The document-level entry point: owns the raw bytes of one PDF file,
//! bootstraps the cross-reference maps, resolves indirect references on
//! demand and answers page-level queries (count, boxes, resources,
//! content, rotation).
//!
//! The whole document is buffered up front and every parse runs over its
//! own cursor into the buffer, so resolving a reference in the middle of
//! another parse (a stream whose `/Length` is indirect, for instance)
//! never disturbs the outer parse position.

use super::lexer::{Lexer, Token};
use super::object_stream::ObjectStream;
use super::objects::{ObjectRef, PdfDictionary, PdfObject, PdfValue};
use super::xref::{self, XrefTable};
use super::xref_stream;
use super::{ParseError, ParseResult};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// The box names a page can carry
pub const AVAILABLE_BOXES: [&str; 5] = [
    "/MediaBox",
    "/CropBox",
    "/BleedBox",
    "/TrimBox",
    "/ArtBox",
];

/// One page box, scaled by the caller's unit factor.
///
/// `x`, `y`, `w`, `h` are divided by the factor; the corner coordinates
/// keep the document's units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PageBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

/// Reader over one PDF document
pub struct PdfReader {
    data: Vec<u8>,
    xref_pos: usize,
    xref: XrefTable,
    trailer: Option<PdfDictionary>,
    catalog: PdfValue,
    pages: Vec<PdfValue>,
    page_count: usize,
    source_id: String,
}

impl PdfReader {
    /// Open and parse a PDF file from a path
    pub fn open<P: AsRef<Path>>(path: P) -> ParseResult<Self> {
        let source_id = path.as_ref().display().to_string();
        let data = std::fs::read(path)?;
        Self::build(data, source_id)
    }

    /// Parse a PDF document from a seekable byte source
    pub fn from_reader<R: Read + Seek>(mut reader: R) -> ParseResult<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Parse a PDF document from an owned byte buffer
    pub fn from_bytes(data: Vec<u8>) -> ParseResult<Self> {
        let digest = Sha1::digest(&data);
        let source_id = digest.as_slice()[..8]
            .iter()
            .fold(String::from("stream-"), |mut s, b| {
                use std::fmt::Write;
                let _ = write!(s, "{b:02x}");
                s
            });
        Self::build(data, source_id)
    }

    fn build(data: Vec<u8>, source_id: String) -> ParseResult<Self> {
        let mut reader = PdfReader {
            data,
            xref_pos: 0,
            xref: XrefTable::new(),
            trailer: None,
            catalog: PdfValue::Null,
            pages: Vec::new(),
            page_count: 0,
            source_id,
        };

        reader.xref_pos = xref::find_startxref(&reader.data)?;
        reader.read_xref_at(reader.xref_pos)?;
        reader.read_root()?;
        reader.read_pages()?;

        Ok(reader)
    }

    /// Identifier of the source document (file path, or derived from the
    /// content for byte sources). Used by the rewriter as its hash salt.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// The retained trailer dictionary
    pub fn trailer(&self) -> Option<&PdfDictionary> {
        self.trailer.as_ref()
    }

    /// The resolved document catalog
    pub fn catalog(&self) -> &PdfValue {
        &self.catalog
    }

    /// Byte offset the final `startxref` pointed at
    pub fn xref_position(&self) -> usize {
        self.xref_pos
    }

    // --- cross-reference bootstrapping ---

    /// Parse the cross-reference section at `pos`, recursing into `/Prev`
    /// revisions. Entries from newer revisions always win.
    fn read_xref_at(&mut self, pos: usize) -> ParseResult<()> {
        let prev = {
            let mut lexer = Lexer::at(&self.data, pos);
            let token = lexer.next_token()?;
            match token {
                Token::Word(ref w) if w == "xref" => {
                    xref::parse_classic_sections(&mut lexer, &mut self.xref)?;
                    let trailer = match PdfValue::parse(&mut lexer)? {
                        PdfValue::Dictionary(d) => d,
                        other => {
                            return Err(ParseError::UnexpectedToken {
                                expected: "trailer dictionary".to_string(),
                                found: format!("{other:?}"),
                            })
                        }
                    };
                    let prev = trailer.get("/Prev").and_then(|v| v.as_integer());
                    if self.trailer.is_none() && trailer.contains_key("/Root") {
                        self.trailer = Some(trailer);
                    }
                    prev
                }
                other => {
                    let header = PdfValue::parse_with(&mut lexer, other)?;
                    let PdfValue::ObjectDecl(_) = header else {
                        return Err(ParseError::InvalidXRef);
                    };
                    let dict = match PdfValue::parse(&mut lexer)? {
                        PdfValue::Dictionary(d) => d,
                        _ => return Err(ParseError::InvalidXRef),
                    };
                    if dict.get("/Type").and_then(|t| t.as_name()) != Some("/XRef") {
                        return Err(ParseError::InvalidXRef);
                    }

                    let length = self.stream_length(&dict)?;
                    expect_keyword(&mut lexer, "stream")?;
                    lexer.skip_whitespace();
                    let raw = lexer.read_exact(length)?.to_vec();
                    expect_keyword(&mut lexer, "endstream")?;
                    expect_keyword(&mut lexer, "endobj")?;

                    xref_stream::decode_xref_stream(&dict, &raw, &mut self.xref)?;

                    let prev = dict.get("/Prev").and_then(|v| v.as_integer());
                    if self.trailer.is_none() && dict.contains_key("/Root") {
                        self.trailer = Some(dict);
                    }
                    prev
                }
            }
        };

        if let Some(prev) = prev {
            self.read_xref_at(prev as usize)?;
        }
        Ok(())
    }

    // --- object resolution ---

    /// Resolve an indirect reference to its object. Any other value,
    /// including an already-resolved object, is returned unchanged, which
    /// makes resolution idempotent.
    pub fn resolve_object(&self, value: &PdfValue) -> ParseResult<PdfValue> {
        let Some(r) = value.as_reference() else {
            return Ok(value.clone());
        };

        if !self.xref.has_offset(r.id) {
            return self.resolve_compressed_object(r);
        }
        let offset = self
            .xref
            .offset(r.id, r.gen)
            .ok_or(ParseError::InvalidReference(r.id, r.gen))? as usize;

        let mut lexer = Lexer::at(&self.data, offset);
        let header = PdfValue::parse(&mut lexer)?;
        let PdfValue::ObjectDecl(decl) = header else {
            return Err(ParseError::UnexpectedToken {
                expected: "object header".to_string(),
                found: format!("{header:?}"),
            });
        };
        if decl.id != r.id || decl.gen != r.gen {
            return Err(ParseError::ObjectMismatch {
                expected_id: r.id,
                expected_gen: r.gen,
                found_id: decl.id,
                found_gen: decl.gen,
            });
        }

        let value = PdfValue::parse(&mut lexer)?;

        match lexer.next_token()? {
            Token::Word(ref w) if w == "stream" => {
                lexer.skip_whitespace();
                let length = {
                    let dict = value.as_dict().ok_or_else(|| ParseError::Syntax {
                        position: lexer.position(),
                        message: "stream without a dictionary".to_string(),
                    })?;
                    self.stream_length(dict)?
                };
                let payload = lexer.read_exact(length)?.to_vec();
                expect_keyword(&mut lexer, "endstream")?;
                expect_keyword(&mut lexer, "endobj")?;
                Ok(PdfValue::Object(Box::new(PdfObject {
                    id: decl.id,
                    gen: decl.gen,
                    value,
                    stream: Some(payload),
                })))
            }
            Token::Word(ref w) if w == "endobj" => Ok(PdfValue::Object(Box::new(PdfObject {
                id: decl.id,
                gen: decl.gen,
                value,
                stream: None,
            }))),
            other => Err(ParseError::UnexpectedToken {
                expected: "stream or endobj".to_string(),
                found: format!("{other:?}"),
            }),
        }
    }

    /// Resolve an object stored inside an `/ObjStm` container
    fn resolve_compressed_object(&self, r: ObjectRef) -> ParseResult<PdfValue> {
        let (container, index) = self
            .xref
            .compressed_location(r.id)
            .ok_or(ParseError::InvalidReference(r.id, r.gen))?;

        let container_obj = self.resolve_object(&PdfValue::Reference(ObjectRef {
            id: container,
            gen: 0,
        }))?;
        let obj = container_obj.as_object().ok_or(ParseError::InvalidXRef)?;
        let dict = obj.value.as_dict().ok_or(ParseError::InvalidXRef)?;
        let raw = obj.stream.as_deref().ok_or_else(|| ParseError::Syntax {
            position: 0,
            message: format!("container object {container} has no stream"),
        })?;

        let stream = ObjectStream::parse(dict, raw)?;
        let (sub_id, value) = stream.value_at(index as usize)?;

        Ok(PdfValue::Object(Box::new(PdfObject {
            id: sub_id,
            gen: 0,
            value,
            stream: None,
        })))
    }

    /// A stream's `/Length`, resolving it lazily when indirect
    fn stream_length(&self, dict: &PdfDictionary) -> ParseResult<usize> {
        let length = dict
            .get("/Length")
            .ok_or_else(|| ParseError::MissingKey("/Length".to_string()))?;
        let resolved = self.resolve_object(length)?;
        resolved
            .as_integer()
            .map(|l| l as usize)
            .ok_or_else(|| ParseError::Syntax {
                position: 0,
                message: "stream /Length is not an integer".to_string(),
            })
    }

    // --- page tree ---

    fn read_root(&mut self) -> ParseResult<()> {
        let root = self
            .trailer
            .as_ref()
            .and_then(|t| t.get("/Root"))
            .ok_or_else(|| ParseError::MissingKey("/Root".to_string()))?
            .clone();
        self.catalog = self.resolve_object(&root)?;
        Ok(())
    }

    fn read_pages(&mut self) -> ParseResult<()> {
        let pages_ref = dict_of(&self.catalog)?
            .get("/Pages")
            .ok_or_else(|| ParseError::MissingKey("/Pages".to_string()))?
            .clone();
        let pages_node = self.resolve_object(&pages_ref)?;
        let pages_dict = dict_of(&pages_node)?;

        let count = self
            .resolve_object(
                pages_dict
                    .get("/Count")
                    .ok_or_else(|| ParseError::MissingKey("/Count".to_string()))?,
            )?
            .as_integer()
            .ok_or_else(|| ParseError::Syntax {
                position: 0,
                message: "/Count is not an integer".to_string(),
            })? as usize;

        let kids = self.resolve_object(
            pages_dict
                .get("/Kids")
                .ok_or_else(|| ParseError::MissingKey("/Kids".to_string()))?,
        )?;

        let mut pages = Vec::with_capacity(count);
        self.collect_kids(&kids, &mut pages)?;

        if pages.len() != count {
            return Err(ParseError::PageCountMismatch {
                count,
                found: pages.len(),
            });
        }

        self.pages = pages;
        self.page_count = count;
        Ok(())
    }

    /// Depth-first walk of a `/Kids` array, appending `/Page` leaves in
    /// encounter order.
    fn collect_kids(&self, kids: &PdfValue, pages: &mut Vec<PdfValue>) -> ParseResult<()> {
        let entries = kids.as_array().ok_or_else(|| ParseError::Syntax {
            position: 0,
            message: "/Kids is not an array".to_string(),
        })?;

        for entry in entries {
            let node = self.resolve_object(entry)?;
            let dict = dict_of(&node)?;
            match dict.get("/Type").and_then(|t| t.as_name()) {
                Some("/Page") => pages.push(node),
                Some("/Pages") => {
                    let sub_kids = self.resolve_object(
                        dict.get("/Kids")
                            .ok_or_else(|| ParseError::MissingKey("/Kids".to_string()))?,
                    )?;
                    self.collect_kids(&sub_kids, pages)?;
                }
                other => {
                    return Err(ParseError::Syntax {
                        position: 0,
                        message: format!("expected /Page or /Pages node, got {other:?}"),
                    })
                }
            }
        }
        Ok(())
    }

    fn page(&self, pageno: usize) -> ParseResult<&PdfValue> {
        if pageno == 0 || pageno > self.pages.len() {
            return Err(ParseError::PageNotFound(pageno));
        }
        Ok(&self.pages[pageno - 1])
    }

    // --- page queries (1-based page numbers) ---

    /// Number of pages in the document
    pub fn get_num_pages(&self) -> ParseResult<usize> {
        if self.page_count == 0 {
            return Err(ParseError::NoPages);
        }
        Ok(self.page_count)
    }

    /// All boxes of one page, scaled by `k`. Absent boxes are absent from
    /// the result.
    pub fn get_page_boxes(
        &self,
        pageno: usize,
        k: f64,
    ) -> ParseResult<HashMap<String, PageBox>> {
        let page = self.page(pageno)?;
        let mut result = HashMap::with_capacity(AVAILABLE_BOXES.len());
        for name in AVAILABLE_BOXES {
            if let Some(bx) = self.page_box(page, name, k)? {
                result.insert(name.to_string(), bx);
            }
        }
        Ok(result)
    }

    /// Boxes for every page, keyed by 1-based page number
    pub fn get_all_page_boxes(
        &self,
        k: f64,
    ) -> ParseResult<HashMap<usize, HashMap<String, PageBox>>> {
        let mut result = HashMap::with_capacity(self.pages.len());
        for pageno in 1..=self.pages.len() {
            result.insert(pageno, self.get_page_boxes(pageno, k)?);
        }
        Ok(result)
    }

    /// One named box, walking `/Parent` for inherited values
    fn page_box(&self, node: &PdfValue, name: &str, k: f64) -> ParseResult<Option<PageBox>> {
        let dict = dict_of(node)?;

        if let Some(value) = dict.get(name) {
            let resolved = self.resolve_object(value)?;
            let arr = resolved.as_array().ok_or_else(|| ParseError::Syntax {
                position: 0,
                message: format!("{name} is not an array"),
            })?;
            if arr.len() < 4 {
                return Err(ParseError::Syntax {
                    position: 0,
                    message: format!("{name} has {} elements, expected 4", arr.len()),
                });
            }
            let mut a = [0f64; 4];
            for (i, v) in arr.iter().take(4).enumerate() {
                a[i] = v.as_real().ok_or_else(|| ParseError::Syntax {
                    position: 0,
                    message: format!("{name} element {i} is not a number"),
                })?;
            }
            return Ok(Some(PageBox {
                x: a[0] / k,
                y: a[1] / k,
                w: (a[0] - a[2]).abs() / k,
                h: (a[1] - a[3]).abs() / k,
                llx: a[0].min(a[2]),
                lly: a[1].min(a[3]),
                urx: a[0].max(a[2]),
                ury: a[1].max(a[3]),
            }));
        }

        if let Some(parent) = dict.get("/Parent") {
            let parent = self.resolve_object(parent)?;
            return self.page_box(&parent, name, k);
        }

        Ok(None)
    }

    /// A page's `/Resources` value, inherited through `/Parent`. A page
    /// with no resources anywhere yields `Null`; importing such a page is
    /// legal.
    pub fn get_page_resources(&self, pageno: usize) -> ParseResult<PdfValue> {
        self.resources_of(self.page(pageno)?)
    }

    fn resources_of(&self, node: &PdfValue) -> ParseResult<PdfValue> {
        let dict = dict_of(node)?;

        if let Some(res) = dict.get("/Resources") {
            let resolved = self.resolve_object(res)?;
            return Ok(resolved.direct().clone());
        }
        if let Some(parent) = dict.get("/Parent") {
            let parent = self.resolve_object(parent)?;
            return self.resources_of(&parent);
        }
        Ok(PdfValue::Null)
    }

    /// A page's concatenated, decoded content bytes
    pub fn get_content(&self, pageno: usize) -> ParseResult<Vec<u8>> {
        let page = self.page(pageno)?;
        let dict = dict_of(page)?;

        let mut out = Vec::new();
        if let Some(contents) = dict.get("/Contents") {
            let mut streams = Vec::new();
            self.collect_content_streams(contents, &mut streams)?;
            for stream in &streams {
                out.extend_from_slice(&self.rebuild_content_stream(stream)?);
            }
        }
        Ok(out)
    }

    /// `/Contents` may be one stream reference or a (nested) array of them
    fn collect_content_streams(
        &self,
        contents: &PdfValue,
        out: &mut Vec<PdfValue>,
    ) -> ParseResult<()> {
        match contents {
            PdfValue::Reference(_) => {
                let resolved = self.resolve_object(contents)?;
                if let PdfValue::Array(_) = resolved.direct() {
                    let inner = resolved.direct().clone();
                    self.collect_content_streams(&inner, out)?;
                } else {
                    out.push(resolved);
                }
            }
            PdfValue::Array(items) => {
                for item in items {
                    self.collect_content_streams(item, out)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Apply a content stream's `/Filter` chain. Only flate is decoded;
    /// anything else is fatal.
    fn rebuild_content_stream(&self, content: &PdfValue) -> ParseResult<Vec<u8>> {
        let obj = content.as_object().ok_or_else(|| ParseError::Syntax {
            position: 0,
            message: "content is not a stream object".to_string(),
        })?;
        let payload = obj.stream.as_deref().ok_or_else(|| ParseError::Syntax {
            position: 0,
            message: "content object has no stream".to_string(),
        })?;

        let mut filters = Vec::new();
        if let Some(filter) = obj.value.as_dict().and_then(|d| d.get("/Filter")) {
            let resolved = self.resolve_object(filter)?;
            match resolved.direct() {
                PdfValue::Name(n) => filters.push(n.clone()),
                PdfValue::Array(items) => {
                    for item in items {
                        if let Some(n) = item.as_name() {
                            filters.push(n.to_string());
                        }
                    }
                }
                _ => {}
            }
        }

        let mut data = payload.to_vec();
        for filter in &filters {
            match filter.as_str() {
                "/FlateDecode" => data = super::filters::decode_flate(&data)?,
                other => {
                    return Err(ParseError::Unsupported(format!(
                        "content stream filter {other}"
                    )))
                }
            }
        }
        Ok(data)
    }

    /// A page's `/Rotate` value in degrees, inherited through `/Parent`,
    /// defaulting to 0.
    pub fn get_page_rotation(&self, pageno: usize) -> ParseResult<i64> {
        self.rotation_of(self.page(pageno)?)
    }

    fn rotation_of(&self, node: &PdfValue) -> ParseResult<i64> {
        let dict = dict_of(node)?;

        if let Some(rotate) = dict.get("/Rotate") {
            let resolved = self.resolve_object(rotate)?;
            return resolved
                .as_real()
                .map(|r| r as i64)
                .ok_or_else(|| ParseError::Syntax {
                    position: 0,
                    message: "/Rotate is not a number".to_string(),
                });
        }
        if let Some(parent) = dict.get("/Parent") {
            let parent = self.resolve_object(parent)?;
            return self.rotation_of(&parent);
        }
        Ok(0)
    }
}

fn dict_of(value: &PdfValue) -> ParseResult<&PdfDictionary> {
    value.as_dict().ok_or_else(|| ParseError::Syntax {
        position: 0,
        message: "expected a dictionary value".to_string(),
    })
}

fn expect_keyword(lexer: &mut Lexer, keyword: &str) -> ParseResult<()> {
    match lexer.next_token()? {
        Token::Word(ref w) if w == keyword => Ok(()),
        other => Err(ParseError::UnexpectedToken {
            expected: keyword.to_string(),
            found: format!("{other:?}"),
        }),
    }
}
