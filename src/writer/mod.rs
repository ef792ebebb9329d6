//! Object-graph rewriter
//!
//! Turns pages captured from a [`PdfReader`] into Form XObjects plus the
//! transitive closure of every object they reference. Each indirect
//! reference is renumbered into an id space chosen by the embedding
//! generator; references are rewritten on first sight and their byte
//! positions recorded so a generator can patch ids after final layout.

pub mod object_id;

pub use self::object_id::ObjectId;

use self::object_id::hash_of_id;
use crate::compression;
use crate::error::{PdfError, Result};
use crate::parser::reader::PageBox;
use crate::parser::{ObjectRef, PdfReader, PdfValue};
use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;

/// One imported page, waiting for emission
struct PdfTemplate {
    resources: PdfValue,
    content: Vec<u8>,
    bbox: PageBox,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    rotation: i32,
    n: i64,
}

/// Mapping from a source object to its reserved new id
#[derive(Clone, Copy)]
struct ObjMapping {
    r: ObjectRef,
    new_id: i64,
}

type IdAllocator = Box<dyn FnMut() -> i64>;

/// Rewriter for one target document.
///
/// Import pages with [`import_page`](PdfWriter::import_page), then call
/// [`put_form_xobjects`](PdfWriter::put_form_xobjects) to emit the Form
/// XObjects and every object they transitively reference. Emitted bytes
/// carry no `n 0 obj` / `endobj` wrapper in either id mode; the consuming
/// generator adds those.
pub struct PdfWriter {
    tpls: Vec<PdfTemplate>,
    next_obj_id: i64,
    /// Source objects queued for emission
    obj_stack: BTreeMap<u32, ObjMapping>,
    /// Every source object ever queued, so a second encounter reuses the
    /// reserved id
    done_obj_stack: HashMap<u32, ObjMapping>,
    written_objs: HashMap<ObjectId, Vec<u8>>,
    written_obj_pos: HashMap<ObjectId, BTreeMap<usize, String>>,
    current_id: Option<ObjectId>,
    buffer: Vec<u8>,
    tpl_id_offset: usize,
    use_hash: bool,
    k: f64,
    allocator: Option<IdAllocator>,
    source_id: String,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        PdfWriter {
            tpls: Vec::new(),
            next_obj_id: 0,
            obj_stack: BTreeMap::new(),
            done_obj_stack: HashMap::new(),
            written_objs: HashMap::new(),
            written_obj_pos: HashMap::new(),
            current_id: None,
            buffer: Vec::new(),
            tpl_id_offset: 0,
            use_hash: false,
            k: 1.0,
            allocator: None,
            source_id: String::new(),
        }
    }

    /// Offset added to template indices when forming template names
    pub fn set_tpl_id_offset(&mut self, offset: usize) {
        self.tpl_id_offset = offset;
    }

    /// Seed the id counter so the next allocated id is `id`
    pub fn set_next_object_id(&mut self, id: i64) {
        self.next_obj_id = id - 1;
    }

    /// Write content hashes instead of integer ids into reference slots
    pub fn set_use_hash(&mut self, use_hash: bool) {
        self.use_hash = use_hash;
    }

    /// Unit factor applied to placement translations
    pub fn set_unit_factor(&mut self, k: f64) {
        self.k = k;
    }

    /// Replace the id counter with a caller-supplied allocator
    pub fn set_object_id_allocator(&mut self, allocator: impl FnMut() -> i64 + 'static) {
        self.allocator = Some(Box::new(allocator));
    }

    /// Bytes of every emitted object, keyed by its id record
    pub fn get_imported_objects(&self) -> &HashMap<ObjectId, Vec<u8>> {
        &self.written_objs
    }

    /// Drop all emitted objects
    pub fn clear_imported_objects(&mut self) {
        self.written_objs.clear();
    }

    /// For each emitted object, the byte positions where a reference was
    /// written, mapped to the referent's hash
    pub fn get_imported_obj_hash_pos(&self) -> &HashMap<ObjectId, BTreeMap<usize, String>> {
        &self.written_obj_pos
    }

    // --- import ---

    /// Capture one page of `reader` as a template. `box_name` picks the
    /// page box the Form XObject is clipped to; missing boxes fall back
    /// through `/CropBox` to `/MediaBox`. Returns the template's index.
    pub fn import_page(
        &mut self,
        reader: &PdfReader,
        pageno: usize,
        box_name: &str,
    ) -> Result<usize> {
        self.source_id = reader.source_id().to_string();

        let resources = reader.get_page_resources(pageno)?;
        let content = reader.get_content(pageno)?;
        let bbox = self.box_dimensions(reader, pageno, box_name)?;

        let mut tpl = PdfTemplate {
            resources,
            content,
            bbox,
            x: 0.0,
            y: 0.0,
            w: bbox.w,
            h: bbox.h,
            rotation: 0,
            n: 0,
        };

        let (rotation, swap) = normalize_rotation(reader.get_page_rotation(pageno)?);
        tpl.rotation = rotation;
        if swap {
            std::mem::swap(&mut tpl.w, &mut tpl.h);
        }

        self.tpls.push(tpl);
        Ok(self.tpls.len() - 1)
    }

    /// Dimensions for `box_name` on page `pageno`, with fallback and
    /// clipping to the MediaBox.
    fn box_dimensions(
        &self,
        reader: &PdfReader,
        pageno: usize,
        box_name: &str,
    ) -> Result<PageBox> {
        let num_pages = reader.get_num_pages()?;
        if pageno > num_pages {
            return Err(PdfError::InvalidPageNumber(pageno));
        }

        let boxes = reader.get_page_boxes(pageno, 1.0)?;
        let media = boxes.get("/MediaBox").copied();

        if let Some(bx) = boxes.get(box_name).copied() {
            if box_name == "/MediaBox" {
                return Ok(bx);
            }
            let media = media.ok_or_else(|| PdfError::MissingBox("/MediaBox".to_string()))?;
            return Ok(intersect_box(bx, media));
        }

        // Fallback chain: the edge boxes degrade to the CropBox, the
        // CropBox to the MediaBox.
        let fallback = match box_name {
            "/CropBox" => media,
            "/ArtBox" | "/BleedBox" | "/TrimBox" => boxes.get("/CropBox").copied().or(media),
            _ => None,
        };
        fallback.ok_or_else(|| PdfError::MissingBox(box_name.to_string()))
    }

    // --- emission ---

    /// Emit one Form XObject per imported template plus every object the
    /// templates transitively reference. Returns the map from template
    /// name to the Form XObject's id record.
    pub fn put_form_xobjects(&mut self, reader: &PdfReader) -> Result<HashMap<String, ObjectId>> {
        self.source_id = reader.source_id().to_string();

        let mut result = HashMap::with_capacity(self.tpls.len());
        let filter = "/Filter /FlateDecode ";

        for i in 0..self.tpls.len() {
            let compressed = compression::compress(&self.tpls[i].content)?;

            let obj_id = self.new_obj(None);
            self.tpls[i].n = obj_id;
            result.insert(
                format!("/GOFPDITPL{}", i + self.tpl_id_offset),
                ObjectId::new(obj_id, &self.source_id),
            );

            let tpl = &self.tpls[i];
            let bbox = tpl.bbox;
            let (x, y, rotation) = (tpl.x, tpl.y, tpl.rotation);
            let resources = tpl.resources.clone();

            self.out(&format!("<<{filter}/Type /XObject"));
            self.out("/Subtype /Form");
            self.out("/FormType 1");
            self.out(&format!(
                "/BBox [{:.2} {:.2} {:.2} {:.2}]",
                bbox.llx,
                bbox.lly,
                bbox.urx + x,
                bbox.ury - y
            ));

            let mut c = 1.0f64;
            let mut s = 0.0f64;
            let mut tx = -bbox.llx;
            let mut ty = -bbox.lly;
            if rotation != 0 {
                let angle = f64::from(rotation) * PI / 180.0;
                c = angle.cos();
                s = angle.sin();
                match rotation {
                    -90 => {
                        tx = -bbox.lly;
                        ty = bbox.urx;
                    }
                    -180 => {
                        tx = bbox.urx;
                        ty = bbox.ury;
                    }
                    -270 => {
                        tx = bbox.ury;
                        ty = -bbox.llx;
                    }
                    _ => {}
                }
            }
            if c != 1.0 || s != 0.0 || tx != 0.0 || ty != 0.0 {
                self.out(&format!(
                    "/Matrix [{c:.5} {s:.5} {:.5} {c:.5} {tx:.5} {ty:.5}]",
                    -s
                ));
            }

            self.out("/Resources ");
            self.write_value(&resources);

            self.out(&format!("/Length {} >>", compressed.len()));
            self.out("stream");
            self.buffer.extend_from_slice(&compressed);
            self.buffer.push(b'\n');
            self.out("endstream");
            self.end_obj();

            self.put_imported_objects(reader)?;
        }

        Ok(result)
    }

    /// Drain the pending queue with a work list: emitting an object can
    /// queue further references, so keep going until a pass finds the
    /// queue empty.
    fn put_imported_objects(&mut self, reader: &PdfReader) -> Result<()> {
        loop {
            if self.obj_stack.is_empty() {
                return Ok(());
            }
            let pending: Vec<ObjMapping> =
                std::mem::take(&mut self.obj_stack).into_values().collect();

            for mapping in pending {
                let resolved = reader.resolve_object(&PdfValue::Reference(mapping.r))?;
                self.new_obj_with_id(mapping.new_id);
                match &resolved {
                    PdfValue::Object(obj) if obj.stream.is_some() => self.write_value(&resolved),
                    PdfValue::Object(obj) => self.write_value(&obj.value),
                    other => self.write_value(other),
                }
                self.end_obj();
            }
        }
    }

    /// Template placement: name, x/y scale factors and the translation
    /// for drawing the template at `(x, y)` with size `(w, h)` in caller
    /// units. Zero `w`/`h` are filled from the template's native aspect.
    pub fn use_template(
        &self,
        tplid: usize,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    ) -> Result<(String, f64, f64, f64, f64)> {
        let tpl = self
            .tpls
            .get(tplid)
            .ok_or(PdfError::UnknownTemplate(tplid))?;

        let x = x + tpl.x;
        let y = y + tpl.y;

        let (mut w, mut h) = (w, h);
        if w == 0.0 && h == 0.0 {
            w = tpl.w;
            h = tpl.h;
        }
        if w == 0.0 {
            w = h * tpl.w / tpl.h;
        }
        if h == 0.0 {
            h = w * tpl.h / tpl.w;
        }

        let scale_x = w / tpl.w;
        let scale_y = h / tpl.h;
        let tx = x * self.k;
        let ty = (0.0 - y - h) * self.k;

        Ok((
            format!("/GOFPDITPL{}", tplid + self.tpl_id_offset),
            scale_x,
            scale_y,
            tx,
            ty,
        ))
    }

    // --- output primitives ---

    fn alloc_id(&mut self) -> i64 {
        match &mut self.allocator {
            Some(alloc) => self.next_obj_id = alloc(),
            None => self.next_obj_id += 1,
        }
        self.next_obj_id
    }

    /// Begin a new output object; allocates an id unless one is given
    fn new_obj(&mut self, id: Option<i64>) -> i64 {
        let id = id.unwrap_or_else(|| self.alloc_id());
        self.new_obj_with_id(id);
        id
    }

    fn new_obj_with_id(&mut self, id: i64) {
        let obj_id = ObjectId::new(id, &self.source_id);
        self.written_obj_pos.entry(obj_id.clone()).or_default();
        self.current_id = Some(obj_id);
        self.buffer = Vec::new();
    }

    fn end_obj(&mut self) {
        if let Some(id) = self.current_id.take() {
            self.written_objs.insert(id, std::mem::take(&mut self.buffer));
        }
    }

    fn out(&mut self, s: &str) {
        self.buffer.extend_from_slice(s.as_bytes());
        self.buffer.push(b'\n');
    }

    fn straight_out(&mut self, s: &str) {
        self.buffer.extend_from_slice(s.as_bytes());
    }

    /// Write a reference slot: record the position of the id text under
    /// the referent's hash, then write the id (or the hash itself in hash
    /// mode).
    fn out_obj_ref(&mut self, obj_id: i64) {
        let sha = hash_of_id(obj_id, &self.source_id);
        if let Some(current) = &self.current_id {
            if let Some(positions) = self.written_obj_pos.get_mut(current) {
                positions.insert(self.buffer.len(), sha.clone());
            }
        }
        if self.use_hash {
            self.straight_out(&sha);
        } else {
            self.straight_out(&obj_id.to_string());
        }
        self.straight_out(" 0 R ");
    }

    /// Serialize a value into the current object's buffer. Indirect
    /// references are renumbered: the first encounter of a source object
    /// reserves a new id and queues it for emission.
    fn write_value(&mut self, value: &PdfValue) {
        match value {
            PdfValue::Name(t) | PdfValue::Token(t) => {
                self.straight_out(t);
                self.straight_out(" ");
            }
            PdfValue::Integer(i) => self.straight_out(&format!("{i} ")),
            PdfValue::Real(r) => self.straight_out(&format!("{r:.6} ")),
            PdfValue::Array(items) => {
                self.straight_out("[");
                for item in items {
                    self.write_value(item);
                }
                self.out("]");
            }
            PdfValue::Dictionary(dict) => {
                self.straight_out("<<");
                for (key, v) in dict.iter() {
                    self.straight_out(key);
                    self.straight_out(" ");
                    self.write_value(v);
                }
                self.straight_out(">>");
            }
            PdfValue::Reference(r) => {
                if !self.done_obj_stack.contains_key(&r.id) {
                    let new_id = self.alloc_id();
                    let mapping = ObjMapping { r: *r, new_id };
                    self.obj_stack.insert(r.id, mapping);
                    self.done_obj_stack.insert(r.id, mapping);
                }
                let new_id = self.done_obj_stack[&r.id].new_id;
                self.out_obj_ref(new_id);
            }
            PdfValue::String(s) => {
                self.straight_out("(");
                self.buffer.extend_from_slice(s);
                self.straight_out(")");
            }
            PdfValue::HexString(h) => {
                self.straight_out("<");
                self.straight_out(h);
                self.straight_out(">");
            }
            PdfValue::Boolean(b) => self.straight_out(if *b { "true" } else { "false" }),
            PdfValue::Null => self.straight_out("null "),
            PdfValue::Object(obj) => {
                if let Some(stream) = &obj.stream {
                    self.write_value(&obj.value);
                    self.out("stream");
                    self.buffer.extend_from_slice(stream);
                    self.buffer.push(b'\n');
                    self.out("endstream");
                } else {
                    self.write_value(&obj.value);
                }
            }
            PdfValue::ObjectDecl(_) => {}
        }
    }
}

/// Clip a box to the page's MediaBox. Crop, trim, bleed and art boxes
/// must not extend past it.
fn intersect_box(bx: PageBox, media: PageBox) -> PageBox {
    let mut out = bx;
    if out.llx < media.llx {
        out.llx = media.llx;
    }
    if out.lly < media.lly {
        out.lly = media.lly;
    }
    if out.urx > media.urx {
        out.urx = media.urx;
    }
    if out.ury > media.ury {
        out.ury = media.ury;
    }
    out.x = out.llx;
    out.y = out.lly;
    out.w = out.urx - out.llx;
    out.h = out.ury - out.lly;
    out
}

/// Normalize a `/Rotate` value into {0, -90, -180, -270} (clockwise
/// angles) and report whether width and height swap.
fn normalize_rotation(degrees: i64) -> (i32, bool) {
    let r = degrees.rem_euclid(360);
    if r == 0 {
        return (0, false);
    }
    let swap = (r / 90) % 2 != 0;
    ((r - 360) as i32, swap)
}
