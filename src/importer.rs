//! Generator-facing import facade
//!
//! Bundles one [`PdfReader`] and one [`PdfWriter`] per source document,
//! numbers templates globally across sources, and exposes the emitted
//! object maps in the shapes a PDF generator consumes.

use crate::error::{PdfError, Result};
use crate::parser::reader::PageBox;
use crate::parser::PdfReader;
use crate::writer::PdfWriter;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

struct TplInfo {
    source: String,
    template_id: usize,
}

/// Imports pages from one or more source PDFs for a PDF generator
#[derive(Default)]
pub struct Importer {
    source: String,
    readers: HashMap<String, PdfReader>,
    writers: HashMap<String, PdfWriter>,
    tpl_map: HashMap<usize, TplInfo>,
    tpl_n: usize,
    imported_pages: HashMap<String, usize>,
}

impl Importer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a source document by file path, opening it on first use
    pub fn set_source_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let key = path.as_ref().display().to_string();
        if !self.readers.contains_key(&key) {
            let reader = PdfReader::open(path)?;
            self.readers.insert(key.clone(), reader);
        }
        self.select_source(key);
        Ok(())
    }

    /// Select a source document from an owned byte buffer
    pub fn set_source_bytes(&mut self, data: Vec<u8>) -> Result<()> {
        let reader = PdfReader::from_bytes(data)?;
        let key = reader.source_id().to_string();
        self.readers.entry(key.clone()).or_insert(reader);
        self.select_source(key);
        Ok(())
    }

    fn select_source(&mut self, key: String) {
        if !self.writers.contains_key(&key) {
            let mut writer = PdfWriter::new();
            writer.set_tpl_id_offset(self.tpl_n);
            self.writers.insert(key.clone(), writer);
        }
        self.source = key;
    }

    fn reader(&self) -> Result<&PdfReader> {
        self.readers.get(&self.source).ok_or(PdfError::NoSource)
    }

    fn writer(&self) -> Result<&PdfWriter> {
        self.writers.get(&self.source).ok_or(PdfError::NoSource)
    }

    fn pair_mut(&mut self) -> Result<(&PdfReader, &mut PdfWriter)> {
        let reader = self.readers.get(&self.source).ok_or(PdfError::NoSource)?;
        let writer = self
            .writers
            .get_mut(&self.source)
            .ok_or(PdfError::NoSource)?;
        Ok((reader, writer))
    }

    /// Number of pages in the active source
    pub fn get_num_pages(&self) -> Result<usize> {
        Ok(self.reader()?.get_num_pages()?)
    }

    /// Boxes for every page of the active source, unscaled
    pub fn get_page_sizes(&self) -> Result<HashMap<usize, HashMap<String, PageBox>>> {
        Ok(self.reader()?.get_all_page_boxes(1.0)?)
    }

    /// Import a page of the active source, returning its global template
    /// id. Importing the same page twice returns the cached id.
    pub fn import_page(&mut self, pageno: usize, box_name: &str) -> Result<usize> {
        let cache_key = format!("{}-{:04}", self.source, pageno);
        if let Some(&tpl_n) = self.imported_pages.get(&cache_key) {
            return Ok(tpl_n);
        }

        let source = self.source.clone();
        let (reader, writer) = self.pair_mut()?;
        let template_id = writer.import_page(reader, pageno, box_name)?;

        let tpl_n = self.tpl_n;
        self.tpl_map.insert(
            tpl_n,
            TplInfo {
                source,
                template_id,
            },
        );
        self.tpl_n += 1;
        self.imported_pages.insert(cache_key, tpl_n);
        Ok(tpl_n)
    }

    /// Seed the active writer's id counter so new objects land after the
    /// generator's existing ones
    pub fn set_next_object_id(&mut self, id: i64) -> Result<()> {
        let writer = self
            .writers
            .get_mut(&self.source)
            .ok_or(PdfError::NoSource)?;
        writer.set_next_object_id(id);
        Ok(())
    }

    /// Emit Form XObjects in integer-id mode: template name to integer id
    pub fn put_form_xobjects(&mut self) -> Result<HashMap<String, i64>> {
        let (reader, writer) = self.pair_mut()?;
        let result = writer.put_form_xobjects(reader)?;
        Ok(result.into_iter().map(|(name, id)| (name, id.id)).collect())
    }

    /// Emit Form XObjects in hash mode: template name to content hash
    pub fn put_form_xobjects_unordered(&mut self) -> Result<HashMap<String, String>> {
        let (reader, writer) = self.pair_mut()?;
        writer.set_use_hash(true);
        let result = writer.put_form_xobjects(reader)?;
        Ok(result.into_iter().map(|(name, id)| (name, id.hash)).collect())
    }

    /// Emitted objects keyed by integer id
    pub fn get_imported_objects(&self) -> Result<HashMap<i64, Vec<u8>>> {
        Ok(self
            .writer()?
            .get_imported_objects()
            .iter()
            .map(|(id, bytes)| (id.id, bytes.clone()))
            .collect())
    }

    /// Emitted objects keyed by content hash. Reference slots inside the
    /// bytes hold hashes; their positions come from
    /// [`get_imported_obj_hash_pos`](Importer::get_imported_obj_hash_pos).
    pub fn get_imported_objects_unordered(&self) -> Result<HashMap<String, Vec<u8>>> {
        Ok(self
            .writer()?
            .get_imported_objects()
            .iter()
            .map(|(id, bytes)| (id.hash.clone(), bytes.clone()))
            .collect())
    }

    /// Byte positions of reference hashes within each emitted object, for
    /// the generator to replace with final integer ids
    pub fn get_imported_obj_hash_pos(&self) -> Result<HashMap<String, BTreeMap<usize, String>>> {
        Ok(self
            .writer()?
            .get_imported_obj_hash_pos()
            .iter()
            .map(|(id, positions)| (id.hash.clone(), positions.clone()))
            .collect())
    }

    /// Placement data for a template: name, x/y scale and translation in
    /// generator units
    pub fn use_template(
        &self,
        tpl_id: usize,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    ) -> Result<(String, f64, f64, f64, f64)> {
        let info = self
            .tpl_map
            .get(&tpl_id)
            .ok_or(PdfError::UnknownTemplate(tpl_id))?;
        let writer = self
            .writers
            .get(&info.source)
            .ok_or(PdfError::NoSource)?;
        writer.use_template(info.template_id, x, y, w, h)
    }
}
