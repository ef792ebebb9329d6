//! Synthetic PDF documents for the integration suites.
//!
//! Every document is assembled byte-by-byte with computed offsets, so the
//! suites run without binary fixtures.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

pub fn flate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Forward PNG filtering with a fixed tag byte per row
pub fn png_encode_rows(rows: &[[u8; 4]], tag: u8) -> Vec<u8> {
    let mut prev = [0u8; 4];
    let mut out = Vec::new();
    for row in rows {
        out.push(tag);
        for i in 0..4 {
            let filtered = match tag {
                0 => row[i],
                2 => row[i].wrapping_sub(prev[i]),
                4 => {
                    let a = if i > 0 { row[i - 1] } else { 0 };
                    let b = prev[i];
                    let c = if i > 0 { prev[i - 1] } else { 0 };
                    row[i].wrapping_sub(paeth(a, b, c))
                }
                _ => unreachable!("unsupported tag in test encoder"),
            };
            out.push(filtered);
        }
        prev = *row;
    }
    out
}

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

/// Classic-xref document builder
pub struct PdfBuilder {
    buf: Vec<u8>,
    offsets: Vec<(u32, usize)>,
}

impl PdfBuilder {
    pub fn new(version: &str) -> Self {
        PdfBuilder {
            buf: format!("%PDF-{version}\n").into_bytes(),
            offsets: Vec::new(),
        }
    }

    pub fn add_object(&mut self, id: u32, body: &str) {
        self.offsets.push((id, self.buf.len()));
        self.buf
            .extend_from_slice(format!("{id} 0 obj\n{body}\nendobj\n").as_bytes());
    }

    pub fn add_stream_object(&mut self, id: u32, dict_entries: &str, payload: &[u8]) {
        self.offsets.push((id, self.buf.len()));
        self.buf.extend_from_slice(
            format!(
                "{id} 0 obj\n<< {dict_entries} /Length {} >>\nstream\n",
                payload.len()
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(payload);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
    }

    pub fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Write a classic xref covering the objects added so far, a trailer
    /// and the closing `startxref`. Returns the finished document.
    pub fn finish(mut self, size: u32, trailer_extra: &str) -> Vec<u8> {
        let xref_pos = self.write_xref(trailer_extra, size);
        self.buf
            .extend_from_slice(format!("startxref\n{xref_pos}\n%%EOF\n").as_bytes());
        self.buf
    }

    /// Write an xref section for the objects added since the last one,
    /// without finishing the document. Used to build revision chains.
    pub fn write_revision(&mut self, size: u32, trailer_extra: &str) -> usize {
        let xref_pos = self.write_xref(trailer_extra, size);
        self.buf
            .extend_from_slice(format!("startxref\n{xref_pos}\n%%EOF\n").as_bytes());
        self.offsets.clear();
        xref_pos
    }

    fn write_xref(&mut self, trailer_extra: &str, size: u32) -> usize {
        let xref_pos = self.buf.len();
        self.buf.extend_from_slice(b"xref\n");
        self.buf
            .extend_from_slice(b"0 1\n0000000000 65535 f \n");
        for (id, offset) in &self.offsets {
            self.buf
                .extend_from_slice(format!("{id} 1\n{offset:010} 00000 n \n").as_bytes());
        }
        self.buf.extend_from_slice(
            format!("trailer\n<< /Size {size} /Root 1 0 R {trailer_extra} >>\n").as_bytes(),
        );
        xref_pos
    }
}

/// One-page document: catalog, page tree, a flate-compressed content
/// stream and a resources dictionary whose font descriptor points back at
/// the resources object, closing a reference cycle.
pub fn cow_pdf() -> Vec<u8> {
    let content = b"q 0.57 w 0 0 595.28 841.89 re S BT /F1 16 Tf 72 760 Td (moo) Tj ET Q";
    let compressed = flate(content);

    let mut b = PdfBuilder::new("1.4");
    b.add_object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.add_object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.add_object(
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595.28 841.89] /Resources 5 0 R /Contents 4 0 R >>",
    );
    b.add_stream_object(4, "/Filter /FlateDecode", &compressed);
    b.add_object(5, "<< /Font << /F1 6 0 R >> /ProcSet [/PDF /Text] >>");
    b.add_object(
        6,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /FontDescriptor 7 0 R >>",
    );
    b.add_object(
        7,
        "<< /Type /FontDescriptor /FontName /Helvetica /Flags 32 /Resources 5 0 R >>",
    );
    b.finish(8, "")
}

/// The uncompressed content bytes `cow_pdf` carries
pub fn cow_content() -> &'static [u8] {
    b"q 0.57 w 0 0 595.28 841.89 re S BT /F1 16 Tf 72 760 Td (moo) Tj ET Q"
}

/// Two-page document with distinct boxes; page 2's `/Contents` is an
/// array of two streams.
pub fn sample_pdf() -> Vec<u8> {
    let mut b = PdfBuilder::new("1.4");
    b.add_object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.add_object(2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>");
    b.add_object(
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /ProcSet [/PDF] >> /Contents 5 0 R >>",
    );
    b.add_object(
        4,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 100] /Resources << /ProcSet [/PDF] >> /Contents [6 0 R 7 0 R] >>",
    );
    b.add_stream_object(5, "", b"0 0 612 792 re f");
    b.add_stream_object(6, "", b"q 1 0 0 1 0 0 cm ");
    b.add_stream_object(7, "", b"0 0 200 100 re f Q");
    b.finish(8, "")
}

/// Document with a `/Prev` revision chain: the second revision replaces
/// page object 3, moving its `/CropBox` to x = 425.147. Padding keeps the
/// first revision's `startxref` outside the final discovery window.
pub fn oceancrop_pdf() -> Vec<u8> {
    let mut b = PdfBuilder::new("1.4");
    b.add_object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.add_object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.add_object(
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 841.89 595.28] /CropBox [0 0 400 300] /Contents 4 0 R >>",
    );
    b.add_stream_object(4, "", b"0 0 400 300 re f");
    let prev_pos = b.write_revision(5, "");

    // Filler so the final startxref discovery window cannot reach the
    // first revision's startxref.
    let padding = format!("%{}\n", ".".repeat(2000));
    b.raw(padding.as_bytes());

    b.add_object(
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 841.89 595.28] /CropBox [425.147 100 600 300] /Contents 4 0 R >>",
    );
    b.finish(5, &format!("/Prev {prev_pos}"))
}

/// PDF 1.5 document: catalog, page tree and page live inside an object
/// stream; the cross-reference stream is flate-compressed behind a PNG
/// Paeth predictor.
pub fn xref_stream_pdf() -> Vec<u8> {
    let content = b"0.5 0.5 0.5 rg 10 10 180 80 re f";

    let mut buf = b"%PDF-1.5\n".to_vec();

    let off4 = buf.len();
    buf.extend_from_slice(
        format!("4 0 obj\n<< /Length {} >>\nstream\n", content.len()).as_bytes(),
    );
    buf.extend_from_slice(content);
    buf.extend_from_slice(b"\nendstream\nendobj\n");

    let bodies = [
        "<< /Type /Catalog /Pages 2 0 R >>",
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 100] /Resources << /ProcSet [/PDF] >> /Contents 4 0 R >>",
    ];
    let mut header = String::new();
    let mut body = String::new();
    for (i, obj) in bodies.iter().enumerate() {
        header.push_str(&format!("{} {} ", i + 1, body.len()));
        body.push_str(obj);
        body.push(' ');
    }
    let first = header.len();
    let payload = flate(format!("{header}{body}").as_bytes());

    let off5 = buf.len();
    buf.extend_from_slice(
        format!(
            "5 0 obj\n<< /Type /ObjStm /N 3 /First {first} /Filter /FlateDecode /Length {} >>\nstream\n",
            payload.len()
        )
        .as_bytes(),
    );
    buf.extend_from_slice(&payload);
    buf.extend_from_slice(b"\nendstream\nendobj\n");

    let off6 = buf.len();
    let rows: Vec<[u8; 4]> = vec![
        [0, 0, 0, 0],
        [2, 0, 5, 0],
        [2, 0, 5, 1],
        [2, 0, 5, 2],
        [1, (off4 >> 8) as u8, off4 as u8, 0],
        [1, (off5 >> 8) as u8, off5 as u8, 0],
        [1, (off6 >> 8) as u8, off6 as u8, 0],
    ];
    let xref_payload = flate(&png_encode_rows(&rows, 4));
    buf.extend_from_slice(
        format!(
            "6 0 obj\n<< /Type /XRef /Size 7 /W [1 2 1] /Root 1 0 R /Filter /FlateDecode /DecodeParms << /Columns 4 /Predictor 12 >> /Length {} >>\nstream\n",
            xref_payload.len()
        )
        .as_bytes(),
    );
    buf.extend_from_slice(&xref_payload);
    buf.extend_from_slice(b"\nendstream\nendobj\n");
    buf.extend_from_slice(format!("startxref\n{off6}\n%%EOF\n").as_bytes());
    buf
}

/// Classic base revision defining object 7, then a second revision that
/// re-homes object 7 into an object stream with different content. The
/// newest encoding must win.
pub fn reencoded_object_pdf() -> Vec<u8> {
    let mut b = PdfBuilder::new("1.5");
    b.add_object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.add_object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.add_object(
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 100 100] /Contents 4 0 R >>",
    );
    b.add_stream_object(4, "", b"0 0 100 100 re f");
    b.add_object(7, "<< /Val 1 >>");
    let prev_pos = b.write_revision(8, "");

    let padding = format!("%{}\n", ".".repeat(2000));
    b.raw(padding.as_bytes());

    // Revision 2: object 7 now lives in object stream 8 with new content.
    let header = "7 0 ";
    let body = "<< /Val 2 >>";
    let payload = flate(format!("{header}{body}").as_bytes());
    let off8 = b.position();
    b.raw(
        format!(
            "8 0 obj\n<< /Type /ObjStm /N 1 /First {} /Filter /FlateDecode /Length {} >>\nstream\n",
            header.len(),
            payload.len()
        )
        .as_bytes(),
    );
    b.raw(&payload);
    b.raw(b"\nendstream\nendobj\n");

    let off9 = b.position();
    let rows: Vec<[u8; 4]> = vec![
        [2, 0, 8, 0],
        [1, (off8 >> 8) as u8, off8 as u8, 0],
        [1, (off9 >> 8) as u8, off9 as u8, 0],
    ];
    let xref_payload = flate(&png_encode_rows(&rows, 2));
    b.raw(
        format!(
            "9 0 obj\n<< /Type /XRef /Size 10 /W [1 2 1] /Index [7 3] /Root 1 0 R /Prev {prev_pos} /Filter /FlateDecode /DecodeParms << /Columns 4 /Predictor 12 >> /Length {} >>\nstream\n",
            xref_payload.len()
        )
        .as_bytes(),
    );
    b.raw(&xref_payload);
    b.raw(b"\nendstream\nendobj\n");
    let mut buf = b.into_bytes();
    buf.extend_from_slice(format!("startxref\n{off9}\n%%EOF\n").as_bytes());
    buf
}

/// One-page document whose page carries a `/Rotate` value
pub fn rotated_pdf(rotate: i64) -> Vec<u8> {
    let mut b = PdfBuilder::new("1.4");
    b.add_object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.add_object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.add_object(
        3,
        &format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 100] /Rotate {rotate} /Resources << /ProcSet [/PDF] >> /Contents 4 0 R >>"
        ),
    );
    b.add_stream_object(4, "", b"0 0 200 100 re f");
    b.finish(5, "")
}

/// One-page document with only a MediaBox, for fallback tests
pub fn media_only_pdf() -> Vec<u8> {
    let mut b = PdfBuilder::new("1.4");
    b.add_object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.add_object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.add_object(
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595.28 841.89] /Resources << /ProcSet [/PDF] >> /Contents 4 0 R >>",
    );
    b.add_stream_object(4, "", b"0 0 10 10 re f");
    b.finish(5, "")
}

/// One-page document whose CropBox extends past the MediaBox
pub fn overhanging_crop_pdf() -> Vec<u8> {
    let mut b = PdfBuilder::new("1.4");
    b.add_object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.add_object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.add_object(
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 100] /CropBox [-10 50 250 150] /Resources << /ProcSet [/PDF] >> /Contents 4 0 R >>",
    );
    b.add_stream_object(4, "", b"0 0 200 100 re f");
    b.finish(5, "")
}
