use super::layout::{Align, Page, StatementDocument, TextCell};

/// Helvetica AFM glyph widths for chars 32..=126, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold AFM glyph widths for chars 32..=126
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// fallback advance for glyphs outside the measured range
const DEFAULT_GLYPH_WIDTH: u16 = 556;

/// measured advance of a string at the given size, in points
pub fn text_width(text: &str, bold: bool, size: f64) -> f64 {
    let table = if bold { &HELVETICA_BOLD_WIDTHS } else { &HELVETICA_WIDTHS };
    let units: u64 = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if (32..=126).contains(&code) {
                table[(code - 32) as usize] as u64
            } else {
                DEFAULT_GLYPH_WIDTH as u64
            }
        })
        .sum();
    units as f64 * size / 1000.0
}

/// escape a string for a PDF literal, mapping beyond-Latin-1 chars to '?'
fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            c if (c as u32) < 256 => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// serialize a laid-out statement to PDF bytes
///
/// PDF 1.4, base-14 Helvetica fonts, one content stream per page. The
/// output is a pure function of the document: no timestamps, no ids.
pub fn write_pdf(document: &StatementDocument) -> Vec<u8> {
    let mut writer = PdfWriter::new(document.pages.len());

    writer.object(1, "<< /Type /Catalog /Pages 2 0 R >>".to_string());

    let kids: Vec<String> = (0..document.pages.len())
        .map(|i| format!("{} 0 R", 5 + 2 * i))
        .collect();
    writer.object(
        2,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            document.pages.len()
        ),
    );
    writer.object(
        3,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    );
    writer.object(
        4,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_string(),
    );

    for (i, page) in document.pages.iter().enumerate() {
        let page_id = 5 + 2 * i;
        let content_id = page_id + 1;
        writer.object(
            page_id,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                document.page_width, document.page_height, content_id
            ),
        );
        let content = page_content(page, document.page_height);
        writer.stream_object(content_id, &content);
    }

    writer.finish()
}

fn page_content(page: &Page, page_height: f64) -> String {
    let mut ops = String::new();
    for cell in &page.cells {
        let pen_x = aligned_x(cell);
        // cell y is measured from the top of the page; the baseline sits
        // one font size below the cell's top edge
        let baseline = page_height - cell.y - cell.size;
        let font = if cell.bold { "F2" } else { "F1" };
        ops.push_str(&format!(
            "BT /{} {:.2} Tf {:.2} {:.2} Td ({}) Tj ET\n",
            font,
            cell.size,
            pen_x,
            baseline,
            escape_literal(&cell.text)
        ));
    }
    for rule in &page.rules {
        let y = page_height - rule.y;
        ops.push_str(&format!(
            "{:.2} {:.2} m {:.2} {:.2} l S\n",
            rule.x,
            y,
            rule.x + rule.width,
            y
        ));
    }
    ops
}

fn aligned_x(cell: &TextCell) -> f64 {
    let advance = text_width(&cell.text, cell.bold, cell.size);
    match cell.align {
        Align::Left => cell.x,
        Align::Right => cell.x + cell.width - advance,
        Align::Center => cell.x + (cell.width - advance) / 2.0,
    }
}

struct PdfWriter {
    buf: Vec<u8>,
    /// byte offset of every object, indexed by object id
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new(page_count: usize) -> Self {
        let object_count = 4 + 2 * page_count;
        let mut writer = Self {
            buf: Vec::new(),
            offsets: vec![0; object_count + 1],
        };
        writer.buf.extend_from_slice(b"%PDF-1.4\n");
        writer
    }

    fn object(&mut self, id: usize, body: String) {
        self.offsets[id] = self.buf.len();
        self.buf
            .extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
    }

    fn stream_object(&mut self, id: usize, content: &str) {
        self.offsets[id] = self.buf.len();
        self.buf.extend_from_slice(
            format!(
                "{} 0 obj\n<< /Length {} >>\nstream\n{}endstream\nendobj\n",
                id,
                content.len(),
                content
            )
            .as_bytes(),
        );
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.buf.len();
        let count = self.offsets.len();
        self.buf
            .extend_from_slice(format!("xref\n0 {}\n", count).as_bytes());
        self.buf.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &self.offsets[1..] {
            self.buf
                .extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        self.buf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                count, xref_offset
            )
            .as_bytes(),
        );
        self.buf
    }
}
