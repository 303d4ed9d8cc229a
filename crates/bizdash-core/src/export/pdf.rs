//! Minimal PDF 1.4 writer for tabular exports.
//!
//! A4 portrait pages, the standard Helvetica faces (no embedded fonts), one
//! content stream per page. The header row repeats on every page and each
//! page carries a `Page n of m` footer. All coordinates are whole points.

use super::{EXPORT_HEADER, ExportTable};
use crate::DashError;
use std::io::Write;

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const MARGIN: u32 = 40;
const TITLE_Y: u32 = 805;
const HEADER_Y: u32 = 770;
const ROW_HEIGHT: u32 = 16;
const BOTTOM_Y: u32 = 60;
const FOOTER_Y: u32 = 30;

/// Data rows that fit between the header and the bottom margin.
const ROWS_PER_PAGE: usize = ((HEADER_Y - BOTTOM_Y) / ROW_HEIGHT) as usize;

/// `(x, max characters)` per column.
const COLUMNS: [(u32, usize); 4] = [(MARGIN, 14), (130, 42), (370, 22), (500, 12)];

// Fixed object numbers; pages start after these.
const CATALOG_OBJ: usize = 1;
const PAGES_OBJ: usize = 2;
const REGULAR_FONT_OBJ: usize = 3;
const BOLD_FONT_OBJ: usize = 4;
const INFO_OBJ: usize = 5;
const FIRST_PAGE_OBJ: usize = 6;

fn io_err(e: std::io::Error) -> DashError {
    DashError::Export(e.to_string())
}

pub(super) fn render(table: &ExportTable) -> Result<Vec<u8>, DashError> {
    let chunks: Vec<&[[String; 4]]> = if table.rows.is_empty() {
        vec![&table.rows[..]]
    } else {
        table.rows.chunks(ROWS_PER_PAGE).collect()
    };
    let page_count = chunks.len();
    let page_obj = |i: usize| FIRST_PAGE_OBJ + 2 * i;

    let mut pdf = PdfWriter::new()?;
    pdf.object(format!("<< /Type /Catalog /Pages {} 0 R >>", PAGES_OBJ).as_bytes())?;

    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", page_obj(i)))
        .collect();
    pdf.object(
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_count
        )
        .as_bytes(),
    )?;
    pdf.object(font("Helvetica").as_bytes())?;
    pdf.object(font("Helvetica-Bold").as_bytes())?;

    let mut info = b"<< /Title (".to_vec();
    info.extend_from_slice(&escape(&table.title));
    info.extend_from_slice(b") /Producer (bizdash) >>");
    pdf.object(&info)?;

    for (i, rows) in chunks.iter().enumerate() {
        pdf.object(
            format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 {} 0 R /F2 {} 0 R >> >> /Contents {} 0 R >>",
                PAGES_OBJ,
                PAGE_WIDTH,
                PAGE_HEIGHT,
                REGULAR_FONT_OBJ,
                BOLD_FONT_OBJ,
                page_obj(i) + 1
            )
            .as_bytes(),
        )?;
        let content = page_content(&table.title, rows, i + 1, page_count)?;
        pdf.stream(&content)?;
    }

    pdf.finish()
}

fn font(base: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        base
    )
}

fn page_content(
    title: &str,
    rows: &[[String; 4]],
    page: usize,
    page_count: usize,
) -> Result<Vec<u8>, DashError> {
    let mut out = Vec::new();
    text(&mut out, "F2", 16, MARGIN, TITLE_Y, title)?;

    for ((x, width), label) in COLUMNS.iter().zip(EXPORT_HEADER) {
        text(&mut out, "F2", 10, *x, HEADER_Y, &fit(label, *width))?;
    }
    let rule_y = HEADER_Y - 5;
    writeln!(
        out,
        "1 w {} {} m {} {} l S",
        MARGIN,
        rule_y,
        PAGE_WIDTH - MARGIN,
        rule_y
    )
    .map_err(io_err)?;

    let mut y = HEADER_Y;
    for row in rows {
        y -= ROW_HEIGHT;
        for ((x, width), cell) in COLUMNS.iter().zip(row) {
            text(&mut out, "F1", 10, *x, y, &fit(cell, *width))?;
        }
    }

    text(
        &mut out,
        "F1",
        8,
        MARGIN,
        FOOTER_Y,
        &format!("Page {} of {}", page, page_count),
    )?;
    Ok(out)
}

fn text(out: &mut Vec<u8>, font: &str, size: u32, x: u32, y: u32, s: &str) -> Result<(), DashError> {
    write!(out, "BT /{} {} Tf {} {} Td (", font, size, x, y).map_err(io_err)?;
    out.extend_from_slice(&escape(s));
    out.extend_from_slice(b") Tj ET\n");
    Ok(())
}

/// Cut `s` to `width` characters, marking the cut with `...`.
fn fit(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

/// Encode for a literal string in WinAnsi. Characters outside Latin-1
/// become `?`.
fn escape(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            ' '..='~' => out.push(c as u8),
            '\u{a0}'..='\u{ff}' => out.extend_from_slice(format!("\\{:03o}", c as u32).as_bytes()),
            _ => out.push(b'?'),
        }
    }
    out
}

// =============================================================================
// WRITER
// =============================================================================

/// Appends numbered objects and remembers their offsets for the xref table.
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Result<Self, DashError> {
        let mut buf = Vec::new();
        buf.write_all(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n").map_err(io_err)?;
        Ok(Self {
            buf,
            offsets: Vec::new(),
        })
    }

    fn object(&mut self, body: &[u8]) -> Result<(), DashError> {
        self.offsets.push(self.buf.len());
        let number = self.offsets.len();
        writeln!(self.buf, "{} 0 obj", number).map_err(io_err)?;
        self.buf.write_all(body).map_err(io_err)?;
        self.buf.write_all(b"\nendobj\n").map_err(io_err)
    }

    fn stream(&mut self, content: &[u8]) -> Result<(), DashError> {
        let mut body = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(b"\nendstream");
        self.object(&body)
    }

    fn finish(mut self) -> Result<Vec<u8>, DashError> {
        let xref_offset = self.buf.len();
        let size = self.offsets.len() + 1;
        write!(self.buf, "xref\n0 {}\n0000000000 65535 f \n", size).map_err(io_err)?;
        for offset in &self.offsets {
            writeln!(self.buf, "{:010} 00000 n ", offset).map_err(io_err)?;
        }
        write!(
            self.buf,
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, CATALOG_OBJ, INFO_OBJ, xref_offset
        )
        .map_err(io_err)?;
        Ok(self.buf)
    }
}

// =============================================================================
// TESTS
// =============================================================================
