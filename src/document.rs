//! PDF composition
//!
//! Lays out a report on A4 pages: a title block, a two column metadata
//! table, the rendered charts in order and a closing narrative paragraph.
//! The document is written to `<path>.part` first and renamed into place,
//! so a failed write never leaves a truncated PDF behind.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Rect,
};
use tracing::{debug, info, warn};

use crate::chart::ChartArtifact;
use crate::error::DocumentWriteError;
use crate::models::Rgb;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const LABEL_WIDTH: f32 = 50.0;
const ROW_HEIGHT: f32 = 8.0;
const TITLE_SIZE: f32 = 20.0;
const TABLE_SIZE: f32 = 10.0;
const NARRATIVE_SIZE: f32 = 10.0;
const LINE_HEIGHT: f32 = 5.0;
const CHART_GAP: f32 = 4.0;
/// Average Helvetica glyph width in mm at 1pt
const GLYPH_WIDTH: f32 = 0.5 * 0.3528;

const ROW_SHADE: Rgb = Rgb(0xf0, 0xf0, 0xf0);

/// One label/value row of the metadata table
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRow {
    pub label: String,
    pub value: String,
    /// Background for the value cell instead of the alternating shade
    pub highlight: Option<Rgb>,
}

impl MetadataRow {
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            highlight: None,
        }
    }

    #[must_use]
    pub fn highlighted(mut self, color: Rgb) -> Self {
        self.highlight = Some(color);
        self
    }
}

/// Everything that goes into one document
#[derive(Debug, Clone)]
pub struct DocumentSpec {
    pub title: String,
    /// Colour of the label column
    pub header_color: Rgb,
    pub rows: Vec<MetadataRow>,
    pub charts: Vec<ChartArtifact>,
    pub narrative: String,
}

/// A written report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    pub path: PathBuf,
    pub pages: usize,
    pub charts_embedded: usize,
}

/// Write `spec` to `path`, creating the parent directory when missing.
///
/// No existence check is made on `path`; the caller's naming scheme keeps
/// paths unique.
pub fn compose(spec: &DocumentSpec, path: &Path) -> Result<ReportDocument, DocumentWriteError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DocumentWriteError::io(parent, e))?;
    }

    let (doc, pages, charts_embedded) = layout(spec)?;

    let part = part_path(path);
    if let Err(e) = write_pdf(doc, &part).and_then(|()| {
        fs::rename(&part, path).map_err(|e| DocumentWriteError::io(path, e))
    }) {
        if part.exists() {
            if let Err(remove_err) = fs::remove_file(&part) {
                warn!("Could not remove partial file {}: {}", part.display(), remove_err);
            }
        }
        return Err(e);
    }

    info!(
        "Wrote {} ({} pages, {} charts)",
        path.display(),
        pages,
        charts_embedded
    );

    Ok(ReportDocument {
        path: path.to_path_buf(),
        pages,
        charts_embedded,
    })
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

fn write_pdf(doc: PdfDocumentReference, part: &Path) -> Result<(), DocumentWriteError> {
    let file = File::create(part).map_err(|e| DocumentWriteError::io(part, e))?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer)
        .map_err(|e| DocumentWriteError::pdf(e.to_string()))?;
    let file = writer
        .into_inner()
        .map_err(|e| DocumentWriteError::io(part, e.into_error()))?;
    file.sync_all().map_err(|e| DocumentWriteError::io(part, e))
}

/// Page cursor; y grows upwards from the bottom edge in PDF space
struct Cursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl Cursor<'_> {
    /// Start a new page unless `height` still fits above the bottom margin
    fn reserve(&mut self, height: f32) {
        if self.y - height >= MARGIN {
            return;
        }
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Page {}", self.pages + 1));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }
}

fn layout(spec: &DocumentSpec) -> Result<(PdfDocumentReference, usize, usize), DocumentWriteError> {
    let (doc, page, layer) =
        PdfDocument::new(ascii(&spec.title), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Page 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| DocumentWriteError::pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| DocumentWriteError::pdf(e.to_string()))?;

    let mut cursor = Cursor {
        doc: &doc,
        layer: doc.get_page(page).get_layer(layer),
        y: PAGE_HEIGHT - MARGIN,
        pages: 1,
    };

    // Title
    cursor.y -= 10.0;
    cursor.layer.set_fill_color(fill(spec.header_color));
    cursor
        .layer
        .use_text(ascii(&spec.title), TITLE_SIZE, Mm(MARGIN), Mm(cursor.y), &bold);
    cursor.y -= 8.0;

    draw_table(&mut cursor, spec, &regular, &bold);
    cursor.y -= CHART_GAP;

    let mut charts_embedded = 0;
    for chart in &spec.charts {
        if embed_chart(&mut cursor, chart) {
            charts_embedded += 1;
        }
    }

    draw_narrative(&mut cursor, &spec.narrative, &regular, &bold);

    let pages = cursor.pages;
    Ok((doc, pages, charts_embedded))
}

fn draw_table(
    cursor: &mut Cursor<'_>,
    spec: &DocumentSpec,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    let value_chars = chars_per_line(CONTENT_WIDTH - LABEL_WIDTH - 4.0, TABLE_SIZE);

    for (i, row) in spec.rows.iter().enumerate() {
        let lines = wrap_text(&ascii(&row.value), value_chars);
        let height = ROW_HEIGHT.max(lines.len() as f32 * LINE_HEIGHT + 3.0);
        cursor.reserve(height);
        let top = cursor.y;
        let bottom = top - height;

        let shade = row
            .highlight
            .unwrap_or(if i % 2 == 0 { Rgb::WHITE } else { ROW_SHADE });

        cursor.layer.set_fill_color(fill(spec.header_color));
        cursor.layer.add_rect(Rect::new(
            Mm(MARGIN),
            Mm(bottom),
            Mm(MARGIN + LABEL_WIDTH),
            Mm(top),
        ));
        cursor.layer.set_fill_color(fill(shade));
        cursor.layer.add_rect(Rect::new(
            Mm(MARGIN + LABEL_WIDTH),
            Mm(bottom),
            Mm(PAGE_WIDTH - MARGIN),
            Mm(top),
        ));

        cursor.layer.set_fill_color(fill(Rgb::WHITE));
        cursor.layer.use_text(
            ascii(&row.label),
            TABLE_SIZE,
            Mm(MARGIN + 2.0),
            Mm(top - 5.5),
            bold,
        );

        cursor.layer.set_fill_color(fill(Rgb::BLACK));
        for (n, line) in lines.iter().enumerate() {
            cursor.layer.use_text(
                line.as_str(),
                TABLE_SIZE,
                Mm(MARGIN + LABEL_WIDTH + 2.0),
                Mm(top - 5.5 - n as f32 * LINE_HEIGHT),
                regular,
            );
        }

        cursor.y = bottom;
    }
}

/// Place one chart at full content width; false when it was skipped
fn embed_chart(cursor: &mut Cursor<'_>, chart: &ChartArtifact) -> bool {
    let (width, height) = chart.image.dimensions();
    if width == 0 || height == 0 {
        warn!("Skipping empty chart image '{}'", chart.id);
        return false;
    }

    let height_mm = CONTENT_WIDTH * height as f32 / width as f32;
    cursor.reserve(height_mm + CHART_GAP);
    let bottom = cursor.y - height_mm;

    debug!("Embedding chart '{}' ({})", chart.id, chart.caption);
    let image = Image::from_dynamic_image(&DynamicImage::ImageRgb8(chart.image.clone()));
    image.add_to_layer(
        cursor.layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(MARGIN)),
            translate_y: Some(Mm(bottom)),
            dpi: Some(width as f32 * 25.4 / CONTENT_WIDTH),
            ..Default::default()
        },
    );

    cursor.y = bottom - CHART_GAP;
    true
}

fn draw_narrative(
    cursor: &mut Cursor<'_>,
    narrative: &str,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    if narrative.trim().is_empty() {
        return;
    }

    let lines = wrap_text(&ascii(narrative), chars_per_line(CONTENT_WIDTH, NARRATIVE_SIZE));
    cursor.reserve(LINE_HEIGHT * 2.0);
    cursor.y -= LINE_HEIGHT;
    cursor.layer.set_fill_color(fill(Rgb::BLACK));
    cursor
        .layer
        .use_text("Legend", NARRATIVE_SIZE + 2.0, Mm(MARGIN), Mm(cursor.y), bold);

    for line in lines {
        cursor.reserve(LINE_HEIGHT);
        cursor.y -= LINE_HEIGHT;
        cursor.layer.set_fill_color(fill(Rgb::BLACK));
        cursor
            .layer
            .use_text(line, NARRATIVE_SIZE, Mm(MARGIN), Mm(cursor.y), regular);
    }
}

fn fill(color: Rgb) -> Color {
    let (r, g, b) = color.unit();
    Color::Rgb(printpdf::Rgb::new(r, g, b, None))
}

fn chars_per_line(width_mm: f32, font_size: f32) -> usize {
    ((width_mm / (GLYPH_WIDTH * font_size)).floor() as usize).max(1)
}

/// Builtin PDF fonts only cover ASCII reliably
fn ascii(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

/// Greedy word wrap to at most `width` characters per line.
///
/// Words longer than a line are split. Existing newlines start a new line.
#[must_use]
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word;
            while word.chars().count() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let split = word
                    .char_indices()
                    .nth(width)
                    .map_or(word.len(), |(idx, _)| idx);
                lines.push(word[..split].to_string());
                word = &word[split..];
            }
            if word.is_empty() {
                continue;
            }
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sentinel-document-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn chart(id: &'static str, width: u32, height: u32) -> ChartArtifact {
        ChartArtifact {
            id,
            caption: id.to_string(),
            image: RgbImage::from_pixel(width, height, image::Rgb([30, 120, 180])),
        }
    }

    fn spec(charts: Vec<ChartArtifact>) -> DocumentSpec {
        DocumentSpec {
            title: "Surf Report - Bells Beach".to_string(),
            header_color: Rgb(0x1f, 0x77, 0xb4),
            rows: vec![
                MetadataRow::new("LOCATION", "Bells Beach"),
                MetadataRow::new("CURRENT WAVE", "1.6m - GOOD"),
                MetadataRow::new("STATUS", "NORMAL").highlighted(Rgb(240, 255, 240)),
            ],
            charts,
            narrative: "Green X = Excellent (>2.0m) | Red X = Weekly Peak".to_string(),
        }
    }

    #[test]
    fn test_compose_writes_pdf_and_creates_directory() {
        let dir = scratch_dir("compose");
        let path = dir.join("BellsBeach").join("Surf_Report_BellsBeach_2025-01-07_0900.pdf");

        let doc = compose(&spec(vec![chart("today", 140, 66)]), &path).unwrap();

        assert_eq!(doc.path, path);
        assert_eq!(doc.charts_embedded, 1);
        assert_eq!(doc.pages, 1);
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(!part_path(&path).exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_tall_charts_paginate() {
        let dir = scratch_dir("paginate");
        let path = dir.join("tall.pdf");
        let charts = vec![
            chart("a", 100, 100),
            chart("b", 100, 100),
            chart("c", 100, 100),
        ];

        let doc = compose(&spec(charts), &path).unwrap();

        assert_eq!(doc.charts_embedded, 3);
        assert!(doc.pages >= 3);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_empty_image_is_skipped() {
        let dir = scratch_dir("empty-image");
        let path = dir.join("report.pdf");

        let doc = compose(&spec(vec![chart("blank", 0, 0), chart("ok", 140, 49)]), &path).unwrap();

        assert_eq!(doc.charts_embedded, 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unwritable_path_is_io_error() {
        let dir = scratch_dir("blocked");
        fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();

        let result = compose(&spec(Vec::new()), &blocker.join("report.pdf"));

        assert!(matches!(result, Err(DocumentWriteError::Io { .. })));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(
            wrap_text("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("one\ntwo", 20), vec!["one", "two"]);
        assert!(wrap_text("   ", 5).is_empty());
    }

    #[test]
    fn test_ascii_replaces_symbols() {
        assert_eq!(ascii("Temp 25°C"), "Temp 25?C");
        assert_eq!(ascii("plain"), "plain");
    }
}
