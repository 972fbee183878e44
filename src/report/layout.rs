//! PDF layout for the diagnosis report (A4, printpdf builtin fonts).

use std::io::BufWriter;
use std::path::Path;

use printpdf::image_crate::{self, DynamicImage, GenericImageView};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};

use super::{PatientMeta, ReportError};
use crate::insight::InsightSections;

pub const REPORT_TITLE: &str = "Diabetic Retinopathy Diagnosis Report";

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const BOTTOM_MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 10.0;
const FONT_SIZE: f32 = 12.0;
/// Approximate Helvetica advance per character at 12pt, in mm.
const CHAR_WIDTH: f32 = 2.1;
const WRAP_CHARS: usize = 88;

const IMAGE_X: f32 = 140.0;
const IMAGE_TOP: f32 = 30.0;
const IMAGE_WIDTH: f32 = 50.0;
/// Vertical space reserved below the patient block when the image is drawn.
const IMAGE_BLOCK_ADVANCE: f32 = 60.0;
const IMAGE_DPI: f32 = 300.0;
/// Larger images are downscaled before embedding.
const IMAGE_MAX_PX: u32 = 800;

const SEPARATOR: &str = "____________________________________________________";

enum Align {
    Left,
    Center,
}

/// Writing head. `y` is the distance from the top of the current page.
struct Pen<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl Pen<'_> {
    fn line(&mut self, text: &str, bold: bool, align: Align) {
        self.ensure_room(LINE_HEIGHT);
        let x = match align {
            Align::Left => MARGIN,
            Align::Center => ((PAGE_WIDTH - text_width(text)) / 2.0).max(MARGIN),
        };
        let baseline = PAGE_HEIGHT - self.y - LINE_HEIGHT * 0.7;
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, FONT_SIZE, Mm(x), Mm(baseline), font);
        self.y += LINE_HEIGHT;
    }

    fn paragraph(&mut self, text: &str) {
        for raw_line in text.split('\n') {
            for line in wrap_text(raw_line, WRAP_CHARS) {
                self.line(&line, false, Align::Left);
            }
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y += mm;
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y + height > PAGE_HEIGHT - BOTTOM_MARGIN {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = MARGIN;
        }
    }
}

/// Render the report. Returns PDF bytes.
pub fn render_report(
    meta: &PatientMeta,
    insights: &InsightSections,
    source_image: &Path,
) -> Result<Vec<u8>, ReportError> {
    let (doc, page1, layer1) =
        PdfDocument::new(REPORT_TITLE, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Render(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Render(format!("PDF font error: {e}")))?;

    let mut pen = Pen {
        doc: &doc,
        layer,
        regular,
        bold,
        y: MARGIN,
    };

    pen.line(REPORT_TITLE, false, Align::Center);
    pen.gap(LINE_HEIGHT);

    for line in meta.display_lines() {
        pen.line(&line, false, Align::Left);
    }

    if let Some(img) = load_image(source_image) {
        place_image(&pen.layer, img);
        pen.gap(IMAGE_BLOCK_ADVANCE);
    }

    pen.line(SEPARATOR, false, Align::Center);
    pen.gap(3.0);

    for (key, value) in insights.entries() {
        pen.line(&format!("{}:", title_case(key)), true, Align::Left);
        pen.paragraph(value);
        pen.gap(5.0);
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ReportError::Render(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| ReportError::Render(format!("PDF buffer error: {e}")))
}

/// Decode the retinal image. Missing or unreadable files are skipped.
fn load_image(path: &Path) -> Option<DynamicImage> {
    if !path.exists() {
        return None;
    }
    match image_crate::open(path) {
        Ok(img) => {
            let img = if img.width() > IMAGE_MAX_PX || img.height() > IMAGE_MAX_PX {
                img.thumbnail(IMAGE_MAX_PX, IMAGE_MAX_PX)
            } else {
                img
            };
            Some(DynamicImage::ImageRgb8(img.to_rgb8()))
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Report image not decodable, omitting");
            None
        }
    }
}

/// Draw the image top-right, `IMAGE_WIDTH` wide, aspect preserved.
fn place_image(layer: &PdfLayerReference, img: DynamicImage) {
    let natural_width = img.width() as f32 / IMAGE_DPI * 25.4;
    let natural_height = img.height() as f32 / IMAGE_DPI * 25.4;
    let scale = IMAGE_WIDTH / natural_width;
    let bottom = PAGE_HEIGHT - IMAGE_TOP - natural_height * scale;

    Image::from_dynamic_image(&img).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(IMAGE_X)),
            translate_y: Some(Mm(bottom)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
}

fn text_width(text: &str) -> f32 {
    text.chars().count() as f32 * CHAR_WIDTH
}

/// `alerts_followups` → `Alerts Followups`.
fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Simple word-wrap helper for PDF text rendering.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
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
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_labels() {
        assert_eq!(title_case("risk_assessment"), "Risk Assessment");
        assert_eq!(title_case("alerts_followups"), "Alerts Followups");
        assert_eq!(title_case("educational_insights"), "Educational Insights");
    }

    #[test]
    fn wrap_respects_width() {
        let text = "word ".repeat(60);
        let lines = wrap_text(&text, 20);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= 20));
    }

    #[test]
    fn wrap_keeps_long_single_word() {
        let word = "x".repeat(40);
        assert_eq!(wrap_text(&word, 10), vec![word]);
    }

    #[test]
    fn wrap_empty_yields_blank_line() {
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn long_insights_paginate() {
        let long = "Analysis: ".to_string() + &"lorem ipsum dolor sit amet ".repeat(200);
        let insights = InsightSections {
            risk_assessment: long.clone(),
            early_detection: long.clone(),
            predictive_analysis: long.clone(),
            alerts_followups: long.clone(),
            educational_insights: long,
        };
        let bytes = render_report(
            &PatientMeta::sample(),
            &insights,
            Path::new("/nonexistent.png"),
        )
        .unwrap();
        let short = render_report(
            &PatientMeta::sample(),
            &InsightSections {
                risk_assessment: "a".into(),
                early_detection: "b".into(),
                predictive_analysis: "c".into(),
                alerts_followups: "d".into(),
                educational_insights: "e".into(),
            },
            Path::new("/nonexistent.png"),
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(bytes.len() > short.len());
    }
}
