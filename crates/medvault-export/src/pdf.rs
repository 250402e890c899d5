// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PDF rendering for case handoff reports.
//!
//! Uses printpdf's built-in Helvetica fonts so no font assets need to be
//! bundled. Layout is a simple top-down cursor with automatic page breaks.

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rgb,
};
use serde_json::Value;

use medvault_core::MedvaultError;

use crate::bundle::ExportBundle;

// US Letter with one-inch margins.
const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 25.4;

/// Maximum number of characters of raw model output included in the report.
const RAW_OUTPUT_EXCERPT_LIMIT: usize = 800;

/// Render a bundle into PDF bytes.
pub(crate) fn render(bundle: &ExportBundle) -> Result<Vec<u8>, MedvaultError> {
    let (doc, page, layer) = PdfDocument::new(
        "Case Handoff Report",
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| MedvaultError::Internal(format!("pdf font setup failed: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| MedvaultError::Internal(format!("pdf font setup failed: {e}")))?;

    let mut cursor = Cursor {
        doc: &doc,
        layer: doc.get_page(page).get_layer(layer),
        y: PAGE_HEIGHT - MARGIN,
    };

    // Header.
    cursor.set_color(HEADING_COLOR);
    cursor.line("Case Handoff Report", 16.0, &bold);
    cursor.set_color(MUTED_COLOR);
    cursor.line(
        &format!("Generated: {}", bundle.export_generated_at),
        8.0,
        &regular,
    );
    cursor.space(4.0);

    // Case metadata.
    cursor.heading("Case Metadata", &bold);
    let case = &bundle.case;
    let dash = "-".to_string();
    let rows = [
        ("Case ID", case.id.to_string()),
        ("Status", case.status.to_string()),
        ("Triage Level", case.triage_level.clone().unwrap_or_else(|| dash.clone())),
        (
            "Specialty",
            case.specialty_category.clone().unwrap_or_else(|| dash.clone()),
        ),
        (
            "Confidence",
            case.confidence_level.clone().unwrap_or_else(|| dash.clone()),
        ),
        ("Created", case.created_at.clone()),
    ];
    for (label, value) in rows {
        cursor.field_row(label, &value, &bold, &regular);
    }
    cursor.space(3.0);

    // Clinical payload.
    cursor.heading("Clinical Summary", &bold);
    let summary = bundle
        .payload
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or("No summary provided.");
    cursor.paragraph(summary, 10.0, &regular);

    if let Some(context) = bundle.payload.get("context").and_then(Value::as_str) {
        cursor.space(2.0);
        cursor.heading("Clinical Context", &bold);
        cursor.paragraph(context, 10.0, &regular);
    }

    if let Some(raw) = bundle.payload.get("raw_model_output").and_then(Value::as_str) {
        cursor.space(2.0);
        cursor.heading("Model Output (excerpt)", &bold);
        let excerpt: String = raw.chars().take(RAW_OUTPUT_EXCERPT_LIMIT).collect();
        cursor.set_color(MUTED_COLOR);
        cursor.paragraph(&excerpt, 8.0, &regular);
    }

    // Consent records.
    if !bundle.shares.is_empty() {
        cursor.space(2.0);
        cursor.heading("Consent Records", &bold);
        cursor.field_row("Provider", "Scope / Shared At", &bold, &bold);
        for share in &bundle.shares {
            cursor.field_row(
                &share.provider_display_name,
                &format!("{} / {}", share.consent_scope, share.shared_at),
                &regular,
                &regular,
            );
        }
    }

    // Disclaimer footer.
    cursor.space(8.0);
    cursor.set_color(MUTED_COLOR);
    cursor.paragraph(&bundle.disclaimer, 8.0, &regular);

    doc.save_to_bytes()
        .map_err(|e| MedvaultError::Internal(format!("pdf rendering failed: {e}")))
}

const HEADING_COLOR: (f32, f32, f32) = (0.10, 0.23, 0.36);
const MUTED_COLOR: (f32, f32, f32) = (0.45, 0.45, 0.45);
const TEXT_COLOR: (f32, f32, f32) = (0.0, 0.0, 0.0);

/// Top-down layout cursor with automatic page breaks.
struct Cursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl Cursor<'_> {
    fn set_color(&mut self, (r, g, b): (f32, f32, f32)) {
        self.layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < MARGIN {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn space(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        let height = line_height(size);
        self.ensure_room(height);
        self.y -= height;
        self.layer.use_text(text, size, Mm(MARGIN), Mm(self.y), font);
    }

    fn heading(&mut self, text: &str, bold: &IndirectFontRef) {
        self.set_color(HEADING_COLOR);
        self.line(text, 12.0, bold);
        self.space(1.0);
        self.set_color(TEXT_COLOR);
    }

    /// A two-column label/value row, as used by the metadata and consent
    /// tables.
    fn field_row(
        &mut self,
        label: &str,
        value: &str,
        label_font: &IndirectFontRef,
        value_font: &IndirectFontRef,
    ) {
        let height = line_height(9.0);
        self.ensure_room(height);
        self.y -= height;
        self.layer
            .use_text(label, 9.0, Mm(MARGIN), Mm(self.y), label_font);
        self.layer
            .use_text(value, 9.0, Mm(MARGIN + 50.0), Mm(self.y), value_font);
    }

    /// Whitespace-wrapped multi-line text.
    fn paragraph(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        let max_chars = (90.0 * 10.0 / size) as usize;
        for raw_line in text.lines() {
            if raw_line.trim().is_empty() {
                self.space(line_height(size) / 2.0);
                continue;
            }
            for line in wrap_text(raw_line, max_chars) {
                self.line(&line, size, font);
            }
        }
    }
}

fn line_height(size: f32) -> f32 {
    // Points to millimetres with 1.4 leading.
    size * 0.3528 * 1.4
}

/// Greedy whitespace wrap. Words longer than `max_chars` get their own line.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
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
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{ShareSummary, DISCLAIMER};
    use medvault_core::{CaseRecord, CaseStatus, ConsentScope};
    use serde_json::json;

    fn sample_bundle() -> ExportBundle {
        ExportBundle {
            export_generated_at: "2026-02-01T10:00:00.000Z".to_string(),
            case: CaseRecord {
                id: 1,
                patient_user_id: 1,
                created_at: "2026-02-01T09:00:00.000Z".to_string(),
                status: CaseStatus::Shared,
                triage_level: Some("routine".to_string()),
                specialty_category: Some("pulmonology".to_string()),
                confidence_level: Some("high".to_string()),
            },
            payload: json!({
                "summary": "Mild cough for two days.",
                "context": "No fever, no shortness of breath.",
                "raw_model_output": "x".repeat(2000),
            }),
            shares: vec![ShareSummary {
                provider_display_name: "Dr Bob".to_string(),
                consent_scope: ConsentScope::Read,
                shared_at: "2026-02-01T09:30:00.000Z".to_string(),
            }],
            disclaimer: DISCLAIMER.to_string(),
        }
    }

    #[test]
    fn render_produces_pdf_bytes() {
        let bytes = render(&sample_bundle()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn render_handles_minimal_payload() {
        let mut bundle = sample_bundle();
        bundle.payload = json!({});
        bundle.shares.clear();
        let bytes = render(&bundle).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_text_paginates_without_error() {
        let mut bundle = sample_bundle();
        bundle.payload = json!({
            "summary": "A long summary. ".repeat(400),
        });
        let bytes = render(&bundle).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn wrap_text_respects_word_boundaries() {
        let lines = wrap_text("one two three four five", 9);
        assert_eq!(lines, vec!["one two", "three four", "five"]);
    }

    #[test]
    fn wrap_text_keeps_overlong_words_whole() {
        let lines = wrap_text("tiny extraordinarily-long-word end", 10);
        assert_eq!(lines[0], "tiny");
        assert_eq!(lines[1], "extraordinarily-long-word");
        assert_eq!(lines[2], "end");
    }
}
