//! .docx report generation.
//!
//! This module assembles the final document from the per-question report
//! sections: a heading, the response-count sentence, the frequency table or
//! embedded chart, the AI narrative, and the fixed source caption.

use crate::config::ReportConfig;
use crate::models::{Artifact, ChartArtifact, ReportSection, TableArtifact};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use docx_rs::{
    Docx, Paragraph, Pic, Run, Style, StyleType, Table, TableCell, TableRow,
};
use std::path::Path;

const EMU_PER_INCH: u32 = 914_400;

/// Build the complete document from the assembled sections.
pub fn build_document(sections: &[ReportSection], config: &ReportConfig) -> Docx {
    let mut docx = base_document(config);

    docx = docx.add_paragraph(heading(&config.title, "Heading1"));
    docx = docx.add_paragraph(text_paragraph(&format!(
        "Generated on {}",
        Utc::now().format("%Y-%m-%d")
    )));

    for section in sections {
        docx = append_section(docx, section, config);
    }

    docx
}

/// Write the document to the output path. All-or-nothing: this runs only
/// after every section has been processed.
pub fn save_document(docx: Docx, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;

    docx.build()
        .pack(file)
        .map_err(|err| anyhow!("Failed to package report document: {}", err))?;

    Ok(())
}

/// Register the paragraph styles the sections rely on.
fn base_document(_config: &ReportConfig) -> Docx {
    Docx::new()
        .add_style(
            Style::new("Heading1", StyleType::Paragraph)
                .name("Heading 1")
                .size(32)
                .bold(),
        )
        .add_style(
            Style::new("Heading2", StyleType::Paragraph)
                .name("Heading 2")
                .size(28)
                .bold(),
        )
        .add_style(
            Style::new("Heading3", StyleType::Paragraph)
                .name("Heading 3")
                .size(24)
                .bold(),
        )
        .add_style(
            Style::new("Caption", StyleType::Paragraph)
                .name("Caption")
                .size(18)
                .italic(),
        )
}

/// Append one question's section to the document.
fn append_section(mut docx: Docx, section: &ReportSection, config: &ReportConfig) -> Docx {
    docx = docx.add_paragraph(heading(&section.question, "Heading2"));
    docx = docx.add_paragraph(text_paragraph(&response_count_sentence(
        &section.question,
        section.total_responses,
    )));

    docx = match &section.artifact {
        Artifact::Table(table) => docx.add_table(frequency_table(table)),
        Artifact::Chart(chart) => docx.add_paragraph(chart_paragraph(chart, config)),
    };

    docx = docx.add_paragraph(heading("AI Analysis", "Heading3"));
    docx = docx.add_paragraph(text_paragraph(&section.analysis));
    docx = docx.add_paragraph(
        Paragraph::new()
            .add_run(Run::new().add_text(config.source_caption.as_str()))
            .style("Caption"),
    );

    docx
}

fn heading(text: &str, style: &str) -> Paragraph {
    Paragraph::new()
        .add_run(Run::new().add_text(text))
        .style(style)
}

fn text_paragraph(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

/// The sentence stating how many non-missing responses the question got.
fn response_count_sentence(question: &str, total: u64) -> String {
    format!("The question '{}' received {} responses.", question, total)
}

/// Render the frequency table artifact: header row plus one row per
/// distinct response, already in display order.
fn frequency_table(table: &TableArtifact) -> Table {
    let mut rows = vec![TableRow::new(vec![
        header_cell("Response"),
        header_cell("Count"),
        header_cell("Percentage (%)"),
    ])];

    for row in &table.rows {
        rows.push(TableRow::new(vec![
            text_cell(&row.response),
            text_cell(&row.count.to_string()),
            text_cell(&format!("{:.1}", row.percentage)),
        ]));
    }

    Table::new(rows)
}

fn header_cell(text: &str) -> TableCell {
    TableCell::new().add_paragraph(
        Paragraph::new().add_run(Run::new().add_text(text).bold()),
    )
}

fn text_cell(text: &str) -> TableCell {
    TableCell::new().add_paragraph(text_paragraph(text))
}

/// Embed the chart image at the configured width, keeping the raster's
/// aspect ratio.
fn chart_paragraph(chart: &ChartArtifact, config: &ReportConfig) -> Paragraph {
    let (width_emu, height_emu) = image_extent(
        config.image_width_inches,
        chart.width_px,
        chart.height_px,
    );

    let pic = Pic::new(&chart.png).size(width_emu, height_emu);
    Paragraph::new().add_run(Run::new().add_image(pic))
}

/// Document extent of the embedded image, in EMU.
fn image_extent(width_inches: f64, raster_w: u32, raster_h: u32) -> (u32, u32) {
    let width_emu = (width_inches * EMU_PER_INCH as f64) as u32;
    let aspect = if raster_w == 0 {
        1.0
    } else {
        raster_h as f64 / raster_w as f64
    };
    let height_emu = (width_emu as f64 * aspect) as u32;
    (width_emu, height_emu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableRowData;

    fn table_section() -> ReportSection {
        ReportSection {
            question: "Questao 12".to_string(),
            total_responses: 25,
            artifact: Artifact::Table(TableArtifact {
                rows: vec![
                    TableRowData {
                        response: "2022".to_string(),
                        count: 15,
                        percentage: 60.0,
                    },
                    TableRowData {
                        response: "2023".to_string(),
                        count: 10,
                        percentage: 40.0,
                    },
                ],
            }),
            analysis: "Most respondents entered in 2022.".to_string(),
        }
    }

    // The document embeds whatever bytes the renderer produced; a blank
    // raster is enough to exercise the image path.
    fn tiny_png(dir: &std::path::Path) -> Vec<u8> {
        use plotters::prelude::*;

        let path = dir.join("blank.png");
        {
            let root = BitMapBackend::new(&path, (8, 5)).into_drawing_area();
            root.fill(&WHITE).unwrap();
            root.present().unwrap();
        }
        std::fs::read(&path).unwrap()
    }

    fn chart_section(dir: &std::path::Path) -> ReportSection {
        ReportSection {
            question: "Questao 11".to_string(),
            total_responses: 10,
            artifact: Artifact::Chart(ChartArtifact {
                png: tiny_png(dir),
                width_px: 8,
                height_px: 5,
            }),
            analysis: "C was the most frequent response at 40.0%.".to_string(),
        }
    }

    #[test]
    fn test_response_count_sentence() {
        assert_eq!(
            response_count_sentence("Questao 11", 10),
            "The question 'Questao 11' received 10 responses."
        );
    }

    #[test]
    fn test_image_extent_keeps_aspect() {
        let (w, h) = image_extent(6.0, 960, 600);
        assert_eq!(w, 6 * EMU_PER_INCH);
        assert_eq!(h, (w as f64 * 600.0 / 960.0) as u32);
    }

    #[test]
    fn test_image_extent_zero_raster() {
        let (w, h) = image_extent(6.0, 0, 0);
        assert_eq!(w, h);
    }

    #[test]
    fn test_save_document_writes_docx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.docx");
        let config = ReportConfig::default();

        let docx = build_document(&[table_section(), chart_section(dir.path())], &config);
        save_document(docx, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        // A .docx file is a zip archive.
        assert!(bytes.len() > 4);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_empty_section_list_still_builds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.docx");
        let config = ReportConfig::default();

        let docx = build_document(&[], &config);
        save_document(docx, &path).unwrap();
        assert!(path.exists());
    }
}
