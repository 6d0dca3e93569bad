//! Text extraction from uploaded source documents
//!
//! RFPs mostly arrive as PDF or DOCX; plain-text formats and HTML are read
//! too. DOCX text comes from `word/document.xml` with one line per
//! paragraph.

use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, warn};

static HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<script.*?</script>|<style.*?</style>|<[^>]+>")
        .unwrap_or_else(|e| unreachable!("tag pattern is valid: {e}"))
});

static BLANK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n+").unwrap_or_else(|e| unreachable!("{e}")));

const DOCX_BODY: &str = "word/document.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Plain,
    Html,
    Pdf,
    Docx,
}

fn format_of(filename: &str) -> Option<Format> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)?;
    match ext.as_str() {
        "txt" | "md" | "markdown" | "csv" | "json" => Some(Format::Plain),
        "html" | "htm" => Some(Format::Html),
        "pdf" => Some(Format::Pdf),
        "docx" => Some(Format::Docx),
        _ => None,
    }
}

/// Whether `filename` has a format the analysis stage can read.
#[must_use]
pub fn is_supported(filename: &str) -> bool {
    format_of(filename).is_some()
}

/// Readable text of one uploaded document.
///
/// Returns `None` for unsupported formats, unreadable or corrupt files and
/// files without any text; each case is logged.
#[must_use]
pub fn extract_text(filename: &str, path: &Path) -> Option<String> {
    let Some(format) = format_of(filename) else {
        warn!(file = %filename, "Skipping document in unsupported format");
        return None;
    };

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(file = %filename, path = %path.display(), error = %e, "Cannot read document");
            return None;
        }
    };

    let text = match format {
        Format::Plain => String::from_utf8(bytes).map_err(|e| e.to_string()),
        Format::Html => String::from_utf8(bytes)
            .map(|raw| {
                let stripped = HTML_TAG.replace_all(&raw, "\n");
                BLANK_RUNS.replace_all(&stripped, "\n\n").into_owned()
            })
            .map_err(|e| e.to_string()),
        Format::Pdf => pdf_text(&bytes),
        Format::Docx => docx_text(&bytes),
    };
    let text = match text {
        Ok(text) => text,
        Err(e) => {
            warn!(file = %filename, error = %e, "Cannot decode document");
            return None;
        }
    };

    let text = text.trim();
    if text.is_empty() {
        warn!(file = %filename, "Document has no text");
        return None;
    }
    debug!(file = %filename, format = ?format, chars = text.len(), "Extracted document text");
    Some(text.to_string())
}

fn pdf_text(bytes: &[u8]) -> Result<String, String> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| format!("invalid PDF: {e}"))?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages)
        .map_err(|e| format!("PDF text extraction failed: {e}"))
}

fn docx_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("invalid DOCX: {e}"))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| format!("DOCX without {DOCX_BODY}: {e}"))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("cannot read {DOCX_BODY}: {e}"))?;
    wordprocessing_text(&xml).map_err(|e| format!("malformed {DOCX_BODY}: {e}"))
}

/// Text runs (`w:t`) of a WordprocessingML body, a newline after each
/// paragraph. Tabs and breaks are kept.
fn wordprocessing_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_run_text = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_run_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" | b"p" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_run_text => out.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{DocxRenderer, ProposalRenderer};
    use indexmap::IndexMap;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};
    use rfpflow_store::Proposal;
    use rfpflow_utils::types::{ProposalId, RfpId};
    use tempfile::TempDir;

    fn pdf_with_line(line: &str) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_supported_formats() {
        assert!(is_supported("edital.TXT"));
        assert!(is_supported("anexo.md"));
        assert!(is_supported("itens.csv"));
        assert!(is_supported("edital.pdf"));
        assert!(is_supported("Termo de Referencia.DOCX"));
        assert!(!is_supported("planilha.xlsx"));
        assert!(!is_supported("sem_extensao"));
    }

    #[test]
    fn test_html_tags_are_stripped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.html");
        std::fs::write(
            &path,
            "<html><style>p{}</style><body><h1>Rede</h1>\n\n\n<p>20 switches</p></body></html>",
        )
        .unwrap();
        let text = extract_text("a.html", &path).unwrap();
        assert!(text.contains("Rede"));
        assert!(text.contains("20 switches"));
        assert!(!text.contains('<'));
        assert!(!text.contains("p{}"));
    }

    #[test]
    fn test_pdf_text_is_extracted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edital.pdf");
        std::fs::write(&path, pdf_with_line("Fornecimento de 40 access points")).unwrap();

        let text = extract_text("edital.pdf", &path).unwrap();
        assert!(text.contains("access points"), "{text}");
    }

    #[test]
    fn test_docx_paragraphs_become_lines() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:r><w:t>Objeto:</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve"> rede &amp; Wi-Fi</w:t></w:r></w:p>
<w:p><w:r><w:t>Prazo: 90 dias</w:t></w:r></w:p>
</w:body></w:document>"#;
        assert_eq!(
            wordprocessing_text(xml).unwrap(),
            "Objeto:\t rede & Wi-Fi\nPrazo: 90 dias\n"
        );
    }

    #[test]
    fn test_docx_written_by_renderer_reads_back() {
        let now = chrono::Utc::now();
        let mut dados = IndexMap::new();
        dados.insert("CLIENTE".to_string(), "Universidade Federal".to_string());
        dados.insert("BOM".to_string(), "AP-650 x120".to_string());
        let doc = DocxRenderer
            .render(&Proposal {
                id: ProposalId(1),
                rfp_id: RfpId(3),
                dados,
                revision: 1,
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("proposta.docx");
        std::fs::write(&path, &doc.bytes).unwrap();
        let text = extract_text("proposta.docx", &path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "Proposta Técnica - RFP 3",
                "CLIENTE",
                "Universidade Federal",
                "BOM",
                "AP-650 x120"
            ]
        );
    }

    #[test]
    fn test_unsupported_corrupt_and_empty_files_yield_none() {
        let dir = TempDir::new().unwrap();
        let xlsx = dir.path().join("a.xlsx");
        std::fs::write(&xlsx, b"PK").unwrap();
        assert_eq!(extract_text("a.xlsx", &xlsx), None);

        let broken_pdf = dir.path().join("b.pdf");
        std::fs::write(&broken_pdf, b"%PDF-1.7 truncated").unwrap();
        assert_eq!(extract_text("b.pdf", &broken_pdf), None);

        let broken_docx = dir.path().join("c.docx");
        std::fs::write(&broken_docx, b"not a zip").unwrap();
        assert_eq!(extract_text("c.docx", &broken_docx), None);

        let empty = dir.path().join("d.txt");
        std::fs::write(&empty, "  \n").unwrap();
        assert_eq!(extract_text("d.txt", &empty), None);

        assert_eq!(extract_text("e.txt", &dir.path().join("missing.txt")), None);
    }
}
