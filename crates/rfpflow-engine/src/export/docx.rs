use quick_xml::escape::escape;
use rfpflow_store::Proposal;
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::{
    ExportedDocument, ProposalRenderer, document_title, ensure_sections, normalize_section_key,
};
use crate::error::EngineError;

const CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Half-points
const TITLE_SIZE: u32 = 32;
const HEADING_SIZE: u32 = 28;

/// Word document with a bold heading per section, bookmarked under its
/// normalised key, followed by one paragraph per body line.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxRenderer;

impl ProposalRenderer for DocxRenderer {
    fn render(&self, proposal: &Proposal) -> Result<ExportedDocument, EngineError> {
        ensure_sections(proposal)?;
        let bytes = package(&document_xml(proposal))
            .map_err(|e| EngineError::Export(format!("cannot build DOCX: {e}")))?;
        Ok(ExportedDocument {
            filename: format!("proposta_tecnica_rfp_{}.docx", proposal.rfp_id),
            content_type: CONTENT_TYPE,
            bytes,
        })
    }
}

fn document_xml(proposal: &Proposal) -> String {
    let mut body = String::new();
    bold_paragraph(&mut body, &document_title(proposal), TITLE_SIZE, None);
    for (idx, (heading, text)) in proposal.dados.iter().enumerate() {
        let anchor = normalize_section_key(heading);
        let bookmark = (!anchor.is_empty()).then_some((idx, anchor.as_str()));
        bold_paragraph(&mut body, heading, HEADING_SIZE, bookmark);
        for line in text.trim_end().lines() {
            plain_paragraph(&mut body, line);
        }
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

fn bold_paragraph(out: &mut String, text: &str, size: u32, bookmark: Option<(usize, &str)>) {
    out.push_str("<w:p>");
    if let Some((id, name)) = bookmark {
        out.push_str(&format!(
            r#"<w:bookmarkStart w:id="{id}" w:name="{}"/>"#,
            escape(name)
        ));
    }
    out.push_str(&format!(
        r#"<w:r><w:rPr><w:b/><w:sz w:val="{size}"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape(text)
    ));
    if let Some((id, _)) = bookmark {
        out.push_str(&format!(r#"<w:bookmarkEnd w:id="{id}"/>"#));
    }
    out.push_str("</w:p>");
}

fn plain_paragraph(out: &mut String, line: &str) {
    if line.trim().is_empty() {
        out.push_str("<w:p/>");
        return;
    }
    out.push_str(&format!(
        r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape(line)
    ));
}

fn package(document: &str) -> Result<Vec<u8>, zip::result::ZipError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        ("_rels/.rels", PACKAGE_RELS_XML),
        ("word/document.xml", document),
    ] {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}
