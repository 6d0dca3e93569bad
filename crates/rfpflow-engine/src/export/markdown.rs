use rfpflow_store::Proposal;

use super::{
    ExportedDocument, ProposalRenderer, document_title, ensure_sections, normalize_section_key,
};
use crate::error::EngineError;

/// Markdown document with one `##` section per entry
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl ProposalRenderer for MarkdownRenderer {
    fn render(&self, proposal: &Proposal) -> Result<ExportedDocument, EngineError> {
        ensure_sections(proposal)?;

        let mut out = format!("# {}\n", document_title(proposal));
        for (heading, body) in &proposal.dados {
            let anchor = normalize_section_key(heading);
            out.push_str(&format!("\n<a id=\"{anchor}\"></a>\n## {heading}\n\n"));
            if !body.trim().is_empty() {
                out.push_str(body.trim_end());
                out.push('\n');
            }
        }

        Ok(ExportedDocument {
            filename: format!("proposta_tecnica_rfp_{}.md", proposal.rfp_id),
            content_type: "text/markdown; charset=utf-8",
            bytes: out.into_bytes(),
        })
    }
}
