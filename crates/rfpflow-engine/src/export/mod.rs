//! Proposal export
//!
//! A proposal's section map is rendered into a downloadable document by a
//! [`ProposalRenderer`]. [`DocxRenderer`] is the default; [`MarkdownRenderer`]
//! can be swapped in with `Engine::with_renderer`. Rendering never touches
//! the stored proposal.

mod docx;
mod markdown;

pub use docx::DocxRenderer;
pub use markdown::MarkdownRenderer;

use once_cell::sync::Lazy;
use regex::Regex;
use rfpflow_store::Proposal;
use unicode_normalization::UnicodeNormalization;

use crate::error::EngineError;

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\W+").unwrap_or_else(|e| unreachable!("{e}")));

/// Rendered document ready to be streamed to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Turns a proposal into a document.
pub trait ProposalRenderer: Send + Sync {
    /// # Errors
    ///
    /// Returns `EngineError::Export` when the proposal cannot be rendered.
    fn render(&self, proposal: &Proposal) -> Result<ExportedDocument, EngineError>;
}

/// Anchor key for a section heading: accents stripped, runs of non-word
/// characters collapsed to `_`, upper-cased.
///
/// ```rust
/// use rfpflow_engine::normalize_section_key;
///
/// assert_eq!(normalize_section_key("Escopo de Serviços"), "ESCOPO_DE_SERVICOS");
/// assert_eq!(normalize_section_key(" Reunião de Kick-off! "), "REUNIAO_DE_KICK_OFF");
/// ```
#[must_use]
pub fn normalize_section_key(heading: &str) -> String {
    let ascii: String = heading.nfkd().filter(char::is_ascii).collect();
    NON_WORD
        .replace_all(&ascii, "_")
        .trim_matches('_')
        .to_uppercase()
}

fn ensure_sections(proposal: &Proposal) -> Result<(), EngineError> {
    if proposal.dados.is_empty() {
        return Err(EngineError::Export(format!(
            "proposal {} has no sections",
            proposal.id
        )));
    }
    Ok(())
}

fn document_title(proposal: &Proposal) -> String {
    format!("Proposta Técnica - RFP {}", proposal.rfp_id)
}

#[cfg(test)]
pub(crate) fn sample_proposal(sections: &[(&str, &str)]) -> Proposal {
    let now = chrono::Utc::now();
    Proposal {
        id: rfpflow_utils::types::ProposalId(1),
        rfp_id: rfpflow_utils::types::RfpId(9),
        dados: sections
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
        revision: 1,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_proposal_is_export_error_for_every_renderer() {
        let empty = sample_proposal(&[]);
        let renderers: [&dyn ProposalRenderer; 2] = [&DocxRenderer, &MarkdownRenderer];
        for renderer in renderers {
            let err = renderer.render(&empty).unwrap_err();
            assert!(matches!(err, EngineError::Export(_)));
        }
    }

    #[test]
    fn test_normalize_drops_non_ascii_symbols() {
        assert_eq!(normalize_section_key("Validade — Proposta"), "VALIDADE_PROPOSTA");
        assert_eq!(normalize_section_key("___"), "");
    }
}
