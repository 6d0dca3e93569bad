use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use rfpflow_prompt_template::{PromptContext, names};
use rfpflow_store::{Proposal, Rfp, Store};
use rfpflow_utils::types::{RfpId, StageId};

use super::{Preparation, Stage, chosen_vendor_info, require_summary};
use crate::error::EngineError;

static SECTION_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^###\s+").unwrap_or_else(|e| unreachable!("heading pattern is valid: {e}"))
});

/// Split Markdown into `### heading` → body, in document order.
///
/// Text before the first heading is dropped. A repeated heading keeps its
/// first position and its last body.
///
/// ```rust
/// use rfpflow_engine::parse_sections;
///
/// let sections = parse_sections("intro\n### CLIENTE\nACME\n### BOM\n- switch\n");
/// assert_eq!(sections.keys().collect::<Vec<_>>(), ["CLIENTE", "BOM"]);
/// assert_eq!(sections["BOM"], "- switch");
/// ```
#[must_use]
pub fn parse_sections(markdown: &str) -> IndexMap<String, String> {
    let mut sections = IndexMap::new();
    for part in SECTION_HEADING.split(markdown).skip(1) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (heading, body) = part.split_once('\n').unwrap_or((part, ""));
        sections.insert(heading.trim().to_string(), body.trim().to_string());
    }
    sections
}

/// Technical-proposal composition
pub(crate) struct ProposalGeneration;

impl Stage for ProposalGeneration {
    type Parsed = IndexMap<String, String>;
    type Output = Proposal;

    fn id(&self) -> StageId {
        StageId::Proposal
    }

    fn user_prompt(&self) -> &'static str {
        names::TECHNICAL_PROPOSAL_USER_PROMPT
    }

    fn prepare(
        &self,
        rfp: &Rfp,
        store: &Store,
    ) -> Result<Preparation<IndexMap<String, String>>, EngineError> {
        let summary = require_summary(rfp, StageId::Proposal)?;

        let files = store.list_files(rfp.id)?;
        let arquivos_text = if files.is_empty() {
            "Nenhum arquivo anexado".to_string()
        } else {
            files
                .iter()
                .map(|f| format!("- {}", f.filename))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let bom_text = match store.bom(rfp.id)? {
            Some(snapshot) if !snapshot.value.is_empty() => snapshot
                .value
                .iter()
                .map(|item| {
                    format!(
                        "- {} (modelo: {}, part_number: {}, quantidade: {})",
                        item.descricao, item.modelo, item.part_number, item.quantidade
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            _ => "Nenhum BoM gerado".to_string(),
        };

        let escopos_text = store
            .list_scopes(rfp.id)?
            .iter()
            .map(|e| format!("- {}: {}", e.titulo, e.descricao))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Preparation::Invoke(
            PromptContext::new()
                .with("rfp_nome", rfp.nome.clone())
                .with("arquivos_text", arquivos_text)
                .with("rfp_resumo_ia", summary)
                .with("vendor_info", chosen_vendor_info(rfp, store))
                .with("bom_text", bom_text)
                .with("escopos_text", escopos_text),
        ))
    }

    fn postprocess(
        &self,
        raw: &str,
        _store: &Store,
    ) -> Result<IndexMap<String, String>, EngineError> {
        let sections = parse_sections(raw);
        if sections.is_empty() {
            return Err(EngineError::malformed(
                StageId::Proposal,
                "response has no '###' sections",
            ));
        }
        Ok(sections)
    }

    fn commit(
        &self,
        rfp_id: RfpId,
        parsed: IndexMap<String, String>,
        store: &Store,
    ) -> Result<Proposal, EngineError> {
        Ok(store.commit_generated_proposal(rfp_id, parsed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_heading_keeps_last_body() {
        let md = "### ESCOPO DE SERVIÇOS\nprimeiro\n### BOM\nitens\n### ESCOPO DE SERVIÇOS\nsegundo";
        let sections = parse_sections(md);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections.get_index(0).unwrap().0, "ESCOPO DE SERVIÇOS");
        assert_eq!(sections["ESCOPO DE SERVIÇOS"], "segundo");
    }

    #[test]
    fn test_heading_without_body_and_inline_hashes() {
        let md = "### CLIENTE\n### NOME DO PROJETO\nRede #### não é seção\n  ### também não";
        let sections = parse_sections(md);
        assert_eq!(sections["CLIENTE"], "");
        assert_eq!(
            sections["NOME DO PROJETO"],
            "Rede #### não é seção\n  ### também não"
        );
    }

    #[test]
    fn test_no_heading_yields_empty_map() {
        assert!(parse_sections("Proposta sem seções").is_empty());
        assert!(parse_sections("").is_empty());
    }
}
