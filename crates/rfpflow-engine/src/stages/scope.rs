use once_cell::sync::Lazy;
use regex::Regex;
use rfpflow_prompt_template::{PromptContext, names};
use rfpflow_store::{Rfp, Store};
use rfpflow_utils::types::{RfpId, StageId};
use serde::{Deserialize, Serialize};

use super::{Preparation, Stage, require_summary};
use crate::error::EngineError;

const DEFAULT_TITLE: &str = "Sugestão de Escopo";

static TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^\s*\**T[IÍ]TULO\**\s*:\s*\**\s*(.+)$")
        .unwrap_or_else(|e| unreachable!("title pattern is valid: {e}"))
});

static DESCRIPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?si)\**DESCRI[CÇ][AÃ]O\**\s*:\s*\**\s*(.*)")
        .unwrap_or_else(|e| unreachable!("description pattern is valid: {e}"))
});

/// A drafted scope entry. Nothing is stored until the caller accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSuggestion {
    pub titulo: String,
    pub descricao: String,
}

/// Split a suggestion into title and description.
///
/// Without a `TÍTULO:` marker the title is `Sugestão de Escopo`; without a
/// `DESCRICAO:` marker the whole text is the description.
#[must_use]
pub fn parse_scope_suggestion(raw: &str) -> ScopeSuggestion {
    let text = raw.trim();
    let titulo = TITLE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let descricao = DESCRIPTION
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or_else(|| text.to_string(), |m| m.as_str().trim().to_string());
    ScopeSuggestion { titulo, descricao }
}

/// Service-scope suggestion. A one-shot draft: commit writes nothing.
pub(crate) struct ScopeSuggestionStage;

impl Stage for ScopeSuggestionStage {
    type Parsed = ScopeSuggestion;
    type Output = ScopeSuggestion;

    fn id(&self) -> StageId {
        StageId::Scope
    }

    fn user_prompt(&self) -> &'static str {
        names::SCOPE_SUGGESTION_USER_PROMPT
    }

    fn prepare(&self, rfp: &Rfp, _store: &Store) -> Result<Preparation<ScopeSuggestion>, EngineError> {
        let summary = require_summary(rfp, StageId::Scope)?;
        Ok(Preparation::Invoke(
            PromptContext::new().with("rfp_summary", summary),
        ))
    }

    fn postprocess(&self, raw: &str, _store: &Store) -> Result<ScopeSuggestion, EngineError> {
        if raw.trim().is_empty() {
            return Err(EngineError::malformed(StageId::Scope, "empty suggestion"));
        }
        Ok(parse_scope_suggestion(raw))
    }

    fn commit(
        &self,
        _rfp_id: RfpId,
        parsed: ScopeSuggestion,
        _store: &Store,
    ) -> Result<ScopeSuggestion, EngineError> {
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_are_split() {
        let raw = "TÍTULO: Implantação de rede\nDESCRICAO: ## Atividades\n- Site survey\n- Instalação";
        let s = parse_scope_suggestion(raw);
        assert_eq!(s.titulo, "Implantação de rede");
        assert_eq!(s.descricao, "## Atividades\n- Site survey\n- Instalação");
    }

    #[test]
    fn test_bold_and_accented_markers() {
        let raw = "**Título:** Migração\n\n**Descrição:** Migrar 3 sites.";
        let s = parse_scope_suggestion(raw);
        assert_eq!(s.titulo, "Migração");
        assert_eq!(s.descricao, "Migrar 3 sites.");
    }

    #[test]
    fn test_without_markers_whole_text_is_description() {
        let s = parse_scope_suggestion("  Escopo livre em texto.  ");
        assert_eq!(s.titulo, DEFAULT_TITLE);
        assert_eq!(s.descricao, "Escopo livre em texto.");
    }
}
