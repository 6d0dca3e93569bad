use rfpflow_prompt_template::{PromptContext, names};
use rfpflow_store::{Rfp, Store};
use rfpflow_utils::types::{RfpId, StageId};

use super::{Preparation, Stage};
use crate::error::EngineError;
use crate::extract::extract_text;

/// Textual analysis of every uploaded document
pub(crate) struct Analysis;

impl Stage for Analysis {
    type Parsed = String;
    type Output = String;

    fn id(&self) -> StageId {
        StageId::Analysis
    }

    fn system_prompt(&self) -> Option<&'static str> {
        Some(names::RFP_ANALYSIS_SYSTEM_ROLE)
    }

    fn user_prompt(&self) -> &'static str {
        names::RFP_ANALYSIS_USER_PROMPT
    }

    fn prepare(&self, rfp: &Rfp, store: &Store) -> Result<Preparation<String>, EngineError> {
        let mut text = String::new();
        for file in store.list_files(rfp.id)? {
            if let Some(content) = extract_text(&file.filename, &file.stored_path) {
                text.push_str(&format!(
                    "\n\nConteúdo do arquivo {}:\n{content}",
                    file.filename
                ));
            }
        }

        if text.is_empty() {
            return Err(EngineError::PreconditionFailed {
                stage: StageId::Analysis,
                reason: format!("RFP {} has no uploaded document with extractable text", rfp.id),
            });
        }
        Ok(Preparation::Invoke(PromptContext::new().with("text", text)))
    }

    fn postprocess(&self, raw: &str, _store: &Store) -> Result<String, EngineError> {
        let summary = raw.trim();
        if summary.is_empty() {
            return Err(EngineError::malformed(StageId::Analysis, "empty analysis"));
        }
        Ok(summary.to_string())
    }

    fn commit(&self, rfp_id: RfpId, parsed: String, store: &Store) -> Result<String, EngineError> {
        let rfp = store.commit_analysis(rfp_id, parsed)?;
        Ok(rfp.resumo_ia.unwrap_or_default())
    }
}
