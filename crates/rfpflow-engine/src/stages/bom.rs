use rfpflow_prompt_template::{PromptContext, names};
use rfpflow_store::{BomItem, Rfp, Store};
use rfpflow_utils::types::{RfpId, StageId};
use serde::Deserialize;
use serde_json::Value;

use super::{Preparation, Stage, chosen_vendor_info, extract_json_array, require_summary};
use crate::error::EngineError;

/// Bill-of-materials extraction
pub(crate) struct BomGeneration;

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    descricao: Option<String>,
    #[serde(default)]
    modelo: Option<String>,
    #[serde(default)]
    part_number: Option<String>,
    #[serde(default)]
    quantidade: Option<Value>,
}

fn quantity_of(value: Option<&Value>) -> Result<u32, String> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(1);
    };
    value
        .as_u64()
        .filter(|q| *q > 0)
        .and_then(|q| u32::try_from(q).ok())
        .ok_or_else(|| format!("quantity must be a positive integer, got {value}"))
}

/// Parse a BoM list. A missing quantity counts as 1.
///
/// # Errors
///
/// Fails when no JSON list is found, an entry is not an object, or any
/// quantity is present but not a positive integer. One bad line rejects the
/// whole list.
pub fn parse_bom_items(raw: &str) -> Result<Vec<BomItem>, String> {
    let json = extract_json_array(raw).ok_or_else(|| "no JSON list in response".to_string())?;
    let entries: Vec<RawItem> =
        serde_json::from_str(json).map_err(|e| format!("invalid BoM list: {e}"))?;

    entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            let quantidade =
                quantity_of(entry.quantidade.as_ref()).map_err(|e| format!("item {idx}: {e}"))?;
            Ok(BomItem {
                descricao: entry.descricao.unwrap_or_default(),
                modelo: entry.modelo.unwrap_or_default(),
                part_number: entry.part_number.unwrap_or_default(),
                quantidade,
            })
        })
        .collect()
}

impl Stage for BomGeneration {
    type Parsed = Vec<BomItem>;
    type Output = Vec<BomItem>;

    fn id(&self) -> StageId {
        StageId::Bom
    }

    fn user_prompt(&self) -> &'static str {
        names::BOM_GENERATION_USER_PROMPT
    }

    fn prepare(&self, rfp: &Rfp, store: &Store) -> Result<Preparation<Vec<BomItem>>, EngineError> {
        let summary = require_summary(rfp, StageId::Bom)?;
        Ok(Preparation::Invoke(
            PromptContext::new()
                .with("rfp_summary", summary)
                .with("vendor_info", chosen_vendor_info(rfp, store)),
        ))
    }

    fn postprocess(&self, raw: &str, _store: &Store) -> Result<Vec<BomItem>, EngineError> {
        parse_bom_items(raw).map_err(|reason| EngineError::malformed(StageId::Bom, reason))
    }

    fn commit(
        &self,
        rfp_id: RfpId,
        parsed: Vec<BomItem>,
        store: &Store,
    ) -> Result<Vec<BomItem>, EngineError> {
        let snapshot = store.commit_bom(rfp_id, parsed)?;
        Ok(snapshot.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_quantity_defaults_to_one() {
        let raw = r#"```json
[{"descricao": "Switch 48p", "modelo": "X48", "part_number": "PN-48", "quantidade": 12},
 {"descricao": "Licença", "modelo": "LIC", "part_number": "L-1"}]
```"#;
        let items = parse_bom_items(raw).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantidade, 12);
        assert_eq!(items[1].quantidade, 1);
    }

    #[test]
    fn test_bad_quantity_rejects_whole_list() {
        for bad in ["0", "-2", "1.5", "\"três\""] {
            let raw = format!(
                r#"[{{"descricao": "a", "quantidade": 1}}, {{"descricao": "b", "quantidade": {bad}}}]"#
            );
            let err = parse_bom_items(&raw).unwrap_err();
            assert!(err.starts_with("item 1"), "{bad}: {err}");
        }
    }

    #[test]
    fn test_no_list_is_an_error() {
        assert!(parse_bom_items("Não foi possível gerar o BoM.").is_err());
    }
}
