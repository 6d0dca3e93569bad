use rfpflow_prompt_template::{PromptContext, names};
use rfpflow_store::{Rfp, Store, Vendor, VendorMatch};
use rfpflow_utils::types::{RfpId, StageId, VendorId};
use serde::Deserialize;
use serde_json::Value;

use super::{Preparation, Stage, extract_json_array, require_summary};
use crate::error::EngineError;

/// Vendor-fit scoring against the whole vendor directory
pub(crate) struct VendorMatching;

/// One entry as the model writes it. Every field is optional: a missing
/// score counts as 0 and a missing reason as empty.
#[derive(Debug, Deserialize)]
struct RawMatch {
    #[serde(default, alias = "nome", alias = "fabricante")]
    vendor: Option<String>,
    #[serde(default)]
    score: Option<Value>,
    #[serde(default, alias = "motivo_nota", alias = "rationale")]
    motivo: Option<String>,
}

fn score_of(value: Option<&Value>) -> u8 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if raw.is_nan() {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamped = raw.round().clamp(0.0, 100.0) as u8;
    clamped
}

/// Directory id for a model-written vendor name, ignoring case and
/// surrounding whitespace.
#[must_use]
pub fn resolve_vendor(name: &str, vendors: &[Vendor]) -> Option<VendorId> {
    let wanted = name.trim();
    vendors
        .iter()
        .find(|v| v.nome.trim().eq_ignore_ascii_case(wanted))
        .map(|v| v.id)
}

/// Order by score, highest first. Equal scores keep their input order.
///
/// ```rust
/// use rfpflow_engine::rank_matches;
/// use rfpflow_store::VendorMatch;
///
/// let m = |v: &str, score| VendorMatch { vendor: v.into(), vendor_id: None, score, motivo: String::new() };
/// let ranked = rank_matches(vec![m("A", 40), m("B", 90), m("C", 90), m("D", 10)]);
/// let order: Vec<_> = ranked.iter().map(|m| m.vendor.as_str()).collect();
/// assert_eq!(order, ["B", "C", "A", "D"]);
/// ```
#[must_use]
pub fn rank_matches(mut matches: Vec<VendorMatch>) -> Vec<VendorMatch> {
    // `sort_by` is stable
    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches
}

/// Parse the model's (or a client's) JSON list into ranked matches.
///
/// Names that match no vendor are kept with `vendor_id = None`.
///
/// # Errors
///
/// Returns a description of the problem when no JSON array can be found or
/// it is not a list of objects.
pub fn parse_vendor_matches(raw: &str, vendors: &[Vendor]) -> Result<Vec<VendorMatch>, String> {
    let json = extract_json_array(raw).ok_or_else(|| "no JSON list in response".to_string())?;
    let entries: Vec<RawMatch> =
        serde_json::from_str(json).map_err(|e| format!("invalid vendor list: {e}"))?;

    let matches = entries
        .into_iter()
        .map(|entry| {
            let vendor = entry.vendor.unwrap_or_default().trim().to_string();
            VendorMatch {
                vendor_id: resolve_vendor(&vendor, vendors),
                score: score_of(entry.score.as_ref()),
                motivo: entry.motivo.unwrap_or_default(),
                vendor,
            }
        })
        .collect();
    Ok(rank_matches(matches))
}

fn vendors_info(vendors: &[Vendor]) -> String {
    vendors
        .iter()
        .map(|v| {
            format!(
                "Vendor: {}\nTecnologias: {}\nProdutos: {}\nCertificacoes: {}\nRequisitos_Atendidos: {}",
                v.nome, v.tecnologias, v.produtos, v.certificacoes, v.requisitos_atendidos
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl Stage for VendorMatching {
    type Parsed = Vec<VendorMatch>;
    type Output = Vec<VendorMatch>;

    fn id(&self) -> StageId {
        StageId::VendorMatch
    }

    fn system_prompt(&self) -> Option<&'static str> {
        Some(names::VENDOR_MATCHING_SYSTEM_ROLE)
    }

    fn user_prompt(&self) -> &'static str {
        names::VENDOR_MATCHING_USER_PROMPT
    }

    fn prepare(
        &self,
        rfp: &Rfp,
        store: &Store,
    ) -> Result<Preparation<Vec<VendorMatch>>, EngineError> {
        let summary = require_summary(rfp, StageId::VendorMatch)?;
        let vendors = store.list_vendors();
        if vendors.is_empty() {
            return Ok(Preparation::Skip(Vec::new()));
        }
        Ok(Preparation::Invoke(
            PromptContext::new()
                .with("rfp_summary", summary)
                .with("vendors_info", vendors_info(&vendors)),
        ))
    }

    fn postprocess(&self, raw: &str, store: &Store) -> Result<Vec<VendorMatch>, EngineError> {
        parse_vendor_matches(raw, &store.list_vendors())
            .map_err(|reason| EngineError::malformed(StageId::VendorMatch, reason))
    }

    fn commit(
        &self,
        rfp_id: RfpId,
        parsed: Vec<VendorMatch>,
        store: &Store,
    ) -> Result<Vec<VendorMatch>, EngineError> {
        let blob = store.commit_vendor_matches(rfp_id, parsed)?;
        Ok(blob.value.clone())
    }
}
