//! Stage triggers
//!
//! Each handler runs one engine stage and answers with the artifact it
//! produced. A second trigger for the same RFP and stage while the first is
//! still running is answered with 409.

use axum::{Json, extract::State};
use indexmap::IndexMap;
use rfpflow_engine::ScopeSuggestion;
use rfpflow_store::{BomItem, VendorMatch};
use rfpflow_utils::types::RfpId;

use crate::dto::AnalyzeResponse;
use crate::error::ApiResult;
use crate::extract::Id;
use crate::state::AppState;

pub async fn analyze(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let resumo = state.engine.analyze(rfp_id).await?;
    Ok(Json(AnalyzeResponse { resumo }))
}

pub async fn match_vendors(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
) -> ApiResult<Json<Vec<VendorMatch>>> {
    Ok(Json(state.engine.match_vendors(rfp_id).await?))
}

pub async fn generate_bom(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
) -> ApiResult<Json<Vec<BomItem>>> {
    Ok(Json(state.engine.generate_bom(rfp_id).await?))
}

/// Current BoM; empty before the first generation.
pub async fn get_bom(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
) -> ApiResult<Json<Vec<BomItem>>> {
    let items = state
        .store()
        .bom(rfp_id)?
        .map(|snapshot| snapshot.value.clone())
        .unwrap_or_default();
    Ok(Json(items))
}

pub async fn suggest_scope(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
) -> ApiResult<Json<ScopeSuggestion>> {
    Ok(Json(state.engine.suggest_scope(rfp_id).await?))
}

pub async fn generate_proposal(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
) -> ApiResult<Json<IndexMap<String, String>>> {
    let proposal = state.engine.generate_proposal(rfp_id).await?;
    Ok(Json(proposal.dados))
}
