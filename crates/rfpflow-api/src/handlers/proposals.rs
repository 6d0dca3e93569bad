//! Technical proposals: reads, human edits and export

use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use rfpflow_utils::types::{ProposalId, RfpId};

use crate::dto::{ProposalResponse, SaveProposalRequest};
use crate::error::ApiResult;
use crate::extract::{Body, Id};
use crate::state::AppState;

pub async fn get_proposal(
    State(state): State<AppState>,
    Id(id): Id<ProposalId>,
) -> ApiResult<Json<ProposalResponse>> {
    Ok(Json(state.store().get_proposal(id)?.into()))
}

/// Overwrite the proposal's sections. Last write wins.
pub async fn save_proposal(
    State(state): State<AppState>,
    Id(id): Id<ProposalId>,
    Body(req): Body<SaveProposalRequest>,
) -> ApiResult<Json<ProposalResponse>> {
    Ok(Json(state.engine.save_proposal(id, req.dados_json)?.into()))
}

/// Proposals of an RFP. An RFP has at most one active proposal.
pub async fn list_for_rfp(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
) -> ApiResult<Json<Vec<ProposalResponse>>> {
    let proposals = state
        .store()
        .proposal_for_rfp(rfp_id)?
        .into_iter()
        .map(ProposalResponse::from)
        .collect();
    Ok(Json(proposals))
}

pub async fn download(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
) -> ApiResult<Response> {
    let doc = state.engine.export_proposal_for_rfp(rfp_id)?;
    let disposition = format!("attachment; filename={}", doc.filename);
    Ok((
        [
            (header::CONTENT_TYPE, doc.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        doc.bytes,
    )
        .into_response())
}
