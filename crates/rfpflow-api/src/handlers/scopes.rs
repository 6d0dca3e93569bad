//! Service-scope entries

use axum::{Json, extract::State, http::StatusCode};
use rfpflow_store::ScopeEntry;
use rfpflow_utils::types::{RfpId, ScopeId};

use crate::dto::ScopeRequest;
use crate::error::ApiResult;
use crate::extract::{Body, Id};
use crate::state::AppState;

pub async fn list_scopes(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
) -> ApiResult<Json<Vec<ScopeEntry>>> {
    Ok(Json(state.store().list_scopes(rfp_id)?))
}

pub async fn create_scope(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
    Body(req): Body<ScopeRequest>,
) -> ApiResult<(StatusCode, Json<ScopeEntry>)> {
    let entry = state
        .store()
        .create_scope(rfp_id, &req.titulo, &req.descricao)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update_scope(
    State(state): State<AppState>,
    Id(id): Id<ScopeId>,
    Body(req): Body<ScopeRequest>,
) -> ApiResult<Json<ScopeEntry>> {
    Ok(Json(
        state
            .store()
            .update_scope(id, &req.titulo, &req.descricao)?,
    ))
}

pub async fn delete_scope(
    State(state): State<AppState>,
    Id(id): Id<ScopeId>,
) -> ApiResult<Json<ScopeEntry>> {
    Ok(Json(state.store().delete_scope(id)?))
}
