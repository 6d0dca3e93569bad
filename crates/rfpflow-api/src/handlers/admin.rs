//! Provider registry and prompt store administration

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rfpflow_store::{
    NewPrompt, NewProvider, PromptRecord, PromptUpdate, ProviderUpdate, ProviderView,
};
use rfpflow_utils::types::{PromptId, ProviderId};

use crate::error::{ApiError, ApiResult};
use crate::extract::{Body, Id};
use crate::state::AppState;

pub async fn list_providers(State(state): State<AppState>) -> Json<Vec<ProviderView>> {
    Json(state.store().list_providers())
}

pub async fn create_provider(
    State(state): State<AppState>,
    Body(req): Body<NewProvider>,
) -> ApiResult<(StatusCode, Json<ProviderView>)> {
    let view = state.store().create_provider(req)?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn update_provider(
    State(state): State<AppState>,
    Id(id): Id<ProviderId>,
    Body(req): Body<ProviderUpdate>,
) -> ApiResult<Json<ProviderView>> {
    Ok(Json(state.store().update_provider(id, req)?))
}

pub async fn select_provider(
    State(state): State<AppState>,
    Id(id): Id<ProviderId>,
) -> ApiResult<Json<ProviderView>> {
    Ok(Json(state.store().select_provider(id)?))
}

pub async fn selected_provider(State(state): State<AppState>) -> ApiResult<Json<ProviderView>> {
    let record = state
        .store()
        .selected_provider()
        .ok_or_else(|| ApiError::not_found("No AI provider is selected"))?;
    Ok(Json(state.store().get_provider(record.id)?))
}

pub async fn list_prompts(State(state): State<AppState>) -> Json<Vec<PromptRecord>> {
    Json(state.store().list_prompts())
}

pub async fn create_prompt(
    State(state): State<AppState>,
    Body(req): Body<NewPrompt>,
) -> ApiResult<(StatusCode, Json<PromptRecord>)> {
    let prompt = state.store().create_prompt(req)?;
    Ok((StatusCode::CREATED, Json(prompt)))
}

pub async fn get_prompt(
    State(state): State<AppState>,
    Id(id): Id<PromptId>,
) -> ApiResult<Json<PromptRecord>> {
    Ok(Json(state.store().get_prompt(id)?))
}

pub async fn prompt_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<PromptRecord>> {
    Ok(Json(state.store().prompt_by_name(&name)?))
}

pub async fn update_prompt(
    State(state): State<AppState>,
    Id(id): Id<PromptId>,
    Body(req): Body<PromptUpdate>,
) -> ApiResult<Json<PromptRecord>> {
    Ok(Json(state.store().update_prompt(id, req)?))
}

pub async fn delete_prompt(
    State(state): State<AppState>,
    Id(id): Id<PromptId>,
) -> ApiResult<Json<PromptRecord>> {
    Ok(Json(state.store().delete_prompt(id)?))
}
