//! RFP intake, uploaded documents and the vendor directory

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use rfpflow_store::Vendor;
use rfpflow_utils::types::RfpId;
use tracing::info;

use crate::dto::{
    CreateRfpRequest, FileResponse, MessageResponse, RfpResponse, SaveVendorAnalysisRequest,
    SetVendorRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::extract::{Body, Id};
use crate::state::AppState;

const FILE_FIELD: &str = "file";

pub async fn list_rfps(State(state): State<AppState>) -> Json<Vec<RfpResponse>> {
    Json(
        state
            .store()
            .list_rfps()
            .into_iter()
            .map(RfpResponse::from)
            .collect(),
    )
}

pub async fn create_rfp(
    State(state): State<AppState>,
    Body(req): Body<CreateRfpRequest>,
) -> ApiResult<(StatusCode, Json<RfpResponse>)> {
    let rfp = state.store().create_rfp(&req.nome)?;
    info!(rfp_id = %rfp.id, "RFP created");
    Ok((StatusCode::CREATED, Json(rfp.into())))
}

pub async fn get_rfp(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
) -> ApiResult<Json<RfpResponse>> {
    Ok(Json(state.store().get_rfp(rfp_id)?.into()))
}

/// Store the multipart `file` field of the request.
pub async fn upload_file(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
    mut multipart: Multipart,
) -> ApiResult<Json<FileResponse>> {
    // Unknown RFP wins over a malformed body
    state.store().get_rfp(rfp_id)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid_request(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::invalid_request("field 'file' carries no file name"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::invalid_request(e.body_text()))?;
        let file = state.engine.upload(rfp_id, &filename, &bytes).await?;
        return Ok(Json(file.into()));
    }

    Err(ApiError::invalid_request("multipart field 'file' is required"))
}

pub async fn list_files(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
) -> ApiResult<Json<Vec<FileResponse>>> {
    let files = state.store().list_files(rfp_id)?;
    Ok(Json(files.into_iter().map(FileResponse::from).collect()))
}

pub async fn save_vendor_analysis(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
    Body(req): Body<SaveVendorAnalysisRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state.engine.save_vendor_analysis(rfp_id, &req.as_text())?;
    Ok(Json(MessageResponse::new("Análise dos vendors salva com sucesso")))
}

pub async fn set_chosen_vendor(
    State(state): State<AppState>,
    Id(rfp_id): Id<RfpId>,
    Body(req): Body<SetVendorRequest>,
) -> ApiResult<Json<RfpResponse>> {
    let rfp = state
        .engine
        .select_vendor(rfp_id, req.fabricante_escolhido_id)?;
    Ok(Json(rfp.into()))
}

pub async fn list_vendors(State(state): State<AppState>) -> Json<Vec<Vendor>> {
    Json(state.store().list_vendors())
}
