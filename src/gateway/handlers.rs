use super::error::{GatewayError, GatewayResult};
use super::models::{
    AssetUploadResponse, AssetsUploadResponse, BackupRequest, HealthResponse, MessageResponse,
    QueryRequest, ReadQuery, SyncRequest,
};
use super::query::{apply_query, filter_by_user};
use super::state::GatewayState;
use crate::core::time::iso_string;
use crate::core::{Record, VaultError};
use crate::storage::{MonthlyActivityLog, StoreStats};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use chrono::Utc;
use tracing::{info, warn};

pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: iso_string(&Utc::now()),
    })
}

pub async fn backup_record(
    State(state): State<GatewayState>,
    Path(collection): Path<String>,
    payload: Result<Json<BackupRequest>, JsonRejection>,
) -> GatewayResult<Json<MessageResponse>> {
    let Json(request) = payload?;
    let mutation = request.into_mutation()?;

    let receipt = state.store.apply_mutation(&collection, mutation).await?;

    Ok(Json(MessageResponse::ok(format!(
        "{} backed up for {}/{}",
        receipt.action, collection, receipt.id
    ))))
}

pub async fn sync_collection(
    State(state): State<GatewayState>,
    Path(collection): Path<String>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> GatewayResult<Json<MessageResponse>> {
    let Json(request) = payload?;
    let count = state.store.replace_snapshot(&collection, request.data).await?;

    Ok(Json(MessageResponse::ok(format!(
        "Synced {count} records to {collection}"
    ))))
}

pub async fn upload_asset(
    State(state): State<GatewayState>,
    Path((collection, record_id)): Path<(String, String)>,
    multipart: Multipart,
) -> GatewayResult<Json<AssetUploadResponse>> {
    let mut files = read_files(multipart, &state, 1).await?;
    let Some(file) = files.pop() else {
        return Err(GatewayError::Input("No file uploaded".to_string()));
    };

    let asset = state
        .store
        .store_asset(
            &collection,
            &record_id,
            &file.bytes,
            &file.original_name,
            &file.mime_type,
        )
        .await?;

    Ok(Json(AssetUploadResponse {
        success: true,
        filename: asset.saved_as,
        path: asset.path,
    }))
}

pub async fn upload_assets(
    State(state): State<GatewayState>,
    Path((collection, record_id)): Path<(String, String)>,
    multipart: Multipart,
) -> GatewayResult<Json<AssetsUploadResponse>> {
    let files = read_files(multipart, &state, state.limits.max_files).await?;
    if files.is_empty() {
        return Err(GatewayError::Input("No files uploaded".to_string()));
    }

    let mut stored = Vec::with_capacity(files.len());
    for file in files {
        let asset = state
            .store
            .store_asset(
                &collection,
                &record_id,
                &file.bytes,
                &file.original_name,
                &file.mime_type,
            )
            .await?;
        stored.push(asset);
    }

    info!(
        collection = %collection,
        record_id = %record_id,
        count = stored.len(),
        "asset batch stored"
    );
    Ok(Json(AssetsUploadResponse {
        success: true,
        count: stored.len(),
        files: stored,
    }))
}

pub async fn read_collection(
    State(state): State<GatewayState>,
    Path(collection): Path<String>,
    Query(query): Query<ReadQuery>,
) -> GatewayResult<Json<Vec<Record>>> {
    let records = state.store.read_snapshot(&collection).await?;
    let records = match query.user_id.as_deref() {
        Some(user_id) if !user_id.is_empty() => filter_by_user(records, user_id),
        _ => records,
    };
    Ok(Json(records))
}

pub async fn read_record(
    State(state): State<GatewayState>,
    Path((collection, id)): Path<(String, String)>,
) -> GatewayResult<Json<Record>> {
    let record = state
        .store
        .read_by_id(&collection, &id)
        .await?
        .ok_or_else(|| VaultError::not_found(collection, id))?;
    Ok(Json(record))
}

pub async fn query_collection(
    State(state): State<GatewayState>,
    Path(collection): Path<String>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> GatewayResult<Json<Vec<Record>>> {
    let Json(query) = payload?;
    let records = state.store.read_snapshot(&collection).await?;
    Ok(Json(apply_query(records, &query)))
}

pub async fn monthly_history(
    State(state): State<GatewayState>,
    Path((collection, month)): Path<(String, String)>,
) -> GatewayResult<Json<MonthlyActivityLog>> {
    let log = state.store.read_monthly_log(&collection, &month).await?;
    Ok(Json(log))
}

pub async fn store_stats(
    State(state): State<GatewayState>,
) -> GatewayResult<Json<StoreStats>> {
    Ok(Json(state.store.stats().await?))
}

struct UploadedFile {
    original_name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

/// Drains the multipart body, keeping fields that carry a file name.
/// Nothing is written until every file passed the limits.
async fn read_files(
    mut multipart: Multipart,
    state: &GatewayState,
    max_files: usize,
) -> GatewayResult<Vec<UploadedFile>> {
    let mut files = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        // stop reading as soon as the limit is crossed
        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if bytes.len() + chunk.len() > state.limits.max_file_bytes {
                warn!(
                    file = %original_name,
                    received = bytes.len() + chunk.len(),
                    limit = state.limits.max_file_bytes,
                    "upload exceeds size limit"
                );
                return Err(GatewayError::PayloadTooLarge(format!(
                    "File '{}' exceeds the {} byte upload limit",
                    original_name, state.limits.max_file_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        files.push(UploadedFile {
            original_name,
            mime_type,
            bytes,
        });

        if files.len() > max_files {
            return Err(GatewayError::Input(format!(
                "Too many files: at most {max_files} per upload"
            )));
        }
    }

    Ok(files)
}
