//! Sanitize and backup endpoints.
//!
//! Uploads are written to a per-request directory under the upload root so
//! concurrent uploads with the same file name never collide; the directory is
//! removed once the pipeline returns.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Query, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cleanslate_core::{FailureKind, ProcessingResult, RemoteTarget, Stage};
use cleanslate_pipeline::DispatchRequest;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::http::constants::UPLOAD_FIELD;
use crate::http::errors::ApiError;
use crate::models::{BackupQuery, BackupResponse, SanitizeQuery, SanitizeResponse};
use crate::state::ApiState;

pub(crate) async fn sanitize(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<SanitizeQuery>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let remote = parse_remote(query.remote.as_deref())?;
    let staging = state.upload_dir.join(Uuid::new_v4().to_string());
    let upload = receive_upload(&mut multipart, &staging).await;
    let file_name = upload
        .as_ref()
        .ok()
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let outcome = match upload {
        Ok(path) => {
            let request = DispatchRequest {
                dry_run: query.dry_run,
                confirm: query.confirm,
                remote,
            };
            state
                .dispatcher
                .sanitize(&path, request)
                .await
                .map_err(ApiError::from)
        }
        Err(err) => Err(err),
    };
    cleanup(&staging).await;

    let result = outcome?;
    let status = status_for(&result);
    info!(
        run_id = %result.run_id,
        success = result.success,
        state = result.state.as_str(),
        "sanitize request finished"
    );
    Ok((status, Json(SanitizeResponse::from_upload(result, &file_name))).into_response())
}

pub(crate) async fn backup(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<BackupQuery>,
) -> Result<Json<BackupResponse>, ApiError> {
    let remote = parse_remote(query.remote.as_deref())?;
    let receipt = state
        .dispatcher
        .backup(Path::new(&query.file_path), remote)
        .await?;
    Ok(Json(BackupResponse::from(receipt)))
}

fn parse_remote(raw: Option<&str>) -> Result<Option<RemoteTarget>, ApiError> {
    raw.filter(|value| !value.trim().is_empty())
        .map(str::parse::<RemoteTarget>)
        .transpose()
        .map_err(|err| ApiError::from(cleanslate_pipeline::PipelineError::from(err)))
}

/// HTTP status for a pipeline result.
fn status_for(result: &ProcessingResult) -> StatusCode {
    let Some(failure) = &result.failure else {
        return StatusCode::OK;
    };
    match (failure.stage, failure.kind) {
        (_, FailureKind::Aborted) | (Stage::Backup, FailureKind::Transient) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        (Stage::Backup, _) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn receive_upload(multipart: &mut Multipart, staging: &Path) -> Result<PathBuf, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(format!("invalid multipart body: {err}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!(field = field.name(), "ignoring multipart field");
            continue;
        }
        let file_name = upload_file_name(field.file_name())?;
        tokio::fs::create_dir_all(staging).await.map_err(|err| {
            warn!(error = %err, dir = %staging.display(), "failed to create upload directory");
            ApiError::internal("failed to store upload")
        })?;
        let path = staging.join(file_name);
        write_field(field, &path).await?;
        return Ok(path);
    }
    Err(ApiError::bad_request(format!(
        "multipart field '{UPLOAD_FIELD}' is required"
    )))
}

/// Keep only the final path component of a client-supplied name.
fn upload_file_name(raw: Option<&str>) -> Result<String, ApiError> {
    raw.map(|name| name.rsplit(['/', '\\']).next().unwrap_or_default().trim())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(ToString::to_string)
        .ok_or_else(|| ApiError::bad_request("uploaded file must have a file name"))
}

async fn write_field(mut field: Field<'_>, path: &Path) -> Result<(), ApiError> {
    let mut file = tokio::fs::File::create(path).await.map_err(|err| {
        warn!(error = %err, path = %path.display(), "failed to create upload file");
        ApiError::internal("failed to store upload")
    })?;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|err| ApiError::bad_request(format!("upload interrupted: {err}")))?
    {
        file.write_all(&chunk).await.map_err(|err| {
            warn!(error = %err, path = %path.display(), "failed to write upload");
            ApiError::internal("failed to store upload")
        })?;
    }
    file.flush()
        .await
        .map_err(|_| ApiError::internal("failed to store upload"))?;
    Ok(())
}

async fn cleanup(staging: &Path) {
    match tokio::fs::remove_dir_all(staging).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(error = %err, dir = %staging.display(), "failed to remove upload directory"),
    }
}
