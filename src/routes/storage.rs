//! File uploads into storage buckets

use crate::audit::AuditAction;
use crate::auth::Claims;
use crate::error::{validation_error, ApiResult, AppError};
use crate::models::SuccessResponse;
use crate::state::SharedState;
use crate::storage::{object_path, StoredObject};
use axum::{
    extract::{multipart::Field, Extension, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

/// A file read out of a multipart body
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub(crate) fn multipart_error(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(format!("Invalid multipart body: {}", e))
}

pub async fn read_upload(field: Field<'_>) -> ApiResult<Upload> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let bytes = field.bytes().await.map_err(multipart_error)?;
    if bytes.is_empty() {
        return Err(validation_error(format!("'{}' is empty", file_name)));
    }
    Ok(Upload {
        file_name,
        bytes: bytes.to_vec(),
    })
}

/// POST /api/storage/{bucket}
///
/// Every file part is stored under a generated object path.
pub async fn upload(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(bucket): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Vec<StoredObject>>>)> {
    let mut stored = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.file_name().is_none() {
            continue;
        }
        let upload = read_upload(field).await?;
        let object = state
            .storage
            .upload(&bucket, &object_path(&upload.file_name), &upload.bytes)
            .await?;
        state.audit.record(
            AuditAction::MediaUploaded,
            json!({ "bucket": object.bucket, "path": object.path, "size": object.size }),
            Some(&claims),
        );
        stored.push(object);
    }

    if stored.is_empty() {
        return Err(validation_error("No files in upload"));
    }
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            format!("{} files stored.", stored.len()),
            stored,
        )),
    ))
}
