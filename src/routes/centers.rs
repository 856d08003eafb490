//! Center media endpoints (the centers themselves use the generic manager)

use crate::auth::Claims;
use crate::error::{not_found_error, validation_error, ApiResult};
use crate::models::{CenterMedia, MediaType, MessageResponse, NewCenterMedia, SuccessResponse};
use crate::routes::storage::{multipart_error, read_upload, Upload};
use crate::state::SharedState;
use crate::storage::object_path;
use axum::{
    extract::{Extension, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::path::Path as FsPath;
use uuid::Uuid;

/// Bucket holding center photos and videos
pub const MEDIA_BUCKET: &str = "center-media";

/// GET /api/manage/centers/{id}/media
pub async fn list_media(
    State(state): State<SharedState>,
    Path(center_id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<Vec<CenterMedia>>>> {
    state.centers.get(center_id).await?;
    let media = state.center_media.for_center(center_id).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} media items.", media.len()),
        media,
    )))
}

/// POST /api/manage/centers/{id}/media
///
/// Attach media that is already hosted somewhere.
pub async fn add_media(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(center_id): Path<Uuid>,
    Json(mut input): Json<NewCenterMedia>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<CenterMedia>>)> {
    state.centers.get(center_id).await?;
    input.center_id = center_id;
    let media = state.center_media.create(input, Some(&claims)).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Media added.", media)),
    ))
}

/// POST /api/manage/centers/{id}/media/upload
///
/// Multipart body with a `file` part and an optional `caption` part.
pub async fn upload_media(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(center_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SuccessResponse<CenterMedia>>)> {
    state.centers.get(center_id).await?;

    let mut upload: Option<Upload> = None;
    let mut caption = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => upload = Some(read_upload(field).await?),
            Some("caption") => {
                caption = Some(field.text().await.map_err(multipart_error)?)
            }
            _ => {}
        }
    }
    let upload = upload.ok_or_else(|| validation_error("Missing 'file' part"))?;

    let path = format!("centers/{}/{}", center_id, object_path(&upload.file_name));
    let stored = state.storage.upload(MEDIA_BUCKET, &path, &upload.bytes).await?;
    let extension = FsPath::new(&upload.file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    let media = state
        .center_media
        .create(
            NewCenterMedia {
                center_id,
                media_type: MediaType::from_extension(extension),
                url: stored.public_url,
                caption: caption.filter(|c| !c.trim().is_empty()),
            },
            Some(&claims),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Media uploaded.", media)),
    ))
}

/// DELETE /api/manage/centers/{id}/media/{media_id}
pub async fn delete_media(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((center_id, media_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    let media = state.center_media.get(media_id).await?;
    if media.center_id != center_id {
        return Err(not_found_error(format!("Media {} not found", media_id)));
    }
    state.center_media.delete(media_id, Some(&claims)).await?;
    Ok(Json(MessageResponse::new("Media deleted successfully.")))
}
