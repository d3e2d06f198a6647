/// Uploader-facing endpoints: photo ingestion, status and appeals
use crate::{
    assets::{in_user_quarantine, UPLOAD_PREFIX},
    auth::AuthContext,
    context::AppContext,
    error::{ModerationError, ModerationResult},
    ingest::{extract_metadata, Upload},
    moderation::models::{ImageRef, ModerationRecord, PhotoType},
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

/// Build upload routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/uploads", post(create_upload))
        .route("/api/uploads/:id", get(get_upload))
        .route("/api/uploads/:id/appeal", post(submit_appeal))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub photo_type: String,
    /// Set when the caller already quarantined the bytes
    pub storage_id: Option<String>,
    pub photo_url: Option<String>,
}

/// Accept raw image bytes and create the moderation record
async fn create_upload(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ModerationResult<(StatusCode, Json<ModerationRecord>)> {
    if body.is_empty() {
        return Err(ModerationError::Validation("body: image bytes are required".to_string()));
    }
    let photo_type = PhotoType::from_str(&query.photo_type)?;

    let storage_id = match query.storage_id {
        Some(storage_id) => {
            if !in_user_quarantine(&storage_id, &auth.user_id) {
                return Err(ModerationError::Validation(
                    "storageId: must point into the caller's quarantine area".to_string(),
                ));
            }
            storage_id
        }
        None => {
            let format = extract_metadata(&body).format;
            let storage_id = format!(
                "{}{}/{}.{}",
                UPLOAD_PREFIX,
                auth.user_id,
                uuid::Uuid::new_v4(),
                format
            );
            ctx.assets.put(&storage_id, &body).await?;
            storage_id
        }
    };
    let url = query
        .photo_url
        .unwrap_or_else(|| ctx.assets.public_url(&storage_id));

    let record = ctx
        .ingestion
        .ingest(Upload {
            user_id: auth.user_id,
            photo_type,
            image: ImageRef { url, storage_id },
            bytes: body.to_vec(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Uploaders see their own records; reviewers see any
async fn get_upload(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ModerationResult<Json<ModerationRecord>> {
    let record = ctx.moderation.get(&id).await?;
    if record.user_id != auth.user_id && !auth.scope.can_review() {
        // Same answer as a missing record, so ids cannot be enumerated
        return Err(ModerationError::NotFound(format!(
            "Moderation record {} not found",
            id
        )));
    }
    Ok(Json(record))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AppealRequest {
    #[validate(length(min = 1, max = 2000, message = "must be 1 to 2000 characters"))]
    pub reason: String,
}

async fn submit_appeal(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<AppealRequest>,
) -> ModerationResult<Json<ModerationRecord>> {
    req.validate()?;

    let record = ctx
        .moderation
        .submit_appeal(&id, &auth.user_id, &req.reason)
        .await?;
    Ok(Json(record))
}
