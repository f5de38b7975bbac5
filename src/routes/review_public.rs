//! Public, unauthenticated resolution of review links.

use std::time::Duration;

use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use axum::{
    extract::{Path, State},
    Json,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{media, review_link};
use crate::error::AppError;
use crate::services::storage::StorageService;
use crate::utils::format::{format_file_size, format_status};

#[derive(Serialize, utoipa::ToSchema)]
pub struct PublicReviewResponse {
    pub title: String,
    pub media_id: Uuid,
    pub original_filename: String,
    pub mime_type: String,
    pub file_size_display: String,
    pub status_display: String,
    pub requires_password: bool,
    pub allow_download: bool,
    /// Presigned URL for the current version; present once unlocked.
    pub download_url: Option<String>,
}

async fn resolve_link(
    db: &DatabaseConnection,
    token: &str,
) -> Result<review_link::Model, AppError> {
    let link = review_link::Entity::find()
        .filter(review_link::Column::LinkToken.eq(token))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Review link not found".to_string()))?;

    if !link.is_active {
        return Err(AppError::NotFound("Review link not found".to_string()));
    }
    if let Some(expires_at) = link.expires_at {
        if expires_at < chrono::Utc::now().naive_utc() {
            return Err(AppError::Gone("This review link has expired".to_string()));
        }
    }
    Ok(link)
}

/// The version shown to the client: the chain's current row.
async fn current_version(
    db: &DatabaseConnection,
    root_id: Uuid,
) -> Result<media::Model, AppError> {
    let rows = media::Entity::find()
        .filter(
            sea_orm::Condition::any()
                .add(media::Column::Id.eq(root_id))
                .add(media::Column::ParentMediaId.eq(root_id)),
        )
        .all(db)
        .await?;
    rows.into_iter()
        .max_by_key(|m| m.version_number)
        .ok_or_else(|| AppError::NotFound("Media not found".to_string()))
}

async fn build_response(
    db: &DatabaseConnection,
    link: &review_link::Model,
    unlocked: bool,
) -> Result<PublicReviewResponse, AppError> {
    let current = current_version(db, link.media_id).await?;

    let download_url = if unlocked && link.allow_download {
        let storage = StorageService::new().await;
        Some(
            storage
                .get_presigned_url(&current.storage_key, Duration::from_secs(3600))
                .await?,
        )
    } else {
        None
    };

    Ok(PublicReviewResponse {
        title: link.title.clone(),
        media_id: link.media_id,
        original_filename: current.original_filename,
        mime_type: current.mime_type,
        file_size_display: format_file_size(current.file_size),
        status_display: format_status(&current.status),
        requires_password: link.password_hash.is_some(),
        allow_download: link.allow_download,
        download_url,
    })
}

#[utoipa::path(
    get,
    path = "/review/{token}",
    params(("token" = String, Path, description = "Public link token")),
    responses(
        (status = 200, description = "Review page payload; locked links omit the download URL", body = PublicReviewResponse),
        (status = 404, description = "Unknown or inactive link"),
        (status = 410, description = "Expired link")
    ),
    tag = "Public Review"
)]
pub async fn get_review(
    State(db): State<DatabaseConnection>,
    Path(token): Path<String>,
) -> Result<Json<PublicReviewResponse>, AppError> {
    let link = resolve_link(&db, &token).await?;
    let unlocked = link.password_hash.is_none();
    Ok(Json(build_response(&db, &link, unlocked).await?))
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UnlockRequest {
    pub password: String,
}

#[utoipa::path(
    post,
    path = "/review/{token}/unlock",
    params(("token" = String, Path, description = "Public link token")),
    request_body = UnlockRequest,
    responses(
        (status = 200, description = "Unlocked review payload", body = PublicReviewResponse),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "Unknown or inactive link")
    ),
    tag = "Public Review"
)]
pub async fn unlock_review(
    State(db): State<DatabaseConnection>,
    Path(token): Path<String>,
    Json(payload): Json<UnlockRequest>,
) -> Result<Json<PublicReviewResponse>, AppError> {
    let link = resolve_link(&db, &token).await?;

    if let Some(hash) = &link.password_hash {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::InternalServerError(format!("Bad password hash: {}", e)))?;
        Argon2::default()
            .verify_password(payload.password.as_bytes(), &parsed)
            .map_err(|_| AppError::Unauthorized("Incorrect password".to_string()))?;
    }

    Ok(Json(build_response(&db, &link, true).await?))
}
