use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::activity_notification::{self, Entity as ActivityNotification};
use crate::entities::notification_preference::{
    self, Category, Delivery, Entity as NotificationPreference,
};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::pagination::{PaginatedResponse, Pagination};

#[derive(Serialize, utoipa::ToSchema)]
pub struct PreferenceResponse {
    pub category: Category,
    pub enabled: bool,
    pub delivery: Delivery,
}

/// Every category is reported; unset ones fall back to enabled + both
/// channels, matching what the fan-out worker assumes.
#[utoipa::path(
    get,
    path = "/notifications/preferences",
    responses(
        (status = 200, description = "Per-category notification preferences", body = [PreferenceResponse])
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn get_preferences(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<PreferenceResponse>>, AppError> {
    let stored = NotificationPreference::find()
        .filter(notification_preference::Column::UserId.eq(user.id))
        .all(&db)
        .await?;

    let all = [Category::Comments, Category::Media, Category::StatusChange];
    let data = all
        .iter()
        .map(|&category| {
            match stored.iter().find(|p| p.category == category) {
                Some(p) => PreferenceResponse {
                    category,
                    enabled: p.enabled,
                    delivery: p.delivery,
                },
                None => PreferenceResponse {
                    category,
                    enabled: true,
                    delivery: Delivery::Both,
                },
            }
        })
        .collect();

    Ok(Json(data))
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdatePreferenceRequest {
    pub category: Category,
    pub enabled: bool,
    pub delivery: Delivery,
}

#[utoipa::path(
    put,
    path = "/notifications/preferences",
    request_body = UpdatePreferenceRequest,
    responses(
        (status = 200, description = "Preference upserted", body = PreferenceResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn update_preference(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdatePreferenceRequest>,
) -> Result<Json<PreferenceResponse>, AppError> {
    let existing = NotificationPreference::find()
        .filter(notification_preference::Column::UserId.eq(user.id))
        .filter(notification_preference::Column::Category.eq(payload.category))
        .one(&db)
        .await?;

    let saved = match existing {
        Some(pref) => {
            let mut active = pref.into_active_model();
            active.enabled = Set(payload.enabled);
            active.delivery = Set(payload.delivery);
            active.update(&db).await?
        }
        None => {
            notification_preference::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.id),
                category: Set(payload.category),
                enabled: Set(payload.enabled),
                delivery: Set(payload.delivery),
            }
            .insert(&db)
            .await?
        }
    };

    Ok(Json(PreferenceResponse {
        category: saved.category,
        enabled: saved.enabled,
        delivery: saved.delivery,
    }))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ActivityResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub actor_id: Uuid,
    pub category: String,
    pub title: String,
    pub body: String,
    pub media: serde_json::Value,
    pub is_read: bool,
    pub created_at: chrono::NaiveDateTime,
}

impl From<activity_notification::Model> for ActivityResponse {
    fn from(n: activity_notification::Model) -> Self {
        Self {
            id: n.id,
            project_id: n.project_id,
            actor_id: n.actor_id,
            category: n.category,
            title: n.title,
            body: n.body,
            media: n.media,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/notifications",
    params(Pagination),
    responses(
        (status = 200, description = "The caller's activity feed, newest first", body = PaginatedResponse<ActivityResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn list_notifications(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<ActivityResponse>>, AppError> {
    let total = ActivityNotification::find()
        .filter(activity_notification::Column::UserId.eq(user.id))
        .count(&db)
        .await?;

    let rows = ActivityNotification::find()
        .filter(activity_notification::Column::UserId.eq(user.id))
        .order_by_desc(activity_notification::Column::CreatedAt)
        .limit(pagination.limit())
        .offset(pagination.offset())
        .all(&db)
        .await?;

    Ok(Json(PaginatedResponse::new(
        rows.into_iter().map(ActivityResponse::from).collect(),
        total,
        pagination.page(),
        pagination.limit(),
    )))
}

#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    responses(
        (status = 200, description = "Number of unread activity items")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn unread_count(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    let count = ActivityNotification::find()
        .filter(activity_notification::Column::UserId.eq(user.id))
        .filter(activity_notification::Column::IsRead.eq(false))
        .count(&db)
        .await?;

    Ok(Json(serde_json::json!({ "unread": count })))
}

#[utoipa::path(
    patch,
    path = "/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read", body = ActivityResponse),
        (status = 404, description = "Not the caller's notification")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_read(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<ActivityResponse>, AppError> {
    let notification = ActivityNotification::find_by_id(notification_id)
        .filter(activity_notification::Column::UserId.eq(user.id))
        .one(&db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

    let mut active = notification.into_active_model();
    active.is_read = Set(true);
    let updated = active.update(&db).await?;

    Ok(Json(ActivityResponse::from(updated)))
}

#[utoipa::path(
    post,
    path = "/notifications/read-all",
    responses(
        (status = 200, description = "All notifications marked read")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_all_read(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = ActivityNotification::update_many()
        .col_expr(
            activity_notification::Column::IsRead,
            sea_orm::sea_query::Expr::value(true),
        )
        .filter(activity_notification::Column::UserId.eq(user.id))
        .filter(activity_notification::Column::IsRead.eq(false))
        .exec(&db)
        .await?;

    Ok(Json(serde_json::json!({
        "marked": result.rows_affected
    })))
}
