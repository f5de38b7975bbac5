use axum::{
    extract::{Extension, State},
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{project, subscription};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::plan::PlanInfo;
use crate::routes::upload::{plan_for, storage_used};
use crate::utils::format::format_file_size;

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubscriptionResponse {
    pub plan: PlanInfo,
    pub subscription_id: Option<Uuid>,
    pub billing_period: Option<String>,
    pub current_period_end: Option<chrono::NaiveDateTime>,
    pub pending_downgrade: Option<serde_json::Value>,
}

#[utoipa::path(
    get,
    path = "/subscription",
    responses(
        (status = 200, description = "The caller's subscription with derived plan state", body = SubscriptionResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn get_subscription(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let sub = subscription::Entity::find()
        .filter(subscription::Column::UserId.eq(user.id))
        .one(&db)
        .await?;

    let plan = PlanInfo::derive(sub.as_ref(), chrono::Utc::now().naive_utc());

    Ok(Json(SubscriptionResponse {
        plan,
        subscription_id: sub.as_ref().map(|s| s.id),
        billing_period: sub.as_ref().map(|s| s.billing_period.clone()),
        current_period_end: sub.as_ref().map(|s| s.current_period_end),
        pending_downgrade: sub.and_then(|s| s.pending_downgrade),
    }))
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct DowngradeRequest {
    pub subscription_id: Uuid,
    pub new_storage_gb: f64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DowngradeResponse {
    pub success: bool,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/subscriptions/downgrade",
    request_body = DowngradeRequest,
    responses(
        (status = 200, description = "Downgrade scheduled for the next billing cycle", body = DowngradeResponse),
        (status = 401, description = "Unauthenticated"),
        (status = 404, description = "Not the caller's subscription"),
        (status = 500, description = "Database error")
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn downgrade_subscription(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<DowngradeRequest>,
) -> Result<Json<DowngradeResponse>, AppError> {
    let sub = subscription::Entity::find_by_id(payload.subscription_id)
        .filter(subscription::Column::UserId.eq(user.id))
        .one(&db)
        .await?
        .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

    if payload.new_storage_gb <= 0.0 || payload.new_storage_gb >= sub.storage_gb {
        return Err(AppError::Validation(
            "Downgrade target must be smaller than the current storage allowance".to_string(),
        ));
    }

    // Never applied immediately; the billing-cycle job reconciles it at
    // the period boundary.
    let scheduled_for = sub.current_period_end;
    let mut active = sub.into_active_model();
    active.pending_downgrade = Set(Some(serde_json::json!({
        "new_storage_gb": payload.new_storage_gb,
        "scheduled_for": scheduled_for,
    })));
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(&db).await?;

    Ok(Json(DowngradeResponse {
        success: true,
        message: format!(
            "Your plan will change to {} GB at the end of the current billing period",
            payload.new_storage_gb
        ),
    }))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UsageResponse {
    pub storage_used_bytes: i64,
    pub storage_used_display: String,
    pub storage_limit_bytes: i64,
    pub storage_limit_display: String,
    pub storage_remaining_bytes: i64,
    pub project_count: u64,
    pub max_projects: Option<u32>,
    pub max_upload_bytes: i64,
}

#[utoipa::path(
    get,
    path = "/usage",
    responses(
        (status = 200, description = "Aggregated usage against the caller's plan limits", body = UsageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn get_usage(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UsageResponse>, AppError> {
    let plan = plan_for(&db, user.id).await?;
    let used = storage_used(&db, user.id).await?;

    let project_count = project::Entity::find()
        .filter(project::Column::EditorId.eq(user.id))
        .filter(project::Column::DeletedAt.is_null())
        .count(&db)
        .await?;

    Ok(Json(UsageResponse {
        storage_used_bytes: used,
        storage_used_display: format_file_size(used),
        storage_limit_bytes: plan.limits.storage_bytes,
        storage_limit_display: format_file_size(plan.limits.storage_bytes),
        storage_remaining_bytes: (plan.limits.storage_bytes - used).max(0),
        project_count,
        max_projects: plan.limits.max_projects,
        max_upload_bytes: plan.limits.max_upload_bytes,
    }))
}
