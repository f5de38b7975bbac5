//! Notification outbox worker.
//!
//! Mutating handlers enqueue a `notification_jobs` row in the same
//! transaction as their write; this worker polls the table (FOR UPDATE
//! SKIP LOCKED) and fans each job out to the project's members according
//! to their per-category preferences. Delivery is at-least-once: a job
//! that dies mid-flight is reset to pending on the next worker start.

use std::time::Duration;

use sea_orm::sea_query::{LockBehavior, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use uuid::Uuid;

use crate::entities::notification_preference::{self, Category, Delivery};
use crate::entities::{activity_notification, notification_job, project, project_member, user};
use crate::error::AppError;
use crate::services::email::{EmailService, MediaActivityEmail};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub project_id: Uuid,
    pub actor_id: Uuid,
    pub category: Category,
    /// media_uploaded, media_deleted, status_changed
    pub activity: String,
    pub title: String,
    pub body: String,
    /// Filenames of the media involved.
    pub media: Vec<String>,
}

/// Inserts an outbox row. Call inside the transaction of the mutation
/// being announced.
pub async fn enqueue<C: ConnectionTrait>(
    db: &C,
    payload: &NotificationPayload,
) -> Result<(), AppError> {
    let job = notification_job::ActiveModel {
        id: Set(Uuid::new_v4()),
        status: Set("pending".to_string()),
        payload: Set(serde_json::to_value(payload)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?),
        created_at: Set(chrono::Utc::now().naive_utc()),
        updated_at: Set(chrono::Utc::now().naive_utc()),
    };
    job.insert(db).await?;
    Ok(())
}

pub struct NotificationWorker {
    db: DatabaseConnection,
    email: EmailService,
}

impl NotificationWorker {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            email: EmailService::new(),
        }
    }

    pub async fn run(&self) {
        tracing::info!("notification worker started");

        if let Err(e) = self.recover_stuck_jobs().await {
            tracing::error!("failed to recover stuck notification jobs: {}", e);
        }

        loop {
            if let Err(e) = self.process_next_job().await {
                tracing::error!("notification worker error: {}", e);
            }
            sleep(Duration::from_secs(5)).await;
        }
    }

    async fn recover_stuck_jobs(&self) -> Result<(), String> {
        // Safe with a single worker; multiple workers would need a
        // heartbeat/timeout check instead.
        let stmt = sea_orm::Statement::from_string(
            self.db.get_database_backend(),
            "UPDATE notification_jobs SET status = 'pending' WHERE status = 'processing'"
                .to_owned(),
        );

        let result = self.db.execute(stmt).await.map_err(|e| e.to_string())?;
        if result.rows_affected() > 0 {
            tracing::info!(
                "recovered {} stuck notification jobs",
                result.rows_affected()
            );
        }
        Ok(())
    }

    async fn process_next_job(&self) -> Result<(), String> {
        let txn = self.db.begin().await.map_err(|e| e.to_string())?;

        let job_opt = notification_job::Entity::find()
            .filter(notification_job::Column::Status.eq("pending"))
            .order_by_asc(notification_job::Column::CreatedAt)
            .limit(1)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .one(&txn)
            .await
            .map_err(|e| e.to_string())?;

        let job_model = match job_opt {
            Some(j) => j,
            None => return Ok(()),
        };

        let mut job_active: notification_job::ActiveModel = job_model.clone().into();
        job_active.status = Set("processing".to_string());
        job_active.updated_at = Set(chrono::Utc::now().naive_utc());
        let job_model = job_active.update(&txn).await.map_err(|e| e.to_string())?;

        // Commit to release the lock before doing slow email I/O.
        txn.commit().await.map_err(|e| e.to_string())?;

        match self.handle_job(&job_model).await {
            Ok(_) => {
                let mut job_active: notification_job::ActiveModel = job_model.into();
                job_active.status = Set("completed".to_string());
                job_active.updated_at = Set(chrono::Utc::now().naive_utc());
                job_active.update(&self.db).await.map_err(|e| e.to_string())?;
            }
            Err(e) => {
                tracing::error!("notification job failed: {}", e);
                let payload = job_model.payload.clone();
                let mut job_active: notification_job::ActiveModel = job_model.into();
                job_active.status = Set("failed".to_string());
                job_active.payload = Set(serde_json::json!({
                    "error": e,
                    "original_payload": payload
                }));
                job_active.updated_at = Set(chrono::Utc::now().naive_utc());
                job_active.update(&self.db).await.map_err(|e| e.to_string())?;
            }
        }

        Ok(())
    }

    async fn handle_job(&self, job: &notification_job::Model) -> Result<(), String> {
        let payload: NotificationPayload =
            serde_json::from_value(job.payload.clone()).map_err(|e| e.to_string())?;

        let project = project::Entity::find_by_id(payload.project_id)
            .one(&self.db)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("Project no longer exists")?;

        let actor_name = user::Entity::find_by_id(payload.actor_id)
            .one(&self.db)
            .await
            .map_err(|e| e.to_string())?
            .map(|u| u.display_name)
            .unwrap_or_else(|| "Someone".to_string());

        let members = project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project.id))
            .filter(project_member::Column::UserId.ne(payload.actor_id))
            .all(&self.db)
            .await
            .map_err(|e| e.to_string())?;

        for member in members {
            // Project-level toggle first, then per-category preference.
            if !member.notifications_enabled {
                continue;
            }

            let pref = match self.load_preference(member.user_id, payload.category).await {
                Ok(p) => p,
                Err(e) => {
                    // One bad preference row must not block the rest.
                    tracing::warn!(
                        "skipping recipient {}: preference lookup failed: {}",
                        member.user_id,
                        e
                    );
                    continue;
                }
            };
            let (enabled, delivery) = pref;
            if !enabled {
                continue;
            }

            if matches!(delivery, Delivery::Activity | Delivery::Both) {
                let activity = activity_notification::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(member.user_id),
                    project_id: Set(project.id),
                    actor_id: Set(payload.actor_id),
                    category: Set(serde_json::to_value(payload.category)
                        .ok()
                        .and_then(|v| v.as_str().map(str::to_string))
                        .unwrap_or_else(|| "media".to_string())),
                    title: Set(payload.title.clone()),
                    body: Set(payload.body.clone()),
                    media: Set(serde_json::json!(payload.media)),
                    is_read: Set(false),
                    created_at: Set(chrono::Utc::now().naive_utc()),
                };
                if let Err(e) = activity.insert(&self.db).await {
                    tracing::warn!(
                        "failed to insert activity row for {}: {}",
                        member.user_id,
                        e
                    );
                }
            }

            if matches!(delivery, Delivery::Email | Delivery::Both) {
                let recipient = match user::Entity::find_by_id(member.user_id)
                    .one(&self.db)
                    .await
                {
                    Ok(Some(u)) => u,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!("skipping recipient {}: {}", member.user_id, e);
                        continue;
                    }
                };

                let email = MediaActivityEmail {
                    recipient: &recipient.email,
                    actor_name: &actor_name,
                    project_name: &project.name,
                    activity: &payload.activity,
                    media: &payload.media,
                    recipient_is_owner: member.role
                        == crate::entities::project_member::MemberRole::Owner,
                };
                if let Err(e) = self.email.send_media_activity(email).await {
                    // Email failures are non-fatal for the job.
                    tracing::warn!("email to {} failed: {:?}", recipient.email, e);
                }
            }
        }

        Ok(())
    }

    /// Missing rows default to enabled + both channels.
    async fn load_preference(
        &self,
        user_id: Uuid,
        category: Category,
    ) -> Result<(bool, Delivery), sea_orm::DbErr> {
        let pref = notification_preference::Entity::find()
            .filter(notification_preference::Column::UserId.eq(user_id))
            .filter(notification_preference::Column::Category.eq(category))
            .one(&self.db)
            .await?;

        Ok(pref
            .map(|p| (p.enabled, p.delivery))
            .unwrap_or((true, Delivery::Both)))
    }
}
