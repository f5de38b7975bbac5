use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: String,
    pub plan_name: String, // free, lite, pro
    pub status: String,    // active, trialing, past_due, cancelled, expired
    pub storage_gb: f64,
    pub max_upload_size_mb: i64,
    pub billing_period: String, // monthly, yearly
    pub current_period_start: DateTime,
    pub current_period_end: DateTime,
    /// Downgrades are never applied immediately; they wait here for the
    /// billing-cycle reconciliation job. Shape:
    /// {"new_storage_gb": f64, "scheduled_for": timestamp}
    pub pending_downgrade: Option<Json>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
