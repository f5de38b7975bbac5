//! Plan tiers, subscription state derivations, and upload quota checks.

use chrono::NaiveDateTime;
use serde::Serialize;
use utoipa::ToSchema;

use crate::entities::subscription;
use crate::utils::format::format_file_size;

const GB: f64 = 1024.0 * 1024.0 * 1024.0;
const MB: i64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Lite,
    Pro,
}

impl PlanTier {
    pub fn from_plan_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "pro" => PlanTier::Pro,
            "lite" => PlanTier::Lite,
            _ => PlanTier::Free,
        }
    }
}

/// Effective quota limits. `None` means unlimited.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PlanLimits {
    pub max_projects: Option<u32>,
    pub storage_bytes: i64,
    pub max_members_per_project: Option<u32>,
    pub max_upload_bytes: i64,
}

impl PlanLimits {
    /// Defaults applied when the user has no subscription row.
    pub fn free() -> Self {
        Self {
            max_projects: Some(2),
            storage_bytes: (0.5 * GB) as i64,
            max_members_per_project: Some(2),
            max_upload_bytes: 2 * MB,
        }
    }
}

/// Everything the dashboard needs to know about a subscription, derived
/// in one place from the raw row.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlanInfo {
    pub tier: PlanTier,
    pub display_name: String,
    pub is_free_plan: bool,
    pub is_pro_plan: bool,
    pub is_active_plan: bool,
    pub is_cancelled: bool,
    pub is_expired: bool,
    pub days_until_expiry: i64,
    pub limits: PlanLimits,
}

impl PlanInfo {
    pub fn derive(sub: Option<&subscription::Model>, now: NaiveDateTime) -> Self {
        let Some(sub) = sub else {
            return Self::free();
        };

        let tier = PlanTier::from_plan_name(&sub.plan_name);
        if tier == PlanTier::Free {
            return Self::free();
        }

        let is_cancelled = sub.status == "cancelled";
        let is_expired = sub.status == "expired" || now >= sub.current_period_end;
        let is_active_plan = matches!(sub.status.as_str(), "active" | "trialing" | "past_due")
            || (is_cancelled && now < sub.current_period_end);
        let days_until_expiry = (sub.current_period_end - now).num_days().max(0);

        let base_name = match tier {
            PlanTier::Pro => "Pro",
            PlanTier::Lite => "Lite",
            PlanTier::Free => "Free",
        };
        let display_name = if is_expired {
            format!("{} (Expired)", base_name)
        } else if is_cancelled {
            format!("{} (Cancelled)", base_name)
        } else {
            base_name.to_string()
        };

        let limits = if is_active_plan {
            PlanLimits {
                max_projects: None,
                storage_bytes: (sub.storage_gb * GB) as i64,
                max_members_per_project: None,
                max_upload_bytes: sub.max_upload_size_mb * MB,
            }
        } else {
            // Lapsed subscriptions fall back to free quotas.
            PlanLimits::free()
        };

        Self {
            tier,
            display_name,
            is_free_plan: false,
            is_pro_plan: tier == PlanTier::Pro,
            is_active_plan,
            is_cancelled,
            is_expired,
            days_until_expiry,
            limits,
        }
    }

    fn free() -> Self {
        Self {
            tier: PlanTier::Free,
            display_name: "Free".to_string(),
            is_free_plan: true,
            is_pro_plan: false,
            is_active_plan: true,
            is_cancelled: false,
            is_expired: false,
            days_until_expiry: 0,
            limits: PlanLimits::free(),
        }
    }
}

/// Verdict of the upload validator: a boolean plus the reason string the
/// dashboard shows on the disabled upload control.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UploadCheck {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl UploadCheck {
    pub fn ok() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn blocked(reason: String) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }

    /// Checks a prospective upload batch against the per-file size limit
    /// and the remaining storage quota.
    pub fn evaluate(batch: &[(String, i64)], used_bytes: i64, limits: &PlanLimits) -> Self {
        for (name, size) in batch {
            if *size > limits.max_upload_bytes {
                return Self::blocked(format!(
                    "\"{}\" is {}, over your {} per-file limit",
                    name,
                    format_file_size(*size),
                    format_file_size(limits.max_upload_bytes)
                ));
            }
        }

        let batch_total: i64 = batch.iter().map(|(_, size)| size).sum();
        let remaining = limits.storage_bytes - used_bytes;
        if batch_total > remaining {
            return Self::blocked(format!(
                "Not enough storage left: this upload needs {} but only {} remains",
                format_file_size(batch_total),
                format_file_size(remaining.max(0))
            ));
        }

        Self::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn sub(plan: &str, status: &str, period_end_in_days: i64) -> subscription::Model {
        let now = Utc::now().naive_utc();
        subscription::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan_id: format!("{}-monthly", plan),
            plan_name: plan.to_string(),
            status: status.to_string(),
            storage_gb: 100.0,
            max_upload_size_mb: 2048,
            billing_period: "monthly".to_string(),
            current_period_start: now - Duration::days(10),
            current_period_end: now + Duration::days(period_end_in_days),
            pending_downgrade: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn no_subscription_means_free_defaults() {
        let info = PlanInfo::derive(None, Utc::now().naive_utc());
        assert!(info.is_free_plan);
        assert_eq!(info.limits.max_projects, Some(2));
        assert_eq!(info.limits.storage_bytes, 512 * 1024 * 1024);
        assert_eq!(info.limits.max_members_per_project, Some(2));
        assert_eq!(info.limits.max_upload_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn active_pro_plan_derivations() {
        let s = sub("pro", "active", 20);
        let info = PlanInfo::derive(Some(&s), Utc::now().naive_utc());
        assert!(info.is_pro_plan);
        assert!(info.is_active_plan);
        assert!(!info.is_expired);
        assert_eq!(info.display_name, "Pro");
        assert_eq!(info.days_until_expiry, 19); // partial day truncates
        assert_eq!(info.limits.max_projects, None);
        assert_eq!(info.limits.storage_bytes, 100 * 1024 * 1024 * 1024);
    }

    #[test]
    fn cancelled_within_period_is_still_active() {
        let s = sub("pro", "cancelled", 5);
        let info = PlanInfo::derive(Some(&s), Utc::now().naive_utc());
        assert!(info.is_cancelled);
        assert!(info.is_active_plan);
        assert_eq!(info.display_name, "Pro (Cancelled)");
    }

    #[test]
    fn expired_plan_falls_back_to_free_quotas() {
        let s = sub("lite", "cancelled", -1);
        let info = PlanInfo::derive(Some(&s), Utc::now().naive_utc());
        assert!(info.is_expired);
        assert!(!info.is_active_plan);
        assert_eq!(info.display_name, "Lite (Expired)");
        assert_eq!(info.days_until_expiry, 0);
        assert_eq!(info.limits, PlanLimits::free());
    }

    #[test]
    fn oversized_file_is_blocked_with_reason() {
        let limits = PlanLimits::free();
        let batch = vec![("edit-v2.mp4".to_string(), 3 * 1024 * 1024)];
        let check = UploadCheck::evaluate(&batch, 0, &limits);
        assert!(!check.allowed);
        let reason = check.reason.unwrap();
        assert!(reason.contains("edit-v2.mp4"));
        assert!(reason.contains("2 MB per-file limit"));
    }

    #[test]
    fn batch_exceeding_remaining_storage_is_blocked() {
        let limits = PlanLimits::free();
        let used = 512 * 1024 * 1024 - 1024;
        let batch = vec![
            ("a.png".to_string(), 1024),
            ("b.png".to_string(), 1024),
        ];
        let check = UploadCheck::evaluate(&batch, used, &limits);
        assert!(!check.allowed);
        assert!(check.reason.unwrap().starts_with("Not enough storage left"));
    }

    #[test]
    fn fitting_batch_is_allowed() {
        let limits = PlanLimits::free();
        let batch = vec![("a.png".to_string(), 1024 * 1024)];
        assert_eq!(UploadCheck::evaluate(&batch, 0, &limits), UploadCheck::ok());
    }
}
