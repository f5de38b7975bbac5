use serde_json::json;

use crate::config::get_config;
use crate::error::AppError;
use crate::utils::format::format_status;

/// Thin client for a Resend-style transactional email API.
#[derive(Clone)]
pub struct EmailService {
    client: reqwest::Client,
}

/// Structured payload for the "media activity" template.
pub struct MediaActivityEmail<'a> {
    pub recipient: &'a str,
    pub actor_name: &'a str,
    pub project_name: &'a str,
    /// media_uploaded, media_deleted, status_changed
    pub activity: &'a str,
    pub media: &'a [String],
    pub recipient_is_owner: bool,
}

impl EmailService {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub async fn send_media_activity(&self, email: MediaActivityEmail<'_>) -> Result<(), AppError> {
        let config = get_config();
        let Some(api_key) = &config.resend_api_key else {
            tracing::warn!(
                "RESEND_API_KEY not configured, skipping email to {}",
                email.recipient
            );
            return Ok(());
        };

        let subject = format!(
            "{} in {}",
            format_status(email.activity),
            email.project_name
        );
        let media_list = email
            .media
            .iter()
            .map(|m| format!("<li>{}</li>", m))
            .collect::<String>();
        let ownership_note = if email.recipient_is_owner {
            "<p>You own this project.</p>"
        } else {
            ""
        };
        let html = format!(
            "<p><strong>{}</strong>: {} by {}</p><ul>{}</ul>{}",
            email.project_name,
            format_status(email.activity),
            email.actor_name,
            media_list,
            ownership_note
        );

        let response = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(api_key)
            .json(&json!({
                "from": config.email_from,
                "to": [email.recipient],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .map_err(|e| AppError::DependencyFailed(format!("Email send failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::DependencyFailed(format!(
                "Email provider returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}
