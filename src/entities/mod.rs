pub mod activity_notification;
pub mod media;
pub mod notification_job;
pub mod notification_preference;
pub mod project;
pub mod project_folder;
pub mod project_member;
pub mod refresh_token;
pub mod review_link;
pub mod subscription;
pub mod track;
pub mod user;
