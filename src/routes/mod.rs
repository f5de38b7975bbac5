pub mod auth;
pub mod folders;
pub mod home;
pub mod media;
pub mod notifications;
pub mod projects;
pub mod review_links;
pub mod review_public;
pub mod subscriptions;
pub mod tracks;
pub mod upload;
pub mod versions;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::auth::auth_middleware;

#[derive(OpenApi)]
#[openapi(
    paths(
        // General
        home::root,
        // Authentication
        auth::register,
        auth::login,
        auth::refresh,
        auth::logout,
        auth::me,
        // Projects and membership
        projects::create_project,
        projects::list_projects,
        projects::get_project,
        projects::update_project,
        projects::delete_project,
        projects::list_members,
        projects::add_member,
        projects::leave_project,
        projects::set_member_notifications,
        // Media and version chains
        media::list_media,
        media::get_media,
        media::update_media_status,
        media::delete_media,
        media::set_display_order,
        folders::create_folder,
        folders::list_folders,
        folders::delete_folder,
        folders::move_media_to_folder,
        versions::create_version,
        versions::delete_version,
        versions::reorder_versions,
        // Uploads and quotas
        upload::upload_media,
        upload::check_upload,
        // Review links
        review_links::create_review_link,
        review_links::create_quick_link,
        review_links::list_review_links,
        review_links::update_review_link,
        review_links::toggle_review_link,
        review_links::delete_review_link,
        review_public::get_review,
        review_public::unlock_review,
        // Delivery tracks
        tracks::create_track,
        tracks::list_tracks,
        tracks::add_step,
        tracks::edit_step,
        tracks::complete_step,
        tracks::revert_step,
        tracks::move_step,
        tracks::remove_step,
        // Notifications
        notifications::get_preferences,
        notifications::update_preference,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read,
        // Subscriptions
        subscriptions::get_subscription,
        subscriptions::downgrade_subscription,
        subscriptions::get_usage,
    ),
    components(
        schemas(
            // Auth
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RefreshRequest,
            auth::RefreshResponse,
            auth::LogoutRequest,
            auth::UserProfile,
            crate::entities::user::Role,
            // Projects
            projects::CreateProjectRequest,
            projects::UpdateProjectRequest,
            projects::ProjectResponse,
            projects::MemberResponse,
            projects::AddMemberRequest,
            projects::MemberNotificationsRequest,
            crate::entities::project_member::MemberRole,
            // Media
            media::MediaResponse,
            media::UpdateMediaStatusRequest,
            media::DisplayOrderRequest,
            folders::CreateFolderRequest,
            folders::FolderResponse,
            folders::MoveMediaRequest,
            versions::CreateVersionRequest,
            versions::ReorderVersionsRequest,
            // Uploads
            upload::UploadCheckRequest,
            upload::UploadCheckResponse,
            crate::models::plan::PlanTier,
            crate::models::plan::PlanLimits,
            crate::models::plan::PlanInfo,
            crate::models::plan::UploadCheck,
            // Review links
            review_links::CreateReviewLinkRequest,
            review_links::UpdateReviewLinkRequest,
            review_links::ReviewLinkResponse,
            review_public::PublicReviewResponse,
            review_public::UnlockRequest,
            // Tracks
            tracks::TrackResponse,
            tracks::StepResponse,
            tracks::AddStepRequest,
            tracks::EditStepForm,
            tracks::CompleteStepForm,
            tracks::MoveStepRequest,
            crate::entities::track::ClientDecision,
            crate::models::steps::StepStatus,
            crate::models::steps::TrackStatus,
            // Notifications
            notifications::PreferenceResponse,
            notifications::UpdatePreferenceRequest,
            notifications::ActivityResponse,
            crate::entities::notification_preference::Category,
            crate::entities::notification_preference::Delivery,
            // Subscriptions
            subscriptions::SubscriptionResponse,
            subscriptions::DowngradeRequest,
            subscriptions::DowngradeResponse,
            subscriptions::UsageResponse,
        )
    ),
    tags(
        (name = "General", description = "General API information"),
        (name = "Authentication", description = "Login, registration, token refresh, and logout"),
        (name = "Projects", description = "Project and membership management"),
        (name = "Media", description = "Project media and version chains"),
        (name = "Folders", description = "Media grouping within a project"),
        (name = "Upload", description = "Media uploads and quota checks"),
        (name = "Review Links", description = "Shareable client review links"),
        (name = "Public Review", description = "Unauthenticated review link resolution"),
        (name = "Tracks", description = "Delivery track and step workflows"),
        (name = "Notifications", description = "Activity feed and notification preferences"),
        (name = "Subscriptions", description = "Plans, usage, and billing state")
    ),
    info(
        title = "ReviewFlow API",
        version = "0.1.0",
        description = "A Rust/Axum backend for media review and delivery workflows: versioned media chains, shareable review links, delivery tracks, and plan-based upload quotas",
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer,
                ),
            ),
        );
    }
}

pub fn create_routes(db: DatabaseConnection) -> Router {
    // Swagger UI (stateless)
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/projects", post(projects::create_project))
        .route("/projects", get(projects::list_projects))
        .route(
            "/projects/{project_id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/projects/{project_id}/members",
            get(projects::list_members).post(projects::add_member),
        )
        .route("/projects/{project_id}/leave", post(projects::leave_project))
        .route(
            "/projects/{project_id}/members/me/notifications",
            patch(projects::set_member_notifications),
        )
        .route("/projects/{project_id}/media", get(media::list_media))
        .route(
            "/projects/{project_id}/media/order",
            put(media::set_display_order),
        )
        .route(
            "/projects/{project_id}/media/{media_id}",
            get(media::get_media).delete(media::delete_media),
        )
        .route(
            "/projects/{project_id}/folders",
            post(folders::create_folder).get(folders::list_folders),
        )
        .route(
            "/projects/{project_id}/folders/{folder_id}",
            delete(folders::delete_folder),
        )
        .route(
            "/projects/{project_id}/media/{media_id}/folder",
            patch(folders::move_media_to_folder),
        )
        .route(
            "/projects/{project_id}/media/{media_id}/status",
            patch(media::update_media_status),
        )
        .route(
            "/projects/{project_id}/media/{media_id}/versions",
            post(versions::create_version),
        )
        .route(
            "/projects/{project_id}/media/{media_id}/versions/order",
            put(versions::reorder_versions),
        )
        .route(
            "/projects/{project_id}/media/{media_id}/versions/{version_id}",
            delete(versions::delete_version),
        )
        .route("/projects/{project_id}/upload", post(upload::upload_media))
        .route(
            "/projects/{project_id}/upload/check",
            post(upload::check_upload),
        )
        .route(
            "/projects/{project_id}/review-links",
            post(review_links::create_review_link).get(review_links::list_review_links),
        )
        .route(
            "/projects/{project_id}/review-links/{link_id}",
            patch(review_links::update_review_link).delete(review_links::delete_review_link),
        )
        .route(
            "/projects/{project_id}/review-links/{link_id}/toggle",
            post(review_links::toggle_review_link),
        )
        .route(
            "/projects/{project_id}/media/{media_id}/quick-link",
            post(review_links::create_quick_link),
        )
        .route(
            "/projects/{project_id}/tracks",
            post(tracks::create_track).get(tracks::list_tracks),
        )
        .route("/tracks/{track_id}/steps", post(tracks::add_step))
        .route("/tracks/{track_id}/steps/order", put(tracks::move_step))
        .route(
            "/tracks/{track_id}/steps/{step_id}",
            patch(tracks::edit_step).delete(tracks::remove_step),
        )
        .route(
            "/tracks/{track_id}/steps/{step_id}/complete",
            post(tracks::complete_step),
        )
        .route(
            "/tracks/{track_id}/steps/{step_id}/revert",
            post(tracks::revert_step),
        )
        .route(
            "/notifications/preferences",
            get(notifications::get_preferences).put(notifications::update_preference),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{id}/read", patch(notifications::mark_read))
        .route("/subscription", get(subscriptions::get_subscription))
        .route(
            "/subscriptions/downgrade",
            post(subscriptions::downgrade_subscription),
        )
        .route("/usage", get(subscriptions::get_usage))
        .layer(middleware::from_fn(auth_middleware));

    // Public routes (no auth required) and merge all together
    let app_routes = Router::new()
        .route("/", get(home::root))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/review/{token}", get(review_public::get_review))
        .route("/review/{token}/unlock", post(review_public::unlock_review))
        .merge(protected_routes)
        .with_state(db);

    Router::new().merge(swagger_router).merge(app_routes)
}
