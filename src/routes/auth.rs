use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::get_config;
use crate::entities::refresh_token::{self, Entity as RefreshToken};
use crate::entities::user::{self, Entity as User, Role};
use crate::error::AppError;
use crate::middleware::auth::{AuthUser, Claims};

const ACCESS_TOKEN_TTL_SECS: usize = 900;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    email: String,
    display_name: String,
    password: String,
    role: Option<Role>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    access_token: String,
    refresh_token: String,
    expires_in: usize,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RefreshResponse {
    access_token: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LogoutRequest {
    refresh_token: String,
}

fn generate_refresh_token() -> String {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill(&mut random_bytes);
    general_purpose::STANDARD.encode(random_bytes)
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn issue_access_token(user: &user::Model) -> Result<String, AppError> {
    let expiration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + ACCESS_TOKEN_TTL_SECS;

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        exp: expiration,
        role: user.role.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(get_config().jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token encode error: {}", e)))
}

async fn issue_refresh_token(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<String, AppError> {
    let token = generate_refresh_token();
    refresh_token::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        token_hash: Set(hash_token(&token)),
        expires_at: Set(chrono::Utc::now().naive_utc() + chrono::Duration::days(30)),
        created_at: Set(chrono::Utc::now().naive_utc()),
        revoked: Set(false),
    }
    .insert(db)
    .await?;
    Ok(token)
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = LoginResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    let email = payload.email.trim().to_ascii_lowercase();
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if payload.password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let existing = User::find()
        .filter(user::Column::Email.eq(&email))
        .one(&db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalServerError(format!("Hash error: {}", e)))?
        .to_string();

    let now = chrono::Utc::now().naive_utc();
    let created = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        display_name: Set(payload.display_name.trim().to_string()),
        password_hash: Set(password_hash),
        role: Set(payload.role.unwrap_or(Role::Editor)),
        created_at: Set(now),
    }
    .insert(&db)
    .await?;

    tracing::info!("new account registered: {}", created.email);

    let access_token = issue_access_token(&created)?;
    let refresh = issue_refresh_token(&db, created.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            access_token,
            refresh_token: refresh,
            expires_in: ACCESS_TOKEN_TTL_SECS,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = payload.email.trim().to_ascii_lowercase();
    let user = User::find()
        .filter(user::Column::Email.eq(&email))
        .one(&db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Hash parse error: {}", e)))?;
    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let access_token = issue_access_token(&user)?;
    let refresh = issue_refresh_token(&db, user.id).await?;

    tracing::info!("login | user={}", user.email);

    Ok(Json(LoginResponse {
        access_token,
        refresh_token: refresh,
        expires_in: ACCESS_TOKEN_TTL_SECS,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed successfully", body = RefreshResponse),
        (status = 401, description = "Invalid or expired refresh token")
    ),
    tag = "Authentication"
)]
pub async fn refresh(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let token_hash = hash_token(&payload.refresh_token);

    let token = RefreshToken::find()
        .filter(refresh_token::Column::TokenHash.eq(&token_hash))
        .one(&db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    if token.revoked {
        return Err(AppError::Unauthorized(
            "Session revoked. Please log in again.".to_string(),
        ));
    }
    if token.expires_at < chrono::Utc::now().naive_utc() {
        return Err(AppError::Unauthorized(
            "Refresh token expired. Please log in again.".to_string(),
        ));
    }

    let user = User::find_by_id(token.user_id)
        .one(&db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    let access_token = issue_access_token(&user)?;
    Ok(Json(RefreshResponse { access_token }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Logged out successfully"),
        (status = 404, description = "Refresh token not found")
    ),
    tag = "Authentication"
)]
pub async fn logout(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token_hash = hash_token(&payload.refresh_token);

    let token = RefreshToken::find()
        .filter(refresh_token::Column::TokenHash.eq(&token_hash))
        .one(&db)
        .await?
        .ok_or_else(|| AppError::NotFound("Refresh token not found".to_string()))?;

    let mut active = token.into_active_model();
    active.revoked = Set(true);
    active.update(&db).await?;

    Ok(Json(serde_json::json!({
        "message": "Logged out successfully"
    })))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserProfile {
    #[schema(value_type = String)]
    id: Uuid,
    email: String,
    display_name: String,
    role: Role,
    created_at: chrono::NaiveDateTime,
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The caller's profile", body = UserProfile),
        (status = 401, description = "Invalid or missing token")
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
pub async fn me(
    State(db): State<DatabaseConnection>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<UserProfile>, AppError> {
    let user = User::find_by_id(auth_user.id)
        .one(&db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    Ok(Json(UserProfile {
        id: user.id,
        email: user.email,
        display_name: user.display_name,
        role: user.role,
        created_at: user.created_at,
    }))
}
