use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub public_origin: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub aws_region: String,
    pub s3_bucket_name: String,
    pub s3_endpoint: Option<String>,
    pub resend_api_key: Option<String>,
    pub email_from: String,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        let public_origin =
            env::var("PUBLIC_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let aws_access_key_id =
            env::var("AWS_ACCESS_KEY_ID").expect("AWS_ACCESS_KEY_ID must be set");
        let aws_secret_access_key =
            env::var("AWS_SECRET_ACCESS_KEY").expect("AWS_SECRET_ACCESS_KEY must be set");
        let aws_region = env::var("AWS_REGION").unwrap_or_else(|_| "auto".to_string());
        let s3_bucket_name = env::var("S3_BUCKET_NAME").expect("S3_BUCKET_NAME must be set");
        // R2 and other S3-compatible providers need a custom endpoint.
        let s3_endpoint = env::var("S3_ENDPOINT").ok();
        let resend_api_key = env::var("RESEND_API_KEY").ok();
        let email_from =
            env::var("EMAIL_FROM").unwrap_or_else(|_| "notifications@reviewflow.app".to_string());

        Self {
            database_url,
            jwt_secret,
            public_origin,
            aws_access_key_id,
            aws_secret_access_key,
            aws_region,
            s3_bucket_name,
            s3_endpoint,
            resend_api_key,
            email_from,
        }
    }
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}
