//! Configuration module
//!
//! Upload configuration is read from the environment (after loading `.env`), the
//! same way the rest of the stack is configured.

use std::env;

use crate::constants::{
    DEFAULT_APP_URL, DEFAULT_ATTACHMENT_FIELD, DEFAULT_DIRECT_UPLOAD_PATH,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_PREVIEW_MAX_BYTES,
};

/// Credentials forwarded with every request to the application.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    /// `Authorization: Bearer {token}`; takes precedence over the CSRF pair
    pub api_token: Option<String>,
    /// `X-CSRF-Token: {token}`
    pub csrf_token: Option<String>,
    /// Raw `Cookie` header value carrying the session
    pub session_cookie: Option<String>,
}

#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub app_url: String,
    pub direct_upload_path: String,
    pub attachment_field: String,
    pub credentials: Credentials,
    pub http_timeout_secs: u64,
    pub preview_max_bytes: u64,
    pub environment: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            app_url: DEFAULT_APP_URL.to_string(),
            direct_upload_path: DEFAULT_DIRECT_UPLOAD_PATH.to_string(),
            attachment_field: DEFAULT_ATTACHMENT_FIELD.to_string(),
            credentials: Credentials::default(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            preview_max_bytes: DEFAULT_PREVIEW_MAX_BYTES,
            environment: "development".to_string(),
        }
    }
}

impl UploadConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let app_url = env::var("LISTING_APP_URL")
            .or_else(|_| env::var("APP_URL"))
            .unwrap_or_else(|_| DEFAULT_APP_URL.to_string());

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let config = Self {
            app_url: app_url.trim_end_matches('/').to_string(),
            direct_upload_path: env::var("DIRECT_UPLOAD_PATH")
                .unwrap_or_else(|_| DEFAULT_DIRECT_UPLOAD_PATH.to_string()),
            attachment_field: env::var("ATTACHMENT_FIELD")
                .unwrap_or_else(|_| DEFAULT_ATTACHMENT_FIELD.to_string()),
            credentials: Credentials {
                api_token: non_empty_var("API_TOKEN"),
                csrf_token: non_empty_var("CSRF_TOKEN"),
                session_cookie: non_empty_var("SESSION_COOKIE"),
            },
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_HTTP_TIMEOUT_SECS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a valid number"))?,
            preview_max_bytes: env::var("PREVIEW_MAX_BYTES")
                .unwrap_or_else(|_| DEFAULT_PREVIEW_MAX_BYTES.to_string())
                .parse()
                .unwrap_or(DEFAULT_PREVIEW_MAX_BYTES),
            environment,
        };

        tracing::debug!(
            app_url = %config.app_url,
            direct_upload_path = %config.direct_upload_path,
            attachment_field = %config.attachment_field,
            environment = %config.environment,
            "Loaded upload configuration"
        );

        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.app_url.starts_with("http://") && !self.app_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "LISTING_APP_URL must start with http:// or https://"
            ));
        }

        if self.is_production() && self.app_url.starts_with("http://") {
            return Err(anyhow::anyhow!(
                "LISTING_APP_URL must use https:// in production"
            ));
        }

        if !self.direct_upload_path.starts_with('/') && !self.direct_upload_path.starts_with("http")
        {
            return Err(anyhow::anyhow!(
                "DIRECT_UPLOAD_PATH must be an absolute path or URL"
            ));
        }

        if self.attachment_field.trim().is_empty() {
            return Err(anyhow::anyhow!("ATTACHMENT_FIELD cannot be empty"));
        }

        if self.http_timeout_secs == 0 {
            return Err(anyhow::anyhow!("HTTP_TIMEOUT_SECS must be greater than 0"));
        }

        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
