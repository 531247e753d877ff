//! Shared HTTP client for the listing application.
//!
//! Provides a minimal client with configurable auth (session CSRF token or
//! Bearer token), the direct-upload protocol (blob creation and the storage PUT),
//! and listing form submission. The upload orchestrator and the CLI use this
//! client directly.

pub mod checksum;
pub mod direct_upload;
pub mod form;

pub use checksum::compute_checksum;
pub use direct_upload::ProgressObserver;
pub use form::FormSubmission;

use anyhow::{Context, Result};
use listing_core::config::Credentials;
use listing_core::UploadConfig;
use reqwest::Client;
use std::time::Duration;

/// Authentication strategy for the application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Auth {
    /// No credentials (public endpoints, tests)
    None,
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `X-CSRF-Token: {token}` plus the session cookie it belongs to
    Session {
        csrf_token: String,
        cookie: Option<String>,
    },
}

impl Auth {
    pub fn from_credentials(credentials: &Credentials) -> Self {
        if let Some(token) = &credentials.api_token {
            return Auth::Bearer(token.clone());
        }
        match &credentials.csrf_token {
            Some(csrf_token) => Auth::Session {
                csrf_token: csrf_token.clone(),
                cookie: credentials.session_cookie.clone(),
            },
            None => Auth::None,
        }
    }
}

/// HTTP client for the listing application with configurable auth.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: String, auth: Auth, timeout: Duration) -> Result<Self> {
        // Redirects are surfaced to the caller: a Rails form save answers with 302.
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn from_config(config: &UploadConfig) -> Result<Self> {
        Self::new(
            config.app_url.clone(),
            Auth::from_credentials(&config.credentials),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    /// Create client from environment (see [`UploadConfig::from_env`]).
    pub fn from_env() -> Result<Self> {
        let config = UploadConfig::from_env()?;
        config.validate()?;
        Self::from_config(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a path against the base URL; absolute URLs are returned unchanged.
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::Session { csrf_token, cookie } => {
                let request = request.header("X-CSRF-Token", csrf_token.as_str());
                match cookie {
                    Some(cookie) => request.header("Cookie", cookie.as_str()),
                    None => request,
                }
            }
        }
    }
}
