//! Listing form submission.
//!
//! The server reads the repeated attachment fields in document order, so the
//! pairs are sent exactly in the order given.

use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, LOCATION};
use serde::Serialize;

use crate::ApiClient;

/// Result of posting the listing form.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FormSubmission {
    pub status: u16,
    /// Redirect target when the record was saved
    pub location: Option<String>,
}

impl FormSubmission {
    /// A save answers with a redirect; a validation failure re-renders the form.
    pub fn is_saved(&self) -> bool {
        (300..400).contains(&self.status) && self.location.is_some()
    }
}

impl ApiClient {
    /// POST the form as `application/x-www-form-urlencoded`.
    #[tracing::instrument(skip(self, pairs), fields(field_count = pairs.len()))]
    pub async fn submit_form(&self, path: &str, pairs: &[(String, String)]) -> Result<FormSubmission> {
        let url = self.build_url(path);
        let request = self
            .client()
            .post(&url)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .form(pairs);
        let request = self.apply_auth(request);

        let response = request.send().await.context("Failed to submit form")?;

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if status.is_server_error() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Form submission failed with status {}: {}",
                status,
                error_text
            ));
        }

        let submission = FormSubmission {
            status: status.as_u16(),
            location,
        };
        tracing::info!(
            status = submission.status,
            location = ?submission.location,
            saved = submission.is_saved(),
            "Listing form submitted"
        );
        Ok(submission)
    }
}
