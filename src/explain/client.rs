//! HTTP client for the external text-generation collaborator

use std::time::Duration;

use async_trait::async_trait;

use crate::explain::{compose_prompt, heuristic_explanation};
use crate::traits::MatchExplainer;
use crate::types::{BankTransaction, Invoice};

/// Endpoint used when `AI_API_URL` is not set
pub const DEFAULT_EXPLAIN_ENDPOINT: &str = "https://text.pollinations.ai/";

/// Collaborator calls are abandoned after this long
pub const EXPLAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Explainer backed by an HTTP text-generation endpoint
///
/// The prompt is appended to the base URL as a path segment and fetched
/// with a bounded timeout. Every failure mode — client construction, URL
/// assembly, network, non-success status, body read — degrades to the
/// heuristic template; nothing propagates to the caller.
pub struct HttpExplainer {
    base_url: String,
    client: Option<reqwest::Client>,
}

impl HttpExplainer {
    /// Create an explainer targeting `base_url`
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(EXPLAIN_TIMEOUT)
            .build()
            .ok();
        if client.is_none() {
            tracing::warn!("failed to build HTTP client; explanations will use the heuristic fallback");
        }
        Self { base_url, client }
    }

    /// Create an explainer from the `AI_API_URL` environment variable
    pub fn from_env() -> Self {
        let base_url = std::env::var("AI_API_URL")
            .unwrap_or_else(|_| DEFAULT_EXPLAIN_ENDPOINT.to_string());
        Self::new(base_url)
    }

    async fn request(&self, prompt: &str) -> Result<String, String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| "HTTP client unavailable".to_string())?;

        let url = reqwest::Url::parse(&self.base_url)
            .and_then(|base| base.join(prompt))
            .map_err(|e| format!("bad collaborator URL: {e}"))?;

        let response = client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("collaborator returned status {status}"));
        }

        let text = response.text().await.map_err(|e| e.to_string())?;
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl MatchExplainer for HttpExplainer {
    async fn explain(&self, invoice: &Invoice, transaction: &BankTransaction) -> String {
        let prompt = compose_prompt(invoice, transaction);
        match self.request(&prompt).await {
            Ok(text) => text,
            Err(reason) => {
                tracing::warn!(%reason, "explanation collaborator failed, using heuristic fallback");
                heuristic_explanation(invoice, transaction)
            }
        }
    }
}
