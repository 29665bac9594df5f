//! Tally HTTP Client
//!
//! A simple, type-safe HTTP client for the Tally task API, used by the CLI.
//!
//! # Example
//!
//! ```no_run
//! use tally_client::TallyClient;
//! use tally_core::dto::task::CreateTask;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = TallyClient::new("http://localhost:8080");
//!
//!     let task = client.create_task(CreateTask { a: 5, b: 6 }).await?;
//!
//!     println!("Created task: {}", task.id);
//!     Ok(())
//! }
//! ```

pub mod error;
mod schedules;
mod tasks;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Tally API
///
/// Methods are grouped by resource:
/// - Tasks (create, get, list)
/// - Schedules (create, get, list, update, delete)
/// - Health
#[derive(Debug, Clone)]
pub struct TallyClient {
    /// Base URL of the server (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl TallyClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use tally_client::TallyClient;
    ///
    /// let client = TallyClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the server is up
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Check the status code of a response without a body
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}
