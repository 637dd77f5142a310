pub mod dto;

use std::env;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::EnrolmentSnapshot;

pub use dto::{GroupItem, MasterCourseItem, ScheduledCourseItem};

#[derive(Clone, Debug)]
pub struct VleConfig {
    /// Base URL of the VLE, e.g. `https://vle.example.ac.uk`.
    pub vle_root: String,
    /// Path of the sync endpoint, appended to `vle_root`.
    pub sync_path: String,
    /// Absolute URL of the enrolments endpoint, if the read side is used.
    pub enrolments_url: Option<String>,
}

impl VleConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let vle_root = env::var("VLE_ROOT")
            .map_err(|_| AppError::Config("VLE_ROOT is not set".to_string()))?;
        let sync_path = env::var("VLE_SYNC_PATH")
            .map_err(|_| AppError::Config("VLE_SYNC_PATH is not set".to_string()))?;
        let enrolments_url = env::var("VLE_ENROLMENTS_URL").ok();

        Ok(Self {
            vle_root,
            sync_path,
            enrolments_url,
        })
    }

    pub fn sync_url(&self) -> String {
        format!("{}{}", self.vle_root, self.sync_path)
    }
}

#[async_trait]
pub trait VleClient: Send + Sync {
    /// Fetches the full course snapshot. Any failure is an [`AppError::Upstream`].
    async fn fetch_snapshot(&self) -> Result<Vec<MasterCourseItem>, AppError>;

    /// Scheduled courses and completions for one user. A refusal from the VLE
    /// is an empty snapshot, not an error.
    async fn fetch_enrolments(&self, username: &str, role: &str) -> Result<EnrolmentSnapshot, AppError>;
}

pub struct VleHttpClient {
    client: Client,
    config: VleConfig,
}

impl VleHttpClient {
    pub fn new(config: VleConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl VleClient for VleHttpClient {
    async fn fetch_snapshot(&self) -> Result<Vec<MasterCourseItem>, AppError> {
        let url = self.config.sync_url();
        debug!("fetching sync snapshot from {}", url);

        let response = self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to reach VLE: {}", e)))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read VLE response: {}", e)))?;

        if status != StatusCode::OK {
            let message = serde_json::from_str::<dto::ErrorBody>(&body_text)
                .ok()
                .and_then(|body| body.error_message)
                .unwrap_or_else(|| format!("VLE returned {}", status));
            warn!("sync snapshot request failed: {} {}", status, message);
            return Err(AppError::Upstream(message));
        }

        serde_json::from_str::<Vec<MasterCourseItem>>(&body_text)
            .map_err(|e| AppError::Upstream(format!("Failed to parse VLE snapshot: {}", e)))
    }

    async fn fetch_enrolments(&self, username: &str, role: &str) -> Result<EnrolmentSnapshot, AppError> {
        let Some(url) = &self.config.enrolments_url else {
            return Ok(EnrolmentSnapshot::default());
        };

        let response = self.client
            .get(url)
            .query(&[("username", username), ("role", role)])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to reach VLE: {}", e)))?;

        if response.status() != StatusCode::OK {
            warn!("enrolments request for {} returned {}", username, response.status());
            return Ok(EnrolmentSnapshot::default());
        }

        response
            .json::<EnrolmentSnapshot>()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse VLE enrolments: {}", e)))
    }
}

/// A VLE with no courses and no enrolments.
pub struct NoopVleClient;

#[async_trait]
impl VleClient for NoopVleClient {
    async fn fetch_snapshot(&self) -> Result<Vec<MasterCourseItem>, AppError> {
        Ok(Vec::new())
    }

    async fn fetch_enrolments(&self, _username: &str, _role: &str) -> Result<EnrolmentSnapshot, AppError> {
        Ok(EnrolmentSnapshot::default())
    }
}
