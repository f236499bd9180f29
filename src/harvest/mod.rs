pub mod page;
pub mod types;

pub use page::ApiClient;
pub use types::PullRequestRecord;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::persist;
use types::{ProjectSummary, RepositorySummary};

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed page from {url}: {reason}")]
    MalformedPage { url: String, reason: String },

    #[error("Failed to read raw data {path}: {source}")]
    CacheRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write raw data {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid raw data JSON: {0}")]
    CacheParse(#[from] serde_json::Error),
}

/// Anything that can produce the full collection of merged pull requests.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Short label for logs (e.g., "api", "cache").
    fn name(&self) -> &str;

    async fn records(&self) -> Result<Vec<PullRequestRecord>, HarvestError>;
}

/// Walks projects → repositories → merged pull requests on the live API.
pub struct ApiHarvester {
    client: ApiClient,
    endpoint: String,
}

impl ApiHarvester {
    /// `endpoint` must end with a slash; resource paths are appended to it.
    pub fn new(client: ApiClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn harvest(&self) -> Result<Vec<PullRequestRecord>, HarvestError> {
        let mut records = Vec::new();

        let projects = self
            .client
            .paginate::<ProjectSummary>(format!("{}projects", self.endpoint), &[])
            .collect_values()
            .await?;
        info!(projects = projects.len(), "listed projects");

        for project in &projects {
            let repos_url = format!("{}projects/{}/repos", self.endpoint, project.key);
            let repos = self
                .client
                .paginate::<RepositorySummary>(repos_url.as_str(), &[])
                .collect_values()
                .await?;
            debug!(project = %project.key, repos = repos.len(), "listed repositories");

            for repo in &repos {
                let prs_url = format!("{}/{}/pull-requests", repos_url, repo.slug);
                let mut pages = self
                    .client
                    .paginate::<PullRequestRecord>(prs_url, &[("state", "Merged")]);
                let before = records.len();
                while let Some(page) = pages.next_page().await? {
                    records.extend(page.values);
                }
                debug!(
                    project = %project.key,
                    repo = %repo.slug,
                    pull_requests = records.len() - before,
                    "collected merged pull requests"
                );
            }
        }

        info!(pull_requests = records.len(), "harvest complete");
        Ok(records)
    }
}

#[async_trait]
impl RecordSource for ApiHarvester {
    fn name(&self) -> &str {
        "api"
    }

    async fn records(&self) -> Result<Vec<PullRequestRecord>, HarvestError> {
        self.harvest().await
    }
}

/// Previously harvested records read back from a raw JSON file.
pub struct CachedRecords {
    path: PathBuf,
}

impl CachedRecords {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordSource for CachedRecords {
    fn name(&self) -> &str {
        "cache"
    }

    async fn records(&self) -> Result<Vec<PullRequestRecord>, HarvestError> {
        load_raw(&self.path)
    }
}

/// Persist harvested records as a JSON array, replacing any existing file.
#[instrument(skip(records), fields(records = records.len(), path = %path.display()))]
pub fn save_raw(records: &[PullRequestRecord], path: &Path) -> Result<(), HarvestError> {
    let json = serde_json::to_vec_pretty(records)?;
    persist::write_replacing(path, &json).map_err(|source| HarvestError::CacheWrite {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("wrote raw data");
    Ok(())
}

pub fn load_raw(path: &Path) -> Result<Vec<PullRequestRecord>, HarvestError> {
    let contents = std::fs::read(path).map_err(|source| HarvestError::CacheRead {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<PullRequestRecord> = serde_json::from_slice(&contents)?;
    debug!(path = %path.display(), records = records.len(), "loaded raw data");
    Ok(records)
}
