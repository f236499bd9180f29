use std::marker::PhantomData;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::types::Page;
use super::HarvestError;
use crate::config::Credentials;

/// HTTP client for the paged REST API. Carries the static basic-auth
/// credentials and the page size sent as `limit`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    credentials: Option<Credentials>,
    limit: u32,
}

impl ApiClient {
    pub fn new(
        credentials: Option<Credentials>,
        limit: u32,
        timeout: Duration,
    ) -> Result<Self, HarvestError> {
        let http = Client::builder()
            .user_agent("pr-lifetime")
            .timeout(timeout)
            .build()?;
        Ok(Self::with_client(http, credentials, limit))
    }

    pub fn with_client(http: Client, credentials: Option<Credentials>, limit: u32) -> Self {
        Self {
            http,
            credentials,
            limit,
        }
    }

    /// Start a paginated walk over `resource`, adding `query` to every request.
    pub fn paginate<T: DeserializeOwned>(
        &self,
        resource: impl Into<String>,
        query: &[(&str, &str)],
    ) -> Paginator<'_, T> {
        Paginator {
            client: self,
            resource: resource.into(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            cursor: Some(0),
            _values: PhantomData,
        }
    }

    #[instrument(skip(self, query), fields(limit = self.limit))]
    async fn fetch_page<T: DeserializeOwned>(
        &self,
        resource: &str,
        start: u64,
        query: &[(String, String)],
    ) -> Result<Page<T>, HarvestError> {
        let mut request = self
            .http
            .get(resource)
            .query(&[("limit", self.limit.to_string()), ("start", start.to_string())])
            .query(query);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.user, creds.password.as_deref());
        }

        let body = request.send().await?.error_for_status()?.text().await?;
        let page: Page<T> =
            serde_json::from_str(&body).map_err(|e| HarvestError::MalformedPage {
                url: resource.to_string(),
                reason: e.to_string(),
            })?;
        debug!(values = page.values.len(), is_last_page = ?page.is_last_page, "received page");
        Ok(page)
    }
}

/// Lazy walk over the pages of one resource, following the
/// `isLastPage`/`nextPageStart` cursor. Nothing is requested until
/// `next_page` is awaited.
pub struct Paginator<'a, T> {
    client: &'a ApiClient,
    resource: String,
    query: Vec<(String, String)>,
    /// Start offset of the next request; None once the last page was seen.
    cursor: Option<u64>,
    _values: PhantomData<T>,
}

impl<T: DeserializeOwned> Paginator<'_, T> {
    /// Fetch the next page, or None when the previous page was the last one.
    pub async fn next_page(&mut self) -> Result<Option<Page<T>>, HarvestError> {
        let Some(start) = self.cursor else {
            return Ok(None);
        };

        let page = self
            .client
            .fetch_page::<T>(&self.resource, start, &self.query)
            .await?;

        let is_last = page.is_last_page.ok_or_else(|| HarvestError::MalformedPage {
            url: self.resource.clone(),
            reason: "missing isLastPage".to_string(),
        })?;

        self.cursor = if is_last {
            None
        } else {
            let next = page
                .next_page_start
                .ok_or_else(|| HarvestError::MalformedPage {
                    url: self.resource.clone(),
                    reason: "isLastPage is false but nextPageStart is missing".to_string(),
                })?;
            Some(next)
        };

        Ok(Some(page))
    }

    /// Drain every page and return all values in page order.
    pub async fn collect_values(mut self) -> Result<Vec<T>, HarvestError> {
        let mut values = Vec::new();
        while let Some(page) = self.next_page().await? {
            values.extend(page.values);
        }
        Ok(values)
    }
}
