//! HTTP access to the monitoring backend's list endpoints.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use shared::{
    domain::Resource,
    error::{ApiErrorBody, FetchError},
    protocol::{PageQuery, RawPage},
};
use tracing::debug;
use url::Url;

use crate::{config::ClientSettings, fetcher::PageFetcher};

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let parsed =
            Url::parse(base_url).with_context(|| format!("invalid api base url '{base_url}'"))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            anyhow::bail!("api base url must use http or https: {base_url}");
        }
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: parsed,
            token: None,
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let client = Self::new(
            &settings.api_base_url,
            Duration::from_secs(settings.request_timeout_secs),
        )?;
        Ok(match &settings.token {
            Some(token) => client.with_token(token.clone()),
            None => client,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends the resource path to the base URL, keeping any path prefix the base carries.
    pub fn list_url(&self, resource: Resource) -> Url {
        let mut url = self.base_url.clone();
        let path = format!("{}{}", url.path().trim_end_matches('/'), resource.list_path());
        url.set_path(&path);
        url.set_query(None);
        url
    }

    pub async fn get_page(&self, resource: Resource, query: &PageQuery) -> Result<RawPage, FetchError> {
        let url = self.list_url(resource);
        debug!(%resource, page = query.page, page_size = query.page_size, "api: GET {url}");

        let mut request = self.http.get(url.clone()).query(&query.to_query_pairs());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%resource, status = status.as_u16(), "api: request rejected");
            return Err(status_error(status, &body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| FetchError::Decode(err.to_string()))?;
        debug!(%resource, "api: response received");
        RawPage::from_json(body).map_err(|err| FetchError::Decode(err.to_string()))
    }
}

fn status_error(status: StatusCode, body: &str) -> FetchError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });

    if status == StatusCode::UNAUTHORIZED {
        FetchError::Unauthorized(message)
    } else {
        FetchError::Status {
            status: status.as_u16(),
            message,
        }
    }
}

/// Serves one resource's list endpoint as a [`PageFetcher`].
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Arc<ApiClient>,
    resource: Resource,
}

impl HttpPageFetcher {
    pub fn new(client: Arc<ApiClient>, resource: Resource) -> Self {
        Self { client, resource }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, query: PageQuery) -> Result<RawPage, FetchError> {
        self.client.get_page(self.resource, &query).await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
