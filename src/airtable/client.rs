//! Airtable REST client

use super::types::{ListRecordsRequest, RecordPage};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use async_trait::async_trait;
use futures::Stream;
use url::Url;

/// Production Airtable API root
pub const API_BASE_URL: &str = "https://api.airtable.com/v0";

/// Airtable's maximum (and our default) page size
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A source of paginated record listings.
///
/// The engine only ever pulls pages sequentially; implementations may retry
/// internally, but a page that still fails is fatal for the run.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch one page. `offset` is the continuation token from the previous
    /// page, or `None` for the first page.
    async fn fetch_page(
        &self,
        request: &ListRecordsRequest,
        offset: Option<&str>,
    ) -> Result<RecordPage>;
}

/// Client for the Airtable REST API
pub struct AirtableClient {
    http: HttpClient,
    api_base: String,
}

impl AirtableClient {
    /// Create a client authenticated with a personal access token
    pub fn new(token: impl Into<String>) -> Self {
        let config = HttpClientConfig::builder().bearer_token(token).build();
        Self {
            http: HttpClient::with_config(config),
            api_base: API_BASE_URL.to_string(),
        }
    }

    /// Create a client with a custom HTTP configuration
    pub fn with_config(config: HttpClientConfig) -> Self {
        Self {
            http: HttpClient::with_config(config),
            api_base: API_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root (tests, proxies)
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Validate credentials and table access by fetching a single record
    pub async fn check(&self, base_id: &str, table_name: &str) -> Result<()> {
        let request = ListRecordsRequest::new(base_id, table_name).with_page_size(1);
        self.fetch_page(&request, None).await.map(|_| ())
    }

    /// Build the listing URL for a request
    fn list_url(&self, request: &ListRecordsRequest) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)?;
        url.path_segments_mut()
            .map_err(|()| Error::fetch(format!("API base cannot hold a path: {}", self.api_base)))?
            .pop_if_empty()
            .push(&request.base_id)
            .push(&request.table_name);
        Ok(url)
    }
}

/// Turn a paged source into a lazy stream of pages.
///
/// Pages are fetched on demand as the stream is polled; the stream ends
/// after the first page without a continuation token. Fetch errors end the
/// stream with the error.
pub fn page_stream<'a>(
    source: &'a dyn RecordSource,
    request: &'a ListRecordsRequest,
) -> impl Stream<Item = Result<RecordPage>> + 'a {
    // State: Some(offset) = next page to fetch, None = finished.
    futures::stream::try_unfold(Some(None::<String>), move |state| async move {
        let Some(offset) = state else {
            return Ok(None);
        };
        let page = source.fetch_page(request, offset.as_deref()).await?;
        let next_state = page.offset.clone().map(Some);
        Ok(Some((page, next_state)))
    })
}

/// Query parameters for one page fetch
pub(crate) fn page_params(
    request: &ListRecordsRequest,
    offset: Option<&str>,
) -> Vec<(String, String)> {
    let mut params = Vec::new();
    params.push(("pageSize".to_string(), request.page_size.to_string()));
    if let Some(view) = &request.view {
        params.push(("view".to_string(), view.clone()));
    }
    if let Some(formula) = &request.filter_formula {
        params.push(("filterByFormula".to_string(), formula.clone()));
    }
    for field in &request.fields {
        params.push(("fields[]".to_string(), field.clone()));
    }
    if let Some(offset) = offset {
        params.push(("offset".to_string(), offset.to_string()));
    }
    params
}

#[async_trait]
impl RecordSource for AirtableClient {
    async fn fetch_page(
        &self,
        request: &ListRecordsRequest,
        offset: Option<&str>,
    ) -> Result<RecordPage> {
        let url = self.list_url(request)?;
        let mut req = RequestConfig::new();
        for (key, value) in page_params(request, offset) {
            req = req.query(key, value);
        }

        let response = self.http.get_with_config(url.as_str(), req).await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::fetch(format!("Failed to read response body: {e}")))?;
        let page: RecordPage = serde_json::from_str(&body)
            .map_err(|e| Error::fetch(format!("Unexpected listing response: {e}")))?;
        Ok(page)
    }
}
