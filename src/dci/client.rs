use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use url::Url;

use crate::auth::Credentials;
use crate::error::{DciLensError, Result};
use crate::pagination::{PageRequest, RawPage};

const MAX_RETRIES: u32 = 5;
const RETRY_DELAY_SECONDS: u64 = 2;

pub const DEFAULT_BASE_URL: &str = "https://api.distributed-ci.io";

pub struct DciClient {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
    retry_delay: Duration,
}

impl DciClient {
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("DCILens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DciLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        // A trailing slash keeps `join` from dropping the last path segment.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| DciLensError::Config(format!("Invalid base URL: {e}")))?;

        Ok(Self {
            client,
            base_url,
            credentials,
            retry_delay: Duration::from_secs(RETRY_DELAY_SECONDS),
        })
    }

    #[cfg(test)]
    fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| DciLensError::Config(format!("Invalid API URL: {e}")))
    }

    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(creds) => request.basic_auth(creds.login(), Some(creds.password())),
            None => request,
        }
    }

    /// GET `url` with `query`, retrying on network errors, 429 and 5xx.
    /// Returns the raw response body.
    async fn get_with_retry(&self, url: Url, query: &[(String, String)]) -> Result<String> {
        let mut retry_count = 0;
        loop {
            debug!("GET {url} {query:?}");
            let request = self.auth_request(self.client.get(url.clone()).query(query));

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    if retry_count >= MAX_RETRIES {
                        return Err(e.into());
                    }
                    warn!(
                        "Network error ({e}), retrying in {}s ({}/{MAX_RETRIES})...",
                        self.retry_delay.as_secs(),
                        retry_count + 1
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if retry_count >= MAX_RETRIES {
                    return Err(DciLensError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: MAX_RETRIES,
                    });
                }
                warn!(
                    "DCI API error (status {status}). Waiting {}s before retry {}/{MAX_RETRIES}...",
                    self.retry_delay.as_secs(),
                    retry_count + 1
                );
                tokio::time::sleep(self.retry_delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(DciLensError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response.text().await?);
        }
    }

    /// One page of `GET /api/v1/jobs`. Filters are sent as query parameters
    /// (`where`, `sort`, `embed`, ...). The body is handed back undecoded.
    pub async fn list_jobs(&self, request: PageRequest) -> Result<RawPage> {
        let mut query = vec![
            ("limit".to_string(), request.limit.to_string()),
            ("offset".to_string(), request.offset.to_string()),
        ];
        query.extend(request.filters);

        let body = self.get_with_retry(self.endpoint("api/v1/jobs")?, &query).await?;
        Ok(RawPage::Encoded(Box::new(body)))
    }

    /// `GET /api/v1/analytics/jobs`: search with the DCI query DSL, e.g.
    /// `((components.type='ocp') and (components.version='4.19.0'))`.
    ///
    /// Returns the search document (`{"hits": {"hits": [...]}}`) as is.
    pub async fn search_jobs(
        &self,
        query: &str,
        sort: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Value> {
        let mut params = vec![
            ("query".to_string(), query.to_string()),
            ("limit".to_string(), limit.to_string()),
            ("offset".to_string(), offset.to_string()),
        ];
        if let Some(sort) = sort {
            params.push(("sort".to_string(), sort.to_string()));
        }

        let body = self
            .get_with_retry(self.endpoint("api/v1/analytics/jobs")?, &params)
            .await?;
        Ok(serde_json::from_str(&body)?)
    }
}
