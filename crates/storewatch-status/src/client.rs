//! Status service access.
//!
//! # Design
//! - `StatusSource` is the narrow seam every collaborator depends on, so tests
//!   can substitute an in-memory source.
//! - `HttpStatusClient` speaks plain JSON over reqwest against the admin port.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::de::from_slice;
use storewatch_api_models::{QueryResultSet, StoreStatus, StoreStatusList, TimeSeriesQueryRequest};
use tracing::debug;

use crate::error::{StatusError, StatusResult};

/// Path of the store status listing, relative to the base URL.
pub const STORES_PATH: &str = "_status/stores/";
/// Path of the time-series query endpoint, relative to the base URL.
pub const TS_QUERY_PATH: &str = "ts/query";

/// Source of store statuses and time-series data.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the status of every store in the cluster.
    async fn fetch_stores(&self) -> StatusResult<Vec<StoreStatus>>;
    /// Execute a time-series query.
    async fn query(&self, request: &TimeSeriesQueryRequest) -> StatusResult<QueryResultSet>;
}

/// reqwest-backed [`StatusSource`].
#[derive(Clone, Debug)]
pub struct HttpStatusClient {
    client: Client,
    base_url: Url,
}

impl HttpStatusClient {
    /// Build a client rooted at `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL does not parse or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> StatusResult<Self> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = normalized
            .parse::<Url>()
            .map_err(|source| StatusError::InvalidUrl {
                value: base_url.to_string(),
                source,
            })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| StatusError::Client { source })?;
        Ok(Self { client, base_url })
    }

    /// Base URL every endpoint is resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> StatusResult<Url> {
        self.base_url
            .join(path)
            .map_err(|source| StatusError::InvalidUrl {
                value: path.to_string(),
                source,
            })
    }

    async fn read_json<T>(
        operation: &'static str,
        url: &Url,
        response: reqwest::Response,
    ) -> StatusResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status();
        if !status.is_success() {
            return Err(StatusError::HttpStatus {
                operation,
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(|source| StatusError::Http {
            operation,
            url: url.to_string(),
            source,
        })?;
        from_slice(&bytes).map_err(|source| StatusError::Decode {
            operation,
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl StatusSource for HttpStatusClient {
    async fn fetch_stores(&self) -> StatusResult<Vec<StoreStatus>> {
        const OPERATION: &str = "status.fetch_stores";
        let url = self.endpoint(STORES_PATH)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| StatusError::Http {
                operation: OPERATION,
                url: url.to_string(),
                source,
            })?;
        let list: StoreStatusList = Self::read_json(OPERATION, &url, response).await?;
        debug!(stores = list.d.len(), "fetched store statuses");
        Ok(list.d)
    }

    async fn query(&self, request: &TimeSeriesQueryRequest) -> StatusResult<QueryResultSet> {
        const OPERATION: &str = "ts.query";
        let url = self.endpoint(TS_QUERY_PATH)?;
        let response = self
            .client
            .post(url.clone())
            .json(request)
            .send()
            .await
            .map_err(|source| StatusError::Http {
                operation: OPERATION,
                url: url.to_string(),
                source,
            })?;
        let results: QueryResultSet = Self::read_json(OPERATION, &url, response).await?;
        debug!(
            series = results.results.len(),
            queries = request.queries.len(),
            "executed time-series query"
        );
        Ok(results)
    }
}
