use crate::prelude::*;
use rappelconso_core::error::QueryError;
use rappelconso_core::filter::RawValidation;
use rappelconso_core::normalize::{
    self, detect_shape, CategoryCounts, Outcome, TopCategory, UpstreamBody,
};
use rappelconso_core::params::{self, QueryParams, SearchRequest};
use rappelconso_core::schema::{ResultEnvelope, CATEGORY_FIELD};
use std::time::Duration;

/// Records endpoint of the `rappelconso-v2-gtin-trie` dataset
pub const DEFAULT_BASE_URL: &str = "https://data.economie.gouv.fr/api/explore/v2.1/catalog/datasets/rappelconso-v2-gtin-trie/records";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct RecallConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl RecallConfig {
    pub fn from_global(global: &crate::Global) -> Self {
        Self {
            base_url: global.base_url.clone(),
            timeout: Duration::from_secs(global.timeout),
        }
    }
}

/// Client for the RappelConso records endpoint
///
/// Cheap to clone and safe to share between tasks. Each operation sends at
/// most one request and never retries.
#[derive(Debug, Clone)]
pub struct RecallClient {
    http: reqwest::Client,
    base_url: reqwest::Url,
}

impl RecallClient {
    pub fn new(config: &RecallConfig) -> Result<Self, Error> {
        let base_url = reqwest::Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL {:?}: {e}", config.base_url)))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| Error::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Send one GET with `params` and return the raw body
    pub async fn execute(&self, params: &QueryParams) -> Result<UpstreamBody, QueryError> {
        log::debug!("GET {} {:?}", self.base_url, params);

        let response = self
            .http
            .get(self.base_url.clone())
            .query(params)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| {
                log::debug!("Failed to read error body [{status}]: {e}");
                String::new()
            });
            log::warn!("RappelConso API error [{status}]");
            return Err(QueryError::from_status(status.as_u16(), body));
        }

        let body = response.text().await.map_err(transport_error)?;
        Ok(UpstreamBody::parse(body))
    }

    async fn records(&self, params: &QueryParams) -> Result<Outcome<ResultEnvelope>, QueryError> {
        let body = self.execute(params).await?;

        if let UpstreamBody::Json(payload) = &body {
            log::debug!("Response shape: {:?}", detect_shape(payload));
        }

        let outcome = normalize::normalize_records(&body);
        match &outcome {
            Outcome::Normalized(envelope) if envelope.skipped > 0 => {
                log::warn!("Skipped {} invalid records", envelope.skipped)
            }
            Outcome::Passthrough(passthrough) => {
                log::warn!("Returning raw upstream payload: {}", passthrough.reason)
            }
            _ => {}
        }

        Ok(outcome)
    }

    /// Generic search with limit, sort order and filters
    pub async fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<Outcome<ResultEnvelope>, QueryError> {
        let prepared = params::search_params(request)?;

        if !prepared.dropped.is_empty() {
            log::warn!(
                "Ignoring filters on unknown fields: {}",
                prepared.dropped.join(", ")
            );
        }
        if prepared.validation == RawValidation::Unvalidated {
            log::warn!(
                "Forwarding unvalidated where expression: {:?}",
                request.where_clause
            );
        }

        self.records(&prepared.params).await
    }

    /// Most recent recalls, newest first
    pub async fn latest(&self, limit: Option<i64>) -> Result<Outcome<ResultEnvelope>, QueryError> {
        let params = params::latest_params(limit)?;
        self.records(&params).await
    }

    /// Number of recalls per product category
    pub async fn category_counts(&self) -> Result<Outcome<CategoryCounts>, QueryError> {
        let body = self.execute(&params::category_facet_params()).await?;
        Ok(normalize::normalize_category_counts(&body, CATEGORY_FIELD))
    }

    /// Category with the most recalls
    pub async fn top_category(&self) -> Result<Outcome<TopCategory>, QueryError> {
        let counts = self.category_counts().await?;
        Ok(normalize::top_category(counts))
    }

    /// Most recent recalls of one category, newest first
    pub async fn latest_by_category(
        &self,
        category: &str,
        limit: Option<i64>,
    ) -> Result<Outcome<ResultEnvelope>, QueryError> {
        let params = params::latest_by_category_params(category, limit)?;
        self.records(&params).await
    }
}

fn transport_error(error: reqwest::Error) -> QueryError {
    let message = if error.is_timeout() {
        format!("Request to RappelConso timed out: {error}")
    } else if error.is_connect() {
        format!("Failed to connect to RappelConso: {error}")
    } else {
        format!("Failed to send request to RappelConso: {error}")
    };

    log::warn!("{message}");
    QueryError::transport(message)
}
