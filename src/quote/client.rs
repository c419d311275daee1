//! HTTP client for the Quote Service.
//!
//! # Responsibilities
//! - Create and annotate swap quotes
//! - Fetch the unsigned transaction groups for a quote
//! - Look up assets and the ALGO price
//!
//! Errors are returned to the caller as-is; nothing here retries.

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::algorand::Address;
use crate::config::schema::QuoteServiceConfig;
use crate::observability::metrics;
use crate::quote::types::{
    AlgoPrice, Asset, AssetList, CreateQuoteBody, GetAssetsResponse, PrepareTransactionsBody,
    PrepareTransactionsResponse, QuoteList, SwapQuote,
};
use crate::widget::WidgetNetwork;

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("invalid quote service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("quote service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("quote service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode quote service response: {0}")]
    Decode(String),
}

/// Client for the swap API of one network.
#[derive(Debug, Clone)]
pub struct SwapApiClient {
    http: Client,
    network: WidgetNetwork,
    base_url: String,
}

impl SwapApiClient {
    /// Client for the public API of `network`.
    pub fn new(network: WidgetNetwork) -> Self {
        Self {
            http: Client::new(),
            network,
            base_url: network.api_base_url().to_string(),
        }
    }

    /// Client against a custom deployment, e.g. a staging API or a test server.
    pub fn with_base_url(network: WidgetNetwork, base_url: &str) -> Result<Self, QuoteError> {
        Url::parse(base_url)?;
        Ok(Self {
            http: Client::new(),
            network,
            base_url: base_url.to_string(),
        })
    }

    pub fn from_config(config: &QuoteServiceConfig) -> Result<Self, QuoteError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base_url = match &config.base_url {
            Some(url) => {
                Url::parse(url)?;
                url.clone()
            }
            None => config.network.api_base_url().to_string(),
        };
        Ok(Self {
            http,
            network: config.network,
            base_url,
        })
    }

    pub fn network(&self) -> WidgetNetwork {
        self.network
    }

    /// Switch networks. Later calls go to that network's public API.
    pub fn set_network(&mut self, network: WidgetNetwork) {
        self.network = network;
        self.base_url = network.api_base_url().to_string();
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Quotes from every requested provider.
    pub async fn create_quote(&self, body: &CreateQuoteBody) -> Result<Vec<SwapQuote>, QuoteError> {
        let list: QuoteList = self
            .request(Method::POST, "/v1/dex-swap/quotes/", &[], Some(body))
            .await?;
        Ok(list.results)
    }

    /// Attach the text of a client-side failure to a quote.
    pub async fn update_quote(
        &self,
        quote_id: &str,
        exception_text: &str,
    ) -> Result<serde_json::Value, QuoteError> {
        let body = serde_json::json!({ "exception_text": exception_text });
        self.request(
            Method::PATCH,
            &format!("/v1/dex-swap/quotes/{quote_id}/"),
            &[],
            Some(&body),
        )
        .await
    }

    pub async fn prepare_transactions(
        &self,
        quote_id: &str,
        deposit_address: Option<&Address>,
    ) -> Result<PrepareTransactionsResponse, QuoteError> {
        let body = PrepareTransactionsBody {
            quote: quote_id,
            deposit_address,
        };
        self.request(
            Method::POST,
            "/v1/dex-swap/prepare-transactions/",
            &[],
            Some(&body),
        )
        .await
    }

    /// Assets that can be bought with `asset_in_id`.
    pub async fn available_assets(
        &self,
        asset_in_id: u64,
        q: Option<&str>,
    ) -> Result<Vec<Asset>, QuoteError> {
        let mut query = vec![("asset_in_id", asset_in_id.to_string())];
        if let Some(q) = q.filter(|q| !q.is_empty()) {
            query.push(("q", q.to_string()));
        }
        let list: AssetList = self
            .request(Method::GET, "/v1/dex-swap/available-assets/", &query, None::<&()>)
            .await?;
        Ok(list.results)
    }

    pub async fn assets(
        &self,
        asset_ids: &[u64],
        q: Option<&str>,
    ) -> Result<GetAssetsResponse, QuoteError> {
        let mut query = Vec::new();
        if !asset_ids.is_empty() {
            let ids: Vec<String> = asset_ids.iter().map(u64::to_string).collect();
            query.push(("asset_ids", ids.join(",")));
        }
        if let Some(q) = q.filter(|q| !q.is_empty()) {
            query.push(("q", q.to_string()));
        }
        self.request(Method::GET, "/v1/assets/", &query, None::<&()>)
            .await
    }

    /// ALGO price in USD.
    pub async fn algo_price(&self) -> Result<AlgoPrice, QuoteError> {
        self.request(Method::GET, "/v1/currencies/USD/", &[], None::<&()>)
            .await
    }

    /// A single asset, `None` when the service does not know it.
    pub async fn asset(&self, asset_id: u64) -> Result<Option<Asset>, QuoteError> {
        let response = self.assets(&[asset_id], None).await?;
        Ok(response.results.into_iter().next())
    }

    pub async fn search_assets(&self, query: &str) -> Result<Vec<Asset>, QuoteError> {
        Ok(self.assets(&[], Some(query)).await?.results)
    }

    async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, QuoteError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut url = endpoint_url(&self.base_url, endpoint)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        tracing::debug!(method = %method, url = %url, "Quote service request");
        let mut request = self.http.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        metrics::record_quote_request(endpoint_label(endpoint), status.as_u16());
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                method = %method,
                endpoint = %endpoint,
                status = status.as_u16(),
                "Quote service returned an error"
            );
            return Err(QuoteError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| QuoteError::Decode(e.to_string()))
    }
}

/// Append `endpoint` to the base URL, keeping any path prefix the base has.
fn endpoint_url(base_url: &str, endpoint: &str) -> Result<Url, QuoteError> {
    Ok(Url::parse(&format!(
        "{}{}",
        base_url.trim_end_matches('/'),
        endpoint
    ))?)
}

/// Low-cardinality metric label: the route without ids.
fn endpoint_label(endpoint: &str) -> &'static str {
    if endpoint.starts_with("/v1/dex-swap/quotes/") {
        if endpoint == "/v1/dex-swap/quotes/" {
            "create_quote"
        } else {
            "update_quote"
        }
    } else if endpoint.starts_with("/v1/dex-swap/prepare-transactions/") {
        "prepare_transactions"
    } else if endpoint.starts_with("/v1/dex-swap/available-assets/") {
        "available_assets"
    } else if endpoint.starts_with("/v1/assets/") {
        "assets"
    } else if endpoint.starts_with("/v1/currencies/") {
        "algo_price"
    } else {
        "other"
    }
}
