use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const PRICE_API_URL: &str = "https://api.twelvedata.com/price";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("price missing from response: {0}")]
    MissingPrice(String),
    #[error("malformed price value: {0}")]
    InvalidPrice(String),
}

/// Narrow synchronous-looking seam around the blocking price fetch, so the
/// task scheduling strategy stays independent of the HTTP client.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    async fn fetch(&self, symbol: &str) -> Result<f64, FetchError>;
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: Option<String>,
}

/// Twelve Data `/price` endpoint client.
pub struct TwelveDataClient {
    http: reqwest::Client,
    api_key: String,
}

impl TwelveDataClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl PriceFetcher for TwelveDataClient {
    async fn fetch(&self, symbol: &str) -> Result<f64, FetchError> {
        let url = format!("{}?symbol={}&apikey={}", PRICE_API_URL, symbol, self.api_key);
        let body = self.http.get(&url).send().await?.text().await?;
        parse_price_body(&body)
    }
}

/// The API quotes prices as strings and reports errors as a JSON object
/// without a "price" field.
fn parse_price_body(body: &str) -> Result<f64, FetchError> {
    let parsed: PriceResponse =
        serde_json::from_str(body).map_err(|_| FetchError::MissingPrice(body.to_string()))?;
    let raw = parsed
        .price
        .ok_or_else(|| FetchError::MissingPrice(body.to_string()))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| FetchError::InvalidPrice(raw))
}
