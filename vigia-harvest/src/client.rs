//! Remote catalog client.
//!
//! [`CatalogClient`] is the seam between the engine and the HTTP transport:
//! the paginator, fetcher and pipeline only see this trait, so tests drive
//! them with in-process fakes. [`HttpCatalogClient`] is the production
//! implementation over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use vigia_core::{ListingPage, RecordRef};

use crate::error::HarvestError;

/// User agent sent with every request; the upstream portal rejects the
/// default reqwest agent.
const USER_AGENT: &str = "Mozilla/5.0";

/// Remote paginated catalog API.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch one page of the listing endpoint. Pages start at 1.
    async fn list_page(&self, page: u32, page_size: u32) -> Result<ListingPage, HarvestError>;

    /// Fetch the full (nested) detail payload for one procedure.
    async fn fetch_detail(&self, slug: &str) -> Result<Value, HarvestError>;
}

// ---------------------------------------------------------------------------
// Wire envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    datos: T,
}

#[derive(Debug, Deserialize)]
struct ListingBody {
    total: u64,
    filas: Vec<RecordRef>,
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// reqwest-backed [`CatalogClient`] for the live portal API.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCatalogClient {
    /// Build a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, HarvestError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| HarvestError::Http {
                url: base_url.clone(),
                source: e,
            })?;
        Ok(Self { http, base_url })
    }

    async fn get_json(&self, url: &str) -> Result<Value, HarvestError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| HarvestError::Http {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // A 2xx body that is not JSON is a permanent failure, not a
        // transport error.
        response
            .json()
            .await
            .map_err(|e| HarvestError::Malformed {
                url: url.to_string(),
                detail: e.to_string(),
            })
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn list_page(&self, page: u32, page_size: u32) -> Result<ListingPage, HarvestError> {
        let url = format!(
            "{}/tramites?pagina={}&limite={}",
            self.base_url, page, page_size
        );
        let body = self.get_json(&url).await?;
        let envelope: Envelope<ListingBody> =
            serde_json::from_value(body).map_err(|e| HarvestError::Malformed {
                url: url.clone(),
                detail: e.to_string(),
            })?;
        Ok(ListingPage {
            total: envelope.datos.total,
            rows: envelope.datos.filas,
        })
    }

    async fn fetch_detail(&self, slug: &str) -> Result<Value, HarvestError> {
        let url = format!("{}/tramites/{}", self.base_url, slug);
        let mut body = self.get_json(&url).await?;
        match body.get_mut("datos").map(Value::take) {
            Some(datos) => Ok(datos),
            None => Err(HarvestError::Malformed {
                url,
                detail: "missing 'datos' envelope".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client =
            HttpCatalogClient::new("https://example.test/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, "https://example.test/api");
    }
}
