use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use comanda_core::domain::catalog::{default_catalog, CatalogItem, StoreStatus};
use comanda_core::{CatalogGateway, TenantConfig};

pub const TENANT_KEY_HEADER: &str = "x-tenant-key";

#[derive(Debug, Error)]
enum CatalogError {
    #[error("catalog transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("catalog endpoint returned status {0}")]
    Status(u16),
    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
    #[error("catalog endpoint returned no items")]
    Empty,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogPayload {
    Wrapped { items: Vec<CatalogItem> },
    Bare(Vec<CatalogItem>),
}

impl CatalogPayload {
    fn into_items(self) -> Vec<CatalogItem> {
        match self {
            Self::Wrapped { items } | Self::Bare(items) => items,
        }
    }
}

/// Catalog and store status over HTTP, keyed by the tenant credential.
///
/// `GET {base}/catalog` and `GET {base}/store/status`, where `base` is the
/// tenant's own catalog url when configured. Every failure is absorbed here:
/// the catalog falls back to the built-in default list and the status to open.
#[derive(Clone, Debug)]
pub struct HttpCatalogGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalogGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url: base_url.into() })
    }

    fn url(&self, tenant: &TenantConfig, path: &str) -> String {
        let base = tenant.catalog_url.as_deref().unwrap_or(&self.base_url);
        format!("{}/{path}", base.trim_end_matches('/'))
    }

    async fn get(&self, tenant: &TenantConfig, path: &str) -> Result<String, CatalogError> {
        let response = self
            .client
            .get(self.url(tenant, path))
            .header(TENANT_KEY_HEADER, tenant.credential.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    async fn try_fetch_catalog(
        &self,
        tenant: &TenantConfig,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let body = self.get(tenant, "catalog").await?;
        let items = serde_json::from_str::<CatalogPayload>(&body)
            .map_err(|error| CatalogError::Decode(error.to_string()))?
            .into_items();
        if items.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(items)
    }

    async fn try_fetch_status(&self, tenant: &TenantConfig) -> Result<StoreStatus, CatalogError> {
        let body = self.get(tenant, "store/status").await?;
        serde_json::from_str(&body).map_err(|error| CatalogError::Decode(error.to_string()))
    }
}

#[async_trait]
impl CatalogGateway for HttpCatalogGateway {
    async fn fetch_catalog(&self, tenant: &TenantConfig) -> Vec<CatalogItem> {
        match self.try_fetch_catalog(tenant).await {
            Ok(items) => {
                debug!(
                    event_name = "catalog.fetched",
                    endpoint_id = %tenant.endpoint_id,
                    items = items.len(),
                    "catalog fetched"
                );
                items
            }
            Err(error) => {
                warn!(
                    event_name = "catalog.fetch_failed",
                    endpoint_id = %tenant.endpoint_id,
                    error = %error,
                    "catalog unavailable; serving default catalog"
                );
                default_catalog()
            }
        }
    }

    async fn fetch_store_status(&self, tenant: &TenantConfig) -> StoreStatus {
        match self.try_fetch_status(tenant).await {
            Ok(status) => status,
            Err(error) => {
                warn!(
                    event_name = "catalog.status_failed",
                    endpoint_id = %tenant.endpoint_id,
                    error = %error,
                    "store status unavailable; assuming open"
                );
                StoreStatus::open()
            }
        }
    }
}
