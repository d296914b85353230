use async_trait::async_trait;

use crate::domain::catalog::{default_catalog, CatalogItem, StoreStatus};
use crate::domain::tenant::TenantConfig;

/// Source of the tenant catalog and open/closed status.
///
/// Implementations never fail: an unreachable catalog resolves to
/// [`default_catalog`] and an unreachable status endpoint resolves to an open
/// store.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn fetch_catalog(&self, tenant: &TenantConfig) -> Vec<CatalogItem>;
    async fn fetch_store_status(&self, tenant: &TenantConfig) -> StoreStatus;
}

/// Serves a fixed catalog and status. Used offline and in tests.
#[derive(Clone, Debug)]
pub struct StaticCatalogGateway {
    items: Vec<CatalogItem>,
    status: StoreStatus,
}

impl StaticCatalogGateway {
    pub fn new(items: Vec<CatalogItem>, status: StoreStatus) -> Self {
        Self { items, status }
    }
}

impl Default for StaticCatalogGateway {
    fn default() -> Self {
        Self::new(default_catalog(), StoreStatus::open())
    }
}

#[async_trait]
impl CatalogGateway for StaticCatalogGateway {
    async fn fetch_catalog(&self, _tenant: &TenantConfig) -> Vec<CatalogItem> {
        self.items.clone()
    }

    async fn fetch_store_status(&self, _tenant: &TenantConfig) -> StoreStatus {
        self.status.clone()
    }
}
