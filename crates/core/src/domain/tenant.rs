use std::collections::HashMap;

use secrecy::SecretString;

use crate::config::TenantSettings;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantFeatures {
    pub natural_language: bool,
    pub human_handoff: bool,
}

impl Default for TenantFeatures {
    fn default() -> Self {
        Self { natural_language: true, human_handoff: true }
    }
}

/// Everything the engine needs to know about the store behind one endpoint.
#[derive(Clone, Debug)]
pub struct TenantConfig {
    pub endpoint_id: String,
    pub credential: SecretString,
    pub display_name: String,
    pub catalog_url: Option<String>,
    pub features: TenantFeatures,
}

impl TenantConfig {
    pub fn new(
        endpoint_id: impl Into<String>,
        credential: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            endpoint_id: endpoint_id.into(),
            credential: SecretString::from(credential.into()),
            display_name: display_name.into(),
            catalog_url: None,
            features: TenantFeatures::default(),
        }
    }
}

impl From<&TenantSettings> for TenantConfig {
    fn from(settings: &TenantSettings) -> Self {
        Self {
            endpoint_id: settings.endpoint_id.clone(),
            credential: settings.credential.clone(),
            display_name: settings.display_name.clone(),
            catalog_url: settings.catalog_url.clone(),
            features: TenantFeatures {
                natural_language: settings.natural_language,
                human_handoff: settings.human_handoff,
            },
        }
    }
}

/// Resolves a channel endpoint id into the tenant that owns it.
#[derive(Clone, Debug, Default)]
pub struct TenantDirectory {
    tenants: HashMap<String, TenantConfig>,
    fallback: Option<String>,
}

impl TenantDirectory {
    pub fn new(tenants: Vec<TenantConfig>, fallback: Option<String>) -> Self {
        let tenants =
            tenants.into_iter().map(|tenant| (tenant.endpoint_id.clone(), tenant)).collect();
        Self { tenants, fallback }
    }

    pub fn from_settings(settings: &[TenantSettings], fallback: Option<String>) -> Self {
        Self::new(settings.iter().map(TenantConfig::from).collect(), fallback)
    }

    pub fn resolve(&self, endpoint_id: &str) -> Option<TenantConfig> {
        self.tenants
            .get(endpoint_id)
            .or_else(|| self.fallback.as_deref().and_then(|fallback| self.tenants.get(fallback)))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::{TenantConfig, TenantDirectory};

    fn directory(fallback: Option<&str>) -> TenantDirectory {
        TenantDirectory::new(
            vec![
                TenantConfig::new("PN-1", "key-one", "Lanchonete Um"),
                TenantConfig::new("PN-2", "key-two", "Lanchonete Dois"),
            ],
            fallback.map(str::to_owned),
        )
    }

    #[test]
    fn resolves_known_endpoint() {
        let tenant = directory(None).resolve("PN-2").expect("tenant");
        assert_eq!(tenant.display_name, "Lanchonete Dois");
        assert_eq!(tenant.credential.expose_secret(), "key-two");
    }

    #[test]
    fn unknown_endpoint_without_fallback_is_unresolved() {
        assert!(directory(None).resolve("PN-9").is_none());
    }

    #[test]
    fn unknown_endpoint_uses_fallback_tenant() {
        let tenant = directory(Some("PN-1")).resolve("PN-9").expect("fallback tenant");
        assert_eq!(tenant.endpoint_id, "PN-1");
    }
}
