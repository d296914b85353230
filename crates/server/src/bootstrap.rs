use std::sync::Arc;
use std::time::Duration;

use comanda_core::config::{AppConfig, ConfigError, LoadOptions};
use comanda_core::{ConversationEngine, PriorityTracker, TenantDirectory};
use comanda_db::{connect_with_settings, migrations, DbPool, SqlConversationStore};
use comanda_whatsapp::{ChannelSender, CloudApiSender, InboundWorker, LogOnlySender};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::catalog::HttpCatalogGateway;
use crate::ledger::HttpOrderLedger;
use crate::service::ConversationService;
use crate::webhook::WebhookState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub priority: Arc<PriorityTracker>,
    pub webhook: WebhookState,
    pub dispatcher: JoinHandle<()>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client for {component} could not be built: {reason}")]
    HttpClient { component: &'static str, reason: String },
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let catalog = HttpCatalogGateway::new(
        &config.catalog.base_url,
        Duration::from_secs(config.catalog.timeout_secs),
    )
    .map_err(|error| BootstrapError::HttpClient { component: "catalog", reason: error.to_string() })?;
    let ledger = HttpOrderLedger::new(
        &config.ledger.base_url,
        Duration::from_secs(config.ledger.timeout_secs),
    )
    .map_err(|error| BootstrapError::HttpClient { component: "ledger", reason: error.to_string() })?;
    let sender = channel_sender(&config)?;

    let tenants = TenantDirectory::from_settings(&config.tenants, config.default_tenant.clone());
    if tenants.is_empty() {
        warn!(
            event_name = "system.bootstrap.no_tenants",
            correlation_id = "bootstrap",
            "no tenants configured; every delivery will be dropped"
        );
    }

    let priority = Arc::new(PriorityTracker::new());
    let engine = ConversationEngine::new(Arc::new(catalog), Arc::new(ledger), priority.clone());
    let store = Arc::new(SqlConversationStore::new(db_pool.clone()));
    let service = Arc::new(ConversationService::new(tenants, store, engine, sender));
    let (worker, dispatcher) = InboundWorker::spawn(service);
    let webhook = WebhookState::new(config.whatsapp.verify_token.clone(), worker);

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        tenants = config.tenants.len(),
        outbound = if config.whatsapp.access_token.is_some() { "cloud_api" } else { "log_only" },
        "application wired"
    );

    Ok(Application { config, db_pool, priority, webhook, dispatcher })
}

fn channel_sender(config: &AppConfig) -> Result<Arc<dyn ChannelSender>, BootstrapError> {
    match &config.whatsapp.access_token {
        Some(token) => {
            let sender = CloudApiSender::new(
                &config.whatsapp.api_base_url,
                token.clone(),
                Duration::from_secs(config.whatsapp.timeout_secs),
            )
            .map_err(|error| BootstrapError::HttpClient {
                component: "whatsapp",
                reason: error.to_string(),
            })?;
            Ok(Arc::new(sender))
        }
        None => Ok(Arc::new(LogOnlySender)),
    }
}

#[cfg(test)]
mod tests {
    use comanda_core::config::{ConfigOverrides, LoadOptions, TenantSettings};
    use secrecy::SecretString;

    use crate::bootstrap::bootstrap;

    fn options(verify_token: Option<&str>) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                verify_token: verify_token.map(str::to_owned),
                tenants: Some(vec![TenantSettings {
                    endpoint_id: "PN-1".to_string(),
                    credential: SecretString::from("tenant-key".to_string()),
                    display_name: "Lanchonete da Praça".to_string(),
                    catalog_url: None,
                    natural_language: true,
                    human_handoff: true,
                }]),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_verify_token() {
        let result = bootstrap(options(None)).await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("whatsapp.verify_token"), "{message}");
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_wires_the_conversation_store() {
        let app = bootstrap(options(Some("s3cret"))).await.expect("bootstrap succeeds");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'conversation_state'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema query");
        assert_eq!(table_count, 1);
        assert!(app.priority.is_empty().await);

        drop(app.webhook);
        app.dispatcher.await.expect("dispatcher stops once intake is closed");
        app.db_pool.close().await;
    }
}
