use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub whatsapp: WhatsAppConfig,
    pub catalog: CatalogConfig,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
    pub tenants: Vec<TenantSettings>,
    pub default_tenant: Option<String>,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WhatsAppConfig {
    pub verify_token: SecretString,
    pub access_token: Option<SecretString>,
    pub api_base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LedgerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TenantSettings {
    pub endpoint_id: String,
    pub credential: SecretString,
    pub display_name: String,
    #[serde(default)]
    pub catalog_url: Option<String>,
    #[serde(default = "enabled")]
    pub natural_language: bool,
    #[serde(default = "enabled")]
    pub human_handoff: bool,
}

fn enabled() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub verify_token: Option<String>,
    pub access_token: Option<String>,
    pub catalog_base_url: Option<String>,
    pub ledger_base_url: Option<String>,
    pub tenants: Option<Vec<TenantSettings>>,
    pub default_tenant: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://comanda.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            whatsapp: WhatsAppConfig {
                verify_token: String::new().into(),
                access_token: None,
                api_base_url: "https://graph.facebook.com/v19.0".to_string(),
                timeout_secs: 5,
            },
            catalog: CatalogConfig {
                base_url: "http://localhost:3000/api".to_string(),
                timeout_secs: 3,
            },
            ledger: LedgerConfig {
                base_url: "http://localhost:3000/api".to_string(),
                timeout_secs: 5,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            tenants: Vec::new(),
            default_tenant: None,
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("comanda.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(whatsapp) = patch.whatsapp {
            if let Some(verify_token_value) = whatsapp.verify_token {
                self.whatsapp.verify_token = secret_value(verify_token_value);
            }
            if let Some(access_token_value) = whatsapp.access_token {
                self.whatsapp.access_token = Some(secret_value(access_token_value));
            }
            if let Some(api_base_url) = whatsapp.api_base_url {
                self.whatsapp.api_base_url = api_base_url;
            }
            if let Some(timeout_secs) = whatsapp.timeout_secs {
                self.whatsapp.timeout_secs = timeout_secs;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(base_url) = catalog.base_url {
                self.catalog.base_url = base_url;
            }
            if let Some(timeout_secs) = catalog.timeout_secs {
                self.catalog.timeout_secs = timeout_secs;
            }
        }

        if let Some(ledger) = patch.ledger {
            if let Some(base_url) = ledger.base_url {
                self.ledger.base_url = base_url;
            }
            if let Some(timeout_secs) = ledger.timeout_secs {
                self.ledger.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(tenants) = patch.tenants {
            self.tenants = tenants;
        }
        if let Some(default_tenant) = patch.default_tenant {
            self.default_tenant = Some(default_tenant);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COMANDA_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("COMANDA_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("COMANDA_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("COMANDA_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("COMANDA_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("COMANDA_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("COMANDA_SERVER_PORT") {
            self.server.port = parse_u16("COMANDA_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("COMANDA_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("COMANDA_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("COMANDA_WHATSAPP_VERIFY_TOKEN") {
            self.whatsapp.verify_token = secret_value(value);
        }
        if let Some(value) = read_env("COMANDA_WHATSAPP_ACCESS_TOKEN") {
            self.whatsapp.access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("COMANDA_WHATSAPP_API_BASE_URL") {
            self.whatsapp.api_base_url = value;
        }
        if let Some(value) = read_env("COMANDA_WHATSAPP_TIMEOUT_SECS") {
            self.whatsapp.timeout_secs = parse_u64("COMANDA_WHATSAPP_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("COMANDA_CATALOG_BASE_URL") {
            self.catalog.base_url = value;
        }
        if let Some(value) = read_env("COMANDA_CATALOG_TIMEOUT_SECS") {
            self.catalog.timeout_secs = parse_u64("COMANDA_CATALOG_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("COMANDA_LEDGER_BASE_URL") {
            self.ledger.base_url = value;
        }
        if let Some(value) = read_env("COMANDA_LEDGER_TIMEOUT_SECS") {
            self.ledger.timeout_secs = parse_u64("COMANDA_LEDGER_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("COMANDA_DEFAULT_TENANT") {
            self.default_tenant = Some(value);
        }

        let log_level =
            read_env("COMANDA_LOGGING_LEVEL").or_else(|| read_env("COMANDA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COMANDA_LOGGING_FORMAT").or_else(|| read_env("COMANDA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(verify_token) = overrides.verify_token {
            self.whatsapp.verify_token = secret_value(verify_token);
        }
        if let Some(access_token) = overrides.access_token {
            self.whatsapp.access_token = Some(secret_value(access_token));
        }
        if let Some(catalog_base_url) = overrides.catalog_base_url {
            self.catalog.base_url = catalog_base_url;
        }
        if let Some(ledger_base_url) = overrides.ledger_base_url {
            self.ledger.base_url = ledger_base_url;
        }
        if let Some(tenants) = overrides.tenants {
            self.tenants = tenants;
        }
        if let Some(default_tenant) = overrides.default_tenant {
            self.default_tenant = Some(default_tenant);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_whatsapp(&self.whatsapp)?;
        validate_http_endpoint("catalog", &self.catalog.base_url, self.catalog.timeout_secs)?;
        validate_http_endpoint("ledger", &self.ledger.base_url, self.ledger.timeout_secs)?;
        validate_logging(&self.logging)?;
        validate_tenants(&self.tenants, self.default_tenant.as_deref())?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("comanda.toml"), PathBuf::from("config/comanda.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address is required".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_whatsapp(whatsapp: &WhatsAppConfig) -> Result<(), ConfigError> {
    if whatsapp.verify_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "whatsapp.verify_token is required. Use the same value configured as the webhook verify token in the provider dashboard".to_string(),
        ));
    }

    let blank_access_token = whatsapp
        .access_token
        .as_ref()
        .map(|value| value.expose_secret().trim().is_empty())
        .unwrap_or(false);
    if blank_access_token {
        return Err(ConfigError::Validation(
            "whatsapp.access_token must not be blank when set (omit it to log replies only)"
                .to_string(),
        ));
    }

    validate_http_endpoint("whatsapp", &whatsapp.api_base_url, whatsapp.timeout_secs)
}

fn validate_http_endpoint(
    section: &str,
    base_url: &str,
    timeout_secs: u64,
) -> Result<(), ConfigError> {
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{section} base url must start with http:// or https://"
        )));
    }

    if timeout_secs == 0 || timeout_secs > 30 {
        return Err(ConfigError::Validation(format!(
            "{section}.timeout_secs must be in range 1..=30"
        )));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_tenants(
    tenants: &[TenantSettings],
    default_tenant: Option<&str>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for tenant in tenants {
        if tenant.endpoint_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "tenants[].endpoint_id must not be empty".to_string(),
            ));
        }
        if !seen.insert(tenant.endpoint_id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "tenants[].endpoint_id `{}` is configured more than once",
                tenant.endpoint_id
            )));
        }
        if tenant.credential.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "tenants[{}].credential is required",
                tenant.endpoint_id
            )));
        }
        if let Some(catalog_url) = &tenant.catalog_url {
            if !catalog_url.starts_with("http://") && !catalog_url.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "tenants[{}].catalog_url must start with http:// or https://",
                    tenant.endpoint_id
                )));
            }
        }
    }

    if let Some(default_tenant) = default_tenant {
        if !seen.contains(default_tenant) {
            return Err(ConfigError::Validation(format!(
                "default_tenant `{default_tenant}` does not match any tenants[].endpoint_id"
            )));
        }
    }

    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    whatsapp: Option<WhatsAppPatch>,
    catalog: Option<HttpEndpointPatch>,
    ledger: Option<HttpEndpointPatch>,
    logging: Option<LoggingPatch>,
    tenants: Option<Vec<TenantSettings>>,
    default_tenant: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WhatsAppPatch {
    verify_token: Option<String>,
    access_token: Option<String>,
    api_base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct HttpEndpointPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation_and_tenants() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_COMANDA_VERIFY_TOKEN", "verify-from-env");
        env::set_var("TEST_COMANDA_TENANT_KEY", "tenant-key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("comanda.toml");
            fs::write(
                &path,
                r#"
default_tenant = "1098765"

[whatsapp]
verify_token = "${TEST_COMANDA_VERIFY_TOKEN}"

[[tenants]]
endpoint_id = "1098765"
credential = "${TEST_COMANDA_TENANT_KEY}"
display_name = "Burger da Praça"
human_handoff = false
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.whatsapp.verify_token.expose_secret() == "verify-from-env",
                "verify token should be loaded from environment",
            )?;
            ensure(config.tenants.len() == 1, "one tenant should be configured")?;
            ensure(
                config.tenants[0].credential.expose_secret() == "tenant-key-from-env",
                "tenant credential should be interpolated",
            )?;
            ensure(config.tenants[0].natural_language, "natural language defaults to enabled")?;
            ensure(!config.tenants[0].human_handoff, "human handoff should be disabled")?;
            ensure(
                config.default_tenant.as_deref() == Some("1098765"),
                "default tenant should be read from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_COMANDA_VERIFY_TOKEN", "TEST_COMANDA_TENANT_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COMANDA_WHATSAPP_VERIFY_TOKEN", "verify-test");
        env::set_var("COMANDA_LOG_LEVEL", "warn");
        env::set_var("COMANDA_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["COMANDA_WHATSAPP_VERIFY_TOKEN", "COMANDA_LOG_LEVEL", "COMANDA_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COMANDA_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("COMANDA_CATALOG_BASE_URL", "https://catalog.from-env.test");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("comanda.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[whatsapp]
verify_token = "verify-from-file"

[catalog]
base_url = "https://catalog.from-file.test"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.catalog.base_url == "https://catalog.from-env.test",
                "env catalog url should win over file and defaults",
            )?;
            ensure(
                config.whatsapp.verify_token.expose_secret() == "verify-from-file",
                "file verify token should win over defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["COMANDA_DATABASE_URL", "COMANDA_CATALOG_BASE_URL"]);
        result
    }

    #[test]
    fn validation_fails_fast_without_verify_token() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("whatsapp.verify_token")
        );
        ensure(has_message, "validation failure should mention whatsapp.verify_token")
    }

    #[test]
    fn validation_rejects_unknown_default_tenant() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                verify_token: Some("verify".to_string()),
                default_tenant: Some("missing".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("default_tenant")
        );
        ensure(has_message, "validation failure should mention default_tenant")
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COMANDA_WHATSAPP_VERIFY_TOKEN", "verify-secret-value");
        env::set_var("COMANDA_WHATSAPP_ACCESS_TOKEN", "access-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("verify-secret-value"),
                "debug output should not contain verify token",
            )?;
            ensure(
                !debug.contains("access-secret-value"),
                "debug output should not contain access token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["COMANDA_WHATSAPP_VERIFY_TOKEN", "COMANDA_WHATSAPP_ACCESS_TOKEN"]);
        result
    }
}
