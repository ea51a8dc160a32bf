use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Path segment the OData service is mounted under, without slashes
    pub root: String,
    /// Idle time after which a session and its data are dropped
    pub session_ttl_secs: u64,
    pub session_cookie: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            root: "odata".to_string(),
            session_ttl_secs: 3600,
            session_cookie: "ODATA_SESSION".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional `config` file and the environment
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(config::File::with_name("config").required(false));

        // ODATA_SERVER__PORT, ODATA_SERVICE__SESSION_TTL_SECS, ...
        config = config.add_source(
            config::Environment::with_prefix("ODATA")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = config.build()?;
        let mut app_config: AppConfig = config.try_deserialize()?;
        app_config.service.root = app_config.service.root.trim_matches('/').to_string();

        Ok(app_config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.service.session_ttl_secs)
    }
}
