use config::ConfigError;
use serde::Deserialize;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub broker: BrokerSettings,
}

/// Where the TCP listener binds.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// The single shared credential pair.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub enabled: bool,
    pub username: String,
    pub password: String,
}

/// Resource bounds for connections and per-client delivery.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    pub max_connections: usize,
    pub outbound_queue_capacity: usize,
    pub max_frame_length: usize,
    pub write_timeout_ms: u64,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub auth: Option<PartialAuthSettings>,
    pub broker: Option<PartialBrokerSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialAuthSettings {
    pub enabled: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialBrokerSettings {
    pub max_connections: Option<usize>,
    pub outbound_queue_capacity: Option<usize>,
    pub max_frame_length: Option<usize>,
    pub write_timeout_ms: Option<u64>,
}

impl Settings {
    /// The `host:port` string the listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Override host and port from a `host:port` string. An empty host
    /// (`:8083`) means every interface.
    pub fn set_listen_addr(&mut self, addr: &str) -> Result<(), ConfigError> {
        let invalid = || {
            ConfigError::Message(format!(
                "invalid listen address '{addr}', expected host:port"
            ))
        };
        let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
        self.server.port = port.parse().map_err(|_| invalid())?;
        self.server.host = if host.is_empty() {
            "0.0.0.0".to_string()
        } else {
            host.to_string()
        };
        Ok(())
    }

    /// Fill every field the partial settings leave out from the defaults.
    pub fn merge(partial: PartialSettings) -> Self {
        let default = Settings::default();
        let server = partial.server.unwrap_or_default();
        let auth = partial.auth.unwrap_or_default();
        let broker = partial.broker.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(default.server.host),
                port: server.port.unwrap_or(default.server.port),
            },
            auth: AuthSettings {
                enabled: auth.enabled.unwrap_or(default.auth.enabled),
                username: auth.username.unwrap_or(default.auth.username),
                password: auth.password.unwrap_or(default.auth.password),
            },
            broker: BrokerSettings {
                max_connections: broker
                    .max_connections
                    .unwrap_or(default.broker.max_connections),
                outbound_queue_capacity: broker
                    .outbound_queue_capacity
                    .unwrap_or(default.broker.outbound_queue_capacity),
                max_frame_length: broker
                    .max_frame_length
                    .unwrap_or(default.broker.max_frame_length),
                write_timeout_ms: broker
                    .write_timeout_ms
                    .unwrap_or(default.broker.write_timeout_ms),
            },
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "localhost".to_string(),
                port: 8083,
            },
            auth: AuthSettings {
                enabled: false,
                username: "user".to_string(),
                password: "pass".to_string(),
            },
            broker: BrokerSettings {
                max_connections: 1000,
                outbound_queue_capacity: 256,
                max_frame_length: 64 * 1024,
                write_timeout_ms: 5000,
            },
        }
    }
}
