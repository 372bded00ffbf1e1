use serde::Deserialize;

use crate::payload::PayloadSchema;

/// Top-level configuration settings for the application.
///
/// Includes settings for the server, the relay and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub relay: RelaySettings,
    pub log: LogSettings,
}

/// Defines the host and port the server will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Relay behavior: how `new_message` payloads are validated and whether a
/// publisher receives its own broadcasts.
#[derive(Debug, Deserialize, Clone)]
pub struct RelaySettings {
    pub payload_schema: PayloadSchema,
    pub echo_to_sender: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub relay: Option<PartialRelaySettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialRelaySettings {
    pub payload_schema: Option<PayloadSchema>,
    pub echo_to_sender: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "localhost".to_string(),
                port: 8765,
            },
            relay: RelaySettings {
                payload_schema: PayloadSchema::Opaque,
                echo_to_sender: true,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl PartialSettings {
    /// Merge over `default`, field by field.
    pub fn merge(self, default: Settings) -> Settings {
        let server = self.server;
        let relay = self.relay;
        let log = self.log;

        Settings {
            server: ServerSettings {
                host: server
                    .as_ref()
                    .and_then(|s| s.host.clone())
                    .unwrap_or(default.server.host),
                port: server
                    .as_ref()
                    .and_then(|s| s.port)
                    .unwrap_or(default.server.port),
            },
            relay: RelaySettings {
                payload_schema: relay
                    .as_ref()
                    .and_then(|r| r.payload_schema)
                    .unwrap_or(default.relay.payload_schema),
                echo_to_sender: relay
                    .as_ref()
                    .and_then(|r| r.echo_to_sender)
                    .unwrap_or(default.relay.echo_to_sender),
            },
            log: LogSettings {
                level: log
                    .and_then(|l| l.level)
                    .unwrap_or(default.log.level),
            },
        }
    }
}
