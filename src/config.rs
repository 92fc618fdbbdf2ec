//! Bot configuration loading: connection settings, command prefix, and the
//! per-module configuration blocks.

use std::{env, fs, path::PathBuf};

use anyhow::Context;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::info;

/// Default location on disk where the bot looks for its JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "etc/config.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SCOUTIX_CONFIG_PATH";

/// Immutable runtime configuration for the whole bot.
///
/// Loading is fatal on a missing or malformed file: the bot never starts
/// with partial settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Connection settings consumed by the chat transport.
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Single character that introduces a command.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: char,
    /// Raw per-module configuration blocks, keyed by module name, in
    /// declaration order. Each module parses its own block.
    #[serde(default)]
    pub modules: IndexMap<String, serde_json::Value>,
}

/// Connection settings for the chat network.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Server host to connect to.
    #[serde(default = "default_server")]
    pub server: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The bot's own identity; inbound messages from it are filtered.
    #[serde(default = "default_nick")]
    pub nick: String,
    /// Whether to use TLS for the connection.
    #[serde(default)]
    pub tls: bool,
    /// Whether to verify the server certificate.
    #[serde(default)]
    pub tls_verify: bool,
    /// Channels to join on connect.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Optional SASL credentials.
    #[serde(default)]
    pub sasl: Option<SaslConfig>,
}

/// SASL authentication credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct SaslConfig {
    /// Username for SASL authentication.
    pub username: String,
    /// Password for SASL authentication.
    pub password: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            nick: default_nick(),
            tls: false,
            tls_verify: false,
            channels: Vec::new(),
            sasl: None,
        }
    }
}

impl BotConfig {
    /// Load the bot configuration from disk, taking the environment override
    /// into account.
    pub fn load() -> anyhow::Result<Self> {
        let path = resolve_config_path();
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read the config file `{}`", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("config file `{}` is malformed", path.display()))?;
        info!(
            path = %path.display(),
            nick = %config.connection.nick,
            modules = config.modules.len(),
            "loaded bot configuration"
        );
        Ok(config)
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_command_prefix() -> char {
    '!'
}

fn default_server() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    6667
}

fn default_nick() -> String {
    "scoutix".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_configuration() {
        let config: BotConfig = serde_json::from_str(
            r##"{
                "connection": {
                    "server": "irc.example.org",
                    "port": 6697,
                    "nick": "quizbot",
                    "tls": true,
                    "tls_verify": true,
                    "channels": ["#quiz"],
                    "sasl": {"username": "quizbot", "password": "hunter2"}
                },
                "command_prefix": "?",
                "modules": {"Quiz": {"Games": {"#quiz": "general"}}}
            }"##,
        )
        .unwrap();

        assert_eq!(config.connection.server, "irc.example.org");
        assert_eq!(config.connection.port, 6697);
        assert!(config.connection.tls_verify);
        assert_eq!(config.command_prefix, '?');
        assert_eq!(config.connection.sasl.unwrap().username, "quizbot");
        assert!(config.modules.contains_key("Quiz"));
    }

    #[test]
    fn applies_defaults_for_missing_fields() {
        let config: BotConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.connection.server, "localhost");
        assert_eq!(config.connection.port, 6667);
        assert_eq!(config.connection.nick, "scoutix");
        assert!(!config.connection.tls);
        assert_eq!(config.command_prefix, '!');
        assert!(config.modules.is_empty());
    }
}
