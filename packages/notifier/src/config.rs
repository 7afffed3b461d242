//! Notifier Configuration
//!
//! Each topic is enabled by giving it an endpoint address. Every option is
//! accepted under two names; when both are set the second one wins.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Prefix for configuration read from the process environment
pub const ENV_PREFIX: &str = "TXNSCOPE_";

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
}

/// The four topics the notifier can publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Block hash in display byte order
    HashBlock,
    /// Raw serialized block
    RawBlock,
    /// Transaction hash in display byte order
    HashTx,
    /// Raw serialized transaction
    RawTx,
}

impl Topic {
    /// All topics, in registration order
    pub const ALL: [Topic; 4] = [Topic::HashBlock, Topic::RawBlock, Topic::HashTx, Topic::RawTx];

    /// Topic name, also sent as the first frame of every message
    pub fn name(&self) -> &'static str {
        match self {
            Topic::HashBlock => "hashblock",
            Topic::RawBlock => "rawblock",
            Topic::HashTx => "hashtx",
            Topic::RawTx => "rawtx",
        }
    }

    /// Option names for this topic's address, lowest precedence first
    pub fn option_names(&self) -> [&'static str; 2] {
        match self {
            Topic::HashBlock => ["zmq-hashblock", "zmq-pub-hashblock"],
            Topic::RawBlock => ["zmq-rawblock", "zmq-pub-rawblock"],
            Topic::HashTx => ["zmq-hashtx", "zmq-pub-hashtx"],
            Topic::RawTx => ["zmq-rawtx", "zmq-pub-rawtx"],
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key/value lookup the configuration is read from
pub trait ConfigSource {
    /// Raw value for `key`, if set
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError>;

    /// First non-empty value among `keys`, searching from the last key back
    fn str(&self, keys: &[&str]) -> Result<Option<String>, ConfigError> {
        for key in keys.iter().rev() {
            if let Some(value) = self.get(key)? {
                let value = value.trim();
                if !value.is_empty() {
                    return Ok(Some(value.to_string()));
                }
            }
        }
        Ok(None)
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(HashMap::get(self, key).cloned())
    }
}

impl ConfigSource for serde_json::Value {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match serde_json::Value::get(self, key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a string, got {}", other),
            }),
        }
    }
}

/// Reads options from environment variables, e.g. `zmq-pub-rawtx` from
/// `TXNSCOPE_ZMQ_PUB_RAWTX`
#[derive(Debug, Clone, Default)]
pub struct EnvSource;

impl EnvSource {
    /// Environment variable name for an option
    pub fn var_name(key: &str) -> String {
        format!("{}{}", ENV_PREFIX, key.to_uppercase().replace('-', "_"))
    }
}

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let name = Self::var_name(key);
        match std::env::var(&name) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
                key: name,
                reason: "value is not valid UTF-8".to_string(),
            }),
        }
    }
}

/// Endpoint addresses for each topic. `None` disables the topic.
///
/// Serializes to the same options object `from_json` reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotifierConfig {
    #[serde(rename = "zmq-pub-hashblock", skip_serializing_if = "Option::is_none")]
    pub pub_hash_block: Option<String>,
    #[serde(rename = "zmq-pub-rawblock", skip_serializing_if = "Option::is_none")]
    pub pub_raw_block: Option<String>,
    #[serde(rename = "zmq-pub-hashtx", skip_serializing_if = "Option::is_none")]
    pub pub_hash_tx: Option<String>,
    #[serde(rename = "zmq-pub-rawtx", skip_serializing_if = "Option::is_none")]
    pub pub_raw_tx: Option<String>,
}

impl NotifierConfig {
    /// Resolve every topic's address from `source`
    pub fn from_source(source: &impl ConfigSource) -> Result<Self, ConfigError> {
        let lookup = |topic: Topic| -> Result<Option<String>, ConfigError> {
            Ok(source.str(&topic.option_names())?.map(|addr| expand_endpoint(&addr)))
        };

        let config = Self {
            pub_hash_block: lookup(Topic::HashBlock)?,
            pub_raw_block: lookup(Topic::RawBlock)?,
            pub_hash_tx: lookup(Topic::HashTx)?,
            pub_raw_tx: lookup(Topic::RawTx)?,
        };
        debug!(?config, "Resolved notifier configuration");
        Ok(config)
    }

    /// Read configuration from `TXNSCOPE_ZMQ_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&EnvSource)
    }

    /// Parse a JSON options object such as `{"zmq-pub-rawtx": "tcp://127.0.0.1:28333"}`
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(ConfigError::InvalidValue {
                key: "<root>".to_string(),
                reason: "expected a JSON object".to_string(),
            });
        }
        Self::from_source(&value)
    }

    /// Load a JSON options file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Render as a JSON options object
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Address configured for `topic`
    pub fn address(&self, topic: Topic) -> Option<&str> {
        let addr = match topic {
            Topic::HashBlock => &self.pub_hash_block,
            Topic::RawBlock => &self.pub_raw_block,
            Topic::HashTx => &self.pub_hash_tx,
            Topic::RawTx => &self.pub_raw_tx,
        };
        addr.as_deref().filter(|a| !a.is_empty())
    }

    /// Enabled topics and their addresses, in registration order
    pub fn enabled(&self) -> Vec<(Topic, &str)> {
        Topic::ALL
            .iter()
            .filter_map(|&topic| self.address(topic).map(|addr| (topic, addr)))
            .collect()
    }

    /// Whether no topic is enabled
    pub fn is_empty(&self) -> bool {
        self.enabled().is_empty()
    }
}

/// Expand a leading `~` in `ipc://` endpoints to the home directory
pub fn expand_endpoint(address: &str) -> String {
    if let Some(path) = address.strip_prefix("ipc://~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("ipc://{}/{}", home.to_string_lossy(), path);
        }
    }
    address.to_string()
}
