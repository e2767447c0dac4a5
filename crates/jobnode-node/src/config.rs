//! Node configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::NodeError;

/// Node configuration, loaded from the JSON file given to `job serve --config`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node address: hex-encoded ed25519 public key of the node owner.
    pub address: String,

    /// Host the HTTP/WS server binds to.
    pub host: String,

    /// Hex public key of the backend service, if one may drive this node.
    pub backend_signer: Option<String>,

    /// Message every signer signs.
    pub auth_message: String,

    /// Base URL of the market lookup service.
    pub market_api: String,

    /// Credential file of the node, checked against `compromised_keys` at startup.
    pub wallet_path: Option<PathBuf>,

    /// Hex public keys known to be compromised.
    pub compromised_keys: Vec<String>,

    /// Capacity of the state event channel feeding WebSocket subscribers.
    pub event_buffer: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            host: "0.0.0.0".to_string(),
            backend_signer: None,
            auth_message: "jobnode-auth".to_string(),
            market_api: "http://localhost:3000".to_string(),
            wallet_path: None,
            compromised_keys: Vec::new(),
            event_buffer: 256,
        }
    }
}

impl NodeConfig {
    fn read(path: &Path) -> Result<Self, NodeError> {
        let raw = std::fs::read_to_string(path).map_err(|e| NodeError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| NodeError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Read and parse a node config file. The address is required.
    pub fn from_file(path: &Path) -> Result<Self, NodeError> {
        let config = Self::read(path)?;
        if config.address.trim().is_empty() {
            return Err(NodeError::Config {
                path: path.display().to_string(),
                reason: "address must be set".to_string(),
            });
        }
        Ok(config)
    }

    /// Market API base URL for market commands.
    ///
    /// An explicit `--api` wins, then `market_api` from the config file,
    /// then the default. The config file need not carry an address here.
    pub fn market_api_for(api: Option<String>, config_path: Option<&Path>) -> Result<String, NodeError> {
        if let Some(api) = api {
            return Ok(api);
        }
        let config = match config_path {
            Some(path) => Self::read(path)?,
            None => Self::default(),
        };
        Ok(config.market_api)
    }
}
