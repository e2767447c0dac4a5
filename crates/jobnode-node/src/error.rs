//! Node process errors.

use thiserror::Error;

use jobnode_core::{BoxError, CoreError};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Failed to fetch market. {source}")]
    MarketFetch {
        #[source]
        source: BoxError,
    },

    #[error("Failed to load config '{path}': {reason}")]
    Config { path: String, reason: String },

    #[error("Failed to read job definition from '{location}': {reason}")]
    JobSource { location: String, reason: String },

    #[error("Wallet {0} is compromised and has been quarantined")]
    WalletCompromised(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Invalid port '{0}'")]
    InvalidPort(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_fetch_prefix() {
        let err = NodeError::MarketFetch {
            source: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "Failed to fetch market. connection refused");
    }
}
