//! Core domain errors.

use thiserror::Error;

use crate::NodeAddress;

/// Core domain errors for jobnode.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A session for this node address is already running in this process.
    #[error("Node already active for address {0}")]
    NodeAlreadyActive(NodeAddress),

    /// Job definition could not be parsed.
    #[error("Invalid job definition: {0}")]
    InvalidJobDefinition(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_active_names_address() {
        let err = CoreError::NodeAlreadyActive(NodeAddress::new("node-a"));
        assert_eq!(err.to_string(), "Node already active for address node-a");
    }
}
