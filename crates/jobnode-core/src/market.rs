//! Market listing types and the lookup seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Boxed error returned by market sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// On-chain listing a node or job negotiates against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub address: String,
    pub authority: String,
    pub job_expiration: u64,
    pub job_price: u64,
    pub job_timeout: u64,
    pub job_type: u8,
    pub vault: String,
    pub vault_bump: u8,
    pub node_access_key: String,
    pub node_xnos_minimum: u64,
    pub queue_type: u8,
    #[serde(default)]
    pub queue: Vec<String>,
}

impl Market {
    /// Number of entries waiting in the market queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

/// External service that can be asked for markets and may fail.
#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn get_market(&self, id: &str) -> Result<Market, BoxError>;

    async fn list_markets(&self) -> Result<Vec<Market>, BoxError>;
}
