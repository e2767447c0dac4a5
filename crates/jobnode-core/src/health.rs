//! Health-check payload reported for exposed services.

use serde::{Deserialize, Serialize};

/// Port of an exposed service, either numeric or a named/templated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Port {
    Number(u16),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub id: String,
    pub flow_id: String,
    pub port: Port,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}
