//! Loading job definitions from a local file or an HTTP(S) URL.

use tracing::debug;

use jobnode_core::JobDefinition;

use crate::error::NodeError;

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Read the raw definition text at `location`.
pub async fn read_job_source(location: &str) -> Result<String, NodeError> {
    let failed = |reason: String| NodeError::JobSource {
        location: location.to_string(),
        reason,
    };

    if is_url(location) {
        debug!(url = %location, "fetching job definition");
        let response = reqwest::get(location)
            .await
            .map_err(|e| failed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}")));
        }
        response.text().await.map_err(|e| failed(e.to_string()))
    } else {
        debug!(path = %location, "reading job definition");
        tokio::fs::read_to_string(location)
            .await
            .map_err(|e| failed(e.to_string()))
    }
}

/// Read and parse the definition at `location`. Validation is left to the caller.
pub async fn load_job_definition(location: &str) -> Result<JobDefinition, NodeError> {
    let raw = read_job_source(location).await?;
    Ok(JobDefinition::from_json(&raw)?)
}
