//! Container volume presence check.

use serde::{Deserialize, Serialize};

/// A volume as reported by the container runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeInfo {
    pub name: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub mountpoint: String,
}

impl VolumeInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver: "local".to_string(),
            mountpoint: String::new(),
        }
    }
}

/// True iff `volumes` contains a volume whose name is exactly `name`.
pub fn has_docker_volume(name: &str, volumes: &[VolumeInfo]) -> bool {
    volumes.iter().any(|v| v.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list() {
        assert!(!has_docker_volume("data", &[]));
    }

    #[test]
    fn test_exact_case_sensitive_match() {
        let volumes = vec![VolumeInfo::named("data"), VolumeInfo::named("cache")];
        assert!(has_docker_volume("data", &volumes));
        assert!(!has_docker_volume("Data", &volumes));
        assert!(!has_docker_volume("dat", &volumes));
    }

    #[test]
    fn test_runtime_json_shape() {
        let volume: VolumeInfo = serde_json::from_str(
            r#"{"Name":"models","Driver":"local","Mountpoint":"/var/lib/docker/volumes/models/_data"}"#,
        )
        .unwrap();
        assert!(has_docker_volume("models", &[volume]));
    }
}
