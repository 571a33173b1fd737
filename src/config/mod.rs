//! Configuration types for the detection pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for cluster extraction and the human decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Lower bound of the vertical band kept after ground removal (meters)
    #[serde(default = "default_z_limit_min")]
    pub z_limit_min: f32,

    /// Upper bound of the vertical band kept after ceiling removal (meters)
    #[serde(default = "default_z_limit_max")]
    pub z_limit_max: f32,

    /// Minimum points per cluster (also gates whole regions)
    #[serde(default = "default_cluster_size_min")]
    pub cluster_size_min: usize,

    /// Maximum points per cluster
    #[serde(default = "default_cluster_size_max")]
    pub cluster_size_max: usize,

    /// Probability threshold for accepting a cluster as human
    #[serde(default = "default_human_probability")]
    pub human_probability: f64,

    /// Reject clusters whose bounding box falls outside human proportions
    #[serde(default)]
    pub human_size_limit: bool,
}

fn default_z_limit_min() -> f32 {
    -0.8
}

fn default_z_limit_max() -> f32 {
    1.2
}

fn default_cluster_size_min() -> usize {
    5
}

fn default_cluster_size_max() -> usize {
    30_000
}

fn default_human_probability() -> f64 {
    0.7
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            z_limit_min: default_z_limit_min(),
            z_limit_max: default_z_limit_max(),
            cluster_size_min: default_cluster_size_min(),
            cluster_size_max: default_cluster_size_max(),
            human_probability: default_human_probability(),
            human_size_limit: false,
        }
    }
}

/// Configuration for the classifier model and its scaling table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to a trained classifier model; when absent the pipeline runs
    /// model-free and accepts every geometrically valid cluster.
    #[serde(default)]
    pub model_file: Option<PathBuf>,

    /// Path to the libsvm-style feature range file used for rescaling.
    #[serde(default)]
    pub range_file: Option<PathBuf>,
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub model: ModelConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_detector_config() {
        let config = DetectorConfig::default();
        assert_eq!(config.z_limit_min, -0.8);
        assert_eq!(config.z_limit_max, 1.2);
        assert_eq!(config.cluster_size_min, 5);
        assert_eq!(config.cluster_size_max, 30_000);
        assert_eq!(config.human_probability, 0.7);
        assert!(!config.human_size_limit);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "detector:\n  human_probability: 0.5\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.detector.human_probability, 0.5);
        assert_eq!(config.detector.cluster_size_min, 5);
        assert!(config.model.model_file.is_none());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");

        let mut config = PipelineConfig::default();
        config.detector.human_size_limit = true;
        config.model.range_file = Some(PathBuf::from("pedestrian.range"));
        config.to_yaml(&path).unwrap();

        let loaded = PipelineConfig::from_yaml(&path).unwrap();
        assert!(loaded.detector.human_size_limit);
        assert_eq!(
            loaded.model.range_file,
            Some(PathBuf::from("pedestrian.range"))
        );
    }
}
