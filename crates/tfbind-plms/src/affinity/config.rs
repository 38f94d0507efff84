use serde::{Deserialize, Serialize};
use std::path::Path;
use tfbind_core::{Result, TfBindError};

/// Hyperparameters of the TF-DNA regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TFBindingConfig {
    /// Rows of the TF embedding (ESM-2 hidden size).
    pub embedding_dim: usize,
    pub dna_channels: usize,
    pub tf_channels: usize,
    /// Odd width of the DNA motif filters.
    pub kernel_size: usize,
    pub hidden_dim: usize,
}

impl Default for TFBindingConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 2560,
            dna_channels: 128,
            tf_channels: 128,
            kernel_size: 9,
            hidden_dim: 256,
        }
    }
}

impl TFBindingConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TfBindError::ArtifactNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| TfBindError::data_unavailable(path, e))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| TfBindError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.kernel_size % 2 == 0 {
            return Err(TfBindError::Config(format!(
                "kernel_size must be odd, got {}",
                self.kernel_size
            )));
        }
        let dims = [
            self.embedding_dim,
            self.dna_channels,
            self.tf_channels,
            self.hidden_dim,
        ];
        if dims.contains(&0) {
            return Err(TfBindError::Config("model dimensions must be non-zero".into()));
        }
        Ok(())
    }
}
