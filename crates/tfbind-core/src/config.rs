//! Application configuration.
//!
//! Loaded from a JSON file and then overridden by command line flags. Every
//! path the pipeline touches comes from here; nothing is hard coded.
use crate::device::DevicePreference;
use crate::error::{Result, TfBindError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_EMBEDDING_KEY: &str = "representations";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TfBindConfig {
    pub device: DevicePreference,
    /// Protein language model. `None` disables on-the-fly embedding.
    pub esm: Option<EsmSettings>,
    pub affinity: AffinitySettings,
    /// Directory of precomputed per-TF embedding artifacts.
    pub embedding_root: PathBuf,
    /// Tensor name inside each embedding artifact.
    pub embedding_key: String,
    /// Layer read from `.pt` artifacts that index representations by layer.
    pub embedding_layer: Option<usize>,
    /// Directory of per-chromosome FASTA files.
    pub genome_root: PathBuf,
}

impl Default for TfBindConfig {
    fn default() -> Self {
        Self {
            device: DevicePreference::Auto,
            esm: None,
            affinity: AffinitySettings::default(),
            embedding_root: PathBuf::from("."),
            embedding_key: DEFAULT_EMBEDDING_KEY.to_string(),
            embedding_layer: None,
            genome_root: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EsmSettings {
    /// Published checkpoint id, e.g. `"3B"`. Fetched through the HF hub.
    pub model: Option<String>,
    /// Local directory with `config.json` and `model.safetensors`. Wins over `model`.
    pub dir: Option<PathBuf>,
    /// Representation layer; defaults to the last layer of the model.
    pub repr_layer: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AffinitySettings {
    /// `.safetensors` or `.pt` weights of the regression model.
    pub weights: Option<PathBuf>,
    /// JSON model config. Defaults apply when absent.
    pub config: Option<PathBuf>,
}

impl TfBindConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TfBindError::ArtifactNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| TfBindError::data_unavailable(path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| TfBindError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Checks that can be done without touching model files.
    pub fn validate(&self) -> Result<()> {
        if self.affinity.weights.is_none() {
            return Err(TfBindError::Config(
                "affinity.weights must point to the regression model weights".to_string(),
            ));
        }
        if self.embedding_key.is_empty() {
            return Err(TfBindError::Config("embedding_key is empty".to_string()));
        }
        if let Some(esm) = &self.esm {
            if esm.model.is_none() && esm.dir.is_none() {
                return Err(TfBindError::Config(
                    "esm requires either `model` or `dir`".to_string(),
                ));
            }
        }
        Ok(())
    }
}
