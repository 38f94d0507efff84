//! Published ESM-2 checkpoints on the HuggingFace hub.
use super::config::ESM2Config;
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::path::PathBuf;
use strum::{Display, EnumIter, EnumString};
use tfbind_core::{Result, TfBindError};

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum EsmModels {
    #[strum(serialize = "8M")]
    ESM2_T6_8M,
    #[strum(serialize = "35M")]
    ESM2_T12_35M,
    #[strum(serialize = "150M")]
    ESM2_T30_150M,
    #[strum(serialize = "650M")]
    ESM2_T33_650M,
    #[strum(serialize = "3B")]
    ESM2_T36_3B,
    #[strum(serialize = "15B")]
    ESM2_T48_15B,
}

impl EsmModels {
    pub fn repo_id(&self) -> &'static str {
        match self {
            EsmModels::ESM2_T6_8M => "facebook/esm2_t6_8M_UR50D",
            EsmModels::ESM2_T12_35M => "facebook/esm2_t12_35M_UR50D",
            EsmModels::ESM2_T30_150M => "facebook/esm2_t30_150M_UR50D",
            EsmModels::ESM2_T33_650M => "facebook/esm2_t33_650M_UR50D",
            EsmModels::ESM2_T36_3B => "facebook/esm2_t36_3B_UR50D",
            EsmModels::ESM2_T48_15B => "facebook/esm2_t48_15B_UR50D",
        }
    }

    /// Architecture of the checkpoint; matches the hub `config.json`.
    pub fn config(&self) -> ESM2Config {
        match self {
            EsmModels::ESM2_T6_8M => ESM2Config::esm2_t6_8m(),
            EsmModels::ESM2_T12_35M => ESM2Config::esm2_t12_35m(),
            EsmModels::ESM2_T30_150M => ESM2Config::esm2_t30_150m(),
            EsmModels::ESM2_T33_650M => ESM2Config::esm2_t33_650m(),
            EsmModels::ESM2_T36_3B => ESM2Config::esm2_t36_3b(),
            EsmModels::ESM2_T48_15B => ESM2Config::esm2_t48_15b(),
        }
    }

    /// Reject a downloaded `config.json` that does not describe this checkpoint.
    pub fn check_config(&self, config: &ESM2Config) -> Result<()> {
        let expected = self.config();
        let shape = |c: &ESM2Config| (c.num_hidden_layers, c.hidden_size, c.num_attention_heads);
        if shape(config) != shape(&expected) {
            return Err(TfBindError::ModelUnavailable(format!(
                "{}: config.json has (layers, width, heads) {:?}, expected {:?}",
                self.repo_id(),
                shape(config),
                shape(&expected)
            )));
        }
        Ok(())
    }

    /// Download (or reuse the cached) `config.json` and `model.safetensors`.
    pub fn fetch(&self) -> Result<(PathBuf, PathBuf)> {
        let unavailable = |e: hf_hub::api::sync::ApiError| {
            TfBindError::ModelUnavailable(format!("{}: {}", self.repo_id(), e))
        };
        let repo = Repo::with_revision(
            self.repo_id().to_string(),
            RepoType::Model,
            "main".to_string(),
        );
        let api = Api::new().map_err(unavailable)?;
        let api = api.repo(repo);
        tracing::info!("Fetching {} from the HF hub", self.repo_id());
        let config = api.get("config.json").map_err(unavailable)?;
        let weights = api.get("model.safetensors").map_err(unavailable)?;
        Ok((config, weights))
    }
}
