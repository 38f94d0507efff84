pub mod compare;
pub mod embed;
pub mod predict;
pub mod scan;

use crate::cli::{ContextArgs, TfArgs};
use anyhow::Context;
use candle_core::Tensor;
use serde::Serialize;
use tfbind_app::TfBindContext;
use tfbind_core::TfBindConfig;

impl ContextArgs {
    /// Config file (or defaults) with command line overrides applied.
    pub fn to_config(&self) -> anyhow::Result<TfBindConfig> {
        let mut config = match &self.config {
            Some(path) => TfBindConfig::from_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => TfBindConfig::default(),
        };
        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(weights) = &self.weights {
            config.affinity.weights = Some(weights.clone());
        }
        if let Some(model_config) = &self.model_config {
            config.affinity.config = Some(model_config.clone());
        }
        if self.esm_model.is_some() || self.esm_dir.is_some() || self.repr_layer.is_some() {
            let esm = config.esm.get_or_insert_with(Default::default);
            if let Some(model) = &self.esm_model {
                esm.model = Some(model.clone());
            }
            if let Some(dir) = &self.esm_dir {
                esm.dir = Some(dir.clone());
            }
            if let Some(layer) = self.repr_layer {
                esm.repr_layer = Some(layer);
            }
        }
        if let Some(root) = &self.embedding_root {
            config.embedding_root = root.clone();
        }
        if let Some(key) = &self.embedding_key {
            config.embedding_key = key.clone();
        }
        if let Some(layer) = self.embedding_layer {
            config.embedding_layer = Some(layer);
        }
        if let Some(root) = &self.genome_root {
            config.genome_root = root.clone();
        }
        Ok(config)
    }

    /// Load the context. The protein LM is skipped when `tf` brings its own embedding.
    pub fn load_context(&self, tf: Option<&TfArgs>) -> anyhow::Result<TfBindContext> {
        let mut config = self.to_config()?;
        if tf.is_some_and(|tf| tf.embedding.is_some()) {
            config.esm = None;
        }
        Ok(TfBindContext::from_config(&config)?)
    }
}

impl TfArgs {
    /// `(E, 100)` TF embedding.
    pub fn resolve(&self, ctx: &TfBindContext) -> anyhow::Result<Tensor> {
        match (&self.embedding, &self.protein) {
            (Some(path), _) => ctx
                .embedding_from_artifact(path)
                .with_context(|| format!("loading embedding {}", path.display())),
            (None, Some(protein)) => Ok(ctx.embed_protein(protein)?),
            (None, None) => anyhow::bail!("either --protein or --embedding is required"),
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
