use crate::context::TfBindContext;
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use std::path::{Path, PathBuf};
use tfbind_core::config::DEFAULT_EMBEDDING_KEY;
use tfbind_core::{save_embedding_artifact, EmbeddingStore, GenomeStore};
use tfbind_plms::{TFBindingConfig, TFBindingModel};

pub const TINY_EMBEDDING_DIM: usize = 16;

pub fn tiny_config() -> TFBindingConfig {
    TFBindingConfig {
        embedding_dim: TINY_EMBEDDING_DIM,
        dna_channels: 8,
        tf_channels: 8,
        kernel_size: 5,
        hidden_dim: 12,
    }
}

/// Randomly initialised model, no protein LM; artifacts and genome under `root`.
pub fn tiny_context(root: &Path) -> anyhow::Result<TfBindContext> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let model = TFBindingModel::load(vb, &tiny_config())?;
    Ok(TfBindContext::new(
        None,
        model,
        EmbeddingStore::new(root, DEFAULT_EMBEDDING_KEY, Device::Cpu),
        GenomeStore::new(root),
    ))
}

/// Random `(dim, len)` embedding saved as `{root}/{name}.safetensors`.
pub fn write_artifact(root: &Path, name: &str, len: usize, dim: usize) -> anyhow::Result<PathBuf> {
    let path = root.join(format!("{name}.safetensors"));
    let embedding = Tensor::rand(0f32, 1f32, (dim, len), &Device::Cpu)?;
    save_embedding_artifact(&embedding, DEFAULT_EMBEDDING_KEY, &path)?;
    Ok(path)
}
