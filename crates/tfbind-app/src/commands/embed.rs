use super::print_json;
use crate::cli::ContextArgs;
use serde::Serialize;
use std::path::Path;
use tfbind_core::{device, save_embedding_artifact, TfBindError};
use tfbind_plms::EsmEmbedder;

#[derive(Serialize)]
struct EmbedOutput<'a> {
    output: &'a Path,
    /// Residues plus `<cls>` and `<eos>`.
    tokens: usize,
    embedding_dim: usize,
}

/// Only ESM-2 is loaded; the regression model is not needed here.
pub fn execute(args: &ContextArgs, protein: &str, output: &Path) -> anyhow::Result<()> {
    let config = args.to_config()?;
    let esm = config.esm.as_ref().ok_or_else(|| {
        TfBindError::ModelUnavailable("no protein language model configured".to_string())
    })?;
    let embedder = EsmEmbedder::from_settings(esm, &device(config.device)?)?;
    let embedding = embedder.token_embedding(protein.trim())?;
    let (embedding_dim, tokens) = embedding.dims2()?;
    save_embedding_artifact(&embedding, &config.embedding_key, output)?;
    tracing::info!("Wrote {}", output.display());
    print_json(&EmbedOutput {
        output,
        tokens,
        embedding_dim,
    })
}
