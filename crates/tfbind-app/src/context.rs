//! Loaded models and data stores shared by every orchestrator call.
use candle_core::{Device, Tensor};
use tfbind_core::encoding::normalize_dna_input;
use tfbind_core::{
    device, encode_dna, normalize_embedding, EmbeddingStore, GenomeStore, Result, TfBindConfig,
    TfBindError,
};
use tfbind_plms::{predict_affinity, AffinityModel, EsmEmbedder, TFBindingConfig, TFBindingModel};

/// Result of scoring a protein sequence against a DNA window.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub affinity: f32,
    /// `(E, 100)`; reusable for comparisons and scans with the same TF.
    pub tf_embedding: Tensor,
}

pub struct TfBindContext {
    embedder: Option<EsmEmbedder>,
    affinity: TFBindingModel,
    embeddings: EmbeddingStore,
    genome: GenomeStore,
}

impl TfBindContext {
    pub fn new(
        embedder: Option<EsmEmbedder>,
        affinity: TFBindingModel,
        embeddings: EmbeddingStore,
        genome: GenomeStore,
    ) -> Self {
        Self {
            embedder,
            affinity,
            embeddings,
            genome,
        }
    }

    /// Select the device, then load the regression model and (if configured) ESM-2.
    pub fn from_config(config: &TfBindConfig) -> Result<Self> {
        config.validate()?;
        let device = device(config.device)?;

        let model_config = match &config.affinity.config {
            Some(path) => TFBindingConfig::from_file(path)?,
            None => TFBindingConfig::default(),
        };
        let weights = config
            .affinity
            .weights
            .as_ref()
            .ok_or_else(|| TfBindError::Config("affinity.weights is not set".to_string()))?;
        let affinity = TFBindingModel::load_weights(weights, &model_config, &device)?;

        let embedder = match &config.esm {
            Some(esm) => Some(EsmEmbedder::from_settings(esm, &device)?),
            None => None,
        };
        if let Some(embedder) = &embedder {
            if embedder.embedding_dim() != model_config.embedding_dim {
                return Err(TfBindError::Config(format!(
                    "ESM-2 width {} does not match affinity model embedding_dim {}",
                    embedder.embedding_dim(),
                    model_config.embedding_dim
                )));
            }
        }

        Ok(Self::new(
            embedder,
            affinity,
            EmbeddingStore::new(&config.embedding_root, &config.embedding_key, device)
                .with_layer(config.embedding_layer),
            GenomeStore::new(&config.genome_root),
        ))
    }

    pub fn device(&self) -> &Device {
        self.affinity.device()
    }

    pub fn affinity_model(&self) -> &TFBindingModel {
        &self.affinity
    }

    pub fn embeddings(&self) -> &EmbeddingStore {
        &self.embeddings
    }

    pub fn genome(&self) -> &GenomeStore {
        &self.genome
    }

    pub fn embedder(&self) -> Result<&EsmEmbedder> {
        self.embedder.as_ref().ok_or_else(|| {
            TfBindError::ModelUnavailable("no protein language model configured".to_string())
        })
    }

    /// `(E, 100)` TF embedding for an amino-acid sequence.
    pub fn embed_protein(&self, protein: &str) -> Result<Tensor> {
        self.embedder()?.extract_embedding(protein.trim())
    }

    /// `(E, 100)` TF embedding from an on-disk artifact.
    pub fn embedding_from_artifact(&self, path: &std::path::Path) -> Result<Tensor> {
        let per_residue = tfbind_core::load_embedding_artifact(
            path,
            self.embeddings.key(),
            self.embeddings.layer(),
            self.device(),
        )?;
        Ok(normalize_embedding(&per_residue)?)
    }

    /// Score a prepared TF embedding against free-text DNA input.
    pub fn predict(&self, tf_embedding: &Tensor, dna: &str) -> Result<f32> {
        let dna = normalize_dna_input(dna);
        let onehot = encode_dna(&dna, self.device())?;
        predict_affinity(tf_embedding, &onehot, &self.affinity)
    }

    pub fn predict_from_sequence(&self, protein: &str, dna: &str) -> Result<Prediction> {
        let tf_embedding = self.embed_protein(protein)?;
        let affinity = self.predict(&tf_embedding, dna)?;
        tracing::info!("Predicted binding {:.4}", affinity);
        Ok(Prediction {
            affinity,
            tf_embedding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{tiny_context, TINY_EMBEDDING_DIM};
    use tfbind_test_data::EXAMPLE_DNA;

    #[test]
    fn test_predict_with_prepared_embedding() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let ctx = tiny_context(dir.path())?;
        let tf = Tensor::rand(0f32, 1f32, (TINY_EMBEDDING_DIM, 100), &Device::Cpu)?;
        let a = ctx.predict(&tf, EXAMPLE_DNA)?;
        // free-text input is normalized before encoding
        let b = ctx.predict(&tf, &format!("  {}\n", EXAMPLE_DNA.to_uppercase()))?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_invalid_dna() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let ctx = tiny_context(dir.path())?;
        let tf = Tensor::zeros((TINY_EMBEDDING_DIM, 100), candle_core::DType::F32, &Device::Cpu)?;
        assert!(matches!(
            ctx.predict(&tf, "acgx"),
            Err(TfBindError::Encoding(_))
        ));
        Ok(())
    }

    #[test]
    fn test_no_embedder() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let ctx = tiny_context(dir.path())?;
        assert!(matches!(
            ctx.predict_from_sequence("MKT", EXAMPLE_DNA),
            Err(TfBindError::ModelUnavailable(_))
        ));
        Ok(())
    }

    #[test]
    fn test_from_config_requires_weights() {
        let config = TfBindConfig::default();
        assert!(matches!(
            TfBindContext::from_config(&config),
            Err(TfBindError::Config(_))
        ));
    }
}
