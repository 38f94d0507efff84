//! Protein sequence -> fixed-width TF embedding.
use super::config::ESM2Config;
use super::model::ESM2;
use super::pretrained::EsmModels;
use super::tokenizer::EsmTokenizer;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use std::path::Path;
use std::str::FromStr;
use tfbind_core::{normalize_embedding, EsmSettings, Result, TfBindError};

/// ESM-2 model plus tokenizer, reading one representation layer.
pub struct EsmEmbedder {
    model: ESM2,
    tokenizer: EsmTokenizer,
    repr_layer: usize,
}

impl EsmEmbedder {
    /// `repr_layer` defaults to the last layer.
    pub fn new(model: ESM2, tokenizer: EsmTokenizer, repr_layer: Option<usize>) -> Result<Self> {
        let num_layers = model.config().num_hidden_layers;
        let repr_layer = repr_layer.unwrap_or(num_layers);
        if repr_layer > num_layers {
            return Err(TfBindError::Config(format!(
                "repr_layer {repr_layer} exceeds the {num_layers} layers of the model"
            )));
        }
        Ok(Self {
            model,
            tokenizer,
            repr_layer,
        })
    }

    /// Local `dir` if set, otherwise the published checkpoint named by `model`.
    pub fn from_settings(esm: &EsmSettings, device: &Device) -> Result<Self> {
        if let Some(dir) = &esm.dir {
            return Self::load_local(dir, esm.repr_layer, device);
        }
        let name = esm.model.as_deref().ok_or_else(|| {
            TfBindError::Config("esm requires either `model` or `dir`".to_string())
        })?;
        let model = EsmModels::from_str(name)
            .map_err(|_| TfBindError::Config(format!("unknown ESM-2 model {name:?}")))?;
        Self::load_pretrained(model, esm.repr_layer, device)
    }

    /// Load from a directory holding `config.json` and `model.safetensors`.
    pub fn load_local<P: AsRef<Path>>(
        dir: P,
        repr_layer: Option<usize>,
        device: &Device,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        let weights_path = dir.join("model.safetensors");
        let config = read_config(&dir.join("config.json"))?;
        Self::load_weights(config, &weights_path, repr_layer, device)
    }

    pub fn load_pretrained(
        model: EsmModels,
        repr_layer: Option<usize>,
        device: &Device,
    ) -> Result<Self> {
        let (config_path, weights_path) = model.fetch()?;
        let config = read_config(&config_path)?;
        model.check_config(&config)?;
        Self::load_weights(config, &weights_path, repr_layer, device)
    }

    fn load_weights(
        config: ESM2Config,
        weights_path: &Path,
        repr_layer: Option<usize>,
        device: &Device,
    ) -> Result<Self> {
        if !weights_path.is_file() {
            return Err(TfBindError::ModelUnavailable(format!(
                "missing {}",
                weights_path.display()
            )));
        }
        tracing::info!(
            "Loading ESM-2 ({} layers, width {}) from {}",
            config.num_hidden_layers,
            config.hidden_size,
            weights_path.display()
        );
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)? };
        let model = ESM2::load(vb, &config)?;
        Self::new(model, EsmTokenizer::load()?, repr_layer)
    }

    pub fn embedding_dim(&self) -> usize {
        self.model.config().hidden_size
    }

    pub fn repr_layer(&self) -> usize {
        self.repr_layer
    }

    pub fn device(&self) -> &Device {
        self.model.get_device()
    }

    /// `(E, len + 2)` representation with one column per token, `<cls>` and
    /// `<eos>` included.
    pub fn token_embedding(&self, sequence: &str) -> Result<Tensor> {
        let tokens = self.tokenizer.encode(sequence)?;
        tracing::debug!(
            "Embedding {} residues ({} non-padding tokens)",
            tokens.residue_count(),
            tokens.non_padding
        );
        let token_ids = Tensor::new(tokens.ids.as_slice(), self.device())?.unsqueeze(0)?;
        let mut output = self.model.forward(&token_ids, &[self.repr_layer])?;
        let representation = output
            .representations
            .remove(&self.repr_layer)
            .ok_or_else(|| {
                TfBindError::ModelUnavailable(format!("layer {} not produced", self.repr_layer))
            })?;
        Ok(representation.get(0)?.t()?.contiguous()?)
    }

    /// `(E, 100)` embedding ready for the affinity model.
    pub fn extract_embedding(&self, sequence: &str) -> Result<Tensor> {
        let tokens = self.token_embedding(sequence)?;
        Ok(normalize_embedding(&tokens)?)
    }
}

fn read_config(path: &Path) -> Result<ESM2Config> {
    if !path.is_file() {
        return Err(TfBindError::ModelUnavailable(format!(
            "missing {}",
            path.display()
        )));
    }
    let text =
        std::fs::read_to_string(path).map_err(|e| TfBindError::data_unavailable(path, e))?;
    serde_json::from_str(&text)
        .map_err(|e| TfBindError::Config(format!("{}: {}", path.display(), e)))
}
