//! TF-DNA regression model.
//!
//! Two convolutional towers, one over the one-hot DNA window and one over the
//! fixed-width TF embedding, pooled and joined by a small MLP head that emits a
//! single log-scaled binding score.
use super::config::TFBindingConfig;
use candle_core::{DType, Device, Module, Result, Tensor, D};
use candle_nn::{conv1d, linear, Conv1d, Conv1dConfig, Linear, VarBuilder};
use std::path::Path;
use tfbind_core::{TfBindError, DNA_ALPHABET};

/// The seam between inference orchestration and a concrete network.
pub trait AffinityModel {
    /// Rows expected in the `(E, 100)` TF embedding.
    fn embedding_dim(&self) -> usize;
    fn device(&self) -> &Device;
    /// `dna`: `(b, 5, L)`, `tf`: `(b, E, 100)` -> `(b, 1)`.
    fn forward(&self, dna: &Tensor, tf: &Tensor) -> Result<Tensor>;
}

#[derive(Debug)]
pub struct TFBindingModel {
    dna_conv: Conv1d,
    tf_proj: Conv1d,
    fc1: Linear,
    fc2: Linear,
    config: TFBindingConfig,
    device: Device,
}

impl TFBindingModel {
    pub fn load(vb: VarBuilder, config: &TFBindingConfig) -> Result<Self> {
        let dna_conv = conv1d(
            DNA_ALPHABET.len(),
            config.dna_channels,
            config.kernel_size,
            Conv1dConfig {
                padding: config.kernel_size / 2,
                ..Default::default()
            },
            vb.pp("dna_conv"),
        )?;
        let tf_proj = conv1d(
            config.embedding_dim,
            config.tf_channels,
            1,
            Default::default(),
            vb.pp("tf_proj"),
        )?;
        let fc1 = linear(
            config.dna_channels + config.tf_channels,
            config.hidden_dim,
            vb.pp("head.fc1"),
        )?;
        let fc2 = linear(config.hidden_dim, 1, vb.pp("head.fc2"))?;
        Ok(Self {
            dna_conv,
            tf_proj,
            fc1,
            fc2,
            config: config.clone(),
            device: vb.device().clone(),
        })
    }

    /// Load weights from `.safetensors` (memory mapped) or a PyTorch `.pt`/`.pth` file.
    pub fn load_weights<P: AsRef<Path>>(
        path: P,
        config: &TFBindingConfig,
        device: &Device,
    ) -> tfbind_core::Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TfBindError::ArtifactNotFound(path.to_path_buf()));
        }
        let is_pth = path
            .extension()
            .is_some_and(|ext| ext == "pt" || ext == "pth");
        tracing::info!("Loading affinity model weights from {}", path.display());
        let vb = if is_pth {
            VarBuilder::from_pth(path, DType::F32, device)?
        } else {
            unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device)? }
        };
        Ok(Self::load(vb, config)?)
    }

    pub fn config(&self) -> &TFBindingConfig {
        &self.config
    }
}

impl AffinityModel for TFBindingModel {
    fn embedding_dim(&self) -> usize {
        self.config.embedding_dim
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn forward(&self, dna: &Tensor, tf: &Tensor) -> Result<Tensor> {
        // (b, dna_channels)
        let dna_features = self.dna_conv.forward(dna)?.relu()?.max(D::Minus1)?;
        // (b, tf_channels)
        let tf_features = self.tf_proj.forward(tf)?.relu()?.mean(D::Minus1)?;
        let joined = Tensor::cat(&[&dna_features, &tf_features], 1)?;
        let hidden = self.fc1.forward(&joined)?.relu()?;
        self.fc2.forward(&hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::VarMap;

    fn small_config() -> TFBindingConfig {
        TFBindingConfig {
            embedding_dim: 16,
            dna_channels: 8,
            tf_channels: 8,
            kernel_size: 5,
            hidden_dim: 12,
        }
    }

    #[test]
    fn test_forward_shape() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = TFBindingModel::load(vb, &small_config())?;
        let dna = Tensor::ones((3, 5, 100), DType::F32, &Device::Cpu)?;
        let tf = Tensor::ones((3, 16, 100), DType::F32, &Device::Cpu)?;
        assert_eq!(model.forward(&dna, &tf)?.dims2()?, (3, 1));
        // DNA windows of other lengths pool to the same width
        let dna = Tensor::ones((1, 5, 37), DType::F32, &Device::Cpu)?;
        let tf = Tensor::ones((1, 16, 100), DType::F32, &Device::Cpu)?;
        assert_eq!(model.forward(&dna, &tf)?.dims2()?, (1, 1));
        Ok(())
    }

    #[test]
    fn test_saved_weights_reload() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tfbinding.safetensors");
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let original = TFBindingModel::load(vb, &small_config())?;
        varmap.save(&path)?;

        let reloaded = TFBindingModel::load_weights(&path, &small_config(), &Device::Cpu)?;
        let dna = Tensor::rand(0f32, 1f32, (1, 5, 100), &Device::Cpu)?;
        let tf = Tensor::rand(0f32, 1f32, (1, 16, 100), &Device::Cpu)?;
        let a: Vec<Vec<f32>> = original.forward(&dna, &tf)?.to_vec2()?;
        let b: Vec<Vec<f32>> = reloaded.forward(&dna, &tf)?.to_vec2()?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_missing_weights() {
        let result = TFBindingModel::load_weights("/nonexistent/w.safetensors", &small_config(), &Device::Cpu);
        assert!(matches!(result, Err(TfBindError::ArtifactNotFound(_))));
    }

    #[test]
    fn test_incompatible_weights() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tfbinding.safetensors");
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        TFBindingModel::load(vb, &small_config())?;
        varmap.save(&path)?;

        let wider = TFBindingConfig {
            embedding_dim: 32,
            ..small_config()
        };
        assert!(TFBindingModel::load_weights(&path, &wider, &Device::Cpu).is_err());
        Ok(())
    }
}
