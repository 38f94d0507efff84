//! ESM-2 protein language model.
//!
//! Pre-LayerNorm transformer encoder with rotary position embeddings.
//! Weight names follow the HuggingFace `EsmForMaskedLM` checkpoints; the
//! language-model and contact heads are not loaded.
//!
//! - [GH esm](https://github.com/facebookresearch/esm)
//! - [HF 3B](https://huggingface.co/facebook/esm2_t36_3B_UR50D)
//!
use super::config::ESM2Config;
use candle_core::{bail, DType, Device, Module, Result, Tensor};
use candle_nn::ops::softmax_last_dim;
use candle_nn::rotary_emb::rope;
use candle_nn::{embedding, layer_norm, linear, Embedding, LayerNorm, Linear, VarBuilder};
use std::collections::HashMap;

/// Masking ratio used during pretraining; embeddings are rescaled by it at inference.
const MASK_RATIO_TRAIN: f32 = 0.15 * 0.8;

#[derive(Debug)]
struct RotaryEmbedding {
    inv_freq: Vec<f32>,
}

impl RotaryEmbedding {
    fn new(head_dim: usize) -> Self {
        let inv_freq = (0..head_dim)
            .step_by(2)
            .map(|i| 1f32 / 10000f32.powf(i as f32 / head_dim as f32))
            .collect();
        Self { inv_freq }
    }

    /// `(seq_len, head_dim / 2)` cos and sin tables.
    fn cos_sin(&self, seq_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
        let half = self.inv_freq.len();
        let inv_freq = Tensor::from_slice(&self.inv_freq, (1, half), device)?;
        let t = Tensor::arange(0u32, seq_len as u32, device)?
            .to_dtype(DType::F32)?
            .reshape((seq_len, 1))?;
        let freqs = t.broadcast_mul(&inv_freq)?;
        Ok((freqs.cos()?, freqs.sin()?))
    }
}

#[derive(Debug)]
struct EsmAttention {
    layer_norm: LayerNorm,
    query: Linear,
    key: Linear,
    value: Linear,
    dense: Linear,
    rotary: RotaryEmbedding,
    num_heads: usize,
    head_dim: usize,
}

impl EsmAttention {
    fn load(vb: VarBuilder, config: &ESM2Config) -> Result<Self> {
        let hidden = config.hidden_size;
        Ok(Self {
            layer_norm: layer_norm(hidden, config.layer_norm_eps, vb.pp("LayerNorm"))?,
            query: linear(hidden, hidden, vb.pp("self.query"))?,
            key: linear(hidden, hidden, vb.pp("self.key"))?,
            value: linear(hidden, hidden, vb.pp("self.value"))?,
            dense: linear(hidden, hidden, vb.pp("output.dense"))?,
            rotary: RotaryEmbedding::new(config.head_dim()),
            num_heads: config.num_attention_heads,
            head_dim: config.head_dim(),
        })
    }

    fn split_heads(&self, x: &Tensor) -> Result<Tensor> {
        let (b, t, _) = x.dims3()?;
        x.reshape((b, t, self.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn forward(&self, x: &Tensor, attn_mask: Option<&Tensor>) -> Result<Tensor> {
        let (b, t, _) = x.dims3()?;
        let h = self.layer_norm.forward(x)?;
        let scaling = (self.head_dim as f64).powf(-0.5);

        let q = self.split_heads(&(self.query.forward(&h)? * scaling)?)?;
        let k = self.split_heads(&self.key.forward(&h)?)?;
        let v = self.split_heads(&self.value.forward(&h)?)?;

        let (cos, sin) = self.rotary.cos_sin(t, x.device())?;
        let q = rope(&q, &cos, &sin)?;
        let k = rope(&k, &cos, &sin)?;

        // (b, heads, t, t)
        let scores = q.matmul(&k.t()?.contiguous()?)?;
        let scores = match attn_mask {
            Some(mask) => scores.broadcast_add(mask)?,
            None => scores,
        };
        let probs = softmax_last_dim(&scores)?;
        let context = probs
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((b, t, self.num_heads * self.head_dim))?;
        x + self.dense.forward(&context)?
    }
}

#[derive(Debug)]
struct EsmFeedForward {
    layer_norm: LayerNorm,
    intermediate: Linear,
    output: Linear,
}

impl EsmFeedForward {
    fn load(vb: VarBuilder, config: &ESM2Config) -> Result<Self> {
        Ok(Self {
            layer_norm: layer_norm(config.hidden_size, config.layer_norm_eps, vb.pp("LayerNorm"))?,
            intermediate: linear(
                config.hidden_size,
                config.intermediate_size,
                vb.pp("intermediate.dense"),
            )?,
            output: linear(
                config.intermediate_size,
                config.hidden_size,
                vb.pp("output.dense"),
            )?,
        })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let h = self.layer_norm.forward(x)?;
        let h = self.intermediate.forward(&h)?.gelu_erf()?;
        x + self.output.forward(&h)?
    }
}

#[derive(Debug)]
struct EsmLayer {
    attention: EsmAttention,
    ffn: EsmFeedForward,
}

impl EsmLayer {
    fn load(vb: VarBuilder, config: &ESM2Config) -> Result<Self> {
        Ok(Self {
            attention: EsmAttention::load(vb.pp("attention"), config)?,
            ffn: EsmFeedForward::load(vb.clone(), config)?,
        })
    }

    fn forward(&self, x: &Tensor, attn_mask: Option<&Tensor>) -> Result<Tensor> {
        let x = self.attention.forward(x, attn_mask)?;
        self.ffn.forward(&x)
    }
}

/// Hidden representations keyed by layer index.
///
/// Layer 0 is the token embedding; layer `num_hidden_layers` is taken after
/// the final layer norm.
#[derive(Debug)]
pub struct EsmOutput {
    pub representations: HashMap<usize, Tensor>,
}

#[derive(Debug)]
pub struct ESM2 {
    embed_tokens: Embedding,
    emb_layer_norm_before: Option<LayerNorm>,
    layers: Vec<EsmLayer>,
    emb_layer_norm_after: LayerNorm,
    config: ESM2Config,
}

impl ESM2 {
    pub fn load(vb: VarBuilder, config: &ESM2Config) -> Result<Self> {
        let vb = vb.pp("esm");
        let embed_tokens = embedding(
            config.vocab_size,
            config.hidden_size,
            vb.pp("embeddings.word_embeddings"),
        )?;
        let emb_layer_norm_before = if config.emb_layer_norm_before {
            Some(layer_norm(
                config.hidden_size,
                config.layer_norm_eps,
                vb.pp("embeddings.layer_norm"),
            )?)
        } else {
            None
        };
        let layers = (0..config.num_hidden_layers)
            .map(|i| EsmLayer::load(vb.pp("encoder.layer").pp(i), config))
            .collect::<Result<Vec<_>>>()?;
        let emb_layer_norm_after = layer_norm(
            config.hidden_size,
            config.layer_norm_eps,
            vb.pp("encoder.emb_layer_norm_after"),
        )?;
        Ok(Self {
            embed_tokens,
            emb_layer_norm_before,
            layers,
            emb_layer_norm_after,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &ESM2Config {
        &self.config
    }

    pub fn get_device(&self) -> &Device {
        self.embed_tokens.embeddings().device()
    }

    /// Token embedding with token-dropout rescaling and padding zeroed.
    fn embed(&self, tokens: &Tensor) -> Result<Tensor> {
        let (b, t) = tokens.dims2()?;
        let device = self.get_device();
        let ids: Vec<Vec<u32>> = tokens.to_vec2()?;
        let pad = self.config.pad_token_id;
        let mask = self.config.mask_token_id;

        let mut x = self.embed_tokens.forward(tokens)?;
        if let Some(ln) = &self.emb_layer_norm_before {
            x = ln.forward(&x)?;
        }
        if self.config.token_dropout {
            let keep: Vec<f32> = ids
                .iter()
                .flatten()
                .map(|&id| if id == mask { 0.0 } else { 1.0 })
                .collect();
            let scales: Vec<f32> = ids
                .iter()
                .map(|row| {
                    let len = row.iter().filter(|&&id| id != pad).count().max(1) as f32;
                    let masked = row.iter().filter(|&&id| id == mask).count() as f32;
                    (1.0 - MASK_RATIO_TRAIN) / (1.0 - masked / len).max(f32::EPSILON)
                })
                .collect();
            x = x
                .broadcast_mul(&Tensor::from_vec(keep, (b, t, 1), device)?)?
                .broadcast_mul(&Tensor::from_vec(scales, (b, 1, 1), device)?)?;
        }
        let not_pad: Vec<f32> = ids
            .iter()
            .flatten()
            .map(|&id| if id == pad { 0.0 } else { 1.0 })
            .collect();
        x.broadcast_mul(&Tensor::from_vec(not_pad, (b, t, 1), device)?)
    }

    /// Additive `(b, 1, 1, t)` attention mask, `None` when there is no padding.
    fn padding_mask(&self, tokens: &Tensor) -> Result<Option<Tensor>> {
        let (b, t) = tokens.dims2()?;
        let ids: Vec<u32> = tokens.flatten_all()?.to_vec1()?;
        let pad = self.config.pad_token_id;
        if !ids.contains(&pad) {
            return Ok(None);
        }
        let mask: Vec<f32> = ids
            .iter()
            .map(|&id| if id == pad { f32::NEG_INFINITY } else { 0.0 })
            .collect();
        Ok(Some(Tensor::from_vec(mask, (b, 1, 1, t), self.get_device())?))
    }

    /// Run the encoder on `(batch, seq)` token ids and collect `repr_layers`.
    ///
    /// Layers past the highest requested index are not evaluated.
    pub fn forward(&self, tokens: &Tensor, repr_layers: &[usize]) -> Result<EsmOutput> {
        let num_layers = self.layers.len();
        if let Some(bad) = repr_layers.iter().find(|&&l| l > num_layers) {
            bail!("repr layer {bad} out of range, model has {num_layers} layers");
        }
        let last = repr_layers.iter().copied().max().unwrap_or(num_layers);

        let attn_mask = self.padding_mask(tokens)?;
        let mut x = self.embed(tokens)?;
        let mut representations = HashMap::new();
        if repr_layers.contains(&0) {
            representations.insert(0, x.clone());
        }
        for (idx, layer) in self.layers.iter().enumerate().take(last) {
            x = layer.forward(&x, attn_mask.as_ref())?;
            let layer_idx = idx + 1;
            if layer_idx == num_layers {
                x = self.emb_layer_norm_after.forward(&x)?;
            }
            if repr_layers.contains(&layer_idx) {
                representations.insert(layer_idx, x.clone());
            }
        }
        Ok(EsmOutput { representations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::VarMap;

    fn tiny_config() -> ESM2Config {
        ESM2Config {
            vocab_size: 33,
            hidden_size: 16,
            num_hidden_layers: 2,
            num_attention_heads: 2,
            intermediate_size: 32,
            layer_norm_eps: 1e-5,
            pad_token_id: 1,
            mask_token_id: 32,
            token_dropout: true,
            emb_layer_norm_before: false,
        }
    }

    fn tiny_model() -> Result<ESM2> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        ESM2::load(vb, &tiny_config())
    }

    #[test]
    fn test_representation_shapes() -> Result<()> {
        let model = tiny_model()?;
        let tokens = Tensor::new(&[[0u32, 20, 4, 15, 4, 10, 7, 2]], &Device::Cpu)?;
        let out = model.forward(&tokens, &[0, 1, 2])?;
        for layer in 0..=2 {
            assert_eq!(out.representations[&layer].dims3()?, (1, 8, 16));
        }
        Ok(())
    }

    #[test]
    fn test_early_exit_and_bad_layer() -> Result<()> {
        let model = tiny_model()?;
        let tokens = Tensor::new(&[[0u32, 5, 6, 2]], &Device::Cpu)?;
        let out = model.forward(&tokens, &[1])?;
        assert_eq!(out.representations.len(), 1);
        assert!(model.forward(&tokens, &[3]).is_err());
        Ok(())
    }

    #[test]
    fn test_padding_does_not_leak() -> Result<()> {
        // the unpadded row and the same row with trailing padding agree on
        // the real positions
        let model = tiny_model()?;
        let plain = Tensor::new(&[[0u32, 5, 6, 7, 2]], &Device::Cpu)?;
        let padded = Tensor::new(&[[0u32, 5, 6, 7, 2, 1, 1]], &Device::Cpu)?;
        let a = model.forward(&plain, &[2])?.representations[&2].narrow(1, 0, 5)?;
        let b = model.forward(&padded, &[2])?.representations[&2].narrow(1, 0, 5)?;
        let diff = (a - b)?.abs()?.max_keepdim(2)?.flatten_all()?.max(0)?;
        assert!(diff.to_scalar::<f32>()? < 1e-4);
        Ok(())
    }

    #[test]
    fn test_rotary_tables() -> Result<()> {
        let rotary = RotaryEmbedding::new(8);
        let (cos, sin) = rotary.cos_sin(3, &Device::Cpu)?;
        assert_eq!(cos.dims2()?, (3, 4));
        // position 0 is the identity rotation
        assert_eq!(cos.get(0)?.to_vec1::<f32>()?, vec![1.0; 4]);
        assert_eq!(sin.get(0)?.to_vec1::<f32>()?, vec![0.0; 4]);
        Ok(())
    }
}
