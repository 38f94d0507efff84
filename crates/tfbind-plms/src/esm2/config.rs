use serde::Deserialize;

fn default_vocab_size() -> usize {
    33
}
fn default_layer_norm_eps() -> f64 {
    1e-5
}
fn default_pad_token_id() -> u32 {
    1
}
fn default_mask_token_id() -> u32 {
    32
}
fn default_true() -> bool {
    true
}

/// ESM-2 hyperparameters as found in the HuggingFace `config.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ESM2Config {
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
    #[serde(default = "default_pad_token_id")]
    pub pad_token_id: u32,
    #[serde(default = "default_mask_token_id")]
    pub mask_token_id: u32,
    #[serde(default = "default_true")]
    pub token_dropout: bool,
    #[serde(default)]
    pub emb_layer_norm_before: bool,
}

impl ESM2Config {
    fn with_dims(layers: usize, hidden: usize, heads: usize) -> Self {
        Self {
            vocab_size: default_vocab_size(),
            hidden_size: hidden,
            num_hidden_layers: layers,
            num_attention_heads: heads,
            intermediate_size: hidden * 4,
            layer_norm_eps: default_layer_norm_eps(),
            pad_token_id: default_pad_token_id(),
            mask_token_id: default_mask_token_id(),
            token_dropout: true,
            emb_layer_norm_before: false,
        }
    }
    pub fn esm2_t6_8m() -> Self {
        Self::with_dims(6, 320, 20)
    }
    pub fn esm2_t12_35m() -> Self {
        Self::with_dims(12, 480, 20)
    }
    pub fn esm2_t30_150m() -> Self {
        Self::with_dims(30, 640, 20)
    }
    pub fn esm2_t33_650m() -> Self {
        Self::with_dims(33, 1280, 20)
    }
    pub fn esm2_t36_3b() -> Self {
        Self::with_dims(36, 2560, 40)
    }
    pub fn esm2_t48_15b() -> Self {
        Self::with_dims(48, 5120, 40)
    }
    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hf_config_parses() {
        // trimmed facebook/esm2_t36_3B_UR50D config.json
        let json = r#"{
            "architectures": ["EsmForMaskedLM"],
            "attention_probs_dropout_prob": 0.0,
            "emb_layer_norm_before": false,
            "hidden_act": "gelu",
            "hidden_size": 2560,
            "intermediate_size": 10240,
            "layer_norm_eps": 1e-05,
            "mask_token_id": 32,
            "model_type": "esm",
            "num_attention_heads": 40,
            "num_hidden_layers": 36,
            "pad_token_id": 1,
            "position_embedding_type": "rotary",
            "token_dropout": true,
            "vocab_size": 33
        }"#;
        let config: ESM2Config = serde_json::from_str(json).unwrap();
        assert_eq!(config, ESM2Config::esm2_t36_3b());
        assert_eq!(config.head_dim(), 64);
    }
}
