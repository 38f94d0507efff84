//! tfbind-plms
//!
//! Candle models for TF-DNA binding prediction.
//!
//! - [`esm2`]: ESM-2 protein language model and the fixed-width TF embedder.
//! - [`affinity`]: the regression model scoring a TF embedding against a DNA window.
//!
pub mod affinity;
pub mod esm2;

pub use affinity::{predict_affinity, AffinityModel, TFBindingConfig, TFBindingModel};
pub use esm2::{ESM2Config, EsmEmbedder, EsmModels, EsmTokenizer, ESM2};
