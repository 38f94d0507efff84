mod config;
mod embedder;
mod model;
mod pretrained;
mod tokenizer;

pub use config::ESM2Config;
pub use embedder::EsmEmbedder;
pub use model::{EsmOutput, ESM2};
pub use pretrained::EsmModels;
pub use tokenizer::{EsmTokenizer, TokenizedProtein, ESM_RESIDUES};
