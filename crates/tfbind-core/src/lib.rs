//! tfbind-core
//!
//! Sequence encoding, embedding windowing and on-disk data access shared by the
//! affinity models and the scan/comparison orchestrators.
//!
//! - [`encoding`]: DNA one-hot encoding.
//! - [`window`]: fixed-width normalization of per-residue protein embeddings.
//! - [`genome`]: per-chromosome FASTA access.
//! - [`artifacts`]: precomputed TF embedding artifacts.
//!
pub mod artifacts;
pub mod cancel;
pub mod config;
pub mod device;
pub mod encoding;
pub mod error;
pub mod genome;
pub mod window;

pub use artifacts::{load_embedding_artifact, save_embedding_artifact, EmbeddingStore};
pub use cancel::CancelToken;
pub use config::{AffinitySettings, EsmSettings, TfBindConfig};
pub use device::{device, DevicePreference};
pub use encoding::{encode_dna, DNA_ALPHABET};
pub use error::{EncodingError, Result, TfBindError};
pub use genome::GenomeStore;
pub use window::{fixed_window, normalize_embedding, EMBEDDING_WIDTH, EMBEDDING_WINDOW};
