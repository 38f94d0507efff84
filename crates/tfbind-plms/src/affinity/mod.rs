mod config;
mod model;
mod predict;

pub use config::TFBindingConfig;
pub use model::{AffinityModel, TFBindingModel};
pub use predict::predict_affinity;
