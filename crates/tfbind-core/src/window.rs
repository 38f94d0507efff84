//! Fixed-width normalization of per-residue embeddings.
//!
//! Protein embeddings arrive as `(E, len)`. They are centred in a window of
//! [`EMBEDDING_WINDOW`] columns and the middle [`EMBEDDING_WIDTH`] columns are
//! kept, so every TF embedding handed to the affinity model is `(E, 100)`.
use candle_core::{Result, Tensor};

pub const EMBEDDING_WINDOW: usize = 300;
pub const EMBEDDING_CROP_START: usize = 100;
pub const EMBEDDING_WIDTH: usize = 100;

/// Centre `embedding` along dim 1 in a window of `window` columns.
///
/// Shorter inputs are zero padded with `floor((window - len) / 2)` columns on
/// the left and the remainder on the right. Longer inputs are cropped to the
/// central `window` columns, starting at `floor((len - window) / 2)`.
pub fn fixed_window(embedding: &Tensor, window: usize) -> Result<Tensor> {
    let len = embedding.dim(1)?;
    if len <= window {
        let left = (window - len) / 2;
        let right = window - len - left;
        embedding.pad_with_zeros(1, left, right)
    } else {
        embedding.narrow(1, (len - window) / 2, window)
    }
}

/// `(E, len)` -> `(E, 100)`: window to 300 then keep columns `[100, 200)`.
pub fn normalize_embedding(embedding: &Tensor) -> Result<Tensor> {
    fixed_window(embedding, EMBEDDING_WINDOW)?
        .narrow(1, EMBEDDING_CROP_START, EMBEDDING_WIDTH)?
        .contiguous()
}
