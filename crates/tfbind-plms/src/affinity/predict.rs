use super::model::AffinityModel;
use candle_core::{DType, Tensor};
use tfbind_core::{Result, TfBindError, DNA_ALPHABET, EMBEDDING_WIDTH};

/// Score one TF embedding `(E, 100)` against one one-hot DNA window `(5, L)`.
///
/// Both inputs are checked before inference; a mismatch never reaches the model.
pub fn predict_affinity<M: AffinityModel + ?Sized>(
    tf_embedding: &Tensor,
    dna_onehot: &Tensor,
    model: &M,
) -> Result<f32> {
    let expected_tf = (model.embedding_dim(), EMBEDDING_WIDTH);
    match tf_embedding.dims() {
        &[e, w] if (e, w) == expected_tf => {}
        dims => return Err(TfBindError::shape_mismatch("TF embedding", expected_tf, dims)),
    }
    match dna_onehot.dims() {
        &[rows, len] if rows == DNA_ALPHABET.len() && len > 0 => {}
        dims => {
            return Err(TfBindError::shape_mismatch(
                "DNA one-hot",
                (DNA_ALPHABET.len(), "L > 0"),
                dims,
            ))
        }
    }

    let device = model.device();
    let tf = tf_embedding.to_dtype(DType::F32)?.to_device(device)?.unsqueeze(0)?;
    let dna = dna_onehot.to_dtype(DType::F32)?.to_device(device)?.unsqueeze(0)?;
    let score = model.forward(&dna, &tf)?.flatten_all()?.to_vec1::<f32>()?;
    score
        .first()
        .copied()
        .ok_or_else(|| TfBindError::shape_mismatch("prediction", 1, 0))
}
