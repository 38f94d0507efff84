//! DNA one-hot encoding.
//!
//! A DNA sequence of length `L` becomes a `(5, L)` tensor with one row per
//! symbol of [`DNA_ALPHABET`] and exactly one `1.0` per column.
use crate::error::{EncodingError, Result};
use candle_core::{Device, Tensor};

/// Row order of the one-hot encoding: `a:0, c:1, g:2, t:3, n:4`.
pub const DNA_ALPHABET: [char; 5] = ['a', 'c', 'g', 't', 'n'];

#[rustfmt::skip]
pub fn dna_row(symbol: char) -> Option<usize> {
    match symbol {
        'a' => Some(0), 'c' => Some(1), 'g' => Some(2),
        't' => Some(3), 'n' => Some(4), _   => None,
    }
}

/// Row index for every position of `seq`, failing on the first unknown symbol.
pub fn dna_rows(seq: &str) -> std::result::Result<Vec<usize>, EncodingError> {
    if seq.is_empty() {
        return Err(EncodingError::Empty);
    }
    seq.chars()
        .enumerate()
        .map(|(position, symbol)| {
            dna_row(symbol).ok_or(EncodingError::InvalidSymbol { symbol, position })
        })
        .collect()
}

/// Encode a lowercase DNA sequence as a `(5, L)` f32 tensor.
///
/// ```ignore
/// let onehot = encode_dna("acgtn", &Device::Cpu)?;
/// assert_eq!(onehot.dims2()?, (5, 5));
/// ```
pub fn encode_dna(seq: &str, device: &Device) -> Result<Tensor> {
    let rows = dna_rows(seq)?;
    let len = rows.len();
    let mut data = vec![0f32; DNA_ALPHABET.len() * len];
    for (col, row) in rows.into_iter().enumerate() {
        data[row * len + col] = 1.0;
    }
    Ok(Tensor::from_vec(data, (DNA_ALPHABET.len(), len), device)?)
}

/// Trim and lowercase free-text DNA input. Does not validate symbols.
pub fn normalize_dna_input(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_acgtn_is_diagonal() -> anyhow::Result<()> {
        let onehot = encode_dna("acgtn", &Device::Cpu)?;
        assert_eq!(onehot.dims2()?, (5, 5));
        let values = onehot.to_vec2::<f32>()?;
        for (row, cols) in values.iter().enumerate() {
            for (col, v) in cols.iter().enumerate() {
                let expected = if row == col { 1.0 } else { 0.0 };
                assert_eq!(*v, expected, "row {row} col {col}");
            }
        }
        Ok(())
    }

    #[test]
    fn test_random_sequences_have_one_hot_columns() -> anyhow::Result<()> {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let len = rng.gen_range(1..250);
            let seq: String = (0..len)
                .map(|_| DNA_ALPHABET[rng.gen_range(0..DNA_ALPHABET.len())])
                .collect();
            let onehot = encode_dna(&seq, &Device::Cpu)?;
            assert_eq!(onehot.dims2()?, (5, len));

            let sums = onehot.sum(0)?.to_vec1::<f32>()?;
            assert!(sums.iter().all(|s| *s == 1.0));

            let argmax = onehot.argmax(0)?.to_vec1::<u32>()?;
            for (symbol, row) in seq.chars().zip(argmax) {
                assert_eq!(dna_row(symbol), Some(row as usize));
            }
        }
        Ok(())
    }

    #[test]
    fn test_invalid_symbol() {
        let err = dna_rows("acgxt").unwrap_err();
        assert_eq!(
            err,
            EncodingError::InvalidSymbol {
                symbol: 'x',
                position: 3
            }
        );
        // uppercase is not part of the alphabet
        assert!(encode_dna("ACGT", &Device::Cpu).is_err());
    }

    #[test]
    fn test_empty_sequence() {
        assert_eq!(dna_rows(""), Err(EncodingError::Empty));
    }

    #[test]
    fn test_normalize_input() {
        assert_eq!(normalize_dna_input(" ACgt\nN "), "acgtn");
    }
}
