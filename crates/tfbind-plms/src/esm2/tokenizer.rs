//! ESM-2 tokenizer.
//!
//! The ESM-2 alphabet (33 tokens) is shipped with the crate as `tokenizer.json`
//! and loaded from memory. Every residue is its own token; a sequence is
//! framed as `<cls> residues <eos>`.
use tfbind_core::{EncodingError, Result, TfBindError};
use tokenizers::Tokenizer;

/// Residue symbols accepted by the ESM-2 vocabulary.
pub const ESM_RESIDUES: &str = "LAGVSERTIDPKQNFYMHWCXBUZO";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedProtein {
    /// `<cls>` + residues + `<eos>`.
    pub ids: Vec<u32>,
    /// Count of non-padding tokens, special tokens included.
    pub non_padding: usize,
}

impl TokenizedProtein {
    pub fn residue_count(&self) -> usize {
        self.ids.len() - 2
    }
}

pub struct EsmTokenizer {
    tokenizer: Tokenizer,
    cls_token_id: u32,
    eos_token_id: u32,
    pad_token_id: u32,
}

impl EsmTokenizer {
    pub fn load() -> Result<Self> {
        let tokenizer_bytes = include_bytes!("tokenizer.json");
        let tokenizer = Tokenizer::from_bytes(tokenizer_bytes)
            .map_err(|e| TfBindError::ModelUnavailable(format!("Failed to load tokenizer: {}", e)))?;
        let id = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| TfBindError::ModelUnavailable(format!("Missing {token} token")))
        };
        let cls_token_id = id("<cls>")?;
        let eos_token_id = id("<eos>")?;
        let pad_token_id = id("<pad>")?;
        Ok(Self {
            tokenizer,
            cls_token_id,
            eos_token_id,
            pad_token_id,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    pub fn pad_token_id(&self) -> u32 {
        self.pad_token_id
    }

    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.tokenizer.token_to_id(token)
    }

    /// Tokenize an uppercase amino-acid sequence.
    pub fn encode(&self, sequence: &str) -> Result<TokenizedProtein> {
        if sequence.is_empty() {
            return Err(EncodingError::Empty.into());
        }
        if let Some((position, symbol)) = sequence
            .chars()
            .enumerate()
            .find(|(_, c)| !ESM_RESIDUES.contains(*c))
        {
            return Err(EncodingError::InvalidSymbol { symbol, position }.into());
        }

        let encoding = self
            .tokenizer
            .encode(sequence, false)
            .map_err(|e| TfBindError::ModelUnavailable(format!("Tokenization failed: {}", e)))?;
        let residues = encoding.get_ids();
        if residues.len() != sequence.len() {
            return Err(TfBindError::shape_mismatch(
                "residue tokens",
                sequence.len(),
                residues.len(),
            ));
        }

        let mut ids = Vec::with_capacity(residues.len() + 2);
        ids.push(self.cls_token_id);
        ids.extend_from_slice(residues);
        ids.push(self.eos_token_id);
        let non_padding = ids.iter().filter(|&&id| id != self.pad_token_id).count();
        Ok(TokenizedProtein { ids, non_padding })
    }
}
