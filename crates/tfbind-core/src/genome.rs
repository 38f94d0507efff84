//! Reference genome access.
//!
//! One file per chromosome under a root directory, `{chrom}.fa.gz` or
//! `{chrom}.fa`. The first line is a FASTA header and is discarded; the rest
//! is concatenated and lowercased.
use crate::error::{Result, TfBindError};
use flate2::read::GzDecoder;
use memchr::memchr;
use std::io::Read;
use std::path::{Path, PathBuf};

const EXTENSIONS: [&str; 2] = ["fa.gz", "fa"];

#[derive(Debug, Clone)]
pub struct GenomeStore {
    root: PathBuf,
}

impl GenomeStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First existing candidate path for `chrom`.
    pub fn chromosome_path(&self, chrom: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{chrom}.{ext}")))
            .find(|p| p.is_file())
    }

    /// Full lowercase sequence of `chrom`.
    pub fn load_chromosome(&self, chrom: &str) -> Result<String> {
        let invalid = chrom.is_empty()
            || chrom.contains("..")
            || chrom.contains(|c: char| c == '/' || c == '\\');
        if invalid {
            return Err(TfBindError::data_unavailable(
                &self.root,
                format!("invalid chromosome id {chrom:?}"),
            ));
        }
        let path = self.chromosome_path(chrom).ok_or_else(|| {
            TfBindError::data_unavailable(
                self.root.join(format!("{chrom}.{}", EXTENSIONS[0])),
                "no sequence file for chromosome",
            )
        })?;
        tracing::info!("Reading sequence: {}", path.display());

        let raw = std::fs::read(&path).map_err(|e| TfBindError::data_unavailable(&path, e))?;
        let bytes = if path.extension().is_some_and(|ext| ext == "gz") {
            let mut decompressed = Vec::new();
            GzDecoder::new(raw.as_slice())
                .read_to_end(&mut decompressed)
                .map_err(|e| TfBindError::data_unavailable(&path, e))?;
            decompressed
        } else {
            raw
        };
        let seq = parse_fasta_sequence(&bytes);
        tracing::debug!("{chrom}: {} bases", seq.len());
        Ok(seq)
    }

    /// `[start, end)` of `chrom`, clamped to the chromosome length.
    pub fn load_region(&self, chrom: &str, start: usize, end: usize) -> Result<String> {
        if start >= end {
            return Err(TfBindError::InvalidRange(format!(
                "start ({start}) must be less than end ({end})"
            )));
        }
        let seq = self.load_chromosome(chrom)?;
        let end = end.min(seq.len());
        if start >= end {
            return Err(TfBindError::InvalidRange(format!(
                "region {chrom}:{start}-{end} is empty (chromosome length {})",
                seq.len()
            )));
        }
        seq.get(start..end)
            .map(str::to_string)
            .ok_or_else(|| TfBindError::data_unavailable(&self.root, "non-ASCII sequence data"))
    }
}

/// Drop the header line, join the remaining lines and lowercase them.
pub fn parse_fasta_sequence(raw: &[u8]) -> String {
    let body: &[u8] = match memchr(b'\n', raw) {
        Some(idx) => &raw[idx + 1..],
        None => &[],
    };
    body.iter()
        .filter(|b| !matches!(b, b'\n' | b'\r'))
        .map(|b| b.to_ascii_lowercase() as char)
        .collect()
}
