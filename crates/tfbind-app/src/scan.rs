//! Sliding-window binding profile over a genomic region.
use crate::context::TfBindContext;
use candle_core::Tensor;
use serde::Serialize;
use strum::{Display, EnumIter, EnumString};
use tfbind_core::{encode_dna, CancelToken, EncodingError, GenomeStore, Result, TfBindError};
use tfbind_plms::{predict_affinity, AffinityModel};

pub const DEFAULT_WINDOW_SIZE: usize = 100;
pub const DEFAULT_STEP_SIZE: usize = 20;
pub const PROMOTER_RADIUS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    pub chromosome: String,
    pub start: usize,
    pub end: usize,
    /// Subtracted from each window offset to give the position relative to the anchor.
    pub radius: usize,
    pub window_size: usize,
    pub step_size: usize,
}

impl ScanRequest {
    pub fn new(chromosome: &str, start: usize, end: usize, radius: usize) -> Self {
        Self {
            chromosome: chromosome.to_string(),
            start,
            end,
            radius,
            window_size: DEFAULT_WINDOW_SIZE,
            step_size: DEFAULT_STEP_SIZE,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(TfBindError::InvalidRange(format!(
                "{}:{}-{} has start >= end",
                self.chromosome, self.start, self.end
            )));
        }
        if self.window_size == 0 || self.step_size == 0 {
            return Err(TfBindError::InvalidRange(format!(
                "window_size ({}) and step_size ({}) must be positive",
                self.window_size, self.step_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanPoint {
    pub relative_position: i64,
    pub prediction: f32,
}

/// Score every window `i` with `i + window_size <= len`, stepping by `step_size`.
pub fn scan_sequence<M: AffinityModel + ?Sized>(
    dna: &str,
    tf_embedding: &Tensor,
    model: &M,
    window_size: usize,
    step_size: usize,
    radius: usize,
    cancel: &CancelToken,
) -> Result<Vec<ScanPoint>> {
    if window_size == 0 || step_size == 0 {
        return Err(TfBindError::InvalidRange(
            "window_size and step_size must be positive".to_string(),
        ));
    }
    // windows are byte slices
    if let Some((position, symbol)) = dna.chars().enumerate().find(|(_, c)| !c.is_ascii()) {
        return Err(EncodingError::InvalidSymbol { symbol, position }.into());
    }
    if dna.len() < window_size {
        return Ok(Vec::new());
    }
    let last = dna.len() - window_size;
    let mut points = Vec::with_capacity(last / step_size + 1);
    for offset in (0..=last).step_by(step_size) {
        cancel.check()?;
        let onehot = encode_dna(&dna[offset..offset + window_size], model.device())?;
        let prediction = predict_affinity(tf_embedding, &onehot, model)?;
        points.push(ScanPoint {
            relative_position: offset as i64 - radius as i64,
            prediction,
        });
    }
    tracing::debug!("Scored {} windows", points.len());
    Ok(points)
}

pub fn scan_region<M: AffinityModel + ?Sized>(
    request: &ScanRequest,
    genome: &GenomeStore,
    tf_embedding: &Tensor,
    model: &M,
    cancel: &CancelToken,
) -> Result<Vec<ScanPoint>> {
    request.validate()?;
    tracing::info!(
        "Scanning {}:{}-{}",
        request.chromosome,
        request.start,
        request.end
    );
    let dna = genome.load_region(&request.chromosome, request.start, request.end)?;
    scan_sequence(
        &dna,
        tf_embedding,
        model,
        request.window_size,
        request.step_size,
        request.radius,
        cancel,
    )
}

impl TfBindContext {
    pub fn scan(
        &self,
        request: &ScanRequest,
        tf_embedding: &Tensor,
        cancel: &CancelToken,
    ) -> Result<Vec<ScanPoint>> {
        scan_region(
            request,
            self.genome(),
            tf_embedding,
            self.affinity_model(),
            cancel,
        )
    }
}

/// hg38 promoters with a ready-made scan around the TSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum PromoterPreset {
    Mdm2,
    Bax,
}

impl PromoterPreset {
    pub fn gene(&self) -> &'static str {
        match self {
            PromoterPreset::Mdm2 => "MDM2",
            PromoterPreset::Bax => "BAX",
        }
    }

    pub fn chromosome(&self) -> &'static str {
        match self {
            PromoterPreset::Mdm2 => "chr12",
            PromoterPreset::Bax => "chr19",
        }
    }

    pub fn tss(&self) -> usize {
        match self {
            PromoterPreset::Mdm2 => 68_807_024,
            PromoterPreset::Bax => 48_954_932,
        }
    }

    /// `[tss - 1000, tss + 1000)` with offsets reported relative to the TSS.
    pub fn request(&self) -> ScanRequest {
        let tss = self.tss();
        ScanRequest::new(
            self.chromosome(),
            tss - PROMOTER_RADIUS,
            tss + PROMOTER_RADIUS,
            PROMOTER_RADIUS,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{tiny_context, TINY_EMBEDDING_DIM};
    use candle_core::Device;
    use std::str::FromStr;
    use tfbind_test_data::TestFile;

    fn tf() -> Tensor {
        Tensor::rand(0f32, 1f32, (TINY_EMBEDDING_DIM, 100), &Device::Cpu).unwrap()
    }

    #[test]
    fn test_window_offsets() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let ctx = tiny_context(dir.path())?;
        let dna = "a".repeat(140);
        let points = scan_sequence(
            &dna,
            &tf(),
            ctx.affinity_model(),
            100,
            20,
            70,
            &CancelToken::new(),
        )?;
        let positions: Vec<i64> = points.iter().map(|p| p.relative_position).collect();
        assert_eq!(positions, vec![-70, -50, -30]);
        // identical windows score identically
        assert!(points.iter().all(|p| p.prediction == points[0].prediction));
        Ok(())
    }

    #[test]
    fn test_short_slice_is_empty() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let ctx = tiny_context(dir.path())?;
        let points = scan_sequence(
            &"acgt".repeat(20),
            &tf(),
            ctx.affinity_model(),
            100,
            20,
            0,
            &CancelToken::new(),
        )?;
        assert!(points.is_empty());
        Ok(())
    }

    #[test]
    fn test_scan_fixture_chromosome() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        TestFile::chromosome_01().write_to(dir.path(), "chrT")?;
        let ctx = tiny_context(dir.path())?;

        let request = ScanRequest::new("chrT", 100, 240, 70);
        let points = ctx.scan(&request, &tf(), &CancelToken::new())?;
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].relative_position, -70);

        // end past the chromosome is clamped: 600 - 500 = 100 bases, one window
        let request = ScanRequest::new("chrT", 500, 10_000, 0);
        assert_eq!(ctx.scan(&request, &tf(), &CancelToken::new())?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_invalid_requests() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        TestFile::chromosome_01().write_to(dir.path(), "chrT")?;
        let ctx = tiny_context(dir.path())?;
        let cancel = CancelToken::new();

        let backwards = ScanRequest::new("chrT", 200, 100, 0);
        assert!(matches!(
            ctx.scan(&backwards, &tf(), &cancel),
            Err(TfBindError::InvalidRange(_))
        ));
        let past_end = ScanRequest::new("chrT", 700, 900, 0);
        assert!(matches!(
            ctx.scan(&past_end, &tf(), &cancel),
            Err(TfBindError::InvalidRange(_))
        ));
        let zero_step = ScanRequest {
            step_size: 0,
            ..ScanRequest::new("chrT", 0, 200, 0)
        };
        assert!(matches!(
            ctx.scan(&zero_step, &tf(), &cancel),
            Err(TfBindError::InvalidRange(_))
        ));
        let missing = ScanRequest::new("chr1", 0, 200, 0);
        assert!(matches!(
            ctx.scan(&missing, &tf(), &cancel),
            Err(TfBindError::DataUnavailable { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_cancelled_scan() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        TestFile::chromosome_01().write_to(dir.path(), "chrT")?;
        let ctx = tiny_context(dir.path())?;
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            ctx.scan(&ScanRequest::new("chrT", 0, 600, 300), &tf(), &cancel),
            Err(TfBindError::Cancelled)
        ));
        Ok(())
    }

    #[test]
    fn test_presets() {
        let mdm2 = PromoterPreset::from_str("mdm2").unwrap();
        let request = mdm2.request();
        assert_eq!(request.chromosome, "chr12");
        assert_eq!(request.start, 68_806_024);
        assert_eq!(request.end, 68_808_024);
        assert_eq!(request.radius, 1000);
        assert_eq!(PromoterPreset::Bax.request().start, 48_953_932);
        assert_eq!(PromoterPreset::Bax.to_string(), "bax");
        assert_eq!(PromoterPreset::Bax.gene(), "BAX");
    }
}
