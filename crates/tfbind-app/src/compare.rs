//! Score one DNA window against a panel of reference TFs.
use crate::context::TfBindContext;
use serde::Serialize;
use tfbind_core::encoding::normalize_dna_input;
use tfbind_core::{
    encode_dna, normalize_embedding, CancelToken, EmbeddingStore, Result, TfBindError,
};
use tfbind_plms::{predict_affinity, AffinityModel};

pub const CURRENT_TF_LABEL: &str = "Current TF";

/// Reference TFs with precomputed embeddings.
pub const DEFAULT_PANEL: [&str; 4] = ["ESR1", "ERF", "FOXP1", "POU3F2"];

/// One bar of the comparison. A reference TF whose artifact could not be used
/// keeps its place with the error as outcome.
#[derive(Debug)]
pub struct PanelEntry {
    pub tf: String,
    pub outcome: Result<f32>,
}

impl PanelEntry {
    pub fn prediction(&self) -> Option<f32> {
        self.outcome.as_ref().ok().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelRecord {
    pub tf: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&PanelEntry> for PanelRecord {
    fn from(entry: &PanelEntry) -> Self {
        let (prediction, error) = match &entry.outcome {
            Ok(p) => (Some(*p), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            tf: entry.tf.clone(),
            prediction,
            error,
        }
    }
}

/// `[Current TF, panel...]` predictions for `dna_seq`.
///
/// The current prediction is passed through unchanged. DNA encoding errors
/// abort the call; per-TF failures are recorded in the entry and the rest of
/// the panel is still scored.
pub fn compare_against_panel<M, S>(
    dna_seq: &str,
    current_prediction: f32,
    panel: &[S],
    store: &EmbeddingStore,
    model: &M,
    cancel: &CancelToken,
) -> Result<Vec<PanelEntry>>
where
    M: AffinityModel + ?Sized,
    S: AsRef<str>,
{
    let dna = normalize_dna_input(dna_seq);
    let onehot = encode_dna(&dna, model.device())?;

    let mut entries = Vec::with_capacity(panel.len() + 1);
    entries.push(PanelEntry {
        tf: CURRENT_TF_LABEL.to_string(),
        outcome: Ok(current_prediction),
    });
    for tf in panel {
        cancel.check()?;
        let tf = tf.as_ref();
        let outcome = store
            .load(tf)
            .and_then(|embedding| Ok(normalize_embedding(&embedding)?))
            .and_then(|embedding| predict_affinity(&embedding, &onehot, model));
        match &outcome {
            Ok(p) => tracing::info!("{tf}: {p:.4}"),
            Err(e) => tracing::warn!("{tf}: skipped ({e})"),
        }
        entries.push(PanelEntry {
            tf: tf.to_string(),
            outcome,
        });
    }
    Ok(entries)
}

impl TfBindContext {
    pub fn compare<S: AsRef<str>>(
        &self,
        dna_seq: &str,
        current_prediction: f32,
        panel: &[S],
        cancel: &CancelToken,
    ) -> Result<Vec<PanelEntry>> {
        compare_against_panel(
            dna_seq,
            current_prediction,
            panel,
            self.embeddings(),
            self.affinity_model(),
            cancel,
        )
    }
}

/// Panel entries that failed, as `(tf, error)`.
pub fn failures(entries: &[PanelEntry]) -> Vec<(&str, &TfBindError)> {
    entries
        .iter()
        .filter_map(|e| e.outcome.as_ref().err().map(|err| (e.tf.as_str(), err)))
        .collect()
}
