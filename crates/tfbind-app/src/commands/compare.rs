use super::print_json;
use crate::cli::{ContextArgs, TfArgs};
use itertools::Itertools;
use std::path::Path;
use tfbind_app::compare::failures;
use tfbind_app::{BarChart, PanelRecord};
use tfbind_core::CancelToken;

pub fn execute(
    args: &ContextArgs,
    tf: &TfArgs,
    dna: &str,
    panel: &[String],
    plot: Option<&Path>,
) -> anyhow::Result<()> {
    let ctx = args.load_context(Some(tf))?;
    let tf_embedding = tf.resolve(&ctx)?;
    let current = ctx.predict(&tf_embedding, dna)?;
    let entries = ctx.compare(dna, current, panel, &CancelToken::new())?;

    let failed = failures(&entries);
    if !failed.is_empty() {
        tracing::warn!(
            "No prediction for {}",
            failed.iter().map(|(tf, _)| tf).join(", ")
        );
    }
    if let Some(path) = plot {
        BarChart::panel(&entries).save(path)?;
        tracing::info!("Wrote {}", path.display());
    }
    let records: Vec<PanelRecord> = entries.iter().map(PanelRecord::from).collect();
    print_json(&records)
}
