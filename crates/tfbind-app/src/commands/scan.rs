use super::print_json;
use crate::cli::{ContextArgs, TfArgs};
use serde::Serialize;
use std::path::Path;
use tfbind_app::{BarChart, PromoterPreset, ScanPoint, ScanRequest};
use tfbind_core::CancelToken;

#[derive(Serialize)]
struct ScanOutput<'a> {
    request: &'a ScanRequest,
    points: Vec<ScanPoint>,
}

/// A preset, or an explicit `chrom:start-end`.
pub fn resolve_request(
    preset: Option<PromoterPreset>,
    chrom: Option<String>,
    start: Option<usize>,
    end: Option<usize>,
    radius: usize,
    window_size: usize,
    step_size: usize,
) -> anyhow::Result<ScanRequest> {
    let base = match (preset, chrom, start, end) {
        (Some(preset), _, _, _) => preset.request(),
        (None, Some(chrom), Some(start), Some(end)) => ScanRequest::new(&chrom, start, end, radius),
        _ => anyhow::bail!("scan needs --preset or --chrom, --start and --end"),
    };
    Ok(ScanRequest {
        window_size,
        step_size,
        ..base
    })
}

pub fn execute(
    args: &ContextArgs,
    tf: &TfArgs,
    request: &ScanRequest,
    plot: Option<&Path>,
) -> anyhow::Result<()> {
    let ctx = args.load_context(Some(tf))?;
    let tf_embedding = tf.resolve(&ctx)?;
    let points = ctx.scan(request, &tf_embedding, &CancelToken::new())?;
    if let Some(path) = plot {
        BarChart::profile(&points).save(path)?;
        tracing::info!("Wrote {}", path.display());
    }
    print_json(&ScanOutput { request, points })
}
