use super::print_json;
use crate::cli::{ContextArgs, TfArgs};
use serde::Serialize;

#[derive(Serialize)]
struct PredictOutput {
    affinity: f32,
}

pub fn execute(args: &ContextArgs, tf: &TfArgs, dna: &str) -> anyhow::Result<()> {
    let ctx = args.load_context(Some(tf))?;
    let tf_embedding = tf.resolve(&ctx)?;
    let affinity = ctx.predict(&tf_embedding, dna)?;
    print_json(&PredictOutput { affinity })
}
