//! Warmup command - pull and initialize the local model

use super::{bootstrap, context, stderr_progress};
use crate::domain::llm::LocalEngine;

/// Run the warmup command
pub async fn run() -> anyhow::Result<()> {
    let config = bootstrap();
    let ctx = context(&config, None)?;

    eprintln!("Preparing local model {}", ctx.engine_slot.model_id());
    let engine = ctx.engine_slot.acquire(Some(stderr_progress())).await?;
    println!("Local model {} is ready", engine.model_id());

    Ok(())
}
