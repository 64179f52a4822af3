use std::fs;

use anyhow::{Context, Result};
use tracing::Instrument;

use flipflop::{
    alignment::{AlignmentEngine, TraversalConfig, render_diagram},
    cli::config_path_from_args,
    completion::completion_from_config,
    config::Config,
    logging::init_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let logging = init_tracing(&config.logging).context("failed to initialize logging")?;

    let completion = completion_from_config(&config.completion)
        .context("failed to construct completion client")?;
    let engine = AlignmentEngine::new(
        TraversalConfig::new(completion).with_subtree_mode(config.run.subtree_mode),
    );

    let mut root = config.run.build_tree();
    tracing::info!(
        target: "flipflop",
        run_id = logging.run_id(),
        topic = %config.run.topic,
        depth = root.depth(),
        internal_nodes = root.internal_count(),
        subtree_mode = ?config.run.subtree_mode,
        "synthesis_started"
    );

    // A failed walk leaves the tree half-populated, so nothing is rendered in that case.
    engine
        .traverse_root(&mut root)
        .instrument(logging.run_span(&config.run.topic))
        .await
        .context("alignment synthesis failed")?;

    let diagram = render_diagram(&root);
    fs::write(&config.run.output, &diagram)
        .with_context(|| format!("failed to write {}", config.run.output.display()))?;
    tracing::info!(
        target: "flipflop",
        output = %config.run.output.display(),
        "synthesis_completed"
    );

    println!("Synthesized root: {}", root.payload_str());
    println!("Diagram in {}", config.run.output.display());
    println!("Logs in {}", logging.log_dir().display());
    Ok(())
}
