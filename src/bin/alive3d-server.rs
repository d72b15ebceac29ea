//! HTTP entry point for the erase-and-synthesize orchestration service.
//!
//! Configuration layering: defaults, then `ALIVE3D_*` environment
//! variables, then command-line flags.

use alive3d::server::{run, AppState};
use alive3d::{
    AppConfig, ArtifactEvents, ArtifactStore, HttpInferenceClient, PipelineOrchestrator,
};
use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "alive3d-server")]
#[command(author, version, about = "Erase a masked object from a photo and synthesize a 3D asset in its place")]
struct Cli {
    /// Address to bind the HTTP server to
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Directory artifacts are persisted into
    #[arg(long, value_name = "PATH")]
    artifact_dir: Option<PathBuf>,

    /// Segmentation service endpoint URL
    #[arg(long, value_name = "URL")]
    segment_url: Option<String>,

    /// Inpainting service endpoint URL
    #[arg(long, value_name = "URL")]
    inpaint_url: Option<String>,

    /// 3D-generation service endpoint URL
    #[arg(long, value_name = "URL")]
    generate_url: Option<String>,

    /// Upstream call timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Enable verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn build_config(cli: &Cli) -> alive3d::Result<AppConfig> {
    let mut config = AppConfig::from_env()?;
    if let Some(addr) = cli.bind {
        config.bind_addr = addr;
    }
    if let Some(dir) = &cli.artifact_dir {
        config.artifact_dir.clone_from(dir);
    }
    if let Some(url) = &cli.segment_url {
        config.upstream.segment.clone_from(url);
    }
    if let Some(url) = &cli.inpaint_url {
        config.upstream.inpaint.clone_from(url);
    }
    if let Some(url) = &cli.generate_url {
        config.upstream.generate.clone_from(url);
    }
    if let Some(secs) = cli.timeout_secs {
        config.timeout_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    alive3d::tracing_config::init_server_tracing(cli.verbose)?;

    let config = build_config(&cli).context("invalid configuration")?;
    log::info!(
        "Upstream endpoints: segment={}, inpaint={}, generate={}",
        config.upstream.segment,
        config.upstream.inpaint,
        config.upstream.generate
    );

    let store = ArtifactStore::new(&config.artifact_dir).with_context(|| {
        format!(
            "cannot open artifact directory '{}'",
            config.artifact_dir.display()
        )
    })?;
    log::info!("Persisting artifacts in {}", store.root().display());

    let client = Arc::new(HttpInferenceClient::from_config(&config)?);
    let bind_addr = config.bind_addr;
    let orchestrator =
        PipelineOrchestrator::new(config, client, store, ArtifactEvents::default())?;

    run(bind_addr, AppState::new(Arc::new(orchestrator))).await?;
    Ok(())
}
