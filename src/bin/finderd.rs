//! finderd - object finder daemon
//!
//! This daemon:
//! 1. Loads configuration (FINDER_CONFIG file, env overrides, flags)
//! 2. Starts the camera source and the model load
//! 3. Ticks the orchestrator: inference on the latest frame, overlay, results
//! 4. Reports results to the shell until interrupted (or until --seconds pass)

use anyhow::{anyhow, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use object_finder::{
    open_camera, spawn_camera, DetectorBackend, FinderConfig, FnLoader, LoaderRegistry,
    Orchestrator, OverlapPolicy, Shell, StubBackend,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Object label to look for (COCO class name).
    #[arg(long)]
    target: Option<String>,
    /// Confidence a detection must exceed to match, in [0, 1].
    #[arg(long)]
    threshold: Option<f32>,
    /// Stop reporting results after the first match.
    #[arg(long)]
    stop_on_found: bool,
    /// Disable the celebration when the target is found.
    #[arg(long)]
    no_celebrate: bool,
    /// Camera URL (stub://name or a local image path).
    #[arg(long)]
    camera: Option<String>,
    /// Model backend name.
    #[arg(long)]
    backend: Option<String>,
    /// Tick interval in milliseconds.
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Behaviour while an inference is in flight: skip_while_busy | cancel_stale.
    #[arg(long)]
    overlap: Option<OverlapPolicy>,
    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long, env = "FINDER_RUN_SECS")]
    seconds: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = FinderConfig::load()?;
    apply_args(&mut cfg, &args);
    cfg.validate()?;

    let registry = build_registry(&cfg);
    let loader = registry.get(&cfg.model.backend).ok_or_else(|| {
        anyhow!(
            "model backend '{}' not available (available: {})",
            cfg.model.backend,
            registry.list().join(", ")
        )
    })?;

    let camera = open_camera(&cfg.camera)?;
    let (camera_tx, camera_rx) = mpsc::channel(4);
    let _camera_task = spawn_camera(camera, cfg.camera.fps, camera_tx);

    let (results_tx, results_rx) = mpsc::unbounded_channel();
    let shell = tokio::spawn(Shell::new(cfg.detection.clone()).run(results_rx));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let orchestrator = Orchestrator::from_config(&cfg, results_tx);
    let run = tokio::spawn(orchestrator.run(loader, camera_rx, shutdown_rx));

    match args.seconds {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => {
            tokio::signal::ctrl_c().await?;
            log::info!("interrupt received; shutting down");
        }
    }
    let _ = shutdown_tx.send(true);

    let finished = run.await?;
    let shell = shell.await?;
    let stats = finished.state.stats();
    log::info!(
        "session: frames={} ticks={} inferences={} skipped_busy={} failures={} found={}",
        stats.frames,
        stats.ticks,
        stats.inferences,
        stats.skipped_busy,
        stats.failures,
        finished.state.found()
    );
    log::info!("latest results: {}", shell.summary());
    Ok(())
}

fn apply_args(cfg: &mut FinderConfig, args: &Args) {
    if let Some(target) = &args.target {
        cfg.detection.target_label = target.clone();
    }
    if let Some(threshold) = args.threshold {
        cfg.detection.confidence_threshold = threshold;
    }
    if args.stop_on_found {
        cfg.detection.stop_on_found = true;
    }
    if args.no_celebrate {
        cfg.detection.celebrate_on_found = false;
    }
    if let Some(camera) = &args.camera {
        cfg.camera.url = camera.clone();
    }
    if let Some(backend) = &args.backend {
        cfg.model.backend = backend.clone();
    }
    if let Some(tick_ms) = args.tick_ms {
        cfg.tick_interval = Duration::from_millis(tick_ms);
    }
    if let Some(overlap) = args.overlap {
        cfg.overlap = overlap;
    }
}

fn build_registry(cfg: &FinderConfig) -> LoaderRegistry {
    let mut registry = LoaderRegistry::new();

    let label = cfg.detection.target_label.clone();
    registry.register(FnLoader::new("stub", move || {
        Ok(Box::new(StubBackend::new(label.clone())) as Box<dyn DetectorBackend>)
    }));

    #[cfg(feature = "backend-tract")]
    {
        let path = cfg.model.path.clone();
        let input_size = cfg.model.input_size;
        let min_score = cfg.model.min_score;
        registry.register(FnLoader::new("tract", move || {
            let path = path
                .clone()
                .ok_or_else(|| anyhow!("tract backend requires FINDER_MODEL_PATH"))?;
            let backend =
                object_finder::detect::TractBackend::new(path, input_size)?.with_min_score(min_score);
            Ok(Box::new(backend) as Box<dyn DetectorBackend>)
        }));
    }

    registry
}
