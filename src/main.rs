//! PiCamera Server CLI
//!
//! Runs the camera HTTP server, or performs a single capture or purge
//! against the configured capture store.

use clap::{Parser, Subcommand, ValueEnum};
use picamera_server::{
    camera::{self, CameraController, SourceKind},
    capture::CaptureScheduler,
    config::{ConfigError, FileConfig},
    metrics::{MetricsError, MetricsRegistry},
    server::{AppState, Server, ServerError},
    storage::{CaptureStore, StoreError},
    CameraError, SchedulerError,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Raspberry Pi camera server with MJPEG streaming and timed captures")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, env = "PICAMERA_CONFIG")]
    config: Option<PathBuf>,

    /// Address to serve HTTP on.
    #[arg(long, env = "SERVER_BIND")]
    bind: Option<SocketAddr>,

    /// Frame source to use.
    #[arg(long, env = "PICAMERA_SOURCE", value_enum)]
    camera: Option<CameraArg>,

    /// Initial capture interval in seconds.
    #[arg(long, env = "DEFAULT_CAPTURE_INTERVAL")]
    interval: Option<u64>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Take one capture and print its record as JSON.
    Capture,
    /// Delete every stored capture.
    Purge,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum CameraArg {
    Synthetic,
    Hardware,
}

impl From<CameraArg> for SourceKind {
    fn from(arg: CameraArg) -> Self {
        match arg {
            CameraArg::Synthetic => SourceKind::Synthetic,
            CameraArg::Hardware => SourceKind::Hardware,
        }
    }
}

#[derive(Debug, Error)]
enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("capture store error: {0}")]
    Store(#[from] StoreError),
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),
    #[error("server error: {0}")]
    Server(#[from] ServerError),
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Process-wide components, built once.
struct Components {
    camera: CameraController,
    store: Arc<CaptureStore>,
    metrics: MetricsRegistry,
    scheduler: CaptureScheduler,
}

impl Components {
    fn build(config: &FileConfig) -> Result<Self, AppError> {
        let camera = CameraController::new(camera::open_source(&config.camera)?);
        let store = Arc::new(CaptureStore::open(
            &config.capture.captures_dir,
            &config.capture.database,
        )?);
        let metrics = MetricsRegistry::new()?;
        let scheduler = CaptureScheduler::builder(camera.clone(), Arc::clone(&store))
            .interval(config.capture.default_interval)
            .on_failure(config.capture.on_failure)
            .metrics(metrics.clone())
            .build()?;

        Ok(Self {
            camera,
            store,
            metrics,
            scheduler,
        })
    }

    fn close(&self) {
        self.scheduler.shutdown();
        self.camera.close();
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    info!("PiCamera Server v{}", picamera_server::VERSION);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config),
        Command::Capture => capture(&config),
        Command::Purge => purge(&config),
    };

    if let Err(e) = result {
        error!(error = %e, "Fatal error");
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<FileConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            FileConfig::from_file(path)?
        }
        None => FileConfig::default(),
    };

    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    if let Some(source) = cli.camera {
        config.camera.source = source.into();
    }
    if let Some(interval) = cli.interval {
        config.capture.default_interval = interval;
    }

    config.validate()?;
    Ok(config)
}

fn serve(config: &FileConfig) -> Result<(), AppError> {
    let components = Components::build(config)?;
    let state = AppState::new(
        components.camera.clone(),
        components.scheduler.clone(),
        Arc::clone(&components.store),
        components.metrics.clone(),
        config.server.items_per_page,
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let served = runtime.block_on(Server::new(config.server.bind_addr, state).run(shutdown_signal()));
    runtime.shutdown_timeout(Duration::from_secs(5));

    components.close();
    info!("Shutdown complete");
    served?;
    Ok(())
}

fn capture(config: &FileConfig) -> Result<(), AppError> {
    let components = Components::build(config)?;
    let captured = components.scheduler.capture_once();
    components.close();

    println!("{}", serde_json::to_string_pretty(&captured?)?);
    Ok(())
}

fn purge(config: &FileConfig) -> Result<(), AppError> {
    let store = CaptureStore::open(&config.capture.captures_dir, &config.capture.database)?;
    let removed = store.remove_all()?;
    println!("Removed {} captures", removed);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
