use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use wifi_analyzer::agent::GrpcAgent;
use wifi_analyzer::config::Config;
use wifi_analyzer::publisher::Publisher;
use wifi_analyzer::session::CaptureSession;
use wifi_analyzer::state::StateManager;

#[derive(Parser)]
#[command(name = "wifi_analyzer")]
#[command(version, about = "Real-time 802.11 BSS/STA analyzer fed by a remote capture agent")]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Capture agent address (host:port).
    #[arg(short, long)]
    agent: Option<String>,

    /// Monitor-mode interface on the agent.
    #[arg(short, long)]
    interface: Option<String>,

    /// Channel to capture on, 0 keeps the current one.
    #[arg(long)]
    channel: Option<u8>,

    /// Capture bandwidth, e.g. HT20 or HT40+.
    #[arg(short, long)]
    bandwidth: Option<String>,

    /// BPF filter applied by the agent.
    #[arg(short, long)]
    filter: Option<String>,

    /// File to append snapshots to instead of standard output.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log filter, overrides the configuration file. RUST_LOG wins over both.
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(agent) = self.agent {
            config.grpc_server_address = agent;
        }
        if let Some(interface) = self.interface {
            config.capture.interface = interface;
        }
        if let Some(channel) = self.channel {
            config.capture.channel = channel;
        }
        if let Some(bandwidth) = self.bandwidth {
            config.capture.bandwidth = bandwidth;
        }
        if let Some(filter) = self.filter {
            config.capture.bpf_filter = filter;
        }
        if let Some(output) = self.output {
            config.output = Some(output);
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut config, load_error) = Config::load(cli.config.as_deref());
    cli.apply(&mut config);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .format_timestamp_millis()
    .init();

    if let Some(err) = load_error {
        warn!("{err}, using the default configuration");
    }

    let root = CancellationToken::new();
    {
        let root = root.clone();
        ctrlc::set_handler(move || {
            info!("Interrupt received, shutting down");
            root.cancel();
        })
        .context("Cannot install the interrupt handler")?;
    }

    let agent = GrpcAgent::connect_lazy(&config.grpc_server_address, config.control_timeout())?;
    let state = Arc::new(StateManager::new(config.state_config()));
    let session = CaptureSession::new(
        Arc::new(agent),
        state,
        config.capture.clone(),
        root.clone(),
    );

    let publisher = Publisher::open(config.output.as_deref()).await?;
    let tickers = session.spawn_tickers(
        config.metrics_interval(),
        config.prune_interval(),
        config.stale_after(),
        config.snapshot_interval(),
        publisher,
    );

    info!(
        "Capturing on {} via {}",
        config.capture.interface, config.grpc_server_address
    );
    if let Err(err) = session.start_capture().await {
        error!("Cannot start the capture: {err}");
        root.cancel();
    }

    root.cancelled().await;

    if session.is_running().await {
        if let Err(err) = session.stop_capture().await {
            warn!("Cannot stop the capture: {err}");
        }
    }
    session.shutdown().await;
    for ticker in tickers {
        if let Err(err) = ticker.await {
            warn!("Ticker failed: {err}");
        }
    }

    let (bsss, stas) = session.state().counts();
    info!("Done, {bsss} BSSs and {stas} stations seen");
    Ok(())
}
