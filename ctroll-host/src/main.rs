//! ctroll-host entry point.
//!
//! ```text
//! ctroll-host                    Stream the test pattern to the configured peer
//! ctroll-host --config <path>    Load a custom config TOML
//! ctroll-host --peer <host>      Override the peer address
//! ctroll-host --ticks <n>        Stop after n ticks
//! ctroll-host --gen-config       Write default config to stdout
//! ```

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ctroll_host::config::HostConfig;
use ctroll_host::service::HostService;
use ctroll_host::sink::LogSink;
use ctroll_host::source::TestPattern;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ctroll-host", about = "Stream frames to a remote handheld and read its controls")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "ctroll-host.toml")]
    config: PathBuf,

    /// Peer host or IP, overriding `[network] peer`.
    #[arg(short, long)]
    peer: Option<String>,

    /// Stop after this many ticks.
    #[arg(long)]
    ticks: Option<u64>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&HostConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = HostConfig::load(&cli.config);
    if let Some(peer) = cli.peer {
        config.network.peer = peer;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("ctroll-host v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "peer {} (frames :{}, controls {}:{})",
        config.network.peer,
        config.network.outbound_port,
        config.network.inbound_peer(),
        config.network.inbound_port
    );
    info!(
        "{}x{} @ {} fps",
        config.capture.width, config.capture.height, config.capture.fps
    );

    let mut source = TestPattern::new(
        config.capture.width,
        config.capture.height,
        config.capture.pattern_step_frames,
    );
    let mut sink = LogSink::new();
    let service = HostService::new(config);

    let stop = service.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, Ordering::SeqCst);
    });

    service.run(&mut source, &mut sink, cli.ticks).await?;

    Ok(())
}
