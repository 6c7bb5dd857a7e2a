//! mira-view — entry point.
//!
//! ```text
//! mira-view                     Connect with defaults
//! mira-view --config <path>    Use custom config TOML
//! mira-view --gen-config       Write default config and exit
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpStream;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mira_core::{CmdPump, RenderSink, update_queue};

use mira_view::config::ViewConfig;
use mira_view::surface::MemorySurface;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mira-view", about = "mira screen-mirror viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "mira-view.toml")]
    config: PathBuf,

    /// Mirror source address (overrides config). Example: 192.168.1.50:5002
    #[arg(short, long)]
    address: Option<String>,

    /// Write the default configuration to the config path and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Render sink ──────────────────────────────────────────────────

/// Headless sink: logs the negotiated geometry, ignores redraw hints
/// (the consumer loop below draws as fast as updates arrive).
struct LogSink;

impl RenderSink for LogSink {
    fn screen_configured(&mut self, width: u32, height: u32) {
        info!(width, height, "remote screen configured");
    }

    fn request_redraw(&mut self) {}
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        ViewConfig::write_default(&cli.config)?;
        println!("wrote default config to {}", cli.config.display());
        return Ok(());
    }

    let mut config = ViewConfig::load(&cli.config);
    if let Some(addr) = cli.address {
        config.network.address = addr;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("mira-view v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Connect ──────────────────────────────────────────────

    let addr = config.network.address.clone();
    info!(%addr, "connecting");
    let stream = tokio::time::timeout(
        Duration::from_millis(config.network.timeout_ms),
        TcpStream::connect(&addr),
    )
    .await
    .map_err(|_| format!("connection to {addr} timed out"))??;
    stream.set_nodelay(true)?;
    let (reader, writer) = stream.into_split();

    // ── 2. Start the pump ───────────────────────────────────────

    let pump_config = config.pump_config();
    let bpp = pump_config.screen_format.bytes_per_pixel();
    let (tx, mut rx) = update_queue(config.pump.queue_capacity);

    let pump = CmdPump::new(
        reader,
        Some(Box::new(writer)),
        tx,
        Box::new(LogSink),
        pump_config,
    );
    let cancel = pump.cancellation_token();
    let pump_handle = tokio::spawn(pump.run());

    let ctrl_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            ctrl_cancel.cancel();
        }
    });

    // ── 3. Consume updates ──────────────────────────────────────

    let mut surface = MemorySurface::new(bpp);
    let mut stats = tokio::time::interval(Duration::from_secs(5));
    stats.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            update = rx.recv() => {
                let Some(update) = update else { break };
                update.apply(&mut surface);
            }
            _ = stats.tick() => {
                let (w, h) = surface.dimensions();
                if w > 0 {
                    info!(
                        width = w,
                        height = h,
                        blits = surface.blits(),
                        dropped = rx.dropped(),
                        "viewer stats"
                    );
                }
            }
        }
    }

    // ── 4. Shutdown ─────────────────────────────────────────────

    match pump_handle.await? {
        Ok(()) => info!("session ended"),
        Err(e) => {
            if e.is_protocol() {
                error!(error = %e, "peer violated the protocol");
            } else {
                error!(error = %e, "transport failed");
            }
            if rx.dropped() > 0 {
                warn!(dropped = rx.dropped(), "updates were dropped under load");
            }
            return Err(e.into());
        }
    }
    Ok(())
}
