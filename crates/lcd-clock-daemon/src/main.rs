//! LCD Clock Daemon
//!
//! Shows the time, date and a scrolling message on an ILI9486 SPI panel.
//! The message is set by writing a line to one of two Unix sockets.

mod clock;
mod config;
mod message;
mod rendering;
mod sync;
mod theme;

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use lcd_clock_hw::Ili9486;
use tokio::net::UnixStream;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use clock::{ClockFace, ClockFonts, LocalTime};
use config::Config;
use message::{MessageBoard, MessageListener};
use sync::SyncMonitor;
use theme::Palette;

/// Configuration file used when `--config` is not given.
const DEFAULT_CONFIG: &str = "config/default.toml";

#[derive(Parser)]
#[command(name = "lcdclockd")]
#[command(about = "Clock and message display for ILI9486 SPI panels")]
#[command(version)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Detach and run in the background
    #[arg(short = 'b', long)]
    daemon: bool,

    /// Rotate the display 180 degrees
    #[arg(short, long)]
    rotate: bool,

    /// Configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let config = load_config(args.config.as_deref())?;

    if args.daemon {
        daemonize()?;
    }

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?
        .block_on(run(args, config))
}

/// Loads `path`, or the default file if it exists, or built-in defaults.
fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => {
            let config = Config::load(path).context("Failed to load configuration")?;
            info!("Loaded configuration from: {}", path);
            Ok(config)
        }
        None if Path::new(DEFAULT_CONFIG).exists() => {
            let config = Config::load(DEFAULT_CONFIG).context("Failed to load configuration")?;
            info!("Loaded configuration from: {}", DEFAULT_CONFIG);
            Ok(config)
        }
        None => {
            info!("No configuration file, using defaults");
            Ok(Config::default())
        }
    }
}

fn daemonize() -> Result<()> {
    // SAFETY: called before any threads are started
    if unsafe { libc::daemon(0, 0) } < 0 {
        return Err(std::io::Error::last_os_error()).context("Cannot background the process");
    }
    Ok(())
}

async fn run(args: Args, config: Config) -> Result<()> {
    let settings = config.panel.settings(args.rotate)?;
    debug!("TZ: {:?}", std::env::var("TZ").ok());

    let primary = MessageListener::bind(
        &config.sockets.primary,
        message::Slot::Primary,
        config.sockets.mode,
    )?;
    let secondary = MessageListener::bind(
        &config.sockets.secondary,
        message::Slot::Secondary,
        config.sockets.mode,
    )?;

    let mut lcd = Ili9486::open(&settings).context("Failed to initialise the panel")?;

    let fonts = ClockFonts::load(&config.fonts).context("Failed to load fonts")?;
    let mut face = ClockFace::new(fonts, &config.scroll);
    let mut board = MessageBoard::new(config.message.as_bytes());
    let mut sync = SyncMonitor::new(config.ntp_check);

    let frame_wait = Duration::from_millis(config.frame_wait_ms);
    let read_timeout = Duration::from_millis(config.sockets.read_timeout_ms);
    let mut refresh_errors = ErrorThrottle::new("Refresh");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("Clock running");
    loop {
        let now = LocalTime::now();
        let palette = Palette::select(now.hour, sync.poll(now.second));

        face.draw(lcd.framebuffer_mut(), &now, palette, &mut board);
        refresh_errors.record(lcd.refresh());

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            client = primary.accept() => {
                serve_client(&mut board, &primary, client, read_timeout).await;
            }
            client = secondary.accept() => {
                serve_client(&mut board, &secondary, client, read_timeout).await;
            }
            _ = tokio::time::sleep(frame_wait) => {}
        }
    }

    lcd.destroy().context("Failed to release the panel")?;
    Ok(())
}

/// Reads one line from a client and stores it in the listener's slot. The
/// frame loop waits for this, so a slow client is bounded by `read_timeout`.
async fn serve_client(
    board: &mut MessageBoard,
    listener: &MessageListener,
    client: std::io::Result<UnixStream>,
    read_timeout: Duration,
) {
    let line = match client {
        Ok(stream) => message::read_line(stream, read_timeout).await,
        Err(e) => Err(e),
    };
    match line {
        Ok(line) => board.replace(listener.slot(), &line),
        Err(e) => warn!("Message on {} dropped: {}", listener.path().display(), e),
    }
}

/// Logs the first of a run of errors, then at most once a minute with the
/// number suppressed in between.
struct ErrorThrottle {
    what: &'static str,
    failing: bool,
    suppressed: u32,
    last_log: Instant,
}

impl ErrorThrottle {
    fn new(what: &'static str) -> Self {
        Self {
            what,
            failing: false,
            suppressed: 0,
            last_log: Instant::now(),
        }
    }

    fn record<E: std::fmt::Display>(&mut self, result: Result<(), E>) {
        let Err(e) = result else {
            if self.failing {
                info!("{} recovered", self.what);
            }
            self.failing = false;
            self.suppressed = 0;
            return;
        };

        let elapsed = self.last_log.elapsed();
        if !self.failing {
            warn!("{} error: {}", self.what, e);
        } else if elapsed >= Duration::from_secs(60) {
            warn!(
                "{} error (repeated {} times in {:?}): {}",
                self.what, self.suppressed, elapsed, e
            );
        } else {
            self.suppressed += 1;
            return;
        }
        self.failing = true;
        self.suppressed = 0;
        self.last_log = Instant::now();
    }
}
