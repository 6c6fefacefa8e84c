mod http;
mod publish;
mod socket;
mod spotify;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dance_core::config::Config;
use dance_core::protocol::{Command, DisplaySnapshot};
use dance_core::{Poller, StyleLookup};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "dancify", version, about = "Live dance-style display daemon")]
struct Args {
    /// Config file (default: <config dir>/config.toml, created if missing)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lookup CSV, overrides [lookup] csv_file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Fallback playlist ID, URL or URI, overrides [next] fallback_playlist
    #[arg(long)]
    playlist: Option<String>,

    /// Print the effective config as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Debug, Clone)]
pub enum BroadcastMessage {
    Log(String),
    /// A new error status line.
    Error(String),
}

/// A custom tracing layer that forwards log messages to the broadcast channel
struct BroadcastLayer {
    sender: broadcast::Sender<BroadcastMessage>,
}

impl BroadcastLayer {
    fn new(sender: broadcast::Sender<BroadcastMessage>) -> Self {
        Self { sender }
    }
}

impl<S> tracing_subscriber::Layer<S> for BroadcastLayer
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        // Only forward WARN and ERROR to display clients
        let level = event.metadata().level();
        if !matches!(*level, tracing::Level::WARN | tracing::Level::ERROR) {
            return;
        }

        let mut message = String::new();
        let now = chrono::Local::now();
        message.push_str(&format!("{} ", now.format("%H:%M:%S")));
        message.push_str(&format!("[{}] ", level));

        let mut visitor = MessageVisitor(&mut message);
        event.record(&mut visitor);

        // No receivers is OK
        let _ = self.sender.send(BroadcastMessage::Log(message));
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl<'a> tracing::field::Visit for MessageVisitor<'a> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        } else {
            self.0.push_str(&format!(" {}={:?}", field.name(), value));
        }
    }
}

/// `create_missing` writes a default file when none exists.
fn load_config(args: &Args, create_missing: bool) -> anyhow::Result<Config> {
    let path = args.config.clone().unwrap_or_else(Config::config_path);
    let loaded = if create_missing {
        Config::load_from(&path)
    } else {
        Config::read_from(&path)
    };
    let mut config =
        loaded.with_context(|| format!("Failed to load config from {}", path.display()))?;
    info!("Config loaded from: {:?}", path);

    if let Some(csv) = &args.csv {
        config.lookup.csv_file = csv.clone();
    }
    if let Some(playlist) = &args.playlist {
        config.next.fallback_playlist = playlist.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_config {
        let config = load_config(&args, false)?;
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    // Setup broadcast channel first so we can use it for logging
    let (broadcast_tx, _) = broadcast::channel::<BroadcastMessage>(100);

    let data_dir = dance_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = dance_core::platform::log_file();

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    let broadcast_layer = BroadcastLayer::new(broadcast_tx.clone());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(broadcast_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,dancify=debug,dance_core=debug")
            }),
        )
        .init();

    info!("Log file: {:?}", log_path);

    let config = load_config(&args, true)?;

    let (lookup, lookup_err) = StyleLookup::open(config.lookup.csv_file.clone());
    if let Some(e) = lookup_err {
        warn!(
            "Lookup {} not loaded, every track is unmapped until reload: {}",
            config.lookup.csv_file.display(),
            e
        );
    }

    let service = spotify::SpotifyClient::from_config(&config)?;
    if !service.has_token() {
        warn!(
            "No access token: set {} or [spotify] access_token",
            config.spotify.token_env
        );
    }

    let (state_tx, state_rx) = watch::channel(DisplaySnapshot::default());
    let (command_tx, command_rx) = mpsc::channel::<Command>(64);

    let _socket_handle = socket::start_server(
        config.http.bind_address.clone(),
        config.daemon.tcp_port,
        state_rx.clone(),
        command_tx.clone(),
        broadcast_tx.clone(),
    );

    if config.http.enabled {
        let _http_handle = http::start_server(
            config.http.bind_address.clone(),
            config.http.port,
            state_rx.clone(),
            command_tx.clone(),
        );
    }

    // command_tx stays alive here so the poller keeps ticking without clients
    let poller = Poller::new(&service, lookup, config.poller_options());
    let mut publisher = publish::SnapshotPublisher::new(state_tx, broadcast_tx);

    info!("Daemon initialised, running poller");
    poller.run(&mut publisher, command_rx).await;

    Ok(())
}
