//! Engine binary (default).
//!
//! Starts the engine server, launches one display and one input process
//! (unless `--no-spawn`), opens the first prompt and routes instructions
//! until a `stop` arrives. Instructions addressed to `game` are logged.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use textgame::adapter::{check_tcp_listen_available, parse_screen};
use textgame::engine::{parse_launcher, EngineConfig, Instance};

#[derive(Parser)]
#[command(name = "textgame")]
#[command(about = "Route instructions between a text game, its displays and its input screens")]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "TEXTGAME_HOST")]
    host: Option<String>,

    /// Port to listen on (0 picks a free one)
    #[arg(short, long, env = "TEXTGAME_PORT")]
    port: Option<u16>,

    /// Do not launch display and input processes; wait for them to connect
    #[arg(long)]
    no_spawn: bool,

    /// Launcher prefix that opens a terminal, e.g. "gnome-terminal --"
    #[arg(long, env = "TEXTGAME_TERMINAL")]
    terminal: Option<String>,

    /// Engine loop clock in milliseconds
    #[arg(long, env = "TEXTGAME_CLOCK_MS")]
    clock_ms: Option<u64>,

    /// Title sent to displays
    #[arg(long, env = "TEXTGAME_TITLE")]
    title: Option<String>,

    /// Display size as HEIGHTxWIDTH, e.g. 40x70
    #[arg(long, env = "TEXTGAME_SCREEN")]
    screen: Option<String>,

    /// Append every wire line to this file
    #[arg(long, env = "TEXTGAME_LOG_PATH")]
    wire_log: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::from_env();
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.no_spawn {
            config.spawn_peers = false;
        }
        if let Some(t) = &self.terminal {
            config.launcher = parse_launcher(t);
        }
        if let Some(ms) = self.clock_ms {
            config.clock = Duration::from_millis(ms.max(1));
        }
        if let Some(title) = &self.title {
            config.server.title = title.clone();
        }
        if let Some(s) = &self.screen {
            config.server.screen =
                parse_screen(s).with_context(|| format!("invalid screen size {s:?}"))?;
        }
        if self.wire_log.is_some() {
            config.server.log_path = self.wire_log.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    textgame::init_logging(cli.verbose, cli.log_file.as_deref())?;

    let config = cli.engine_config()?;
    if config.server.port != 0 {
        check_tcp_listen_available(&config.server.host, config.server.port).with_context(|| {
            format!(
                "cannot listen on {}:{}",
                config.server.host, config.server.port
            )
        })?;
    }

    info!("Starting textgame v{}", env!("CARGO_PKG_VERSION"));
    let (mut instance, mut game_rx) = Instance::new(config).await?;

    let game = tokio::spawn(async move {
        while let Some(ins) = game_rx.recv().await {
            info!("game: {}", ins);
        }
    });

    let result = instance.default_start().await;
    drop(instance);
    game.abort();
    result
}
