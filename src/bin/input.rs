//! Input process.
//!
//! Connects to the engine as an input screen and answers `getFromPrompt`
//! by reading a command from this terminal.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use textgame::adapter::PeerClient;
use textgame::input::{read_instruction, run_input_screen, InputScreen};
use textgame::term::set_terminal_title;
use textgame::types::Role;

#[derive(Parser)]
#[command(name = "textgame-input")]
#[command(about = "Input screen for the text game engine")]
#[command(version)]
struct Cli {
    /// Engine address
    #[arg(long, env = "TEXTGAME_ENGINE_ADDR", default_value = "127.0.0.1:7878")]
    engine: SocketAddr,

    /// Name sent in the hello
    #[arg(long, default_value = "input")]
    name: String,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    textgame::init_logging(cli.verbose, cli.log_file.as_deref())?;

    let (client, welcome) = PeerClient::connect(cli.engine, Role::Input, &cli.name).await?;
    info!("registered as {}", welcome.name);
    if let Err(e) = set_terminal_title(&welcome.title) {
        warn!("failed to set title: {}", e);
    }

    let screen = InputScreen::from_welcome(&welcome);
    let (reader, writer) = client.split();
    run_input_screen(reader, writer, screen, read_instruction).await?;

    // A prompt may still be blocked on stdin; do not wait for it.
    std::process::exit(0)
}
