//! Display process.
//!
//! Connects to the engine as a display, then prints one frame per clock
//! tick from its frame buffer. Unchanged screens are repainted at most once
//! per repaint interval.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use log::{debug, info, warn, LevelFilter};

use textgame::adapter::{PeerClient, PeerMessage, PeerReader, PeerWriter};
use textgame::term::{DisplayAction, DisplayScreen, RenderThrottle, TerminalRenderer};
use textgame::types::{Role, DEFAULT_BUFFER_LEN, DEFAULT_CLOCK_MS};

#[derive(Parser)]
#[command(name = "textgame-display")]
#[command(about = "Display process for the text game engine")]
#[command(version)]
struct Cli {
    /// Engine address
    #[arg(long, env = "TEXTGAME_ENGINE_ADDR", default_value = "127.0.0.1:7878")]
    engine: SocketAddr,

    /// Name sent in the hello
    #[arg(long, default_value = "display")]
    name: String,

    /// Frames held before new ones are dropped
    #[arg(long, env = "TEXTGAME_BUFFER_LEN", default_value_t = DEFAULT_BUFFER_LEN)]
    buffer_len: usize,

    /// Print clock in milliseconds
    #[arg(long, env = "TEXTGAME_CLOCK_MS", default_value_t = DEFAULT_CLOCK_MS)]
    clock_ms: u64,

    /// Repaint an unchanged screen at most this often, in milliseconds
    #[arg(long, default_value_t = 1000)]
    repaint_ms: u64,

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

    let (client, welcome) = PeerClient::connect(cli.engine, Role::Display, &cli.name).await?;
    info!("registered as {}", welcome.name);

    let screen = DisplayScreen::new(welcome.screen.height, welcome.screen.width, cli.buffer_len)?
        .with_title(welcome.title.clone());

    let mut term = TerminalRenderer::new();
    term.enter()?;
    if let Err(e) = term.set_title(&welcome.title) {
        warn!("failed to set title: {}", e);
    }

    let (reader, writer) = client.split();
    let result = run(&cli, &mut term, screen, reader, writer).await;

    // Always try to restore terminal state.
    let _ = term.exit();
    result
}

async fn run(
    cli: &Cli,
    term: &mut TerminalRenderer,
    mut screen: DisplayScreen,
    mut reader: PeerReader,
    mut writer: PeerWriter,
) -> Result<()> {
    let start = Instant::now();
    let mut throttle = RenderThrottle::new(cli.repaint_ms);
    let mut clock = tokio::time::interval(Duration::from_millis(cli.clock_ms.max(1)));
    clock.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = reader.recv() => {
                let ins = match msg? {
                    Some(PeerMessage::Instruction(m)) => m.into_instruction(),
                    Some(PeerMessage::Error(e)) => {
                        warn!("engine error {:?}: {}", e.code, e.message);
                        continue;
                    }
                    Some(other) => {
                        debug!("ignoring {:?}", other);
                        continue;
                    }
                    None => {
                        info!("engine closed the connection");
                        return Ok(());
                    }
                };
                match screen.handle(&ins) {
                    Ok(DisplayAction::None) => {}
                    Ok(DisplayAction::Render(frame)) => term.draw(&frame)?,
                    Ok(DisplayAction::Resize { height, width }) => term.set_size(height, width)?,
                    Ok(DisplayAction::Retitle(title)) => term.set_title(&title)?,
                    Ok(DisplayAction::Reply(reply)) => writer.send(reply).await?,
                    Ok(DisplayAction::HideLogs) => log::set_max_level(LevelFilter::Error),
                    Ok(DisplayAction::Stop) => {
                        info!("stop received");
                        return Ok(());
                    }
                    Err(e) => warn!("{}: {}", ins, e),
                }
            }
            _ = clock.tick() => {
                let next = screen.tick();
                let fresh = next.is_some();
                let Some(frame) = next.or_else(|| term.last().cloned()) else {
                    continue;
                };
                let now_ms = start.elapsed().as_millis() as u64;
                if throttle.should_draw(now_ms, &frame, fresh) {
                    if !fresh {
                        term.invalidate();
                    }
                    term.draw(&frame)?;
                }
            }
        }
    }
}
