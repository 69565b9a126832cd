//! Text game (workspace facade crate).
//!
//! Re-exports the workspace crates under one name and holds the logging
//! setup shared by the three binaries: `textgame` (engine),
//! `textgame-display` and `textgame-input`.

pub use textgame_adapter as adapter;
pub use textgame_core as core;
pub use textgame_engine as engine;
pub use textgame_input as input;
pub use textgame_term as term;
pub use textgame_types as types;

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};

/// Set up `env_logger` for a binary.
///
/// `verbose` raises the base level (`-v` debug, `-vv` trace); `RUST_LOG`
/// still wins. Logs go to stderr, or are appended to `file` when given.
pub fn init_logging(verbose: u8, file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    let base_level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    builder.parse_default_env();
    if let Some(path) = file {
        let f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(f)));
    }
    builder.try_init().context("logger already initialised")?;
    Ok(())
}
