//! Game engine: routes instructions between the game, the displays and the
//! input screens.
//!
//! An [`Instance`] starts the TCP server, optionally launches one display
//! and one input process, and then loops: every instruction from a peer or
//! from the local queue is routed by [`route`] to a peer, to the game
//! channel, or handled by the engine itself (`stop`, `start`, `hideLogs`).

pub mod config;
pub mod instance;
pub mod router;

pub use textgame_adapter as adapter;
pub use textgame_types as types;

pub use config::{parse_launcher, EngineConfig, DISPLAY_BIN, INPUT_BIN};
pub use instance::{GameReceiver, Instance};
pub use router::{route, Route};
