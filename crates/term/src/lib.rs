//! Terminal side of a display process.
//!
//! [`DisplayScreen`] owns the canvas and the pending-frame buffer and turns
//! instructions into frames. [`TerminalRenderer`] flushes frames to a real
//! terminal with crossterm, and [`RenderThrottle`] decides when a tick is
//! worth a redraw.

pub mod display;
pub mod render_throttle;
pub mod renderer;

pub use textgame_core as core;
pub use textgame_types as types;

pub use display::{DisplayAction, DisplayError, DisplayScreen};
pub use render_throttle::RenderThrottle;
pub use renderer::{encode_diff_into, encode_full_into, set_terminal_title, TerminalRenderer};
