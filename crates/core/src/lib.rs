//! Core frame module - pure, deterministic, and testable
//!
//! This module contains the character grids the displays print and the
//! buffer that queues them. It has **no dependencies** on terminals,
//! networking, or I/O.
//!
//! # Module Structure
//!
//! - [`cell`]: a single character slot
//! - [`frame`]: a positioned, prioritized grid of cells with compositing
//! - [`sprite`]: a frame built from a literal string, placed onto a parent
//! - [`frame_buffer`]: fixed-capacity FIFO ring of pending frames
//! - [`error`]: errors raised by the above
//!
//! # Compositing
//!
//! Frames live in a shared coordinate space: each one has an origin
//! `(row, col)` for its top-left corner. Two frames are merged over the
//! region where they overlap; the frame with the higher priority writes its
//! non-empty cells onto the other.
//!
//! # Example
//!
//! ```
//! use textgame_core::{Frame, FrameBuffer, Sprite};
//!
//! let mut canvas = Frame::new(3, 5);
//! canvas.fill('.');
//!
//! let ship = Sprite::new("<^>").unwrap().at(1, 1);
//! ship.place_onto(&mut canvas).unwrap();
//! assert_eq!(canvas.to_string(), ".....\n.<^>.\n.....");
//!
//! let mut buffer = FrameBuffer::new(2, 3, 5).unwrap();
//! buffer.push(canvas).unwrap();
//! assert_eq!(buffer.len(), 1);
//! ```

pub mod cell;
pub mod error;
pub mod frame;
pub mod frame_buffer;
pub mod sprite;

pub use textgame_types as types;

pub use cell::Cell;
pub use error::CoreError;
pub use frame::{checked_size, compose, Frame, Overlap};
pub use frame_buffer::FrameBuffer;
pub use sprite::Sprite;
