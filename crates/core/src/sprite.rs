//! Sprites: frames drawn from literal strings.

use std::ops::Deref;

use crate::error::CoreError;
use crate::frame::{checked_size, Frame};

/// A frame populated from a literal string and placed onto a parent frame
/// at an `(x, y)` offset.
///
/// Lines are split on `\n`; the widest line sets the width and shorter
/// lines are padded with empty (transparent) cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    frame: Frame,
    x: u16,
    y: u16,
}

impl Sprite {
    /// Build a sprite from `text`. Text larger than
    /// [`MAX_FRAME_CELLS`](crate::types::MAX_FRAME_CELLS) is refused rather
    /// than truncated.
    pub fn new(text: &str) -> Result<Self, CoreError> {
        let lines: Vec<&str> = text.split('\n').collect();
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let (height, width) = checked_size(lines.len(), width)?;
        let mut frame = Frame::new(height, width).with_priority(2);
        for (r, line) in (0..height).zip(&lines) {
            frame.write_str(r, 0, line);
        }
        Ok(Self { frame, x: 0, y: 0 })
    }

    /// Offset from the parent's top-left corner: `x` columns, `y` rows.
    pub fn at(mut self, x: u16, y: u16) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.frame.set_priority(priority);
        self
    }

    pub fn offset(&self) -> (u16, u16) {
        (self.x, self.y)
    }

    /// Write the sprite onto `parent`, clipped to the parent's bounds.
    ///
    /// Returns the number of cells written.
    pub fn place_onto(&self, parent: &mut Frame) -> Result<usize, CoreError> {
        let (pr, pc) = parent.origin();
        let mut placed = self.frame.clone();
        placed.set_origin(pr.saturating_add(self.y), pc.saturating_add(self.x));
        parent.overlay(&placed)
    }

    pub fn into_frame(self) -> Frame {
        self.frame
    }
}

impl Deref for Sprite {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.frame
    }
}
