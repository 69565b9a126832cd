//! A single character slot of a frame.

/// One character slot. Its position is implied by where it sits in the
/// owning [`crate::Frame`].
///
/// An empty cell is transparent when frames are composited and prints as a
/// space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Cell {
    value: Option<char>,
}

impl Cell {
    pub const EMPTY: Cell = Cell { value: None };

    pub const fn new(ch: char) -> Self {
        Self { value: Some(ch) }
    }

    pub fn write(&mut self, ch: char) {
        self.value = Some(ch);
    }

    pub fn clear(&mut self) {
        self.value = None;
    }

    pub fn value(&self) -> Option<char> {
        self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Character to print for this cell.
    #[inline]
    pub fn glyph(&self) -> char {
        self.value.unwrap_or(' ')
    }
}
