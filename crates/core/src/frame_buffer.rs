//! FrameBuffer: fixed-capacity ring of pending frames.
//!
//! The producer pushes at the tail, the consumer pops from the head. A full
//! buffer rejects new frames instead of overwriting ones that were never
//! shown.

use crate::error::CoreError;
use crate::frame::{checked_size, Frame};

#[derive(Debug, Clone)]
pub struct FrameBuffer {
    slots: Vec<Option<Frame>>,
    head: usize,
    len: usize,
    height: u16,
    width: u16,
}

impl FrameBuffer {
    /// Empty buffer holding up to `capacity` frames; blanks are
    /// `height x width`.
    pub fn new(capacity: usize, height: u16, width: u16) -> Result<Self, CoreError> {
        if capacity == 0 {
            return Err(CoreError::ZeroCapacity);
        }
        checked_size(height as usize, width as usize)?;
        Ok(Self {
            slots: vec![None; capacity],
            head: 0,
            len: 0,
            height,
            width,
        })
    }

    /// Buffer pre-filled with `frames`, oldest first.
    pub fn with_frames(
        capacity: usize,
        height: u16,
        width: u16,
        frames: Vec<Frame>,
    ) -> Result<Self, CoreError> {
        if frames.len() > capacity {
            return Err(CoreError::TooManyFrames {
                given: frames.len(),
                capacity,
            });
        }
        let mut buffer = Self::new(capacity, height, width)?;
        for frame in frames {
            buffer.push(frame)?;
        }
        Ok(buffer)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// `(height, width)` of the blank frames this buffer hands out.
    pub fn frame_size(&self) -> (u16, u16) {
        (self.height, self.width)
    }

    /// Queue a frame behind the ones already pending.
    pub fn push(&mut self, frame: Frame) -> Result<(), CoreError> {
        if self.is_full() {
            return Err(CoreError::NoBufferSpace {
                capacity: self.capacity(),
            });
        }
        let tail = (self.head + self.len) % self.slots.len();
        self.slots[tail] = Some(frame);
        self.len += 1;
        Ok(())
    }

    /// Take the oldest pending frame.
    pub fn pop(&mut self) -> Option<Frame> {
        if self.is_empty() {
            return None;
        }
        let frame = self.slots[self.head].take();
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        frame
    }

    pub fn peek(&self) -> Option<&Frame> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.head].as_ref()
    }

    /// Take the oldest pending frame, or a blank one when nothing is pending.
    pub fn pop_or_blank(&mut self) -> Frame {
        self.pop().unwrap_or_else(|| self.blank())
    }

    pub fn blank(&self) -> Frame {
        Frame::new(self.height, self.width)
    }

    /// Drop every pending frame.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.head = 0;
        self.len = 0;
    }

    /// Change the blank frame size. Pending frames were built for the old
    /// size and are dropped.
    pub fn resize_frames(&mut self, height: u16, width: u16) {
        self.height = height;
        self.width = width;
        self.clear();
    }
}
