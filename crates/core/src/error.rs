use thiserror::Error;

/// Errors raised by frames and the frame buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("no space in frame buffer (capacity {capacity})")]
    NoBufferSpace { capacity: usize },

    #[error("{given} initial frames do not fit a buffer of capacity {capacity}")]
    TooManyFrames { given: usize, capacity: usize },

    #[error("frame buffer capacity must be at least 1")]
    ZeroCapacity,

    #[error("frames do not intersect")]
    NoIntersection,

    #[error("cannot compose an empty list of frames")]
    EmptyComposition,

    #[error("frame of {height}x{width} exceeds the {max} cell limit")]
    FrameTooLarge { height: usize, width: usize, max: usize },

    #[error("grid shape mismatch: expected {expected}, found {found}")]
    GridShape { expected: String, found: String },
}
