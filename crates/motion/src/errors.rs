//! Error types for the motion crate.

/// Represents errors that can occur while manipulating a path buffer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PathError {
    /// A retraction was requested beyond the retained history window.
    /// The position is unchanged.
    RetractionExceedsHistory,
    /// The next-segment slot is already occupied (or the current segment is
    /// final), so no further segment can be written.
    NextSlotOccupied,
}
