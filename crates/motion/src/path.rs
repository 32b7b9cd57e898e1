//! Two-segment path buffer with discrete-notch traversal.
//!
//! The buffer holds the segment being traversed plus at most one lookahead
//! segment. Position along the current segment is quantised to a fine notch
//! ([`NOTCH_MM`]); sub-notch movement accumulates in a fractional carry so
//! arbitrarily small per-tick displacements still add up.
//!
//! Retraction (negative movement, used by the EDM gap controller) is only
//! allowed within a bounded history window; a larger retraction request
//! fails without changing the position. Promoting the lookahead segment to
//! current discards the history.

use crate::errors::PathError;
use crate::pos::PhysPos;

/// Discrete traversal resolution in millimetres (5 µm).
pub const NOTCH_MM: f32 = 0.005;

/// Retraction history capacity in notches (~1 mm window).
pub const HISTORY_LEN: usize = 201;

#[derive(Debug, Clone, Copy)]
struct Segment {
    src: PhysPos,
    dst: PhysPos,
    len_mm: f32,
    end: bool,
}

impl Segment {
    fn new(src: PhysPos, dst: PhysPos, end: bool) -> Self {
        Self {
            src,
            dst,
            len_mm: src.dist(&dst),
            end,
        }
    }

    /// Segment length in whole notches.
    fn notches(&self) -> i32 {
        (self.len_mm / NOTCH_MM + 0.5) as i32
    }
}

/// Path buffer: one current segment, one optional lookahead segment, and a
/// notch-quantised position along the current segment.
#[derive(Debug)]
pub struct PathBuffer {
    current: Segment,
    next: Option<Segment>,
    /// Discrete position along `current`, in notches from `src`.
    notch: i32,
    /// Sub-notch remainder carried between moves.
    frac_mm: f32,
    /// Notches retractable before the history window is exhausted.
    retractable: i32,
}

impl PathBuffer {
    /// Seeds the buffer with its first segment; position starts at `src`.
    pub fn new(src: PhysPos, dst: PhysPos, end: bool) -> Self {
        Self {
            current: Segment::new(src, dst, end),
            next: None,
            notch: 0,
            frac_mm: 0.0,
            retractable: 0,
        }
    }

    /// True iff the buffer may be traversed: either the current segment is
    /// final or a lookahead segment is queued.
    pub fn is_ready(&self) -> bool {
        self.current.end || self.next.is_some()
    }

    /// True iff a lookahead segment can be accepted.
    pub fn can_write(&self) -> bool {
        !self.current.end && self.next.is_none()
    }

    /// True iff the final segment has been fully traversed.
    pub fn at_end(&self) -> bool {
        self.current.end && self.notch >= self.current.notches()
    }

    /// Queues the lookahead segment, continuing from the current segment's
    /// destination.
    pub fn write(&mut self, dst: PhysPos, end: bool) -> Result<(), PathError> {
        if !self.can_write() {
            return Err(PathError::NextSlotOccupied);
        }
        self.next = Some(Segment::new(self.current.dst, dst, end));
        Ok(())
    }

    /// Current position interpolated along the current segment.
    pub fn get_pos(&self) -> PhysPos {
        let total = self.current.notches();
        if total <= 0 {
            return self.current.dst;
        }
        let t = self.notch as f32 / total as f32;
        self.current.src.lerp(&self.current.dst, t)
    }

    /// Advances (`delta_mm > 0`) or retracts (`delta_mm < 0`) along the path.
    ///
    /// Crossing the current segment's end promotes the lookahead segment
    /// (discarding history) or, on the final segment, clamps at the end.
    /// A retraction deeper than the history window fails without mutation.
    pub fn move_by(&mut self, delta_mm: f32) -> Result<(), PathError> {
        let total = self.frac_mm + delta_mm;
        let steps = (total / NOTCH_MM) as i32;

        if steps < 0 && -steps > self.retractable {
            return Err(PathError::RetractionExceedsHistory);
        }
        self.frac_mm = total - steps as f32 * NOTCH_MM;

        if steps < 0 {
            self.notch += steps;
            self.retractable += steps;
            return Ok(());
        }

        let mut remaining = steps;
        while remaining > 0 {
            let end_notch = self.current.notches();
            if self.notch < end_notch {
                let take = remaining.min(end_notch - self.notch);
                self.notch += take;
                self.retractable = (self.retractable + take).min(HISTORY_LEN as i32 - 1);
                remaining -= take;
            } else if let Some(next) = self.next.take() {
                self.current = next;
                self.notch = 0;
                self.retractable = 0;
            } else {
                // Final segment (clamp) or starved lookahead (hold); the
                // excess movement and carry are dropped either way.
                self.frac_mm = 0.0;
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = NOTCH_MM + 1e-4;

    fn p(x: f32, y: f32, z: f32) -> PhysPos {
        PhysPos::new(x, y, z)
    }

    #[test]
    fn init_without_end_is_not_ready() {
        let pb = PathBuffer::new(p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0), false);
        assert_eq!(pb.get_pos(), p(0.0, 0.0, 0.0));
        assert!(!pb.is_ready());
        assert!(pb.can_write());
        assert!(!pb.at_end());
    }

    #[test]
    fn init_with_end_is_ready() {
        let pb = PathBuffer::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), true);
        assert!(pb.is_ready());
        assert!(!pb.can_write());
    }

    #[test]
    fn forward_move_hits_midpoint() {
        let mut pb = PathBuffer::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), true);
        pb.move_by(0.5).unwrap();
        assert!((pb.get_pos().x - 0.5).abs() < EPS);
    }

    #[test]
    fn retraction_within_window() {
        let mut pb = PathBuffer::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), true);
        pb.move_by(0.5).unwrap();
        pb.move_by(-0.2).unwrap();
        assert!((pb.get_pos().x - 0.3).abs() < EPS);
    }

    #[test]
    fn retraction_beyond_window_fails_without_mutation() {
        let mut pb = PathBuffer::new(p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0), true);
        pb.move_by(5.0).unwrap();
        let before = pb.get_pos();
        assert_eq!(
            pb.move_by(-10.0),
            Err(PathError::RetractionExceedsHistory)
        );
        assert_eq!(pb.get_pos(), before);
    }

    #[test]
    fn overshoot_clamps_at_end() {
        let mut pb = PathBuffer::new(p(0.0, 0.0, 0.0), p(0.5, 0.0, 0.0), true);
        pb.move_by(1.0).unwrap();
        assert!(pb.at_end());
        assert!((pb.get_pos().x - 0.5).abs() < EPS);
    }

    #[test]
    fn lookahead_promotion() {
        let mut pb = PathBuffer::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), false);
        assert!(pb.can_write());
        pb.write(p(1.0, 1.0, 0.0), true).unwrap();

        // 1.5 mm crosses the corner into the second segment.
        pb.move_by(1.5).unwrap();
        let pos = pb.get_pos();
        assert!((pos.x - 1.0).abs() < EPS);
        assert!((pos.y - 0.5).abs() < EPS);
    }

    #[test]
    fn promotion_discards_history() {
        let mut pb = PathBuffer::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), false);
        pb.write(p(2.0, 0.0, 0.0), true).unwrap();
        pb.move_by(1.0 + NOTCH_MM).unwrap();
        // Only one notch of the new segment is retractable.
        assert_eq!(
            pb.move_by(-0.5),
            Err(PathError::RetractionExceedsHistory)
        );
        pb.move_by(-NOTCH_MM).unwrap();
    }

    #[test]
    fn write_slot_occupancy() {
        let mut pb = PathBuffer::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), false);
        pb.write(p(2.0, 0.0, 0.0), false).unwrap();
        assert!(!pb.can_write());
        assert!(pb.is_ready());
        assert_eq!(
            pb.write(p(3.0, 0.0, 0.0), false),
            Err(PathError::NextSlotOccupied)
        );

        // Consuming the queued segment frees the slot again.
        pb.move_by(1.1).unwrap();
        assert!(pb.can_write());
    }

    #[test]
    fn sub_notch_moves_accumulate() {
        let mut pb = PathBuffer::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), true);
        let tiny = NOTCH_MM * 0.3;
        let before = pb.get_pos();
        pb.move_by(tiny).unwrap();
        assert_eq!(pb.get_pos(), before, "sub-notch move must not advance");
        pb.move_by(tiny).unwrap();
        pb.move_by(tiny).unwrap();
        pb.move_by(tiny).unwrap();
        assert!(pb.get_pos().x >= NOTCH_MM - 1e-4);
    }

    #[test]
    fn zero_length_end_segment() {
        let same = p(5.0, 5.0, 5.0);
        let mut pb = PathBuffer::new(same, same, true);
        pb.move_by(1.0).unwrap();
        assert!(pb.at_end());
        assert_eq!(pb.get_pos(), same);
    }
}
