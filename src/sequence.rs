use std::fmt::{Display, Formatter};

/// A received sequence number is considered newer than the previous one iff it
///  lies in the forward quarter of the 32-bit sequence space, i.e.
///  `(next - last) mod 2^32` is in `(0, ACCEPT_WINDOW)`.
pub const ACCEPT_WINDOW: u32 = 1 << 30;

/// Per-packet sequence number. All arithmetic is modulo 2^32: counters run
///  forever and wrap, and comparisons go through [`SequenceNumber::is_after`]
///  rather than `Ord`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct SequenceNumber(u32);

impl Display for SequenceNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl SequenceNumber {
    pub const ZERO: SequenceNumber = SequenceNumber(0);

    pub fn from_raw(value: u32) -> Self {
        Self(value)
    }

    pub fn to_raw(&self) -> u32 {
        self.0
    }

    pub fn next(&self) -> SequenceNumber {
        SequenceNumber(self.0.wrapping_add(1))
    }

    /// Wrap-safe "is self newer than other": true iff self is in the forward
    ///  half-open window `(other, other + ACCEPT_WINDOW)` modulo 2^32.
    ///  A sequence number is never after itself.
    pub fn is_after(&self, other: SequenceNumber) -> bool {
        let delta = self.0.wrapping_sub(other.0);
        delta != 0 && delta < ACCEPT_WINDOW
    }

    /// Slot of this sequence number in a direct-mapped ring of the given
    ///  capacity.
    pub fn slot(&self, capacity: usize) -> usize {
        self.0 as usize % capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::zero(0, 1)]
    #[case::simple(41, 42)]
    #[case::wrap(u32::MAX, 0)]
    fn test_next(#[case] raw: u32, #[case] expected: u32) {
        assert_eq!(SequenceNumber::from_raw(raw).next(), SequenceNumber::from_raw(expected));
    }

    #[rstest]
    #[case::same(5, 5, false)]
    #[case::successor(6, 5, true)]
    #[case::predecessor(4, 5, false)]
    #[case::window_edge_inside(ACCEPT_WINDOW - 1, 0, true)]
    #[case::window_edge_outside(ACCEPT_WINDOW, 0, false)]
    #[case::opposite_half(1 << 31, 0, false)]
    #[case::far_behind(1, 1 << 31, false)]
    #[case::wrap_successor(0, u32::MAX, true)]
    #[case::wrap_inside(ACCEPT_WINDOW - 2, u32::MAX, true)]
    #[case::wrap_edge_outside(ACCEPT_WINDOW - 1, u32::MAX, false)]
    #[case::wrap_far(u32::MAX, 0, false)]
    fn test_is_after(#[case] next: u32, #[case] last: u32, #[case] expected: bool) {
        assert_eq!(
            SequenceNumber::from_raw(next).is_after(SequenceNumber::from_raw(last)),
            expected,
        );
    }

    /// The acceptance window depends only on the delta between the two raw
    ///  values, so sweeping deltas around the window boundaries for a spread
    ///  of anchors covers the full 32-bit behavior.
    #[test]
    fn test_is_after_delta_sweep() {
        let anchors = [0u32, 1, 1000, ACCEPT_WINDOW, 1 << 31, u32::MAX - 1, u32::MAX];
        let deltas = [
            (0u32, false),
            (1, true),
            (2, true),
            (ACCEPT_WINDOW - 1, true),
            (ACCEPT_WINDOW, false),
            (ACCEPT_WINDOW + 1, false),
            (1 << 31, false),
            (3 << 30, false),
            (u32::MAX, false),
        ];

        for &last in &anchors {
            for &(delta, expected) in &deltas {
                let next = last.wrapping_add(delta);
                assert_eq!(
                    SequenceNumber::from_raw(next).is_after(SequenceNumber::from_raw(last)),
                    expected,
                    "next={} last={} delta={}", next, last, delta,
                );
            }
        }
    }

    #[rstest]
    #[case::zero(0, 32, 0)]
    #[case::inside(17, 32, 17)]
    #[case::exact(32, 32, 0)]
    #[case::above(33, 32, 1)]
    #[case::large(u32::MAX, 32, 31)]
    #[case::capacity_one(12345, 1, 0)]
    fn test_slot(#[case] raw: u32, #[case] capacity: usize, #[case] expected: usize) {
        assert_eq!(SequenceNumber::from_raw(raw).slot(capacity), expected);
    }
}
