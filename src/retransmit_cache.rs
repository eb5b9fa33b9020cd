use crate::sequence::SequenceNumber;

/// One cached outbound frame: the exact bytes that went onto the wire,
///  header included, and the time they were first sent.
pub struct CacheEntry {
    pub send_time: f64,
    frame: Vec<u8>,
}

impl CacheEntry {
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }
}

/// Direct-mapped ring of the most recent reliable outbound frames, keyed by
///  `sequence_number mod capacity`. Storing overwrites whatever occupied the
///  slot, so the ring is only coherent while at most `capacity` reliable
///  packets are unacknowledged - that bound is a contract with the caller of
///  `send`, not something the ring polices.
pub struct RetransmitCache {
    slots: Vec<Option<CacheEntry>>,
}

impl RetransmitCache {
    pub fn new(capacity: usize) -> RetransmitCache {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        RetransmitCache { slots }
    }

    /// Stores a frame under its sequence number, reusing the slot's previous
    ///  allocation where possible.
    pub fn store(&mut self, sequence_number: SequenceNumber, send_time: f64, frame: &[u8]) {
        let slot_index = sequence_number.slot(self.slots.len());
        let slot = &mut self.slots[slot_index];
        match slot {
            Some(entry) => {
                entry.send_time = send_time;
                entry.frame.clear();
                entry.frame.extend_from_slice(frame);
            }
            None => {
                *slot = Some(CacheEntry {
                    send_time,
                    frame: frame.to_vec(),
                });
            }
        }
    }

    /// The entry currently occupying the sequence number's slot. While the
    ///  caller keeps within the unacknowledged-packet bound, this is the frame
    ///  for exactly that sequence number.
    pub fn get(&self, sequence_number: SequenceNumber) -> Option<&CacheEntry> {
        self.slots[sequence_number.slot(self.slots.len())].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn seq(raw: u32) -> SequenceNumber {
        SequenceNumber::from_raw(raw)
    }

    #[test]
    fn test_empty() {
        let cache = RetransmitCache::new(4);
        for raw in 0..8 {
            assert!(cache.get(seq(raw)).is_none());
        }
    }

    /// a full window of consecutive frames is retrievable per slot
    #[rstest]
    #[case::partial_window(8, 3, 1)]
    #[case::full_window(4, 4, 1)]
    #[case::wrapping_base(4, 4, u32::MAX - 1)]
    fn test_store_window(#[case] capacity: usize, #[case] count: u32, #[case] base: u32) {
        let mut cache = RetransmitCache::new(capacity);

        for i in 0..count {
            let s = seq(base.wrapping_add(i));
            cache.store(s, i as f64, format!("frame-{}", s).as_bytes());
        }

        for i in 0..count {
            let s = seq(base.wrapping_add(i));
            let entry = cache.get(s).unwrap();
            assert_eq!(entry.send_time, i as f64);
            assert_eq!(entry.frame(), format!("frame-{}", s).as_bytes());
        }
    }

    #[test]
    fn test_store_overwrites_colliding_slot() {
        let mut cache = RetransmitCache::new(4);

        cache.store(seq(1), 10.0, b"old");
        cache.store(seq(5), 20.0, b"new and longer");

        let entry = cache.get(seq(1)).unwrap();
        assert_eq!(entry.send_time, 20.0);
        assert_eq!(entry.frame(), b"new and longer");
    }

    #[test]
    fn test_store_shrinking_frame() {
        let mut cache = RetransmitCache::new(2);

        cache.store(seq(0), 1.0, b"a long first frame");
        cache.store(seq(2), 2.0, b"x");

        assert_eq!(cache.get(seq(2)).unwrap().frame(), b"x");
    }
}
