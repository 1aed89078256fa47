// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Hardware peer-table slot allocation.

use {crate::error::Error, log::warn, std::fmt};

/// Number of entries in the hardware peer table.
pub const MAX_SLOTS: usize = 256;
/// Peer slots are handed out strictly below this index. The top of the table is left to
/// group-key slots.
pub const PEER_SLOT_CEILING: usize = 248;

const WORD_BITS: usize = u64::BITS as usize;
const WORDS: usize = MAX_SLOTS / WORD_BITS;

/// Index into the hardware peer table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(pub u8);

impl Slot {
    /// Group-key slot owned by the interface with hardware index `iface_idx`.
    pub fn group(iface_idx: u8) -> Self {
        Self((MAX_SLOTS - 1 - iface_idx as usize) as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn reg(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bitmap over every slot of the peer table. A set bit means the slot is held, either by a peer
/// or by a reserved group-key binding.
#[derive(Debug, Default)]
pub struct SlotAllocator {
    mask: [u64; WORDS],
}

fn locate(slot: Slot) -> (usize, u64) {
    (slot.index() / WORD_BITS, 1 << (slot.index() % WORD_BITS))
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the lowest free slot below `PEER_SLOT_CEILING`.
    pub fn allocate(&mut self) -> Result<Slot, Error> {
        for (i, word) in self.mask.iter_mut().enumerate() {
            if *word == u64::MAX {
                continue;
            }
            let bit = word.trailing_ones() as usize;
            let idx = i * WORD_BITS + bit;
            if idx >= PEER_SLOT_CEILING {
                break;
            }
            *word |= 1 << bit;
            return Ok(Slot(idx as u8));
        }
        Err(Error::NoSlot)
    }

    /// Marks a specific slot as held.
    pub fn reserve(&mut self, slot: Slot) -> Result<(), Error> {
        let (word, bit) = locate(slot);
        if self.mask[word] & bit != 0 {
            return Err(Error::SlotInUse(slot.0));
        }
        self.mask[word] |= bit;
        Ok(())
    }

    pub fn release(&mut self, slot: Slot) {
        let (word, bit) = locate(slot);
        if self.mask[word] & bit == 0 {
            warn!("releasing slot {} which is not allocated", slot);
        }
        self.mask[word] &= !bit;
    }

    pub fn is_allocated(&self, slot: Slot) -> bool {
        let (word, bit) = locate(slot);
        self.mask[word] & bit != 0
    }

    pub fn allocated(&self) -> usize {
        self.mask.iter().map(|w| w.count_ones() as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, assert_matches::assert_matches, std::collections::HashSet};

    #[test]
    fn allocates_lowest_first() {
        let mut slots = SlotAllocator::new();
        assert_eq!(slots.allocate().unwrap(), Slot(0));
        assert_eq!(slots.allocate().unwrap(), Slot(1));
        assert_eq!(slots.allocate().unwrap(), Slot(2));
        slots.release(Slot(1));
        assert_eq!(slots.allocate().unwrap(), Slot(1));
        assert_eq!(slots.allocate().unwrap(), Slot(3));
    }

    #[test]
    fn unique_and_below_ceiling_until_exhausted() {
        let mut slots = SlotAllocator::new();
        let mut seen = HashSet::new();
        for _ in 0..PEER_SLOT_CEILING {
            let slot = slots.allocate().expect("slot below ceiling");
            assert!(slot.index() < PEER_SLOT_CEILING);
            assert!(seen.insert(slot));
        }
        assert_matches!(slots.allocate(), Err(Error::NoSlot));
        // Never retried internally; the bitmap is unchanged by the failure.
        assert_eq!(slots.allocated(), PEER_SLOT_CEILING);

        slots.release(Slot(77));
        assert_eq!(slots.allocate().unwrap(), Slot(77));
        assert_matches!(slots.allocate(), Err(Error::NoSlot));
    }

    #[test]
    fn reserved_slots_are_skipped() {
        let mut slots = SlotAllocator::new();
        slots.reserve(Slot(0)).unwrap();
        slots.reserve(Slot(255)).unwrap();
        assert_eq!(slots.allocate().unwrap(), Slot(1));
        assert_matches!(slots.reserve(Slot(1)), Err(Error::SlotInUse(1)));
        assert_matches!(slots.reserve(Slot(255)), Err(Error::SlotInUse(255)));
        slots.release(Slot(255));
        assert!(!slots.is_allocated(Slot(255)));
    }

    #[test]
    fn reserved_top_slots_do_not_count_toward_peers() {
        let mut slots = SlotAllocator::new();
        for idx in 0..8 {
            slots.reserve(Slot::group(idx)).unwrap();
        }
        for _ in 0..PEER_SLOT_CEILING {
            slots.allocate().unwrap();
        }
        assert_matches!(slots.allocate(), Err(Error::NoSlot));
    }

    #[test]
    fn group_slot_formula() {
        assert_eq!(Slot::group(0), Slot(255));
        assert_eq!(Slot::group(2), Slot(253));
        assert_eq!(Slot::group(7), Slot(248));
        assert_eq!(Slot::group(15), Slot(240));
    }
}
