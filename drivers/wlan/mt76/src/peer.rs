// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Associated peers and the slot-indexed table the receive path looks them up in.

use {
    crate::{
        block_ack::{AggSession, NUM_TIDS},
        common::MacAddr,
        slot::{Slot, MAX_SLOTS},
        vif::VifId,
        wcid::Wcid,
    },
    crossbeam_epoch::{self as epoch, Atomic, Owned, Shared},
    std::sync::{atomic::Ordering, Arc},
};

/// A remote station associated through one of the device's interfaces.
#[derive(Debug)]
pub struct Peer {
    wcid: Wcid,
    addr: MacAddr,
    vif: VifId,
    iface_idx: u8,
    sessions: [AggSession; NUM_TIDS],
}

impl Peer {
    pub fn new(slot: Slot, addr: MacAddr, vif: VifId, iface_idx: u8) -> Self {
        Self { wcid: Wcid::new(slot), addr, vif, iface_idx, sessions: Default::default() }
    }

    pub fn wcid(&self) -> &Wcid {
        &self.wcid
    }

    pub fn slot(&self) -> Slot {
        self.wcid.slot()
    }

    pub fn addr(&self) -> &MacAddr {
        &self.addr
    }

    pub fn vif(&self) -> VifId {
        self.vif
    }

    pub fn iface_idx(&self) -> u8 {
        self.iface_idx
    }

    pub fn key_index(&self) -> Option<u8> {
        self.wcid.key_index()
    }

    pub fn session(&self, tid: u8) -> Option<&AggSession> {
        self.sessions.get(tid as usize)
    }
}

/// Slot-indexed peer table.
///
/// Writers serialize on the device lock. Readers never block: they pin the current epoch, load
/// the entry and take a reference. An entry is unlinked before the epoch collector reclaims it,
/// so a reader sees the old peer, the new peer or nothing, and never a freed one.
pub struct PeerTable {
    entries: Box<[Atomic<Arc<Peer>>]>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self { entries: (0..MAX_SLOTS).map(|_| Atomic::null()).collect() }
    }

    pub fn get(&self, slot: Slot) -> Option<Arc<Peer>> {
        let guard = epoch::pin();
        let entry = self.entries[slot.index()].load(Ordering::Acquire, &guard);
        // SAFETY: entries are only destroyed through `defer_destroy`, so the pointee stays
        // allocated while `guard` pins the epoch it was loaded in.
        unsafe { entry.as_ref() }.map(Arc::clone)
    }

    /// Replaces the entry at `slot` and returns the previous occupant.
    pub(crate) fn publish(&self, slot: Slot, peer: Option<Arc<Peer>>) -> Option<Arc<Peer>> {
        let guard = epoch::pin();
        let new = match peer {
            Some(peer) => Owned::new(peer).into_shared(&guard),
            None => Shared::null(),
        };
        let old = self.entries[slot.index()].swap(new, Ordering::AcqRel, &guard);
        // SAFETY: `old` was loaded under `guard` and is not destroyed before the guard drops.
        let prev = unsafe { old.as_ref() }.map(Arc::clone);
        if !old.is_null() {
            // SAFETY: `old` is unlinked from the table, so no new reader can load it. Readers that
            // already did hold the epoch open until they unpin.
            unsafe { guard.defer_destroy(old) };
        }
        prev
    }

    pub(crate) fn clear(&self, slot: Slot) -> Option<Arc<Peer>> {
        self.publish(slot, None)
    }

    pub fn is_empty(&self) -> bool {
        let guard = epoch::pin();
        self.entries.iter().all(|e| e.load(Ordering::Acquire, &guard).is_null())
    }
}

impl Default for PeerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PeerTable {
    fn drop(&mut self) {
        // SAFETY: `&mut self` rules out concurrent readers, so no epoch protection is needed and
        // each non-null entry is uniquely owned here.
        unsafe {
            let guard = epoch::unprotected();
            for entry in self.entries.iter() {
                let peer = entry.swap(Shared::null(), Ordering::Relaxed, guard);
                if !peer.is_null() {
                    drop(peer.into_owned());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::block_ack::SessionState,
        std::{
            sync::atomic::{AtomicBool, Ordering},
            thread,
        },
    };

    fn peer(slot: u8) -> Arc<Peer> {
        Arc::new(Peer::new(Slot(slot), [2, 0, 0, 0, 0, slot], VifId(1), 0))
    }

    #[test]
    fn publish_and_clear() {
        let table = PeerTable::new();
        assert!(table.is_empty());
        assert!(table.publish(Slot(4), Some(peer(4))).is_none());
        let found = table.get(Slot(4)).expect("peer published");
        assert_eq!(found.slot(), Slot(4));
        assert_eq!(found.session(0).map(|s| s.state()), Some(SessionState::Idle));
        assert!(found.session(16).is_none());
        assert!(table.get(Slot(5)).is_none());

        let removed = table.clear(Slot(4)).expect("peer removed");
        assert!(Arc::ptr_eq(&removed, &found));
        assert!(table.get(Slot(4)).is_none());
        assert!(table.is_empty());
        // A reader that looked the peer up before removal still holds a live peer.
        assert_eq!(found.addr(), &[2, 0, 0, 0, 0, 4]);
    }

    #[test]
    fn readers_never_see_freed_peers() {
        let table = Arc::new(PeerTable::new());
        let done = Arc::new(AtomicBool::new(false));
        let reader = {
            let table = Arc::clone(&table);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut seen = 0usize;
                while !done.load(Ordering::SeqCst) {
                    if let Some(peer) = table.get(Slot(9)) {
                        assert_eq!(peer.slot(), Slot(9));
                        assert_eq!(peer.addr()[5], 9);
                        seen += 1;
                    }
                }
                seen
            })
        };
        for _ in 0..1000 {
            table.publish(Slot(9), Some(peer(9)));
            table.clear(Slot(9));
        }
        done.store(true, Ordering::SeqCst);
        reader.join().expect("reader panicked");
        assert!(table.get(Slot(9)).is_none());
    }

    #[test]
    fn drop_releases_entries() {
        let table = PeerTable::new();
        let p = peer(1);
        table.publish(Slot(1), Some(Arc::clone(&p)));
        drop(table);
        assert_eq!(Arc::strong_count(&p), 1);
    }
}
