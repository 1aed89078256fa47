// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Wireless client ID (WCID) records: the hardware peer-table entry behind every slot.

use {
    crate::{
        common::MacAddr,
        hw::RegisterIo,
        regs::*,
        slot::Slot,
    },
    std::sync::atomic::{AtomicI32, Ordering},
};

/// Key-index value meaning no key is bound.
pub const NO_KEY: i32 = -1;

/// Software view of a WCID record. The bound key index is read by the receive path, so it is
/// stored atomically.
#[derive(Debug)]
pub struct Wcid {
    idx: Slot,
    hw_key_idx: AtomicI32,
}

impl Wcid {
    pub fn new(idx: Slot) -> Self {
        Self { idx, hw_key_idx: AtomicI32::new(NO_KEY) }
    }

    pub fn slot(&self) -> Slot {
        self.idx
    }

    pub fn key_index(&self) -> Option<u8> {
        match self.hw_key_idx.load(Ordering::Acquire) {
            NO_KEY => None,
            idx => Some(idx as u8),
        }
    }

    pub(crate) fn bind_key(&self, key_idx: u8) {
        self.hw_key_idx.store(key_idx as i32, Ordering::Release);
    }

    /// Reverts to `NO_KEY` if `key_idx` is the bound key. Returns whether it was bound.
    pub(crate) fn unbind_key(&self, key_idx: u8) -> bool {
        self.hw_key_idx
            .compare_exchange(key_idx as i32, NO_KEY, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Programs the attribute, rate and address words of a WCID record. Passing no address resets
/// the record.
pub fn setup<R: RegisterIo + ?Sized>(regs: &R, slot: Slot, iface_idx: u8, addr: Option<&MacAddr>) {
    let idx = slot.reg();
    let mut attr = field_prep(MT_WCID_ATTR_BSS_IDX, (iface_idx & 7) as u32);
    if iface_idx & 8 != 0 {
        attr |= MT_WCID_ATTR_BSS_IDX_EXT;
    }
    regs.wr(mt_wcid_attr(idx), attr);

    regs.wr(mt_wcid_tx_rate(idx), 0);
    regs.wr(mt_wcid_tx_rate(idx) + 4, 0);

    if idx >= MT_WCID_ADDR_SLOTS {
        return;
    }
    let mut record = [0u8; MT_WCID_ADDR_LEN];
    if let Some(addr) = addr {
        record[..6].copy_from_slice(addr);
    }
    regs.wr_copy(mt_wcid_addr(idx), &record);
}

/// Sets or clears the slot's bit in the hardware drop bitmap.
pub fn set_drop<R: RegisterIo + ?Sized>(regs: &R, slot: Slot, drop: bool) {
    let idx = slot.reg();
    let mask = mt_wcid_drop_mask(idx);
    regs.rmw(mt_wcid_drop(idx), mask, if drop { mask } else { 0 });
}

/// Toggles the receive reorder-enable bit of `tid` in the slot's address record.
pub fn set_rx_reorder<R: RegisterIo + ?Sized>(regs: &R, slot: Slot, tid: u8, enabled: bool) {
    let offset = mt_wcid_addr(slot.reg()) + 4;
    let mask = bit(MT_WCID_BA_MASK_SHIFT + tid as u32);
    if enabled {
        regs.set(offset, mask);
    } else {
        regs.clear(offset, mask);
    }
}
