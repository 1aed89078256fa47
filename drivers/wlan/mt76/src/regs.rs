// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Register layout of the MAC block.
//!
//! Offsets and field masks are fixed by the hardware and must stay bit-exact.

pub const fn bit(n: u32) -> u32 {
    1 << n
}

/// Contiguous mask covering bits `l..=h`.
pub const fn genmask(h: u32, l: u32) -> u32 {
    (u32::MAX >> (31 - h)) & (u32::MAX << l)
}

/// Shifts `val` into the position described by `mask`, discarding bits that do not fit.
pub const fn field_prep(mask: u32, val: u32) -> u32 {
    (val << mask.trailing_zeros()) & mask
}

pub const fn field_get(mask: u32, reg: u32) -> u32 {
    (reg & mask) >> mask.trailing_zeros()
}

// Backoff and beacon timing.
pub const MT_BKOFF_SLOT_CFG: u32 = 0x1104;
pub const MT_BKOFF_SLOT_CFG_SLOTTIME: u32 = genmask(7, 0);

pub const MT_BEACON_TIME_CFG: u32 = 0x1114;
pub const MT_BEACON_TIME_CFG_INTVAL: u32 = genmask(15, 0);

// Receive filter. Every bit set here makes the hardware drop the matching frames.
pub const MT_RX_FILTR_CFG: u32 = 0x1400;
pub const MT_RX_FILTR_CFG_CRC_ERR: u32 = bit(0);
pub const MT_RX_FILTR_CFG_PHY_ERR: u32 = bit(1);
pub const MT_RX_FILTR_CFG_PROMISC: u32 = bit(2);
pub const MT_RX_FILTR_CFG_OTHER_BSS: u32 = bit(3);
pub const MT_RX_FILTR_CFG_VER_ERR: u32 = bit(4);
pub const MT_RX_FILTR_CFG_MCAST: u32 = bit(5);
pub const MT_RX_FILTR_CFG_BCAST: u32 = bit(6);
pub const MT_RX_FILTR_CFG_DUP: u32 = bit(7);
pub const MT_RX_FILTR_CFG_CFACK: u32 = bit(8);
pub const MT_RX_FILTR_CFG_CFEND: u32 = bit(9);
pub const MT_RX_FILTR_CFG_ACK: u32 = bit(10);
pub const MT_RX_FILTR_CFG_CTS: u32 = bit(11);
pub const MT_RX_FILTR_CFG_RTS: u32 = bit(12);
pub const MT_RX_FILTR_CFG_PSPOLL: u32 = bit(13);
pub const MT_RX_FILTR_CFG_BA: u32 = bit(14);
pub const MT_RX_FILTR_CFG_BAR: u32 = bit(15);
pub const MT_RX_FILTR_CFG_CTRL_RSV: u32 = bit(16);

// Shared WMM registers. Each packs one field per access category.
pub const MT_WMM_AIFSN: u32 = 0x0214;
pub const MT_WMM_AIFSN_MASK: u32 = genmask(3, 0);
pub const fn mt_wmm_aifsn_shift(queue: u32) -> u32 {
    queue * 4
}

pub const MT_WMM_CWMIN: u32 = 0x0218;
pub const MT_WMM_CWMIN_MASK: u32 = genmask(3, 0);
pub const fn mt_wmm_cwmin_shift(queue: u32) -> u32 {
    queue * 4
}

pub const MT_WMM_CWMAX: u32 = 0x021c;
pub const MT_WMM_CWMAX_MASK: u32 = genmask(3, 0);
pub const fn mt_wmm_cwmax_shift(queue: u32) -> u32 {
    queue * 4
}

pub const MT_WMM_TXOP_BASE: u32 = 0x0220;
pub const MT_WMM_TXOP_MASK: u32 = genmask(15, 0);
pub const fn mt_wmm_txop(queue: u32) -> u32 {
    MT_WMM_TXOP_BASE + (queue / 2) * 4
}
pub const fn mt_wmm_txop_shift(queue: u32) -> u32 {
    (queue & 1) * 16
}

// Per-queue EDCA parameter register.
pub const MT_EDCA_CFG_BASE: u32 = 0x1300;
pub const fn mt_edca_cfg_ac(queue: u32) -> u32 {
    MT_EDCA_CFG_BASE + queue * 4
}
pub const MT_EDCA_CFG_TXOP: u32 = genmask(7, 0);
pub const MT_EDCA_CFG_AIFSN: u32 = genmask(11, 8);
pub const MT_EDCA_CFG_CWMIN: u32 = genmask(15, 12);
pub const MT_EDCA_CFG_CWMAX: u32 = genmask(19, 16);

// WCID drop bitmap: one bit per slot, 32 slots per word.
pub const MT_WCID_DROP_BASE: u32 = 0x106c;
pub const fn mt_wcid_drop(idx: u32) -> u32 {
    MT_WCID_DROP_BASE + (idx >> 5) * 4
}
pub const fn mt_wcid_drop_mask(idx: u32) -> u32 {
    bit(idx % 32)
}

// WCID address record: 6 address bytes followed by a 16-bit block-ack reorder mask. The second
// word therefore carries the reorder bit of TID `n` at bit `16 + n`.
pub const MT_WCID_ADDR_BASE: u32 = 0x1800;
pub const fn mt_wcid_addr(idx: u32) -> u32 {
    MT_WCID_ADDR_BASE + idx * 8
}
pub const MT_WCID_ADDR_LEN: usize = 8;
pub const MT_WCID_BA_MASK_SHIFT: u32 = 16;
/// Only the first 128 slots carry an address record.
pub const MT_WCID_ADDR_SLOTS: u32 = 128;

pub const MT_WCID_TX_RATE_BASE: u32 = 0x1c00;
pub const fn mt_wcid_tx_rate(idx: u32) -> u32 {
    MT_WCID_TX_RATE_BASE + idx * 8
}

pub const MT_WCID_IV_BASE: u32 = 0x6000;
pub const fn mt_wcid_iv(idx: u32) -> u32 {
    MT_WCID_IV_BASE + idx * 8
}
pub const MT_WCID_IV_LEN: usize = 8;

pub const MT_WCID_KEY_BASE: u32 = 0x8000;
pub const fn mt_wcid_key(idx: u32) -> u32 {
    MT_WCID_KEY_BASE + idx * 32
}
pub const MT_KEY_DATA_LEN: usize = 32;

pub const MT_WCID_ATTR_BASE: u32 = 0xa800;
pub const fn mt_wcid_attr(idx: u32) -> u32 {
    MT_WCID_ATTR_BASE + idx * 4
}
pub const MT_WCID_ATTR_PAIRWISE: u32 = bit(0);
pub const MT_WCID_ATTR_PKEY_MODE: u32 = genmask(3, 1);
pub const MT_WCID_ATTR_BSS_IDX: u32 = genmask(6, 4);
pub const MT_WCID_ATTR_RXWI_UDF: u32 = genmask(9, 7);
pub const MT_WCID_ATTR_PKEY_MODE_EXT: u32 = bit(10);
pub const MT_WCID_ATTR_BSS_IDX_EXT: u32 = bit(11);

// Shared (per-interface) key table. Interfaces 8..16 live in a second bank.
pub const MT_SKEY_BASE_0: u32 = 0xac00;
pub const MT_SKEY_BASE_1: u32 = 0xb400;
pub const fn mt_skey(vif_idx: u32, key_idx: u32) -> u32 {
    if vif_idx >= 8 {
        MT_SKEY_BASE_1 + 4 * 32 * (vif_idx & 7) + 32 * key_idx
    } else {
        MT_SKEY_BASE_0 + 4 * 32 * vif_idx + 32 * key_idx
    }
}

pub const MT_SKEY_MODE_BASE_0: u32 = 0xb000;
pub const MT_SKEY_MODE_BASE_1: u32 = 0xb3f0;
pub const fn mt_skey_mode(vif_idx: u32) -> u32 {
    if vif_idx >= 8 {
        MT_SKEY_MODE_BASE_1 + ((vif_idx & 7) / 2) * 4
    } else {
        MT_SKEY_MODE_BASE_0 + (vif_idx / 2) * 4
    }
}
pub const MT_SKEY_MODE_MASK: u32 = genmask(3, 0);
pub const fn mt_skey_mode_shift(vif_idx: u32, key_idx: u32) -> u32 {
    (vif_idx & 1) * 16 + key_idx * 4
}
