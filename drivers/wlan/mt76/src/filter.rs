// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Host receive-filter flags and their translation into the hardware drop mask.

use {crate::regs::*, bitflags::bitflags};

bitflags! {
    /// Frame classes the host asks to receive.
    pub struct FilterFlags: u32 {
        const PROMISC_IN_BSS = 1 << 0;
        const ALLMULTI = 1 << 1;
        const FCSFAIL = 1 << 2;
        const PLCPFAIL = 1 << 3;
        const BCN_PRBRESP_PROMISC = 1 << 4;
        const CONTROL = 1 << 5;
        const OTHER_BSS = 1 << 6;
        const PSPOLL = 1 << 7;
        const PROBE_REQ = 1 << 8;
    }
}

/// Host flags the hardware can honour, each with the drop bits that suppress those frames.
const FLAG_MAP: &[(FilterFlags, u32)] = &[
    (FilterFlags::PROMISC_IN_BSS, MT_RX_FILTR_CFG_PROMISC),
    (FilterFlags::FCSFAIL, MT_RX_FILTR_CFG_CRC_ERR),
    (FilterFlags::PLCPFAIL, MT_RX_FILTR_CFG_PHY_ERR),
    (
        FilterFlags::CONTROL,
        MT_RX_FILTR_CFG_ACK
            | MT_RX_FILTR_CFG_CTS
            | MT_RX_FILTR_CFG_CFEND
            | MT_RX_FILTR_CFG_CFACK
            | MT_RX_FILTR_CFG_BA
            | MT_RX_FILTR_CFG_CTRL_RSV,
    ),
    (FilterFlags::PSPOLL, MT_RX_FILTR_CFG_PSPOLL),
];

/// Folds the requested flags into `rxfilter` and returns the subset the hardware supports.
///
/// A drop bit is set when its flag is not requested. Frames from other BSSs are always accepted.
pub fn apply(requested: FilterFlags, rxfilter: &mut u32) -> FilterFlags {
    let mut accepted = FilterFlags::empty();
    for &(flag, drop_bits) in FLAG_MAP {
        if requested.contains(flag) {
            accepted |= flag;
            *rxfilter &= !drop_bits;
        } else {
            *rxfilter |= drop_bits;
        }
    }
    *rxfilter &= !MT_RX_FILTR_CFG_OTHER_BSS;
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_flags_are_dropped() {
        let mut rxfilter = MT_RX_FILTR_CFG_OTHER_BSS;
        let accepted = apply(FilterFlags::all(), &mut rxfilter);
        assert_eq!(
            accepted,
            FilterFlags::PROMISC_IN_BSS
                | FilterFlags::FCSFAIL
                | FilterFlags::PLCPFAIL
                | FilterFlags::CONTROL
                | FilterFlags::PSPOLL
        );
        assert_eq!(rxfilter, 0);
    }

    #[test]
    fn nothing_requested_drops_everything_supported() {
        let mut rxfilter = MT_RX_FILTR_CFG_DUP;
        assert!(apply(FilterFlags::ALLMULTI, &mut rxfilter).is_empty());
        assert_eq!(
            rxfilter,
            MT_RX_FILTR_CFG_DUP
                | MT_RX_FILTR_CFG_PROMISC
                | MT_RX_FILTR_CFG_CRC_ERR
                | MT_RX_FILTR_CFG_PHY_ERR
                | MT_RX_FILTR_CFG_ACK
                | MT_RX_FILTR_CFG_CTS
                | MT_RX_FILTR_CFG_CFEND
                | MT_RX_FILTR_CFG_CFACK
                | MT_RX_FILTR_CFG_BA
                | MT_RX_FILTR_CFG_CTRL_RSV
                | MT_RX_FILTR_CFG_PSPOLL
        );
    }

    #[test]
    fn control_toggles_its_group() {
        let mut rxfilter = 0;
        apply(FilterFlags::CONTROL, &mut rxfilter);
        assert_eq!(rxfilter & MT_RX_FILTR_CFG_BA, 0);
        assert_eq!(rxfilter & MT_RX_FILTR_CFG_PSPOLL, MT_RX_FILTR_CFG_PSPOLL);
    }
}
