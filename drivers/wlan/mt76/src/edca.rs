// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! EDCA (channel access) parameter programming per access category.

use {
    crate::{error::Error, hw::RegisterIo, regs::*},
    log::debug,
};

pub const NUM_QUEUES: u8 = 4;
/// Contention window exponents used when the host leaves a window size unset.
pub const DEFAULT_CW_MIN_EXP: u32 = 5;
pub const DEFAULT_CW_MAX_EXP: u32 = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxQueueParams {
    /// TXOP limit in units of 32 microseconds.
    pub txop: u16,
    pub aifs: u8,
    pub cw_min: u16,
    pub cw_max: u16,
}

/// Base-2 exponent of a contention window size, rounded up. Zero selects `default`.
pub fn cw_exponent(size: u16, default: u32) -> u32 {
    match size {
        0 => default,
        size => u16::BITS - (size - 1).leading_zeros(),
    }
}

/// Writes `params` into the per-queue EDCA register and the queue's fields of the four shared
/// WMM registers. Fields of other queues are preserved.
pub fn configure_queue<R: RegisterIo + ?Sized>(
    regs: &R,
    queue: u8,
    params: &TxQueueParams,
) -> Result<(), Error> {
    if queue >= NUM_QUEUES {
        return Err(Error::InvalidArgs("queue out of range"));
    }
    let q = queue as u32;
    let cw_min = cw_exponent(params.cw_min, DEFAULT_CW_MIN_EXP);
    let cw_max = cw_exponent(params.cw_max, DEFAULT_CW_MAX_EXP);
    debug!("queue {}: txop {} aifs {} cw {}/{}", queue, params.txop, params.aifs, cw_min, cw_max);

    let val = field_prep(MT_EDCA_CFG_TXOP, params.txop as u32)
        | field_prep(MT_EDCA_CFG_AIFSN, params.aifs as u32)
        | field_prep(MT_EDCA_CFG_CWMIN, cw_min)
        | field_prep(MT_EDCA_CFG_CWMAX, cw_max);
    regs.wr(mt_edca_cfg_ac(q), val);

    let shift = mt_wmm_txop_shift(q);
    regs.rmw(mt_wmm_txop(q), MT_WMM_TXOP_MASK << shift, (params.txop as u32) << shift);

    let shift = mt_wmm_aifsn_shift(q);
    regs.rmw(MT_WMM_AIFSN, MT_WMM_AIFSN_MASK << shift, (params.aifs as u32 & 0xf) << shift);

    let shift = mt_wmm_cwmin_shift(q);
    regs.rmw(MT_WMM_CWMIN, MT_WMM_CWMIN_MASK << shift, (cw_min & 0xf) << shift);

    let shift = mt_wmm_cwmax_shift(q);
    regs.rmw(MT_WMM_CWMAX, MT_WMM_CWMAX_MASK << shift, (cw_max & 0xf) << shift);
    Ok(())
}
