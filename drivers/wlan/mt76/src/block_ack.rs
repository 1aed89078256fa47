// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Aggregation (A-MPDU) session state.
//!
//! Every peer carries one `AggSession` per TID. The host stack drives sessions through
//! `AmpduAction`s; the hardware and host side effects of each transition are performed through a
//! `BlockAckOps` implementation so that the state machine itself owns no resources.
//!
//! A session's state and the starting sequence number captured at TX start are packed into a
//! single atomic word, so readers never observe one without the other.

use {
    log::debug,
    std::sync::atomic::{AtomicU32, Ordering},
};

/// Number of traffic identifiers a peer can aggregate on.
pub const NUM_TIDS: usize = 16;
/// Shift applied to the host's starting sequence number before it is handed back in a block-ack
/// request. The low four bits carry the fragment number.
pub const TX_SSN_SHIFT: u16 = 4;

const STATE_SHIFT: u32 = 16;
const SSN_MASK: u32 = 0xffff;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    RxActive = 1,
    TxPending = 2,
    TxActive = 3,
}

impl SessionState {
    fn from_raw(raw: u32) -> Self {
        match raw {
            1 => SessionState::RxActive,
            2 => SessionState::TxPending,
            3 => SessionState::TxActive,
            _ => SessionState::Idle,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AmpduAction {
    RxStart,
    RxStop,
    TxStart,
    TxOperational,
    TxStopFlush,
    TxStopFlushCont,
    TxStopCont,
}

/// Side effects of session transitions.
pub trait BlockAckOps {
    /// Sets or clears the receive reorder-enable bit for `tid`.
    fn set_rx_reorder(&mut self, tid: u8, enabled: bool);
    /// Tells the host the TX session on `tid` may proceed. Must not block.
    fn tx_session_ready(&mut self, tid: u8);
    /// Requests a block-ack request frame starting at `ssn`.
    fn send_block_ack_req(&mut self, tid: u8, ssn: u16);
    /// Tells the host TX teardown on `tid` is complete. Must not block.
    fn tx_session_stopped(&mut self, tid: u8);
}

fn pack(state: SessionState, ssn: u16) -> u32 {
    ((state as u32) << STATE_SHIFT) | ssn as u32
}

fn unpack(raw: u32) -> (SessionState, u16) {
    (SessionState::from_raw(raw >> STATE_SHIFT), (raw & SSN_MASK) as u16)
}

/// Target state of `action` taken in `state`, or `None` when the pair is not a transition.
fn next_state(state: SessionState, action: AmpduAction) -> Option<SessionState> {
    use {AmpduAction::*, SessionState::*};
    match (state, action) {
        (Idle, RxStart) => Some(RxActive),
        (RxActive, RxStop) => Some(Idle),
        (Idle, TxStart) => Some(TxPending),
        (TxPending, TxOperational) => Some(TxActive),
        (TxActive, TxStopFlush)
        | (TxPending, TxStopFlush)
        | (TxActive, TxStopFlushCont)
        | (TxPending, TxStopFlushCont) => Some(Idle),
        (TxActive, TxStopCont) | (TxPending, TxStopCont) => Some(Idle),
        _ => None,
    }
}

/// Block-ack session of one (peer, TID) pair.
#[derive(Debug, Default)]
pub struct AggSession(AtomicU32);

impl AggSession {
    pub fn new() -> Self {
        Self(AtomicU32::new(pack(SessionState::Idle, 0)))
    }

    pub fn state(&self) -> SessionState {
        unpack(self.0.load(Ordering::Acquire)).0
    }

    /// Starting sequence number captured at TX start, already shifted into block-ack request
    /// form.
    pub fn ssn(&self) -> u16 {
        unpack(self.0.load(Ordering::Acquire)).1
    }

    /// Applies `action` and performs its side effects. Returns the new state, or `None` if the
    /// action does not apply in the current state, in which case nothing happens.
    ///
    /// Callers serialize actions on a session; concurrent readers only ever see whole
    /// (state, ssn) pairs.
    pub fn handle(
        &self,
        tid: u8,
        action: AmpduAction,
        ssn: u16,
        ops: &mut impl BlockAckOps,
    ) -> Option<SessionState> {
        let (state, agg_ssn) = unpack(self.0.load(Ordering::Acquire));
        let next = match next_state(state, action) {
            Some(next) => next,
            None => {
                debug!("ignoring {:?} on tid {} in state {:?}", action, tid, state);
                return None;
            }
        };
        let agg_ssn = match action {
            AmpduAction::TxStart => ssn << TX_SSN_SHIFT,
            _ => agg_ssn,
        };
        self.0.store(pack(next, agg_ssn), Ordering::Release);

        match action {
            AmpduAction::RxStart => ops.set_rx_reorder(tid, true),
            AmpduAction::RxStop => ops.set_rx_reorder(tid, false),
            AmpduAction::TxStart => ops.tx_session_ready(tid),
            AmpduAction::TxOperational => ops.send_block_ack_req(tid, agg_ssn),
            AmpduAction::TxStopCont => ops.tx_session_stopped(tid),
            AmpduAction::TxStopFlush | AmpduAction::TxStopFlushCont => (),
        }
        Some(next)
    }
}
