// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::slot::Slot,
    futures::channel::mpsc,
    log::warn,
};

/// Notifications for the host wireless stack. None of them may block the sender, since they are
/// raised from the receive path and from under the device lock.
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    /// A received frame, with the slot of the peer it came from if known.
    RxFrame { bytes: Vec<u8>, peer: Option<Slot> },
    /// The TX aggregation session may start.
    TxSessionReady { peer: Slot, tid: u8 },
    /// TX aggregation teardown finished.
    TxSessionStopped { peer: Slot, tid: u8 },
    /// Transmit a block-ack request starting at `ssn`.
    BlockAckRequest { peer: Slot, tid: u8, ssn: u16 },
    StopQueues,
    WakeQueues,
}

pub type HostEventStream = mpsc::UnboundedReceiver<HostEvent>;

/// Non-blocking sender half of the host event channel. Clones share the same channel.
#[derive(Clone, Debug)]
pub struct HostEventSink(mpsc::UnboundedSender<HostEvent>);

impl HostEventSink {
    pub fn new() -> (Self, HostEventStream) {
        let (sink, stream) = mpsc::unbounded();
        (Self(sink), stream)
    }

    pub fn send(&self, event: HostEvent) {
        if let Err(e) = self.0.unbounded_send(event) {
            warn!("host event dropped: {}", e);
        }
    }
}
