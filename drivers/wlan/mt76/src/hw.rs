// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Boundary to the register file and the radio routines owned by the bus/PHY layer.

use {
    crate::{
        common::{Channel, MacAddr, TxRate},
        error::Error,
        regs::field_prep,
        slot::Slot,
    },
    byteorder::{ByteOrder, LittleEndian},
};

#[cfg(test)]
pub use test_utils::*;

/// 32-bit register access. Implementations serialize individual accesses; read-modify-write
/// sequences are only atomic while the caller holds the device lock.
pub trait RegisterIo {
    fn rr(&self, offset: u32) -> u32;
    fn wr(&self, offset: u32, val: u32);

    /// Replaces the bits under `mask` with `val` and returns the written value.
    fn rmw(&self, offset: u32, mask: u32, val: u32) -> u32 {
        let new = (self.rr(offset) & !mask) | val;
        self.wr(offset, new);
        new
    }

    fn set(&self, offset: u32, val: u32) {
        self.rmw(offset, 0, val);
    }

    fn clear(&self, offset: u32, val: u32) {
        self.rmw(offset, val, 0);
    }

    fn rmw_field(&self, offset: u32, field: u32, val: u32) {
        self.rmw(offset, field, field_prep(field, val));
    }

    /// Copies `data` into consecutive little-endian words starting at `offset`. A trailing partial
    /// word is zero padded.
    fn wr_copy(&self, offset: u32, data: &[u8]) {
        for (i, chunk) in data.chunks(4).enumerate() {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.wr(offset + 4 * i as u32, LittleEndian::read_u32(&word));
        }
    }
}

/// Owner of a set of hardware transmit queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxqOwner {
    Peer(Slot),
    Iface(u8),
}

/// Radio routines and register access the control plane drives but does not implement.
pub trait Hardware: RegisterIo + Send + Sync {
    fn mac_start(&self) -> Result<(), Error>;
    fn phy_start(&self) -> Result<(), Error>;
    fn stop_hardware(&self) -> Result<(), Error>;
    /// Enables or disables delivery of receive-completion notifications.
    fn set_rx_notifications(&self, enabled: bool);
    fn set_channel(&self, channel: &Channel) -> Result<(), Error>;
    /// Applies a transmit power level and returns the power actually in effect.
    fn set_txpower(&self, power_level: i32) -> i32;
    fn calibrate(&self);
    fn set_bssid(&self, iface_idx: u8, bssid: &MacAddr);
    fn set_beacon_enabled(&self, iface_idx: u8, enabled: bool);
    fn set_wcid_rate(&self, slot: Slot, rate: &TxRate);
    fn txq_init(&self, owner: TxqOwner);
    fn txq_remove(&self, owner: TxqOwner);
    /// Body of the pre-TBTT task: refreshes beacons ahead of the next target beacon time.
    fn pre_tbtt_update(&self);
}

#[cfg(test)]
mod test_utils {
    use {
        super::*,
        crate::error::Status,
        parking_lot::Mutex,
        std::{
            collections::HashMap,
            sync::atomic::{AtomicBool, AtomicI32, Ordering},
        },
    };

    #[derive(Clone, Debug, PartialEq)]
    pub enum HwCall {
        MacStart,
        PhyStart,
        StopHardware,
        RxNotifications(bool),
        SetChannel(Channel),
        SetTxpower(i32),
        Calibrate,
        SetBssid(u8, MacAddr),
        SetBeaconEnabled(u8, bool),
        SetWcidRate(Slot, TxRate),
        TxqInit(TxqOwner),
        TxqRemove(TxqOwner),
        PreTbttUpdate,
    }

    /// Register file plus a log of every radio routine invoked.
    #[derive(Default)]
    pub struct FakeHardware {
        pub regs: Mutex<HashMap<u32, u32>>,
        pub calls: Mutex<Vec<HwCall>>,
        pub fail_mac_start: AtomicBool,
        pub fail_phy_start: AtomicBool,
        pub fail_set_channel: AtomicBool,
        pub rx_notifications: AtomicBool,
        /// Upper bound the fake radio clamps transmit power to.
        pub max_txpower: AtomicI32,
        /// Held by a test to park `pre_tbtt_update` after it has been recorded.
        pub pre_tbtt_hold: Mutex<()>,
    }

    impl FakeHardware {
        pub fn new() -> Self {
            let hw = Self::default();
            hw.max_txpower.store(20, Ordering::SeqCst);
            hw
        }

        pub fn reg(&self, offset: u32) -> u32 {
            self.rr(offset)
        }

        pub fn calls(&self) -> Vec<HwCall> {
            self.calls.lock().clone()
        }

        pub fn clear_calls(&self) {
            self.calls.lock().clear();
        }

        fn record(&self, call: HwCall) {
            self.calls.lock().push(call);
        }

        fn fail_if(flag: &AtomicBool, what: &str) -> Result<(), Error> {
            if flag.load(Ordering::SeqCst) {
                Err(Error::Hardware(format!("{} failed", what), Status::IO))
            } else {
                Ok(())
            }
        }
    }

    impl RegisterIo for FakeHardware {
        fn rr(&self, offset: u32) -> u32 {
            self.regs.lock().get(&offset).copied().unwrap_or(0)
        }

        fn wr(&self, offset: u32, val: u32) {
            self.regs.lock().insert(offset, val);
        }
    }

    impl Hardware for FakeHardware {
        fn mac_start(&self) -> Result<(), Error> {
            self.record(HwCall::MacStart);
            Self::fail_if(&self.fail_mac_start, "mac start")
        }

        fn phy_start(&self) -> Result<(), Error> {
            self.record(HwCall::PhyStart);
            Self::fail_if(&self.fail_phy_start, "phy start")
        }

        fn stop_hardware(&self) -> Result<(), Error> {
            self.record(HwCall::StopHardware);
            Ok(())
        }

        fn set_rx_notifications(&self, enabled: bool) {
            self.rx_notifications.store(enabled, Ordering::SeqCst);
            self.record(HwCall::RxNotifications(enabled));
        }

        fn set_channel(&self, channel: &Channel) -> Result<(), Error> {
            self.record(HwCall::SetChannel(*channel));
            Self::fail_if(&self.fail_set_channel, "channel switch")
        }

        fn set_txpower(&self, power_level: i32) -> i32 {
            self.record(HwCall::SetTxpower(power_level));
            power_level.min(self.max_txpower.load(Ordering::SeqCst))
        }

        fn calibrate(&self) {
            self.record(HwCall::Calibrate);
        }

        fn set_bssid(&self, iface_idx: u8, bssid: &MacAddr) {
            self.record(HwCall::SetBssid(iface_idx, *bssid));
        }

        fn set_beacon_enabled(&self, iface_idx: u8, enabled: bool) {
            self.record(HwCall::SetBeaconEnabled(iface_idx, enabled));
        }

        fn set_wcid_rate(&self, slot: Slot, rate: &TxRate) {
            self.record(HwCall::SetWcidRate(slot, *rate));
        }

        fn txq_init(&self, owner: TxqOwner) {
            self.record(HwCall::TxqInit(owner));
        }

        fn txq_remove(&self, owner: TxqOwner) {
            self.record(HwCall::TxqRemove(owner));
        }

        fn pre_tbtt_update(&self) {
            self.record(HwCall::PreTbttUpdate);
            drop(self.pre_tbtt_hold.lock());
        }
    }
}
