// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        beacon::PreTbttTask,
        block_ack::{AmpduAction, BlockAckOps},
        common::{Channel, IfaceMode, MacAddr, TxRate},
        config::DeviceConfig,
        edca::{self, TxQueueParams},
        error::Error,
        filter::{self, FilterFlags},
        host::{HostEvent, HostEventSink},
        hw::{Hardware, RegisterIo, TxqOwner},
        key::{self, KeyConf, KeyTarget, SetKeyCmd},
        peer::{Peer, PeerTable},
        regs::*,
        slot::{Slot, SlotAllocator},
        state::{DeviceState, StateBits},
        timer::{EventId, Scheduler, Timer},
        vif::{self, VifId, VifRegistry},
        wcid,
    },
    bitflags::bitflags,
    log::{debug, error, info, trace, warn},
    parking_lot::Mutex,
    std::sync::Arc,
};

pub const SHORT_SLOT_TIME: u32 = 9;
pub const LONG_SLOT_TIME: u32 = 20;
/// The beacon interval register counts in 1/16 TU.
pub const BEACON_INTERVAL_SHIFT: u32 = 4;

bitflags! {
    /// Parts of the device configuration that changed.
    pub struct ConfigChanged: u32 {
        const POWER = 1 << 0;
        const CHANNEL = 1 << 1;
    }
}

bitflags! {
    /// Parts of an interface's BSS configuration that changed.
    pub struct BssChanged: u32 {
        const BSSID = 1 << 0;
        const BEACON_INT = 1 << 1;
        const BEACON_ENABLED = 1 << 2;
        const ERP_SLOT = 1 << 3;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceConf {
    pub channel: Channel,
    pub power_level: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BssConf {
    pub bssid: MacAddr,
    pub beacon_int: u16,
    pub enable_beacon: bool,
    pub use_short_slot: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimedEvent {
    Calibrate,
}

/// Control-path state guarded by the device lock.
struct Inner {
    slots: SlotAllocator,
    vifs: VifRegistry,
    rxfilter: u32,
    txpower_conf: i32,
    txpower_cur: i32,
    timer: Timer<TimedEvent>,
}

/// One radio.
///
/// Every control operation serializes on the device lock. The receive path (`rx`) and the
/// pre-TBTT task never take it: they read the lifecycle bits and the peer table lock-free.
pub struct Device<H> {
    hw: H,
    config: DeviceConfig,
    state: StateBits,
    peers: PeerTable,
    pre_tbtt: PreTbttTask,
    host: HostEventSink,
    inner: Mutex<Inner>,
}

/// Side effects of block-ack transitions for one peer.
struct SessionOps<'a, H> {
    hw: &'a H,
    host: &'a HostEventSink,
    peer: Slot,
}

impl<H: Hardware> BlockAckOps for SessionOps<'_, H> {
    fn set_rx_reorder(&mut self, tid: u8, enabled: bool) {
        wcid::set_rx_reorder(self.hw, self.peer, tid, enabled);
    }

    fn tx_session_ready(&mut self, tid: u8) {
        self.host.send(HostEvent::TxSessionReady { peer: self.peer, tid });
    }

    fn send_block_ack_req(&mut self, tid: u8, ssn: u16) {
        self.host.send(HostEvent::BlockAckRequest { peer: self.peer, tid, ssn });
    }

    fn tx_session_stopped(&mut self, tid: u8) {
        self.host.send(HostEvent::TxSessionStopped { peer: self.peer, tid });
    }
}

impl<H: Hardware> Device<H> {
    pub fn new(
        hw: H,
        config: DeviceConfig,
        scheduler: Box<dyn Scheduler>,
        host: HostEventSink,
    ) -> Self {
        let rxfilter = hw.rr(MT_RX_FILTR_CFG);
        Self {
            hw,
            config,
            state: StateBits::default(),
            peers: PeerTable::new(),
            pre_tbtt: PreTbttTask::new(),
            host,
            inner: Mutex::new(Inner {
                slots: SlotAllocator::new(),
                vifs: VifRegistry::new(),
                rxfilter,
                txpower_conf: 0,
                txpower_cur: 0,
                timer: Timer::new(scheduler),
            }),
        }
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn state(&self) -> DeviceState {
        self.state.get()
    }

    pub fn peer(&self, slot: Slot) -> Option<Arc<Peer>> {
        self.peers.get(slot)
    }

    pub fn iface_idx(&self, vif: VifId) -> Result<u8, Error> {
        Ok(self.inner.lock().vifs.get(vif)?.idx())
    }

    pub fn group_key_index(&self, vif: VifId) -> Result<Option<u8>, Error> {
        Ok(self.inner.lock().vifs.get(vif)?.group_wcid().key_index())
    }

    pub fn is_slot_allocated(&self, slot: Slot) -> bool {
        self.inner.lock().slots.is_allocated(slot)
    }

    /// Brings up MAC and PHY and opens the receive path. A no-op while already running.
    pub fn start(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        if self.state.contains(DeviceState::RUNNING) {
            debug!("start: already running");
            return Ok(());
        }
        self.hw.mac_start().map_err(|e| {
            error!("mac start failed: {}", e);
            e
        })?;
        self.hw.phy_start().map_err(|e| {
            error!("phy start failed: {}", e);
            e
        })?;
        inner.timer.schedule_after(self.config.calibration_interval(), TimedEvent::Calibrate);
        self.hw.set_rx_notifications(true);
        self.state.set(DeviceState::RUNNING);
        info!("device started");
        Ok(())
    }

    /// Closes the receive path and tears the hardware down. Valid in any state.
    ///
    /// Returns only after a pre-TBTT run already in flight has finished. No run reaches the
    /// hardware afterwards.
    pub fn stop(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        self.hw.set_rx_notifications(false);
        self.state.clear(DeviceState::RUNNING);
        inner.timer.cancel_all();
        self.pre_tbtt.wait_idle();
        let result = self.hw.stop_hardware();
        if let Err(e) = &result {
            error!("hardware stop failed: {}", e);
        }
        info!("device stopped");
        result
    }

    pub fn set_scanning(&self, scanning: bool) {
        let _inner = self.inner.lock();
        let prev = if scanning {
            self.state.set(DeviceState::SCANNING)
        } else {
            self.state.clear(DeviceState::SCANNING)
        };
        if prev.contains(DeviceState::SCANNING) == scanning {
            return;
        }
        if scanning {
            self.pre_tbtt.disable();
        } else {
            self.pre_tbtt.enable();
        }
        debug!("scanning: {}", scanning);
    }

    pub fn begin_scan(&self) {
        self.set_scanning(true);
    }

    pub fn end_scan(&self) {
        self.set_scanning(false);
    }

    pub fn handle_timeout(&self, event_id: EventId) {
        let mut inner = self.inner.lock();
        match inner.timer.triggered(&event_id) {
            Some(TimedEvent::Calibrate) => {
                if !self.state.contains(DeviceState::RUNNING) {
                    return;
                }
                self.hw.calibrate();
                inner
                    .timer
                    .schedule_after(self.config.calibration_interval(), TimedEvent::Calibrate);
            }
            None => trace!("ignoring stale timeout {:?}", event_id),
        }
    }

    /// Runs the pre-TBTT task unless it is suspended or the device is down.
    pub fn pre_tbtt(&self) -> bool {
        let ran = self.pre_tbtt.run(|| {
            // Under the run lock; `stop` waits for the lock after clearing RUNNING.
            if !self.state.contains(DeviceState::RUNNING) {
                return false;
            }
            self.hw.pre_tbtt_update();
            true
        });
        ran.unwrap_or(false)
    }

    pub fn config(&self, changed: ConfigChanged, conf: &DeviceConf) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        if changed.contains(ConfigChanged::POWER) {
            inner.txpower_conf = conf.power_level;
            if self.state.contains(DeviceState::RUNNING) {
                let current = self.hw.set_txpower(conf.power_level);
                inner.txpower_cur = current;
            }
        }
        if changed.contains(ConfigChanged::CHANNEL) {
            self.host.send(HostEvent::StopQueues);
            let result = self.hw.set_channel(&conf.channel);
            self.host.send(HostEvent::WakeQueues);
            result.map_err(|e| {
                warn!("channel switch to {} failed: {}", conf.channel.primary, e);
                e
            })?;
        }
        Ok(())
    }

    pub fn set_channel_and_power(&self, channel: Channel, power_level: i32) -> Result<(), Error> {
        let conf = DeviceConf { channel, power_level };
        self.config(ConfigChanged::POWER | ConfigChanged::CHANNEL, &conf)
    }

    /// Transmit power currently in effect.
    pub fn get_txpower(&self) -> i32 {
        self.inner.lock().txpower_cur
    }

    /// Programs the receive filter and returns the flags the hardware honours.
    pub fn configure_filter(&self, requested: FilterFlags) -> FilterFlags {
        let mut inner = self.inner.lock();
        let accepted = filter::apply(requested, &mut inner.rxfilter);
        self.hw.wr(MT_RX_FILTR_CFG, inner.rxfilter);
        accepted
    }

    pub fn bss_info_changed(
        &self,
        vif: VifId,
        changed: BssChanged,
        info: &BssConf,
    ) -> Result<(), Error> {
        let inner = self.inner.lock();
        let idx = inner.vifs.get(vif)?.idx();
        if changed.contains(BssChanged::BSSID) {
            self.hw.set_bssid(idx, &info.bssid);
        }
        if changed.contains(BssChanged::BEACON_INT) {
            self.program_beacon_interval(info.beacon_int);
        }
        if changed.contains(BssChanged::BEACON_ENABLED) {
            self.program_beacon_enabled(idx, info.enable_beacon);
        }
        if changed.contains(BssChanged::ERP_SLOT) {
            self.program_slot_time(info.use_short_slot);
        }
        Ok(())
    }

    pub fn set_bssid(&self, vif: VifId, bssid: &MacAddr) -> Result<(), Error> {
        let inner = self.inner.lock();
        self.hw.set_bssid(inner.vifs.get(vif)?.idx(), bssid);
        Ok(())
    }

    pub fn set_beacon_interval(&self, beacon_int: u16) {
        let _inner = self.inner.lock();
        self.program_beacon_interval(beacon_int);
    }

    pub fn set_beacon_enabled(&self, vif: VifId, enabled: bool) -> Result<(), Error> {
        let inner = self.inner.lock();
        self.program_beacon_enabled(inner.vifs.get(vif)?.idx(), enabled);
        Ok(())
    }

    pub fn set_slot_time(&self, use_short_slot: bool) {
        let _inner = self.inner.lock();
        self.program_slot_time(use_short_slot);
    }

    fn program_beacon_interval(&self, beacon_int: u16) {
        self.hw.rmw_field(
            MT_BEACON_TIME_CFG,
            MT_BEACON_TIME_CFG_INTVAL,
            (beacon_int as u32) << BEACON_INTERVAL_SHIFT,
        );
    }

    fn program_beacon_enabled(&self, iface_idx: u8, enabled: bool) {
        let _suspended = self.pre_tbtt.suspend();
        self.hw.set_beacon_enabled(iface_idx, enabled);
    }

    fn program_slot_time(&self, use_short_slot: bool) {
        let slot_time = if use_short_slot { SHORT_SLOT_TIME } else { LONG_SLOT_TIME };
        self.hw.rmw_field(MT_BKOFF_SLOT_CFG, MT_BKOFF_SLOT_CFG_SLOTTIME, slot_time);
    }

    /// Registers an interface and reserves its group-key slot.
    pub fn add_interface(&self, mode: IfaceMode, addr: MacAddr) -> Result<VifId, Error> {
        let mut inner = self.inner.lock();
        let idx = vif::iface_index(&self.config.base_mac, &addr, mode);
        let id = inner.vifs.insert(idx, mode, addr)?.id();
        if let Err(e) = inner.slots.reserve(Slot::group(idx)) {
            warn!("group slot of interface {} is held by a peer", idx);
            inner.vifs.remove(id)?;
            return Err(e);
        }
        self.hw.txq_init(TxqOwner::Iface(idx));
        info!("added {:?} interface {}", mode, idx);
        Ok(id)
    }

    /// Unregisters an interface. A group key still bound to it is cleared from the group slot and
    /// the shared-key table before the slot is released.
    pub fn remove_interface(&self, id: VifId) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        let vif = inner.vifs.get(id)?;
        let (idx, group) = (vif.idx(), vif.group_wcid());
        if let Some(key_idx) = group.key_index() {
            debug!("clearing group key {} of interface {}", key_idx, idx);
            group.unbind_key(key_idx);
            key::wcid_set_key(&self.hw, group.slot(), None)?;
            key::shared_key_setup(&self.hw, idx, key_idx, None)?;
        }
        let group_slot = group.slot();
        inner.vifs.remove(id)?;
        self.hw.txq_remove(TxqOwner::Iface(idx));
        inner.slots.release(group_slot);
        info!("removed interface {}", idx);
        Ok(())
    }

    /// Admits a peer: allocates its slot, programs the WCID record and publishes the peer to the
    /// receive path.
    pub fn add_peer(&self, vif: VifId, addr: MacAddr) -> Result<Arc<Peer>, Error> {
        let mut inner = self.inner.lock();
        let iface_idx = inner.vifs.get(vif)?.idx();
        let slot = inner.slots.allocate().map_err(|e| {
            warn!("rejecting peer {:02x?}: {}", addr, e);
            e
        })?;

        wcid::setup(&self.hw, slot, iface_idx, Some(&addr));
        wcid::set_drop(&self.hw, slot, false);
        self.hw.txq_init(TxqOwner::Peer(slot));

        let peer = Arc::new(Peer::new(slot, addr, vif, iface_idx));
        self.peers.publish(slot, Some(Arc::clone(&peer)));
        debug!("peer {:02x?} on slot {}", addr, slot);
        Ok(peer)
    }

    /// Fails unless `peer` is the peer currently published on its slot.
    fn check_published(&self, peer: &Peer) -> Result<(), Error> {
        match self.peers.get(peer.slot()) {
            Some(current) if std::ptr::eq(&*current, peer) => Ok(()),
            _ => {
                debug!("peer {:02x?} is no longer on slot {}", peer.addr(), peer.slot());
                Err(Error::UnknownPeer)
            }
        }
    }

    /// Unpublishes a peer and releases its slot. Readers that already hold the peer keep a valid
    /// reference.
    pub fn remove_peer(&self, peer: &Arc<Peer>) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        let slot = peer.slot();
        self.check_published(peer)?;
        if let Some(key_idx) = peer.key_index() {
            warn!("removing peer on slot {} with key {} still bound", slot, key_idx);
            peer.wcid().unbind_key(key_idx);
            key::wcid_set_key(&self.hw, slot, None)?;
        }

        self.peers.clear(slot);
        self.hw.txq_remove(TxqOwner::Peer(slot));
        wcid::set_drop(&self.hw, slot, true);
        wcid::setup(&self.hw, slot, 0, None);
        inner.slots.release(slot);
        debug!("released slot {}", slot);
        Ok(())
    }

    /// Installs or removes a key. Without a peer the key is the interface's group key.
    pub fn set_key(
        &self,
        vif: VifId,
        peer: Option<&Peer>,
        cmd: SetKeyCmd,
        key: &mut KeyConf,
    ) -> Result<(), Error> {
        let inner = self.inner.lock();
        let vif = inner.vifs.get(vif)?;
        let target = match peer {
            Some(peer) => {
                self.check_published(peer)?;
                if peer.vif() != vif.id() {
                    return Err(Error::UnknownPeer);
                }
                KeyTarget::Peer(peer.wcid())
            }
            None => KeyTarget::Group { wcid: vif.group_wcid(), iface_idx: vif.idx() },
        };
        key::set_key(&self.hw, target, cmd, key)
    }

    pub fn configure_queue(&self, queue: u8, params: &TxQueueParams) -> Result<(), Error> {
        let _inner = self.inner.lock();
        edca::configure_queue(&self.hw, queue, params)
    }

    /// Drives the block-ack session of (`peer`, `tid`). Actions that do not apply in the
    /// session's current state are ignored.
    pub fn ampdu_action(
        &self,
        peer: &Peer,
        action: AmpduAction,
        tid: u8,
        ssn: u16,
    ) -> Result<(), Error> {
        let _inner = self.inner.lock();
        self.check_published(peer)?;
        let session = peer.session(tid).ok_or(Error::InvalidArgs("tid out of range"))?;
        let mut ops = SessionOps { hw: &self.hw, host: &self.host, peer: peer.slot() };
        session.handle(tid, action, ssn, &mut ops);
        Ok(())
    }

    /// Applies the first entry of the host's rate table to the peer's slot.
    pub fn apply_current_rate(&self, peer: &Peer, rates: &[TxRate]) -> Result<(), Error> {
        let _inner = self.inner.lock();
        self.check_published(peer)?;
        match rates.first() {
            Some(rate) => self.hw.set_wcid_rate(peer.slot(), rate),
            None => debug!("empty rate table for slot {}", peer.slot()),
        }
        Ok(())
    }

    pub fn sta_notify(&self, peer: &Peer) {
        trace!("sta_notify for slot {}", peer.slot());
    }

    pub fn flush(&self, drop: bool) {
        trace!("flush (drop: {})", drop);
    }

    /// Receive path. Delivers `bytes` to the host only while running. Never takes the device
    /// lock.
    pub fn rx(&self, bytes: Vec<u8>, slot: Option<Slot>) -> bool {
        if !self.state.contains(DeviceState::RUNNING) {
            trace!("dropping {} byte frame: device not running", bytes.len());
            return false;
        }
        let peer = slot.and_then(|slot| self.peers.get(slot)).map(|peer| peer.slot());
        self.host.send(HostEvent::RxFrame { bytes, peer });
        true
    }
}
