// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Virtual interfaces and their hardware interface indices.

use {
    crate::{
        common::{IfaceMode, MacAddr, LOCALLY_ADMINISTERED_BIT},
        error::Error,
        slot::Slot,
        wcid::Wcid,
    },
    std::collections::HashMap,
};

/// Station interfaces use the upper half of the interface index space.
pub const STATION_IFACE_OFFSET: u8 = 8;
pub const MAX_IFACES: usize = 16;

/// Host-side handle of an interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VifId(pub u32);

/// Derives the hardware interface index of an interface from its address.
///
/// Interfaces sharing the base address get index 0. A locally administered address selects one
/// of the indices 1..=8 from bits 2..5 of its first octet.
pub fn iface_index(base_mac: &MacAddr, addr: &MacAddr, mode: IfaceMode) -> u8 {
    let mut idx = 0;
    if addr[0] & LOCALLY_ADMINISTERED_BIT != 0 {
        idx = 1 + (((base_mac[0] ^ addr[0]) >> 2) & 0x7);
    }
    if mode == IfaceMode::Station {
        idx += STATION_IFACE_OFFSET;
    }
    idx
}

#[derive(Debug)]
pub struct Vif {
    id: VifId,
    idx: u8,
    mode: IfaceMode,
    addr: MacAddr,
    group_wcid: Wcid,
}

impl Vif {
    pub fn id(&self) -> VifId {
        self.id
    }

    /// Hardware interface index.
    pub fn idx(&self) -> u8 {
        self.idx
    }

    pub fn mode(&self) -> IfaceMode {
        self.mode
    }

    pub fn addr(&self) -> &MacAddr {
        &self.addr
    }

    pub fn group_wcid(&self) -> &Wcid {
        &self.group_wcid
    }
}

#[derive(Debug, Default)]
pub struct VifRegistry {
    vifs: HashMap<VifId, Vif>,
    next_id: u32,
}

impl VifRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interface at hardware index `idx`. The caller owns reserving its group slot.
    pub fn insert(&mut self, idx: u8, mode: IfaceMode, addr: MacAddr) -> Result<&Vif, Error> {
        if idx as usize >= MAX_IFACES {
            return Err(Error::InvalidArgs("interface index out of range"));
        }
        if self.vifs.values().any(|vif| vif.idx == idx) {
            return Err(Error::IfaceIndexInUse(idx));
        }
        self.next_id += 1;
        let id = VifId(self.next_id);
        let vif = Vif { id, idx, mode, addr, group_wcid: Wcid::new(Slot::group(idx)) };
        Ok(self.vifs.entry(id).or_insert(vif))
    }

    pub fn remove(&mut self, id: VifId) -> Result<Vif, Error> {
        self.vifs.remove(&id).ok_or(Error::UnknownInterface)
    }

    pub fn get(&self, id: VifId) -> Result<&Vif, Error> {
        self.vifs.get(&id).ok_or(Error::UnknownInterface)
    }

    pub fn len(&self) -> usize {
        self.vifs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vifs.is_empty()
    }
}
