// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Plain data shared between the host-facing API and the hardware layer.

pub type MacAddr = [u8; 6];

/// Bit 1 of the first address octet marks a locally administered address.
pub const LOCALLY_ADMINISTERED_BIT: u8 = 1 << 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cbw {
    Cbw20,
    Cbw40Above,
    Cbw40Below,
    Cbw80,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Channel {
    pub primary: u8,
    pub cbw: Cbw,
}

impl Channel {
    pub fn new(primary: u8, cbw: Cbw) -> Self {
        Self { primary, cbw }
    }
}

/// A single entry of the host's rate table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxRate {
    pub idx: i8,
    pub count: u8,
    pub flags: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IfaceMode {
    Ap,
    Station,
    Mesh,
    Adhoc,
}
