// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Control plane of the mt76 family of SoftMAC wireless chips.
//!
//! The driver owns the hardware peer table (see [`slot`] and [`peer`]), maps host interfaces onto
//! hardware interface indices ([`vif`]), binds cipher keys to peer-table slots ([`key`]) and runs
//! the per-TID block-ack state machine ([`block_ack`]). [`device::Device`] ties these together
//! behind the host-facing operations and serializes configuration changes.
//!
//! Register access goes through the [`hw::Hardware`] trait so that the bus layer can be swapped
//! out, and the crate can be exercised against a register fake in tests.

pub mod beacon;
pub mod block_ack;
pub mod common;
pub mod config;
pub mod device;
pub mod edca;
pub mod error;
pub mod filter;
pub mod host;
pub mod hw;
pub mod key;
pub mod peer;
pub mod regs;
pub mod slot;
mod state;
pub mod timer;
pub mod vif;
pub mod wcid;

pub use {
    config::DeviceConfig,
    device::Device,
    error::{Error, ResultExt, Status},
    host::{HostEvent, HostEventSink, HostEventStream},
    hw::Hardware,
    slot::Slot,
    state::DeviceState,
};
