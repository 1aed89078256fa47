// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    bitflags::bitflags,
    std::sync::atomic::{AtomicU32, Ordering},
};

bitflags! {
    pub struct DeviceState: u32 {
        const RUNNING = 1 << 0;
        const SCANNING = 1 << 1;
    }
}

/// Lifecycle bits. Written under the device lock, read lock-free by the receive path.
#[derive(Debug, Default)]
pub struct StateBits(AtomicU32);

impl StateBits {
    pub fn get(&self) -> DeviceState {
        DeviceState::from_bits_truncate(self.0.load(Ordering::Acquire))
    }

    pub fn contains(&self, flags: DeviceState) -> bool {
        self.get().contains(flags)
    }

    /// Sets `flags` and returns the previous state.
    pub fn set(&self, flags: DeviceState) -> DeviceState {
        DeviceState::from_bits_truncate(self.0.fetch_or(flags.bits(), Ordering::AcqRel))
    }

    /// Clears `flags` and returns the previous state.
    pub fn clear(&self, flags: DeviceState) -> DeviceState {
        DeviceState::from_bits_truncate(self.0.fetch_and(!flags.bits(), Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear_report_previous() {
        let state = StateBits::default();
        assert!(state.get().is_empty());
        assert!(!state.set(DeviceState::RUNNING).contains(DeviceState::RUNNING));
        assert!(state.set(DeviceState::SCANNING).contains(DeviceState::RUNNING));
        assert_eq!(state.get(), DeviceState::RUNNING | DeviceState::SCANNING);
        assert!(state.clear(DeviceState::RUNNING).contains(DeviceState::RUNNING));
        assert!(!state.contains(DeviceState::RUNNING));
        assert!(state.contains(DeviceState::SCANNING));
    }
}
