// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::common::MacAddr,
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

pub const DEFAULT_CALIBRATION_INTERVAL_MS: u64 = 1000;

fn default_calibration_interval_ms() -> u64 {
    DEFAULT_CALIBRATION_INTERVAL_MS
}

/// Per-device settings supplied at attach.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Address burned into the device. Interface indices are derived relative to it.
    #[serde(default)]
    pub base_mac: MacAddr,
    #[serde(default = "default_calibration_interval_ms")]
    pub calibration_interval_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { base_mac: [0; 6], calibration_interval_ms: DEFAULT_CALIBRATION_INTERVAL_MS }
    }
}

impl DeviceConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn calibration_interval(&self) -> Duration {
        Duration::from_millis(self.calibration_interval_ms)
    }
}
