// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A snapshot of the power state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryStatus {
    /// Charge level between 0.0 and 1.0.
    pub level: f64,
    /// Whether the device is connected to a charger.
    pub charging: bool,
    /// Seconds until fully charged, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charging_time: Option<f64>,
    /// Seconds until empty, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharging_time: Option<f64>,
}

impl BatteryStatus {
    /// A status with only level and charging state known.
    pub fn new(level: f64, charging: bool) -> Self {
        Self {
            level,
            charging,
            charging_time: None,
            discharging_time: None,
        }
    }
}

/// Called by a [`BatterySource`] whenever level or charging state changes.
pub type BatteryListener = Arc<dyn Fn() + Send + Sync>;

/// Reports the battery state of the host, if it can.
pub trait BatterySource: Send + Sync {
    /// Returns the current status, or `None` when the host exposes no battery.
    fn status(&self) -> Option<BatteryStatus>;

    /// Installs `listener` for change notifications.
    ///
    /// Returns `false` when the source cannot push updates; callers then rely on
    /// polling [`status`](Self::status).
    fn watch(&self, listener: BatteryListener) -> bool {
        let _ = listener;
        false
    }

    /// Removes the listener installed by [`watch`](Self::watch).
    fn unwatch(&self) {}
}
