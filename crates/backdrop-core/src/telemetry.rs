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

//! Telemetry value types shared between the monitor and its consumers.

use serde::{Deserialize, Serialize};

/// A frame-rate snapshot produced by the performance monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Frames per second over the most recent sample.
    pub fps: f64,
    /// Mean of the sample history, rounded.
    pub avg_fps: f64,
    /// Lowest value in the history, current sample included.
    pub min_fps: f64,
    /// Highest value in the history, current sample included.
    pub max_fps: f64,
    /// Milliseconds per frame at the current rate; `0` when `fps` is `0`.
    pub frame_time: f64,
    /// Used / available memory ratio, when the host reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<f64>,
    /// Clock reading when the snapshot was taken, in milliseconds.
    pub timestamp: f64,
}

impl PerformanceMetrics {
    /// Snapshot of an idle display running at `fps` with no history.
    pub fn steady(fps: f64, timestamp: f64) -> Self {
        Self {
            fps,
            avg_fps: fps,
            min_fps: fps,
            max_fps: fps,
            frame_time: if fps > 0.0 { 1000.0 / fps } else { 0.0 },
            memory_usage: None,
            timestamp,
        }
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::steady(60.0, 0.0)
    }
}
