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

use backdrop_core::platform::{BatteryStatus, GpuCapabilities};
use backdrop_core::quality::{QualityLevel, QualityProfile};
use backdrop_core::telemetry::PerformanceMetrics;
use serde::{Deserialize, Serialize};

/// Configuration of the performance feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceConfig {
    /// A disabled feature initializes without monitoring anything.
    pub enabled: bool,
    /// Frame rate the adaptive controller aims for.
    #[serde(alias = "targetFPS")]
    pub target_fps: f64,
    /// Let measured frame rates drive the quality level.
    pub adaptive_quality: bool,
    /// Drop to low quality when the battery runs low.
    pub battery_aware: bool,
    /// Suspend adaptation while the host reports the view as hidden.
    pub pause_on_hidden: bool,
    /// Log a statistics line with every sample.
    pub show_stats: bool,
    /// Replacement settings bundles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_levels: Option<QualityProfile>,
}

impl PerformanceConfig {
    /// Alternative spelling accepted for `targetFps`.
    pub const TARGET_FPS_ALIAS: &'static str = "targetFPS";
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_fps: 60.0,
            adaptive_quality: true,
            battery_aware: true,
            pause_on_hidden: true,
            show_stats: false,
            quality_levels: None,
        }
    }
}

/// Snapshot of what the performance feature knows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceState {
    /// Active quality level.
    pub current_quality: QualityLevel,
    /// Latest frame statistics.
    pub metrics: PerformanceMetrics,
    /// Detected adapter, if any.
    pub gpu_capabilities: Option<GpuCapabilities>,
    /// Latest battery reading, if any.
    pub battery_status: Option<BatteryStatus>,
    /// Host-reported visibility.
    pub is_tab_visible: bool,
    /// Adaptation is suspended.
    pub is_paused: bool,
}

impl Default for PerformanceState {
    fn default() -> Self {
        Self {
            current_quality: QualityLevel::High,
            metrics: PerformanceMetrics::default(),
            gpu_capabilities: None,
            battery_status: None,
            is_tab_visible: true,
            is_paused: false,
        }
    }
}
