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

//! Discrete rendering quality levels and the settings bundle attached to each.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::platform::GpuTier;

/// A rendering quality level, from best to cheapest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    /// Full quality.
    #[default]
    High,
    /// Reduced effects.
    Medium,
    /// Most effects disabled.
    Low,
    /// Bare minimum to keep the background alive.
    Minimal,
}

impl QualityLevel {
    /// Every level, best first.
    pub const ALL: [QualityLevel; 4] = [
        QualityLevel::High,
        QualityLevel::Medium,
        QualityLevel::Low,
        QualityLevel::Minimal,
    ];

    /// The lowercase name used in payloads and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLevel::High => "high",
            QualityLevel::Medium => "medium",
            QualityLevel::Low => "low",
            QualityLevel::Minimal => "minimal",
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<GpuTier> for QualityLevel {
    fn from(tier: GpuTier) -> Self {
        match tier {
            GpuTier::High => QualityLevel::High,
            GpuTier::Medium => QualityLevel::Medium,
            GpuTier::Low => QualityLevel::Low,
            GpuTier::Minimal => QualityLevel::Minimal,
        }
    }
}

/// Shadow rendering quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowQuality {
    /// Soft, high-resolution shadows.
    High,
    /// Hard shadows at reduced resolution.
    Medium,
    /// Blob shadows only.
    Low,
    /// Shadows disabled.
    Off,
}

/// The concrete knobs an effect reads for a quality level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySettings {
    /// Upper bound on simulated particles.
    pub particle_count: u32,
    /// Render-resolution multiplier in `0.0..=1.0`.
    pub resolution: f64,
    /// Shadow technique to use.
    pub shadow_quality: ShadowQuality,
    /// Whether edges are antialiased.
    pub antialiasing: bool,
    /// Whether the post-processing chain runs.
    pub post_processing: bool,
}

/// One [`QualitySettings`] bundle per [`QualityLevel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct QualityProfile {
    pub high: QualitySettings,
    pub medium: QualitySettings,
    pub low: QualitySettings,
    pub minimal: QualitySettings,
}

impl Default for QualityProfile {
    fn default() -> Self {
        Self {
            high: QualitySettings {
                particle_count: 10_000,
                resolution: 1.0,
                shadow_quality: ShadowQuality::High,
                antialiasing: true,
                post_processing: true,
            },
            medium: QualitySettings {
                particle_count: 5_000,
                resolution: 0.75,
                shadow_quality: ShadowQuality::Medium,
                antialiasing: true,
                post_processing: false,
            },
            low: QualitySettings {
                particle_count: 2_000,
                resolution: 0.5,
                shadow_quality: ShadowQuality::Low,
                antialiasing: false,
                post_processing: false,
            },
            minimal: QualitySettings {
                particle_count: 500,
                resolution: 0.25,
                shadow_quality: ShadowQuality::Off,
                antialiasing: false,
                post_processing: false,
            },
        }
    }
}

impl QualityProfile {
    /// The bundle for `level`.
    pub fn get(&self, level: QualityLevel) -> &QualitySettings {
        match level {
            QualityLevel::High => &self.high,
            QualityLevel::Medium => &self.medium,
            QualityLevel::Low => &self.low,
            QualityLevel::Minimal => &self.minimal,
        }
    }

    /// Mutable access to the bundle for `level`.
    pub fn get_mut(&mut self, level: QualityLevel) -> &mut QualitySettings {
        match level {
            QualityLevel::High => &mut self.high,
            QualityLevel::Medium => &mut self.medium,
            QualityLevel::Low => &mut self.low,
            QualityLevel::Minimal => &mut self.minimal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_best_first() {
        assert!(QualityLevel::High < QualityLevel::Medium);
        assert!(QualityLevel::Low < QualityLevel::Minimal);
        assert_eq!(QualityLevel::default(), QualityLevel::High);
    }

    #[test]
    fn gpu_tier_maps_onto_level() {
        assert_eq!(QualityLevel::from(GpuTier::Low), QualityLevel::Low);
    }

    #[test]
    fn default_profile_bundles() {
        let profile = QualityProfile::default();
        assert_eq!(profile.get(QualityLevel::Medium).particle_count, 5_000);
        assert_eq!(profile.get(QualityLevel::Minimal).shadow_quality, ShadowQuality::Off);
        assert!(!profile.get(QualityLevel::Low).antialiasing);
    }

    #[test]
    fn partial_profile_keeps_defaults() {
        let profile: QualityProfile = serde_json::from_value(serde_json::json!({
            "low": {
                "particleCount": 1,
                "resolution": 0.1,
                "shadowQuality": "off",
                "antialiasing": false,
                "postProcessing": false
            }
        }))
        .unwrap();
        assert_eq!(profile.low.particle_count, 1);
        assert_eq!(profile.high, QualityProfile::default().high);
    }
}
