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

use serde::{Deserialize, Serialize};

/// Coarse capability class of the graphics adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuTier {
    /// Discrete or recent high-end adapter.
    High,
    /// Mid-range or capable integrated adapter.
    Medium,
    /// Basic adapter.
    Low,
    /// Barely capable of accelerated drawing.
    Minimal,
}

const HIGH_END: &[&str] = &["nvidia", "geforce", "rtx", "radeon rx", "amd"];
const APPLE_SILICON: &[&str] = &["m1", "m2", "m3"];
const MID_RANGE: &[&str] = &["intel", "iris", "uhd", "gtx", "mx"];

impl GpuTier {
    /// Classifies an adapter from its renderer string and maximum texture size.
    ///
    /// Keyword matching is case-insensitive. A keyword only counts when the texture
    /// limit backs it up, otherwise the adapter falls through to the next tier.
    pub fn classify(renderer: &str, max_texture_size: u32) -> Self {
        let renderer = renderer.to_lowercase();
        let mentions = |keywords: &[&str]| keywords.iter().any(|k| renderer.contains(k));

        let high_end =
            mentions(HIGH_END) || (renderer.contains("apple") && mentions(APPLE_SILICON));
        if high_end && max_texture_size >= 16384 {
            return GpuTier::High;
        }
        if mentions(MID_RANGE) && max_texture_size >= 8192 {
            return GpuTier::Medium;
        }
        if max_texture_size >= 4096 {
            return GpuTier::Low;
        }
        GpuTier::Minimal
    }
}

/// What the host knows about its graphics adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuCapabilities {
    /// Classified tier.
    pub tier: GpuTier,
    /// Renderer string reported by the driver.
    pub renderer: String,
    /// Vendor string reported by the driver.
    pub vendor: String,
    /// Largest supported texture dimension.
    pub max_texture_size: u32,
    /// Whether the newer graphics API generation is available.
    pub extended_api_supported: bool,
}

/// Reports the graphics capabilities of the host, if it can.
pub trait GpuSource: Send + Sync {
    /// Returns the adapter capabilities, or `None` when detection is unsupported.
    fn detect(&self) -> Option<GpuCapabilities>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_end_renderers_need_large_textures() {
        assert_eq!(GpuTier::classify("NVIDIA GeForce RTX 4090", 32768), GpuTier::High);
        assert_eq!(GpuTier::classify("AMD Radeon RX 7900", 16384), GpuTier::High);
        assert_eq!(GpuTier::classify("Apple M2 Pro", 16384), GpuTier::High);
        // Keyword without the texture budget falls through.
        assert_eq!(GpuTier::classify("NVIDIA GeForce", 8192), GpuTier::Low);
    }

    #[test]
    fn mid_range_renderers() {
        assert_eq!(GpuTier::classify("Intel(R) UHD Graphics 620", 16384), GpuTier::Medium);
        assert_eq!(GpuTier::classify("Intel Iris Xe", 8192), GpuTier::Medium);
        assert_eq!(GpuTier::classify("Intel HD", 4096), GpuTier::Low);
    }

    #[test]
    fn unknown_renderers_use_texture_size_only() {
        assert_eq!(GpuTier::classify("Unknown", 16384), GpuTier::Low);
        assert_eq!(GpuTier::classify("Mali-400", 2048), GpuTier::Minimal);
        // "apple" alone is not enough.
        assert_eq!(GpuTier::classify("Apple GPU", 16384), GpuTier::Low);
    }

    #[test]
    fn tier_serializes_lowercase() {
        assert_eq!(serde_json::to_value(GpuTier::Medium).unwrap(), "medium");
    }
}
