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

//! GPU capability providers.

use backdrop_core::platform::{GpuCapabilities, GpuSource, GpuTier};

/// Capabilities reported by the host's graphics stack.
///
/// The host reads the adapter strings and limits once; the tier is derived with
/// [`GpuTier::classify`].
#[derive(Debug, Clone)]
pub struct ReportedGpuSource {
    capabilities: GpuCapabilities,
}

impl ReportedGpuSource {
    /// Builds capabilities from raw adapter information.
    pub fn new(
        renderer: impl Into<String>,
        vendor: impl Into<String>,
        max_texture_size: u32,
        extended_api_supported: bool,
    ) -> Self {
        let renderer = renderer.into();
        let tier = GpuTier::classify(&renderer, max_texture_size);
        log::debug!("GPU '{renderer}' classified as {tier:?}");
        Self {
            capabilities: GpuCapabilities {
                tier,
                renderer,
                vendor: vendor.into(),
                max_texture_size,
                extended_api_supported,
            },
        }
    }

    /// Wraps capabilities the host classified itself.
    pub fn from_capabilities(capabilities: GpuCapabilities) -> Self {
        Self { capabilities }
    }
}

impl GpuSource for ReportedGpuSource {
    fn detect(&self) -> Option<GpuCapabilities> {
        Some(self.capabilities.clone())
    }
}

/// A host without accelerated graphics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGpu;

impl GpuSource for NoGpu {
    fn detect(&self) -> Option<GpuCapabilities> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_source_classifies_the_renderer() {
        let source = ReportedGpuSource::new("Intel(R) Iris(R) Xe", "Intel", 16384, true);
        let caps = source.detect().unwrap();
        assert_eq!(caps.tier, GpuTier::Medium);
        assert_eq!(caps.vendor, "Intel");
        assert!(caps.extended_api_supported);
    }

    #[test]
    fn no_gpu_detects_nothing() {
        assert!(NoGpu.detect().is_none());
    }
}
