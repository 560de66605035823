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

//! Parallax offsets derived from pointer and scroll positions.

use serde::{Deserialize, Serialize};

use super::pointer::PointerPosition;
use super::scroll::ScrollPosition;

/// Parameters of a parallax computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParallaxConfig {
    /// Effect strength, usually in `[0, 1]`.
    pub strength: f64,
    /// Moves against the pointer instead of with it.
    pub inverted: bool,
    /// Horizontal offset bound in pixels.
    pub limit_x: f64,
    /// Vertical offset bound in pixels.
    pub limit_y: f64,
}

impl ParallaxConfig {
    /// A non-inverted config with default limits.
    pub fn with_strength(strength: f64) -> Self {
        Self {
            strength,
            ..Self::default()
        }
    }

    fn multiplier(&self) -> f64 {
        if self.inverted {
            -1.0
        } else {
            1.0
        }
    }
}

impl Default for ParallaxConfig {
    fn default() -> Self {
        Self {
            strength: 0.5,
            inverted: false,
            limit_x: 100.0,
            limit_y: 100.0,
        }
    }
}

/// Offset driven by the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerParallax {
    #[allow(missing_docs)]
    pub x: f64,
    #[allow(missing_docs)]
    pub y: f64,
    /// Small tilt following the horizontal position.
    pub rotation: f64,
}

/// Offset driven by the scroll position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollParallax {
    #[allow(missing_docs)]
    pub x: f64,
    #[allow(missing_docs)]
    pub y: f64,
    /// Zoom growing with scroll progress.
    pub scale: f64,
}

/// Pointer parallax, centered on the viewport and clamped to the limits.
pub fn from_pointer(pointer: &PointerPosition, config: &ParallaxConfig) -> PointerParallax {
    // Centered coordinates in [-1, 1].
    let center_x = (pointer.normalized_x - 0.5) * 2.0;
    let center_y = (pointer.normalized_y - 0.5) * 2.0;
    let multiplier = config.multiplier();

    PointerParallax {
        x: (center_x * config.strength * config.limit_x * multiplier)
            .clamp(-config.limit_x, config.limit_x),
        y: (center_y * config.strength * config.limit_y * multiplier)
            .clamp(-config.limit_y, config.limit_y),
        rotation: center_x * config.strength * 0.1 * multiplier,
    }
}

/// Scroll parallax: a vertical offset plus a slight zoom.
pub fn from_scroll(scroll: &ScrollPosition, config: &ParallaxConfig) -> ScrollParallax {
    ScrollParallax {
        x: 0.0,
        y: scroll.normalized_y * config.strength * 100.0 * config.multiplier(),
        scale: 1.0 + scroll.progress * config.strength * 0.1,
    }
}

/// Moves `current` a `factor` of the way towards `target`.
pub fn ease(current: f64, target: f64, factor: f64) -> f64 {
    current + (target - current) * factor
}

/// Velocity mapped onto `[0, 1]`, saturating at `max_velocity`.
pub fn velocity_effect(velocity: f64, max_velocity: f64) -> f64 {
    if max_velocity <= 0.0 {
        return 1.0;
    }
    (velocity.abs() / max_velocity).min(1.0)
}
