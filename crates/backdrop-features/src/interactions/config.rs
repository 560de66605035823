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

use super::gesture::GestureKind;

/// Configuration of the user-behavior feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionConfig {
    /// Master switch; a disabled feature ignores every sample.
    pub enabled: bool,
    /// Pointer tracking.
    pub mouse: MouseConfig,
    /// Scroll tracking.
    pub scroll: ScrollConfig,
    /// Touch gesture recognition.
    pub touch: TouchConfig,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mouse: MouseConfig::default(),
            scroll: ScrollConfig::default(),
            touch: TouchConfig::default(),
        }
    }
}

/// Pointer tracking options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MouseConfig {
    #[allow(missing_docs)]
    pub enabled: bool,
    /// Minimum milliseconds between two accepted samples.
    pub throttle: f64,
    /// Publishes parallax offsets alongside every sample.
    pub parallax: bool,
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            throttle: 16.0,
            parallax: true,
        }
    }
}

/// Scroll tracking options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrollConfig {
    #[allow(missing_docs)]
    pub enabled: bool,
    /// Minimum milliseconds between two accepted samples.
    pub throttle: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            throttle: 16.0,
        }
    }
}

/// Touch options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TouchConfig {
    #[allow(missing_docs)]
    pub enabled: bool,
    /// Gestures that are recognized and published.
    pub gestures: Vec<GestureKind>,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gestures: GestureKind::ALL.to_vec(),
        }
    }
}
