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

use std::collections::BTreeMap;

use backdrop_core::FeatureConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::BackgroundError;

/// Orchestrator configuration.
///
/// Unknown keys are preserved in [`extra`](Self::extra) so hosts can carry their
/// own settings through [`SmartBackground::update`](crate::SmartBackground::update).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundConfig {
    /// Selector of the default mount target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    /// Name of the renderer the host should use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<String>,
    /// Effect description, opaque to the orchestrator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<Value>,
    /// Per-feature configuration sections, keyed by feature name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, FeatureConfig>,
    /// Every other key.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BackgroundConfig {
    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, BackgroundError> {
        serde_json::from_str(json).map_err(BackgroundError::Config)
    }

    /// Builder-style setter for one feature section.
    pub fn with_feature(mut self, name: impl Into<String>, config: FeatureConfig) -> Self {
        self.features.insert(name.into(), config);
        self
    }

    /// Shallow merge of `changes` into `self`.
    ///
    /// Every key set in `changes` replaces the whole value here, `features`
    /// included. Unset keys are left alone.
    pub fn merge(&mut self, changes: &BackgroundConfig) {
        if changes.container.is_some() {
            self.container.clone_from(&changes.container);
        }
        if changes.renderer.is_some() {
            self.renderer.clone_from(&changes.renderer);
        }
        if changes.effect.is_some() {
            self.effect.clone_from(&changes.effect);
        }
        if !changes.features.is_empty() {
            self.features.clone_from(&changes.features);
        }
        for (key, value) in &changes.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }

    /// The configuration handed to the feature manager: one section per feature.
    pub fn feature_config(&self) -> FeatureConfig {
        self.features
            .iter()
            .fold(FeatureConfig::new(), |config, (name, section)| {
                config.with(name.clone(), section.clone().into_value())
            })
    }
}
