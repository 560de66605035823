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

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event::EventBus;

/// A free-form configuration object.
///
/// The orchestrator hands every feature the section of its configuration keyed by
/// the feature's name. Features usually overlay that section onto their own typed
/// defaults with [`apply_to`](Self::apply_to).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureConfig(Map<String, Value>);

impl FeatureConfig {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON value. Anything but an object yields an empty configuration.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            Value::Null => Self::default(),
            other => {
                log::warn!("Ignoring non-object feature configuration: {other}");
                Self::default()
            }
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// The `enabled` flag; features are enabled unless it is explicitly `false`.
    pub fn enabled(&self) -> bool {
        self.0
            .get("enabled")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Reads `key` as `T`. Missing keys and type mismatches yield `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.0.get(key)?;
        serde_json::from_value(value.clone())
            .map_err(|e| log::debug!("Config key '{key}' has an unexpected shape: {e}"))
            .ok()
    }

    /// The raw value under `key`.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The nested object under `name`, or an empty configuration.
    pub fn section(&self, name: &str) -> FeatureConfig {
        match self.0.get(name) {
            Some(Value::Object(map)) => Self(map.clone()),
            _ => Self::default(),
        }
    }

    /// Overlays this configuration onto `base` and returns the result.
    ///
    /// Keys present here replace the corresponding fields of `base`; everything else
    /// keeps the value from `base`.
    ///
    /// # Errors
    ///
    /// Fails when an overriding value does not fit the field it replaces.
    pub fn apply_to<T>(&self, base: &T) -> Result<T, serde_json::Error>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut value = serde_json::to_value(base)?;
        if let Value::Object(fields) = &mut value {
            for (key, overriding) in &self.0 {
                fields.insert(key.clone(), overriding.clone());
            }
        }
        serde_json::from_value(value)
    }

    /// Renames the key `alias` to `key`.
    ///
    /// When both are present the value under `key` is kept and `alias` is dropped.
    /// Call this before [`apply_to`](Self::apply_to) for every serde alias of the
    /// target type, since the serialized base always carries the canonical key.
    pub fn with_alias(mut self, alias: &str, key: &str) -> Self {
        if let Some(value) = self.0.remove(alias) {
            self.0.entry(key.to_owned()).or_insert(value);
        }
        self
    }

    /// Shallow merge: every key of `other` replaces the key here.
    pub fn merge(&mut self, other: &FeatureConfig) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// `true` when no key is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for FeatureConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// The host surface a background is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountTarget {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<f64>,
}

impl MountTarget {
    /// A target known only by its identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            width: None,
            height: None,
        }
    }

    /// Records the pixel size of the target.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// The host-assigned identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Width and height in pixels, when known.
    pub fn size(&self) -> Option<(f64, f64)> {
        self.width.zip(self.height)
    }
}

/// Everything a feature receives when it is initialized.
#[derive(Debug, Clone, Default)]
pub struct FeatureContext {
    /// The bus shared by every feature of one orchestrator.
    pub event_bus: EventBus,
    /// Configuration for the feature being initialized.
    pub config: FeatureConfig,
    /// Where the background is mounted, if anywhere.
    pub mount_target: Option<MountTarget>,
}

impl FeatureContext {
    /// A context around `event_bus` with empty configuration and no target.
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            event_bus,
            config: FeatureConfig::default(),
            mount_target: None,
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: FeatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the mount target.
    pub fn with_mount_target(mut self, target: MountTarget) -> Self {
        self.mount_target = Some(target);
        self
    }

    /// The same context with its configuration narrowed to the section `name`.
    pub fn scoped(&self, name: &str) -> FeatureContext {
        Self {
            event_bus: self.event_bus.clone(),
            config: self.config.section(name),
            mount_target: self.mount_target.clone(),
        }
    }
}
