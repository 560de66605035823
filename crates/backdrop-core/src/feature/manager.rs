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

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::{Feature, FeatureContext, FeatureError};
use crate::graph::topological_sort;

/// A registered feature, shared between the manager and host code.
pub type SharedFeature = Arc<Mutex<dyn Feature>>;

struct Entry {
    name: String,
    version: Option<String>,
    dependencies: Vec<String>,
    feature: SharedFeature,
}

/// Registers features and drives their lifecycle in dependency order.
///
/// The manager owns the registrations, not the features' internal state: host code
/// may keep the typed handle returned by [`register`](Self::register).
#[derive(Default)]
pub struct FeatureManager {
    // Registration order; also the root order of the dependency walk.
    entries: Vec<Entry>,
    initialized: HashSet<String>,
    order: Vec<String>,
}

impl FeatureManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `feature` and returns a typed handle to it.
    ///
    /// Returns `None` and logs a warning when a feature with the same name exists;
    /// the first registration wins. Dependencies are not validated here.
    pub fn register<F>(&mut self, feature: F) -> Option<Arc<Mutex<F>>>
    where
        F: Feature + 'static,
    {
        let name = feature.name().to_owned();
        if self.has(&name) {
            log::warn!("Feature '{name}' is already registered");
            return None;
        }

        let version = feature.version().map(str::to_owned);
        let dependencies = feature.dependencies();
        let handle = Arc::new(Mutex::new(feature));
        let shared: SharedFeature = handle.clone();

        log::debug!(
            "Registered feature '{name}' (version: {}, dependencies: {dependencies:?})",
            version.as_deref().unwrap_or("n/a")
        );
        self.entries.push(Entry {
            name,
            version,
            dependencies,
            feature: shared,
        });
        Some(handle)
    }

    /// Removes the feature called `name`, destroying it first if it is initialized.
    ///
    /// Teardown failures are logged and the feature is removed regardless. Returns
    /// `false` when nothing was registered under `name`.
    pub async fn unregister(&mut self, name: &str) -> bool {
        let Some(index) = self.entries.iter().position(|e| e.name == name) else {
            log::warn!("Feature '{name}' is not registered");
            return false;
        };
        let entry = self.entries.remove(index);

        if self.initialized.remove(name) {
            if let Err(e) = entry.feature.lock().await.destroy().await {
                log::error!("Failed to destroy feature '{name}': {e:#}");
            }
        }
        self.order.retain(|n| n != name);
        log::debug!("Unregistered feature '{name}'");
        true
    }

    /// The feature registered under `name`.
    pub fn get(&self, name: &str) -> Option<SharedFeature> {
        self.entry(name).map(|e| Arc::clone(&e.feature))
    }

    /// Whether a feature is registered under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// The declared version of the feature `name`.
    pub fn version(&self, name: &str) -> Option<&str> {
        self.entry(name).and_then(|e| e.version.as_deref())
    }

    /// Every registered feature in registration order. The returned list is a copy.
    pub fn get_all(&self) -> Vec<(String, SharedFeature)> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), Arc::clone(&e.feature)))
            .collect()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Number of registered features.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` completed `init` and has not been destroyed since.
    pub fn is_initialized(&self, name: &str) -> bool {
        self.initialized.contains(name)
    }

    /// Name to initialized flag, for every registered feature.
    pub fn initialization_status(&self) -> BTreeMap<String, bool> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), self.initialized.contains(&e.name)))
            .collect()
    }

    /// The order computed by the last [`init`](Self::init), emptied by
    /// [`destroy`](Self::destroy).
    pub fn initialization_order(&self) -> &[String] {
        &self.order
    }

    /// Computes the dependency order without touching any feature.
    ///
    /// # Errors
    ///
    /// [`FeatureError::CircularDependency`] or [`FeatureError::MissingDependency`].
    pub fn resolve_order(&self) -> Result<Vec<String>, FeatureError> {
        let graph = self
            .entries
            .iter()
            .map(|e| (e.name.clone(), e.dependencies.clone()));
        Ok(topological_sort(graph)?)
    }

    /// Initializes every registered feature in dependency order.
    ///
    /// Each feature receives `context` narrowed to its own configuration section.
    /// Features are initialized one at a time; already initialized features are
    /// skipped.
    ///
    /// # Errors
    ///
    /// A structural error is returned before any `init` runs. On the first failing
    /// `init` the remaining features are not initialized and the error names the
    /// failing feature. Features initialized before it stay initialized.
    pub async fn init(&mut self, context: &FeatureContext) -> Result<(), FeatureError> {
        let order = self.resolve_order()?;
        self.order = order.clone();
        log::info!("Initializing features in order: {order:?}");

        for name in &order {
            if self.initialized.contains(name) {
                log::debug!("Feature '{name}' is already initialized");
                continue;
            }
            let Some(feature) = self.get(name) else {
                continue;
            };

            let scoped = context.scoped(name);
            let outcome = feature.lock().await.init(&scoped).await;
            match outcome {
                Ok(()) => {
                    self.initialized.insert(name.clone());
                    log::info!("Feature '{name}' initialized");
                }
                Err(source) => {
                    log::error!("Failed to initialize feature '{name}': {source:#}");
                    return Err(FeatureError::InitFailed {
                        name: name.clone(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Destroys initialized features in the reverse of the last initialization order.
    ///
    /// Failures are logged and skipped. The remembered order is cleared afterwards.
    pub async fn destroy(&mut self) {
        let order = std::mem::take(&mut self.order);

        for name in order.iter().rev() {
            if !self.initialized.contains(name) {
                continue;
            }
            let Some(feature) = self.get(name) else {
                continue;
            };

            let outcome = feature.lock().await.destroy().await;
            match outcome {
                Ok(()) => {
                    self.initialized.remove(name);
                    log::info!("Feature '{name}' destroyed");
                }
                Err(e) => log::error!("Failed to destroy feature '{name}': {e:#}"),
            }
        }
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

impl std::fmt::Debug for FeatureManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureManager")
            .field("features", &self.names())
            .field("initialized", &self.initialized)
            .field("order", &self.order)
            .finish()
    }
}
