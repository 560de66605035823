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

use std::sync::Arc;

use backdrop_core::event::payload;
use backdrop_core::feature::{MountTarget, SharedFeature};
use backdrop_core::{EventBus, Feature, FeatureContext, FeatureManager, Payload};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{BackgroundConfig, BackgroundError, Target, TargetResolver};

#[derive(Serialize)]
struct Mounted<'a> {
    target: &'a str,
    config: &'a BackgroundConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigUpdated<'a> {
    old_config: &'a BackgroundConfig,
    new_config: &'a BackgroundConfig,
    changes: &'a BackgroundConfig,
}

/// The orchestrator: one event bus, one feature manager, one mount state.
///
/// Publishes `background:mounted`, `background:unmounting`,
/// `background:unmounted`, `background:config-updated` and
/// `background:destroyed`.
pub struct SmartBackground {
    config: BackgroundConfig,
    event_bus: EventBus,
    features: FeatureManager,
    resolver: Option<Arc<dyn TargetResolver>>,
    target: Option<MountTarget>,
}

impl SmartBackground {
    /// Creates an unmounted background with no features.
    pub fn new(config: BackgroundConfig) -> Self {
        log::debug!("SmartBackground created.");
        Self {
            config,
            event_bus: EventBus::new(),
            features: FeatureManager::new(),
            resolver: None,
            target: None,
        }
    }

    /// Installs the resolver used for selector targets.
    pub fn with_resolver(mut self, resolver: Arc<dyn TargetResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Registers a feature. See [`FeatureManager::register`].
    pub fn register<F>(&mut self, feature: F) -> Option<Arc<Mutex<F>>>
    where
        F: Feature + 'static,
    {
        self.features.register(feature)
    }

    /// Mounts onto `target` and initializes every feature in dependency order.
    ///
    /// Mounting twice logs a warning and does nothing. On failure the background
    /// stays unmounted; features initialized before the failure keep running
    /// until [`destroy`](Self::destroy).
    ///
    /// # Errors
    ///
    /// [`BackgroundError::TargetNotFound`] when a selector does not resolve, or
    /// [`BackgroundError::Feature`] when dependency resolution or a feature's
    /// `init` fails.
    pub async fn mount(&mut self, target: impl Into<Target>) -> Result<(), BackgroundError> {
        if self.is_mounted() {
            log::warn!("SmartBackground is already mounted");
            return Ok(());
        }

        let target = target.into();
        let description = match &target {
            Target::Handle(handle) => handle.id().to_owned(),
            Target::Selector(selector) => selector.clone(),
        };
        let target = target
            .resolve(self.resolver.as_ref())
            .ok_or(BackgroundError::TargetNotFound(description))?;

        let context = FeatureContext::new(self.event_bus.clone())
            .with_config(self.config.feature_config())
            .with_mount_target(target.clone());
        self.features.init(&context).await?;

        log::info!("SmartBackground mounted on '{}'.", target.id());
        let mounted = payload(&Mounted {
            target: target.id(),
            config: &self.config,
        });
        self.target = Some(target);
        self.event_bus.publish("background:mounted", mounted).await;
        Ok(())
    }

    /// Mounts onto the `container` selector from the configuration.
    pub async fn mount_configured(&mut self) -> Result<(), BackgroundError> {
        let selector = self.config.container.clone().ok_or_else(|| {
            BackgroundError::TargetNotFound("no container configured".to_owned())
        })?;
        self.mount(selector).await
    }

    /// Tears every feature down in reverse initialization order.
    ///
    /// Unmounting while unmounted logs a warning and does nothing.
    pub async fn unmount(&mut self) {
        if !self.is_mounted() {
            log::warn!("SmartBackground is not mounted");
            return;
        }

        self.event_bus
            .publish("background:unmounting", Payload::Null)
            .await;
        self.features.destroy().await;
        self.target = None;
        log::info!("SmartBackground unmounted.");
        self.event_bus
            .publish("background:unmounted", Payload::Null)
            .await;
    }

    /// Merges `changes` into the configuration and announces it.
    ///
    /// Features are not re-initialized; they pick the new sections up on the next
    /// mount.
    pub async fn update(&mut self, changes: BackgroundConfig) {
        let old_config = self.config.clone();
        self.config.merge(&changes);

        let updated = payload(&ConfigUpdated {
            old_config: &old_config,
            new_config: &self.config,
            changes: &changes,
        });
        self.event_bus
            .publish("background:config-updated", updated)
            .await;
    }

    /// Unmounts if needed, drops every subscription and destroys any feature
    /// still running, including those left over from a failed mount.
    pub async fn destroy(&mut self) {
        if self.is_mounted() {
            self.unmount().await;
        }
        self.event_bus.clear();
        self.features.destroy().await;
        self.event_bus
            .publish("background:destroyed", Payload::Null)
            .await;
        log::info!("SmartBackground destroyed.");
    }

    /// The bus shared with every feature.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// The feature registry.
    pub fn feature_manager(&self) -> &FeatureManager {
        &self.features
    }

    /// Mutable access to the feature registry.
    pub fn feature_manager_mut(&mut self) -> &mut FeatureManager {
        &mut self.features
    }

    /// The feature registered under `name`.
    pub fn feature(&self, name: &str) -> Option<SharedFeature> {
        self.features.get(name)
    }

    /// Whether [`mount`](Self::mount) succeeded and no unmount followed.
    pub fn is_mounted(&self) -> bool {
        self.target.is_some()
    }

    /// Where the background is mounted.
    pub fn mount_target(&self) -> Option<&MountTarget> {
        self.target.as_ref()
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> BackgroundConfig {
        self.config.clone()
    }
}

impl Default for SmartBackground {
    fn default() -> Self {
        Self::new(BackgroundConfig::default())
    }
}
