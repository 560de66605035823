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

//! The plugin contract and the lifecycle manager that drives it.
//!
//! A [`Feature`] is an independently packaged behaviour. Features are registered into
//! a [`FeatureManager`], which orders them by their declared dependencies and runs
//! their asynchronous `init` and `destroy` hooks strictly one after the other.

mod context;
mod error;
mod manager;

pub use self::context::{FeatureConfig, FeatureContext, MountTarget};
pub use self::error::FeatureError;
pub use self::manager::{FeatureManager, SharedFeature};

use async_trait::async_trait;

/// A pluggable unit of behaviour managed by a [`FeatureManager`].
///
/// Names are unique per manager. `name` and `dependencies` are read once, when the
/// feature is registered.
#[async_trait]
pub trait Feature: Send {
    /// The unique name of the feature.
    fn name(&self) -> &str;

    /// An optional version string, informational only.
    fn version(&self) -> Option<&str> {
        None
    }

    /// Names of the features that must be initialized before this one.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Brings the feature up.
    ///
    /// # Arguments
    ///
    /// * `context`: The shared event bus, the configuration section for this feature
    ///   and the mount target, if any. The context is not retained by the manager;
    ///   clone what you need.
    async fn init(&mut self, context: &FeatureContext) -> anyhow::Result<()>;

    /// Tears the feature down. Errors are logged by the manager and never stop the
    /// teardown of the remaining features.
    async fn destroy(&mut self) -> anyhow::Result<()>;
}
