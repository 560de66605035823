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

use thiserror::Error;

use crate::graph::GraphError;

/// A structural failure of the feature lifecycle.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// The dependency graph contains a cycle through the named feature.
    #[error("circular dependency detected: {name}")]
    CircularDependency {
        /// The feature reached again while it was still being resolved.
        name: String,
    },
    /// A feature depends on a name that was never registered.
    #[error("missing dependency: {dependency} (required by {required_by})")]
    MissingDependency {
        /// The unregistered dependency.
        dependency: String,
        /// The feature that declared it.
        required_by: String,
    },
    /// A feature's `init` hook returned an error.
    #[error("feature initialization failed: {name}")]
    InitFailed {
        /// The failing feature.
        name: String,
        /// What the feature reported.
        #[source]
        source: anyhow::Error,
    },
}

impl FeatureError {
    /// The feature this error is about.
    pub fn feature_name(&self) -> &str {
        match self {
            FeatureError::CircularDependency { name } | FeatureError::InitFailed { name, .. } => {
                name
            }
            FeatureError::MissingDependency { required_by, .. } => required_by,
        }
    }
}

impl From<GraphError<String>> for FeatureError {
    fn from(err: GraphError<String>) -> Self {
        match err {
            GraphError::Cycle(name) => FeatureError::CircularDependency { name },
            GraphError::MissingDependency {
                dependency,
                required_by,
            } => FeatureError::MissingDependency {
                dependency,
                required_by,
            },
        }
    }
}
