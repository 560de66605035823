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

use backdrop_core::FeatureError;

/// Errors surfaced by [`SmartBackground`](crate::SmartBackground).
#[derive(Debug, Error)]
pub enum BackgroundError {
    /// A selector did not resolve to a mount target.
    #[error("container not found: {0}")]
    TargetNotFound(String),
    /// Feature resolution or initialization failed.
    #[error(transparent)]
    Feature(#[from] FeatureError),
    /// The configuration could not be parsed.
    #[error("invalid background configuration")]
    Config(#[source] serde_json::Error),
}
