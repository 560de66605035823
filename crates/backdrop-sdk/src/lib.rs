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

//! The public-facing SDK for Backdrop.
//!
//! A [`SmartBackground`] owns one event bus and one feature manager. Register
//! features, [`mount`](SmartBackground::mount) onto a target and the features
//! come up in dependency order; [`destroy`](SmartBackground::destroy) tears them
//! down in reverse.

#![warn(missing_docs)]

mod background;
mod config;
mod error;
mod target;

pub use background::SmartBackground;
pub use config::BackgroundConfig;
pub use error::BackgroundError;
pub use target::{Target, TargetResolver};

/// Everything a host usually needs, in one import.
pub mod prelude {
    pub use crate::{BackgroundConfig, BackgroundError, SmartBackground, Target, TargetResolver};
    pub use backdrop_core::event::{payload, Handler, Payload, Subscription};
    pub use backdrop_core::feature::{
        Feature, FeatureConfig, FeatureContext, FeatureError, MountTarget,
    };
    pub use backdrop_core::platform::{BatteryStatus, GpuCapabilities, GpuTier};
    pub use backdrop_core::quality::{QualityLevel, QualitySettings};
    pub use backdrop_core::telemetry::PerformanceMetrics;
    pub use backdrop_core::EventBus;
    pub use backdrop_features::interactions::{InteractionConfig, TouchPoint};
    pub use backdrop_features::performance::PerformanceConfig;
    pub use backdrop_features::{InteractionInput, PerformanceFeature, UserBehaviorFeature};
    pub use backdrop_infra::{
        FixedBattery, IntervalFrameSource, ManualFrameSource, NoBattery, NoGpu,
        ReportedGpuSource, SysinfoMemorySource,
    };
    pub use backdrop_telemetry::logging;
}
