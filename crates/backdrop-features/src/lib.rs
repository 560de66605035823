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

//! # Backdrop Features
//!
//! Ready-made [`Feature`](backdrop_core::Feature)s:
//!
//! * [`PerformanceFeature`] keeps animation smooth by adapting the quality level to
//!   the measured frame rate, the GPU tier and the battery state.
//! * [`UserBehaviorFeature`] turns pointer, scroll and touch samples into motion
//!   data, gestures and parallax offsets.

#![warn(missing_docs)]

pub mod interactions;
pub mod performance;

pub use interactions::{InteractionInput, UserBehaviorFeature};
pub use performance::PerformanceFeature;
