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

//! # Backdrop Infra
//!
//! Concrete implementations of the signal-provider contracts declared in
//! `backdrop_core::platform`, plus deterministic fakes for tests and demos.

#![warn(missing_docs)]

pub mod battery;
pub mod frame;
pub mod gpu;
pub mod memory;

pub use battery::{FixedBattery, NoBattery};
pub use frame::{IntervalFrameSource, ManualFrameSource};
pub use gpu::{NoGpu, ReportedGpuSource};
pub use memory::SysinfoMemorySource;
