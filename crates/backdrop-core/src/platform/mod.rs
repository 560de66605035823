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

//! Contracts for the signals the kernel consumes from its host.
//!
//! Every provider reports either a value or "unavailable" (`None`), and every one of
//! them can be replaced by a deterministic fake. The kernel never decides how a
//! signal is obtained.

mod battery;
mod clock;
mod frame;
mod gpu;
mod memory;

pub use self::battery::{BatteryListener, BatterySource, BatteryStatus};
pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::frame::{FrameCallback, FrameHandle, FrameSource};
pub use self::gpu::{GpuCapabilities, GpuSource, GpuTier};
pub use self::memory::MemorySource;
