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

//! sysinfo-based memory pressure.

use std::sync::{Arc, Mutex};

use backdrop_core::platform::MemorySource;
use sysinfo::System;

/// Reports system memory pressure using the `sysinfo` crate.
pub struct SysinfoMemorySource {
    system: Arc<Mutex<System>>,
}

impl SysinfoMemorySource {
    /// Creates a new source and takes a first memory reading.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self {
            system: Arc::new(Mutex::new(system)),
        }
    }
}

impl Default for SysinfoMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource for SysinfoMemorySource {
    fn memory_pressure(&self) -> Option<f64> {
        let Ok(mut system) = self.system.lock() else {
            return None;
        };
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return None;
        }
        Some(system.used_memory() as f64 / total as f64)
    }
}
