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

//! Battery providers.

use std::sync::{Mutex, MutexGuard, PoisonError};

use backdrop_core::platform::{BatteryListener, BatterySource, BatteryStatus};

/// A battery whose state is set by the host.
///
/// Every [`set`](Self::set) notifies the installed watcher, which makes this both
/// the adapter for hosts that poll their power state and a scripted fake.
#[derive(Default)]
pub struct FixedBattery {
    status: Mutex<Option<BatteryStatus>>,
    listener: Mutex<Option<BatteryListener>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FixedBattery {
    /// A battery currently reporting `status`.
    pub fn new(status: BatteryStatus) -> Self {
        Self {
            status: Mutex::new(Some(status)),
            listener: Mutex::new(None),
        }
    }

    /// Updates the status and notifies the watcher.
    pub fn set(&self, status: BatteryStatus) {
        *lock(&self.status) = Some(status);
        let listener = lock(&self.listener).clone();
        if let Some(listener) = listener {
            listener();
        }
    }

    /// Whether a watcher is installed.
    pub fn is_watched(&self) -> bool {
        lock(&self.listener).is_some()
    }
}

impl std::fmt::Debug for FixedBattery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedBattery")
            .field("status", &*lock(&self.status))
            .field("watched", &self.is_watched())
            .finish()
    }
}

impl BatterySource for FixedBattery {
    fn status(&self) -> Option<BatteryStatus> {
        *lock(&self.status)
    }

    fn watch(&self, listener: BatteryListener) -> bool {
        *lock(&self.listener) = Some(listener);
        true
    }

    fn unwatch(&self) {
        lock(&self.listener).take();
    }
}

/// A host without a battery, or one that does not expose it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBattery;

impl BatterySource for NoBattery {
    fn status(&self) -> Option<BatteryStatus> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn set_notifies_the_watcher() {
        let battery = FixedBattery::new(BatteryStatus::new(1.0, true));
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&calls);
        assert!(battery.watch(Arc::new(move || {
            sink.fetch_add(1, Ordering::SeqCst);
        })));

        battery.set(BatteryStatus::new(0.5, false));
        assert_eq!(battery.status(), Some(BatteryStatus::new(0.5, false)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        battery.unwatch();
        battery.set(BatteryStatus::new(0.4, false));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_battery_is_unsupported() {
        assert!(NoBattery.status().is_none());
        assert!(!NoBattery.watch(Arc::new(|| {})));
    }
}
