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

//! Battery awareness on top of a [`BatterySource`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use backdrop_core::platform::{BatterySource, BatteryStatus};

/// Charge level below which a discharging battery counts as low.
pub const LOW_BATTERY_THRESHOLD: f64 = 0.2;

/// Listener for battery notifications.
pub type BatteryCallback = Arc<dyn Fn(&BatteryStatus) + Send + Sync>;

type Listeners = Mutex<Vec<BatteryCallback>>;

fn lock(listeners: &Listeners) -> MutexGuard<'_, Vec<BatteryCallback>> {
    listeners.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_low(status: &BatteryStatus, threshold: f64) -> bool {
    !status.charging && status.level < threshold
}

struct Shared {
    source: Arc<dyn BatterySource>,
    change: Listeners,
    low: Listeners,
}

impl Shared {
    fn handle_change(&self) {
        let Some(status) = self.source.status() else {
            return;
        };
        log::debug!(
            "Battery changed: {:.0}% ({})",
            status.level * 100.0,
            if status.charging { "charging" } else { "discharging" }
        );

        // Snapshot so listeners may register further listeners.
        let change = lock(&self.change).clone();
        for listener in &change {
            listener(&status);
        }
        if is_low(&status, LOW_BATTERY_THRESHOLD) {
            let low = lock(&self.low).clone();
            for listener in &low {
                listener(&status);
            }
        }
    }
}

/// Tracks the battery and notifies listeners about changes and low charge.
pub struct BatteryMonitor {
    shared: Arc<Shared>,
    supported: AtomicBool,
    watching: AtomicBool,
}

impl BatteryMonitor {
    /// Creates a monitor over `source`. Nothing is queried until [`init`](Self::init).
    pub fn new(source: Arc<dyn BatterySource>) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                change: Mutex::new(Vec::new()),
                low: Mutex::new(Vec::new()),
            }),
            supported: AtomicBool::new(false),
            watching: AtomicBool::new(false),
        }
    }

    /// Probes the source and subscribes to its change notifications.
    ///
    /// Returns whether battery information is available. An unsupported source is
    /// not an error: the monitor then reports no status and never notifies.
    pub fn init(&self) -> bool {
        if self.shared.source.status().is_none() {
            log::warn!("Battery status is not supported on this host.");
            self.supported.store(false, Ordering::SeqCst);
            return false;
        }
        self.supported.store(true, Ordering::SeqCst);

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let watching = self.shared.source.watch(Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.handle_change();
            }
        }));
        self.watching.store(watching, Ordering::SeqCst);
        if !watching {
            log::debug!("Battery source does not push updates; status is polled.");
        }
        true
    }

    /// The current status, or `None` when unsupported.
    pub fn status(&self) -> Option<BatteryStatus> {
        if !self.is_supported() {
            return None;
        }
        self.shared.source.status()
    }

    /// `true` when discharging below `threshold`.
    pub fn is_low_battery(&self, threshold: f64) -> bool {
        self.status().is_some_and(|s| is_low(&s, threshold))
    }

    /// Whether [`init`](Self::init) found a battery.
    pub fn is_supported(&self) -> bool {
        self.supported.load(Ordering::SeqCst)
    }

    /// Registers a listener for every status change.
    pub fn on_change(&self, listener: BatteryCallback) {
        lock(&self.shared.change).push(listener);
    }

    /// Registers a listener for changes that leave the battery low.
    pub fn on_low(&self, listener: BatteryCallback) {
        lock(&self.shared.low).push(listener);
    }

    /// Dispatches the current status to the listeners, as a source notification would.
    pub fn handle_change(&self) {
        if self.is_supported() {
            self.shared.handle_change();
        }
    }

    /// Stops watching the source and drops every listener.
    pub fn destroy(&self) {
        if self.watching.swap(false, Ordering::SeqCst) {
            self.shared.source.unwatch();
        }
        lock(&self.shared.change).clear();
        lock(&self.shared.low).clear();
    }
}

impl fmt::Debug for BatteryMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatteryMonitor")
            .field("supported", &self.is_supported())
            .field("watching", &self.watching.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
