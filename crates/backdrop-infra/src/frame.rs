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

//! Frame sources: a tokio-driven interval and a manually stepped one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use backdrop_core::platform::{
    Clock, FrameCallback, FrameHandle, FrameSource, ManualClock, SystemClock,
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Delivers frames at a fixed refresh rate from a tokio task per subscription.
///
/// Must be used from within a tokio runtime. Late ticks are skipped rather than
/// delivered in a burst, like a display that drops frames.
#[derive(Debug)]
pub struct IntervalFrameSource {
    clock: SystemClock,
    period: Duration,
    next_id: AtomicU64,
    tasks: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl IntervalFrameSource {
    /// Default refresh rate in Hz.
    pub const DEFAULT_REFRESH_RATE: f64 = 60.0;

    /// Shortest period between frames; `tokio::time::interval` rejects zero.
    pub const MIN_PERIOD: Duration = Duration::from_micros(1);

    /// Creates a source ticking `refresh_rate` times per second.
    ///
    /// Non-positive or non-finite rates fall back to the default; very high
    /// rates are capped at one frame per [`MIN_PERIOD`](Self::MIN_PERIOD).
    pub fn new(refresh_rate: f64) -> Self {
        let rate = if refresh_rate.is_finite() && refresh_rate > 0.0 {
            refresh_rate
        } else {
            Self::DEFAULT_REFRESH_RATE
        };
        Self {
            clock: SystemClock::new(),
            period: Duration::from_secs_f64(1.0 / rate).max(Self::MIN_PERIOD),
            next_id: AtomicU64::new(1),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Time between two frames.
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for IntervalFrameSource {
    fn default() -> Self {
        Self::new(Self::DEFAULT_REFRESH_RATE)
    }
}

impl Clock for IntervalFrameSource {
    fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }
}

impl FrameSource for IntervalFrameSource {
    fn request_frames(&self, mut callback: FrameCallback) -> FrameHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = FrameHandle::new(id);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::error!("IntervalFrameSource needs a tokio runtime; no frames will be delivered.");
            return handle;
        };

        let clock = self.clock;
        let period = self.period;
        let task = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                callback(clock.now_ms());
            }
        });
        lock(&self.tasks).insert(id, task);
        log::trace!("Frame subscription {id} started ({:?} period).", period);
        handle
    }

    fn cancel_frames(&self, handle: FrameHandle) {
        if let Some(task) = lock(&self.tasks).remove(&handle.raw()) {
            task.abort();
            log::trace!("Frame subscription {} cancelled.", handle.raw());
        }
    }
}

impl Drop for IntervalFrameSource {
    fn drop(&mut self) {
        for (_, task) in lock(&self.tasks).drain() {
            task.abort();
        }
    }
}

type SharedCallback = Arc<Mutex<FrameCallback>>;

/// A frame source that only produces frames when [`advance`](Self::advance)d.
#[derive(Default)]
pub struct ManualFrameSource {
    clock: ManualClock,
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, SharedCallback)>>,
}

impl ManualFrameSource {
    /// Creates a source whose clock reads zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The clock driving the timestamps; clones share the time.
    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    /// Moves time forward by `delta_ms` and delivers one frame to every subscriber.
    ///
    /// Returns the new timestamp.
    pub fn advance(&self, delta_ms: f64) -> f64 {
        let now = self.clock.advance(delta_ms);
        // Snapshot so callbacks may cancel or subscribe while being called.
        let snapshot: Vec<(u64, SharedCallback)> = lock(&self.callbacks).clone();
        for (id, callback) in snapshot {
            let still_active = lock(&self.callbacks).iter().any(|(live, _)| *live == id);
            if still_active {
                let mut deliver = lock(&callback);
                (*deliver)(now);
            }
        }
        now
    }

    /// Number of live subscriptions.
    pub fn active_callbacks(&self) -> usize {
        lock(&self.callbacks).len()
    }
}

impl std::fmt::Debug for ManualFrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualFrameSource")
            .field("now_ms", &self.clock.now_ms())
            .field("active_callbacks", &self.active_callbacks())
            .finish()
    }
}

impl Clock for ManualFrameSource {
    fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }
}

impl FrameSource for ManualFrameSource {
    fn request_frames(&self, callback: FrameCallback) -> FrameHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        lock(&self.callbacks).push((id, Arc::new(Mutex::new(callback))));
        FrameHandle::new(id)
    }

    fn cancel_frames(&self, handle: FrameHandle) {
        lock(&self.callbacks).retain(|(id, _)| *id != handle.raw());
    }
}
