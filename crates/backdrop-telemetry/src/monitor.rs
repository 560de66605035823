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

//! Frame-rate sampling on top of the host's frame scheduler.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use backdrop_control::RollingWindow;
use backdrop_core::platform::{FrameHandle, FrameSource, MemorySource};
use backdrop_core::telemetry::PerformanceMetrics;

/// Frame rate reported before the first sample exists.
const NOMINAL_FPS: f64 = 60.0;

/// Turns per-frame timestamps into rolling frame-rate statistics.
///
/// This is the pure core of [`PerformanceMonitor`]: it owns no scheduler and can be
/// driven by hand.
pub struct FrameSampler {
    frame_count: u32,
    last_sample: f64,
    history: RollingWindow,
    memory: Option<Arc<dyn MemorySource>>,
}

impl FrameSampler {
    /// Minimum time between two samples, in milliseconds.
    pub const SAMPLE_INTERVAL_MS: f64 = 100.0;

    /// Default number of fps samples kept.
    pub const DEFAULT_HISTORY: usize = 60;

    /// Creates a sampler whose first interval starts at `start_ms`.
    pub fn new(history_capacity: usize, start_ms: f64) -> Self {
        Self {
            frame_count: 0,
            last_sample: start_ms,
            history: RollingWindow::new(history_capacity),
            memory: None,
        }
    }

    /// Attaches a memory-pressure source reported with every snapshot.
    pub fn with_memory_source(mut self, memory: Arc<dyn MemorySource>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Forgets every sample and starts a new interval at `now_ms`.
    pub fn reset(&mut self, now_ms: f64) {
        self.frame_count = 0;
        self.last_sample = now_ms;
        self.history.clear();
    }

    /// Records one displayed frame.
    ///
    /// Once at least [`SAMPLE_INTERVAL_MS`](Self::SAMPLE_INTERVAL_MS) elapsed since
    /// the last sample, computes the frame rate over that interval, stores it and
    /// returns a snapshot.
    pub fn tick(&mut self, now_ms: f64) -> Option<PerformanceMetrics> {
        self.frame_count += 1;
        let elapsed = now_ms - self.last_sample;
        if elapsed < Self::SAMPLE_INTERVAL_MS {
            return None;
        }

        let fps = (f64::from(self.frame_count) / elapsed * 1000.0).round();
        self.history.push(fps);
        self.frame_count = 0;
        self.last_sample = now_ms;

        let metrics = self.metrics(now_ms);
        log::trace!("Frame sample: {} fps (avg {})", metrics.fps, metrics.avg_fps);
        Some(metrics)
    }

    /// A snapshot of the current statistics, stamped `now_ms`.
    pub fn metrics(&self, now_ms: f64) -> PerformanceMetrics {
        let fps = self.current_fps();
        PerformanceMetrics {
            fps,
            avg_fps: self.average_fps(),
            min_fps: self.history.min().map_or(fps, |min| min.min(fps)),
            max_fps: self.history.max().map_or(fps, |max| max.max(fps)),
            frame_time: if fps > 0.0 { 1000.0 / fps } else { 0.0 },
            memory_usage: self.memory.as_ref().and_then(|m| m.memory_pressure()),
            timestamp: now_ms,
        }
    }

    /// The latest sample, or the nominal 60 fps before the first one.
    pub fn current_fps(&self) -> f64 {
        self.history.last().unwrap_or(NOMINAL_FPS)
    }

    /// The rounded mean of the history, or the nominal 60 fps when empty.
    pub fn average_fps(&self) -> f64 {
        if self.history.is_empty() {
            return NOMINAL_FPS;
        }
        self.history.average().round()
    }

    /// Whether the average frame rate is below `threshold`.
    pub fn is_degraded(&self, threshold: f64) -> bool {
        self.average_fps() < threshold
    }

    /// Number of stored samples.
    pub fn sample_count(&self) -> usize {
        self.history.len()
    }
}

impl fmt::Debug for FrameSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSampler")
            .field("frame_count", &self.frame_count)
            .field("last_sample", &self.last_sample)
            .field("history", &self.history)
            .field("memory", &self.memory.is_some())
            .finish()
    }
}

/// Callback receiving each new metrics snapshot.
pub type MetricsCallback = Box<dyn FnMut(&PerformanceMetrics) + Send>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Samples the frame rate of a [`FrameSource`] and reports it to a callback.
pub struct PerformanceMonitor {
    source: Arc<dyn FrameSource>,
    sampler: Arc<Mutex<FrameSampler>>,
    handle: Mutex<Option<FrameHandle>>,
}

impl PerformanceMonitor {
    /// Creates a stopped monitor keeping `history_capacity` samples.
    pub fn new(source: Arc<dyn FrameSource>, history_capacity: usize) -> Self {
        let sampler = FrameSampler::new(history_capacity, source.now_ms());
        Self::with_sampler(source, sampler)
    }

    /// Creates a stopped monitor around a preconfigured sampler.
    pub fn with_sampler(source: Arc<dyn FrameSource>, sampler: FrameSampler) -> Self {
        Self {
            source,
            sampler: Arc::new(Mutex::new(sampler)),
            handle: Mutex::new(None),
        }
    }

    /// Starts sampling, replacing any running session.
    ///
    /// The history is cleared. `callback` runs on the frame source's context each
    /// time a sample completes.
    pub fn start(&self, mut callback: MetricsCallback) {
        self.stop();
        lock(&self.sampler).reset(self.source.now_ms());

        let sampler = Arc::clone(&self.sampler);
        let handle = self.source.request_frames(Box::new(move |timestamp| {
            let sample = lock(&sampler).tick(timestamp);
            if let Some(metrics) = sample {
                callback(&metrics);
            }
        }));
        *lock(&self.handle) = Some(handle);
        log::debug!("Performance monitor started.");
    }

    /// Stops sampling and drops the callback. Calling this while stopped is a no-op.
    pub fn stop(&self) {
        let handle = lock(&self.handle).take();
        if let Some(handle) = handle {
            self.source.cancel_frames(handle);
            log::debug!("Performance monitor stopped.");
        }
    }

    /// Whether a sampling session is active.
    pub fn is_running(&self) -> bool {
        lock(&self.handle).is_some()
    }

    /// Statistics as of now.
    pub fn metrics(&self) -> PerformanceMetrics {
        let now = self.source.now_ms();
        lock(&self.sampler).metrics(now)
    }

    /// Whether the average frame rate is below `threshold` (50 by convention).
    pub fn is_performance_degraded(&self, threshold: f64) -> bool {
        lock(&self.sampler).is_degraded(threshold)
    }
}

impl Drop for PerformanceMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("sampler", &self.sampler)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdrop_infra::frame::ManualFrameSource;

    struct HalfFull;

    impl MemorySource for HalfFull {
        fn memory_pressure(&self) -> Option<f64> {
            Some(0.5)
        }
    }

    #[test]
    fn empty_sampler_reports_nominal_rate() {
        let sampler = FrameSampler::new(60, 0.0);
        let metrics = sampler.metrics(5.0);
        assert_eq!(metrics.fps, 60.0);
        assert_eq!(metrics.avg_fps, 60.0);
        assert_eq!(metrics.min_fps, 60.0);
        assert_eq!(metrics.max_fps, 60.0);
        assert_eq!(metrics.timestamp, 5.0);
        assert_eq!(metrics.memory_usage, None);
    }

    #[test]
    fn sample_is_emitted_after_the_interval() {
        let mut sampler = FrameSampler::new(60, 0.0);
        // Six frames every ~16.7 ms reach 100 ms on the sixth.
        for i in 1..6 {
            assert!(sampler.tick(i as f64 * 16.7).is_none());
        }
        let metrics = sampler.tick(100.2).expect("sample due");
        assert_eq!(metrics.fps, 60.0);
        assert!((metrics.frame_time - 1000.0 / 60.0).abs() < 1e-9);
        assert_eq!(sampler.sample_count(), 1);
    }

    #[test]
    fn frame_rate_is_rounded() {
        let mut sampler = FrameSampler::new(60, 0.0);
        sampler.tick(50.0);
        sampler.tick(75.0);
        // 3 frames over 120 ms = 25 fps.
        let metrics = sampler.tick(120.0).unwrap();
        assert_eq!(metrics.fps, 25.0);

        sampler.tick(250.0);
        // 1 frame over 130 ms = 7.69 -> 8 fps; mean (25 + 8) / 2 = 16.5 -> 17.
        let metrics = sampler.metrics(250.0);
        assert_eq!(metrics.fps, 8.0);
        assert_eq!(metrics.avg_fps, 17.0);
        assert_eq!(metrics.min_fps, 8.0);
        assert_eq!(metrics.max_fps, 25.0);
    }

    #[test]
    fn history_is_bounded() {
        let mut sampler = FrameSampler::new(2, 0.0);
        for i in 1..=5 {
            sampler.tick(i as f64 * 100.0);
        }
        assert_eq!(sampler.sample_count(), 2);
    }

    #[test]
    fn degradation_uses_the_average() {
        let mut sampler = FrameSampler::new(60, 0.0);
        assert!(!sampler.is_degraded(50.0));
        // One frame per 100 ms = 10 fps.
        sampler.tick(100.0);
        assert!(sampler.is_degraded(50.0));
    }

    #[test]
    fn memory_pressure_is_reported() {
        let sampler = FrameSampler::new(60, 0.0).with_memory_source(Arc::new(HalfFull));
        assert_eq!(sampler.metrics(0.0).memory_usage, Some(0.5));
    }

    #[test]
    fn monitor_reports_through_the_callback_until_stopped() {
        let source = Arc::new(ManualFrameSource::new());
        let monitor = PerformanceMonitor::new(source.clone(), 60);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        monitor.start(Box::new(move |metrics| sink.lock().unwrap().push(metrics.fps)));
        assert!(monitor.is_running());

        // 40 frames 25 ms apart: one second, one sample every 100 ms.
        for _ in 0..40 {
            source.advance(25.0);
        }
        let samples = seen.lock().unwrap().len();
        assert_eq!(samples, 10);
        assert!(seen.lock().unwrap().iter().all(|fps| *fps == 40.0));
        assert!(monitor.is_performance_degraded(50.0));

        monitor.stop();
        monitor.stop();
        assert!(!monitor.is_running());
        assert_eq!(source.active_callbacks(), 0);

        source.advance(500.0);
        assert_eq!(seen.lock().unwrap().len(), samples);
    }

    #[test]
    fn restarting_clears_history() {
        let source = Arc::new(ManualFrameSource::new());
        let monitor = PerformanceMonitor::new(source.clone(), 60);
        monitor.start(Box::new(|_| {}));
        for _ in 0..10 {
            source.advance(50.0);
        }
        assert_eq!(monitor.metrics().avg_fps, 20.0);

        monitor.start(Box::new(|_| {}));
        assert_eq!(source.active_callbacks(), 1);
        assert_eq!(monitor.metrics().avg_fps, 60.0);
    }
}
