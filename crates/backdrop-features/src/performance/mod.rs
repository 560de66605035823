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

//! Adaptive performance: frame-rate monitoring, GPU and battery awareness, and
//! automatic quality adjustment.

mod config;

pub use self::config::{PerformanceConfig, PerformanceState};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use async_trait::async_trait;
use backdrop_control::{AdaptiveQuality, AdaptiveQualityConfig};
use backdrop_core::event::payload;
use backdrop_core::platform::{
    BatterySource, BatteryStatus, Clock, FrameSource, GpuCapabilities, GpuSource, MemorySource,
};
use backdrop_core::quality::{QualityLevel, QualitySettings};
use backdrop_core::telemetry::PerformanceMetrics;
use backdrop_core::{EventBus, Feature, FeatureContext, Payload};
use backdrop_infra::{NoBattery, NoGpu};
use backdrop_telemetry::battery::LOW_BATTERY_THRESHOLD;
use backdrop_telemetry::{BatteryMonitor, FrameSampler, PerformanceMonitor};
use serde::Serialize;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reads time from the frame source so the controller's debounce follows the
/// same timeline as the samples.
struct FrameClock(Arc<dyn FrameSource>);

impl Clock for FrameClock {
    fn now_ms(&self) -> f64 {
        self.0.now_ms()
    }
}

#[derive(Serialize)]
struct QualityChange<'a> {
    quality: QualityLevel,
    settings: &'a QualitySettings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Initialized<'a> {
    gpu_capabilities: Option<&'a GpuCapabilities>,
    battery_supported: bool,
    config: &'a PerformanceConfig,
}

// Lock order: quality before state and outbox. The change callback runs while
// the controller is locked, so it only queues its events in the outbox.
#[derive(Clone)]
struct Shared {
    quality: Arc<Mutex<AdaptiveQuality>>,
    state: Arc<Mutex<PerformanceState>>,
    outbox: Arc<Mutex<Vec<Payload>>>,
}

impl Shared {
    fn force_quality(&self, level: QualityLevel) {
        let mut quality = lock(&self.quality);
        quality.set_quality(level);
        lock(&self.state).current_quality = quality.current_quality();
    }

    /// Publishes the quality changes queued since the last call. Must not be
    /// called with the controller locked.
    fn publish_quality_changes(&self, bus: &EventBus) {
        let pending = std::mem::take(&mut *lock(&self.outbox));
        for change in pending {
            bus.publish_detached("performance:quality-changed", change);
        }
    }
}

/// Keeps the frame rate near its target by adjusting the quality level.
///
/// Publishes under `performance:*`: `initialized`, `metrics`, `quality-changed`,
/// `battery-low`, `paused`, `resumed` and `destroyed`.
pub struct PerformanceFeature {
    config: PerformanceConfig,
    frames: Arc<dyn FrameSource>,
    gpu: Arc<dyn GpuSource>,
    battery_source: Arc<dyn BatterySource>,
    memory: Option<Arc<dyn MemorySource>>,
    shared: Shared,
    monitor: Option<PerformanceMonitor>,
    battery: Option<BatteryMonitor>,
    bus: Option<EventBus>,
}

impl PerformanceFeature {
    /// The registration name.
    pub const NAME: &'static str = "performance";

    /// Creates the feature sampling `frames`, with no GPU and no battery
    /// information until providers are attached.
    pub fn new(frames: Arc<dyn FrameSource>) -> Self {
        let config = PerformanceConfig::default();
        let quality = Self::controller(&config, &frames);
        Self {
            config,
            frames,
            gpu: Arc::new(NoGpu),
            battery_source: Arc::new(NoBattery),
            memory: None,
            shared: Shared {
                quality: Arc::new(Mutex::new(quality)),
                state: Arc::new(Mutex::new(PerformanceState::default())),
                outbox: Arc::new(Mutex::new(Vec::new())),
            },
            monitor: None,
            battery: None,
            bus: None,
        }
    }

    /// Attaches the GPU provider.
    pub fn with_gpu(mut self, gpu: Arc<dyn GpuSource>) -> Self {
        self.gpu = gpu;
        self
    }

    /// Attaches the battery provider.
    pub fn with_battery(mut self, battery: Arc<dyn BatterySource>) -> Self {
        self.battery_source = battery;
        self
    }

    /// Attaches a memory-pressure provider reported with every sample.
    pub fn with_memory(mut self, memory: Arc<dyn MemorySource>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Replaces the configuration. A configuration section given at
    /// initialization is overlaid on top of it.
    pub fn with_config(mut self, config: PerformanceConfig) -> Self {
        self.reconfigure(config);
        self
    }

    /// The effective configuration.
    pub fn config(&self) -> &PerformanceConfig {
        &self.config
    }

    /// A copy of the current state.
    pub fn state(&self) -> PerformanceState {
        lock(&self.shared.state).clone()
    }

    /// The active quality level.
    pub fn current_quality(&self) -> QualityLevel {
        lock(&self.shared.quality).current_quality()
    }

    /// Forces `level`. A `performance:quality-changed` event follows when
    /// adaptive quality is enabled and the level actually changes.
    pub fn set_quality(&self, level: QualityLevel) {
        self.shared.force_quality(level);
        if let Some(bus) = &self.bus {
            self.shared.publish_quality_changes(bus);
        }
    }

    /// The detected adapter, once initialized.
    pub fn gpu_capabilities(&self) -> Option<GpuCapabilities> {
        lock(&self.shared.state).gpu_capabilities.clone()
    }

    /// Whether the frame-rate monitor is running.
    pub fn is_monitoring(&self) -> bool {
        self.monitor.as_ref().is_some_and(PerformanceMonitor::is_running)
    }

    /// Host-signalled visibility of the view.
    ///
    /// Honoured only when `pause_on_hidden` is set: a hidden view suspends
    /// adaptation and publishes `performance:paused`, a visible one resumes it
    /// and publishes `performance:resumed`.
    pub async fn set_visibility(&self, visible: bool) {
        if !self.config.pause_on_hidden {
            return;
        }
        {
            let mut state = lock(&self.shared.state);
            state.is_tab_visible = visible;
            state.is_paused = !visible;
        }
        let Some(bus) = &self.bus else {
            return;
        };
        let topic = if visible {
            "performance:resumed"
        } else {
            "performance:paused"
        };
        log::debug!("View visibility changed: {topic}");
        bus.publish(topic, Payload::Null).await;
    }

    fn controller(config: &PerformanceConfig, frames: &Arc<dyn FrameSource>) -> AdaptiveQuality {
        let clock: Arc<dyn Clock> = Arc::new(FrameClock(Arc::clone(frames)));
        let controller = AdaptiveQuality::new(
            AdaptiveQualityConfig {
                target_fps: config.target_fps,
                ..AdaptiveQualityConfig::default()
            },
            clock,
        );
        match &config.quality_levels {
            Some(profile) => controller.with_profile(profile.clone()),
            None => controller,
        }
    }

    fn reconfigure(&mut self, config: PerformanceConfig) {
        *lock(&self.shared.quality) = Self::controller(&config, &self.frames);
        lock(&self.shared.state).current_quality = QualityLevel::High;
        self.config = config;
    }

    fn detect_gpu(&self) -> Option<GpuCapabilities> {
        let capabilities = self.gpu.detect()?;
        log::info!(
            "GPU detected: {} ({}), tier {:?}",
            capabilities.renderer,
            capabilities.vendor,
            capabilities.tier
        );
        // No change callback is installed yet, so the initial level is silent.
        let level = QualityLevel::from(capabilities.tier);
        let mut quality = lock(&self.shared.quality);
        quality.set_quality(level);
        let mut state = lock(&self.shared.state);
        state.current_quality = quality.current_quality();
        state.gpu_capabilities = Some(capabilities.clone());
        Some(capabilities)
    }

    fn start_battery(&mut self, bus: &EventBus) -> bool {
        let monitor = BatteryMonitor::new(Arc::clone(&self.battery_source));
        let supported = monitor.init();
        lock(&self.shared.state).battery_status = monitor.status();

        let state = Arc::clone(&self.shared.state);
        monitor.on_change(Arc::new(move |status: &BatteryStatus| {
            lock(&state).battery_status = Some(*status);
        }));

        let shared = self.shared.clone();
        let low_bus = bus.clone();
        let on_low = Arc::new(move |status: &BatteryStatus| {
            log::info!("Low battery detected, reducing quality.");
            shared.force_quality(QualityLevel::Low);
            shared.publish_quality_changes(&low_bus);
            low_bus.publish_detached("performance:battery-low", payload(status));
        });
        monitor.on_low(on_low.clone());

        if monitor.is_low_battery(LOW_BATTERY_THRESHOLD) {
            if let Some(status) = monitor.status() {
                on_low(&status);
            }
        }

        self.battery = Some(monitor);
        supported
    }

    fn install_quality_callback(&self) {
        let state = Arc::clone(&self.shared.state);
        let outbox = Arc::clone(&self.shared.outbox);
        lock(&self.shared.quality).on_change(Box::new(move |level: QualityLevel, settings: &QualitySettings| {
            lock(&state).current_quality = level;
            lock(&outbox).push(payload(&QualityChange {
                quality: level,
                settings,
            }));
        }));
    }

    fn start_monitor(&mut self, bus: &EventBus) {
        let mut sampler = FrameSampler::new(FrameSampler::DEFAULT_HISTORY, self.frames.now_ms());
        if let Some(memory) = &self.memory {
            sampler = sampler.with_memory_source(Arc::clone(memory));
        }
        let monitor = PerformanceMonitor::with_sampler(Arc::clone(&self.frames), sampler);

        let shared = self.shared.clone();
        let bus = bus.clone();
        let adaptive = self.config.adaptive_quality;
        let show_stats = self.config.show_stats;
        monitor.start(Box::new(move |metrics: &PerformanceMetrics| {
            let paused = {
                let mut state = lock(&shared.state);
                state.metrics = *metrics;
                state.is_paused
            };
            bus.publish_detached("performance:metrics", payload(metrics));

            if adaptive && !paused {
                lock(&shared.quality).process_metrics(metrics);
                shared.publish_quality_changes(&bus);
            }

            if show_stats {
                let quality = lock(&shared.state).current_quality;
                let memory = metrics
                    .memory_usage
                    .map(|ratio| format!(" | mem {:.1}%", ratio * 100.0))
                    .unwrap_or_default();
                log::info!(
                    "fps {:.1} | avg {:.1} | min {:.1} | max {:.1} | quality {quality}{memory}",
                    metrics.fps,
                    metrics.avg_fps,
                    metrics.min_fps,
                    metrics.max_fps,
                );
            }
        }));
        self.monitor = Some(monitor);
    }
}

#[async_trait]
impl Feature for PerformanceFeature {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn version(&self) -> Option<&str> {
        Some("1.0.0")
    }

    async fn init(&mut self, context: &FeatureContext) -> anyhow::Result<()> {
        if !context.config.is_empty() {
            let config = context
                .config
                .clone()
                .with_alias(PerformanceConfig::TARGET_FPS_ALIAS, "targetFps")
                .apply_to(&self.config)
                .context("Invalid performance configuration")?;
            self.reconfigure(config);
        }
        let bus = context.event_bus.clone();
        self.bus = Some(bus.clone());

        if !self.config.enabled {
            log::info!("Performance feature is disabled by configuration.");
            return Ok(());
        }

        let gpu = self.detect_gpu();
        let battery_supported = if self.config.battery_aware {
            self.start_battery(&bus)
        } else {
            false
        };
        if self.config.adaptive_quality {
            self.install_quality_callback();
        }
        self.start_monitor(&bus);

        log::info!(
            "Performance feature initialized at {} quality (target {} fps).",
            self.current_quality(),
            self.config.target_fps
        );
        let initialized = payload(&Initialized {
            gpu_capabilities: gpu.as_ref(),
            battery_supported,
            config: &self.config,
        });
        bus.publish("performance:initialized", initialized).await;
        Ok(())
    }

    async fn destroy(&mut self) -> anyhow::Result<()> {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
        if let Some(battery) = self.battery.take() {
            battery.destroy();
        }
        if let Some(bus) = self.bus.take() {
            bus.publish("performance:destroyed", Payload::Null).await;
            log::info!("Performance feature destroyed.");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdrop_core::{FeatureConfig, Handler};
    use backdrop_infra::{FixedBattery, ManualFrameSource, ReportedGpuSource};
    use serde_json::json;

    type Seen = Arc<Mutex<Vec<(String, Payload)>>>;

    fn record(bus: &EventBus, seen: &Seen, topic: &str) {
        let seen = Arc::clone(seen);
        let name = topic.to_owned();
        bus.subscribe(
            topic,
            Handler::sync(move |data| {
                seen.lock().unwrap().push((name.clone(), data.clone()));
                Ok(())
            }),
        );
    }

    fn topics(seen: &Seen) -> Vec<String> {
        seen.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    async fn drain() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    // Four frames every 100 ms: one 40 fps sample per call.
    fn run_at_40_fps(frames: &ManualFrameSource, samples: usize) {
        for _ in 0..samples * 4 {
            frames.advance(25.0);
        }
    }

    #[tokio::test]
    async fn gpu_tier_sets_the_initial_quality_silently() {
        let frames = Arc::new(ManualFrameSource::new());
        let mut feature = PerformanceFeature::new(frames.clone())
            .with_gpu(Arc::new(ReportedGpuSource::new("Intel Iris Xe", "Intel", 8192, false)));
        let bus = EventBus::new();
        let seen = Seen::default();
        record(&bus, &seen, "performance:initialized");
        record(&bus, &seen, "performance:quality-changed");

        feature.init(&FeatureContext::new(bus.clone())).await.unwrap();
        drain().await;

        assert_eq!(feature.current_quality(), QualityLevel::Medium);
        assert_eq!(feature.state().current_quality, QualityLevel::Medium);
        assert_eq!(topics(&seen), vec!["performance:initialized"]);
        let initialized = seen.lock().unwrap()[0].1.clone();
        assert_eq!(initialized["gpuCapabilities"]["tier"], "medium");
        assert_eq!(initialized["batterySupported"], false);
        assert_eq!(initialized["config"]["targetFps"], 60.0);
        assert!(feature.is_monitoring());
    }

    #[tokio::test]
    async fn slow_frames_lower_the_quality() {
        let frames = Arc::new(ManualFrameSource::new());
        let mut feature = PerformanceFeature::new(frames.clone());
        let bus = EventBus::new();
        let seen = Seen::default();
        record(&bus, &seen, "performance:metrics");
        record(&bus, &seen, "performance:quality-changed");

        feature.init(&FeatureContext::new(bus.clone())).await.unwrap();
        run_at_40_fps(&frames, 1);
        drain().await;

        assert_eq!(
            topics(&seen),
            vec!["performance:metrics", "performance:quality-changed"]
        );
        let change = seen.lock().unwrap()[1].1.clone();
        assert_eq!(change["quality"], "low");
        assert_eq!(change["settings"]["particleCount"], 2000);

        let state = feature.state();
        assert_eq!(state.current_quality, QualityLevel::Low);
        assert_eq!(state.metrics.fps, 40.0);
    }

    #[tokio::test]
    async fn hidden_view_pauses_adaptation() {
        let frames = Arc::new(ManualFrameSource::new());
        let mut feature = PerformanceFeature::new(frames.clone());
        let bus = EventBus::new();
        let seen = Seen::default();
        record(&bus, &seen, "performance:paused");
        record(&bus, &seen, "performance:resumed");
        record(&bus, &seen, "performance:quality-changed");

        feature.init(&FeatureContext::new(bus.clone())).await.unwrap();
        feature.set_visibility(false).await;
        run_at_40_fps(&frames, 3);
        drain().await;

        assert_eq!(feature.current_quality(), QualityLevel::High);
        assert!(feature.state().is_paused);
        assert!(!feature.state().is_tab_visible);

        feature.set_visibility(true).await;
        run_at_40_fps(&frames, 1);
        drain().await;

        assert_eq!(feature.current_quality(), QualityLevel::Low);
        assert_eq!(
            topics(&seen),
            vec![
                "performance:paused",
                "performance:resumed",
                "performance:quality-changed"
            ]
        );
    }

    #[tokio::test]
    async fn visibility_is_ignored_without_pause_on_hidden() {
        let frames = Arc::new(ManualFrameSource::new());
        let mut feature = PerformanceFeature::new(frames.clone()).with_config(PerformanceConfig {
            pause_on_hidden: false,
            ..PerformanceConfig::default()
        });
        let bus = EventBus::new();
        let seen = Seen::default();
        record(&bus, &seen, "performance:paused");

        feature.init(&FeatureContext::new(bus.clone())).await.unwrap();
        feature.set_visibility(false).await;

        assert!(topics(&seen).is_empty());
        assert!(!feature.state().is_paused);
    }

    #[tokio::test]
    async fn low_battery_forces_low_quality() {
        let frames = Arc::new(ManualFrameSource::new());
        let battery = Arc::new(FixedBattery::new(BatteryStatus::new(0.9, false)));
        let mut feature = PerformanceFeature::new(frames.clone()).with_battery(battery.clone());
        let bus = EventBus::new();
        let seen = Seen::default();
        record(&bus, &seen, "performance:battery-low");
        record(&bus, &seen, "performance:initialized");

        feature.init(&FeatureContext::new(bus.clone())).await.unwrap();
        assert_eq!(feature.current_quality(), QualityLevel::High);
        assert_eq!(seen.lock().unwrap()[0].1["batterySupported"], true);

        battery.set(BatteryStatus::new(0.1, false));
        drain().await;

        assert_eq!(feature.current_quality(), QualityLevel::Low);
        assert_eq!(feature.state().battery_status.map(|s| s.level), Some(0.1));
        assert_eq!(
            topics(&seen),
            vec!["performance:initialized", "performance:battery-low"]
        );
    }

    #[tokio::test]
    async fn battery_already_low_at_init() {
        let frames = Arc::new(ManualFrameSource::new());
        let battery = Arc::new(FixedBattery::new(BatteryStatus::new(0.05, false)));
        let mut feature = PerformanceFeature::new(frames.clone()).with_battery(battery);
        let bus = EventBus::new();

        feature.init(&FeatureContext::new(bus)).await.unwrap();
        assert_eq!(feature.state().current_quality, QualityLevel::Low);
    }

    #[tokio::test]
    async fn config_section_overlays_the_defaults() {
        let frames = Arc::new(ManualFrameSource::new());
        let mut feature = PerformanceFeature::new(frames.clone());
        let context = FeatureContext::new(EventBus::new()).with_config(FeatureConfig::from_value(
            json!({ "targetFPS": 30, "adaptiveQuality": false }),
        ));

        feature.init(&context).await.unwrap();
        run_at_40_fps(&frames, 2);

        assert_eq!(feature.config().target_fps, 30.0);
        assert!(feature.config().battery_aware);
        assert_eq!(feature.current_quality(), QualityLevel::High);
    }

    #[tokio::test]
    async fn invalid_config_fails_init() {
        let frames = Arc::new(ManualFrameSource::new());
        let mut feature = PerformanceFeature::new(frames);
        let context = FeatureContext::new(EventBus::new())
            .with_config(FeatureConfig::from_value(json!({ "targetFps": "fast" })));

        assert!(feature.init(&context).await.is_err());
    }

    #[tokio::test]
    async fn disabled_feature_does_not_monitor() {
        let frames = Arc::new(ManualFrameSource::new());
        let mut feature = PerformanceFeature::new(frames.clone());
        let context = FeatureContext::new(EventBus::new())
            .with_config(FeatureConfig::new().with("enabled", false));

        feature.init(&context).await.unwrap();
        assert!(!feature.is_monitoring());
        assert_eq!(frames.active_callbacks(), 0);
    }

    #[tokio::test]
    async fn destroy_stops_everything_once() {
        let frames = Arc::new(ManualFrameSource::new());
        let battery = Arc::new(FixedBattery::new(BatteryStatus::new(0.8, true)));
        let mut feature = PerformanceFeature::new(frames.clone()).with_battery(battery.clone());
        let bus = EventBus::new();
        let seen = Seen::default();
        record(&bus, &seen, "performance:destroyed");

        feature.init(&FeatureContext::new(bus.clone())).await.unwrap();
        assert_eq!(frames.active_callbacks(), 1);
        assert!(battery.is_watched());

        feature.destroy().await.unwrap();
        feature.destroy().await.unwrap();

        assert_eq!(frames.active_callbacks(), 0);
        assert!(!battery.is_watched());
        assert_eq!(topics(&seen), vec!["performance:destroyed"]);
    }

    #[test]
    fn quality_handlers_may_read_the_level_without_a_runtime() {
        let frames = Arc::new(ManualFrameSource::new());
        let mut feature = PerformanceFeature::new(frames);
        let bus = EventBus::new();
        let quality = Arc::clone(&feature.shared.quality);
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        bus.subscribe(
            "performance:quality-changed",
            Handler::sync(move |data| {
                let current = lock(&quality).current_quality();
                sink.lock().unwrap().push((data["quality"].clone(), current));
                Ok(())
            }),
        );
        feature.install_quality_callback();
        feature.bus = Some(bus);

        feature.set_quality(QualityLevel::Low);

        assert_eq!(
            *observed.lock().unwrap(),
            vec![(json!("low"), QualityLevel::Low)]
        );
    }

    #[tokio::test]
    async fn manual_quality_updates_state() {
        let frames = Arc::new(ManualFrameSource::new());
        let feature = PerformanceFeature::new(frames);
        feature.set_quality(QualityLevel::Minimal);
        assert_eq!(feature.state().current_quality, QualityLevel::Minimal);
        assert!(feature.gpu_capabilities().is_none());
    }
}
