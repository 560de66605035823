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

//! Frame-rate driven quality selection with debounce.
//!
//! [`AdaptiveQuality`] keeps a short history of average frame rates and maps its
//! mean onto a [`QualityLevel`]. Transitions are rate limited: after one happens,
//! further automatic transitions wait for the adjustment delay to elapse.

use std::fmt;
use std::sync::Arc;

use backdrop_core::platform::Clock;
use backdrop_core::quality::{QualityLevel, QualityProfile, QualitySettings};
use backdrop_core::telemetry::PerformanceMetrics;
use serde::{Deserialize, Serialize};

use crate::metrics::RollingWindow;

/// Frame-rate floors for each quality level. Below `low` the level is minimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FpsThresholds {
    /// At or above this rate the level is high.
    pub high: f64,
    /// At or above this rate the level is medium.
    pub medium: f64,
    /// At or above this rate the level is low.
    pub low: f64,
}

impl Default for FpsThresholds {
    fn default() -> Self {
        Self {
            high: 58.0,
            medium: 45.0,
            low: 30.0,
        }
    }
}

impl FpsThresholds {
    /// The level a sustained rate of `fps` deserves.
    pub fn classify(&self, fps: f64) -> QualityLevel {
        if fps >= self.high {
            QualityLevel::High
        } else if fps >= self.medium {
            QualityLevel::Medium
        } else if fps >= self.low {
            QualityLevel::Low
        } else {
            QualityLevel::Minimal
        }
    }
}

/// Configuration for [`AdaptiveQuality`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdaptiveQualityConfig {
    /// The frame rate the host aims for.
    pub target_fps: f64,
    /// Minimum time between two automatic transitions, in milliseconds.
    pub adjustment_delay_ms: f64,
    /// Level floors.
    pub fps_threshold: FpsThresholds,
    /// Number of average-fps samples the decision is based on.
    pub history_size: usize,
}

impl Default for AdaptiveQualityConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            adjustment_delay_ms: 200.0,
            fps_threshold: FpsThresholds::default(),
            history_size: 10,
        }
    }
}

/// Invoked with the new level and its settings whenever the level changes.
pub type QualityChangeCallback = Box<dyn FnMut(QualityLevel, &QualitySettings) + Send>;

/// The closed-loop quality controller.
pub struct AdaptiveQuality {
    config: AdaptiveQualityConfig,
    current: QualityLevel,
    history: RollingWindow,
    last_transition: Option<f64>,
    profile: QualityProfile,
    clock: Arc<dyn Clock>,
    on_change: Option<QualityChangeCallback>,
}

impl AdaptiveQuality {
    /// Creates a controller at [`QualityLevel::High`] with the default bundles.
    pub fn new(config: AdaptiveQualityConfig, clock: Arc<dyn Clock>) -> Self {
        let history = RollingWindow::new(config.history_size);
        Self {
            config,
            current: QualityLevel::High,
            history,
            last_transition: None,
            profile: QualityProfile::default(),
            clock,
            on_change: None,
        }
    }

    /// Replaces the settings bundles.
    pub fn with_profile(mut self, profile: QualityProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Feeds one metrics snapshot into the controller.
    ///
    /// Returns the new level when this call caused a transition.
    pub fn process_metrics(&mut self, metrics: &PerformanceMetrics) -> Option<QualityLevel> {
        let now = self.clock.now_ms();
        self.history.push(metrics.avg_fps);

        if let Some(last) = self.last_transition {
            if now - last < self.config.adjustment_delay_ms {
                return None;
            }
        }

        let mean = self.history.average();
        let target = self.config.fps_threshold.classify(mean);
        log::trace!("Adaptive quality: mean fps {mean:.1} suggests {target}");

        if target == self.current {
            return None;
        }
        self.transition(target);
        self.last_transition = Some(now);
        Some(target)
    }

    /// Forces `level` immediately.
    ///
    /// The change callback fires if the level actually changes. The debounce window
    /// is left untouched.
    pub fn set_quality(&mut self, level: QualityLevel) {
        if level != self.current {
            self.transition(level);
        }
    }

    /// The current level.
    pub fn current_quality(&self) -> QualityLevel {
        self.current
    }

    /// The settings bundle for `level`.
    pub fn settings(&self, level: QualityLevel) -> &QualitySettings {
        self.profile.get(level)
    }

    /// The settings bundle for the current level.
    pub fn current_settings(&self) -> &QualitySettings {
        self.profile.get(self.current)
    }

    /// Customizes the bundle for `level`.
    pub fn update_settings(&mut self, level: QualityLevel, update: impl FnOnce(&mut QualitySettings)) {
        update(self.profile.get_mut(level));
    }

    /// Installs the change callback, replacing any previous one.
    pub fn on_change(&mut self, callback: QualityChangeCallback) {
        self.on_change = Some(callback);
    }

    /// Returns to [`QualityLevel::High`] with an empty history and no debounce.
    ///
    /// The change callback is not invoked.
    pub fn reset(&mut self) {
        self.current = QualityLevel::High;
        self.history.clear();
        self.last_transition = None;
    }

    /// The active configuration.
    pub fn config(&self) -> &AdaptiveQualityConfig {
        &self.config
    }

    /// Mean of the stored average-fps samples.
    pub fn history_mean(&self) -> Option<f64> {
        (!self.history.is_empty()).then(|| self.history.average())
    }

    fn transition(&mut self, target: QualityLevel) {
        let previous = self.current;
        self.current = target;
        log::info!("Quality adjusted: {previous} -> {target}");

        let settings = self.profile.get(target);
        if let Some(callback) = self.on_change.as_mut() {
            callback(target, settings);
        }
    }
}

impl fmt::Debug for AdaptiveQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveQuality")
            .field("config", &self.config)
            .field("current", &self.current)
            .field("history", &self.history)
            .field("last_transition", &self.last_transition)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdrop_core::platform::ManualClock;
    use backdrop_core::quality::ShadowQuality;
    use std::sync::Mutex;

    fn controller(clock: &ManualClock) -> AdaptiveQuality {
        AdaptiveQuality::new(AdaptiveQualityConfig::default(), Arc::new(clock.clone()))
    }

    fn sample(avg_fps: f64) -> PerformanceMetrics {
        PerformanceMetrics {
            avg_fps,
            ..PerformanceMetrics::default()
        }
    }

    fn recorder(aq: &mut AdaptiveQuality) -> Arc<Mutex<Vec<QualityLevel>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        aq.on_change(Box::new(move |level, _| sink.lock().unwrap().push(level)));
        seen
    }

    #[test]
    fn thresholds_classify_inclusively() {
        let t = FpsThresholds::default();
        assert_eq!(t.classify(58.0), QualityLevel::High);
        assert_eq!(t.classify(57.9), QualityLevel::Medium);
        assert_eq!(t.classify(45.0), QualityLevel::Medium);
        assert_eq!(t.classify(30.0), QualityLevel::Low);
        assert_eq!(t.classify(29.9), QualityLevel::Minimal);
    }

    #[test]
    fn steady_thirty_fps_settles_on_low() {
        let clock = ManualClock::new(0.0);
        let mut aq = controller(&clock);
        let seen = recorder(&mut aq);

        for _ in 0..25 {
            aq.process_metrics(&sample(30.0));
            assert_eq!(aq.current_quality(), QualityLevel::Low);
            clock.advance(250.0);
        }
        assert_eq!(*seen.lock().unwrap(), vec![QualityLevel::Low]);
    }

    #[test]
    fn transitions_are_debounced() {
        let clock = ManualClock::new(1_000.0);
        let mut aq = controller(&clock);

        assert_eq!(aq.process_metrics(&sample(50.0)), Some(QualityLevel::Medium));

        // Mean (50 + 35) / 2 = 42.5 qualifies for low, but only 50 ms passed.
        clock.advance(50.0);
        assert_eq!(aq.process_metrics(&sample(35.0)), None);
        assert_eq!(aq.current_quality(), QualityLevel::Medium);

        // 200 ms after the first transition: mean (50 + 35 + 35) / 3 = 40.
        clock.set(1_200.0);
        assert_eq!(aq.process_metrics(&sample(35.0)), Some(QualityLevel::Low));
    }

    #[test]
    fn unchanged_level_does_not_notify() {
        let clock = ManualClock::new(0.0);
        let mut aq = controller(&clock);
        let seen = recorder(&mut aq);

        assert_eq!(aq.process_metrics(&sample(60.0)), None);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn history_is_bounded() {
        let clock = ManualClock::new(0.0);
        let mut aq = AdaptiveQuality::new(
            AdaptiveQualityConfig {
                history_size: 2,
                adjustment_delay_ms: 0.0,
                ..AdaptiveQualityConfig::default()
            },
            Arc::new(clock.clone()),
        );

        aq.process_metrics(&sample(10.0));
        assert_eq!(aq.current_quality(), QualityLevel::Minimal);
        aq.process_metrics(&sample(60.0));
        assert_eq!(aq.current_quality(), QualityLevel::Low);
        // The 10 fps sample has been evicted.
        aq.process_metrics(&sample(60.0));
        assert_eq!(aq.current_quality(), QualityLevel::High);
        assert_eq!(aq.history_mean(), Some(60.0));
    }

    #[test]
    fn manual_override_leaves_debounce_alone() {
        let clock = ManualClock::new(0.0);
        let mut aq = controller(&clock);
        let seen = recorder(&mut aq);

        aq.set_quality(QualityLevel::Minimal);
        aq.set_quality(QualityLevel::Minimal);
        assert_eq!(*seen.lock().unwrap(), vec![QualityLevel::Minimal]);

        // No automatic transition happened yet, so nothing is debounced.
        assert_eq!(aq.process_metrics(&sample(60.0)), Some(QualityLevel::High));
    }

    #[test]
    fn reset_clears_state() {
        let clock = ManualClock::new(0.0);
        let mut aq = controller(&clock);
        aq.process_metrics(&sample(20.0));
        assert_eq!(aq.current_quality(), QualityLevel::Minimal);

        aq.reset();
        assert_eq!(aq.current_quality(), QualityLevel::High);
        assert_eq!(aq.history_mean(), None);
        // Debounce cleared: an immediate transition is allowed.
        assert_eq!(aq.process_metrics(&sample(40.0)), Some(QualityLevel::Low));
    }

    #[test]
    fn callback_receives_the_bundle() {
        let clock = ManualClock::new(0.0);
        let mut aq = controller(&clock);
        aq.update_settings(QualityLevel::Low, |s| s.particle_count = 42);

        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        aq.on_change(Box::new(move |level, settings| {
            *sink.lock().unwrap() = Some((level, *settings));
        }));
        aq.set_quality(QualityLevel::Low);

        let (level, settings) = seen.lock().unwrap().unwrap();
        assert_eq!(level, QualityLevel::Low);
        assert_eq!(settings.particle_count, 42);
        assert_eq!(settings.shadow_quality, ShadowQuality::Low);
        assert_eq!(aq.settings(QualityLevel::High).particle_count, 10_000);
    }

    #[test]
    fn config_deserializes_partially() {
        let config: AdaptiveQualityConfig =
            serde_json::from_str(r#"{ "adjustmentDelayMs": 500, "fpsThreshold": { "low": 20 } }"#)
                .unwrap();
        assert_eq!(config.adjustment_delay_ms, 500.0);
        assert_eq!(config.fps_threshold.low, 20.0);
        assert_eq!(config.fps_threshold.high, 58.0);
        assert_eq!(config.history_size, 10);
    }
}
