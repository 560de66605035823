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

//! Pointer, scroll and touch tracking published onto the event bus.
//!
//! Raw input capture belongs to the host. It feeds samples through an
//! [`InteractionInput`] handle and the feature turns them into positions,
//! velocities, gestures and parallax offsets.

mod config;
mod gesture;
mod parallax;
mod pointer;
mod scroll;

pub use self::config::{InteractionConfig, MouseConfig, ScrollConfig, TouchConfig};
pub use self::gesture::{Gesture, GestureKind, GestureRecognizer, TouchPoint};
pub use self::parallax::{
    ease, from_pointer, from_scroll, velocity_effect, ParallaxConfig, PointerParallax,
    ScrollParallax,
};
pub use self::pointer::{PointerPosition, PointerTracker};
pub use self::scroll::{ScrollDirection, ScrollPosition, ScrollTracker};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use async_trait::async_trait;
use backdrop_core::event::payload;
use backdrop_core::platform::Clock;
use backdrop_core::{EventBus, Feature, FeatureContext, Payload};
use serde::Serialize;

const SCROLLING_WINDOW_MS: f64 = 150.0;
const TOUCHING_WINDOW_MS: f64 = 100.0;
const MOUSE_PARALLAX_STRENGTH: f64 = 0.5;
const SCROLL_PARALLAX_STRENGTH: f64 = 0.3;

/// Snapshot of the interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionState {
    /// Pointer tracking is running.
    pub is_mouse_active: bool,
    /// The page scrolled vertically within the last 150 ms.
    pub is_scrolling: bool,
    /// A gesture was recognized within the last 100 ms.
    pub is_touching: bool,
    /// Latest pointer sample.
    pub mouse: Option<PointerPosition>,
    /// Latest scroll sample.
    pub scroll: Option<ScrollPosition>,
    /// Latest recognized gesture.
    pub gesture: Option<Gesture>,
}

type Outbox = Vec<(String, Payload)>;

struct Tracking {
    active: bool,
    bus: Option<EventBus>,
    config: InteractionConfig,
    pointer: PointerTracker,
    scroll: ScrollTracker,
    gestures: GestureRecognizer,
    viewport: (f64, f64),
    scroll_extent: (f64, f64),
    last_scroll_at: Option<f64>,
    last_gesture: Option<Gesture>,
    last_gesture_at: Option<f64>,
}

impl Tracking {
    fn new(config: InteractionConfig) -> Self {
        Self {
            active: false,
            bus: None,
            pointer: PointerTracker::new(config.mouse.throttle),
            scroll: ScrollTracker::new(config.scroll.throttle),
            gestures: GestureRecognizer::new(config.touch.gestures.iter().copied()),
            config,
            viewport: (0.0, 0.0),
            scroll_extent: (0.0, 0.0),
            last_scroll_at: None,
            last_gesture: None,
            last_gesture_at: None,
        }
    }

    fn record_gestures(&mut self, gestures: Vec<Gesture>, now: f64, outbox: &mut Outbox) {
        for gesture in gestures {
            self.last_gesture = Some(gesture);
            self.last_gesture_at = Some(now);
            let data = payload(&gesture);
            outbox.push((format!("interactions:gesture:{}", gesture.kind), data.clone()));
            outbox.push(("interactions:gesture".to_owned(), data));
        }
    }
}

fn lock(tracking: &Mutex<Tracking>) -> MutexGuard<'_, Tracking> {
    tracking.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle through which the host feeds raw input samples.
///
/// Cheap to clone. Samples are ignored until the feature is initialized and
/// after it is destroyed.
#[derive(Clone)]
pub struct InteractionInput {
    tracking: Arc<Mutex<Tracking>>,
    clock: Arc<dyn Clock>,
}

impl InteractionInput {
    /// Sets the viewport size used to normalize pointer positions.
    pub fn set_viewport(&self, width: f64, height: f64) {
        lock(&self.tracking).viewport = (width, height);
    }

    /// Sets the maximum scroll offset on each axis.
    pub fn set_scroll_extent(&self, max_x: f64, max_y: f64) {
        lock(&self.tracking).scroll_extent = (max_x, max_y);
    }

    /// The pointer moved to (`x`, `y`) in viewport pixels.
    pub fn pointer_moved(&self, x: f64, y: f64) {
        self.track(|tracking, now, outbox| {
            if !tracking.config.mouse.enabled {
                return;
            }
            let Some(position) = tracking.pointer.update(x, y, tracking.viewport, now) else {
                return;
            };
            outbox.push(("interactions:mouse".to_owned(), payload(&position)));
            if tracking.config.mouse.parallax {
                let offset = from_pointer(
                    &position,
                    &ParallaxConfig::with_strength(MOUSE_PARALLAX_STRENGTH),
                );
                outbox.push(("interactions:parallax:mouse".to_owned(), payload(&offset)));
            }
        });
    }

    /// The pointer left the viewport.
    pub fn pointer_left(&self) {
        self.track(|tracking, _, outbox| {
            if !tracking.config.mouse.enabled {
                return;
            }
            if let Some(position) = tracking.pointer.leave() {
                outbox.push(("interactions:mouse".to_owned(), payload(&position)));
            }
        });
    }

    /// The page scrolled to offset (`x`, `y`).
    pub fn scrolled(&self, x: f64, y: f64) {
        self.track(|tracking, now, outbox| {
            if !tracking.config.scroll.enabled {
                return;
            }
            let Some(position) = tracking.scroll.update(x, y, tracking.scroll_extent, now) else {
                return;
            };
            tracking.last_scroll_at = Some(now);
            outbox.push(("interactions:scroll".to_owned(), payload(&position)));
            let offset = from_scroll(
                &position,
                &ParallaxConfig::with_strength(SCROLL_PARALLAX_STRENGTH),
            );
            outbox.push(("interactions:parallax:scroll".to_owned(), payload(&offset)));
        });
    }

    /// Fingers went down.
    pub fn touch_start(&self, touches: &[TouchPoint]) {
        self.track(|tracking, now, _| {
            if tracking.config.touch.enabled {
                tracking.gestures.touch_start(touches, now);
            }
        });
    }

    /// Fingers moved.
    pub fn touch_move(&self, touches: &[TouchPoint]) {
        self.track(|tracking, now, outbox| {
            if tracking.config.touch.enabled {
                let gestures = tracking.gestures.touch_move(touches, now);
                tracking.record_gestures(gestures, now, outbox);
            }
        });
    }

    /// Fingers lifted.
    pub fn touch_end(&self, touches: &[TouchPoint]) {
        self.track(|tracking, now, outbox| {
            if tracking.config.touch.enabled {
                let gestures = tracking.gestures.touch_end(touches, now);
                tracking.record_gestures(gestures, now, outbox);
            }
        });
    }

    /// The host cancelled every touch.
    pub fn touch_cancel(&self) {
        self.track(|tracking, _, _| tracking.gestures.touch_cancel());
    }

    // Runs `update` under the lock, then publishes what it queued once the
    // lock is released.
    fn track(&self, update: impl FnOnce(&mut Tracking, f64, &mut Outbox)) {
        let now = self.clock.now_ms();
        let mut outbox = Outbox::new();
        let bus = {
            let mut guard = lock(&self.tracking);
            if !guard.active {
                return;
            }
            update(&mut *guard, now, &mut outbox);
            guard.bus.clone()
        };
        if let Some(bus) = bus {
            for (topic, data) in outbox {
                bus.publish_detached(topic, data);
            }
        }
    }
}

/// Tracks user interactions and publishes them under `interactions:*`.
pub struct UserBehaviorFeature {
    input: InteractionInput,
}

impl UserBehaviorFeature {
    /// The registration name.
    pub const NAME: &'static str = "user-behavior";

    /// Creates the feature with the default configuration. `clock` timestamps
    /// every sample.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            input: InteractionInput {
                tracking: Arc::new(Mutex::new(Tracking::new(InteractionConfig::default()))),
                clock,
            },
        }
    }

    /// Replaces the configuration. A configuration section given at
    /// initialization is overlaid on top of it.
    pub fn with_config(self, config: InteractionConfig) -> Self {
        self.reconfigure(config);
        self
    }

    /// The handle the host feeds samples through.
    pub fn input(&self) -> InteractionInput {
        self.input.clone()
    }

    /// The effective configuration.
    pub fn config(&self) -> InteractionConfig {
        lock(&self.input.tracking).config.clone()
    }

    /// The current interaction state.
    pub fn state(&self) -> InteractionState {
        let now = self.input.clock.now_ms();
        let tracking = lock(&self.input.tracking);
        let recent = |at: Option<f64>, window: f64| at.is_some_and(|at| now - at < window);
        InteractionState {
            is_mouse_active: tracking.active && tracking.config.mouse.enabled,
            is_scrolling: recent(tracking.last_scroll_at, SCROLLING_WINDOW_MS)
                && tracking.scroll.position().is_some_and(|s| s.velocity_y != 0.0),
            is_touching: recent(tracking.last_gesture_at, TOUCHING_WINDOW_MS),
            mouse: tracking.pointer.position(),
            scroll: tracking.scroll.position(),
            gesture: tracking.last_gesture,
        }
    }

    /// The latest pointer sample.
    pub fn pointer_position(&self) -> Option<PointerPosition> {
        lock(&self.input.tracking).pointer.position()
    }

    /// The latest scroll sample.
    pub fn scroll_position(&self) -> Option<ScrollPosition> {
        lock(&self.input.tracking).scroll.position()
    }

    /// Parallax offset for the latest pointer sample.
    pub fn mouse_parallax(&self, config: &ParallaxConfig) -> Option<PointerParallax> {
        self.pointer_position()
            .map(|position| from_pointer(&position, config))
    }

    /// Parallax offset for the latest scroll sample.
    pub fn scroll_parallax(&self, config: &ParallaxConfig) -> Option<ScrollParallax> {
        self.scroll_position()
            .map(|position| from_scroll(&position, config))
    }

    fn reconfigure(&self, config: InteractionConfig) {
        let mut tracking = lock(&self.input.tracking);
        let fresh = Tracking::new(config);
        tracking.config = fresh.config;
        tracking.pointer = fresh.pointer;
        tracking.scroll = fresh.scroll;
        tracking.gestures = fresh.gestures;
    }
}

#[async_trait]
impl Feature for UserBehaviorFeature {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn version(&self) -> Option<&str> {
        Some("1.0.0")
    }

    async fn init(&mut self, context: &FeatureContext) -> anyhow::Result<()> {
        let config = context
            .config
            .apply_to(&self.config())
            .context("Invalid user-behavior configuration")?;
        self.reconfigure(config.clone());

        {
            let mut tracking = lock(&self.input.tracking);
            if let Some((width, height)) = context.mount_target.as_ref().and_then(|t| t.size()) {
                tracking.viewport = (width, height);
            }
            tracking.active = config.enabled;
            tracking.bus = Some(context.event_bus.clone());
        }

        if config.enabled {
            log::info!("User behavior tracking started.");
        } else {
            log::info!("User behavior tracking is disabled by configuration.");
        }

        context
            .event_bus
            .publish(
                "interactions:initialized",
                serde_json::json!({ "config": payload(&config) }),
            )
            .await;
        Ok(())
    }

    async fn destroy(&mut self) -> anyhow::Result<()> {
        let bus = {
            let mut tracking = lock(&self.input.tracking);
            tracking.active = false;
            tracking.gestures.touch_cancel();
            tracking.bus.take()
        };
        if let Some(bus) = bus {
            bus.publish("interactions:destroyed", Payload::Null).await;
            log::info!("User behavior tracking stopped.");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdrop_core::feature::MountTarget;
    use backdrop_core::platform::ManualClock;
    use backdrop_core::{FeatureConfig, Handler};
    use serde_json::json;

    struct Harness {
        bus: EventBus,
        clock: ManualClock,
        feature: UserBehaviorFeature,
        seen: Arc<Mutex<Vec<(String, Payload)>>>,
    }

    impl Harness {
        fn new() -> Self {
            let clock = ManualClock::new(0.0);
            Self {
                bus: EventBus::new(),
                feature: UserBehaviorFeature::new(Arc::new(clock.clone())),
                clock,
                seen: Arc::default(),
            }
        }

        fn record(&self, topic: &str) {
            let seen = Arc::clone(&self.seen);
            let name = topic.to_owned();
            self.bus.subscribe(
                topic,
                Handler::sync(move |data| {
                    seen.lock().unwrap().push((name.clone(), data.clone()));
                    Ok(())
                }),
            );
        }

        fn topics(&self) -> Vec<String> {
            self.seen.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
        }

        async fn init(&mut self, context: FeatureContext) {
            self.feature.init(&context).await.unwrap();
        }

        fn context(&self) -> FeatureContext {
            FeatureContext::new(self.bus.clone())
                .with_mount_target(MountTarget::new("hero").with_size(1000.0, 500.0))
        }
    }

    async fn drain() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn samples_before_init_are_ignored() {
        let harness = Harness::new();
        harness.record("interactions:mouse");
        harness.feature.input().pointer_moved(10.0, 10.0);
        drain().await;
        assert!(harness.topics().is_empty());
        assert!(harness.feature.pointer_position().is_none());
    }

    #[tokio::test]
    async fn pointer_samples_publish_position_and_parallax() {
        let mut harness = Harness::new();
        harness.record("interactions:initialized");
        harness.record("interactions:mouse");
        harness.record("interactions:parallax:mouse");
        let context = harness.context();
        harness.init(context).await;

        harness.feature.input().pointer_moved(1000.0, 250.0);
        drain().await;

        assert_eq!(
            harness.topics(),
            vec![
                "interactions:initialized",
                "interactions:mouse",
                "interactions:parallax:mouse"
            ]
        );
        let seen = harness.seen.lock().unwrap();
        assert_eq!(seen[1].1["normalizedX"], 1.0);
        assert_eq!(seen[2].1["x"], 50.0);
        assert_eq!(seen[2].1["y"], 0.0);
    }

    #[tokio::test]
    async fn config_section_disables_parallax() {
        let mut harness = Harness::new();
        harness.record("interactions:parallax:mouse");
        let context = harness
            .context()
            .with_config(FeatureConfig::from_value(json!({
                "mouse": { "parallax": false }
            })));
        harness.init(context).await;

        harness.feature.input().pointer_moved(10.0, 10.0);
        drain().await;
        assert!(harness.topics().is_empty());
        assert!(!harness.feature.config().mouse.parallax);
        assert_eq!(harness.feature.config().mouse.throttle, 16.0);
    }

    #[tokio::test]
    async fn scrolling_state_expires() {
        let mut harness = Harness::new();
        harness.record("interactions:scroll");
        harness.record("interactions:parallax:scroll");
        let context = harness.context();
        harness.init(context).await;

        let input = harness.feature.input();
        input.set_scroll_extent(0.0, 1000.0);
        input.scrolled(0.0, 0.0);
        harness.clock.advance(50.0);
        input.scrolled(0.0, 100.0);
        drain().await;

        let state = harness.feature.state();
        assert!(state.is_scrolling);
        assert_eq!(state.scroll.map(|s| s.direction), Some(ScrollDirection::Down));

        harness.clock.advance(200.0);
        assert!(!harness.feature.state().is_scrolling);
        assert_eq!(harness.topics().len(), 4);

        let parallax = harness
            .feature
            .scroll_parallax(&ParallaxConfig::with_strength(0.5))
            .unwrap();
        assert!((parallax.y - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn gestures_publish_generic_and_specific_topics() {
        let mut harness = Harness::new();
        harness.record("interactions:gesture");
        harness.record("interactions:gesture:tap");
        let context = harness.context();
        harness.init(context).await;

        let input = harness.feature.input();
        input.touch_start(&[TouchPoint::new(1, 20.0, 20.0)]);
        harness.clock.advance(80.0);
        input.touch_end(&[TouchPoint::new(1, 21.0, 20.0)]);
        drain().await;

        let mut topics = harness.topics();
        topics.sort();
        assert_eq!(topics, vec!["interactions:gesture", "interactions:gesture:tap"]);
        let state = harness.feature.state();
        assert!(state.is_touching);
        assert_eq!(state.gesture.map(|g| g.kind), Some(GestureKind::Tap));

        harness.clock.advance(150.0);
        assert!(!harness.feature.state().is_touching);
    }

    #[tokio::test]
    async fn destroy_is_idempotent_and_stops_input() {
        let mut harness = Harness::new();
        harness.record("interactions:destroyed");
        harness.record("interactions:mouse");
        let context = harness.context();
        harness.init(context).await;
        assert!(harness.feature.state().is_mouse_active);

        harness.feature.destroy().await.unwrap();
        harness.feature.destroy().await.unwrap();
        harness.feature.input().pointer_moved(5.0, 5.0);
        drain().await;

        assert_eq!(harness.topics(), vec!["interactions:destroyed"]);
        assert!(!harness.feature.state().is_mouse_active);
    }
}
