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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use backdrop_sdk::prelude::*;

type Journal = Arc<Mutex<Vec<String>>>;

struct Probe {
    name: &'static str,
    dependencies: Vec<String>,
    journal: Journal,
    fail_init: bool,
}

impl Probe {
    fn new(name: &'static str, dependencies: &[&str], journal: &Journal) -> Self {
        Self {
            name,
            dependencies: dependencies.iter().map(|d| (*d).to_owned()).collect(),
            journal: Arc::clone(journal),
            fail_init: false,
        }
    }

    fn failing(mut self) -> Self {
        self.fail_init = true;
        self
    }
}

#[async_trait]
impl Feature for Probe {
    fn name(&self) -> &str {
        self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    async fn init(&mut self, _context: &FeatureContext) -> anyhow::Result<()> {
        self.journal.lock().unwrap().push(format!("init:{}", self.name));
        if self.fail_init {
            anyhow::bail!("{} refused to start", self.name);
        }
        Ok(())
    }

    async fn destroy(&mut self) -> anyhow::Result<()> {
        self.journal.lock().unwrap().push(format!("destroy:{}", self.name));
        Ok(())
    }
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

fn record(bus: &EventBus, topics: &[&str]) -> Journal {
    let seen = Journal::default();
    for topic in topics {
        let seen = Arc::clone(&seen);
        let name = (*topic).to_owned();
        bus.subscribe(
            *topic,
            Handler::sync(move |_| {
                seen.lock().unwrap().push(name.clone());
                Ok(())
            }),
        );
    }
    seen
}

async fn drain() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn dependency_chain_initializes_in_order_and_tears_down_in_reverse() {
    let journal = Journal::default();
    let mut background = SmartBackground::default();
    background.register(Probe::new("c", &["b"], &journal));
    background.register(Probe::new("a", &[], &journal));
    background.register(Probe::new("b", &["a"], &journal));

    background.mount(MountTarget::new("root")).await.unwrap();
    assert!(background.is_mounted());
    assert_eq!(
        background.feature_manager().initialization_order(),
        ["a", "b", "c"]
    );

    background.destroy().await;
    assert_eq!(
        entries(&journal),
        vec!["init:a", "init:b", "init:c", "destroy:c", "destroy:b", "destroy:a"]
    );
}

#[tokio::test]
async fn missing_dependency_is_reported_before_any_init() {
    let journal = Journal::default();
    let mut background = SmartBackground::default();
    background.register(Probe::new("x", &["y"], &journal));

    let err = background.mount(MountTarget::new("root")).await.unwrap_err();
    match err {
        BackgroundError::Feature(FeatureError::MissingDependency {
            dependency,
            required_by,
        }) => {
            assert_eq!(dependency, "y");
            assert_eq!(required_by, "x");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!background.is_mounted());

    background.destroy().await;
    assert!(entries(&journal).is_empty());
}

#[tokio::test]
async fn circular_dependencies_are_rejected() {
    let journal = Journal::default();
    let mut background = SmartBackground::default();
    background.register(Probe::new("a", &["b"], &journal));
    background.register(Probe::new("b", &["a"], &journal));

    let err = background.mount(MountTarget::new("root")).await.unwrap_err();
    assert!(matches!(
        err,
        BackgroundError::Feature(FeatureError::CircularDependency { .. })
    ));
    assert!(err.to_string().contains("circular dependency"));
    assert!(entries(&journal).is_empty());
}

#[tokio::test]
async fn failed_init_keeps_earlier_features_until_destroy() {
    let journal = Journal::default();
    let mut background = SmartBackground::default();
    background.register(Probe::new("a", &[], &journal));
    background.register(Probe::new("b", &["a"], &journal).failing());
    background.register(Probe::new("c", &["b"], &journal));

    let err = background.mount(MountTarget::new("root")).await.unwrap_err();
    match &err {
        BackgroundError::Feature(inner) => assert_eq!(inner.feature_name(), "b"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!background.is_mounted());
    assert!(background.feature_manager().is_initialized("a"));
    assert!(!background.feature_manager().is_initialized("c"));

    background.destroy().await;
    assert_eq!(entries(&journal), vec!["init:a", "init:b", "destroy:a"]);
}

#[tokio::test]
async fn lifecycle_topics_are_published_in_order() {
    let mut background = SmartBackground::default();
    let seen = record(
        background.event_bus(),
        &[
            "background:mounted",
            "background:unmounting",
            "background:unmounted",
        ],
    );

    background.mount(MountTarget::new("root")).await.unwrap();
    background.mount(MountTarget::new("again")).await.unwrap();
    background.unmount().await;
    background.unmount().await;

    assert_eq!(
        entries(&seen),
        vec![
            "background:mounted",
            "background:unmounting",
            "background:unmounted"
        ]
    );
}

#[tokio::test]
async fn subscribe_once_fires_a_single_time() {
    let background = SmartBackground::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    background.event_bus().subscribe_once(
        "custom:ping",
        Handler::sync(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    );

    for _ in 0..3 {
        background.event_bus().publish("custom:ping", Payload::Null).await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(background.event_bus().handler_count("custom:ping"), 0);
}

#[tokio::test]
async fn failing_handlers_do_not_stop_the_others() {
    let background = SmartBackground::default();
    let bus = background.event_bus();
    let calls = Arc::new(AtomicUsize::new(0));

    let first = Arc::clone(&calls);
    bus.subscribe(
        "custom:work",
        Handler::sync(move |_| {
            first.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    );
    let second = Arc::clone(&calls);
    bus.subscribe(
        "custom:work",
        Handler::sync(move |_| {
            second.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("handler failure"))
        }),
    );
    let third = Arc::clone(&calls);
    bus.subscribe(
        "custom:work",
        Handler::asynchronous(move |_| {
            let third = Arc::clone(&third);
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                third.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }),
    );

    bus.publish("custom:work", Payload::Null).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn performance_feature_adapts_through_the_orchestrator() {
    let frames = Arc::new(ManualFrameSource::new());
    let config = BackgroundConfig::default().with_feature(
        "performance",
        FeatureConfig::new().with("batteryAware", false),
    );
    let mut background = SmartBackground::new(config);
    let performance = background
        .register(PerformanceFeature::new(frames.clone()))
        .unwrap();
    let seen = record(
        background.event_bus(),
        &["performance:initialized", "performance:quality-changed"],
    );

    background.mount(MountTarget::new("root")).await.unwrap();
    // Twenty frames per second: far below every threshold.
    for _ in 0..4 {
        frames.advance(50.0);
    }
    drain().await;

    {
        let feature = performance.lock().await;
        assert!(!feature.config().battery_aware);
        assert_eq!(feature.current_quality(), QualityLevel::Minimal);
    }
    assert_eq!(
        entries(&seen),
        vec!["performance:initialized", "performance:quality-changed"]
    );

    background.destroy().await;
    assert_eq!(frames.active_callbacks(), 0);
}

#[tokio::test]
async fn performance_section_accepts_the_upper_case_fps_key() {
    let frames = Arc::new(ManualFrameSource::new());
    let config =
        BackgroundConfig::from_json(r#"{ "features": { "performance": { "targetFPS": 30 } } }"#)
            .unwrap();
    let mut background = SmartBackground::new(config);
    let performance = background
        .register(PerformanceFeature::new(frames.clone()))
        .unwrap();

    background.mount(MountTarget::new("root")).await.unwrap();
    assert!(background.is_mounted());
    {
        let feature = performance.lock().await;
        assert_eq!(feature.config().target_fps, 30.0);
        assert!(feature.config().adaptive_quality);
        assert!(feature.is_monitoring());
    }

    background.destroy().await;
}

#[tokio::test]
async fn user_behavior_uses_the_mount_target_size() {
    let frames = ManualFrameSource::new();
    let mut background = SmartBackground::default();
    let behavior = background
        .register(UserBehaviorFeature::new(Arc::new(frames.clock())))
        .unwrap();
    let input = behavior.lock().await.input();

    let positions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&positions);
    background.event_bus().subscribe(
        "interactions:mouse",
        Handler::sync(move |data| {
            sink.lock().unwrap().push(data["normalizedX"].as_f64());
            Ok(())
        }),
    );

    background
        .mount(MountTarget::new("hero").with_size(400.0, 300.0))
        .await
        .unwrap();
    input.pointer_moved(100.0, 150.0);
    drain().await;

    assert_eq!(*positions.lock().unwrap(), vec![Some(0.25)]);

    background.destroy().await;
    input.pointer_moved(200.0, 150.0);
    drain().await;
    assert_eq!(positions.lock().unwrap().len(), 1);
}
