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

// Backdrop Sandbox
// Mounts a background on a virtual target and prints what the features report.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use backdrop_sdk::prelude::*;

const RUN_FOR: Duration = Duration::from_secs(3);

fn demo_config() -> Result<BackgroundConfig> {
    let config = BackgroundConfig::from_json(
        r#"{
            "container": "hero",
            "renderer": "headless",
            "features": {
                "performance": { "showStats": false, "batteryAware": true },
                "user-behavior": { "mouse": { "throttle": 32 } }
            }
        }"#,
    )?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("info");

    let frames = Arc::new(IntervalFrameSource::default());
    let battery = Arc::new(FixedBattery::new(BatteryStatus::new(0.8, false)));

    let mut background = SmartBackground::new(demo_config()?).with_resolver(Arc::new(
        |selector: &str| Some(MountTarget::new(selector).with_size(1280.0, 720.0)),
    ));

    background.register(
        PerformanceFeature::new(frames.clone())
            .with_gpu(Arc::new(ReportedGpuSource::new(
                "Intel(R) Iris(R) Xe Graphics",
                "Intel",
                16384,
                true,
            )))
            .with_battery(battery.clone())
            .with_memory(Arc::new(SysinfoMemorySource::new())),
    );
    let behavior = background.register(UserBehaviorFeature::new(frames.clone()));

    let bus = background.event_bus();
    bus.subscribe(
        "performance:metrics",
        Handler::sync(|data| {
            let metrics: PerformanceMetrics = serde_json::from_value(data.clone())?;
            log::info!(
                "fps {:.0} (avg {:.0}, min {:.0}, max {:.0})",
                metrics.fps,
                metrics.avg_fps,
                metrics.min_fps,
                metrics.max_fps
            );
            Ok(())
        }),
    );
    bus.subscribe(
        "performance:quality-changed",
        Handler::sync(|data| {
            log::info!("Quality changed: {}", data["quality"]);
            Ok(())
        }),
    );
    bus.subscribe(
        "interactions:gesture",
        Handler::sync(|data| {
            log::info!("Gesture: {}", data["type"]);
            Ok(())
        }),
    );

    background.mount_configured().await?;

    if let Some(behavior) = behavior {
        let input = behavior.lock().await.input();
        input.pointer_moved(640.0, 360.0);
        input.touch_start(&[TouchPoint::new(1, 100.0, 100.0)]);
        input.touch_end(&[TouchPoint::new(1, 101.0, 100.0)]);
    }

    tokio::time::sleep(RUN_FOR / 2).await;
    log::info!("Unplugging the charger with a nearly empty battery.");
    battery.set(BatteryStatus::new(0.1, false));
    tokio::time::sleep(RUN_FOR / 2).await;

    background.destroy().await;
    Ok(())
}
