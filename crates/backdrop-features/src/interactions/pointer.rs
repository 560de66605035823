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

use serde::{Deserialize, Serialize};

/// A pointer sample enriched with motion data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerPosition {
    /// Horizontal position in viewport pixels.
    pub x: f64,
    /// Vertical position in viewport pixels.
    pub y: f64,
    /// `x` over the viewport width.
    pub normalized_x: f64,
    /// `y` over the viewport height.
    pub normalized_y: f64,
    /// Horizontal velocity in px/s.
    pub velocity_x: f64,
    /// Vertical velocity in px/s.
    pub velocity_y: f64,
    /// Magnitude of the velocity in px/s.
    pub speed: f64,
    /// Direction of motion in radians.
    pub direction: f64,
    /// When the sample was taken, in milliseconds.
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    x: f64,
    y: f64,
    time: f64,
}

/// Tracks pointer position, velocity and direction from raw samples.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    throttle_ms: f64,
    last: Option<Anchor>,
    current: Option<PointerPosition>,
    last_emit: Option<f64>,
}

impl PointerTracker {
    /// Creates a tracker accepting at most one sample per `throttle_ms`.
    pub fn new(throttle_ms: f64) -> Self {
        Self {
            throttle_ms,
            last: None,
            current: None,
            last_emit: None,
        }
    }

    /// Records a pointer sample at (`x`, `y`) inside a `viewport` of (width, height).
    ///
    /// Returns `None` when the sample falls inside the throttle window.
    pub fn update(&mut self, x: f64, y: f64, viewport: (f64, f64), now: f64) -> Option<PointerPosition> {
        if self.last_emit.is_some_and(|last| now - last < self.throttle_ms) {
            return None;
        }

        let (width, height) = viewport;
        let mut position = PointerPosition {
            x,
            y,
            normalized_x: if width > 0.0 { x / width } else { 0.0 },
            normalized_y: if height > 0.0 { y / height } else { 0.0 },
            velocity_x: 0.0,
            velocity_y: 0.0,
            speed: 0.0,
            direction: 0.0,
            timestamp: now,
        };

        if let Some(last) = self.last {
            let dt = now - last.time;
            if dt > 0.0 {
                position.velocity_x = (x - last.x) / dt * 1000.0;
                position.velocity_y = (y - last.y) / dt * 1000.0;
                position.speed = position.velocity_x.hypot(position.velocity_y);
                position.direction = position.velocity_y.atan2(position.velocity_x);
            }
        }

        self.current = Some(position);
        self.last = Some(Anchor { x, y, time: now });
        self.last_emit = Some(now);
        Some(position)
    }

    /// The pointer left the viewport: motion stops and the velocity baseline is
    /// forgotten. Returns the updated position, if one was known.
    pub fn leave(&mut self) -> Option<PointerPosition> {
        self.last = None;
        let position = self.current.as_mut()?;
        position.velocity_x = 0.0;
        position.velocity_y = 0.0;
        position.speed = 0.0;
        Some(*position)
    }

    /// The latest position.
    pub fn position(&self) -> Option<PointerPosition> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_and_direction() {
        let mut tracker = PointerTracker::new(16.0);
        let first = tracker.update(100.0, 100.0, (1000.0, 500.0), 0.0).unwrap();
        assert_eq!(first.speed, 0.0);
        assert_eq!(first.normalized_x, 0.1);
        assert_eq!(first.normalized_y, 0.2);

        let second = tracker.update(100.0, 120.0, (1000.0, 500.0), 20.0).unwrap();
        assert_eq!(second.velocity_x, 0.0);
        assert_eq!(second.velocity_y, 1000.0);
        assert_eq!(second.speed, 1000.0);
        assert!((second.direction - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn samples_inside_the_throttle_are_dropped() {
        let mut tracker = PointerTracker::new(16.0);
        assert!(tracker.update(0.0, 0.0, (100.0, 100.0), 0.0).is_some());
        assert!(tracker.update(5.0, 0.0, (100.0, 100.0), 10.0).is_none());
        assert!(tracker.update(5.0, 0.0, (100.0, 100.0), 16.0).is_some());
    }

    #[test]
    fn leaving_resets_motion() {
        let mut tracker = PointerTracker::new(0.0);
        assert!(tracker.leave().is_none());

        tracker.update(0.0, 0.0, (100.0, 100.0), 0.0);
        tracker.update(50.0, 0.0, (100.0, 100.0), 100.0);
        let left = tracker.leave().unwrap();
        assert_eq!(left.speed, 0.0);
        assert_eq!(left.x, 50.0);

        // No baseline after leaving: the next sample has no velocity.
        let back = tracker.update(0.0, 0.0, (100.0, 100.0), 200.0).unwrap();
        assert_eq!(back.speed, 0.0);
    }

    #[test]
    fn zero_viewport_normalizes_to_zero() {
        let mut tracker = PointerTracker::new(0.0);
        let position = tracker.update(10.0, 10.0, (0.0, 0.0), 0.0).unwrap();
        assert_eq!(position.normalized_x, 0.0);
    }
}
