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

/// Dominant direction of a scroll movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    /// Towards the top of the page.
    Up,
    /// Towards the bottom of the page.
    Down,
    /// Towards the start of the line.
    Left,
    /// Towards the end of the line.
    Right,
    /// No movement since the previous sample.
    None,
}

/// A scroll sample enriched with motion data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollPosition {
    /// Horizontal scroll offset in pixels.
    pub x: f64,
    /// Vertical scroll offset in pixels.
    pub y: f64,
    /// `x` over the horizontal scroll extent.
    pub normalized_x: f64,
    /// `y` over the vertical scroll extent.
    pub normalized_y: f64,
    /// Horizontal velocity in px/s.
    pub velocity_x: f64,
    /// Vertical velocity in px/s.
    pub velocity_y: f64,
    /// Dominant direction; vertical wins when it is the larger component.
    pub direction: ScrollDirection,
    /// How far down the page is scrolled, `0.0..=1.0`.
    pub progress: f64,
    /// When the sample was taken, in milliseconds.
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    x: f64,
    y: f64,
    time: f64,
}

/// Tracks scroll offset, velocity and direction from raw samples.
#[derive(Debug, Clone)]
pub struct ScrollTracker {
    throttle_ms: f64,
    last: Option<Anchor>,
    current: Option<ScrollPosition>,
    last_emit: Option<f64>,
}

impl ScrollTracker {
    /// Creates a tracker accepting at most one sample per `throttle_ms`.
    pub fn new(throttle_ms: f64) -> Self {
        Self {
            throttle_ms,
            last: None,
            current: None,
            last_emit: None,
        }
    }

    /// Records a scroll offset. `extent` is the maximum scroll offset on each axis.
    ///
    /// Returns `None` when the sample falls inside the throttle window.
    pub fn update(&mut self, x: f64, y: f64, extent: (f64, f64), now: f64) -> Option<ScrollPosition> {
        if self.last_emit.is_some_and(|last| now - last < self.throttle_ms) {
            return None;
        }

        let (max_x, max_y) = extent;
        let normalized_x = if max_x > 0.0 { x / max_x } else { 0.0 };
        let normalized_y = if max_y > 0.0 { y / max_y } else { 0.0 };

        let mut velocity_x = 0.0;
        let mut velocity_y = 0.0;
        let mut direction = ScrollDirection::None;
        if let Some(last) = self.last {
            let dt = now - last.time;
            if dt > 0.0 {
                velocity_x = (x - last.x) / dt * 1000.0;
                velocity_y = (y - last.y) / dt * 1000.0;
                direction = if velocity_y.abs() > velocity_x.abs() {
                    if velocity_y > 0.0 {
                        ScrollDirection::Down
                    } else {
                        ScrollDirection::Up
                    }
                } else if velocity_x > 0.0 {
                    ScrollDirection::Right
                } else if velocity_x < 0.0 {
                    ScrollDirection::Left
                } else {
                    ScrollDirection::None
                };
            }
        }

        let position = ScrollPosition {
            x,
            y,
            normalized_x,
            normalized_y,
            velocity_x,
            velocity_y,
            direction,
            progress: normalized_y,
            timestamp: now,
        };
        self.current = Some(position);
        self.last = Some(Anchor { x, y, time: now });
        self.last_emit = Some(now);
        Some(position)
    }

    /// The latest position.
    pub fn position(&self) -> Option<ScrollPosition> {
        self.current
    }
}
