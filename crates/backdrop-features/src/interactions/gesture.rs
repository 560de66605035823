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

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The gestures the recognizer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKind {
    /// Short touch that barely moved.
    Tap,
    /// Fast, long single-finger stroke.
    Swipe,
    /// Two fingers moving apart or together.
    Pinch,
    /// Single-finger drag.
    Pan,
}

impl GestureKind {
    /// Every gesture, the default enabled set.
    pub const ALL: [GestureKind; 4] = [
        GestureKind::Tap,
        GestureKind::Swipe,
        GestureKind::Pinch,
        GestureKind::Pan,
    ];

    /// Lowercase name, used in event topics.
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureKind::Tap => "tap",
            GestureKind::Swipe => "swipe",
            GestureKind::Pinch => "pinch",
            GestureKind::Pan => "pan",
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One touch point as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    /// Identifier stable for the lifetime of the touch.
    pub id: u64,
    /// Horizontal position in viewport pixels.
    pub x: f64,
    /// Vertical position in viewport pixels.
    pub y: f64,
}

impl TouchPoint {
    /// Convenience constructor.
    pub fn new(id: u64, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }
}

/// A recognized gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gesture {
    /// What was recognized.
    #[serde(rename = "type")]
    pub kind: GestureKind,
    #[allow(missing_docs)]
    pub start_x: f64,
    #[allow(missing_docs)]
    pub start_y: f64,
    #[allow(missing_docs)]
    pub current_x: f64,
    #[allow(missing_docs)]
    pub current_y: f64,
    #[allow(missing_docs)]
    pub delta_x: f64,
    #[allow(missing_docs)]
    pub delta_y: f64,
    /// Distance travelled in pixels; for a pinch, the current finger spread.
    pub distance: f64,
    /// Direction of travel in radians.
    pub angle: f64,
    /// Current spread over initial spread, pinch only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// Average speed since the touch started, in px/s.
    pub velocity: f64,
    /// When the gesture was recognized, in milliseconds.
    pub timestamp: f64,
}

const TAP_MAX_DISTANCE: f64 = 10.0;
const TAP_MAX_DURATION_MS: f64 = 300.0;
const SWIPE_MIN_DISTANCE: f64 = 50.0;
const SWIPE_MIN_VELOCITY: f64 = 300.0;

#[derive(Debug, Clone, Copy)]
struct ActiveTouch {
    id: u64,
    start_x: f64,
    start_y: f64,
    x: f64,
    y: f64,
    started_at: f64,
}

struct Stroke {
    delta_x: f64,
    delta_y: f64,
    distance: f64,
    angle: f64,
    elapsed: f64,
    velocity: f64,
}

impl ActiveTouch {
    fn stroke_to(&self, x: f64, y: f64, now: f64) -> Stroke {
        let delta_x = x - self.start_x;
        let delta_y = y - self.start_y;
        let distance = delta_x.hypot(delta_y);
        let elapsed = now - self.started_at;
        Stroke {
            delta_x,
            delta_y,
            distance,
            angle: delta_y.atan2(delta_x),
            elapsed,
            velocity: if elapsed > 0.0 {
                distance / elapsed * 1000.0
            } else {
                0.0
            },
        }
    }

    fn gesture(&self, kind: GestureKind, x: f64, y: f64, stroke: &Stroke, now: f64) -> Gesture {
        Gesture {
            kind,
            start_x: self.start_x,
            start_y: self.start_y,
            current_x: x,
            current_y: y,
            delta_x: stroke.delta_x,
            delta_y: stroke.delta_y,
            distance: stroke.distance,
            angle: stroke.angle,
            scale: None,
            velocity: stroke.velocity,
            timestamp: now,
        }
    }
}

/// Recognizes taps, swipes, pans and pinches from raw touch events.
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    enabled: HashSet<GestureKind>,
    // Insertion order: the first two touches form a pinch.
    touches: Vec<ActiveTouch>,
    tap_armed: bool,
}

impl GestureRecognizer {
    /// Creates a recognizer reporting only the `enabled` gestures.
    pub fn new(enabled: impl IntoIterator<Item = GestureKind>) -> Self {
        Self {
            enabled: enabled.into_iter().collect(),
            touches: Vec::new(),
            tap_armed: false,
        }
    }

    /// Whether `kind` is reported.
    pub fn is_enabled(&self, kind: GestureKind) -> bool {
        self.enabled.contains(&kind)
    }

    /// Number of fingers currently down.
    pub fn active_touches(&self) -> usize {
        self.touches.len()
    }

    /// Fingers went down.
    pub fn touch_start(&mut self, changed: &[TouchPoint], now: f64) {
        for point in changed {
            let touch = ActiveTouch {
                id: point.id,
                start_x: point.x,
                start_y: point.y,
                x: point.x,
                y: point.y,
                started_at: now,
            };
            match self.touches.iter_mut().find(|t| t.id == point.id) {
                Some(existing) => *existing = touch,
                None => self.touches.push(touch),
            }
        }
        // A tap is a single finger; a second finger disarms it.
        self.tap_armed = self.is_enabled(GestureKind::Tap) && self.touches.len() == 1;
    }

    /// Fingers moved. Returns the pans and pinches this produced.
    pub fn touch_move(&mut self, changed: &[TouchPoint], now: f64) -> Vec<Gesture> {
        let mut gestures = Vec::new();
        let single = self.touches.len() == 1;
        let mut moved = false;

        for point in changed {
            let Some(touch) = self.touches.iter_mut().find(|t| t.id == point.id) else {
                continue;
            };
            touch.x = point.x;
            touch.y = point.y;
            moved = true;

            if single && self.enabled.contains(&GestureKind::Pan) {
                let stroke = touch.stroke_to(point.x, point.y, now);
                gestures.push(touch.gesture(GestureKind::Pan, point.x, point.y, &stroke, now));
            }
        }

        if moved && self.touches.len() == 2 && self.is_enabled(GestureKind::Pinch) {
            gestures.push(self.pinch(now));
        }
        gestures
    }

    /// Fingers lifted. Returns the taps and swipes this produced.
    pub fn touch_end(&mut self, changed: &[TouchPoint], now: f64) -> Vec<Gesture> {
        let mut gestures = Vec::new();

        for point in changed {
            let Some(index) = self.touches.iter().position(|t| t.id == point.id) else {
                continue;
            };
            let touch = self.touches.remove(index);
            let stroke = touch.stroke_to(point.x, point.y, now);

            if self.tap_armed
                && stroke.distance < TAP_MAX_DISTANCE
                && stroke.elapsed < TAP_MAX_DURATION_MS
            {
                let mut tap = touch.gesture(GestureKind::Tap, point.x, point.y, &stroke, now);
                tap.delta_x = 0.0;
                tap.delta_y = 0.0;
                tap.distance = 0.0;
                tap.angle = 0.0;
                tap.velocity = 0.0;
                gestures.push(tap);
            }

            if self.is_enabled(GestureKind::Swipe)
                && stroke.distance > SWIPE_MIN_DISTANCE
                && stroke.velocity > SWIPE_MIN_VELOCITY
            {
                gestures.push(touch.gesture(GestureKind::Swipe, point.x, point.y, &stroke, now));
            }
        }

        self.tap_armed = false;
        gestures
    }

    /// The host cancelled every touch.
    pub fn touch_cancel(&mut self) {
        self.touches.clear();
        self.tap_armed = false;
    }

    fn pinch(&self, now: f64) -> Gesture {
        let (a, b) = (&self.touches[0], &self.touches[1]);
        let start_spread = (a.start_x - b.start_x).hypot(a.start_y - b.start_y);
        let spread = (a.x - b.x).hypot(a.y - b.y);
        Gesture {
            kind: GestureKind::Pinch,
            start_x: (a.start_x + b.start_x) / 2.0,
            start_y: (a.start_y + b.start_y) / 2.0,
            current_x: (a.x + b.x) / 2.0,
            current_y: (a.y + b.y) / 2.0,
            delta_x: 0.0,
            delta_y: 0.0,
            distance: spread,
            angle: 0.0,
            scale: Some(if start_spread > 0.0 { spread / start_spread } else { 1.0 }),
            velocity: 0.0,
            timestamp: now,
        }
    }
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(GestureKind::ALL)
    }
}
