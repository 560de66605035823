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

use super::Clock;

/// Callback invoked once per displayed frame with the frame timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnMut(f64) + Send>;

/// Identifies a frame subscription handed out by a [`FrameSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    /// Wraps a provider-specific identifier.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The provider-specific identifier.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// The host's frame-scheduling primitive.
///
/// A source repeatedly calls every registered callback, once per frame, with
/// timestamps taken from its own [`Clock`].
pub trait FrameSource: Clock {
    /// Starts delivering frames to `callback` until the handle is cancelled.
    fn request_frames(&self, callback: FrameCallback) -> FrameHandle;

    /// Stops delivering frames for `handle`. Unknown or already cancelled handles
    /// are ignored.
    fn cancel_frames(&self, handle: FrameHandle);
}
