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

//! Provides the topic-based publish/subscribe bus that wires features together.
//!
//! Every orchestrator owns exactly one [`EventBus`]; features receive a clone of it
//! through their [`FeatureContext`](crate::feature::FeatureContext). Topics are plain
//! strings, namespaced by convention as `domain:event` (e.g. `performance:metrics`).
//!
//! Payloads are [`serde_json::Value`]s so that independently authored features can
//! exchange data without sharing Rust types.

mod bus;

pub use self::bus::{
    payload, EventBus, Handler, HandlerFuture, HandlerId, Payload, Reaction, Subscription,
};
