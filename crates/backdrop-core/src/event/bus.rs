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

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use tokio::task::JoinSet;

/// The data carried by an event.
pub type Payload = serde_json::Value;

/// The asynchronous portion of a handler, awaited by [`EventBus::publish`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// What a handler hands back once its synchronous portion has run.
pub enum Reaction {
    /// The handler finished inline.
    Done,
    /// The handler continues asynchronously; the publisher tracks the future until it settles.
    Pending(HandlerFuture),
}

type HandlerFn = dyn Fn(&Payload) -> anyhow::Result<Reaction> + Send + Sync;

/// Identifies one handler across every topic it is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A cloneable event handler.
///
/// The same `Handler` can be subscribed under several topics; each registration is
/// removed independently with [`EventBus::unsubscribe`].
#[derive(Clone)]
pub struct Handler {
    id: HandlerId,
    func: Arc<HandlerFn>,
}

impl Handler {
    /// Creates a handler from a raw closure that decides per call whether it
    /// continues asynchronously.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Payload) -> anyhow::Result<Reaction> + Send + Sync + 'static,
    {
        Self::with_id(HandlerId::next(), func)
    }

    fn with_id<F>(id: HandlerId, func: F) -> Self
    where
        F: Fn(&Payload) -> anyhow::Result<Reaction> + Send + Sync + 'static,
    {
        Self {
            id,
            func: Arc::new(func),
        }
    }

    /// Creates a handler that runs entirely inline.
    pub fn sync<F>(func: F) -> Self
    where
        F: Fn(&Payload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(move |data| func(data).map(|()| Reaction::Done))
    }

    /// Creates a handler whose work happens in a future.
    ///
    /// The payload is cloned into the future so it can outlive the dispatch.
    pub fn asynchronous<F, Fut>(func: F) -> Self
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(move |data| Ok(Reaction::Pending(Box::pin(func(data.clone())))))
    }

    /// Returns the identifier of this handler.
    pub fn id(&self) -> HandlerId {
        self.id
    }

    fn call(&self, data: &Payload) -> anyhow::Result<Reaction> {
        (self.func)(data)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

type Registry = HashMap<String, Vec<Handler>>;

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

fn remove(registry: &Mutex<Registry>, topic: &str, id: HandlerId) -> bool {
    let mut handlers = lock(registry);
    let Some(list) = handlers.get_mut(topic) else {
        return false;
    };
    let before = list.len();
    list.retain(|handler| handler.id != id);
    let removed = list.len() != before;
    if list.is_empty() {
        handlers.remove(topic);
    }
    removed
}

/// A capability to remove exactly one registration from the bus.
///
/// Dropping a `Subscription` does **not** unsubscribe; call
/// [`unsubscribe`](Self::unsubscribe) explicitly.
#[derive(Debug, Clone)]
pub struct Subscription {
    topic: String,
    id: HandlerId,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// The topic this registration lives under.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The identifier of the registered handler.
    pub fn handler_id(&self) -> HandlerId {
        self.id
    }

    /// Removes the registration. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            remove(&registry, &self.topic, self.id);
        }
    }

    /// Returns `true` while the registration is still present on a live bus.
    pub fn is_active(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let handlers = lock(&registry);
        handlers
            .get(&self.topic)
            .is_some_and(|list| list.iter().any(|handler| handler.id == self.id))
    }
}

/// Serializes a value into an event payload.
///
/// Serialization failures are logged and yield [`Payload::Null`] so that emitting
/// diagnostics can never break the emitter.
pub fn payload<T: Serialize>(value: &T) -> Payload {
    serde_json::to_value(value).unwrap_or_else(|e| {
        log::error!("Failed to serialize event payload: {e}");
        Payload::Null
    })
}

/// Topic-based publish/subscribe bus.
///
/// Cloning the bus is cheap and every clone shares the same handler registry.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    handlers: Arc<Mutex<Registry>>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        log::debug!("EventBus initialized.");
        Self::default()
    }

    /// Registers `handler` under `topic`.
    ///
    /// Registering the same handler twice under one topic keeps a single registration.
    pub fn subscribe(&self, topic: impl Into<String>, handler: Handler) -> Subscription {
        let topic = topic.into();
        let id = handler.id;
        {
            let mut handlers = lock(&self.handlers);
            let list = handlers.entry(topic.clone()).or_default();
            if !list.iter().any(|existing| existing.id == id) {
                list.push(handler);
            }
        }
        log::trace!("Subscribed handler {id:?} to '{topic}'.");
        Subscription {
            topic,
            id,
            registry: Arc::downgrade(&self.handlers),
        }
    }

    /// Registers `handler` for a single invocation.
    ///
    /// The wrapper removes itself before running `handler`, so repeated publishes
    /// deliver exactly one event. A pending future returned by `handler` is still
    /// awaited by the publish that triggered it.
    pub fn subscribe_once(&self, topic: impl Into<String>, handler: Handler) -> Subscription {
        let topic = topic.into();
        let id = HandlerId::next();
        let registry = Arc::downgrade(&self.handlers);
        let wrapper_topic = topic.clone();
        let fired = AtomicBool::new(false);

        let wrapper = Handler::with_id(id, move |data| {
            if fired.swap(true, Ordering::SeqCst) {
                return Ok(Reaction::Done);
            }
            if let Some(registry) = registry.upgrade() {
                remove(&registry, &wrapper_topic, id);
            }
            handler.call(data)
        });

        self.subscribe(topic, wrapper)
    }

    /// Removes the registration of `handler` under `topic`, if any.
    pub fn unsubscribe(&self, topic: &str, handler: HandlerId) {
        if remove(&self.handlers, topic, handler) {
            log::trace!("Unsubscribed handler {handler:?} from '{topic}'.");
        }
    }

    /// Delivers `data` to every handler currently registered under `topic`.
    ///
    /// Synchronous portions run inline in registration order. The returned future
    /// completes once every asynchronous portion has settled; failures are logged
    /// with the topic and never interrupt the other handlers.
    pub async fn publish(&self, topic: &str, data: Payload) {
        let pending = self.dispatch(topic, &data);
        settle(topic, pending).await;
    }

    /// Publishes without waiting for the handlers to settle.
    ///
    /// The whole dispatch is spawned onto the current tokio runtime and its
    /// completion is discarded, so the caller never runs subscriber code while
    /// holding its own locks. Outside a runtime the synchronous portions run
    /// inline and asynchronous portions are dropped with a warning.
    pub fn publish_detached(&self, topic: impl Into<String>, data: Payload) {
        let topic = topic.into();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let bus = self.clone();
                runtime.spawn(async move {
                    bus.publish(&topic, data).await;
                });
            }
            Err(_) => {
                let pending = self.dispatch(&topic, &data);
                if !pending.is_empty() {
                    log::warn!(
                        "No async runtime: dropping {} pending handler(s) for '{topic}'.",
                        pending.len()
                    );
                }
            }
        }
    }

    /// Drops every registration. Used at full orchestrator teardown.
    pub fn clear(&self) {
        lock(&self.handlers).clear();
        log::debug!("EventBus cleared.");
    }

    /// Returns the number of handlers registered under `topic`.
    pub fn handler_count(&self, topic: &str) -> usize {
        lock(&self.handlers).get(topic).map_or(0, Vec::len)
    }

    /// Returns every topic with at least one handler, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = lock(&self.handlers).keys().cloned().collect();
        topics.sort();
        topics
    }

    fn dispatch(&self, topic: &str, data: &Payload) -> Vec<HandlerFuture> {
        // Snapshot so handlers may (un)subscribe while being dispatched.
        let handlers = lock(&self.handlers).get(topic).cloned().unwrap_or_default();
        if handlers.is_empty() {
            log::trace!("No handlers for '{topic}'.");
            return Vec::new();
        }

        let mut pending = Vec::new();
        for handler in &handlers {
            match handler.call(data) {
                Ok(Reaction::Done) => {}
                Ok(Reaction::Pending(future)) => pending.push(future),
                Err(e) => log::error!("Error in event handler for '{topic}': {e:#}"),
            }
        }
        pending
    }
}

async fn settle(topic: &str, pending: Vec<HandlerFuture>) {
    if pending.is_empty() {
        return;
    }

    if tokio::runtime::Handle::try_current().is_err() {
        for future in pending {
            if let Err(e) = future.await {
                log::error!("Error in async event handler for '{topic}': {e:#}");
            }
        }
        return;
    }

    let mut set = JoinSet::new();
    for future in pending {
        set.spawn(future);
    }
    while let Some(outcome) = set.join_next().await {
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("Error in async event handler for '{topic}': {e:#}"),
            Err(e) => log::error!("Async event handler for '{topic}' did not complete: {e}"),
        }
    }
}
