// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Message handlers and the subscription registry.
//!
//! - [`MessageHandler`] - The capability every subscription handler provides
//! - `SubscriptionRegistry` - Ordered map from [`Topic`] to handler

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;

use super::topic::{Captures, Topic};

/// Boxed future returned by a [`MessageHandler`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Handles messages arriving on a subscribed topic.
///
/// Handlers receive the wildcard captures of the matched topic and the
/// payload decoded as UTF-8. They cannot report failure: a handler is
/// expected to log and contain its own decode or validation errors.
///
/// Any `Fn(Captures, String) -> impl Future<Output = ()>` closure is a
/// handler:
///
/// ```
/// use hue2mqtt::mqtt::{Captures, MessageHandler};
///
/// fn assert_handler(_: impl MessageHandler) {}
///
/// assert_handler(|captures: Captures, payload: String| async move {
///     println!("{:?} -> {payload}", captures.get(0));
/// });
/// ```
pub trait MessageHandler: Send + Sync + 'static {
    /// Starts handling one message.
    fn handle(&self, captures: Captures, payload: String) -> HandlerFuture;
}

impl<F, Fut> MessageHandler for F
where
    F: Fn(Captures, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn handle(&self, captures: Captures, payload: String) -> HandlerFuture {
        Box::pin(self(captures, payload))
    }
}

/// Shared reference to a registered handler.
pub(crate) type SharedHandler = Arc<dyn MessageHandler>;

/// Registry of subscriptions, in registration order.
///
/// Registering a handler for a topic that is already present replaces the
/// previous handler in place.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    entries: RwLock<Vec<(Topic, SharedHandler)>>,
}

impl SubscriptionRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `topic`, replacing any handler already
    /// registered for an equal topic.
    pub(crate) fn insert(&self, topic: Topic, handler: SharedHandler) {
        let mut entries = self.entries.write();
        if let Some(entry) = entries.iter_mut().find(|(t, _)| *t == topic) {
            tracing::debug!(topic = %topic, "Replacing subscription handler");
            entry.1 = handler;
        } else {
            tracing::debug!(topic = %topic, "Registering subscription handler");
            entries.push((topic, handler));
        }
    }

    /// Returns every registered topic, in registration order.
    #[must_use]
    pub(crate) fn topics(&self) -> Vec<Topic> {
        self.entries.read().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Returns every handler whose topic matches `candidate`, along with the
    /// rendered pattern and the captured segments, in registration order.
    pub(crate) fn matching(&self, candidate: &str) -> Vec<(String, SharedHandler, Captures)> {
        self.entries
            .read()
            .iter()
            .filter_map(|(topic, handler)| {
                topic
                    .matches(candidate)
                    .map(|captures| (topic.to_string(), Arc::clone(handler), captures))
            })
            .collect()
    }

    /// Returns the number of registered subscriptions.
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("topics", &self.topics())
            .finish()
    }
}
