// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT wrapper.
//!
//! [`MqttWrapper`] wraps the MQTT client with sanity checks and validation:
//! topics are prefixed and parsed before use, wildcard topics are refused for
//! publication, and the subscription registry is re-issued to the broker
//! every time a connection is acknowledged.
//!
//! # Architecture
//!
//! ```text
//! Broker publishes hue2mqtt/light/abc/set
//!                     ↓
//!          event task → on_message()
//!                     ↓
//!   every registered Topic whose matcher accepts it
//!                     ↓
//!      tokio::spawn(handler(captures, payload))
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use hue2mqtt::config::MqttBrokerInfo;
//! use hue2mqtt::mqtt::{Captures, MqttWrapper, PublishOptions};
//!
//! # async fn example() -> hue2mqtt::Result<()> {
//! let wrapper = MqttWrapper::new("hue2mqtt", MqttBrokerInfo::new("localhost", 1883), None::<&()>)?;
//!
//! wrapper.subscribe("light/+/set", |captures: Captures, payload: String| async move {
//!     println!("set {:?} to {payload}", captures.get(0));
//! })?;
//!
//! wrapper.connect().await?;
//! wrapper
//!     .publish("status", &serde_json::json!({"online": true}), PublishOptions::default())
//!     .await?;
//! wrapper.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rumqttc::v5::mqttbytes::v5::PubAckReason;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::MqttBrokerInfo;
use crate::error::{Error, ProtocolError, TopicError};

use super::connection::{
    self, BusClient, BusEvent, BusEventLoop, ConnectionSettings, LastWillMessage, ProtocolVersion,
};
use super::handler::{MessageHandler, SubscriptionRegistry};
use super::topic::Topic;

/// Topic suffix of the last-will status message.
const STATUS_TOPIC: &str = "status";

/// How long `disconnect` waits for the event task to observe the disconnect.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Options for [`MqttWrapper::publish`].
///
/// By default messages are not retained and the topic is prefixed with the
/// configured topic prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    retain: bool,
    auto_prefix: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            retain: false,
            auto_prefix: true,
        }
    }
}

impl PublishOptions {
    /// Asks the broker to retain the message.
    #[must_use]
    pub fn retain(mut self) -> Self {
        self.retain = true;
        self
    }

    /// Uses the topic verbatim instead of prefixing it.
    #[must_use]
    pub fn without_prefix(mut self) -> Self {
        self.auto_prefix = false;
        self
    }

    /// Returns whether the message is retained.
    #[must_use]
    pub fn is_retained(&self) -> bool {
        self.retain
    }

    /// Returns whether the topic is prefixed.
    #[must_use]
    pub fn is_auto_prefixed(&self) -> bool {
        self.auto_prefix
    }
}

/// Wraps an MQTT connection with topic validation and handler dispatch.
///
/// `MqttWrapper` is cheaply cloneable. Lifecycle calls (`connect`,
/// `disconnect`) are not synchronized with each other; callers must not
/// issue them concurrently.
#[derive(Clone)]
pub struct MqttWrapper {
    inner: Arc<WrapperInner>,
}

struct WrapperInner {
    client_name: String,
    broker_info: MqttBrokerInfo,
    last_will: Option<LastWillMessage>,
    registry: SubscriptionRegistry,
    /// Updated by the event task.
    connected: AtomicBool,
    session: Mutex<Option<Session>>,
}

/// A client and the task driving its event loop.
struct Session {
    client: BusClient,
    events: JoinHandle<()>,
}

impl MqttWrapper {
    /// Creates a wrapper.
    ///
    /// If `last_will` is given it is serialized now and registered with the
    /// broker on every connection, retained, on `<prefix>/status`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the last will cannot be serialized.
    pub fn new<T: Serialize + ?Sized>(
        client_name: impl Into<String>,
        broker_info: MqttBrokerInfo,
        last_will: Option<&T>,
    ) -> Result<Self, Error> {
        let last_will = last_will
            .map(|will| -> Result<_, Error> {
                Ok(LastWillMessage {
                    topic: format!("{}/{STATUS_TOPIC}", broker_info.topic_prefix),
                    payload: serde_json::to_string(will)?,
                    retain: true,
                })
            })
            .transpose()?;

        let inner = WrapperInner {
            client_name: client_name.into(),
            broker_info,
            last_will,
            registry: SubscriptionRegistry::new(),
            connected: AtomicBool::new(false),
            session: Mutex::new(None),
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns the client name presented to the broker.
    #[must_use]
    pub fn client_name(&self) -> &str {
        &self.inner.client_name
    }

    /// Returns the topic prefix.
    #[must_use]
    pub fn mqtt_prefix(&self) -> &str {
        &self.inner.broker_info.topic_prefix
    }

    /// Returns the last will and testament message, if one was configured.
    #[must_use]
    pub fn last_will_message(&self) -> Option<&LastWillMessage> {
        self.inner.last_will.as_ref()
    }

    /// Returns whether the client is connected to the broker.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the subscribed topics, in registration order.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<Topic> {
        self.inner.registry.topics()
    }

    /// Returns the number of subscribed topics.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Connects to the broker.
    ///
    /// Waits until the broker acknowledges the connection. Every registered
    /// subscription is issued to the broker before this returns. The
    /// connection is never retried: if it drops later, the wrapper stays
    /// disconnected.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the connection fails, or
    /// [`ProtocolError::ConnectionTimeout`] if no acknowledgement arrives in
    /// time.
    pub async fn connect(&self) -> Result<(), ProtocolError> {
        if self.is_connected() {
            tracing::error!("Attempting connection, but client is already connected.");
        }

        let settings = self.inner.connection_settings();
        tracing::debug!(
            host = %settings.host,
            port = settings.port,
            tls = settings.tls,
            version = ?settings.version,
            "Connecting to MQTT broker"
        );

        let (client, event_loop) = connection::open(&settings);
        let (connack_tx, connack_rx) = oneshot::channel();

        let events = tokio::spawn(drive_events(
            event_loop,
            client.clone(),
            Arc::clone(&self.inner),
            connack_tx,
        ));

        let previous = self.inner.session.lock().replace(Session { client, events });
        if let Some(previous) = previous {
            previous.events.abort();
        }

        let timeout = self.inner.broker_info.connect_timeout();
        let result = match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(ProtocolError::ConnectionClosed),
            Err(_) => Err(ProtocolError::ConnectionTimeout(timeout.as_secs())),
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    host = %settings.host,
                    port = settings.port,
                    "Connected to MQTT broker"
                );
                Ok(())
            }
            Err(e) => {
                if let Some(session) = self.inner.session.lock().take() {
                    session.events.abort();
                }
                self.inner.connected.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Disconnects from the broker.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::DisconnectFailed`] if the client still
    /// reports a connection afterwards.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        if !self.is_connected() {
            tracing::error!("Attempting disconnection, but client is already disconnected.");
        }

        let session = self.inner.session.lock().take();
        if let Some(Session { client, mut events }) = session {
            if let Err(e) = client.disconnect().await {
                tracing::debug!(error = %e, "MQTT event loop already stopped");
            }

            if tokio::time::timeout(DISCONNECT_TIMEOUT, &mut events)
                .await
                .is_err()
            {
                tracing::warn!("Timed out waiting for the MQTT event loop to stop");
                events.abort();
            }
        }

        if self.is_connected() {
            return Err(ProtocolError::DisconnectFailed);
        }

        tracing::info!(
            host = %self.inner.broker_info.host,
            port = self.inner.broker_info.port,
            "Disconnected from MQTT broker"
        );
        Ok(())
    }

    /// Subscribes `handler` to a topic below the prefix.
    ///
    /// An empty `topic` subscribes to the bare prefix. A handler registered
    /// for an identical topic is replaced. Subscriptions are issued to the
    /// broker on connect, so this should be called before [`connect`].
    ///
    /// [`connect`]: Self::connect
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::Invalid`] if the resulting topic is malformed.
    pub fn subscribe<H: MessageHandler>(&self, topic: &str, handler: H) -> Result<(), TopicError> {
        let topic = self.inner.resolve_topic(topic, true)?;

        if self.is_connected() {
            tracing::warn!(
                topic = %topic,
                "Subscribing while connected; the broker subscription is issued on the next connection"
            );
        }

        self.inner.registry.insert(topic, Arc::new(handler));
        Ok(())
    }

    /// Publishes `payload`, serialized as JSON, at least once.
    ///
    /// An empty `topic` publishes to the bare prefix. Without a broker
    /// session the message is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::Unpublishable`] if the topic contains a
    /// wildcard, [`TopicError::Invalid`] if it is malformed, a serialization
    /// error, or a client error if the request cannot be queued.
    pub async fn publish<T: Serialize + Sync + ?Sized>(
        &self,
        topic: &str,
        payload: &T,
        options: PublishOptions,
    ) -> Result<(), Error> {
        if !self.is_connected() {
            tracing::error!("Attempted to publish message, but client is not connected.");
        }

        let topic = self.inner.resolve_topic(topic, options.auto_prefix)?;
        if !topic.is_publishable() {
            return Err(TopicError::Unpublishable(topic.to_string()).into());
        }

        let body = serde_json::to_vec(payload)?;
        let client = self
            .inner
            .session
            .lock()
            .as_ref()
            .map(|session| session.client.clone());

        let Some(client) = client else {
            tracing::debug!(topic = %topic, "No broker session, dropping message");
            return Ok(());
        };

        tracing::debug!(topic = %topic, retain = options.retain, "Publishing MQTT message");
        client
            .publish(&topic.to_string(), body, options.retain)
            .await?;
        Ok(())
    }

    /// Dispatches an incoming message to every matching handler.
    ///
    /// Each matching handler runs as its own task; this does not wait for
    /// them. The message is always acknowledged as accepted.
    ///
    /// A payload that is not valid UTF-8 is not passed to any handler; each
    /// skipped handler is logged.
    pub fn on_message(&self, topic: &str, payload: &[u8]) -> PubAckReason {
        self.inner.on_message(topic, payload)
    }
}

impl WrapperInner {
    fn connection_settings(&self) -> ConnectionSettings {
        let info = &self.broker_info;

        let version = if info.force_protocol_version_3_1 {
            ProtocolVersion::V311
        } else {
            ProtocolVersion::V5
        };

        let credentials = if info.enable_auth {
            tracing::debug!("MQTT auth enabled");
            Some((info.username.clone(), info.password.clone()))
        } else {
            None
        };

        ConnectionSettings {
            client_id: self.client_name.clone(),
            host: info.host.clone(),
            port: info.port,
            tls: info.enable_tls,
            version,
            credentials,
            keep_alive: info.keep_alive(),
            last_will: self.last_will.clone(),
            subscriptions: self.registry.len(),
        }
    }

    /// Builds the full topic for a suffix.
    fn resolve_topic(&self, suffix: &str, auto_prefix: bool) -> Result<Topic, TopicError> {
        let prefix = &self.broker_info.topic_prefix;
        if suffix.is_empty() {
            Topic::parse(prefix)
        } else if auto_prefix {
            Topic::parse(&format!("{prefix}/{suffix}"))
        } else {
            Topic::parse(suffix)
        }
    }

    /// Issues every registered subscription to the broker.
    fn on_connect(&self, client: &BusClient) {
        for topic in self.registry.topics() {
            tracing::debug!(topic = %topic, "Subscribing");
            if let Err(e) = client.try_subscribe(&topic.to_string()) {
                tracing::error!(topic = %topic, error = %e, "Failed to subscribe");
            }
        }
    }

    fn on_message(&self, topic: &str, payload: &[u8]) -> PubAckReason {
        tracing::debug!(
            topic = %topic,
            payload = %String::from_utf8_lossy(payload),
            "Message received"
        );

        let matches = self.registry.matching(topic);
        if matches.is_empty() {
            tracing::trace!(topic = %topic, "No handler for topic");
            return PubAckReason::Success;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(topic = %topic, "No Tokio runtime to run handlers on");
            return PubAckReason::Success;
        };

        let decoded = std::str::from_utf8(payload);
        for (pattern, handler, captures) in matches {
            match decoded {
                Ok(text) => {
                    tracing::debug!(pattern = %pattern, topic = %topic, "Calling handler");
                    runtime.spawn(handler.handle(captures, text.to_string()));
                }
                Err(e) => {
                    tracing::warn!(
                        pattern = %pattern,
                        topic = %topic,
                        error = %e,
                        "Payload is not valid UTF-8, skipping handler"
                    );
                }
            }
        }

        PubAckReason::Success
    }
}

/// Drives the event loop until the connection closes or fails.
///
/// The outcome of the connection attempt is reported on `connack_tx`. The
/// registry is subscribed before a successful outcome is reported.
async fn drive_events(
    mut event_loop: BusEventLoop,
    client: BusClient,
    inner: Arc<WrapperInner>,
    connack_tx: oneshot::Sender<Result<(), ProtocolError>>,
) {
    let mut connack_tx = Some(connack_tx);

    loop {
        let Some(event) = event_loop.poll().await else {
            continue;
        };

        match event {
            BusEvent::Connected => {
                inner.connected.store(true, Ordering::Release);
                inner.on_connect(&client);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            BusEvent::Message { topic, payload } => {
                inner.on_message(&topic, &payload);
            }
            BusEvent::Closed => {
                tracing::debug!("MQTT connection closed");
                inner.connected.store(false, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Err(ProtocolError::ConnectionClosed));
                }
                break;
            }
            BusEvent::Failed(e) => {
                inner.connected.store(false, Ordering::Release);
                match connack_tx.take() {
                    Some(tx) => {
                        let _ = tx.send(Err(e));
                    }
                    None => {
                        tracing::error!(error = %e, "MQTT connection lost, not reconnecting");
                    }
                }
                break;
            }
        }
    }
}

impl std::fmt::Debug for MqttWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttWrapper")
            .field("client_name", &self.inner.client_name)
            .field("host", &self.inner.broker_info.host)
            .field("port", &self.inner.broker_info.port)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::Captures;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn broker_info() -> MqttBrokerInfo {
        MqttBrokerInfo::new("localhost", 1883)
    }

    fn wrapper() -> MqttWrapper {
        MqttWrapper::new("foo", broker_info(), None::<&()>).unwrap()
    }

    /// Handler that forwards every call to a channel.
    fn forwarding_handler(
        tx: &mpsc::UnboundedSender<(Captures, String)>,
    ) -> impl MessageHandler + use<> {
        let tx = tx.clone();
        move |captures: Captures, payload: String| {
            let tx = tx.clone();
            async move {
                let _ = tx.send((captures, payload));
            }
        }
    }

    async fn next_call(
        rx: &mut mpsc::UnboundedReceiver<(Captures, String)>,
    ) -> Option<(Captures, String)> {
        tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .ok()
            .flatten()
    }

    #[test]
    fn init_minimal() {
        let wr = wrapper();
        assert_eq!(wr.client_name(), "foo");
        assert!(wr.last_will_message().is_none());
        assert_eq!(wr.subscription_count(), 0);
    }

    #[test]
    fn not_connected_at_init() {
        assert!(!wrapper().is_connected());
    }

    #[test]
    fn default_prefix() {
        assert_eq!(wrapper().mqtt_prefix(), "hue2mqtt");
    }

    #[test]
    fn last_will_on_status_topic() {
        let wr = MqttWrapper::new("foo", broker_info(), Some(&json!({"online": false}))).unwrap();
        let will = wr.last_will_message().unwrap();
        assert_eq!(will.topic, "hue2mqtt/status");
        assert_eq!(will.payload, r#"{"online":false}"#);
        assert!(will.retain);
    }

    #[test]
    fn settings_default_to_v5_without_credentials() {
        let settings = wrapper().inner.connection_settings();
        assert_eq!(settings.version, ProtocolVersion::V5);
        assert_eq!(settings.client_id, "foo");
        assert!(settings.credentials.is_none());
        assert!(!settings.tls);
    }

    #[test]
    fn settings_honour_flags() {
        let info = broker_info()
            .with_credentials("user", "pass")
            .with_protocol_version_3_1();
        let wr = MqttWrapper::new("foo", info, None::<&()>).unwrap();
        let settings = wr.inner.connection_settings();
        assert_eq!(settings.version, ProtocolVersion::V311);
        assert_eq!(
            settings.credentials,
            Some(("user".to_string(), "pass".to_string()))
        );
    }

    #[test]
    fn settings_count_subscriptions() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let wr = wrapper();
        wr.subscribe("light/+/set", forwarding_handler(&tx)).unwrap();
        wr.subscribe("group/+/set", forwarding_handler(&tx)).unwrap();
        assert_eq!(wr.inner.connection_settings().subscriptions, 2);
    }

    #[test]
    fn on_connect_issues_every_subscription() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let wr = wrapper();
        for i in 0..70 {
            let topic = format!("light/{i}/set");
            wr.subscribe(&topic, forwarding_handler(&tx)).unwrap();
        }

        let capacity = connection::request_capacity(wr.subscription_count());
        let (request_tx, request_rx) = flume::bounded(capacity);
        let client = BusClient::V311(rumqttc::AsyncClient::from_senders(request_tx));
        wr.inner.on_connect(&client);

        let issued: Vec<String> = request_rx
            .try_iter()
            .flat_map(|request| match request {
                rumqttc::Request::Subscribe(subscribe) => subscribe.filters,
                _ => Vec::new(),
            })
            .map(|filter| filter.path)
            .collect();
        let expected: Vec<String> = wr
            .subscriptions()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(issued.len(), 70);
        assert_eq!(issued, expected);
    }

    #[test]
    fn subscribe_registers_prefixed_topic() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let wr = wrapper();
        wr.subscribe("bees/+", forwarding_handler(&tx)).unwrap();
        assert_eq!(wr.subscriptions(), [Topic::new(["hue2mqtt", "bees", "+"])]);
    }

    #[test]
    fn subscribe_empty_topic_uses_prefix() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let wr = wrapper();
        wr.subscribe("", forwarding_handler(&tx)).unwrap();
        assert_eq!(wr.subscriptions(), [Topic::new(["hue2mqtt"])]);
    }

    #[test]
    fn subscribe_invalid_topic_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let wr = wrapper();
        let result = wr.subscribe("bees/", forwarding_handler(&tx));
        assert!(matches!(result, Err(TopicError::Invalid { .. })));
        assert_eq!(wr.subscription_count(), 0);
    }

    #[test]
    fn resolve_topic_variants() {
        let wr = wrapper();
        let resolve = |suffix, prefix| wr.inner.resolve_topic(suffix, prefix).unwrap().to_string();
        assert_eq!(resolve("", true), "hue2mqtt");
        assert_eq!(resolve("", false), "hue2mqtt");
        assert_eq!(resolve("light/1", true), "hue2mqtt/light/1");
        assert_eq!(resolve("other/light", false), "other/light");
    }

    #[tokio::test]
    async fn on_message_calls_handler() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let wr = wrapper();
        wr.subscribe("bees/+", forwarding_handler(&tx)).unwrap();

        let res = wr.on_message("hue2mqtt/bees/bar", b"hive");
        assert_eq!(res, PubAckReason::Success);

        let (captures, payload) = next_call(&mut rx).await.unwrap();
        assert_eq!(captures.as_slice(), ["bar"]);
        assert_eq!(payload, "hive");
    }

    #[tokio::test]
    async fn on_message_receives_serialized_payload() {
        // The mock broker does not forward messages between clients, so the
        // delivery is injected here. Broker round trips run in
        // tests/real_broker.rs.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let wr = wrapper();
        wr.subscribe("bees/+", forwarding_handler(&tx)).unwrap();

        let body = serde_json::to_string(&json!({"foo": "bar"})).unwrap();
        wr.on_message("hue2mqtt/bees/foo", body.as_bytes());

        let (captures, payload) = next_call(&mut rx).await.unwrap();
        assert_eq!(captures.as_slice(), ["foo"]);
        assert_eq!(payload, body);
    }

    #[tokio::test]
    async fn on_message_calls_every_matching_handler() {
        let (tx_one, mut rx_one) = mpsc::unbounded_channel();
        let (tx_two, mut rx_two) = mpsc::unbounded_channel();
        let wr = wrapper();
        wr.subscribe("bees/+", forwarding_handler(&tx_one)).unwrap();
        wr.subscribe("bees/#", forwarding_handler(&tx_two)).unwrap();

        wr.on_message("hue2mqtt/bees/bar", b"hive");

        assert!(next_call(&mut rx_one).await.is_some());
        assert!(next_call(&mut rx_two).await.is_some());
    }

    #[tokio::test]
    async fn on_message_ignores_unmatched_topic() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let wr = wrapper();
        wr.subscribe("bees/+", forwarding_handler(&tx)).unwrap();

        let res = wr.on_message("hue2mqtt/wasps/bar", b"hive");
        assert_eq!(res, PubAckReason::Success);
        assert!(next_call(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn on_message_skips_invalid_utf8() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let wr = wrapper();
        wr.subscribe("bees/+", forwarding_handler(&tx)).unwrap();

        let res = wr.on_message("hue2mqtt/bees/bar", &[0xff, 0xfe]);
        assert_eq!(res, PubAckReason::Success);
        assert!(next_call(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn resubscribing_replaces_handler() {
        let (tx_old, mut rx_old) = mpsc::unbounded_channel();
        let (tx_new, mut rx_new) = mpsc::unbounded_channel();
        let wr = wrapper();
        wr.subscribe("bees/+", forwarding_handler(&tx_old)).unwrap();
        wr.subscribe("bees/+", forwarding_handler(&tx_new)).unwrap();
        assert_eq!(wr.subscription_count(), 1);

        wr.on_message("hue2mqtt/bees/bar", b"hive");
        assert!(next_call(&mut rx_new).await.is_some());
        assert!(next_call(&mut rx_old).await.is_none());
    }

    #[tokio::test]
    async fn publish_wildcard_topic_fails() {
        let wr = wrapper();
        for topic in ["bees/+", "bees/#"] {
            let result = wr
                .publish(topic, &json!({"foo": "bar"}), PublishOptions::default())
                .await;
            assert!(matches!(
                result,
                Err(Error::Topic(TopicError::Unpublishable(_)))
            ));
        }
    }

    #[tokio::test]
    async fn publish_malformed_topic_fails() {
        let wr = wrapper();
        let result = wr
            .publish("bees/", &json!({"foo": "bar"}), PublishOptions::default())
            .await;
        assert!(matches!(result, Err(Error::Topic(TopicError::Invalid { .. }))));
    }

    #[tokio::test]
    async fn publish_without_session_is_dropped() {
        let wr = wrapper();
        let result = wr
            .publish("bees/foo", &json!({"foo": "bar"}), PublishOptions::default().retain())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn disconnect_when_disconnected_is_advisory() {
        let wr = wrapper();
        assert!(wr.disconnect().await.is_ok());
        assert!(wr.disconnect().await.is_ok());
        assert!(!wr.is_connected());
    }

    #[tokio::test]
    async fn connect_refused_propagates_transport_error() {
        let info = MqttBrokerInfo::new("127.0.0.1", 1).with_protocol_version_3_1();
        let wr = MqttWrapper::new("foo", info, None::<&()>).unwrap();

        let result = wr.connect().await;
        assert!(matches!(result, Err(ProtocolError::Connection(_))));
        assert!(!wr.is_connected());
    }

    #[test]
    fn publish_options() {
        let options = PublishOptions::default();
        assert!(!options.is_retained());
        assert!(options.is_auto_prefixed());

        let options = options.retain().without_prefix();
        assert!(options.is_retained());
        assert!(!options.is_auto_prefixed());
    }
}
