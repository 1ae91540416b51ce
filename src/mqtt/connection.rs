// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Version-independent access to the `rumqttc` client.
//!
//! MQTT 5 and MQTT 3.1.1 are served by two different client types in
//! `rumqttc`. [`BusClient`] and [`BusEventLoop`] hide that split so the
//! wrapper can publish, subscribe and consume [`BusEvent`]s the same way for
//! both protocol versions.

use std::time::Duration;

use rumqttc::Transport;

use crate::error::ProtocolError;

/// Room in the request channel left for publications and other requests.
const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the request channel between client and event loop.
///
/// Subscriptions are queued without waiting when a connection is
/// acknowledged, before the event loop drains anything, so the channel holds
/// all of them on top of the usual headroom.
pub(crate) fn request_capacity(subscriptions: usize) -> usize {
    subscriptions.saturating_add(REQUEST_CHANNEL_CAPACITY)
}

/// MQTT protocol version used for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// MQTT 3.1.1.
    V311,
    /// MQTT 5.
    V5,
}

/// Message the broker publishes on behalf of the client if it goes away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastWillMessage {
    /// Topic the message is published to.
    pub topic: String,
    /// Serialized payload.
    pub payload: String,
    /// Whether the broker retains the message.
    pub retain: bool,
}

/// Everything needed to open a connection to the broker.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionSettings {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub version: ProtocolVersion,
    pub credentials: Option<(String, String)>,
    pub keep_alive: Duration,
    pub last_will: Option<LastWillMessage>,
    /// Number of subscriptions issued when the connection is acknowledged.
    pub subscriptions: usize,
}

/// Events of interest produced by the event loop.
#[derive(Debug)]
pub(crate) enum BusEvent {
    /// The broker acknowledged the connection.
    Connected,
    /// A message arrived on a subscribed topic.
    Message { topic: String, payload: Vec<u8> },
    /// The connection was closed by either side.
    Closed,
    /// The connection failed.
    Failed(ProtocolError),
}

/// Handle for sending requests to the broker.
#[derive(Debug, Clone)]
pub(crate) enum BusClient {
    V311(rumqttc::AsyncClient),
    V5(rumqttc::v5::AsyncClient),
}

/// The event loop driving a [`BusClient`].
pub(crate) enum BusEventLoop {
    V311(Box<rumqttc::EventLoop>),
    V5(Box<rumqttc::v5::EventLoop>),
}

/// Creates a client and its event loop. No I/O happens until the event loop
/// is polled.
pub(crate) fn open(settings: &ConnectionSettings) -> (BusClient, BusEventLoop) {
    let capacity = request_capacity(settings.subscriptions);
    match settings.version {
        ProtocolVersion::V311 => {
            let mut options =
                rumqttc::MqttOptions::new(&settings.client_id, &settings.host, settings.port);
            options.set_keep_alive(settings.keep_alive);
            options.set_clean_session(true);

            if let Some((username, password)) = &settings.credentials {
                options.set_credentials(username, password);
            }
            if let Some(will) = &settings.last_will {
                options.set_last_will(rumqttc::LastWill::new(
                    will.topic.clone(),
                    will.payload.clone(),
                    rumqttc::QoS::AtLeastOnce,
                    will.retain,
                ));
            }
            if settings.tls {
                options.set_transport(Transport::tls_with_default_config());
            }

            let (client, event_loop) =
                rumqttc::AsyncClient::new(options, capacity);
            (
                BusClient::V311(client),
                BusEventLoop::V311(Box::new(event_loop)),
            )
        }
        ProtocolVersion::V5 => {
            use rumqttc::v5::mqttbytes::QoS;
            use rumqttc::v5::mqttbytes::v5::LastWill;

            let mut options =
                rumqttc::v5::MqttOptions::new(&settings.client_id, &settings.host, settings.port);
            options.set_keep_alive(settings.keep_alive);
            options.set_clean_start(true);

            if let Some((username, password)) = &settings.credentials {
                options.set_credentials(username, password);
            }
            if let Some(will) = &settings.last_will {
                options.set_last_will(LastWill::new(
                    will.topic.clone(),
                    will.payload.clone(),
                    QoS::AtLeastOnce,
                    will.retain,
                    None,
                ));
            }
            if settings.tls {
                options.set_transport(Transport::tls_with_default_config());
            }

            let (client, event_loop) =
                rumqttc::v5::AsyncClient::new(options, capacity);
            (BusClient::V5(client), BusEventLoop::V5(Box::new(event_loop)))
        }
    }
}

impl BusClient {
    /// Queues a subscription without waiting for channel capacity.
    pub(crate) fn try_subscribe(&self, topic: &str) -> Result<(), ProtocolError> {
        match self {
            Self::V311(client) => client.try_subscribe(topic, rumqttc::QoS::AtLeastOnce)?,
            Self::V5(client) => {
                client.try_subscribe(topic, rumqttc::v5::mqttbytes::QoS::AtLeastOnce)?;
            }
        }
        Ok(())
    }

    /// Queues an at-least-once publication, waiting for channel capacity.
    pub(crate) async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
    ) -> Result<(), ProtocolError> {
        match self {
            Self::V311(client) => {
                client
                    .publish(topic, rumqttc::QoS::AtLeastOnce, retain, payload)
                    .await?;
            }
            Self::V5(client) => {
                client
                    .publish(
                        topic,
                        rumqttc::v5::mqttbytes::QoS::AtLeastOnce,
                        retain,
                        payload,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Asks the event loop to send a DISCONNECT packet.
    pub(crate) async fn disconnect(&self) -> Result<(), ProtocolError> {
        match self {
            Self::V311(client) => client.disconnect().await?,
            Self::V5(client) => client.disconnect().await?,
        }
        Ok(())
    }
}

impl BusEventLoop {
    /// Polls the event loop once.
    ///
    /// Returns `None` for traffic the wrapper does not care about (pings,
    /// acknowledgements, outgoing packets other than DISCONNECT).
    pub(crate) async fn poll(&mut self) -> Option<BusEvent> {
        match self {
            Self::V311(event_loop) => {
                use rumqttc::{Event, Outgoing, Packet};

                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                        tracing::debug!(?connack, "MQTT connected");
                        Some(BusEvent::Connected)
                    }
                    Ok(Event::Incoming(Packet::SubAck(suback))) => {
                        tracing::debug!(?suback, "MQTT subscription acknowledged");
                        None
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => Some(BusEvent::Message {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    }),
                    Ok(
                        Event::Incoming(Packet::Disconnect)
                        | Event::Outgoing(Outgoing::Disconnect),
                    ) => Some(BusEvent::Closed),
                    Ok(_) => None,
                    Err(e) => Some(BusEvent::Failed(e.into())),
                }
            }
            Self::V5(event_loop) => {
                use rumqttc::Outgoing;
                use rumqttc::v5::Event;
                use rumqttc::v5::mqttbytes::v5::Packet;

                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                        tracing::debug!(?connack, "MQTT connected");
                        Some(BusEvent::Connected)
                    }
                    Ok(Event::Incoming(Packet::SubAck(suback))) => {
                        tracing::debug!(?suback, "MQTT subscription acknowledged");
                        None
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => Some(BusEvent::Message {
                        topic: String::from_utf8_lossy(&publish.topic).into_owned(),
                        payload: publish.payload.to_vec(),
                    }),
                    Ok(Event::Incoming(Packet::Disconnect(disconnect))) => {
                        tracing::debug!(?disconnect, "MQTT broker sent disconnect");
                        Some(BusEvent::Closed)
                    }
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => Some(BusEvent::Closed),
                    Ok(_) => None,
                    Err(e) => Some(BusEvent::Failed(e.into())),
                }
            }
        }
    }
}
