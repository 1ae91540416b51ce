// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `hue2mqtt` - Bridge Philips Hue lights, groups and sensors to MQTT.
//!
//! The library has two layers:
//!
//! - [`mqtt`]: topic parsing and wildcard matching, and [`MqttWrapper`], an
//!   MQTT client that prefixes and validates topics and dispatches incoming
//!   messages to handlers registered per topic pattern.
//! - [`bridge`]: [`Hue2Mqtt`], which publishes the state of a [`HueBridge`]
//!   as retained JSON messages and applies commands received over MQTT.
//!
//! # Topics
//!
//! With the default prefix `hue2mqtt`:
//!
//! | Topic | Direction | Payload |
//! |-------|-----------|---------|
//! | `hue2mqtt/status` | published, retained | [`Hue2MqttStatus`] |
//! | `hue2mqtt/light/<uniqueid>` | published, retained | [`LightInfo`](schema::LightInfo) |
//! | `hue2mqtt/group/<id>` | published, retained | [`GroupInfo`](schema::GroupInfo) |
//! | `hue2mqtt/sensor/<uniqueid>` | published, retained | [`SensorInfo`](schema::SensorInfo) |
//! | `hue2mqtt/light/<uniqueid>/set` | subscribed | [`LightSetState`](schema::LightSetState) |
//! | `hue2mqtt/group/<id>/set` | subscribed | [`GroupSetState`](schema::GroupSetState) |
//!
//! # Quick Start
//!
//! ```no_run
//! use hue2mqtt::config::MqttBrokerInfo;
//! use hue2mqtt::mqtt::{Captures, MqttWrapper, PublishOptions};
//!
//! #[tokio::main]
//! async fn main() -> hue2mqtt::Result<()> {
//!     let info = MqttBrokerInfo::new("192.168.1.50", 1883);
//!     let wrapper = MqttWrapper::new("my-client", info, None::<&()>)?;
//!
//!     // Receives hue2mqtt/light/<anything>
//!     wrapper.subscribe("light/+", |captures: Captures, payload: String| async move {
//!         println!("light {:?}: {payload}", captures.get(0));
//!     })?;
//!
//!     wrapper.connect().await?;
//!     wrapper
//!         .publish("hello", &serde_json::json!({"hi": true}), PublishOptions::default())
//!         .await?;
//!     wrapper.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod messages;
pub mod mqtt;
pub mod schema;

pub use bridge::{Hue2Mqtt, HueBridge};
pub use config::{Hue2MqttConfig, HueBridgeInfo, MqttBrokerInfo};
pub use error::{BridgeError, ConfigError, Error, ProtocolError, Result, SchemaError, TopicError};
pub use messages::{BridgeInfo, Hue2MqttStatus};
pub use mqtt::{Captures, MessageHandler, MqttWrapper, PublishOptions, Topic};
