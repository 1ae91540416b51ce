// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT plumbing.
//!
//! - [`Topic`] - Parsed topic with a lazily compiled wildcard matcher
//! - [`MessageHandler`] - Handler invoked for each matching message
//! - [`MqttWrapper`] - Broker connection with validation and dispatch

mod connection;
mod handler;
mod topic;
mod wrapper;

pub use connection::{LastWillMessage, ProtocolVersion};
pub use handler::{HandlerFuture, MessageHandler};
pub use rumqttc::v5::mqttbytes::v5::PubAckReason;
pub use topic::{Captures, MULTI_LEVEL_WILDCARD, SEPARATOR, SINGLE_LEVEL_WILDCARD, Topic};
pub use wrapper::{MqttWrapper, PublishOptions};
