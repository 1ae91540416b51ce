// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `hue2mqtt` library.
//!
//! Each concern has its own error enum: topic grammar, broker communication,
//! configuration loading, and validation of hub payloads. They all convert
//! into the top-level [`Error`].

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// A topic string was malformed or unusable for the requested operation.
    #[error("topic error: {0}")]
    Topic(#[from] TopicError),

    /// Communication with the MQTT broker failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Hub data did not match the expected schema.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The hub rejected or failed a request.
    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// A payload could not be serialized for publication.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors related to the MQTT topic grammar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopicError {
    /// The topic string is empty, a lone separator, or starts or ends with `/`.
    #[error("invalid topic {topic:?}: {reason}")]
    Invalid {
        /// The rejected topic string.
        topic: String,
        /// Why the topic was rejected.
        reason: &'static str,
    },

    /// The topic contains a wildcard segment and cannot be published to.
    #[error("cannot publish to MQTT topic: {0}")]
    Unpublishable(String),

    /// A literal segment produced a pattern the regex engine rejects.
    #[error("topic {topic:?} does not compile to a matcher: {message}")]
    Pattern {
        /// The topic whose matcher failed to compile.
        topic: String,
        /// The regex engine's description of the failure.
        message: String,
    },
}

/// Errors related to communication with the MQTT broker.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT 3.1.1 connection failure, passed through unchanged.
    #[error(transparent)]
    Connection(#[from] rumqttc::ConnectionError),

    /// MQTT 5 connection failure, passed through unchanged.
    #[error(transparent)]
    ConnectionV5(#[from] rumqttc::v5::ConnectionError),

    /// MQTT 3.1.1 request could not be handed to the event loop.
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// MQTT 5 request could not be handed to the event loop.
    #[error("MQTT client error: {0}")]
    ClientV5(#[from] rumqttc::v5::ClientError),

    /// The broker did not acknowledge the connection in time.
    #[error("connection timed out after {0} s")]
    ConnectionTimeout(u64),

    /// The event loop stopped before the broker acknowledged the connection.
    #[error("connection closed before it was acknowledged")]
    ConnectionClosed,

    /// The client still reported a connection after disconnecting.
    #[error("disconnection was attempted, but was unsuccessful")]
    DisconnectFailed,
}

/// Errors related to loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file exists at any of the searched locations.
    #[error("unable to find config file (searched: {0})")]
    NotFound(String),

    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for the expected schema.
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors related to validating raw hub data.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The hub resource is not a JSON object.
    #[error("expected a JSON object, got: {0}")]
    NotAnObject(String),

    /// The sensor type has no known state shape.
    #[error("unknown sensor type: {0}")]
    UnknownSensorType(String),

    /// A field is missing or has the wrong type.
    #[error("invalid data: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Errors reported by the hub.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The hub rejected the configured credentials.
    #[error("bridge rejected credentials")]
    Unauthorized,

    /// The addressed resource does not exist on the hub.
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// The hub returned an error for a request.
    #[error("request failed: {0}")]
    RequestFailed(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
