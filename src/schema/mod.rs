// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data published to and accepted from MQTT.
//!
//! Raw hub resources are validated into these types with
//! [`Resource::from_resource`] before being published:
//!
//! - [`LightInfo`] - `<prefix>/light/<uniqueid>`
//! - [`GroupInfo`] - `<prefix>/group/<id>`
//! - [`SensorInfo`] - `<prefix>/sensor/<uniqueid>`
//!
//! Commands received on `light/+/set` and `group/+/set` are decoded into
//! [`LightSetState`] and [`GroupSetState`].

mod group;
mod light;
mod sensor;

pub use group::{GroupInfo, GroupSetState, GroupState};
pub use light::{LightBaseState, LightInfo, LightSetState, LightState};
pub use sensor::{
    GenericSensorState, HumiditySensorState, LightLevelSensorState, OpenCloseSensorState,
    PresenceSensorState, RotarySensorState, SensorInfo, SensorState, SwitchSensorState,
    TemperatureSensorState,
};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SchemaError;

/// A hub resource that can be validated from its raw JSON.
pub trait Resource: DeserializeOwned {
    /// Validates a raw hub object, adding the hub-assigned `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NotAnObject`] if `raw` is not a JSON object, or
    /// another [`SchemaError`] if a field is missing or has the wrong type.
    fn from_resource(id: u32, raw: Value) -> Result<Self, SchemaError> {
        match raw {
            Value::Object(mut fields) => {
                fields.insert("id".to_string(), Value::from(id));
                Ok(serde_json::from_value(Value::Object(fields))?)
            }
            other => Err(SchemaError::NotAnObject(other.to_string())),
        }
    }
}

impl Resource for LightInfo {}
impl Resource for GroupInfo {}
impl Resource for SensorInfo {}
