// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensors and their readings.
//!
//! The shape of a sensor's `state` depends on its `type`. [`SensorInfo`]
//! reads the type first and validates the state against the matching
//! [`SensorState`] variant.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::SchemaError;

/// Fields present in every sensor state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericSensorState {
    /// When the reading last changed. The hub reports `"none"` for sensors
    /// that never reported.
    #[serde(default, deserialize_with = "deserialize_last_updated")]
    pub lastupdated: Option<NaiveDateTime>,
}

fn deserialize_last_updated<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("none") => Ok(None),
        Some(text) => text
            .parse::<NaiveDateTime>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Motion sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSensorState {
    #[serde(flatten)]
    pub generic: GenericSensorState,
    /// Whether motion was detected.
    pub presence: bool,
}

/// Rotary dial reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotarySensorState {
    #[serde(flatten)]
    pub generic: GenericSensorState,
    /// Phase of the rotation: 1 when it starts, 2 while it repeats.
    pub rotaryevent: i32,
    /// Rotation steps; negative values turn anticlockwise.
    pub expectedrotation: i32,
    /// Expected duration of the event, in milliseconds.
    pub expectedeventduration: u32,
}

/// Button press on a switch or dimmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchSensorState {
    #[serde(flatten)]
    pub generic: GenericSensorState,
    /// Hub event code: button number times 1000 plus the press kind.
    pub buttonevent: u32,
}

/// Ambient light reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightLevelSensorState {
    #[serde(flatten)]
    pub generic: GenericSensorState,
    /// Below the sensor's dark threshold.
    pub dark: bool,
    /// Above the sensor's daylight threshold.
    pub daylight: bool,
    /// Light level as `10000 * log10(lux) + 1`.
    pub lightlevel: u32,
}

/// Temperature in hundredths of a degree Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureSensorState {
    #[serde(flatten)]
    pub generic: GenericSensorState,
    /// Hundredths of a degree Celsius.
    pub temperature: i32,
}

/// Relative humidity in hundredths of a percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumiditySensorState {
    #[serde(flatten)]
    pub generic: GenericSensorState,
    /// Hundredths of a percent.
    pub humidity: u32,
}

/// Door or window contact reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenCloseSensorState {
    #[serde(flatten)]
    pub generic: GenericSensorState,
    /// Whether the contact is open.
    pub open: bool,
}

/// Reading of a sensor, by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SensorState {
    Presence(PresenceSensorState),
    Rotary(RotarySensorState),
    Switch(SwitchSensorState),
    LightLevel(LightLevelSensorState),
    Temperature(TemperatureSensorState),
    Humidity(HumiditySensorState),
    OpenClose(OpenCloseSensorState),
}

impl SensorState {
    /// Validates a raw state for the given hub sensor type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownSensorType`] for types without a known
    /// reading, or [`SchemaError::Invalid`] if the state does not fit.
    pub fn from_value(sensor_type: &str, state: Value) -> Result<Self, SchemaError> {
        let state = match sensor_type {
            "ZLLPresence" | "CLIPPresence" => Self::Presence(serde_json::from_value(state)?),
            "ZLLRelativeRotary" => Self::Rotary(serde_json::from_value(state)?),
            "ZLLSwitch" | "ZGPSwitch" | "CLIPSwitch" => {
                Self::Switch(serde_json::from_value(state)?)
            }
            "ZLLLightLevel" | "CLIPLightLevel" => Self::LightLevel(serde_json::from_value(state)?),
            "ZLLTemperature" | "CLIPTemperature" => {
                Self::Temperature(serde_json::from_value(state)?)
            }
            "CLIPHumidity" => Self::Humidity(serde_json::from_value(state)?),
            "CLIPOpenClose" => Self::OpenClose(serde_json::from_value(state)?),
            other => return Err(SchemaError::UnknownSensorType(other.to_string())),
        };
        Ok(state)
    }

    /// Returns the fields shared by every reading.
    #[must_use]
    pub fn generic(&self) -> &GenericSensorState {
        match self {
            Self::Presence(s) => &s.generic,
            Self::Rotary(s) => &s.generic,
            Self::Switch(s) => &s.generic,
            Self::LightLevel(s) => &s.generic,
            Self::Temperature(s) => &s.generic,
            Self::Humidity(s) => &s.generic,
            Self::OpenClose(s) => &s.generic,
        }
    }
}

/// Information about a physical sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSensorInfo")]
pub struct SensorInfo {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub modelid: String,
    pub manufacturername: String,

    pub productname: String,
    pub uniqueid: String,
    pub swversion: Option<String>,

    pub state: SensorState,
    pub capabilities: Value,
}

/// Sensor as sent by the hub, before its state is validated.
#[derive(Deserialize)]
struct RawSensorInfo {
    id: u32,
    name: String,
    #[serde(rename = "type")]
    sensor_type: String,
    modelid: String,
    manufacturername: String,
    productname: String,
    uniqueid: String,
    #[serde(default)]
    swversion: Option<String>,
    state: Value,
    #[serde(default)]
    capabilities: Value,
}

impl TryFrom<RawSensorInfo> for SensorInfo {
    type Error = SchemaError;

    fn try_from(raw: RawSensorInfo) -> Result<Self, Self::Error> {
        let state = SensorState::from_value(&raw.sensor_type, raw.state)?;
        Ok(Self {
            id: raw.id,
            name: raw.name,
            sensor_type: raw.sensor_type,
            modelid: raw.modelid,
            manufacturername: raw.manufacturername,
            productname: raw.productname,
            uniqueid: raw.uniqueid,
            swversion: raw.swversion,
            state,
            capabilities: raw.capabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Resource;
    use chrono::NaiveDate;
    use serde_json::json;

    fn raw_sensor(sensor_type: &str, state: Value) -> Value {
        json!({
            "state": state,
            "swupdate": {"state": "noupdates"},
            "config": {"on": true, "battery": 100, "reachable": true},
            "name": "Hall sensor",
            "type": sensor_type,
            "modelid": "SML001",
            "manufacturername": "Signify Netherlands B.V.",
            "productname": "Hue motion sensor",
            "swversion": "6.1.1.27575",
            "uniqueid": "00:17:88:01:02:01:64:d0-02-0406",
            "capabilities": {"certified": true, "primary": true}
        })
    }

    #[test]
    fn presence_sensor() {
        let raw = raw_sensor(
            "ZLLPresence",
            json!({"presence": true, "lastupdated": "2021-01-07T21:50:08"}),
        );
        let sensor = SensorInfo::from_resource(12, raw).unwrap();
        assert_eq!(sensor.id, 12);
        assert_eq!(sensor.sensor_type, "ZLLPresence");

        let SensorState::Presence(state) = sensor.state else {
            panic!("expected presence state, got {:?}", sensor.state);
        };
        assert!(state.presence);
        let expected = NaiveDate::from_ymd_opt(2021, 1, 7)
            .unwrap()
            .and_hms_opt(21, 50, 8)
            .unwrap();
        assert_eq!(state.generic.lastupdated, Some(expected));
    }

    #[test]
    fn temperature_sensor() {
        let raw = raw_sensor(
            "ZLLTemperature",
            json!({"temperature": 1875, "lastupdated": "2021-01-07T21:48:12"}),
        );
        let sensor = SensorInfo::from_resource(13, raw).unwrap();
        assert!(matches!(
            sensor.state,
            SensorState::Temperature(TemperatureSensorState {
                temperature: 1875,
                ..
            })
        ));
    }

    #[test]
    fn never_updated_sensor() {
        let raw = raw_sensor("ZLLSwitch", json!({"buttonevent": 1002, "lastupdated": "none"}));
        let sensor = SensorInfo::from_resource(2, raw).unwrap();
        assert_eq!(sensor.state.generic().lastupdated, None);
    }

    #[test]
    fn type_selects_state_shape() {
        let raw = raw_sensor(
            "ZLLLightLevel",
            json!({"presence": true, "lastupdated": "2021-01-07T21:50:08"}),
        );
        assert!(SensorInfo::from_resource(12, raw).is_err());
    }

    #[test]
    fn unknown_sensor_type() {
        let result = SensorState::from_value("Daylight", json!({"daylight": true}));
        assert!(matches!(result, Err(SchemaError::UnknownSensorType(t)) if t == "Daylight"));
    }

    #[test]
    fn virtual_sensor_rejected() {
        let mut raw = raw_sensor("CLIPPresence", json!({"presence": false}));
        let fields = raw.as_object_mut().unwrap();
        fields.remove("uniqueid");
        fields.remove("productname");
        assert!(SensorInfo::from_resource(30, raw).is_err());
    }

    #[test]
    fn serializes_state_without_tag() {
        let raw = raw_sensor(
            "ZLLPresence",
            json!({"presence": false, "lastupdated": "2021-01-07T21:50:08"}),
        );
        let sensor = SensorInfo::from_resource(12, raw).unwrap();
        let value = serde_json::to_value(&sensor).unwrap();
        assert_eq!(value["type"], "ZLLPresence");
        assert_eq!(
            value["state"],
            json!({"presence": false, "lastupdated": "2021-01-07T21:50:08"})
        );
        assert_eq!(value["capabilities"]["certified"], true);
    }
}
