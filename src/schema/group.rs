// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light groups.

use serde::{Deserialize, Deserializer, Serialize};

use super::light::{LightSetState, LightState};

/// Settable states of a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSetState {
    #[serde(flatten)]
    pub light: LightSetState,
    /// Scene to recall.
    #[serde(default)]
    pub scene: Option<String>,
}

/// Aggregate power state of the lights in a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupState {
    pub all_on: bool,
    pub any_on: bool,
}

/// Information about a light group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: u32,
    pub name: String,
    #[serde(deserialize_with = "deserialize_ids")]
    pub lights: Vec<u32>,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub sensors: Vec<u32>,
    #[serde(rename = "type")]
    pub group_type: String,
    pub state: GroupState,

    /// Room class, e.g. `"Living room"`. Only rooms have one.
    #[serde(rename = "class", default)]
    pub group_class: Option<String>,

    /// The last action sent to the group.
    pub action: LightState,
}

/// The hub reports member ids as strings; accept numbers too.
fn deserialize_ids<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u32),
        Text(String),
    }

    Vec::<Id>::deserialize(deserializer)?
        .into_iter()
        .map(|id| match id {
            Id::Number(n) => Ok(n),
            Id::Text(text) => text
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid id: {text:?}"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Resource;
    use serde_json::json;

    fn raw_room() -> serde_json::Value {
        json!({
            "name": "Living room",
            "lights": ["1", "2", "5"],
            "sensors": [],
            "type": "Room",
            "state": {"all_on": false, "any_on": true},
            "recycle": false,
            "class": "Living room",
            "action": {
                "on": true,
                "bri": 254,
                "alert": "select",
                "colormode": "ct",
                "ct": 366
            }
        })
    }

    #[test]
    fn group_from_hub_data() {
        let group = GroupInfo::from_resource(3, raw_room()).unwrap();
        assert_eq!(group.id, 3);
        assert_eq!(group.lights, [1, 2, 5]);
        assert!(group.sensors.is_empty());
        assert_eq!(group.group_type, "Room");
        assert_eq!(group.group_class.as_deref(), Some("Living room"));
        assert!(group.state.any_on);
        assert_eq!(group.action.base.ct, Some(366));
    }

    #[test]
    fn group_class_uses_wire_name() {
        let group = GroupInfo::from_resource(3, raw_room()).unwrap();
        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(value["class"], "Living room");
        assert!(value.get("group_class").is_none());
    }

    #[test]
    fn numeric_ids_accepted() {
        let mut raw = raw_room();
        raw["lights"] = json!([4, "6"]);
        let group = GroupInfo::from_resource(3, raw).unwrap();
        assert_eq!(group.lights, [4, 6]);
    }

    #[test]
    fn non_numeric_id_rejected() {
        let mut raw = raw_room();
        raw["lights"] = json!(["lamp"]);
        assert!(GroupInfo::from_resource(3, raw).is_err());
    }

    #[test]
    fn lightgroup_without_class() {
        let mut raw = raw_room();
        raw.as_object_mut().unwrap().remove("class");
        raw["type"] = json!("LightGroup");
        let group = GroupInfo::from_resource(0, raw).unwrap();
        assert_eq!(group.group_class, None);
    }

    #[test]
    fn set_state_with_scene() {
        let state: GroupSetState =
            serde_json::from_str(r#"{"scene": "AB34EF5", "transitiontime": 10}"#).unwrap();
        assert_eq!(state.scene.as_deref(), Some("AB34EF5"));
        assert_eq!(state.light.base.transitiontime, Some(10));
    }
}
