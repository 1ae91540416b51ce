// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light states and light information.

use serde::{Deserialize, Serialize};

/// Attributes shared by readable and settable light states.
///
/// Every attribute is optional: a light only reports what it supports, and
/// a command only carries what it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightBaseState {
    /// Power state.
    #[serde(default)]
    pub on: Option<bool>,
    /// Alert effect, e.g. `"select"` or `"lselect"`.
    #[serde(default)]
    pub alert: Option<String>,
    /// Brightness, 1-254.
    #[serde(default)]
    pub bri: Option<u8>,
    /// Color temperature in mireds.
    #[serde(default)]
    pub ct: Option<u16>,
    /// Dynamic effect, e.g. `"colorloop"`.
    #[serde(default)]
    pub effect: Option<String>,
    /// Hue, 0-65535.
    #[serde(default)]
    pub hue: Option<u16>,
    /// Saturation, 0-254.
    #[serde(default)]
    pub sat: Option<u8>,
    /// CIE color space coordinates.
    #[serde(default)]
    pub xy: Option<(f64, f64)>,
    /// Transition duration in multiples of 100 ms.
    #[serde(default)]
    pub transitiontime: Option<u16>,
}

/// Settable states of a light.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightSetState {
    #[serde(flatten)]
    pub base: LightBaseState,
    #[serde(default)]
    pub bri_inc: Option<i16>,
    #[serde(default)]
    pub sat_inc: Option<i16>,
    #[serde(default)]
    pub hue_inc: Option<i32>,
    #[serde(default)]
    pub ct_inc: Option<i32>,
    #[serde(default)]
    pub xy_inc: Option<f64>,
}

/// Readable state of a light.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightState {
    #[serde(flatten)]
    pub base: LightBaseState,
    /// Whether the bridge can reach the light.
    #[serde(default)]
    pub reachable: Option<bool>,
    /// Which attribute last set the color: `"hs"`, `"xy"` or `"ct"`.
    #[serde(default, rename = "colormode")]
    pub color_mode: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// Information about a light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightInfo {
    pub id: u32,
    pub name: String,
    pub uniqueid: String,
    #[serde(default)]
    pub state: Option<LightState>,

    pub manufacturername: String,
    pub modelid: String,
    pub productname: String,
    #[serde(rename = "type")]
    pub light_type: String,

    pub swversion: String,
}
