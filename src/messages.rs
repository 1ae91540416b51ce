// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status messages published on `<prefix>/status`.

use serde::{Deserialize, Serialize};

/// Information about the Hue Bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeInfo {
    /// Name configured on the hub.
    pub name: String,
    /// MAC address of the hub.
    pub mac_address: String,
    /// Software version the hub reports.
    pub api_version: String,
}

/// Status of the bridge process.
///
/// The offline form is also registered as the MQTT last will, so the broker
/// publishes it if the process goes away without disconnecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hue2MqttStatus {
    pub online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge: Option<BridgeInfo>,
}

impl Hue2MqttStatus {
    /// Online status carrying information about the connected bridge.
    #[must_use]
    pub fn online(bridge: BridgeInfo) -> Self {
        Self {
            online: true,
            bridge: Some(bridge),
        }
    }

    /// Offline status.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            online: false,
            bridge: None,
        }
    }
}
