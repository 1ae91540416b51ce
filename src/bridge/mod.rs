// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Hue Bridge side of the application.
//!
//! [`HueBridge`] abstracts the hub client. [`Hue2Mqtt`] publishes what the
//! hub reports and forwards commands received over MQTT back to it.

mod app;

pub use app::{DEFAULT_CLIENT_NAME, Hue2Mqtt};

use std::future::Future;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::BridgeError;
use crate::schema::{GroupSetState, LightSetState};

/// Kind of hub resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A single bulb or fixture.
    Light,
    /// A room, zone or other set of lights.
    Group,
    /// A switch, motion sensor or other input device.
    Sensor,
}

/// A resource as reported by the hub, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct HubResource {
    /// Which collection the resource belongs to.
    pub kind: ResourceKind,
    /// Hub-assigned id.
    pub id: u32,
    /// The hub's JSON object for this resource, without the id.
    pub raw: Value,
}

impl HubResource {
    /// Creates a resource from the hub's JSON for it.
    #[must_use]
    pub fn new(kind: ResourceKind, id: u32, raw: Value) -> Self {
        Self { kind, id, raw }
    }

    /// Returns the resource's display name, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.raw.get("name").and_then(Value::as_str)
    }

    /// Returns the resource's unique id, if it has one.
    #[must_use]
    pub fn uniqueid(&self) -> Option<&str> {
        self.raw.get("uniqueid").and_then(Value::as_str)
    }

    /// Returns whether this is a physical sensor. The hub also exposes
    /// virtual sensors, which have no unique id or product name.
    #[must_use]
    pub fn is_physical_sensor(&self) -> bool {
        self.kind == ResourceKind::Sensor
            && self.raw.get("uniqueid").is_some()
            && self.raw.get("productname").is_some()
    }
}

/// Hub configuration reported by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Name configured on the hub.
    pub name: String,
    /// MAC address of the hub.
    pub mac_address: String,
    /// Version of the hub's software.
    pub software_version: String,
}

/// A Hue Bridge client.
pub trait HueBridge: Send + Sync + 'static {
    /// Opens the session with the hub.
    ///
    /// Fails with [`BridgeError::Unauthorized`] if the hub rejects the
    /// configured username.
    fn connect(&self) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Returns the hub's configuration.
    fn config(&self) -> BridgeConfig;

    /// Returns every light.
    fn lights(&self) -> Vec<HubResource>;

    /// Returns every group.
    fn groups(&self) -> Vec<HubResource>;

    /// Returns every sensor, virtual ones included.
    fn sensors(&self) -> Vec<HubResource>;

    /// Returns a channel of resources as they change. The channel closes
    /// when the hub stops reporting.
    fn listen_events(&self) -> mpsc::Receiver<HubResource>;

    /// Applies a state change to a light.
    fn set_light_state(
        &self,
        id: u32,
        state: LightSetState,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Applies an action to every light of a group.
    fn set_group_action(
        &self,
        id: u32,
        state: GroupSetState,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;
}
