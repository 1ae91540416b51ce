// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Hue to MQTT application.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::config::Hue2MqttConfig;
use crate::error::{BridgeError, Error, Result};
use crate::messages::{BridgeInfo, Hue2MqttStatus};
use crate::mqtt::{Captures, MqttWrapper, PublishOptions};
use crate::schema::{GroupInfo, GroupSetState, LightInfo, LightSetState, Resource, SensorInfo};

use super::{HubResource, HueBridge, ResourceKind};

/// Client name used when none is given.
pub const DEFAULT_CLIENT_NAME: &str = "hue2mqtt";

/// Hue to MQTT bridge.
///
/// Publishes every light, group and sensor of a [`HueBridge`] as retained
/// JSON messages, keeps them up to date, and applies commands received on
/// `<prefix>/light/<uniqueid>/set` and `<prefix>/group/<id>/set`.
///
/// # Examples
///
/// ```no_run
/// # use hue2mqtt::bridge::{Hue2Mqtt, HueBridge};
/// # use hue2mqtt::config::Hue2MqttConfig;
/// # async fn example(bridge: impl HueBridge) -> hue2mqtt::Result<()> {
/// let config = Hue2MqttConfig::load(None)?;
/// let app = Hue2Mqtt::new(config, bridge)?;
///
/// let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
/// # drop(stop_tx);
/// app.run(async {
///     let _ = stop_rx.await;
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub struct Hue2Mqtt<B: HueBridge> {
    config: Hue2MqttConfig,
    bridge: Arc<B>,
    mqtt: MqttWrapper,
    halt_tx: watch::Sender<bool>,
}

impl<B: HueBridge> Hue2Mqtt<B> {
    /// Creates the application with the default client name.
    ///
    /// # Errors
    ///
    /// Returns an error if the MQTT wrapper cannot be set up, e.g. because
    /// the configured topic prefix is not a valid topic.
    pub fn new(config: Hue2MqttConfig, bridge: B) -> Result<Self> {
        Self::with_client_name(DEFAULT_CLIENT_NAME, config, bridge)
    }

    /// Creates the application with the given MQTT client name.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_client_name(
        client_name: impl Into<String>,
        config: Hue2MqttConfig,
        bridge: B,
    ) -> Result<Self> {
        let mqtt = MqttWrapper::new(
            client_name,
            config.mqtt.clone(),
            Some(&Hue2MqttStatus::offline()),
        )?;
        let bridge = Arc::new(bridge);

        let light_bridge = Arc::clone(&bridge);
        mqtt.subscribe("light/+/set", move |captures: Captures, payload: String| {
            let bridge = Arc::clone(&light_bridge);
            async move { handle_set_light(bridge.as_ref(), &captures, &payload).await }
        })?;

        let group_bridge = Arc::clone(&bridge);
        mqtt.subscribe("group/+/set", move |captures: Captures, payload: String| {
            let bridge = Arc::clone(&group_bridge);
            async move { handle_set_group(bridge.as_ref(), &captures, &payload).await }
        })?;

        let (halt_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            bridge,
            mqtt,
            halt_tx,
        })
    }

    /// Returns the MQTT wrapper.
    #[must_use]
    pub fn mqtt(&self) -> &MqttWrapper {
        &self.mqtt
    }

    /// Returns the hub client.
    #[must_use]
    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// Asks a running [`run`](Self::run) to stop. If called before `run`,
    /// `run` stops as soon as the initial state is published.
    pub fn halt(&self) {
        tracing::info!("Halt requested");
        self.halt_tx.send_replace(true);
    }

    /// Runs the bridge.
    ///
    /// Connects to the broker and the hub, publishes the online status and
    /// the state of every resource, then publishes updates until the hub's
    /// update channel closes, `shutdown` resolves, or [`halt`](Self::halt) is
    /// called. Finally publishes the offline status and disconnects.
    ///
    /// # Errors
    ///
    /// Returns an error if the broker connection fails, the hub rejects the
    /// connection, or the initial state cannot be published.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            "Hue2MQTT - Hue to MQTT Bridge"
        );

        self.mqtt.connect().await?;
        tracing::info!("Connected to MQTT Broker");

        tracing::info!(ip = %self.config.hue.ip, "Connecting to Hue Bridge");
        if let Err(e) = self.bridge.connect().await {
            if e == BridgeError::Unauthorized {
                tracing::error!("Bridge rejected credentials");
            } else {
                tracing::error!(error = %e, "Unable to connect to Hue Bridge");
            }
            return Err(self.shut_down_after(e.into()).await);
        }

        if let Err(e) = self.publish_bridge_status(true).await {
            return Err(self.shut_down_after(e).await);
        }
        if let Err(e) = self.publish_snapshot().await {
            return Err(self.shut_down_after(e).await);
        }

        let mut updates = self.bridge.listen_events();
        let mut halt_rx = self.halt_tx.subscribe();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                _ = halt_rx.wait_for(|halted| *halted) => {
                    break;
                }
                update = updates.recv() => {
                    let Some(resource) = update else {
                        tracing::warn!("Hue Bridge stopped reporting updates");
                        break;
                    };
                    if let Err(e) = self.publish_resource(resource).await {
                        tracing::error!(error = %e, "Failed to publish update");
                    }
                }
            }
        }

        self.stop_mqtt().await
    }

    /// Leaves the broker after a startup failure and returns that failure.
    async fn shut_down_after(&self, error: Error) -> Error {
        if let Err(e) = self.stop_mqtt().await {
            tracing::warn!(error = %e, "Failed to disconnect from MQTT Broker");
        }
        error
    }

    async fn stop_mqtt(&self) -> Result<()> {
        tracing::info!("Disconnecting from MQTT Broker");
        self.publish_bridge_status(false).await?;
        self.mqtt.disconnect().await?;
        Ok(())
    }

    async fn publish_bridge_status(&self, online: bool) -> Result<()> {
        let status = if online {
            let config = self.bridge.config();
            tracing::info!(
                name = %config.name,
                mac = %config.mac_address,
                api_version = %config.software_version,
                "Hue Bridge connected"
            );
            Hue2MqttStatus::online(BridgeInfo {
                name: config.name,
                mac_address: config.mac_address,
                api_version: config.software_version,
            })
        } else {
            Hue2MqttStatus::offline()
        };

        self.mqtt
            .publish("status", &status, PublishOptions::default().retain())
            .await
    }

    /// Publishes every light, group and physical sensor.
    async fn publish_snapshot(&self) -> Result<()> {
        let resources = self
            .bridge
            .lights()
            .into_iter()
            .chain(self.bridge.groups())
            .chain(self.bridge.sensors());

        for resource in resources {
            self.publish_resource(resource).await?;
        }
        Ok(())
    }

    /// Validates and publishes one resource. Resources that fail validation
    /// are logged and skipped.
    async fn publish_resource(&self, resource: HubResource) -> Result<()> {
        if resource.kind == ResourceKind::Sensor && !resource.is_physical_sensor() {
            tracing::debug!(id = resource.id, name = ?resource.name(), "Ignoring virtual sensor");
            return Ok(());
        }

        let HubResource { kind, id, raw } = resource;
        match kind {
            ResourceKind::Light => match LightInfo::from_resource(id, raw) {
                Ok(light) => {
                    self.publish_retained(&format!("light/{}", light.uniqueid), &light)
                        .await
                }
                Err(e) => {
                    tracing::warn!(id, error = %e, "Invalid light");
                    Ok(())
                }
            },
            ResourceKind::Group => match GroupInfo::from_resource(id, raw) {
                Ok(group) => self.publish_retained(&format!("group/{}", group.id), &group).await,
                Err(e) => {
                    tracing::warn!(id, error = %e, "Invalid group");
                    Ok(())
                }
            },
            ResourceKind::Sensor => match SensorInfo::from_resource(id, raw) {
                Ok(sensor) => {
                    self.publish_retained(&format!("sensor/{}", sensor.uniqueid), &sensor)
                        .await
                }
                Err(e) => {
                    tracing::warn!(id, error = %e, "Invalid sensor");
                    Ok(())
                }
            },
        }
    }

    /// Publishes a retained message. Topic errors only skip the message.
    async fn publish_retained<T: Serialize + Sync>(&self, topic: &str, payload: &T) -> Result<()> {
        match self
            .mqtt
            .publish(topic, payload, PublishOptions::default().retain())
            .await
        {
            Err(Error::Topic(e)) => {
                tracing::warn!(error = %e, "Skipping resource with unusable topic");
                Ok(())
            }
            other => other,
        }
    }
}

impl<B: HueBridge> std::fmt::Debug for Hue2Mqtt<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hue2Mqtt")
            .field("hue", &self.config.hue.ip)
            .field("mqtt", &self.mqtt)
            .finish_non_exhaustive()
    }
}

/// Decodes a command payload into a settable state, logging why it was
/// rejected.
fn decode_command<T: DeserializeOwned>(payload: &str) -> Option<T> {
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(payload, "Bad JSON on light request");
            return None;
        }
    };

    if !value.is_object() {
        tracing::warn!(payload, "Expected dictionary");
        return None;
    }

    match serde_json::from_value(value) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!(error = %e, "Invalid light state");
            None
        }
    }
}

async fn handle_set_light<B: HueBridge>(bridge: &B, captures: &Captures, payload: &str) {
    let Some(uniqueid) = captures.get(0) else {
        return;
    };

    let Some(light) = bridge
        .lights()
        .into_iter()
        .find(|light| light.uniqueid() == Some(uniqueid))
    else {
        tracing::warn!(uniqueid, "Unknown light uniqueid");
        return;
    };

    let Some(state) = decode_command::<LightSetState>(payload) else {
        return;
    };

    tracing::info!(light = light.name().unwrap_or_default(), "Updating light");
    if let Err(e) = bridge.set_light_state(light.id, state).await {
        tracing::warn!(uniqueid, error = %e, "Failed to update light");
    }
}

async fn handle_set_group<B: HueBridge>(bridge: &B, captures: &Captures, payload: &str) {
    let Some(group_id) = captures.get(0) else {
        return;
    };

    let group = group_id
        .parse::<u32>()
        .ok()
        .and_then(|id| bridge.groups().into_iter().find(|group| group.id == id));
    let Some(group) = group else {
        tracing::warn!(group_id, "Unknown group id");
        return;
    };

    let Some(state) = decode_command::<GroupSetState>(payload) else {
        return;
    };

    tracing::info!(group = group.name().unwrap_or_default(), "Updating group");
    if let Err(e) = bridge.set_group_action(group.id, state).await {
        tracing::warn!(group_id, error = %e, "Failed to update group");
    }
}
