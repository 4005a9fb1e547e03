//! HTTP transport to the Hue bridge.
//!
//! The bridge exposes a JSON REST API; state changes for one light go to
//! `PUT /api/{key}/lights/{id}/state`.

use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A color command in the transport's native shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorCommand {
    /// CIE xy chromaticity coordinates.
    pub xy: (f64, f64),
    /// Brightness in the unit range. Scaled to the bridge's 0-254 integer
    /// range at the serialization boundary.
    pub bri: f64,
    /// Transition time in the bridge's native 100 ms ticks. None lets the
    /// bridge apply its default transition.
    pub transition_time: Option<u16>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request to bridge failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid light address: {0}")]
    Address(#[from] url::ParseError),
    #[error("bridge rejected command for light {light}: {description}")]
    Api { light: String, description: String },
}

/// The command surface the update cycle drives.
///
/// All network I/O in the driver goes through an implementation of this
/// trait.
pub trait LightTransport {
    /// Switch a light fully on or off.
    fn set_power(&self, fixture: &str, on: bool) -> Result<(), TransportError>;

    /// Query whether a light is currently powered on.
    fn get_power(&self, fixture: &str) -> Result<bool, TransportError>;

    /// Send a color command to a light.
    fn set_color(&self, fixture: &str, command: &ColorCommand) -> Result<(), TransportError>;
}

/// Blocking HTTP client for one Hue bridge.
pub struct HueBridge {
    client: Client,
    base: Url,
}

impl HueBridge {
    /// Set up a client for the bridge at the given network address, using a
    /// pre-provisioned API key.
    ///
    /// Fails fast on a malformed address; network errors surface per-command.
    pub fn new(address: &str, api_key: &str) -> Result<Self> {
        let base = Url::parse(&format!("http://{address}/api/{api_key}/"))
            .with_context(|| format!("invalid bridge address {address}"))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("failed to build http client")?;
        Ok(Self { client, base })
    }

    fn put_state(&self, fixture: &str, update: &StateUpdate) -> Result<(), TransportError> {
        let url = self.base.join(&format!("lights/{fixture}/state"))?;
        let results: Vec<ApiResult> = self
            .client
            .put(url)
            .json(update)
            .send()?
            .error_for_status()?
            .json()?;
        for result in results {
            if let Some(error) = result.error {
                return Err(TransportError::Api {
                    light: fixture.to_string(),
                    description: error.description,
                });
            }
        }
        Ok(())
    }
}

impl LightTransport for HueBridge {
    fn set_power(&self, fixture: &str, on: bool) -> Result<(), TransportError> {
        debug!("setting power for light {fixture}: {on}");
        self.put_state(
            fixture,
            &StateUpdate {
                on: Some(on),
                ..Default::default()
            },
        )
    }

    fn get_power(&self, fixture: &str) -> Result<bool, TransportError> {
        let url = self.base.join(&format!("lights/{fixture}"))?;
        let status: LightStatus = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(status.state.on)
    }

    fn set_color(&self, fixture: &str, command: &ColorCommand) -> Result<(), TransportError> {
        debug!("setting color for light {fixture}: {command:?}");
        self.put_state(
            fixture,
            &StateUpdate {
                xy: Some([command.xy.0, command.xy.1]),
                bri: Some(unit_to_bri(command.bri)),
                transition_time: command.transition_time,
                ..Default::default()
            },
        )
    }
}

/// The bridge's wire format for a light state change.
#[derive(Debug, Default, Serialize)]
struct StateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    xy: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bri: Option<u8>,
    #[serde(rename = "transitiontime", skip_serializing_if = "Option::is_none")]
    transition_time: Option<u16>,
}

#[derive(Deserialize)]
struct LightStatus {
    state: LightState,
}

#[derive(Deserialize)]
struct LightState {
    on: bool,
}

/// One entry of the bridge's response array; a successful command echoes
/// the applied state, a failed one carries an error object.
#[derive(Deserialize)]
struct ApiResult {
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    description: String,
}

/// Scale unit-range brightness to the bridge's 0-254 integer range.
fn unit_to_bri(v: f64) -> u8 {
    (v * 254.).round() as u8
}
