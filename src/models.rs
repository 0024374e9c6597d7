// models.rs
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    color::RgbColor,
    config::Topics,
    error::LampError,
    events::Bus,
    lamp::{ColorMode, LampCommand, PowerToken},
};

/// A raw message on the bus, as carried over a WebSocket session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BusMessage {
    pub topic: String,
    pub payload: String,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Payload of the command topic. Every key is optional and unknown keys are ignored.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CommandPayload {
    /// `ON` or `OFF`. Any other value is reported and ignored.
    #[schema(value_type = Option<String>)]
    pub state: Option<serde_json::Value>,
    #[validate(range(min = 0, max = 100))]
    pub brightness: Option<i64>,
    /// Mireds
    #[validate(range(min = 153, max = 500))]
    pub color_temp: Option<i64>,
    #[validate(nested)]
    pub color: Option<ColorCommand>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ColorCommand {
    #[validate(range(min = 0, max = 255))]
    pub r: i64,
    #[validate(range(min = 0, max = 255))]
    pub g: i64,
    #[validate(range(min = 0, max = 255))]
    pub b: i64,
}

impl CommandPayload {
    /// Parse and validate a raw command. Nothing is returned unless the whole payload is valid.
    pub fn decode(raw: &str) -> Result<LampCommand, LampError> {
        let payload: CommandPayload = serde_json::from_str(raw)?;
        payload.validate()?;
        Ok(payload.into_command())
    }

    // Ranges are checked by `validate`, so the narrowing casts below are lossless.
    fn into_command(self) -> LampCommand {
        LampCommand {
            state: self.state.map(|value| match value {
                serde_json::Value::String(token) => PowerToken::from(token.as_str()),
                other => PowerToken::Unrecognized(other.to_string()),
            }),
            brightness: self.brightness.map(|value| value as u8),
            color_temp: self.color_temp.map(|value| value as u16),
            color: self
                .color
                .map(|c| RgbColor::new(c.r as u8, c.g as u8, c.b as u8)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ColorPayload {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl From<RgbColor> for ColorPayload {
    fn from(color: RgbColor) -> Self {
        Self {
            r: color.r,
            g: color.g,
            b: color.b,
        }
    }
}

impl From<ColorPayload> for RgbColor {
    fn from(color: ColorPayload) -> Self {
        RgbColor::new(color.r, color.g, color.b)
    }
}

/// Payload of the state topic. Both color axes are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatePayload {
    pub state: String,
    pub color_mode: ColorMode,
    pub brightness: u8,
    pub color_temp: u16,
    pub color: ColorPayload,
}

impl StatePayload {
    /// Command that reproduces this state. Only the active color axis is carried,
    /// since a color temperature would otherwise always win.
    pub fn to_command(&self) -> LampCommand {
        let (color_temp, color) = match self.color_mode {
            ColorMode::ColorTemp => (Some(self.color_temp), None),
            ColorMode::Rgb => (None, Some(self.color.into())),
        };
        LampCommand {
            state: Some(PowerToken::from(self.state.as_str())),
            brightness: Some(self.brightness),
            color_temp,
            color,
        }
    }

    pub fn to_json(&self) -> Result<String, LampError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone)]
pub struct ClientEntry {
    pub connected_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct AppState {
    pub bus: Bus,
    pub topics: Topics,
    pub clients: DashMap<Uuid, ClientEntry>,
    pub latest: watch::Receiver<StatePayload>,
    pub max_connections: u32,
    connections: AtomicUsize,
}

impl AppState {
    pub fn new(
        bus: Bus,
        topics: Topics,
        latest: watch::Receiver<StatePayload>,
        max_connections: u32,
    ) -> Self {
        Self {
            bus,
            topics,
            clients: DashMap::new(),
            latest,
            max_connections,
            connections: AtomicUsize::new(0),
        }
    }

    /// Claim a session slot, or `None` when `max_connections` are already taken.
    pub fn reserve_client(&self) -> Option<Uuid> {
        let limit = self.max_connections as usize;
        self.connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < limit).then_some(count + 1)
            })
            .ok()?;

        let client_id = Uuid::new_v4();
        self.clients.insert(
            client_id,
            ClientEntry {
                connected_at: Utc::now(),
            },
        );
        Some(client_id)
    }

    pub fn release_client(&self, client_id: Uuid) -> Option<ClientEntry> {
        let (_, entry) = self.clients.remove(&client_id)?;
        self.connections.fetch_sub(1, Ordering::AcqRel);
        Some(entry)
    }

    pub fn client_count(&self) -> usize {
        self.connections.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lamp::{Calibration, LampState};

    #[test]
    fn decodes_partial_command() {
        let command = CommandPayload::decode(r#"{"state": "OFF", "brightness": 0}"#).unwrap();
        assert_eq!(command.state, Some(PowerToken::Off));
        assert_eq!(command.brightness, Some(0));
        assert_eq!(command.color_temp, None);
        assert_eq!(command.color, None);
    }

    #[test]
    fn decodes_color() {
        let command = CommandPayload::decode(r#"{"color": {"r": 255, "g": 128, "b": 0}}"#).unwrap();
        assert_eq!(command.color, Some(RgbColor::new(255, 128, 0)));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let command = CommandPayload::decode(r#"{"effect": "rainbow", "transition": 2}"#).unwrap();
        assert!(command.is_empty());
    }

    #[test]
    fn null_counts_as_absent() {
        let command = CommandPayload::decode(r#"{"brightness": null}"#).unwrap();
        assert!(command.is_empty());
    }

    #[test]
    fn non_string_state_keeps_other_fields() {
        let command = CommandPayload::decode(r#"{"state": true, "brightness": 40}"#).unwrap();
        assert_eq!(command.state, Some(PowerToken::Unrecognized("true".into())));
        assert_eq!(command.brightness, Some(40));

        let command = CommandPayload::decode(r#"{"state": 1}"#).unwrap();
        assert_eq!(command.state, Some(PowerToken::Unrecognized("1".into())));
    }

    #[test]
    fn malformed_payload_is_decode_error() {
        for raw in ["not json", "[1, 2]", r#"{"brightness": "high"}"#, r#"{"color": {"r": 1}}"#] {
            assert!(
                matches!(CommandPayload::decode(raw), Err(LampError::Decode(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn out_of_range_values_are_validation_errors() {
        for raw in [
            r#"{"brightness": 101}"#,
            r#"{"brightness": -1}"#,
            r#"{"color_temp": 100}"#,
            r#"{"color_temp": 501}"#,
            r#"{"color": {"r": 256, "g": 0, "b": 0}}"#,
            r#"{"state": "ON", "color": {"r": 0, "g": -5, "b": 0}}"#,
        ] {
            assert!(
                matches!(CommandPayload::decode(raw), Err(LampError::Validation(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn state_round_trips_through_command() {
        let calibration = Calibration::default();
        let commands = [
            r#"{"state": "ON", "color": {"r": 200, "g": 10, "b": 90}, "brightness": 40}"#,
            r#"{"color_temp": 420, "brightness": 75}"#,
            r#"{"state": "OFF"}"#,
        ];
        for raw in commands {
            let mut lamp = LampState::new();
            let _ = lamp.apply(CommandPayload::decode(raw).unwrap());
            let output = lamp.output(&calibration);

            let json = lamp.serialize().to_json().unwrap();
            let state: StatePayload = serde_json::from_str(&json).unwrap();
            let _ = lamp.apply(state.to_command());

            assert_eq!(lamp.output(&calibration), output, "{raw}");
        }
    }

    fn app_state(max_connections: u32) -> AppState {
        let (bus, _inbound) = Bus::new(1);
        let (_latest_tx, latest) = watch::channel(LampState::new().serialize());
        let topics = Topics {
            state: "lamp/cat".into(),
            command: "lamp/cat/set".into(),
        };
        AppState::new(bus, topics, latest, max_connections)
    }

    #[test]
    fn reservations_stop_at_the_limit() {
        let state = app_state(2);
        let first = state.reserve_client().unwrap();
        let second = state.reserve_client().unwrap();
        assert_ne!(first, second);
        assert!(state.reserve_client().is_none());
        assert_eq!(state.clients.len(), 2);

        assert!(state.release_client(first).is_some());
        assert!(state.release_client(first).is_none());
        assert_eq!(state.client_count(), 1);
        assert!(state.reserve_client().is_some());
        assert!(state.reserve_client().is_none());
    }

    #[test]
    fn concurrent_reservations_respect_the_limit() {
        let state = app_state(4);
        let granted = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..32)
                .map(|_| scope.spawn(|| state.reserve_client()))
                .collect();
            handles
                .into_iter()
                .filter_map(|handle| handle.join().unwrap())
                .count()
        });
        assert_eq!(granted, 4);
        assert_eq!(state.clients.len(), 4);
    }

    #[test]
    fn state_payload_always_has_both_axes() {
        let json = LampState::new().serialize().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in ["state", "color_mode", "brightness", "color_temp", "color"] {
            assert!(value.get(key).is_some(), "{key}");
        }
        assert_eq!(value["color_mode"], "color_temp");
    }
}
