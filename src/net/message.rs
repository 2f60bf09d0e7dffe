use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::vector::Vector2;
use crate::domain::weapon::WeaponType;
use crate::error::{ArenaError, ArenaResult};

/// Wire envelope every frame uses in both directions: `{ type, timestamp, data }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: i64,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(kind: &str, timestamp: i64, data: Value) -> Self {
        Self {
            kind: kind.to_string(),
            timestamp,
            data,
        }
    }

    pub fn encode(&self) -> ArenaResult<String> {
        serde_json::to_string(self).map_err(|_| ArenaError::DeserializationFailure)
    }

    pub fn decode(raw: &str) -> ArenaResult<Self> {
        serde_json::from_str(raw).map_err(|_| ArenaError::InvalidFrame)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputStatePayload {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    #[serde(rename = "aimAngle")]
    pub aim_angle: f64,
    #[serde(rename = "isSprinting")]
    pub is_sprinting: bool,
    pub sequence: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShootPayload {
    #[serde(rename = "aimAngle")]
    pub aim_angle: f64,
    #[serde(rename = "clientTimestamp")]
    pub client_timestamp: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeleePayload {
    #[serde(rename = "aimAngle")]
    pub aim_angle: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RollPayload {
    pub direction: Option<Vector2>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PickupPayload {
    #[serde(rename = "crateId")]
    pub crate_id: String,
}

/// The six client-originated message kinds (spec.md §6); `respawn_request`
/// and `reload` carry no fields of their own.
#[derive(Debug, Clone)]
pub enum ClientMessage {
    InputState(InputStatePayload),
    Shoot(ShootPayload),
    Reload,
    Melee(MeleePayload),
    Roll(RollPayload),
    Pickup(PickupPayload),
    RespawnRequest,
}

impl ClientMessage {
    pub fn from_envelope(envelope: &Envelope) -> ArenaResult<Self> {
        let parse = |data: &Value| -> ArenaResult<_> {
            serde_json::from_value(data.clone()).map_err(|_| ArenaError::DeserializationFailure)
        };

        match envelope.kind.as_str() {
            "input:state" => Ok(ClientMessage::InputState(parse(&envelope.data)?)),
            "player:shoot" => Ok(ClientMessage::Shoot(parse(&envelope.data)?)),
            "player:reload" => Ok(ClientMessage::Reload),
            "player:melee" => Ok(ClientMessage::Melee(parse(&envelope.data)?)),
            "player:roll" => Ok(ClientMessage::Roll(parse(&envelope.data)?)),
            "player:pickup" => Ok(ClientMessage::Pickup(parse(&envelope.data)?)),
            "player:respawn_request" => Ok(ClientMessage::RespawnRequest),
            _ => Err(ArenaError::InvalidFrame),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerMoveSnapshot {
    #[serde(rename = "playerId")]
    pub player_id: String,
    pub position: Vector2,
    pub velocity: Vector2,
    #[serde(rename = "aimAngle")]
    pub aim_angle: f64,
    pub health: i32,
    pub sequence: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectileSnapshot {
    pub id: String,
    pub position: Vector2,
    #[serde(rename = "weaponType")]
    pub weapon_type: WeaponType,
}

pub enum ShootFailureReason {
    NoPlayer,
    Cooldown,
    Empty,
    Reloading,
}

impl ShootFailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShootFailureReason::NoPlayer => "no_player",
            ShootFailureReason::Cooldown => "cooldown",
            ShootFailureReason::Empty => "empty",
            ShootFailureReason::Reloading => "reloading",
        }
    }
}

pub enum MeleeFailureReason {
    NoPlayer,
    NoWeapon,
    NotMelee,
    PlayerDead,
}

impl MeleeFailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeleeFailureReason::NoPlayer => "no_player",
            MeleeFailureReason::NoWeapon => "no_weapon",
            MeleeFailureReason::NotMelee => "not_melee",
            MeleeFailureReason::PlayerDead => "player_dead",
        }
    }
}

/// Helper for building server→client envelopes from a typed payload; the
/// exact 22 kinds listed in spec.md §6 are built at call sites (room
/// broadcast, hit resolution, etc.) rather than enumerated here as one big
/// enum, since each has a distinct, small payload shape.
pub fn server_envelope(kind: &str, timestamp: i64, data: impl Serialize) -> ArenaResult<Envelope> {
    let value = serde_json::to_value(data).map_err(|_| ArenaError::DeserializationFailure)?;
    Ok(Envelope::new(kind, timestamp, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_input_state_envelope() {
        let raw = r#"{"type":"input:state","timestamp":123,"data":{"up":true,"down":false,"left":false,"right":false,"aimAngle":0.0,"isSprinting":false,"sequence":7}}"#;
        let envelope = Envelope::decode(raw).unwrap();
        let msg = ClientMessage::from_envelope(&envelope).unwrap();
        match msg {
            ClientMessage::InputState(payload) => {
                assert!(payload.up);
                assert_eq!(payload.sequence, 7);
            }
            _ => panic!("expected InputState"),
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let envelope = Envelope::new("bogus:kind", 0, Value::Null);
        assert!(ClientMessage::from_envelope(&envelope).is_err());
    }

    #[test]
    fn respawn_request_ignores_empty_data() {
        let envelope = Envelope::new("player:respawn_request", 0, Value::Null);
        assert!(matches!(
            ClientMessage::from_envelope(&envelope).unwrap(),
            ClientMessage::RespawnRequest
        ));
    }
}
