use serde::{Deserialize, Serialize};

/// Reserved form id meaning "the actor controlled by the sending session".
pub const PLAYER_CHARACTER_ID: u32 = 0x14;
/// Message discriminator for the ActorValues delta.
pub const CHANGE_VALUES_MSG_TYPE: u64 = 16;
/// fCombatDistance game setting.
pub const DEFAULT_COMBAT_DISTANCE: f32 = 141.0;
pub const PROTOCOL_VERSION: u32 = 1;

pub type ActorId = u32;
pub type FormId = u32;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    Hit(HitData),
    Disconnect,

    Connected {
        client_id: u32,
        actor_id: ActorId,
    },
    ChangeValues(ChangeValuesMessage),
    Disconnected {
        reason: String,
    },
}

/// Hit event as reported by a client.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct HitData {
    pub aggressor: ActorId,
    pub target: ActorId,
    pub source: FormId,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance ignoring the vertical (z) component.
    pub fn horizontal_distance(&self, other: &Vec3) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Health, magicka and stamina as fractions of the actor's base values.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ActorValues {
    pub health: f32,
    pub magicka: f32,
    pub stamina: f32,
}

impl Default for ActorValues {
    fn default() -> Self {
        Self::FULL
    }
}

impl ActorValues {
    pub const FULL: ActorValues = ActorValues {
        health: 1.0,
        magicka: 1.0,
        stamina: 1.0,
    };

    /// Builds a triple with every component clamped into `[0, 1]`.
    pub fn new(health: f32, magicka: f32, stamina: f32) -> Self {
        Self {
            health: clamp_percentage(health),
            magicka: clamp_percentage(magicka),
            stamina: clamp_percentage(stamina),
        }
    }

    pub fn clamped(self) -> Self {
        Self::new(self.health, self.magicka, self.stamina)
    }
}

fn clamp_percentage(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A single ActorValues component in a delta: either the new value or absent.
///
/// Serialized as `null` when absent so "unchanged" is never confused with
/// "changed to zero".
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(from = "Option<f32>", into = "Option<f32>")]
pub enum Delta {
    #[default]
    Absent,
    Changed(f32),
}

impl Delta {
    /// Exact comparison: values come out of a deterministic formula.
    pub fn between(old: f32, new: f32) -> Self {
        if old != new {
            Delta::Changed(new)
        } else {
            Delta::Absent
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Delta::Changed(_))
    }

    pub fn value(&self) -> Option<f32> {
        match self {
            Delta::Changed(v) => Some(*v),
            Delta::Absent => None,
        }
    }
}

impl From<Option<f32>> for Delta {
    fn from(value: Option<f32>) -> Self {
        value.map_or(Delta::Absent, Delta::Changed)
    }
}

impl From<Delta> for Option<f32> {
    fn from(delta: Delta) -> Self {
        delta.value()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct ActorValuesDelta {
    pub health: Delta,
    pub magicka: Delta,
    pub stamina: Delta,
}

impl ActorValuesDelta {
    pub fn diff(old: &ActorValues, new: &ActorValues) -> Self {
        Self {
            health: Delta::between(old.health, new.health),
            magicka: Delta::between(old.magicka, new.magicka),
            stamina: Delta::between(old.stamina, new.stamina),
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.health.is_changed() || self.magicka.is_changed() || self.stamina.is_changed())
    }
}

/// Outbound "ActorValues changed" record.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ChangeValuesMessage {
    #[serde(rename = "t")]
    pub msg_type: u64,
    /// Actor whose values changed.
    pub idx: ActorId,
    pub data: ActorValuesDelta,
}

impl ChangeValuesMessage {
    pub fn new(idx: ActorId, data: ActorValuesDelta) -> Self {
        Self {
            msg_type: CHANGE_VALUES_MSG_TYPE,
            idx,
            data,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_actor_values_are_clamped() {
        let values = ActorValues::new(1.5, -0.25, 0.5);
        assert_eq!(values.health, 1.0);
        assert_eq!(values.magicka, 0.0);
        assert_eq!(values.stamina, 0.5);

        let nan = ActorValues::new(f32::NAN, 1.0, 1.0);
        assert_eq!(nan.health, 0.0);
    }

    #[test]
    fn test_default_actor_values_are_full() {
        assert_eq!(ActorValues::default(), ActorValues::FULL);
    }

    #[test]
    fn test_vec3_distances() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 12.0);
        assert_approx_eq!(a.distance(&b), 13.0, 1e-5);
        assert_approx_eq!(a.horizontal_distance(&b), 5.0, 1e-5);
    }

    #[test]
    fn test_delta_only_reports_changed_fields() {
        let old = ActorValues::FULL;
        let new = ActorValues::new(0.75, 1.0, 1.0);
        let delta = ActorValuesDelta::diff(&old, &new);

        assert_eq!(delta.health, Delta::Changed(0.75));
        assert_eq!(delta.magicka, Delta::Absent);
        assert_eq!(delta.stamina, Delta::Absent);
        assert!(!delta.is_empty());

        assert!(ActorValuesDelta::diff(&new, &new).is_empty());
    }

    #[test]
    fn test_changed_to_zero_is_not_absent() {
        let delta = Delta::between(0.1, 0.0);
        assert_eq!(delta, Delta::Changed(0.0));
        assert_eq!(delta.value(), Some(0.0));
    }

    #[test]
    fn test_change_values_json_shape() {
        let message = ChangeValuesMessage::new(
            0xff000000,
            ActorValuesDelta {
                health: Delta::Changed(0.75),
                ..Default::default()
            },
        );

        let json: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(json["t"], 16);
        assert_eq!(json["idx"], 0xff000000u32);
        assert_eq!(json["data"]["health"], 0.75);
        assert!(json["data"]["magicka"].is_null());
        assert!(json["data"]["stamina"].is_null());
    }

    #[test]
    fn test_packet_serialization_change_values() {
        let packet = Packet::ChangeValues(ChangeValuesMessage::new(
            7,
            ActorValuesDelta {
                stamina: Delta::Changed(0.5),
                ..Default::default()
            },
        ));

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::ChangeValues(message) => {
                assert_eq!(message.msg_type, CHANGE_VALUES_MSG_TYPE);
                assert_eq!(message.idx, 7);
                assert_eq!(message.data.health, Delta::Absent);
                assert_eq!(message.data.stamina, Delta::Changed(0.5));
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_hit() {
        let packet = Packet::Hit(HitData {
            aggressor: PLAYER_CHARACTER_ID,
            target: 0xff000001,
            source: 0x0001397E,
        });

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Hit(hit) => {
                assert_eq!(hit.aggressor, PLAYER_CHARACTER_ID);
                assert_eq!(hit.target, 0xff000001);
                assert_eq!(hit.source, 0x0001397E);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }
}
