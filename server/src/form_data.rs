//! Read-only static game content consulted by hit resolution
//!
//! Weapons, NPC base attributes and object bounds are loaded once (from code
//! or a JSON content file) and never change while the server runs. The hit
//! pipeline only talks to the [`FormDataProvider`] trait so alternative
//! content backends can be plugged in.

use serde::{Deserialize, Serialize};
use shared::{FormId, DEFAULT_COMBAT_DISTANCE};
use std::collections::HashMap;
use std::path::Path;

/// Iron dagger.
pub const IRON_DAGGER: FormId = 0x0001397E;
/// Iron sword.
pub const IRON_SWORD: FormId = 0x00012EB7;
/// Player base NPC record.
pub const PLAYER_BASE: FormId = 0x7;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StaticDataError {
    #[error("weapon record {0:#x} not found")]
    MissingWeapon(FormId),

    #[error("base attributes for {0:#x} not found")]
    MissingBaseAttributes(FormId),

    #[error("object bounds for {0:#x} not found")]
    MissingBounds(FormId),
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to read content file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed content: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("weapon {0:#x} must have a positive attack speed")]
    InvalidAttackSpeed(FormId),

    #[error("combat distance must be finite and non-negative, got {0}")]
    InvalidCombatDistance(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponCategory {
    Melee,
    Ranged,
    Spell,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponRecord {
    pub damage: f32,
    /// Attacks per second.
    pub attack_speed: f32,
    /// Multiplier applied to the global combat distance.
    pub reach: f32,
    pub category: WeaponCategory,
}

impl WeaponRecord {
    pub const fn melee(damage: f32, attack_speed: f32, reach: f32) -> Self {
        Self {
            damage,
            attack_speed,
            reach,
            category: WeaponCategory::Melee,
        }
    }
}

/// Absolute (non-percentage) base values of an NPC record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseAttributes {
    pub health: f32,
    pub magicka: f32,
    pub stamina: f32,
}

impl Default for BaseAttributes {
    fn default() -> Self {
        Self {
            health: 100.0,
            magicka: 100.0,
            stamina: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    #[default]
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Axis-aligned object bounds relative to the form's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ObjectBounds {
    pub pos1: [i16; 3],
    pub pos2: [i16; 3],
}

impl ObjectBounds {
    /// Positive-side extent of the bounds along `axis`.
    pub fn extent(&self, axis: Axis) -> f32 {
        self.pos2[axis.index()] as f32
    }
}

/// Lookup of immutable per-form data
pub trait FormDataProvider: Send + Sync {
    fn base_attributes(&self, base_id: FormId) -> Result<BaseAttributes, StaticDataError>;

    fn spatial_bounds(&self, base_id: FormId) -> Result<ObjectBounds, StaticDataError>;

    fn weapon_record(&self, item_id: FormId) -> Result<WeaponRecord, StaticDataError>;

    fn combat_distance(&self) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NpcRecord {
    pub attributes: BaseAttributes,
    pub bounds: ObjectBounds,
}

/// In-memory content tables
#[derive(Debug, Clone)]
pub struct StaticFormData {
    npcs: HashMap<FormId, NpcRecord>,
    weapons: HashMap<FormId, WeaponRecord>,
    combat_distance: f32,
}

/// On-disk layout of a content file.
#[derive(Debug, Serialize, Deserialize)]
struct ContentFile {
    #[serde(default = "default_combat_distance")]
    combat_distance: f32,
    #[serde(default)]
    npcs: Vec<NpcEntry>,
    #[serde(default)]
    weapons: Vec<WeaponEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NpcEntry {
    id: FormId,
    #[serde(flatten)]
    record: NpcRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct WeaponEntry {
    id: FormId,
    #[serde(flatten)]
    record: WeaponRecord,
}

fn default_combat_distance() -> f32 {
    DEFAULT_COMBAT_DISTANCE
}

impl StaticFormData {
    pub fn new(combat_distance: f32) -> Self {
        Self {
            npcs: HashMap::new(),
            weapons: HashMap::new(),
            combat_distance,
        }
    }

    /// Content shipped with the server: the player base record and two
    /// iron weapons.
    pub fn builtin() -> Self {
        Self::new(DEFAULT_COMBAT_DISTANCE)
            .with_npc(
                PLAYER_BASE,
                NpcRecord {
                    attributes: BaseAttributes {
                        health: 16.0,
                        magicka: 50.0,
                        stamina: 50.0,
                    },
                    bounds: ObjectBounds {
                        pos1: [-22, -14, 0],
                        pos2: [22, 14, 128],
                    },
                },
            )
            .with_weapon(IRON_DAGGER, WeaponRecord::melee(4.0, 1.3, 0.7))
            .with_weapon(IRON_SWORD, WeaponRecord::melee(7.0, 1.0, 1.0))
    }

    pub fn with_npc(mut self, id: FormId, record: NpcRecord) -> Self {
        self.npcs.insert(id, record);
        self
    }

    pub fn with_weapon(mut self, id: FormId, record: WeaponRecord) -> Self {
        self.weapons.insert(id, record);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ContentError> {
        let file: ContentFile = serde_json::from_str(json)?;
        if !(file.combat_distance.is_finite() && file.combat_distance >= 0.0) {
            return Err(ContentError::InvalidCombatDistance(file.combat_distance));
        }

        let mut data = Self::new(file.combat_distance);
        for entry in file.npcs {
            data.npcs.insert(entry.id, entry.record);
        }
        for entry in file.weapons {
            if !(entry.record.attack_speed > 0.0 && entry.record.attack_speed.is_finite()) {
                return Err(ContentError::InvalidAttackSpeed(entry.id));
            }
            data.weapons.insert(entry.id, entry.record);
        }
        Ok(data)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn npc_count(&self) -> usize {
        self.npcs.len()
    }

    pub fn weapon_count(&self) -> usize {
        self.weapons.len()
    }
}

impl FormDataProvider for StaticFormData {
    fn base_attributes(&self, base_id: FormId) -> Result<BaseAttributes, StaticDataError> {
        self.npcs
            .get(&base_id)
            .map(|npc| npc.attributes)
            .ok_or(StaticDataError::MissingBaseAttributes(base_id))
    }

    fn spatial_bounds(&self, base_id: FormId) -> Result<ObjectBounds, StaticDataError> {
        self.npcs
            .get(&base_id)
            .map(|npc| npc.bounds)
            .ok_or(StaticDataError::MissingBounds(base_id))
    }

    fn weapon_record(&self, item_id: FormId) -> Result<WeaponRecord, StaticDataError> {
        self.weapons
            .get(&item_id)
            .copied()
            .ok_or(StaticDataError::MissingWeapon(item_id))
    }

    fn combat_distance(&self) -> f32 {
        self.combat_distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_content() {
        let data = StaticFormData::builtin();

        let dagger = data.weapon_record(IRON_DAGGER).unwrap();
        assert_eq!(dagger.damage, 4.0);
        assert_eq!(dagger.attack_speed, 1.3);
        assert_eq!(dagger.reach, 0.7);
        assert_eq!(dagger.category, WeaponCategory::Melee);

        assert_eq!(data.base_attributes(PLAYER_BASE).unwrap().health, 16.0);
        assert_eq!(data.combat_distance(), DEFAULT_COMBAT_DISTANCE);
    }

    #[test]
    fn test_missing_records() {
        let data = StaticFormData::new(100.0);

        assert_eq!(
            data.weapon_record(0x1234),
            Err(StaticDataError::MissingWeapon(0x1234))
        );
        assert_eq!(
            data.base_attributes(0x7),
            Err(StaticDataError::MissingBaseAttributes(0x7))
        );
        assert_eq!(
            data.spatial_bounds(0x7),
            Err(StaticDataError::MissingBounds(0x7))
        );
    }

    #[test]
    fn test_bounds_extent_uses_positive_corner() {
        let bounds = ObjectBounds {
            pos1: [-22, -14, 0],
            pos2: [22, 14, 128],
        };
        assert_eq!(bounds.extent(Axis::X), 22.0);
        assert_eq!(bounds.extent(Axis::Y), 14.0);
        assert_eq!(bounds.extent(Axis::Z), 128.0);
    }

    #[test]
    fn test_content_from_json() {
        let json = r#"{
            "combat_distance": 150.0,
            "npcs": [
                {
                    "id": 7,
                    "attributes": { "health": 20.0, "magicka": 10.0, "stamina": 10.0 },
                    "bounds": { "pos1": [-20, -10, 0], "pos2": [20, 10, 120] }
                }
            ],
            "weapons": [
                { "id": 80254, "damage": 4.0, "attack_speed": 1.3, "reach": 0.7, "category": "melee" },
                { "id": 1, "damage": 10.0, "attack_speed": 0.5, "reach": 5.0, "category": "ranged" }
            ]
        }"#;

        let data = StaticFormData::from_json_str(json).unwrap();
        assert_eq!(data.combat_distance(), 150.0);
        assert_eq!(data.npc_count(), 1);
        assert_eq!(data.weapon_count(), 2);
        assert_eq!(data.spatial_bounds(7).unwrap().extent(Axis::Y), 10.0);
        assert_eq!(
            data.weapon_record(1).unwrap().category,
            WeaponCategory::Ranged
        );
    }

    #[test]
    fn test_content_defaults_combat_distance() {
        let data = StaticFormData::from_json_str("{}").unwrap();
        assert_eq!(data.combat_distance(), DEFAULT_COMBAT_DISTANCE);
        assert_eq!(data.weapon_count(), 0);
    }

    #[test]
    fn test_content_rejects_zero_attack_speed() {
        let json = r#"{ "weapons": [
            { "id": 5, "damage": 1.0, "attack_speed": 0.0, "reach": 1.0, "category": "melee" }
        ] }"#;

        match StaticFormData::from_json_str(json) {
            Err(ContentError::InvalidAttackSpeed(5)) => {}
            other => panic!("Unexpected result: {:?}", other.map(|d| d.weapon_count())),
        }
    }

    #[test]
    fn test_content_rejects_negative_combat_distance() {
        assert!(matches!(
            StaticFormData::from_json_str(r#"{ "combat_distance": -1.0 }"#),
            Err(ContentError::InvalidCombatDistance(_))
        ));
    }

    #[test]
    fn test_content_parse_error() {
        assert!(matches!(
            StaticFormData::from_json_str("not json"),
            Err(ContentError::Parse(_))
        ));
    }
}
