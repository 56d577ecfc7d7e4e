//! Tunables for hit resolution and the server shell

use crate::form_data::{Axis, BaseAttributes, WeaponRecord, IRON_DAGGER, PLAYER_BASE};
use shared::FormId;
use std::time::Duration;

/// How the aggressor-to-target distance is measured for the reach check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReachMetric {
    #[default]
    Full3d,
    /// Ignores height difference.
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatSettings {
    /// Overrides the combat distance provided by static content.
    pub combat_distance: Option<f32>,
    /// Profile used when the hit's source item is not a worn weapon.
    pub unarmed: WeaponRecord,
    /// Used when the target's base record cannot be found.
    pub fallback_attributes: BaseAttributes,
    /// Axis along which object bounds extend toward an opponent.
    pub lateral_axis: Axis,
    pub reach_metric: ReachMetric,
}

impl Default for CombatSettings {
    fn default() -> Self {
        Self {
            combat_distance: None,
            unarmed: WeaponRecord::melee(0.0, 1.0, 1.0),
            fallback_attributes: BaseAttributes::default(),
            lateral_axis: Axis::Y,
            reach_metric: ReachMetric::Full3d,
        }
    }
}

/// Parses a combat distance override; it must be finite and non-negative.
pub fn parse_combat_distance(value: &str) -> Result<f32, String> {
    let distance: f32 = value
        .parse()
        .map_err(|e| format!("invalid combat distance `{}`: {}", value, e))?;
    if !(distance.is_finite() && distance >= 0.0) {
        return Err(format!(
            "combat distance must be a finite, non-negative number, got {}",
            value
        ));
    }
    Ok(distance)
}

/// Network shell configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub tick_duration: Duration,
    pub max_clients: usize,
    pub client_timeout: Duration,
    /// Base form of actors spawned for new sessions.
    pub spawn_base: FormId,
    /// Weapons given, worn, to newly spawned actors.
    pub starting_loadout: Vec<FormId>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_duration: Duration::from_millis(33),
            max_clients: 32,
            client_timeout: Duration::from_secs(5),
            spawn_base: PLAYER_BASE,
            starting_loadout: vec![IRON_DAGGER],
        }
    }
}
