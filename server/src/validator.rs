//! Gate chain deciding whether a hit attempt lands
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. the aggressor is alive
//! 2. the aggressor's weapon is off cooldown
//! 3. the target is within reach
//!
//! Validation only reads state. A rejected hit leaves every actor untouched
//! and produces no outbound message.

use crate::actor_store::{ChangeForm, HitTransaction, StoreError};
use crate::config::ReachMetric;
use crate::equipment::ResolvedWeapon;
use crate::world::World;
use shared::ActorId;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HitRejected {
    #[error("aggressor is dead")]
    Dead,

    #[error("weapon is still on cooldown")]
    Cooldown,

    #[error("target is out of reach")]
    OutOfRange,

    #[error("actor {0:#x} is not present")]
    UnknownActor(ActorId),
}

impl From<StoreError> for HitRejected {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UnknownActor(id) => HitRejected::UnknownActor(id),
        }
    }
}

pub fn validate(
    world: &World,
    tx: &HitTransaction<'_>,
    weapon: &ResolvedWeapon,
    now: Instant,
) -> Result<(), HitRejected> {
    check_liveness(tx.aggressor())?;
    check_cooldown(tx.aggressor(), weapon, now)?;
    check_range(world, tx.aggressor(), tx.target(), weapon)
}

pub fn check_liveness(aggressor: &ChangeForm) -> Result<(), HitRejected> {
    if aggressor.is_dead() {
        return Err(HitRejected::Dead);
    }
    Ok(())
}

/// Minimum time between two accepted hits at `attack_speed` attacks/sec.
pub fn required_interval(attack_speed: f32) -> Duration {
    if attack_speed > 0.0 && attack_speed.is_finite() {
        Duration::from_secs_f32(1.0 / attack_speed)
    } else {
        Duration::ZERO
    }
}

pub fn check_cooldown(
    aggressor: &ChangeForm,
    weapon: &ResolvedWeapon,
    now: Instant,
) -> Result<(), HitRejected> {
    let Some(last_hit) = aggressor.last_hit else {
        return Ok(());
    };

    let elapsed = now.saturating_duration_since(last_hit);
    if elapsed < required_interval(weapon.record.attack_speed) {
        return Err(HitRejected::Cooldown);
    }
    Ok(())
}

/// Furthest distance at which `aggressor` can reach `target` with `weapon`.
pub fn max_reach(
    world: &World,
    aggressor: &ChangeForm,
    target: &ChangeForm,
    weapon: &ResolvedWeapon,
) -> f32 {
    world.combat_distance() * weapon.record.reach
        + world.bounds_extent(aggressor.base_id)
        + world.bounds_extent(target.base_id)
}

pub fn check_range(
    world: &World,
    aggressor: &ChangeForm,
    target: &ChangeForm,
    weapon: &ResolvedWeapon,
) -> Result<(), HitRejected> {
    let distance = match world.settings().reach_metric {
        ReachMetric::Full3d => aggressor.position.distance(&target.position),
        ReachMetric::Horizontal => aggressor.position.horizontal_distance(&target.position),
    };

    // NaN on either side rejects
    if !(distance <= max_reach(world, aggressor, target, weapon)) {
        return Err(HitRejected::OutOfRange);
    }
    Ok(())
}
