//! Explicit simulation context threaded through every hit resolution
//!
//! A [`World`] bundles the actor store, static content, time source,
//! combat tunables and damage formulas. Nothing in the hit pipeline reaches
//! for global state, so any number of worlds can run side by side.

use crate::actor_store::ActorStore;
use crate::clock::Clock;
use crate::config::CombatSettings;
use crate::damage::DamageFormulas;
use crate::form_data::{BaseAttributes, FormDataProvider, StaticDataError, WeaponRecord};
use crate::validator::HitRejected;
use log::warn;
use shared::FormId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counters exposed to operational tooling
#[derive(Debug, Default)]
pub struct CombatStats {
    accepted: AtomicU64,
    rejected_dead: AtomicU64,
    rejected_cooldown: AtomicU64,
    rejected_out_of_range: AtomicU64,
    rejected_unknown_actor: AtomicU64,
    deltas_sent: AtomicU64,
    static_data_fallbacks: AtomicU64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CombatStatsSnapshot {
    pub accepted: u64,
    pub rejected_dead: u64,
    pub rejected_cooldown: u64,
    pub rejected_out_of_range: u64,
    pub rejected_unknown_actor: u64,
    pub deltas_sent: u64,
    pub static_data_fallbacks: u64,
}

impl CombatStatsSnapshot {
    pub fn rejected(&self) -> u64 {
        self.rejected_dead
            + self.rejected_cooldown
            + self.rejected_out_of_range
            + self.rejected_unknown_actor
    }
}

impl CombatStats {
    pub fn record_accepted(&self, delta_sent: bool) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        if delta_sent {
            self.deltas_sent.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_rejected(&self, reason: HitRejected) {
        let counter = match reason {
            HitRejected::Dead => &self.rejected_dead,
            HitRejected::Cooldown => &self.rejected_cooldown,
            HitRejected::OutOfRange => &self.rejected_out_of_range,
            HitRejected::UnknownActor(_) => &self.rejected_unknown_actor,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.static_data_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CombatStatsSnapshot {
        CombatStatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected_dead: self.rejected_dead.load(Ordering::Relaxed),
            rejected_cooldown: self.rejected_cooldown.load(Ordering::Relaxed),
            rejected_out_of_range: self.rejected_out_of_range.load(Ordering::Relaxed),
            rejected_unknown_actor: self.rejected_unknown_actor.load(Ordering::Relaxed),
            deltas_sent: self.deltas_sent.load(Ordering::Relaxed),
            static_data_fallbacks: self.static_data_fallbacks.load(Ordering::Relaxed),
        }
    }
}

pub struct World {
    actors: ActorStore,
    forms: Arc<dyn FormDataProvider>,
    clock: Arc<dyn Clock>,
    settings: CombatSettings,
    formulas: DamageFormulas,
    stats: CombatStats,
}

impl World {
    pub fn new(forms: Arc<dyn FormDataProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            actors: ActorStore::new(),
            forms,
            clock,
            settings: CombatSettings::default(),
            formulas: DamageFormulas::default(),
            stats: CombatStats::default(),
        }
    }

    pub fn with_settings(mut self, settings: CombatSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_formulas(mut self, formulas: DamageFormulas) -> Self {
        self.formulas = formulas;
        self
    }

    pub fn actors(&self) -> &ActorStore {
        &self.actors
    }

    pub fn settings(&self) -> &CombatSettings {
        &self.settings
    }

    pub fn formulas(&self) -> &DamageFormulas {
        &self.formulas
    }

    pub fn stats(&self) -> &CombatStats {
        &self.stats
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn combat_distance(&self) -> f32 {
        self.settings
            .combat_distance
            .unwrap_or_else(|| self.forms.combat_distance())
    }

    /// Base attributes of `base_id`, or the configured fallback.
    pub fn base_attributes(&self, base_id: FormId) -> BaseAttributes {
        self.forms
            .base_attributes(base_id)
            .unwrap_or_else(|e| self.fallback(e, self.settings.fallback_attributes))
    }

    /// Extent of `base_id`'s bounds along the lateral axis, or zero.
    pub fn bounds_extent(&self, base_id: FormId) -> f32 {
        self.forms
            .spatial_bounds(base_id)
            .map(|bounds| bounds.extent(self.settings.lateral_axis))
            .unwrap_or_else(|e| self.fallback(e, 0.0))
    }

    /// Weapon record of `item_id`, or `None` after reporting the miss.
    pub fn weapon_record(&self, item_id: FormId) -> Option<WeaponRecord> {
        self.forms
            .weapon_record(item_id)
            .map_err(|e| self.fallback(e, ()))
            .ok()
    }

    fn fallback<T>(&self, error: StaticDataError, value: T) -> T {
        warn!("Static data unresolved, using default: {}", error);
        self.stats.record_fallback();
        value
    }
}
