//! Damage formulas keyed by weapon category
//!
//! Each category maps to a plain function from the target's current values,
//! its base attributes and the weapon to the target's new values. Adding a
//! category means registering another function; the validator and the
//! broadcaster never look at categories.

use crate::form_data::{BaseAttributes, WeaponCategory, WeaponRecord};
use log::warn;
use shared::ActorValues;
use std::collections::HashMap;

pub type DamageFormula = fn(&ActorValues, &BaseAttributes, &WeaponRecord) -> ActorValues;

/// `health' = max(0, health - damage / max_health)`; magicka and stamina are
/// left as they are.
pub fn melee_damage(
    current: &ActorValues,
    base: &BaseAttributes,
    weapon: &WeaponRecord,
) -> ActorValues {
    if !(base.health > 0.0) {
        return *current;
    }

    let health = (current.health - weapon.damage / base.health).max(0.0);
    ActorValues {
        health,
        ..*current
    }
    .clamped()
}

#[derive(Clone)]
pub struct DamageFormulas {
    table: HashMap<WeaponCategory, DamageFormula>,
}

impl Default for DamageFormulas {
    fn default() -> Self {
        Self::empty().with(WeaponCategory::Melee, melee_damage)
    }
}

impl DamageFormulas {
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn with(mut self, category: WeaponCategory, formula: DamageFormula) -> Self {
        self.table.insert(category, formula);
        self
    }

    pub fn contains(&self, category: WeaponCategory) -> bool {
        self.table.contains_key(&category)
    }

    /// New values for a target hit by `weapon`. Categories without a formula
    /// leave the target unchanged.
    pub fn calculate(
        &self,
        current: &ActorValues,
        base: &BaseAttributes,
        weapon: &WeaponRecord,
    ) -> ActorValues {
        match self.table.get(&weapon.category) {
            Some(formula) => formula(current, base, weapon),
            None => {
                warn!("No damage formula for {:?} weapons", weapon.category);
                *current
            }
        }
    }
}
