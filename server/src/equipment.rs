//! Resolution of the weapon a hit was dealt with

use crate::actor_store::ChangeForm;
use crate::form_data::WeaponRecord;
use crate::world::World;
use log::debug;
use shared::FormId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponSource {
    /// The source item is worn and has a weapon record.
    Worn(FormId),
    /// The source item is not worn, not carried, or has no usable record.
    Unarmed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedWeapon {
    pub record: WeaponRecord,
    pub source: WeaponSource,
}

impl ResolvedWeapon {
    pub fn is_unarmed(&self) -> bool {
        self.source == WeaponSource::Unarmed
    }
}

/// Looks up the weapon `aggressor` hit with.
///
/// A source item that is not worn resolves to the unarmed profile from
/// [`crate::config::CombatSettings`]; so does a worn item without a weapon
/// record or with a non-positive attack speed.
pub fn resolve_weapon(world: &World, aggressor: &ChangeForm, source: FormId) -> ResolvedWeapon {
    let unarmed = ResolvedWeapon {
        record: world.settings().unarmed,
        source: WeaponSource::Unarmed,
    };

    if aggressor.inventory.find_worn(source).is_none() {
        debug!("Source {:#x} is not worn, resolving as unarmed", source);
        return unarmed;
    }

    match world.weapon_record(source) {
        Some(record) if record.attack_speed > 0.0 && record.attack_speed.is_finite() => {
            ResolvedWeapon {
                record,
                source: WeaponSource::Worn(source),
            }
        }
        Some(_) => {
            debug!("Weapon {:#x} has no usable attack speed", source);
            unarmed
        }
        None => unarmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor_store::{ExtraData, InventoryEntry};
    use crate::clock::ManualClock;
    use crate::form_data::{StaticFormData, IRON_DAGGER, IRON_SWORD, PLAYER_BASE};
    use shared::Vec3;
    use std::sync::Arc;

    fn world() -> World {
        let forms = StaticFormData::builtin()
            .with_weapon(0x5555, WeaponRecord::melee(3.0, f32::INFINITY, 1.0));
        World::new(Arc::new(forms), Arc::new(ManualClock::new()))
    }

    fn aggressor() -> ChangeForm {
        let mut form = ChangeForm::new(PLAYER_BASE, Vec3::default(), Vec3::default());
        form.inventory.add_item(IRON_SWORD, 1);
        form.inventory.entries.push(InventoryEntry::new(
            IRON_DAGGER,
            1,
            ExtraData::WORN,
        ));
        form
    }

    #[test]
    fn test_worn_weapon_resolves_to_record() {
        let world = world();
        let weapon = resolve_weapon(&world, &aggressor(), IRON_DAGGER);

        assert_eq!(weapon.source, WeaponSource::Worn(IRON_DAGGER));
        assert_eq!(weapon.record.damage, 4.0);
        assert_eq!(weapon.record.attack_speed, 1.3);
        assert_eq!(weapon.record.reach, 0.7);
    }

    #[test]
    fn test_carried_but_not_worn_is_unarmed() {
        let world = world();
        let weapon = resolve_weapon(&world, &aggressor(), IRON_SWORD);

        assert!(weapon.is_unarmed());
        assert_eq!(weapon.record, world.settings().unarmed);
    }

    #[test]
    fn test_never_owned_item_is_unarmed() {
        let world = world();
        let weapon = resolve_weapon(&world, &aggressor(), 0x9999);
        assert!(weapon.is_unarmed());
        // Not worn, so static data is never consulted.
        assert_eq!(world.stats().snapshot().static_data_fallbacks, 0);
    }

    #[test]
    fn test_worn_item_without_record_falls_back() {
        let world = world();
        let mut form = aggressor();
        form.inventory
            .entries
            .push(InventoryEntry::new(0x4242, 1, ExtraData::WORN));

        let weapon = resolve_weapon(&world, &form, 0x4242);
        assert!(weapon.is_unarmed());
        assert_eq!(world.stats().snapshot().static_data_fallbacks, 1);
    }

    #[test]
    fn test_unusable_attack_speed_falls_back() {
        let world = world();
        let mut form = aggressor();
        form.inventory
            .entries
            .push(InventoryEntry::new(0x5555, 1, ExtraData::WORN));

        assert!(resolve_weapon(&world, &form, 0x5555).is_unarmed());
    }
}
