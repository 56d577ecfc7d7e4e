//! Canonical per-actor state and its atomic mutation
//!
//! Every live actor owns exactly one [`ChangeForm`], held behind its own
//! mutex. The index of actors sits behind a read-write lock that is only
//! taken for writing when actors are spawned or removed, so hits on
//! different actors never contend with each other.
//!
//! Hit resolution goes through [`ActorStore::transact`], which locks the
//! aggressor and the target for the whole validate-then-apply sequence.
//! Locks are always acquired in ascending actor-id order, and a self-hit
//! takes a single lock.

use log::info;
use shared::{ActorId, ActorValues, FormId, Vec3};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("actor {0:#x} is not present")]
    UnknownActor(ActorId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtraData {
    pub worn: bool,
}

impl ExtraData {
    pub const WORN: ExtraData = ExtraData { worn: true };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryEntry {
    pub base_id: FormId,
    pub count: u32,
    pub extra: ExtraData,
}

impl InventoryEntry {
    pub fn new(base_id: FormId, count: u32, extra: ExtraData) -> Self {
        Self {
            base_id,
            count,
            extra,
        }
    }

    pub fn is_worn(&self) -> bool {
        self.extra.worn
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Inventory {
    pub entries: Vec<InventoryEntry>,
}

impl Inventory {
    pub fn add_item(&mut self, base_id: FormId, count: u32) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.base_id == base_id && e.extra == ExtraData::default())
        {
            Some(entry) => entry.count += count,
            None => self
                .entries
                .push(InventoryEntry::new(base_id, count, ExtraData::default())),
        }
    }

    pub fn count(&self, base_id: FormId) -> u32 {
        self.entries
            .iter()
            .filter(|e| e.base_id == base_id)
            .map(|e| e.count)
            .sum()
    }

    /// Worn entry for `base_id`, if any.
    pub fn find_worn(&self, base_id: FormId) -> Option<&InventoryEntry> {
        self.entries
            .iter()
            .find(|e| e.base_id == base_id && e.count > 0 && e.is_worn())
    }

    pub fn equipment(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.entries.iter().filter(|e| e.is_worn())
    }

    /// Makes `worn` the complete set of worn items. Returns how many of them
    /// are actually carried.
    pub fn set_equipment(&mut self, worn: &[FormId]) -> usize {
        for entry in &mut self.entries {
            entry.extra.worn = false;
        }
        worn.iter().filter(|&&item| self.set_worn(item, true)).count()
    }

    /// Flags one owned `base_id` entry as worn. Returns false if the item is
    /// not carried.
    fn set_worn(&mut self, base_id: FormId, worn: bool) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|e| e.base_id == base_id && e.count > 0)
        {
            Some(entry) => {
                entry.extra.worn = worn;
                true
            }
            None => false,
        }
    }
}

/// Canonical state of one actor
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeForm {
    pub base_id: FormId,
    pub position: Vec3,
    pub angle: Vec3,
    pub actor_values: ActorValues,
    pub inventory: Inventory,
    /// Time of the last accepted hit this actor landed.
    pub last_hit: Option<Instant>,
    pub dead: bool,
}

impl ChangeForm {
    pub fn new(base_id: FormId, position: Vec3, angle: Vec3) -> Self {
        Self {
            base_id,
            position,
            angle,
            actor_values: ActorValues::FULL,
            inventory: Inventory::default(),
            last_hit: None,
            dead: false,
        }
    }

    /// Takes `values` and advances this actor's own last-hit time.
    fn commit(&mut self, values: ActorValues, hit_time: Instant) -> ActorValues {
        let values = values.clamped();
        self.actor_values = values;
        advance_last_hit(self, hit_time);
        values
    }

    pub fn is_dead(&self) -> bool {
        self.dead || self.actor_values.health <= 0.0
    }
}

enum Participants<'a> {
    Same(&'a mut ChangeForm),
    Pair {
        aggressor: &'a mut ChangeForm,
        target: &'a mut ChangeForm,
    },
}

/// Exclusive view of the two actors involved in one hit
pub struct HitTransaction<'a> {
    aggressor_id: ActorId,
    target_id: ActorId,
    forms: Participants<'a>,
}

impl HitTransaction<'_> {
    pub fn aggressor_id(&self) -> ActorId {
        self.aggressor_id
    }

    pub fn target_id(&self) -> ActorId {
        self.target_id
    }

    pub fn aggressor(&self) -> &ChangeForm {
        match &self.forms {
            Participants::Same(form) => &**form,
            Participants::Pair { aggressor, .. } => &**aggressor,
        }
    }

    pub fn target(&self) -> &ChangeForm {
        match &self.forms {
            Participants::Same(form) => &**form,
            Participants::Pair { target, .. } => &**target,
        }
    }

    /// Commits an accepted hit: the target takes `values`, the aggressor's
    /// last-hit time advances to `hit_time`. Returns the committed values.
    pub fn apply(&mut self, values: ActorValues, hit_time: Instant) -> ActorValues {
        match &mut self.forms {
            Participants::Same(form) => form.commit(values, hit_time),
            Participants::Pair { aggressor, target } => {
                let values = values.clamped();
                target.actor_values = values;
                advance_last_hit(aggressor, hit_time);
                values
            }
        }
    }
}

fn advance_last_hit(form: &mut ChangeForm, hit_time: Instant) {
    form.last_hit = Some(match form.last_hit {
        Some(previous) if previous > hit_time => previous,
        _ => hit_time,
    });
}

fn lock(form: &Mutex<ChangeForm>) -> MutexGuard<'_, ChangeForm> {
    form.lock().unwrap_or_else(|e| e.into_inner())
}

/// Owner of every live actor's [`ChangeForm`]
#[derive(Default)]
pub struct ActorStore {
    actors: RwLock<HashMap<ActorId, Arc<Mutex<ChangeForm>>>>,
}

impl ActorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self) -> RwLockReadGuard<'_, HashMap<ActorId, Arc<Mutex<ChangeForm>>>> {
        self.actors.read().unwrap_or_else(|e| e.into_inner())
    }

    fn get(&self, id: ActorId) -> Result<Arc<Mutex<ChangeForm>>, StoreError> {
        self.index()
            .get(&id)
            .cloned()
            .ok_or(StoreError::UnknownActor(id))
    }

    fn update<R>(
        &self,
        id: ActorId,
        f: impl FnOnce(&mut ChangeForm) -> R,
    ) -> Result<R, StoreError> {
        let form = self.get(id)?;
        let mut guard = lock(&form);
        Ok(f(&mut *guard))
    }

    /// Registers a new actor, replacing any previous form under the same id.
    pub fn spawn(&self, id: ActorId, form: ChangeForm) {
        let mut actors = self.actors.write().unwrap_or_else(|e| e.into_inner());
        info!(
            "Spawned actor {:#x} (base {:#x}) at ({}, {}, {})",
            id, form.base_id, form.position.x, form.position.y, form.position.z
        );
        actors.insert(id, Arc::new(Mutex::new(form)));
    }

    pub fn remove(&self, id: ActorId) -> Option<ChangeForm> {
        let removed = {
            let mut actors = self.actors.write().unwrap_or_else(|e| e.into_inner());
            actors.remove(&id)?
        };
        info!("Removed actor {:#x}", id);
        let form = lock(&removed).clone();
        Some(form)
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.index().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index().is_empty()
    }

    /// Snapshot of the committed state of `id`.
    pub fn read(&self, id: ActorId) -> Option<ChangeForm> {
        let form = self.get(id).ok()?;
        let snapshot = lock(&form).clone();
        Some(snapshot)
    }

    /// Atomically replaces the ActorValues and last-hit time of `id`.
    ///
    /// This is the single-actor commit of a hit `id` landed on itself, so
    /// `timestamp` starts `id`'s own cooldown. Hits between two actors go
    /// through [`ActorStore::transact`], which times the aggressor instead.
    pub fn apply(&self, id: ActorId, values: ActorValues, timestamp: Instant) -> Option<ActorValues> {
        self.update(id, |form| form.commit(values, timestamp)).ok()
    }

    /// Runs `f` while holding exclusive access to both actors.
    pub fn transact<R>(
        &self,
        aggressor_id: ActorId,
        target_id: ActorId,
        f: impl FnOnce(&mut HitTransaction<'_>) -> R,
    ) -> Result<R, StoreError> {
        let aggressor = self.get(aggressor_id)?;
        let target = self.get(target_id)?;

        if Arc::ptr_eq(&aggressor, &target) {
            let mut guard = lock(&aggressor);
            let mut tx = HitTransaction {
                aggressor_id,
                target_id,
                forms: Participants::Same(&mut *guard),
            };
            return Ok(f(&mut tx));
        }

        let (mut aggressor_guard, mut target_guard) = if aggressor_id < target_id {
            let a = lock(&aggressor);
            let t = lock(&target);
            (a, t)
        } else {
            let t = lock(&target);
            let a = lock(&aggressor);
            (a, t)
        };

        let mut tx = HitTransaction {
            aggressor_id,
            target_id,
            forms: Participants::Pair {
                aggressor: &mut *aggressor_guard,
                target: &mut *target_guard,
            },
        };
        Ok(f(&mut tx))
    }

    pub fn set_position(&self, id: ActorId, position: Vec3) -> Result<(), StoreError> {
        self.update(id, |form| form.position = position)
    }

    pub fn set_angle(&self, id: ActorId, angle: Vec3) -> Result<(), StoreError> {
        self.update(id, |form| form.angle = angle)
    }

    pub fn set_percentages(&self, id: ActorId, values: ActorValues) -> Result<(), StoreError> {
        self.update(id, |form| form.actor_values = values.clamped())
    }

    pub fn set_inventory(&self, id: ActorId, inventory: Inventory) -> Result<(), StoreError> {
        self.update(id, |form| form.inventory = inventory)
    }

    pub fn add_item(&self, id: ActorId, base_id: FormId, count: u32) -> Result<(), StoreError> {
        self.update(id, |form| form.inventory.add_item(base_id, count))
    }

    /// Marks a carried item as worn or unworn. Returns false if not carried.
    pub fn set_worn(&self, id: ActorId, base_id: FormId, worn: bool) -> Result<bool, StoreError> {
        self.update(id, |form| form.inventory.set_worn(base_id, worn))
    }

    pub fn set_equipment(&self, id: ActorId, worn: &[FormId]) -> Result<usize, StoreError> {
        self.update(id, |form| form.inventory.set_equipment(worn))
    }

    pub fn kill(&self, id: ActorId) -> Result<(), StoreError> {
        self.update(id, |form| {
            form.dead = true;
            form.actor_values.health = 0.0;
        })
    }

    /// Lifecycle override of the last-hit time; unlike [`ActorStore::apply`]
    /// this may move the timestamp backwards.
    pub fn set_last_hit_time(&self, id: ActorId, at: Option<Instant>) -> Result<(), StoreError> {
        self.update(id, |form| form.last_hit = at)
    }
}
