//! End-to-end resolution of one hit event
//!
//! ```text
//! HitEvent -> lock aggressor+target -> resolve weapon -> validate
//!          -> damage formula -> apply -> broadcast delta -> unlock
//! ```
//!
//! The whole sequence runs inside a single [`ActorStore`] transaction, so
//! concurrent hits involving the same actor are strictly serialized while
//! hits between unrelated actors proceed in parallel. The delta is queued
//! before the locks are released, which keeps deltas for one target in
//! commit order.
//!
//! [`ActorStore`]: crate::actor_store::ActorStore

use crate::broadcaster::ChangeBroadcaster;
use crate::equipment::resolve_weapon;
use crate::validator::{validate, HitRejected};
use crate::world::World;
use log::debug;
use shared::{ActorId, ActorValues, ChangeValuesMessage, FormId, HitData, PLAYER_CHARACTER_ID};

/// A hit event with every reserved id resolved to a concrete actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitEvent {
    pub aggressor: ActorId,
    pub target: ActorId,
    pub source: FormId,
}

impl HitEvent {
    /// Replaces the player-character placeholder with the session's actor.
    pub fn from_packet(data: HitData, controlled_actor: ActorId) -> Self {
        let resolve = |id: ActorId| {
            if id == PLAYER_CHARACTER_ID {
                controlled_actor
            } else {
                id
            }
        };

        Self {
            aggressor: resolve(data.aggressor),
            target: resolve(data.target),
            source: data.source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitOutcome {
    Accepted {
        target: ActorId,
        values: ActorValues,
        /// `None` when the hit changed nothing.
        delta: Option<ChangeValuesMessage>,
    },
    Rejected(HitRejected),
}

impl HitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, HitOutcome::Accepted { .. })
    }
}

pub fn resolve_hit(
    world: &World,
    broadcaster: &ChangeBroadcaster,
    origin_session: u32,
    event: HitEvent,
) -> HitOutcome {
    let result = world
        .actors()
        .transact(event.aggressor, event.target, |tx| {
            let now = world.now();
            let weapon = resolve_weapon(world, tx.aggressor(), event.source);
            validate(world, tx, &weapon, now)?;

            let old = tx.target().actor_values;
            let base = world.base_attributes(tx.target().base_id);
            let new = world.formulas().calculate(&old, &base, &weapon.record);
            let committed = tx.apply(new, now);

            let delta = broadcaster.broadcast(origin_session, tx.target_id(), &old, &committed);
            Ok::<_, HitRejected>((committed, delta))
        })
        .map_err(HitRejected::from)
        .and_then(|inner| inner);

    match result {
        Ok((values, delta)) => {
            debug!(
                "Hit {:#x} -> {:#x} with {:#x} accepted, health {}",
                event.aggressor, event.target, event.source, values.health
            );
            world.stats().record_accepted(delta.is_some());
            HitOutcome::Accepted {
                target: event.target,
                values,
                delta,
            }
        }
        Err(reason) => {
            debug!(
                "Hit {:#x} -> {:#x} rejected: {}",
                event.aggressor, event.target, reason
            );
            world.stats().record_rejected(reason);
            HitOutcome::Rejected(reason)
        }
    }
}
