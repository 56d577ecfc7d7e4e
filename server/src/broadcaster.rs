//! Outbound ActorValues deltas
//!
//! The broadcaster diffs a target's values before and after an accepted hit
//! and queues a [`ChangeValuesMessage`] carrying only the components that
//! changed. Delivery is the network layer's job: it drains the receiving end
//! of the queue and fans each delta out to the sessions in its scope.

use log::error;
use shared::{ActorId, ActorValues, ActorValuesDelta, ChangeValuesMessage};
use tokio::sync::mpsc;

/// Sessions that must observe a delta: at least the session that sent the
/// hit, plus whoever controls the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaScope {
    pub origin_session: u32,
    pub target: ActorId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundDelta {
    pub scope: DeltaScope,
    pub message: ChangeValuesMessage,
}

/// Cloneable producer side of the outbound delta queue
#[derive(Debug, Clone)]
pub struct ChangeBroadcaster {
    tx: mpsc::UnboundedSender<OutboundDelta>,
}

impl ChangeBroadcaster {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundDelta>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues a delta for `target` if any component differs between `old` and
    /// `new`. Returns the queued message.
    pub fn broadcast(
        &self,
        origin_session: u32,
        target: ActorId,
        old: &ActorValues,
        new: &ActorValues,
    ) -> Option<ChangeValuesMessage> {
        let data = ActorValuesDelta::diff(old, new);
        if data.is_empty() {
            return None;
        }

        let message = ChangeValuesMessage::new(target, data);
        let delta = OutboundDelta {
            scope: DeltaScope {
                origin_session,
                target,
            },
            message,
        };

        if let Err(e) = self.tx.send(delta) {
            error!("Failed to queue delta for actor {:#x}: {}", target, e);
        }
        Some(message)
    }
}
