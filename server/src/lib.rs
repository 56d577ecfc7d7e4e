//! # Melee Authority Server Library
//!
//! This library provides the server-authoritative combat core for a networked
//! open-world game. Clients report that their character struck something; the
//! server decides whether that hit is legal, computes the damage, commits the
//! result and broadcasts what changed.
//!
//! ## Core Responsibilities
//!
//! ### Hit Validation
//! Every reported hit passes three gates in a fixed order:
//! - Liveness: a dead aggressor cannot strike
//! - Cooldown: the weapon's attack speed bounds how often hits land
//! - Range: weapon reach scaled by the combat distance, plus both actors' bounds
//!
//! A rejected hit leaves no trace on either actor and produces no message.
//!
//! ### Damage and Commit
//! Accepted hits run the damage formula registered for the weapon's category,
//! clamp the result into `[0, 1]`, write it to the target and advance the
//! aggressor's last-hit time.
//!
//! ### Delta Broadcasting
//! Only the ActorValues components that actually changed are sent, as a
//! `ChangeValues` message addressed to the session that landed the hit and to
//! the session controlling the target.
//!
//! ## Architecture Design
//!
//! ### Per-Actor Locking
//! Actor state lives in an [`actor_store::ActorStore`] with one lock per actor.
//! A hit locks its aggressor and target in ascending id order for the whole
//! validate-damage-commit-enqueue sequence. Hits between unrelated actors run
//! in parallel; hits sharing an actor are strictly serialized.
//!
//! ### Explicit Context
//! Static content, the time source, tunables and damage formulas are bundled
//! in a [`world::World`] passed to every resolution. Tests swap in a
//! [`clock::ManualClock`] and hand-built content without touching globals.
//!
//! ### UDP-Based Communication
//! The network shell uses UDP sockets and bincode-encoded packets. The
//! `ChangeValues` payload also has a JSON form matching the client protocol.
//!
//! ## Module Organization
//!
//! ### Actor Store (`actor_store`)
//! Runtime state per actor: values, inventory, last hit time, dead flag.
//!
//! ### Static Content (`form_data`)
//! Read-only weapon records, base attributes and object bounds, loadable
//! from JSON.
//!
//! ### Hit Pipeline (`equipment`, `validator`, `damage`, `hit`)
//! Weapon resolution, the three validation gates, the per-category damage
//! table and the end-to-end [`hit::resolve_hit`] entry point.
//!
//! ### Outbound Queue (`broadcaster`)
//! Diffs old and new values and queues `ChangeValues` deltas.
//!
//! ### Network Module (`network`) and Client Manager (`client_manager`)
//! Session lifecycle, actor binding and packet dispatch.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::clock::SystemClock;
//! use server::config::ServerConfig;
//! use server::form_data::StaticFormData;
//! use server::network::Server;
//! use server::world::World;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let world = Arc::new(World::new(
//!         Arc::new(StaticFormData::builtin()),
//!         Arc::new(SystemClock),
//!     ));
//!
//!     let mut server = Server::new("127.0.0.1:8080", ServerConfig::default(), world).await?;
//!
//!     // Runs until shut down:
//!     // - Accepts sessions and spawns an actor for each
//!     // - Resolves reported hits against the authoritative state
//!     // - Forwards ActorValues deltas to the affected sessions
//!     // - Despawns actors of timed-out sessions
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod actor_store;
pub mod broadcaster;
pub mod client_manager;
pub mod clock;
pub mod config;
pub mod damage;
pub mod equipment;
pub mod form_data;
pub mod hit;
pub mod network;
pub mod validator;
pub mod world;
