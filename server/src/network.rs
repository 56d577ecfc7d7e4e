//! Server network layer handling UDP communications and hit dispatch

use crate::actor_store::ChangeForm;
use crate::broadcaster::{ChangeBroadcaster, DeltaScope, OutboundDelta};
use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::hit::{resolve_hit, HitEvent, HitOutcome};
use crate::world::World;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use rand::Rng;
use shared::{ActorId, HitData, Packet, Vec3, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

pub type NetResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// First id handed to actors spawned for sessions.
pub const FIRST_DYNAMIC_ACTOR_ID: ActorId = 0xff000000;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
        actor_id: Option<ActorId>,
    },
    Shutdown,
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Stops a running [`Server`] from another task
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        if self.tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Server already stopped");
        }
    }
}

/// Main server coordinating networking and hit resolution
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    world: Arc<World>,
    config: ServerConfig,
    broadcaster: ChangeBroadcaster,
    delta_rx: Option<mpsc::UnboundedReceiver<OutboundDelta>>,
    next_actor_id: ActorId,
    tick: u64,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    pub async fn new(addr: &str, config: ServerConfig, world: Arc<World>) -> NetResult<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();
        let (broadcaster, delta_rx) = ChangeBroadcaster::new();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_clients))),
            world,
            config,
            broadcaster,
            delta_rx: Some(delta_rx),
            next_actor_id: FIRST_DYNAMIC_ACTOR_ID,
            tick: 0,
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> NetResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn world(&self) -> Arc<World> {
        Arc::clone(&self.world)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.server_tx.clone(),
        }
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let Some(mut game_rx) = self.game_rx.take() else {
            return;
        };

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that drains the delta queue and fans each delta out to
    /// the sessions observing the target
    fn spawn_delta_forwarder(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let Some(mut delta_rx) = self.delta_rx.take() else {
            return;
        };

        tokio::spawn(async move {
            while let Some(delta) = delta_rx.recv().await {
                let recipients = {
                    let clients_guard = clients.read().await;
                    delta_recipients(&clients_guard, &delta.scope)
                };

                let packet = Packet::ChangeValues(delta.message);
                for addr in recipients {
                    if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                        error!("Failed to send delta to {}: {}", addr, e);
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();
        let timeout = self.config.client_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts(timeout)
                };

                for client in timed_out {
                    let message = ServerMessage::ClientTimeout {
                        client_id: client.id,
                        actor_id: client.actor_id,
                    };
                    if let Err(e) = server_tx.send(message) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(socket: &UdpSocket, packet: &Packet, addr: SocketAddr) -> NetResult<()> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Next dynamic actor id not held by a live actor. Wraps around at the
    /// top of the range; `None` once every dynamic id is taken.
    fn allocate_actor_id(&mut self) -> Option<ActorId> {
        let range = u64::from(ActorId::MAX - FIRST_DYNAMIC_ACTOR_ID) + 1;

        for _ in 0..range {
            let candidate = self.next_actor_id;
            self.next_actor_id = candidate
                .checked_add(1)
                .unwrap_or(FIRST_DYNAMIC_ACTOR_ID);

            if !self.world.actors().contains(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Spawns an actor for a new session, wearing the configured loadout
    fn spawn_session_actor(&mut self) -> Option<ActorId> {
        let actor_id = self.allocate_actor_id()?;

        let actors = self.world.actors();
        actors.spawn(
            actor_id,
            ChangeForm::new(self.config.spawn_base, spawn_position(), Vec3::default()),
        );
        for &item in &self.config.starting_loadout {
            let equipped = actors
                .add_item(actor_id, item, 1)
                .and_then(|()| actors.set_worn(actor_id, item, true));
            match equipped {
                Ok(true) => {}
                Ok(false) => warn!("Loadout item {:#x} not carried by {:#x}", item, actor_id),
                Err(e) => warn!("Failed to equip {:#x} on {:#x}: {}", item, actor_id, e),
            }
        }
        Some(actor_id)
    }

    async fn drop_session(&self, client_id: u32) {
        let removed = {
            let mut clients = self.clients.write().await;
            clients.remove_client(&client_id)
        };
        if let Some(actor_id) = removed.and_then(|client| client.actor_id) {
            self.world.actors().remove(actor_id);
        }
    }

    async fn handle_hit(&self, data: HitData, addr: SocketAddr) {
        let session = {
            let mut clients = self.clients.write().await;
            clients.find_client_by_addr(addr).map(|client_id| {
                clients.touch(client_id);
                (client_id, clients.actor_of(client_id))
            })
        };

        let Some((client_id, Some(actor_id))) = session else {
            warn!("Hit from {} without a controlled actor", addr);
            return;
        };

        let event = HitEvent::from_packet(data, actor_id);
        if event.aggressor != actor_id {
            warn!(
                "Client {} reported a hit for actor {:#x} it does not control",
                client_id, event.aggressor
            );
            return;
        }

        match resolve_hit(&self.world, &self.broadcaster, client_id, event) {
            HitOutcome::Accepted { values, delta, .. } => {
                debug!(
                    "Client {} hit {:#x}: health {} ({})",
                    client_id,
                    event.target,
                    values.health,
                    if delta.is_some() { "delta queued" } else { "unchanged" }
                );
            }
            HitOutcome::Rejected(reason) => {
                debug!("Client {} hit rejected: {}", client_id, reason);
            }
        }
    }

    /// Processes incoming packets
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    let response = Packet::Disconnected {
                        reason: "Protocol version mismatch".to_string(),
                    };
                    self.send_packet(response, addr);
                    return;
                }

                // Remove existing connection if present
                let existing_client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };
                if let Some(existing_id) = existing_client_id {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    self.drop_session(existing_id).await;
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                let Some(client_id) = client_id else {
                    let response = Packet::Disconnected {
                        reason: "Server full".to_string(),
                    };
                    self.send_packet(response, addr);
                    return;
                };

                if let Some(actor_id) = self.spawn_session_actor() {
                    {
                        let mut clients = self.clients.write().await;
                        clients.set_actor(client_id, actor_id);
                    }
                    self.send_packet(Packet::Connected { client_id, actor_id }, addr);
                } else {
                    warn!("No free actor id for client {}", client_id);
                    {
                        let mut clients = self.clients.write().await;
                        clients.remove_client(&client_id);
                    }
                    let response = Packet::Disconnected {
                        reason: "No free actor id".to_string(),
                    };
                    self.send_packet(response, addr);
                }
            }

            Packet::Hit(data) => {
                self.handle_hit(data, addr).await;
            }

            Packet::Disconnect => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    self.drop_session(client_id).await;
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    async fn log_stats(&self) {
        let client_count = {
            let clients = self.clients.read().await;
            clients.len()
        };

        if client_count > 0 {
            let stats = self.world.stats().snapshot();
            debug!(
                "Tick {}: {} clients, {} actors, {} hits accepted, {} rejected, {} deltas, {} static data fallbacks",
                self.tick,
                client_count,
                self.world.actors().len(),
                stats.accepted,
                stats.rejected(),
                stats.deltas_sent,
                stats.static_data_fallbacks
            );
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> NetResult<()> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_delta_forwarder();
        self.spawn_timeout_checker();

        let mut tick_interval = interval(self.config.tick_duration);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id, actor_id }) => {
                            info!("Client {} timed out", client_id);
                            if let Some(actor_id) = actor_id {
                                self.world.actors().remove(actor_id);
                            }
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    self.tick += 1;

                    // Periodic combat monitoring
                    if self.tick % 60 == 0 {
                        self.log_stats().await;
                    }
                },
            }
        }

        Ok(())
    }
}

/// Addresses that must receive a delta: the session that landed the hit and
/// the session controlling the target, if it is a different one.
pub fn delta_recipients(clients: &ClientManager, scope: &DeltaScope) -> Vec<SocketAddr> {
    let mut recipients = Vec::with_capacity(2);

    if let Some(addr) = clients.addr_of(scope.origin_session) {
        recipients.push(addr);
    }
    if let Some(owner) = clients.session_controlling(scope.target) {
        if owner != scope.origin_session {
            if let Some(addr) = clients.addr_of(owner) {
                recipients.push(addr);
            }
        }
    }
    recipients
}

fn spawn_position() -> Vec3 {
    let mut rng = rand::thread_rng();
    Vec3::new(rng.gen_range(-32.0..32.0), rng.gen_range(-32.0..32.0), 0.0)
}
