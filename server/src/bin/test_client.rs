use bincode::{deserialize, serialize};
use rand::Rng;
use shared::{HitData, Packet, PLAYER_CHARACTER_ID, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

/// Iron dagger form id from the built-in content.
const IRON_DAGGER: u32 = 0x0001397E;

async fn receive(socket: &UdpSocket, buf: &mut [u8]) -> Option<Packet> {
    match timeout(Duration::from_secs(2), socket.recv_from(buf)).await {
        Ok(Ok((len, _))) => deserialize::<Packet>(&buf[0..len]).ok(),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let server_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:10578".to_string())
        .parse::<SocketAddr>()?;

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    println!("Sending connection request to {}", server_addr);
    let connect = Packet::Connect {
        client_version: PROTOCOL_VERSION,
    };
    socket.send_to(&serialize(&connect)?, server_addr).await?;

    let mut buf = [0u8; 2048];
    let actor_id = match receive(&socket, &mut buf).await {
        Some(Packet::Connected {
            client_id,
            actor_id,
        }) => {
            println!("Connected as client {} controlling actor {:#x}", client_id, actor_id);
            actor_id
        }
        Some(Packet::Disconnected { reason }) => {
            println!("Connection refused: {}", reason);
            return Ok(());
        }
        other => {
            println!("Unexpected response: {:?}", other);
            return Ok(());
        }
    };

    // Self-hits with the dagger: some land inside the cooldown and are dropped
    let hit = Packet::Hit(HitData {
        aggressor: PLAYER_CHARACTER_ID,
        target: PLAYER_CHARACTER_ID,
        source: IRON_DAGGER,
    });
    let hit_data = serialize(&hit)?;

    for attempt in 1..=8 {
        let pause = rand::thread_rng().gen_range(300..1200);
        sleep(Duration::from_millis(pause)).await;

        socket.send_to(&hit_data, server_addr).await?;
        println!("Hit #{} sent after {}ms", attempt, pause);

        match receive(&socket, &mut buf).await {
            Some(Packet::ChangeValues(message)) => {
                println!("Actor {:#x} changed: {}", message.idx, message.to_json()?);
                if message.idx == actor_id && message.data.health.value() == Some(0.0) {
                    println!("Actor is down");
                    break;
                }
            }
            Some(other) => println!("Received packet: {:?}", other),
            None => println!("No change (hit rejected or lost)"),
        }
    }

    socket.send_to(&serialize(&Packet::Disconnect)?, server_addr).await?;
    println!("Disconnected");

    Ok(())
}
