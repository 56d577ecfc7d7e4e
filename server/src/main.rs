use clap::Parser;
use log::{error, info};
use server::clock::SystemClock;
use server::config::{parse_combat_distance, CombatSettings, ReachMetric, ServerConfig};
use server::form_data::StaticFormData;
use server::network::{NetResult, Server};
use server::world::World;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[arg(short, long, default_value = "10578")]
    port: u16,
    /// Tick rate (updates per second)
    #[arg(short, long, default_value = "30")]
    tick_rate: u32,
    /// Maximum number of concurrent sessions
    #[arg(short, long, default_value = "32")]
    max_clients: usize,
    /// JSON file with weapon and NPC records; built-in content when omitted
    #[arg(short, long)]
    content: Option<PathBuf>,
    /// Overrides the combat distance from the content file
    #[arg(long, value_parser = parse_combat_distance)]
    combat_distance: Option<f32>,
    /// Measure reach in the horizontal plane only
    #[arg(long)]
    horizontal_reach: bool,
}

#[tokio::main]
async fn main() -> NetResult<()> {
    env_logger::init();

    let args = Args::parse();

    let forms = match &args.content {
        Some(path) => match StaticFormData::load(path) {
            Ok(forms) => forms,
            Err(e) => {
                error!("Failed to load content from {}: {}", path.display(), e);
                return Err(e.into());
            }
        },
        None => StaticFormData::builtin(),
    };
    info!(
        "Loaded {} NPC records and {} weapon records",
        forms.npc_count(),
        forms.weapon_count()
    );

    let settings = CombatSettings {
        combat_distance: args.combat_distance,
        reach_metric: if args.horizontal_reach {
            ReachMetric::Horizontal
        } else {
            ReachMetric::Full3d
        },
        ..CombatSettings::default()
    };
    let world = Arc::new(World::new(Arc::new(forms), Arc::new(SystemClock)).with_settings(settings));

    let config = ServerConfig {
        tick_duration: Duration::from_secs_f32(1.0 / args.tick_rate.max(1) as f32),
        max_clients: args.max_clients,
        ..ServerConfig::default()
    };

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, config, world).await?;
    let shutdown = server.shutdown_handle();

    let server_handle = tokio::spawn(async move { server.run().await });

    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Err(e)) => error!("Server stopped with error: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            shutdown.shutdown();
        }
    }

    Ok(())
}
