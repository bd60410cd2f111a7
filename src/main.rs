use std::sync::Arc;
use std::time::Duration;

use broadside::relay::client::RelayClient;
use broadside::relay::server::RelayServer;
use broadside::{init_logging, EventSink, GameSession, GameStatus};
use clap::{Parser, Subcommand};
use rand::rngs::SmallRng;
use rand::SeedableRng;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay server that stores and hands out fleet configurations.
    Serve {
        #[arg(long, default_value = "0.0.0.0:12345")]
        bind: String,
        #[arg(long, help = "Shut down once the last client disconnects")]
        finalize: bool,
    },
    /// Play one automated game against the system and print the log.
    Play {
        #[arg(long, default_value_t = 10)]
        dim: usize,
        #[arg(long, help = "Fix RNG seed for a reproducible game")]
        seed: Option<u64>,
    },
    /// Upload a randomized fleet configuration to a relay server.
    Upload {
        #[arg(long, default_value = "127.0.0.1:12345")]
        connect: String,
        #[arg(long, default_value_t = 10)]
        dim: usize,
        #[arg(long, help = "Fix RNG seed for a reproducible fleet")]
        seed: Option<u64>,
    },
    /// Download a fleet configuration from a relay server and print it.
    Fetch {
        #[arg(long, default_value = "127.0.0.1:12345")]
        connect: String,
        #[arg(long, default_value_t = 10)]
        dim: usize,
    },
}

/// Prints every core event to the terminal.
struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn on_log_event(&self, message: &str) {
        println!("{message}");
    }

    fn on_game_over(&self, winner_is_player: bool, summary: &str) {
        println!(
            "=== GAME OVER: {} ===",
            if winner_is_player { "you win" } else { "the system wins" }
        );
        println!("{summary}");
    }
}

fn small_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_rng(&mut rand::rng()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let events: Arc<dyn EventSink> = Arc::new(ConsoleSink);

    match cli.command {
        Commands::Serve { bind, finalize } => {
            let server = RelayServer::bind(&bind, events).await?;
            println!("Relay server listening on {}", server.local_addr());
            if finalize {
                server.set_finalized(true);
            }
            server.shutdown_complete().await;
        }
        Commands::Play { dim, seed } => {
            let mut aim_rng = small_rng(seed.map(|s| s.wrapping_add(1)));
            let mut session = GameSession::with_rng(dim, events, small_rng(seed));
            session.randomize_player_fleet();
            session.begin();
            while session.status() == GameStatus::InProgress {
                if session.is_players_turn() {
                    match session.system_board().random_unresolved_target(&mut aim_rng) {
                        Some((row, col)) => {
                            session.player_guess(row, col);
                        }
                        None => break,
                    }
                } else {
                    session.system_guess();
                }
            }
        }
        Commands::Upload { connect, dim, seed } => {
            let client = RelayClient::new(events.clone(), dim);
            {
                let handle = client.session_handle();
                let mut guard = handle.lock().unwrap();
                let mut session = GameSession::with_rng(dim, events.clone(), small_rng(seed));
                session.randomize_player_fleet();
                *guard = Some(session);
            }
            client.connect(&connect).await?;
            if client.send_configuration().await {
                println!("Fleet configuration uploaded");
            }
            client.disconnect().await;
        }
        Commands::Fetch { connect, dim } => {
            let client = RelayClient::new(events.clone(), dim);
            client.connect(&connect).await?;
            client.request_configuration().await;

            let handle = client.session_handle();
            let mut received = None;
            for _ in 0..20 {
                tokio::time::sleep(Duration::from_millis(100)).await;
                let guard = handle.lock().unwrap();
                if let Some(session) = guard.as_ref() {
                    if session.is_player_fleet_placed() {
                        received = Some(session.player_fleet_layout());
                        break;
                    }
                }
            }
            match received {
                Some(layout) => println!("Received fleet: {layout}"),
                None => println!("No configuration received"),
            }
            client.disconnect().await;
        }
    }
    Ok(())
}
