//! CLI application for a Hue-style bridge.
//!
//! Credentials are cached in a JSON file so discovery and pairing only run
//! once.
//!
//! Run with: cargo run --example hue_cli -- --help

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use hue_bridge_rs::{
    BridgeAddress, BridgeClient, BridgeConfig, BridgeLocator, CommandKind, CredentialStore,
    FileStore, HttpTransport, PairingSession, Target, setup, target,
};

#[derive(Parser)]
#[command(name = "hue-cli")]
#[command(about = "Control a Hue-style lighting bridge from the command line", long_about = None)]
struct Cli {
    /// Where the bridge address and token are cached
    #[arg(short, long, global = true, default_value = "hue-bridge.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the bridge on the local network
    Discover,

    /// Pair with the bridge (press the link button first)
    Pair {
        /// Bridge address; discovered or cached when omitted
        #[arg(short, long)]
        address: Option<String>,
        /// Seconds to wait for the link button (default: 60)
        #[arg(short, long, default_value = "60")]
        timeout: u64,
    },

    /// List lights
    Lights,

    /// List scenes
    Scenes,

    /// Turn lights on
    On {
        /// Light ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Turn lights off
    Off {
        /// Light ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Set hue/saturation/brightness (turns the lights on)
    Color {
        /// Hue (0-65535)
        hue: u16,
        /// Saturation (0-254)
        sat: u8,
        /// Brightness (1-254)
        bri: u8,
        /// Light ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Activate a scene
    Scene {
        /// Scene id
        id: String,
    },

    /// Show client diagnostics after a connectivity check
    Diagnostics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = BridgeConfig::default();
    let store: Arc<dyn CredentialStore> = Arc::new(FileStore::new(&cli.store));
    let transport = HttpTransport::new(&config)?;

    match cli.command {
        Commands::Discover => {
            let locator = BridgeLocator::new(transport, Arc::clone(&store), &config);
            let bridges = locator.candidates().await?;
            if bridges.is_empty() {
                println!("No bridge found on the network.");
            } else {
                for bridge in &bridges {
                    println!("  {}  id: {}", bridge.address, bridge.id.as_deref().unwrap_or("-"));
                }
                store.save_address(&bridges[0].address)?;
            }
        }
        Commands::Pair { address, timeout } => {
            let address = match address {
                Some(address) => BridgeAddress::new(address),
                None => match store.load()?.address {
                    Some(address) => address,
                    None => BridgeLocator::new(transport.clone(), Arc::clone(&store), &config)
                        .discover()
                        .await
                        .ok_or("no bridge found; pass --address")?,
                },
            };
            store.save_address(&address)?;

            let timeout = Duration::from_secs(timeout);
            println!("Press the link button on the bridge at {address}...");
            let token = PairingSession::new(transport, store, &config)
                .pair(&address, timeout)
                .await
                .into_result(timeout)?;
            println!("Paired. Token {token} saved to {}", cli.store.display());
        }
        command => {
            let client = setup::connect(transport, store, &config).await?;
            run(&client, command).await?;
        }
    }

    Ok(())
}

async fn run(
    client: &BridgeClient<HttpTransport>,
    command: Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Lights => list(client, CommandKind::Lights).await?,
        Commands::Scenes => list(client, CommandKind::Scenes).await?,
        Commands::On { ids } => {
            let target: Target = ids.into_iter().collect();
            report(target::set_on_off(client, &target, true).await);
        }
        Commands::Off { ids } => {
            let target: Target = ids.into_iter().collect();
            report(target::set_on_off(client, &target, false).await);
        }
        Commands::Color { hue, sat, bri, ids } => {
            let target: Target = ids.into_iter().collect();
            report(target::set_color(client, &target, hue, sat, bri).await);
        }
        Commands::Scene { id } => {
            client.activate_scene(&id).await?;
            println!("Scene {id} activated");
        }
        Commands::Diagnostics => {
            println!("connected: {}", client.is_connected().await);
            println!("{}", serde_json::to_string_pretty(&client.diagnostics().await)?);
        }
        Commands::Discover | Commands::Pair { .. } => unreachable!("handled before connecting"),
    }
    Ok(())
}

async fn list(
    client: &BridgeClient<HttpTransport>,
    kind: CommandKind,
) -> Result<(), Box<dyn std::error::Error>> {
    for record in client.fetch_collection(kind).await? {
        println!("{:>4}  {}", record.id(), record.name().unwrap_or("(unnamed)"));
    }
    Ok(())
}

fn report(results: Vec<hue_bridge_rs::TargetResult>) {
    for r in results {
        match r.result {
            Ok(()) => println!("  ✓ light {}", r.id),
            Err(e) => eprintln!("  ✗ light {}: {}", r.id, e),
        }
    }
}
