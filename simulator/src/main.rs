//! Simulation driver for the Byzantine Generals consensus engine.
//!
//! Pure caller of the engine: registers the roster, assigns traitors, drives
//! the commander's broadcast and the t+1 exchange rounds concurrently, then
//! collects every general's decision and prints the consensus report. All
//! protocol logic lives in the engine crate.

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use engine::{ConsensusEngine, Decision, NodeId, Role};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Order {
    Attack,
    Retreat,
}

impl From<Order> for Decision {
    fn from(order: Order) -> Self {
        match order {
            Order::Attack => Decision::Attack,
            Order::Retreat => Decision::Retreat,
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(version, about = "Byzantine Generals oral-message simulation", long_about = None)]
struct Args {
    /// Number of generals, commander included
    #[arg(long, default_value_t = 4)]
    generals: i32,

    /// Maximum number of traitors
    #[arg(long, default_value_t = 1)]
    traitors: i32,

    /// Commander's initial order
    #[arg(long, value_enum, default_value_t = Order::Attack)]
    order: Order,

    /// Make the commander a traitor
    #[arg(long)]
    commander_traitor: bool,

    /// RNG seed for reproducible traitor assignment
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if args.generals <= 3 * args.traitors {
        bail!(
            "oral-message agreement needs n > 3t (got n={}, t={})",
            args.generals,
            args.traitors
        );
    }
    if args.traitors < 0 || args.generals < 2 {
        bail!("need at least a commander and one lieutenant, and t >= 0");
    }
    if args.commander_traitor && args.traitors == 0 {
        bail!("--commander-traitor requires --traitors of at least 1");
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let order = Decision::from(args.order);
    println!(
        "Starting Byzantine Generals simulation with {} generals ({} traitors max)",
        args.generals, args.traitors
    );
    println!("Commander's initial order: {order}");

    let engine = Arc::new(ConsensusEngine::new());
    let traitor_ids = assign_traitors(&args, &mut rng);

    register_roster(&engine, &args, &traitor_ids).await?;
    broadcast_order(&engine, &args, order).await?;
    run_exchange_rounds(&engine, &args, order).await;

    // Final phase: collect each general's decision and the aggregate verdict.
    for id in 0..args.generals {
        let resp = engine.get_decision(id).await;
        info!(general = id, decision = %resp.decision, "final decision");
    }

    let report = engine.report().await;
    println!("\n=== CONSENSUS RESULTS ===");
    print!("{}", report.summary());

    if !report.consensus_reached {
        std::process::exit(1);
    }
    Ok(())
}

/// Pick at most `traitors` traitor IDs: the commander takes a slot when
/// flagged, the rest are drawn from shuffled lieutenants. The realized count
/// is random, between zero and the allowed maximum.
fn assign_traitors(args: &Args, rng: &mut StdRng) -> Vec<NodeId> {
    let mut realized = rng.gen_range(0..=args.traitors);
    if args.commander_traitor {
        // The flag is a promise; always spend one slot on the commander.
        realized = realized.max(1);
    }
    println!(
        "Simulation will have {realized} traitors (maximum allowed: {})",
        args.traitors
    );

    let mut traitor_ids = Vec::new();
    let mut remaining = realized;
    if args.commander_traitor {
        traitor_ids.push(0);
        remaining -= 1;
    }

    let mut lieutenants: Vec<NodeId> = (1..args.generals).collect();
    lieutenants.shuffle(rng);
    traitor_ids.extend(lieutenants.into_iter().take(remaining as usize));
    traitor_ids
}

async fn register_roster(
    engine: &ConsensusEngine,
    args: &Args,
    traitor_ids: &[NodeId],
) -> Result<()> {
    for id in 0..args.generals {
        let role = if id == 0 { Role::Commander } else { Role::Lieutenant };
        let is_traitor = traitor_ids.contains(&id);
        let resp = engine.register(id, role, is_traitor).await;
        if !resp.success {
            bail!("failed to register general {id}: {}", resp.message);
        }
        println!(
            "General {id}: {}, {}",
            if id == 0 { "Commander" } else { "Lieutenant" },
            if is_traitor { "Traitor" } else { "Loyal" }
        );
    }
    Ok(())
}

/// Phase 1: the commander sends the initial order to every lieutenant, one
/// concurrent task per delivery.
async fn broadcast_order(engine: &Arc<ConsensusEngine>, args: &Args, order: Decision) -> Result<()> {
    println!("\nPhase 1: Commander sends initial order to all lieutenants");
    let mut handles = Vec::new();
    for lieutenant in 1..args.generals {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            (lieutenant, engine.send_initial_order(0, lieutenant, order).await)
        }));
    }
    for handle in handles {
        let (lieutenant, resp) = handle.await?;
        if !resp.received {
            bail!("order to lieutenant {lieutenant} rejected: {}", resp.message);
        }
        info!(lieutenant, %order, "order delivered");
    }
    Ok(())
}

/// Phases 2..=t+1: every general forwards its view of the order to every
/// other general. Traitor tampering happens inside the engine's delivery
/// path, so the driver always submits the original order.
async fn run_exchange_rounds(engine: &Arc<ConsensusEngine>, args: &Args, order: Decision) {
    let max_rounds = engine.max_rounds().await;
    for round in 2..=max_rounds {
        println!("\nPhase {round}: Exchanging messages between generals");
        let mut handles = Vec::new();
        for sender in 0..args.generals {
            for receiver in 0..args.generals {
                if sender == receiver {
                    continue;
                }
                let engine = engine.clone();
                handles.push(tokio::spawn(async move {
                    engine
                        .exchange(round, sender, receiver, order, &[sender])
                        .await
                }));
            }
        }
        for handle in handles {
            if let Ok(resp) = handle.await {
                if !resp.received {
                    info!(round, "delivery rejected: {}", resp.message);
                }
            }
        }
        println!("Round {round} completed");
    }
}
