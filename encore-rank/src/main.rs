//! Encore Ranking demo - Main entry point
//!
//! Interactive terminal session for the ranking engine: add concert
//! reviews, answer the comparison prompts, and inspect the resulting
//! per-bucket order. Comparisons reach the terminal through the same
//! oracle seam the production UI uses for its modal prompt.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use encore_common::{Rating, ReviewItem};
use encore_rank::{Comparison, ComparisonOracle, MoveDirection, RankingEngine, SessionRegistry};

/// Command-line arguments for the encore-rank demo
#[derive(Parser, Debug)]
#[command(name = "encore-rank")]
#[command(about = "Interactive concert review ranking session")]
#[command(version)]
struct Args {
    /// User id for this session
    #[arg(short, long, default_value = "demo", env = "ENCORE_USER")]
    user: String,

    /// Event channel capacity for new sessions
    #[arg(long, default_value = "100", env = "ENCORE_EVENT_CAPACITY")]
    event_capacity: usize,
}

type SharedInput = Arc<Mutex<Lines<BufReader<Stdin>>>>;

/// Oracle that prompts on stdout and reads the preferred show from stdin
struct TerminalOracle {
    input: SharedInput,
}

#[async_trait]
impl ComparisonOracle for TerminalOracle {
    async fn compare(
        &self,
        a: &ReviewItem,
        b: &ReviewItem,
    ) -> encore_common::Result<Comparison> {
        println!("Which show was better?");
        println!("  1) {}", a.title);
        println!("  2) {}", b.title);
        loop {
            prompt("choice> ").map_err(|e| encore_common::Error::Oracle(e.to_string()))?;
            let line = self
                .input
                .lock()
                .await
                .next_line()
                .await
                .map_err(|e| encore_common::Error::Oracle(e.to_string()))?;
            match line.as_deref().map(str::trim) {
                Some("1") => return Ok(Comparison::won_by(a, b)),
                Some("2") => return Ok(Comparison::won_by(b, a)),
                Some(_) => println!("Enter 1 or 2"),
                None => {
                    return Err(encore_common::Error::Oracle(
                        "input closed during comparison".to_string(),
                    ))
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "encore_rank=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let sessions = SessionRegistry::new(args.event_capacity);
    let engine = sessions.engine_for(&args.user).await;
    info!("Started ranking session for user {}", args.user);

    // Log rank events as they arrive
    let mut events = engine.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!("Rank event: {:?}", event);
        }
    });

    let input: SharedInput = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let oracle = TerminalOracle {
        input: Arc::clone(&input),
    };

    print_help();
    loop {
        prompt("encore> ")?;
        let line = {
            let mut input = input.lock().await;
            input.next_line().await.context("Failed to read command")?
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.splitn(3, char::is_whitespace);
        let command = parts.next().unwrap_or("");
        match command {
            "add" => {
                let (Some(rating), Some(title)) = (parts.next(), parts.next()) else {
                    println!("usage: add <good|okay|bad> <title>");
                    continue;
                };
                let rating: Rating = match rating.parse() {
                    Ok(rating) => rating,
                    Err(e) => {
                        warn!("{}", e);
                        continue;
                    }
                };
                let review =
                    ReviewItem::new(Uuid::new_v4().to_string(), title.to_string(), rating);
                match engine.insert(review, &oracle).await {
                    Ok(position) => {
                        println!("Ranked #{} in the {} bucket", position + 1, rating)
                    }
                    Err(e) => warn!("Insert failed: {}", e),
                }
            }
            "rerank" => {
                let Some(prefix) = parts.next() else {
                    println!("usage: rerank <id>");
                    continue;
                };
                let Some(id) = resolve(&engine, prefix).await else {
                    println!("No review matching {prefix}");
                    continue;
                };
                match engine.reposition(&id, &oracle).await {
                    Ok(position) => println!("Now at position {}", position + 1),
                    Err(e) => warn!("Rerank failed: {}", e),
                }
            }
            "move" => {
                let (Some(prefix), Some(direction)) = (parts.next(), parts.next()) else {
                    println!("usage: move <id> <up|down>");
                    continue;
                };
                let direction = match direction {
                    "up" => MoveDirection::Up,
                    "down" => MoveDirection::Down,
                    _ => {
                        println!("usage: move <id> <up|down>");
                        continue;
                    }
                };
                let Some(id) = resolve(&engine, prefix).await else {
                    println!("No review matching {prefix}");
                    continue;
                };
                match engine.move_review(&id, direction).await {
                    Ok(position) => println!("Now at position {}", position + 1),
                    Err(e) => warn!("Move failed: {}", e),
                }
            }
            "remove" => {
                let Some(prefix) = parts.next() else {
                    println!("usage: remove <id>");
                    continue;
                };
                let Some(id) = resolve(&engine, prefix).await else {
                    println!("No review matching {prefix}");
                    continue;
                };
                if engine.remove(&id).await {
                    println!("Removed {}", short(&id));
                }
            }
            "list" => print_rankings(&engine).await,
            "help" => print_help(),
            "quit" | "exit" => break,
            other => println!("Unknown command: {other} (try 'help')"),
        }
    }

    info!("Session closed ({} reviews ranked)", engine.total().await);
    Ok(())
}

/// Match a user-typed id prefix against the ranked reviews
async fn resolve(engine: &RankingEngine, prefix: &str) -> Option<String> {
    engine
        .combined_ranking()
        .await
        .into_iter()
        .find(|r| r.id.starts_with(prefix))
        .map(|r| r.id)
}

async fn print_rankings(engine: &RankingEngine) {
    let rankings = engine.all_rankings().await;
    for rating in Rating::ALL {
        println!("{}:", rating);
        let bucket = rankings.bucket(rating);
        if bucket.is_empty() {
            println!("  (empty)");
            continue;
        }
        for review in bucket {
            println!("  {}. [{}] {}", review.position + 1, short(&review.id), review.title);
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  add <good|okay|bad> <title>   review a show and rank it");
    println!("  rerank <id>                   re-check a review against its neighbor");
    println!("  move <id> <up|down>           nudge a review one step, no questions asked");
    println!("  remove <id>                   delete a review");
    println!("  list                          show all three buckets");
    println!("  quit                          end the session");
}

fn prompt(text: &str) -> std::io::Result<()> {
    print!("{text}");
    std::io::stdout().flush()
}

fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
