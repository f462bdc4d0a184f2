/// friend-finder CLI
///
/// Runs the HTTP API and exposes the matching core for quick experiments.
///
/// Usage:
///   finder serve [--bind <addr>] [--port <port>] [--seed <file>]  - Start the HTTP API
///   finder knn [--metric <m>] [-k <n>] [--query a,b,c,d,e]        - Query the reference pool
///   finder score <a,b,c,d,e> <a,b,c,d,e>                          - Score two profiles
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use friend_finder::config::{DEFAULT_PORT, ServerConfig};
use friend_finder::http::HttpServer;
use friend_finder::vector::sample::{REFERENCE_QUERY, scale, scaled_reference_sample};
use friend_finder::{CompatibilityScorer, DistanceMetric, MemoryStore, TraitVector, VectorIndex};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

/// friend-finder - personality-based friend matching
#[derive(Parser)]
#[command(name = "finder")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API over an in-memory store
    ///
    /// Examples:
    ///   finder serve
    ///   finder serve --bind 0.0.0.0 --port 9000 --seed fixtures/users.json
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: IpAddr,

        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// JSON fixture with users, friendships and sessions
        #[arg(short, long)]
        seed: Option<PathBuf>,
    },

    /// Find nearest neighbours in the eight-user reference pool
    ///
    /// The pool and the query are given on the 1-5 scale and multiplied
    /// by 20 before searching.
    ///
    /// Examples:
    ///   finder knn
    ///   finder knn --metric cosine -k 5 --query 3,3,3,3,3
    Knn {
        /// Distance metric: euclidean, manhattan or cosine
        #[arg(short, long, default_value = "euclidean")]
        metric: DistanceMetric,

        /// Number of neighbours
        #[arg(short, default_value_t = 3)]
        k: usize,

        /// Query vector on the 1-5 scale
        #[arg(short, long, value_delimiter = ',')]
        query: Option<Vec<f64>>,
    },

    /// Print the compatibility score for two profiles on the 0-100 scale
    ///
    /// The first profile is the current user; the score is not symmetric.
    ///
    /// Example:
    ///   finder score 80,50,70,60,40 50,60,70,60,60
    Score {
        /// Current user's traits
        a: String,

        /// Candidate's traits
        b: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Parse `a,b,c,d,e` into a validated vector.
fn parse_traits(raw: &str) -> Result<TraitVector> {
    let values = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("'{}' is not a number", part.trim()))
        })
        .collect::<Result<Vec<f64>>>()?;
    TraitVector::from_slice(&values).with_context(|| format!("Invalid trait vector '{}'", raw))
}

async fn run_http_server(bind: IpAddr, port: u16, seed: Option<PathBuf>) -> Result<()> {
    let config = ServerConfig::new().bind_addr(SocketAddr::new(bind, port));

    let store = match &seed {
        Some(path) => MemoryStore::load_seed(path, config.session_ttl)
            .await
            .with_context(|| format!("Failed to load seed file {}", path.display()))?,
        None => MemoryStore::with_session_ttl(config.session_ttl),
    };

    println!("{}", "Starting friend-finder HTTP server...".bold().cyan());
    println!();
    println!("  {} {}", "Bind:".bright_white(), config.bind_addr);
    if let Some(path) = &seed {
        println!("  {} {}", "Seed:".bright_white(), path.display());
    }
    println!();
    println!("  {}", "Endpoints:".bright_black());
    println!("    GET    /api/discover/compatible-users      - Ranked matches");
    println!("    GET    /api/discover/stats                 - Discovery stats");
    println!("    GET    /api/discover/personality-insights  - Ideal match ranges");
    println!("    POST   /api/quiz/save-results              - Save quiz results");
    println!("    GET    /api/quiz/my-results                - Current results");
    println!("    GET    /api/quiz/history                   - Result history");
    println!("    GET    /api/quiz/stats                     - Result statistics");
    println!("    DELETE /api/quiz/results/:result_id        - Delete a result");
    println!("    POST   /api/friends/request                - Send a friend request");
    println!("    POST   /api/friends/accept/:user_id        - Accept a friend request");
    println!("    DELETE /api/friends/remove/:user_id        - Remove a friend");
    println!("    GET    /api/friends/list                   - Accepted friends");
    println!("    GET    /api/friends/status/:user_id        - Friendship status");
    println!("    GET    /api/users/:user_id                 - User profile");
    println!();
    println!("{}", "Server is running. Press Ctrl+C to stop.".green());
    println!();

    let shutdown = async {
        signal::ctrl_c().await.ok();
        println!();
        println!("{}", "Shutting down...".yellow());
    };

    HttpServer::new(Arc::new(store), config)
        .serve_until(shutdown)
        .await
        .context("HTTP server failed")?;
    Ok(())
}

fn run_knn(metric: DistanceMetric, k: usize, query: Option<Vec<f64>>) -> Result<()> {
    let query = match query {
        Some(values) => {
            let values: [f64; 5] = values
                .try_into()
                .map_err(|_| anyhow::anyhow!("--query needs exactly five values"))?;
            scale(values)
        }
        None => scale(REFERENCE_QUERY),
    };
    let index = VectorIndex::new(scaled_reference_sample())?;

    println!(
        "{} {:?} ({})",
        "Query:".bright_white(),
        query,
        metric.to_string().cyan()
    );
    println!();
    let neighbors = index.find_k_nearest(&query, k, metric)?;
    if neighbors.is_empty() {
        println!("{}", "No neighbours requested.".yellow());
    }
    for (rank, neighbor) in neighbors.iter().enumerate() {
        println!(
            "  {} {}: {:.4}",
            format!("{}.", rank + 1).bright_black(),
            neighbor.id.bold(),
            neighbor.distance
        );
    }

    if metric == DistanceMetric::Euclidean {
        println!();
        println!("{}", "Vectorized euclidean:".bright_white());
        for neighbor in index.find_k_nearest_vectorized(&query, k)? {
            println!("  {}: {:.4}", neighbor.id.bold(), neighbor.distance);
        }
    }
    Ok(())
}

fn run_score(a: &str, b: &str) -> Result<()> {
    let a = parse_traits(a)?;
    let b = parse_traits(b)?;
    let breakdown = CompatibilityScorer::new().breakdown(&a, &b);

    println!("{} {}", "Current user:".bright_white(), a);
    println!("{} {}", "Candidate:   ".bright_white(), b);
    println!();
    println!("  {} {:.4}", "Distance:  ".bright_black(), breakdown.distance);
    println!("  {} {:.4}", "Similarity:".bright_black(), breakdown.similarity);
    if breakdown.bonuses.is_empty() {
        println!("  {} none", "Bonuses:   ".bright_black());
    }
    for bonus in &breakdown.bonuses {
        println!(
            "  {} {:?} (+{})",
            "Bonus:     ".bright_black(),
            bonus,
            bonus.points()
        );
    }
    println!();
    println!(
        "{} {}",
        "Compatibility:".bold(),
        format!("{:.1}", breakdown.score).green().bold()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, port, seed } => run_http_server(bind, port, seed).await,
        Commands::Knn { metric, k, query } => run_knn(metric, k, query),
        Commands::Score { a, b } => run_score(&a, &b),
    }
}
