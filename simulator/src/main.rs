use anyhow::{Context, Result};
use clap::Parser;
use roulette_simulator::{Api, Simulator, SimulatorConfig};
use rust_decimal::Decimal;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host interface to bind (default: localhost).
    #[arg(long, env = "ROULETTE_HOST", default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(short, long, env = "ROULETTE_PORT", default_value_t = 5000)]
    port: u16,

    /// Balance credited to new accounts.
    #[arg(long, env = "ROULETTE_INITIAL_BALANCE")]
    initial_balance: Option<Decimal>,

    /// Largest stake accepted on a single bet.
    #[arg(long, env = "ROULETTE_MAX_STAKE")]
    max_stake: Option<Decimal>,

    /// Seed for the wheel (optional). Unset draws from OS entropy.
    #[arg(long, env = "ROULETTE_SEED")]
    seed: Option<u64>,

    /// Default page size of `/api/history`.
    #[arg(long, env = "ROULETTE_HISTORY_LIMIT")]
    history_limit: Option<usize>,

    /// Comma-separated browser origins allowed by CORS (`*` for any).
    #[arg(long, env = "ROULETTE_ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Option<Vec<String>>,
}

fn build_config(args: &Args) -> Result<SimulatorConfig> {
    let defaults = SimulatorConfig::default();
    let allowed_origins = match &args.allowed_origins {
        Some(origins) => origins
            .iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect(),
        None => defaults.allowed_origins,
    };
    let config = SimulatorConfig {
        initial_balance: args.initial_balance.unwrap_or(defaults.initial_balance),
        max_stake_per_bet: args.max_stake.unwrap_or(defaults.max_stake_per_bet),
        rng_seed: args.seed.or(defaults.rng_seed),
        history_limit: args.history_limit.unwrap_or(defaults.history_limit),
        allowed_origins,
    };
    config.validate().map_err(|err| anyhow::anyhow!(err))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse args
    let args = Args::parse();

    // Create logger
    init_tracing();

    let config = build_config(&args)?;
    info!(
        initial_balance = %config.initial_balance,
        max_stake_per_bet = %config.max_stake_per_bet,
        seeded = config.rng_seed.is_some(),
        "simulator config loaded"
    );

    let simulator = Arc::new(Simulator::new(config));
    let api = Api::new(simulator);
    let app = api.router();

    // Start server
    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(listener, app.into_make_service())
        .await
        .context("axum server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_table_config_fields() {
        let args = Args::parse_from([
            "simulator",
            "--initial-balance",
            "250",
            "--max-stake",
            "25.5",
            "--seed",
            "7",
            "--allowed-origins",
            "http://localhost:3000, https://table.example",
        ]);
        let config = build_config(&args).expect("config should parse");
        assert_eq!(config.initial_balance, Decimal::from(250));
        assert_eq!(config.max_stake_per_bet, Decimal::new(255, 1));
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:3000", "https://table.example"]
        );
    }

    #[test]
    fn rejects_zero_max_stake() {
        let args = Args::parse_from(["simulator", "--max-stake", "0"]);
        let err = build_config(&args).unwrap_err();
        assert!(
            err.to_string().contains("max_stake_per_bet"),
            "unexpected error: {err}"
        );
    }
}
