//! Table bot - plays rounds of roulette against a spin service
//!
//! Usage:
//!   cargo run --release --bin table-bot -- --email bot@example.com [OPTIONS]
//!
//! Options:
//!   -u, --url          Service URL (default: $ROULETTE_BASE_URL or http://127.0.0.1:5000)
//!   -e, --email        Account email (registered on first use)
//!   -p, --password     Account password (default: table-bot)
//!   -r, --rounds       Rounds to play (default: 10)
//!   -m, --max-bet      Largest stake per bet (default: 5)
//!   -s, --seed         Seed for bet selection

use anyhow::{Context, Result};
use clap::Parser;
use rand::{rngs::StdRng, Rng, SeedableRng};
use roulette_client::{
    BalancePoller, Client, ClientConfig, CoordinatorError, Error, RoundCoordinator,
};
use roulette_types::{
    api::{LoginRequest, RegisterRequest},
    BetType, Color, Parity, Pocket, Range,
};
use rust_decimal::Decimal;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Plays random roulette rounds against a spin service")]
struct Args {
    #[arg(short, long)]
    url: Option<String>,

    #[arg(short, long)]
    email: String,

    #[arg(short, long, default_value = "table-bot")]
    password: String,

    #[arg(short, long, default_value = "10")]
    rounds: u32,

    #[arg(short, long, default_value = "5")]
    max_bet: u64,

    #[arg(short, long)]
    seed: Option<u64>,

    /// Per-spin timeout in milliseconds
    #[arg(long, default_value = "10000")]
    spin_timeout_ms: u64,
}

fn random_bet_type(rng: &mut StdRng) -> BetType {
    match rng.gen_range(0..4) {
        0 => BetType::Number(Pocket::wrap(rng.gen_range(0..37))),
        1 => BetType::Color(if rng.gen_bool(0.5) { Color::Red } else { Color::Black }),
        2 => BetType::Parity(if rng.gen_bool(0.5) { Parity::Odd } else { Parity::Even }),
        _ => BetType::Range(if rng.gen_bool(0.5) { Range::Low } else { Range::High }),
    }
}

async fn login_or_register(client: &Client, email: &str, password: &str) -> Result<()> {
    let login = client
        .login(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })
        .await;
    match login {
        Ok(session) => {
            info!(username = %session.username, balance = %session.balance, "logged in");
            Ok(())
        }
        Err(Error::Rejected { status, .. }) if status == reqwest::StatusCode::UNAUTHORIZED => {
            let username = email.split('@').next().unwrap_or(email).to_string();
            let session = client
                .register(&RegisterRequest {
                    email: email.to_string(),
                    username,
                    password: password.to_string(),
                })
                .await
                .context("register")?;
            info!(username = %session.username, balance = %session.balance, "registered");
            Ok(())
        }
        Err(err) => Err(err).context("login"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut config = ClientConfig::from_env().context("read client config")?;
    if let Some(url) = args.url {
        config.base_url = url;
    }
    let client = Arc::new(Client::from_config(&config)?);
    login_or_register(&client, &args.email, &args.password).await?;

    let poller = BalancePoller::spawn(client.clone(), config.balance_poll_interval);
    let mut coordinator = RoundCoordinator::new();
    coordinator.refresh_balance(&client).await;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let timeout = Duration::from_millis(args.spin_timeout_ms);
    let mut wins = 0u32;
    let mut played = 0u32;

    for round in 1..=args.rounds {
        let balance = coordinator.balance().unwrap_or_default();
        let max_bet = Decimal::from(args.max_bet).min(balance.floor());
        if max_bet < Decimal::ONE {
            warn!(%balance, "balance too low to keep playing");
            break;
        }

        for _ in 0..rng.gen_range(1..=3) {
            let amount = Decimal::from(rng.gen_range(1..=args.max_bet.max(1))).min(max_bet);
            match coordinator.place_bet(random_bet_type(&mut rng), amount) {
                Ok(_) => {}
                // Out of balance for this round
                Err(CoordinatorError::InsufficientBalance { .. }) => break,
                Err(err) => return Err(err).context("place bet"),
            }
        }

        let hint = roulette_execution::display_hint(&mut rng);
        match coordinator
            .spin_with_timeout(client.as_ref(), Some(hint), timeout)
            .await
        {
            Ok(report) => {
                played += 1;
                if report.outcome.is_win() {
                    wins += 1;
                }
                info!(
                    round,
                    winning_number = %report.outcome.winning_number,
                    stake = %report.outcome.total_stake(),
                    payout = %report.outcome.total_winnings,
                    balance = %report.balance,
                    "{}",
                    report.message
                );
            }
            Err(err) => {
                warn!(round, %err, "spin failed, dropping bets");
                coordinator.clear_bets()?;
                coordinator.refresh_balance(&client).await;
            }
        }
    }

    let stats = client.stats().await.context("fetch stats")?;
    info!(
        played,
        wins,
        total_games = stats.total_games,
        win_rate = stats.win_rate,
        balance = ?poller.latest(),
        "done"
    );
    Ok(())
}
