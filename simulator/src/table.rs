//! The authoritative table: accounts, wheel, settlement and history.

use crate::accounts::{
    check_password_length, hash_password, verify_password, AccountError, AccountStore,
    Registration,
};
use crate::state::SimulatorConfig;
use roulette_execution::{resolve, Ledger, LedgerError, SpinRng};
use roulette_types::api::{
    BalanceResponse, HistoryEntry, LoginRequest, MessageResponse, RegisterRequest, RoundResult,
    SessionResponse, SpinRequest, SpinResponse, StatsResponse, UpdateAccountRequest,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimulatorError {
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error("invalid or expired session")]
    InvalidSession,
    #[error("no bets placed")]
    NoBets,
    #[error("invalid bet: {0}")]
    InvalidBet(String),
    #[error("stake exceeds the maximum of {max} per bet")]
    StakeTooLarge { max: Decimal },
    #[error("insufficient balance")]
    InsufficientBalance,
}

impl From<LedgerError> for SimulatorError {
    fn from(err: LedgerError) -> Self {
        SimulatorError::InvalidBet(err.to_string())
    }
}

struct Table {
    accounts: AccountStore,
    /// Settled bets per username, oldest first.
    history: HashMap<String, Vec<HistoryEntry>>,
    rng: SpinRng,
    next_record_id: u64,
}

pub struct Simulator {
    pub config: SimulatorConfig,
    table: RwLock<Table>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// Percentage of winning bets, rounded to two decimals.
pub fn win_rate(wins: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (wins as f64 * 10_000.0 / total as f64).round() / 100.0
}

/// Run password hashing off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, AccountError>
where
    F: FnOnce() -> Result<T, AccountError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AccountError::Hashing(e.to_string()))?
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => SpinRng::seeded(seed),
            None => SpinRng::from_entropy(),
        };
        Self {
            config,
            table: RwLock::new(Table {
                accounts: AccountStore::new(),
                history: HashMap::new(),
                rng,
                next_record_id: 0,
            }),
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<SessionResponse, SimulatorError> {
        let registration = Registration::new(&request.email, &request.username, &request.password)?;
        self.table
            .read()
            .await
            .accounts
            .check_available(&registration.email, &registration.username)?;

        let password = registration.password.clone();
        let password_hash = blocking(move || hash_password(&password)).await?;

        let mut table = self.table.write().await;
        let account = table.accounts.insert(
            &registration,
            password_hash,
            self.config.initial_balance,
            now_ms(),
        )?;
        let (username, balance) = (account.username.clone(), account.balance);
        let token = table.accounts.open_session(&username)?;
        info!(%username, "account registered");

        Ok(SessionResponse {
            token,
            username,
            balance,
        })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<SessionResponse, SimulatorError> {
        let (username, password_hash) = {
            let table = self.table.read().await;
            let account = table
                .accounts
                .find_by_email(&request.email)
                .ok_or(AccountError::InvalidCredentials)?;
            (account.username.clone(), account.password_hash().to_string())
        };

        let password = request.password;
        let verified = blocking(move || Ok(verify_password(&password, &password_hash))).await?;
        if !verified {
            debug!(%username, "login rejected");
            return Err(AccountError::InvalidCredentials.into());
        }

        let mut table = self.table.write().await;
        let token = table.accounts.open_session(&username)?;
        let balance = table
            .accounts
            .get(&username)
            .map(|account| account.balance)
            .ok_or(AccountError::UnknownAccount)?;
        debug!(%username, "logged in");

        Ok(SessionResponse {
            token,
            username,
            balance: balance.round_dp(2),
        })
    }

    /// Drop a session. Returns whether it existed.
    pub async fn logout(&self, token: &str) -> bool {
        self.table.write().await.accounts.close_session(token)
    }

    /// Resolve a session token to its username.
    pub async fn authenticate(&self, token: &str) -> Result<String, SimulatorError> {
        self.table
            .read()
            .await
            .accounts
            .session_user(token)
            .map(str::to_string)
            .ok_or(SimulatorError::InvalidSession)
    }

    pub async fn balance(&self, username: &str) -> Result<BalanceResponse, SimulatorError> {
        let table = self.table.read().await;
        let account = table
            .accounts
            .get(username)
            .ok_or(AccountError::UnknownAccount)?;
        Ok(BalanceResponse {
            balance: account.balance.round_dp(2),
            username: account.username.clone(),
        })
    }

    /// Validate, draw, settle and record one round for `username`.
    ///
    /// Nothing is settled unless every bet is valid and the whole stake is covered.
    pub async fn spin(&self, username: &str, request: SpinRequest) -> Result<SpinResponse, SimulatorError> {
        if request.bets.is_empty() {
            return Err(SimulatorError::NoBets);
        }
        let hint = request.client_winning_number_hint;
        let ledger = Ledger::from_bets(request.bets)?;
        let max = self.config.max_stake_per_bet;
        if ledger.list().iter().any(|bet| bet.amount() > max) {
            return Err(SimulatorError::StakeTooLarge { max });
        }
        let stake = ledger.total_stake();

        let mut guard = self.table.write().await;
        let table = &mut *guard;
        let account = table
            .accounts
            .get_mut(username)
            .ok_or(AccountError::UnknownAccount)?;
        if stake > account.balance {
            return Err(SimulatorError::InsufficientBalance);
        }

        let winning_number = table.rng.spin();
        let outcome = resolve(&ledger, winning_number);
        account.balance = account.balance - stake + outcome.total_winnings;
        let new_balance = account.balance.round_dp(2);

        let created_at = now_ms();
        let records = table.history.entry(username.to_string()).or_default();
        for result in &outcome.results {
            table.next_record_id += 1;
            records.push(HistoryEntry {
                id: table.next_record_id,
                bet_type: result.bet.bet_type(),
                amount: result.bet.amount(),
                winning_number,
                result: if result.won {
                    RoundResult::Win
                } else {
                    RoundResult::Lose
                },
                payout: result.payout,
                created_at,
            });
        }

        info!(
            %username,
            %winning_number,
            bets = outcome.results.len(),
            %stake,
            total_winnings = %outcome.total_winnings,
            %new_balance,
            "spin settled"
        );
        if let Some(hint) = hint {
            debug!(%username, %hint, %winning_number, "client hint recorded");
        }

        let message = if outcome.is_win() {
            format!("You won {:.2}", outcome.total_winnings)
        } else {
            "No luck this time".to_string()
        };
        Ok(SpinResponse {
            winning_number,
            per_bet_payout: outcome.results,
            total_winnings: outcome.total_winnings,
            total_losses: outcome.total_losses,
            new_balance,
            message,
        })
    }

    /// Settled bets for `username`, newest first.
    pub async fn history(&self, username: &str, limit: Option<usize>) -> Result<Vec<HistoryEntry>, SimulatorError> {
        let table = self.table.read().await;
        if table.accounts.get(username).is_none() {
            return Err(AccountError::UnknownAccount.into());
        }
        let limit = self.config.history_page(limit);
        Ok(table
            .history
            .get(username)
            .map(|records| records.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    pub async fn stats(&self, username: &str) -> Result<StatsResponse, SimulatorError> {
        let table = self.table.read().await;
        if table.accounts.get(username).is_none() {
            return Err(AccountError::UnknownAccount.into());
        }
        let records = table.history.get(username).map(Vec::as_slice).unwrap_or_default();
        let total_games = records.len() as u64;
        let wins = records
            .iter()
            .filter(|record| record.result == RoundResult::Win)
            .count() as u64;
        Ok(StatsResponse {
            total_games,
            wins,
            losses: total_games - wins,
            win_rate: win_rate(wins, total_games),
        })
    }

    pub async fn change_password(
        &self,
        username: &str,
        request: UpdateAccountRequest,
    ) -> Result<MessageResponse, SimulatorError> {
        let password_hash = self
            .table
            .read()
            .await
            .accounts
            .get(username)
            .map(|account| account.password_hash().to_string())
            .ok_or(AccountError::UnknownAccount)?;

        let current = request.current_password;
        let verified = blocking(move || Ok(verify_password(&current, &password_hash))).await?;
        if !verified {
            return Err(AccountError::WrongPassword.into());
        }
        check_password_length(&request.new_password)?;

        let new_password = request.new_password;
        let new_hash = blocking(move || hash_password(&new_password)).await?;
        self.table
            .write()
            .await
            .accounts
            .set_password_hash(username, new_hash)?;
        info!(%username, "password changed");

        Ok(MessageResponse {
            success: true,
            message: "password changed".to_string(),
        })
    }
}
