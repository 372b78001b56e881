//! Round coordinator state machine for the client.
//!
//! The coordinator owns the pending bets of the current round and drives them through
//! one authoritative spin. It never settles anything itself: the spin service's answer
//! is final, and the local resolver only produces an estimate that is compared with it.
//!
//! ## States
//!
//! 1. **Idle** - No active round, the ledger is empty
//! 2. **BetsOpen** - At least one bet placed, bets can be added and removed
//! 3. **Submitting** - A ledger snapshot is with the spin service
//! 4. **Resolved** - Outcome received; the ledger is cleared and the round returns to Idle
//! 5. **Error** - The spin failed; the ledger is kept and the next interaction reopens it
//!
//! ## Concurrency
//!
//! The `Submitting` state is the lock. [`RoundCoordinator::begin_spin`] checks and sets
//! it in one synchronous call before anything is awaited, so a second spin request is
//! rejected with [`CoordinatorError::RoundInProgress`] instead of being queued.
//!
//! ```rust,ignore
//! let mut coordinator = RoundCoordinator::new();
//! coordinator.refresh_balance(&client).await;
//! coordinator.place_bet(BetType::Color(Color::Red), Decimal::from(5))?;
//! let report = coordinator.spin(&client, None).await?;
//! assert_eq!(coordinator.state(), RoundState::Idle);
//! ```

use crate::service::{BalanceService, SpinService};
use rand::Rng;
use roulette_execution::{
    display_hint, parse_amount, reconcile, resolve, Discrepancy, DisplayHint,
    Ledger, LedgerError,
};
use roulette_types::{api::SpinRequest, api::SpinResponse, Bet, BetId, BetType, SpinOutcome};
use rust_decimal::Decimal;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Phase of the current round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoundState {
    Idle,
    BetsOpen,
    Submitting,
    Resolved,
    Error,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoundState::Idle => "idle",
            RoundState::BetsOpen => "bets_open",
            RoundState::Submitting => "submitting",
            RoundState::Resolved => "resolved",
            RoundState::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("insufficient balance: stake {stake} exceeds balance {balance}")]
    InsufficientBalance { stake: Decimal, balance: Decimal },
    #[error("duplicate bet id: {0}")]
    DuplicateBet(BetId),
    #[error("no bets placed")]
    NoBetsPlaced,
    #[error("round in progress")]
    RoundInProgress,
    #[error("transport error: {0}")]
    Transport(crate::Error),
    /// Verbatim error message from the spin service.
    #[error("spin rejected: {0}")]
    ServiceRejected(String),
    #[error("spin timed out")]
    Timeout,
    #[error("ticket for round {ticket} does not match the round in flight")]
    StaleTicket { ticket: u64 },
}

impl From<LedgerError> for CoordinatorError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidAmount(amount) => CoordinatorError::InvalidAmount(amount),
            LedgerError::DuplicateBet(id) => CoordinatorError::DuplicateBet(id),
        }
    }
}

impl From<crate::Error> for CoordinatorError {
    fn from(err: crate::Error) -> Self {
        match err {
            crate::Error::Rejected { message, .. } => CoordinatorError::ServiceRejected(message),
            other => CoordinatorError::Transport(other),
        }
    }
}

/// Everything known about a finished round.
#[derive(Clone, Debug)]
pub struct RoundReport {
    pub round: u64,
    /// Outcome as reported by the spin service. This is the one that counts.
    pub outcome: SpinOutcome,
    /// Outcome computed locally from the same ledger and winning number.
    pub local_estimate: SpinOutcome,
    pub discrepancies: Vec<Discrepancy>,
    pub balance: Decimal,
    pub message: String,
    pub hint: Option<DisplayHint>,
}

/// Notifications for renderers.
#[derive(Clone, Debug)]
pub enum RoundEvent {
    StateChanged { from: RoundState, to: RoundState },
    LedgerChanged { bets: Vec<Bet> },
    BalanceChanged { balance: Decimal },
    Resolved(Box<RoundReport>),
    Failed { round: u64, message: String },
}

/// A spin that has been started but not completed.
///
/// Produced by [`RoundCoordinator::begin_spin`]; hand the request to a spin service and
/// pass the ticket back to [`RoundCoordinator::complete_spin`] with the result.
#[derive(Debug)]
pub struct SpinTicket {
    round: u64,
    request: SpinRequest,
    hint: Option<DisplayHint>,
}

impl SpinTicket {
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn request(&self) -> &SpinRequest {
        &self.request
    }
}

/// Owned state of the betting table on the client.
pub struct RoundCoordinator {
    state: RoundState,
    ledger: Ledger,
    balance: Option<Decimal>,
    round: u64,
    last_report: Option<RoundReport>,
    events: broadcast::Sender<RoundEvent>,
}

impl Default for RoundCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundCoordinator {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RoundState::Idle,
            ledger: Ledger::new(),
            balance: None,
            round: 0,
            last_report: None,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Last balance seen from the service. `None` until the first refresh.
    pub fn balance(&self) -> Option<Decimal> {
        self.balance
    }

    pub fn last_report(&self) -> Option<&RoundReport> {
        self.last_report.as_ref()
    }

    /// Number of spins started so far.
    pub fn rounds(&self) -> u64 {
        self.round
    }

    pub fn set_balance(&mut self, balance: Decimal) {
        if self.balance == Some(balance) {
            return;
        }
        self.balance = Some(balance);
        self.emit(RoundEvent::BalanceChanged { balance });
    }

    /// Place a new bet and return its id.
    pub fn place_bet(&mut self, bet_type: BetType, amount: Decimal) -> Result<BetId, CoordinatorError> {
        let bet = Bet::new(bet_type, amount);
        let id = bet.id();
        self.add_bet(bet)?;
        Ok(id)
    }

    /// Place a bet with an amount taken straight from a UI input.
    pub fn place_bet_raw(&mut self, bet_type: BetType, raw_amount: f64) -> Result<BetId, CoordinatorError> {
        let amount = parse_amount(raw_amount)?;
        self.place_bet(bet_type, amount)
    }

    pub fn add_bet(&mut self, bet: Bet) -> Result<(), CoordinatorError> {
        self.ensure_not_submitting()?;
        self.ledger.check(&bet)?;
        self.check_balance(self.ledger.total_stake() + bet.amount())?;

        self.reopen_after_error();
        self.ledger.add(bet)?;

        if self.state == RoundState::Idle {
            self.transition(RoundState::BetsOpen);
        }
        self.emit_ledger();
        Ok(())
    }

    /// Remove a bet. Unknown ids are ignored.
    pub fn remove_bet(&mut self, id: BetId) -> Result<Option<Bet>, CoordinatorError> {
        self.ensure_not_submitting()?;
        self.reopen_after_error();

        let removed = self.ledger.remove(id);
        if removed.is_some() {
            if self.ledger.is_empty() {
                self.transition(RoundState::Idle);
            }
            self.emit_ledger();
        }
        Ok(removed)
    }

    pub fn clear_bets(&mut self) -> Result<(), CoordinatorError> {
        self.ensure_not_submitting()?;
        self.reopen_after_error();

        if !self.ledger.is_empty() {
            self.ledger.clear();
            self.emit_ledger();
        }
        self.transition(RoundState::Idle);
        Ok(())
    }

    /// Move to `Submitting` and snapshot the ledger into a spin request.
    ///
    /// Fails without side effects when the ledger is empty, a spin is already in
    /// flight, or the stake exceeds the last known balance.
    pub fn begin_spin(&mut self, hint: Option<DisplayHint>) -> Result<SpinTicket, CoordinatorError> {
        self.ensure_not_submitting()?;
        if self.ledger.is_empty() {
            return Err(CoordinatorError::NoBetsPlaced);
        }
        self.check_balance(self.ledger.total_stake())?;
        self.reopen_after_error();

        self.round += 1;
        let request = SpinRequest {
            bets: self.ledger.list().to_vec(),
            client_winning_number_hint: hint.map(|hint| hint.pocket),
        };
        debug!(
            round = self.round,
            bets = request.bets.len(),
            stake = %self.ledger.total_stake(),
            "submitting spin"
        );
        self.transition(RoundState::Submitting);

        Ok(SpinTicket {
            round: self.round,
            request,
            hint,
        })
    }

    /// Apply the spin service's answer to the round started by `ticket`.
    ///
    /// On success the server outcome is final: the local estimate is only compared with
    /// it, the balance is taken from the response and the ledger is cleared. On failure
    /// the ledger is kept and the coordinator moves to `Error`.
    pub fn complete_spin(
        &mut self,
        ticket: SpinTicket,
        result: crate::Result<SpinResponse>,
    ) -> Result<RoundReport, CoordinatorError> {
        if self.state != RoundState::Submitting || ticket.round != self.round {
            return Err(CoordinatorError::StaleTicket {
                ticket: ticket.round,
            });
        }

        let response = match result {
            Ok(response) => response,
            Err(err) => return Err(self.fail(err.into())),
        };

        let outcome = response.outcome();
        let local_estimate = resolve(&self.ledger, response.winning_number);
        let discrepancies = reconcile(&local_estimate, &outcome);
        if !discrepancies.is_empty() {
            warn!(
                round = ticket.round,
                local_winnings = %local_estimate.total_winnings,
                reported_winnings = %outcome.total_winnings,
                local_losses = %local_estimate.total_losses,
                reported_losses = %outcome.total_losses,
                count = discrepancies.len(),
                "local estimate disagrees with spin service"
            );
            for discrepancy in &discrepancies {
                debug!(round = ticket.round, %discrepancy, "discrepancy");
            }
        }
        if let Some(hint) = ticket.hint {
            if hint.pocket != response.winning_number {
                debug!(
                    round = ticket.round,
                    hint = %hint.pocket,
                    winning_number = %response.winning_number,
                    "animation hint differs from winning number"
                );
            }
        }

        let report = RoundReport {
            round: ticket.round,
            outcome,
            local_estimate,
            discrepancies,
            balance: response.new_balance,
            message: response.message,
            hint: ticket.hint,
        };
        info!(
            round = report.round,
            winning_number = %report.outcome.winning_number,
            total_winnings = %report.outcome.total_winnings,
            total_losses = %report.outcome.total_losses,
            balance = %report.balance,
            "round resolved"
        );

        self.transition(RoundState::Resolved);
        self.set_balance(report.balance);
        self.emit(RoundEvent::Resolved(Box::new(report.clone())));

        self.ledger.clear();
        self.emit_ledger();
        self.transition(RoundState::Idle);

        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Submit the ledger and wait for the outcome.
    pub async fn spin<S: SpinService>(
        &mut self,
        service: &S,
        hint: Option<DisplayHint>,
    ) -> Result<RoundReport, CoordinatorError> {
        let ticket = self.begin_spin(hint)?;
        let result = service.spin(ticket.request.clone()).await;
        self.complete_spin(ticket, result)
    }

    /// Like [`RoundCoordinator::spin`], but gives up after `timeout`.
    ///
    /// A timed-out round moves to `Error` with the ledger intact. The service may still
    /// have settled it; refresh the balance before retrying.
    pub async fn spin_with_timeout<S: SpinService>(
        &mut self,
        service: &S,
        hint: Option<DisplayHint>,
        timeout: Duration,
    ) -> Result<RoundReport, CoordinatorError> {
        let ticket = self.begin_spin(hint)?;
        match tokio::time::timeout(timeout, service.spin(ticket.request.clone())).await {
            Ok(result) => self.complete_spin(ticket, result),
            Err(_) => Err(self.fail(CoordinatorError::Timeout)),
        }
    }

    /// Fetch the balance from the service. Failures are logged and leave the last known
    /// balance in place.
    pub async fn refresh_balance<B: BalanceService>(&mut self, service: &B) -> Option<Decimal> {
        match service.balance().await {
            Ok(balance) => {
                self.set_balance(balance);
                Some(balance)
            }
            Err(err) => {
                warn!(?err, "balance refresh failed");
                None
            }
        }
    }

    /// Spin with a cosmetic animation hint, then refresh the balance.
    pub async fn play_round<S, R>(&mut self, service: &S, rng: &mut R) -> Result<RoundReport, CoordinatorError>
    where
        S: SpinService + BalanceService,
        R: Rng,
    {
        let hint = display_hint(rng);
        let report = self.spin(service, Some(hint)).await?;
        self.refresh_balance(service).await;
        Ok(report)
    }

    fn ensure_not_submitting(&self) -> Result<(), CoordinatorError> {
        if self.state == RoundState::Submitting {
            return Err(CoordinatorError::RoundInProgress);
        }
        Ok(())
    }

    fn check_balance(&self, stake: Decimal) -> Result<(), CoordinatorError> {
        match self.balance {
            Some(balance) if stake > balance => {
                Err(CoordinatorError::InsufficientBalance { stake, balance })
            }
            _ => Ok(()),
        }
    }

    fn reopen_after_error(&mut self) {
        if self.state != RoundState::Error {
            return;
        }
        let next = if self.ledger.is_empty() {
            RoundState::Idle
        } else {
            RoundState::BetsOpen
        };
        self.transition(next);
    }

    fn fail(&mut self, err: CoordinatorError) -> CoordinatorError {
        warn!(round = self.round, %err, bets = self.ledger.len(), "spin failed");
        self.transition(RoundState::Error);
        self.emit(RoundEvent::Failed {
            round: self.round,
            message: err.to_string(),
        });
        err
    }

    fn transition(&mut self, to: RoundState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        debug!(%from, %to, "round state changed");
        self.emit(RoundEvent::StateChanged { from, to });
    }

    fn emit_ledger(&self) {
        self.emit(RoundEvent::LedgerChanged {
            bets: self.ledger.list().to_vec(),
        });
    }

    fn emit(&self, event: RoundEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
