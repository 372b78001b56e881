pub mod balance;
pub mod client;
pub mod coordinator;
pub mod service;

pub use balance::BalancePoller;
pub use client::{Client, ClientConfig, RetryPolicy};
pub use coordinator::{
    CoordinatorError, RoundCoordinator, RoundEvent, RoundReport, RoundState, SpinTicket,
};
pub use service::{AccountService, BalanceService, SpinService};
use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {0}")]
    Failed(reqwest::StatusCode),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    /// The service answered with an `{ "error": ... }` payload.
    #[error("rejected ({status}): {message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("unexpected response")]
    UnexpectedResponse,
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Server-provided rejection message, if any.
    pub fn rejection(&self) -> Option<&str> {
        match self {
            Error::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Request, State as AxumState},
        http::StatusCode as AxumStatusCode,
        middleware::{self, Next},
        response::{IntoResponse, Response},
        Router,
    };
    use rand::{rngs::StdRng, SeedableRng};
    use roulette_simulator::{Api, Simulator, SimulatorConfig};
    use roulette_types::{
        api::{LoginRequest, RegisterRequest, RoundResult, SpinRequest, UpdateAccountRequest},
        Bet, BetType, Color, Parity, Pocket, Range,
    };
    use rust_decimal::Decimal;
    use std::{
        net::SocketAddr,
        sync::{
            atomic::{AtomicU16, AtomicUsize, Ordering},
            Arc,
        },
    };
    use tokio::time::{sleep, Duration};

    struct TestContext {
        simulator: Arc<Simulator>,
        outage: Arc<Outage>,
        base_url: String,
        server_handle: tokio::task::JoinHandle<()>,
    }

    /// Answers the next `remaining` requests with `status` before they reach the table.
    #[derive(Default)]
    struct Outage {
        remaining: AtomicUsize,
        status: AtomicU16,
        requests: AtomicUsize,
    }

    impl Outage {
        fn start(&self, failures: usize, status: AxumStatusCode) {
            self.status.store(status.as_u16(), Ordering::SeqCst);
            self.requests.store(0, Ordering::SeqCst);
            self.remaining.store(failures, Ordering::SeqCst);
        }

        fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    async fn outage_gate(
        AxumState(outage): AxumState<Arc<Outage>>,
        request: Request,
        next: Next,
    ) -> Response {
        outage.requests.fetch_add(1, Ordering::SeqCst);
        let down = outage
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if down {
            let status = AxumStatusCode::from_u16(outage.status.load(Ordering::SeqCst))
                .unwrap_or(AxumStatusCode::SERVICE_UNAVAILABLE);
            return (status, "table offline").into_response();
        }
        next.run(request).await
    }

    impl TestContext {
        async fn new() -> Self {
            let config = SimulatorConfig {
                rng_seed: Some(7),
                ..SimulatorConfig::default()
            };
            let simulator = Arc::new(Simulator::new(config));
            let outage = Arc::new(Outage::default());
            let router = Api::new(simulator.clone())
                .router()
                .layer(middleware::from_fn_with_state(outage.clone(), outage_gate));

            // Start server on random port
            let (base_url, server_handle) = serve_router(router).await;

            Self {
                simulator,
                outage,
                base_url,
                server_handle,
            }
        }

        fn create_client(&self) -> Client {
            Client::new(&self.base_url).unwrap()
        }

        async fn registered_client(&self, name: &str) -> Client {
            let client = self.create_client();
            client
                .register(&RegisterRequest {
                    email: format!("{name}@example.com"),
                    username: name.to_string(),
                    password: "hunter22".to_string(),
                })
                .await
                .unwrap();
            client
        }
    }

    impl Drop for TestContext {
        fn drop(&mut self) {
            self.server_handle.abort();
        }
    }

    async fn serve_router(router: Router) -> (String, tokio::task::JoinHandle<()>) {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let actual_addr = listener.local_addr().unwrap();
        let base_url = format!("http://{actual_addr}");

        let handle = tokio::spawn(async move {
            axum::serve(listener, router.into_make_service())
                .await
                .unwrap();
        });

        sleep(Duration::from_millis(50)).await;
        (base_url, handle)
    }

    fn no_backoff(retry_non_idempotent: bool) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            retry_non_idempotent,
        }
    }

    #[tokio::test]
    async fn test_register_login_and_balance() {
        let ctx = TestContext::new().await;
        let client = ctx.registered_client("alice").await;
        assert!(client.is_authenticated());

        let balance = client.fetch_balance().await.unwrap();
        assert_eq!(balance.username, "alice");
        assert_eq!(balance.balance, Decimal::from(100));

        // A second client logs in with the same credentials
        let other = ctx.create_client();
        let session = other
            .login(&LoginRequest {
                email: "ALICE@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.username, "alice");
        assert_eq!(session.balance, Decimal::from(100));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_is_rejected() {
        let ctx = TestContext::new().await;
        ctx.registered_client("bob").await;

        let client = ctx.create_client();
        let err = client
            .login(&LoginRequest {
                email: "bob@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await
            .unwrap_err();
        let Error::Rejected { status, .. } = err else {
            panic!("expected Rejected, got {err:?}");
        };
        assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_authenticated_calls_require_a_session() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();
        assert!(matches!(
            client.fetch_balance().await,
            Err(Error::NotAuthenticated)
        ));

        // An unknown token is rejected by the service
        let client = ctx.create_client().with_token("not-a-session");
        let err = client.fetch_balance().await.unwrap_err();
        let Error::Rejected { status, .. } = err else {
            panic!("expected Rejected, got {err:?}");
        };
        assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_submit_spin_settles_balance() {
        let ctx = TestContext::new().await;
        let client = ctx.registered_client("carol").await;

        let bets = vec![
            Bet::new(BetType::Color(Color::Red), Decimal::from(5)),
            Bet::new(BetType::Parity(Parity::Even), Decimal::from(5)),
            Bet::new(BetType::Number(Pocket::new(17).unwrap()), Decimal::from(1)),
        ];
        let response = client
            .submit_spin(&SpinRequest {
                bets: bets.clone(),
                client_winning_number_hint: Some(Pocket::new(3).unwrap()),
            })
            .await
            .unwrap();

        // The service settles with the same resolver the client uses
        let local = roulette_execution::resolve_bets(&bets, response.winning_number);
        assert_eq!(local, response.outcome());
        assert_eq!(
            response.new_balance,
            Decimal::from(100) - Decimal::from(11) + response.total_winnings
        );

        let balance = client.fetch_balance().await.unwrap();
        assert_eq!(balance.balance, response.new_balance);

        let history = client.history(None).await.unwrap();
        assert_eq!(history.games.len(), 3);
        // Newest first: the straight-up bet was settled last
        assert_eq!(history.games[0].bet_type, BetType::Number(Pocket::new(17).unwrap()));

        let stats = client.stats().await.unwrap();
        assert_eq!(stats.total_games, 3);
        let wins = history
            .games
            .iter()
            .filter(|game| game.result == RoundResult::Win)
            .count() as u64;
        assert_eq!(stats.wins, wins);
        assert_eq!(stats.losses, 3 - wins);
    }

    #[tokio::test]
    async fn test_submit_spin_rejects_insufficient_balance() {
        let ctx = TestContext::new().await;
        let client = ctx.registered_client("dave").await;

        let err = client
            .submit_spin(&SpinRequest {
                bets: vec![Bet::new(BetType::Range(Range::High), Decimal::from(101))],
                client_winning_number_hint: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.rejection(), Some("insufficient balance"));

        // Nothing was settled
        let balance = client.fetch_balance().await.unwrap();
        assert_eq!(balance.balance, Decimal::from(100));
        assert!(client.history(Some(10)).await.unwrap().games.is_empty());
    }

    #[tokio::test]
    async fn test_change_password_and_logout() {
        let ctx = TestContext::new().await;
        let client = ctx.registered_client("erin").await;

        let err = client
            .change_password(&UpdateAccountRequest {
                current_password: "not-it".to_string(),
                new_password: "brand-new".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Rejected { .. }));

        let message = client
            .change_password(&UpdateAccountRequest {
                current_password: "hunter22".to_string(),
                new_password: "brand-new".to_string(),
            })
            .await
            .unwrap();
        assert!(message.success);

        client.logout().await.unwrap();
        assert!(!client.is_authenticated());

        let session = client
            .login(&LoginRequest {
                email: "erin@example.com".to_string(),
                password: "brand-new".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.username, "erin");
    }

    #[tokio::test]
    async fn test_coordinator_plays_against_simulator() {
        let ctx = TestContext::new().await;
        let client = ctx.registered_client("frank").await;
        let mut coordinator = RoundCoordinator::new();
        coordinator.refresh_balance(&client).await;
        assert_eq!(coordinator.balance(), Some(Decimal::from(100)));

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..5 {
            coordinator
                .place_bet(BetType::Color(Color::Black), Decimal::from(2))
                .unwrap();
            coordinator
                .place_bet(BetType::Range(Range::Low), Decimal::from(3))
                .unwrap();
            let report = coordinator.play_round(&client, &mut rng).await.unwrap();
            assert!(report.discrepancies.is_empty());
            assert_eq!(coordinator.state(), RoundState::Idle);
            assert!(coordinator.ledger().is_empty());
            assert_eq!(coordinator.balance(), Some(report.balance));
        }

        let history = ctx.simulator.history("frank", None).await.unwrap();
        assert_eq!(history.len(), 10);
    }

    #[tokio::test]
    async fn test_account_service_updates_password() {
        async fn rotate<A: AccountService>(account: &A, from: &str, to: &str) -> Result<String> {
            account.update_password(from.to_string(), to.to_string()).await
        }

        let ctx = TestContext::new().await;
        let client = ctx.registered_client("gina").await;

        let err = rotate(&client, "hunter22", "short").await.unwrap_err();
        assert_eq!(err.rejection(), Some("password must be at least 6 characters"));

        let message = rotate(&client, "hunter22", "roulette-night").await.unwrap();
        assert_eq!(message, "password changed");

        let err = rotate(&client, "hunter22", "another-one").await.unwrap_err();
        assert_eq!(err.rejection(), Some("current password is incorrect"));

        let session = ctx
            .create_client()
            .login(&LoginRequest {
                email: "gina@example.com".to_string(),
                password: "roulette-night".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.username, "gina");
    }

    #[test]
    fn test_client_accepts_only_http_urls() {
        for url in ["ftp://example.com", "ws://127.0.0.1:5000", "file:///tmp/table"] {
            assert!(
                matches!(Client::new(url), Err(Error::InvalidScheme(_))),
                "{url} should be refused"
            );
        }
        assert_eq!(
            Client::new("ftp://example.com").err().map(|err| err.to_string()),
            Some("invalid URL scheme: ftp (expected http or https)".to_string())
        );
        assert!(matches!(Client::new("not a url"), Err(Error::Url(_))));

        let client = Client::new("https://casino.example.com/roulette").unwrap();
        assert_eq!(client.base_url.as_str(), "https://casino.example.com/roulette/");
        assert_eq!(
            client.base_url.join("api/spin").unwrap().as_str(),
            "https://casino.example.com/roulette/api/spin"
        );
        assert!(Client::new("http://127.0.0.1:5000").is_ok());
    }

    #[tokio::test]
    async fn test_balance_survives_short_outage() {
        let ctx = TestContext::new().await;
        let client = ctx
            .registered_client("hank")
            .await
            .with_retry_policy(no_backoff(false));

        ctx.outage.start(2, AxumStatusCode::SERVICE_UNAVAILABLE);
        let balance = client.fetch_balance().await.unwrap();
        assert_eq!(balance.balance, Decimal::from(100));
        assert_eq!(ctx.outage.requests(), 3);
    }

    #[tokio::test]
    async fn test_balance_gives_up_on_long_outage() {
        let ctx = TestContext::new().await;
        let client = ctx
            .registered_client("iris")
            .await
            .with_retry_policy(no_backoff(false));

        ctx.outage.start(10, AxumStatusCode::BAD_GATEWAY);
        let err = client.fetch_balance().await.unwrap_err();
        let Error::FailedWithBody { status, body } = err else {
            panic!("expected FailedWithBody, got {err:?}");
        };
        assert_eq!(status, reqwest::StatusCode::BAD_GATEWAY);
        assert_eq!(body, "table offline");
        assert_eq!(ctx.outage.requests(), 3);

        ctx.outage.start(0, AxumStatusCode::OK);
        assert!(client.fetch_balance().await.is_ok());
    }

    #[tokio::test]
    async fn test_spin_is_sent_once_by_default() {
        let ctx = TestContext::new().await;
        let client = ctx
            .registered_client("jack")
            .await
            .with_retry_policy(no_backoff(false));

        ctx.outage.start(1, AxumStatusCode::SERVICE_UNAVAILABLE);
        let err = client
            .submit_spin(&SpinRequest {
                bets: vec![Bet::new(BetType::Color(Color::Red), Decimal::from(10))],
                client_winning_number_hint: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::FailedWithBody { status, .. } if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
        assert_eq!(ctx.outage.requests(), 1);

        // The table never saw the spin
        assert!(ctx.simulator.history("jack", None).await.unwrap().is_empty());
        assert_eq!(client.fetch_balance().await.unwrap().balance, Decimal::from(100));
    }

    #[tokio::test]
    async fn test_spin_is_resent_when_allowed() {
        let ctx = TestContext::new().await;
        let client = ctx
            .registered_client("kate")
            .await
            .with_retry_policy(no_backoff(true));

        ctx.outage.start(2, AxumStatusCode::SERVICE_UNAVAILABLE);
        let response = client
            .submit_spin(&SpinRequest {
                bets: vec![Bet::new(BetType::Parity(Parity::Odd), Decimal::from(4))],
                client_winning_number_hint: None,
            })
            .await
            .unwrap();
        assert_eq!(ctx.outage.requests(), 3);
        assert_eq!(response.per_bet_payout.len(), 1);

        // Settled exactly once
        let history = ctx.simulator.history("kate", None).await.unwrap();
        assert_eq!(history.len(), 1);
    }
}
