use crate::service::BalanceService;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Background task that refreshes the player's balance on a fixed interval.
///
/// The first poll happens immediately. Failed polls are logged and skipped; the last good
/// value stays published. Dropping the poller stops the task.
pub struct BalancePoller {
    receiver: watch::Receiver<Option<Decimal>>,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for BalancePoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl BalancePoller {
    pub fn spawn<S>(service: Arc<S>, interval: Duration) -> Self
    where
        S: BalanceService + 'static,
    {
        let (sender, receiver) = watch::channel(None);
        let interval = interval.max(MIN_POLL_INTERVAL);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match service.balance().await {
                    Ok(balance) => {
                        debug!(%balance, "polled balance");
                        sender.send_replace(Some(balance));
                    }
                    Err(err) => warn!(?err, "balance poll failed"),
                }
            }
        });

        Self { receiver, handle }
    }

    /// Most recent balance, `None` until the first successful poll.
    pub fn latest(&self) -> Option<Decimal> {
        *self.receiver.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Decimal>> {
        self.receiver.clone()
    }
}
