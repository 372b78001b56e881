//! Boundaries between the round coordinator and the outside world.
//!
//! The coordinator only talks to these traits, so rounds can be driven against the
//! HTTP [`Client`] or an in-process double.

use crate::{Client, Result};
use roulette_types::api::{SpinRequest, SpinResponse, UpdateAccountRequest};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;

/// Authoritative spin: settles a bet list and reports the outcome and new balance.
pub trait SpinService: Send + Sync {
    fn spin(&self, request: SpinRequest) -> impl Future<Output = Result<SpinResponse>> + Send;
}

/// Source of the player's current balance.
pub trait BalanceService: Send + Sync {
    fn balance(&self) -> impl Future<Output = Result<Decimal>> + Send;
}

/// Account maintenance passed straight through to the service.
pub trait AccountService: Send + Sync {
    /// Returns the service's confirmation message.
    fn update_password(
        &self,
        current_password: String,
        new_password: String,
    ) -> impl Future<Output = Result<String>> + Send;
}

impl SpinService for Client {
    async fn spin(&self, request: SpinRequest) -> Result<SpinResponse> {
        self.submit_spin(&request).await
    }
}

impl BalanceService for Client {
    async fn balance(&self) -> Result<Decimal> {
        Ok(self.fetch_balance().await?.balance)
    }
}

impl AccountService for Client {
    async fn update_password(&self, current_password: String, new_password: String) -> Result<String> {
        let response = self
            .change_password(&UpdateAccountRequest {
                current_password,
                new_password,
            })
            .await?;
        Ok(response.message)
    }
}

impl<T: SpinService> SpinService for Arc<T> {
    fn spin(&self, request: SpinRequest) -> impl Future<Output = Result<SpinResponse>> + Send {
        self.as_ref().spin(request)
    }
}

impl<T: BalanceService> BalanceService for Arc<T> {
    fn balance(&self) -> impl Future<Output = Result<Decimal>> + Send {
        self.as_ref().balance()
    }
}
