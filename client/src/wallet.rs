//! Balance mutations and the confirmed-only money flow.
//!
//! Chat messages are optimistic; money never is. [`Wallet`] holds the last
//! confirmed user snapshot and only moves its balance after the server has
//! answered, so no intermediate value is ever observable.

use crate::{Client, Error, Result};
use gamba_types::{BetRecord, PlayOutcome, TransactionRecord, User};
use serde_json::json;

impl Client {
    /// `POST /transactions/deposit`.
    pub async fn deposit(&self, amount: f64) -> Result<()> {
        self.post_empty("transactions/deposit", Some(json!({ "amount": amount })))
            .await
    }

    /// `POST /transactions/withdraw`.
    pub async fn withdraw(&self, amount: f64) -> Result<()> {
        self.post_empty("transactions/withdraw", Some(json!({ "amount": amount })))
            .await
    }

    /// `POST /transactions/transfer`: peer-to-peer credit transfer.
    pub async fn transfer(&self, to_user_id: &str, amount: f64) -> Result<()> {
        self.post_empty(
            "transactions/transfer",
            Some(json!({ "user_id": to_user_id, "amount": amount })),
        )
        .await
    }

    /// `GET /transactions?limit=`.
    pub async fn transactions(&self, limit: u32) -> Result<Vec<TransactionRecord>> {
        self.get_with_query("transactions", &[("limit", &limit.to_string())])
            .await
    }

    /// `GET /bets?limit=`.
    pub async fn bets(&self, limit: u32) -> Result<Vec<BetRecord>> {
        self.get_with_query("bets", &[("limit", &limit.to_string())])
            .await
    }
}

/// Reject non-positive (or NaN) amounts before any network call.
pub(crate) fn ensure_positive(amount: f64) -> Result<()> {
    if amount > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidAmount(amount))
    }
}

/// Monetary action flow over the confirmed user snapshot.
///
/// Every mutation follows one contract: validate locally (the balance check
/// is a UX guard, not a security boundary), issue one call, and on success
/// adopt the server's balance. On failure the snapshot is left untouched.
pub struct Wallet {
    client: Client,
    user: Option<User>,
}

impl Wallet {
    pub fn new(client: Client) -> Self {
        Self { client, user: None }
    }

    /// Re-fetch the user snapshot (`GET /users/me`).
    pub async fn refresh(&mut self) -> Result<&User> {
        let user = self.client.me().await?;
        self.user = Some(user);
        Ok(self.user.as_ref().ok_or(Error::Unauthenticated)?)
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Last confirmed balance, if a snapshot has been fetched.
    pub fn balance(&self) -> Option<f64> {
        self.user.as_ref().map(|user| user.balance)
    }

    pub async fn deposit(&mut self, amount: f64) -> Result<f64> {
        ensure_positive(amount)?;
        self.client.deposit(amount).await?;
        self.adopt_snapshot().await
    }

    pub async fn withdraw(&mut self, amount: f64) -> Result<f64> {
        ensure_positive(amount)?;
        self.guard_funds(amount)?;
        self.client.withdraw(amount).await?;
        self.adopt_snapshot().await
    }

    pub async fn transfer(&mut self, to_user_id: &str, amount: f64) -> Result<f64> {
        ensure_positive(amount)?;
        self.guard_funds(amount)?;
        self.client.transfer(to_user_id, amount).await?;
        self.adopt_snapshot().await
    }

    /// Place a spin/roll. The play response carries the settled balance, so
    /// no extra snapshot fetch is needed.
    pub async fn play(&mut self, game_id: &str, amount: f64) -> Result<PlayOutcome> {
        ensure_positive(amount)?;
        self.guard_funds(amount)?;
        let outcome = self.client.play(game_id, amount).await?;
        if let Some(user) = &mut self.user {
            user.balance = outcome.new_balance;
        }
        Ok(outcome)
    }

    /// Wager on an events-board outcome.
    pub async fn place_event_bet(
        &mut self,
        event_id: &str,
        outcome_id: &str,
        amount: f64,
    ) -> Result<f64> {
        ensure_positive(amount)?;
        self.guard_funds(amount)?;
        self.client.place_event_bet(event_id, outcome_id, amount).await?;
        self.adopt_snapshot().await
    }

    /// Local over-balance rejection. Skipped when no snapshot has been
    /// fetched yet; the server remains the real check either way.
    fn guard_funds(&self, amount: f64) -> Result<()> {
        if let Some(user) = &self.user {
            if amount > user.balance {
                return Err(Error::InsufficientFunds {
                    requested: amount,
                    available: user.balance,
                });
            }
        }
        Ok(())
    }

    async fn adopt_snapshot(&mut self) -> Result<f64> {
        let user = self.client.me().await?;
        let balance = user.balance;
        self.user = Some(user);
        Ok(balance)
    }
}
