//! Events board: odds listings and outcome wagers.

use crate::{Client, Result};
use gamba_types::{EventStatus, SportsEvent};
use serde_json::json;

impl Client {
    /// `GET /events?status=`.
    pub async fn list_events(&self, status: EventStatus) -> Result<Vec<SportsEvent>> {
        self.get_with_query("events", &[("status", &status.to_string())])
            .await
    }

    /// `POST /events/:id/bet`: wager on one outcome. Odds are fixed
    /// server-side at settlement, not at display time.
    pub async fn place_event_bet(
        &self,
        event_id: &str,
        outcome_id: &str,
        amount: f64,
    ) -> Result<()> {
        self.post_empty(
            &format!("events/{event_id}/bet"),
            Some(json!({ "outcome_id": outcome_id, "amount": amount })),
        )
        .await
    }
}
