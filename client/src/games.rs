//! Slot/dice game catalog and plays.

use crate::{Client, Result};
use gamba_types::{Game, PlayOutcome};
use serde_json::json;

impl Client {
    /// `GET /games`: the game catalog with bet limits.
    pub async fn list_games(&self) -> Result<Vec<Game>> {
        self.get("games").await
    }

    /// `POST /games/play`: place one spin/roll. Outcome determination is
    /// entirely server-side; the response is already settled.
    pub async fn play(&self, game_id: &str, bet_amount: f64) -> Result<PlayOutcome> {
        self.post(
            "games/play",
            json!({ "game_id": game_id, "bet_amount": bet_amount }),
        )
        .await
    }
}
