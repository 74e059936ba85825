//! Tournament lifecycle, including the admin surface.

use crate::{Client, Result};
use gamba_types::{LeaderboardEntry, Tournament, TournamentDraft};
use serde_json::json;

impl Client {
    /// `GET /tournaments`.
    pub async fn list_tournaments(&self) -> Result<Vec<Tournament>> {
        self.get("tournaments").await
    }

    /// `GET /tournaments/:id`.
    pub async fn tournament(&self, id: &str) -> Result<Tournament> {
        self.get(&format!("tournaments/{id}")).await
    }

    /// `POST /tournaments/:id/join`. Registration is rejected by the server
    /// once the tournament is no longer open.
    pub async fn join_tournament(&self, id: &str) -> Result<()> {
        self.post_empty(&format!("tournaments/{id}/join"), None).await
    }

    /// `GET /tournaments/:id/leaderboard`: server-scored standings.
    pub async fn leaderboard(&self, id: &str) -> Result<Vec<LeaderboardEntry>> {
        self.get(&format!("tournaments/{id}/leaderboard")).await
    }

    // ---- admin surface ----

    /// `POST /tournaments`.
    pub async fn create_tournament(&self, draft: &TournamentDraft) -> Result<Tournament> {
        self.post("tournaments", serde_json::to_value(draft)?).await
    }

    /// `PUT /tournaments/:id`.
    pub async fn update_tournament(&self, id: &str, draft: &TournamentDraft) -> Result<Tournament> {
        self.put(&format!("tournaments/{id}"), serde_json::to_value(draft)?)
            .await
    }

    /// `DELETE /tournaments/:id`.
    pub async fn delete_tournament(&self, id: &str) -> Result<()> {
        self.delete(&format!("tournaments/{id}")).await
    }

    /// `POST /tournaments/:id/end`: close the tournament and settle prizes.
    pub async fn end_tournament(&self, id: &str) -> Result<()> {
        self.post_empty(&format!("tournaments/{id}/end"), None).await
    }

    /// `POST /tournaments/:id/score`: manual score adjustment.
    pub async fn update_score(&self, id: &str, user_id: &str, score: f64) -> Result<()> {
        self.post_empty(
            &format!("tournaments/{id}/score"),
            Some(json!({ "user_id": user_id, "score": score })),
        )
        .await
    }
}
