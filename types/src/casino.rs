//! Games, tournaments, the events board, and activity history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub name: String,
    pub min_bet: f64,
    pub max_bet: f64,
}

/// Result of `POST /games/play`. The server settles the wager and already
/// reflects it in `new_balance`; clients apply that value as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayOutcome {
    pub reels: [String; 3],
    pub won: bool,
    pub payout: f64,
    pub multiplier: f64,
    pub new_balance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub entry_fee: f64,
    #[serde(default)]
    pub prize_pool: f64,
}

/// Body for tournament create/update (admin surface).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub entry_fee: f64,
    #[serde(default)]
    pub prize_pool: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    pub user_name: String,
    pub score: f64,
    #[serde(default)]
    pub prize_won: f64,
}

/// Filter for `GET /events?status=`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Live,
    Completed,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStatus::Upcoming => write!(f, "upcoming"),
            EventStatus::Live => write!(f, "live"),
            EventStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A wagerable outcome on the events board, with server-computed odds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub id: String,
    pub name: String,
    pub odds: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SportsEvent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub status: String,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

/// Row of `GET /transactions?limit=`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

/// Row of `GET /bets?limit=`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    pub id: String,
    pub amount: f64,
    #[serde(default)]
    pub payout: Option<f64>,
    #[serde(default)]
    pub won: Option<bool>,
    pub created_at: DateTime<Utc>,
}
