//! Wire types for the GAMBA platform API.
//!
//! Everything here is a client-side projection of a server-owned record: the
//! server is authoritative for balances, game outcomes, odds, and message
//! history, and these types only describe the JSON the API and the realtime
//! channel exchange.

pub mod casino;
pub mod social;
pub mod support;
pub mod user;
pub mod ws;

pub use casino::{
    BetRecord, EventStatus, Game, LeaderboardEntry, Outcome, PlayOutcome, SportsEvent, Tournament,
    TournamentDraft, TransactionRecord,
};
pub use social::{Chat, Friend, FriendRequest, FriendStatus, Message};
pub use support::{Ticket, TicketMessage};
pub use user::{AuthResponse, Tokens, User};
pub use ws::{ClientCommand, Envelope, ServerEvent};
