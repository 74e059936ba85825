//! View-state reconciliation for the social surface.
//!
//! [`ChatBoard`] holds what a connected view renders: conversations, their
//! messages, friend lists, and transient state (peer typing, search
//! results). It merges two inputs that can race: REST snapshots and channel
//! deltas. Snapshots always replace outright; deltas upsert by id, so an
//! optimistic local insert and its echo from the server collapse into a
//! single confirmed entry.

use chrono::Utc;
use gamba_types::{Chat, Friend, Message, ServerEvent, User};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// How long a typing notification keeps the indicator lit.
const TYPING_WINDOW: Duration = Duration::from_millis(1500);

/// How a message entered the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Inserted locally, not yet echoed by the server.
    Pending,
    /// Seen from the server (snapshot or channel echo).
    Confirmed,
}

/// A message plus its confirmation state.
#[derive(Debug, Clone)]
pub struct Entry {
    pub message: Message,
    pub status: EntryStatus,
}

/// Client-side chat state, keyed to one signed-in user.
#[derive(Debug, Default)]
pub struct ChatBoard {
    my_id: String,
    chats: Vec<Chat>,
    messages: HashMap<String, Vec<Entry>>,
    typing: HashMap<String, Instant>,
    friends: Vec<Friend>,
    incoming_requests: Vec<Friend>,
    search_results: Vec<User>,
}

impl ChatBoard {
    pub fn new(my_id: impl Into<String>) -> Self {
        Self {
            my_id: my_id.into(),
            ..Self::default()
        }
    }

    pub fn my_id(&self) -> &str {
        &self.my_id
    }

    /// Replace the conversation list with a fresh snapshot.
    pub fn set_chats(&mut self, chats: Vec<Chat>) {
        self.chats = chats;
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    /// Replace one conversation's history with a fresh snapshot. Everything
    /// in a snapshot is confirmed, including messages that were pending
    /// locally a moment ago.
    pub fn set_messages(&mut self, chat_id: &str, messages: Vec<Message>) {
        let entries = messages
            .into_iter()
            .map(|message| Entry {
                message,
                status: EntryStatus::Confirmed,
            })
            .collect();
        self.messages.insert(chat_id.to_string(), entries);
    }

    pub fn messages(&self, chat_id: &str) -> &[Entry] {
        self.messages.get(chat_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Build and insert an optimistic local message, returning the message
    /// to send over the channel. The id is generated here so the server
    /// echo reconciles against the pending entry instead of duplicating it.
    pub fn compose(&mut self, chat_id: &str, content: &str) -> Message {
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            sender_id: self.my_id.clone(),
            content: content.to_string(),
            created_at: Utc::now(),
            read_at: None,
            sender: None,
        };
        self.insert_local(message.clone());
        message
    }

    /// Insert a locally authored message as pending. A no-op if an entry
    /// with the same id already exists in the conversation.
    pub fn insert_local(&mut self, message: Message) {
        let entries = self.messages.entry(message.chat_id.clone()).or_default();
        if entries.iter().any(|entry| entry.message.id == message.id) {
            return;
        }
        entries.push(Entry {
            message,
            status: EntryStatus::Pending,
        });
    }

    /// Merge one channel event into the board.
    pub fn apply(&mut self, event: ServerEvent) {
        self.apply_at(event, Instant::now());
    }

    /// [`apply`](Self::apply) with an explicit clock, for the typing window.
    pub fn apply_at(&mut self, event: ServerEvent, now: Instant) {
        match event {
            ServerEvent::NewMessage(message) => self.merge_message(message),
            ServerEvent::MessageRead { chat_id } => self.mark_read(&chat_id),
            ServerEvent::Typing { chat_id } => {
                // A fresh notification restarts the window, it never stacks.
                self.typing.insert(chat_id, now + TYPING_WINDOW);
            }
        }
    }

    /// Whether the other participant is typing in a conversation, as of
    /// `now`. Expired windows are pruned on read.
    pub fn peer_typing(&mut self, chat_id: &str, now: Instant) -> bool {
        match self.typing.get(chat_id) {
            Some(deadline) if *deadline > now => true,
            Some(_) => {
                self.typing.remove(chat_id);
                false
            }
            None => false,
        }
    }

    fn merge_message(&mut self, message: Message) {
        let entries = self.messages.entry(message.chat_id.clone()).or_default();
        if let Some(entry) = entries
            .iter_mut()
            .find(|entry| entry.message.id == message.id)
        {
            // Echo of an optimistic insert: adopt the server's copy, which
            // carries the authoritative timestamp and sender record.
            debug!(id = %entry.message.id, "confirming pending message");
            entry.message = message;
            entry.status = EntryStatus::Confirmed;
            return;
        }
        entries.push(Entry {
            message,
            status: EntryStatus::Confirmed,
        });
    }

    /// The conversation was read: stamp every unread message authored by
    /// the other participant.
    fn mark_read(&mut self, chat_id: &str) {
        let Some(entries) = self.messages.get_mut(chat_id) else {
            return;
        };
        let now = Utc::now();
        for entry in entries.iter_mut() {
            if entry.message.sender_id != self.my_id && entry.message.read_at.is_none() {
                entry.message.read_at = Some(now);
            }
        }
    }

    pub fn set_friends(&mut self, friends: Vec<Friend>) {
        self.friends = friends;
    }

    pub fn friends(&self) -> &[Friend] {
        &self.friends
    }

    pub fn set_incoming_requests(&mut self, requests: Vec<Friend>) {
        self.incoming_requests = requests;
    }

    pub fn incoming_requests(&self) -> &[Friend] {
        &self.incoming_requests
    }

    /// Upsert a friendship row by id, in either list it appears in.
    pub fn upsert_friend(&mut self, friend: Friend) {
        for list in [&mut self.friends, &mut self.incoming_requests] {
            if let Some(existing) = list.iter_mut().find(|f| f.id == friend.id) {
                *existing = friend;
                return;
            }
        }
        self.friends.push(friend);
    }

    /// Drop a friendship row wherever it lives.
    pub fn remove_friend(&mut self, friend_id: &str) {
        self.friends.retain(|f| f.id != friend_id);
        self.incoming_requests.retain(|f| f.id != friend_id);
    }

    pub fn set_search_results(&mut self, users: Vec<User>) {
        self.search_results = users;
    }

    pub fn search_results(&self) -> &[User] {
        &self.search_results
    }

    /// Search results are transient: cleared once the user acts on one.
    pub fn clear_search_results(&mut self) {
        self.search_results.clear();
    }
}
