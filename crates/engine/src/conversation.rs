//! Append-only conversation log.
//!
//! Records question/answer pairs for the engine's lifetime as read-only
//! telemetry. The log is bounded by a ring buffer and is never read back
//! into prompt assembly; every query is grounded in retrieval alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Role of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Question,
    Answer,
}

/// A single logged question or answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Bounded, append-only log of conversation entries.
///
/// When the capacity is reached the oldest entries are dropped, so a
/// long-lived engine never grows without bound.
#[derive(Debug)]
pub struct ConversationLog {
    entries: VecDeque<ConversationEntry>,
    capacity: usize,
}

impl ConversationLog {
    /// Create a log holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(2),
        }
    }

    /// Append an entry, evicting the oldest if the log is full.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }

        self.entries.push_back(ConversationEntry {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    /// Number of entries currently retained.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate entries oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &ConversationEntry> {
        self.entries.iter()
    }
}
