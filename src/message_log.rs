//! Append-only record of transmitted and received messages.
//!
//! A [`MessageLog`] is cheap to clone; clones share the same record. Sequence
//! numbers are assigned under the write lock, so sequence order, insertion
//! order and the order in which `append` calls complete are the same.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Which way a message crossed the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Sent,
    Received,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Sent => f.write_str("TX"),
            Direction::Received => f.write_str("RX"),
        }
    }
}

/// One transmitted or received chunk of bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub sequence: u64,
    pub direction: Direction,
    #[serde(serialize_with = "serialize_lossy")]
    pub text: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// The payload decoded as UTF-8, with invalid sequences replaced.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }
}

fn serialize_lossy<S: Serializer>(text: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(text))
}

/// Totals per direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MessageCounts {
    pub sent: usize,
    pub received: usize,
}

#[derive(Debug, Default)]
struct LogInner {
    messages: Vec<Message>,
    next_sequence: u64,
}

/// Thread-safe, append-only message history.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    inner: Arc<RwLock<LogInner>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message and return it with its assigned sequence number.
    pub fn append(&self, direction: Direction, text: impl Into<Vec<u8>>) -> Message {
        let text = text.into();
        let mut inner = self.inner.write();
        let message = Message {
            sequence: inner.next_sequence,
            direction,
            text,
            timestamp: Utc::now(),
        };
        inner.next_sequence += 1;
        inner.messages.push(message.clone());
        message
    }

    /// A consistent copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.inner.read().messages.clone()
    }

    /// Messages with `sequence >= from`, oldest first.
    pub fn since(&self, from: u64) -> Vec<Message> {
        let inner = self.inner.read();
        let start = inner.messages.partition_point(|m| m.sequence < from);
        inner.messages[start..].to_vec()
    }

    pub fn last(&self) -> Option<Message> {
        self.inner.read().messages.last().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> MessageCounts {
        let inner = self.inner.read();
        inner
            .messages
            .iter()
            .fold(MessageCounts::default(), |mut counts, m| {
                match m.direction {
                    Direction::Sent => counts.sent += 1,
                    Direction::Received => counts.received += 1,
                }
                counts
            })
    }

    /// Drop all recorded messages. Sequence numbers keep increasing.
    pub fn clear(&self) {
        self.inner.write().messages.clear();
    }
}
