use std::collections::VecDeque;

use parking_lot::Mutex;
use time::{OffsetDateTime, UtcOffset};

use crate::codec::html_escape;
use crate::config::limits;

/// A single chat entry. `user` and `text` are HTML-escaped when the entry is
/// created, so the stored strings can be spliced into a page verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    user: String,
    text: String,
    time: String,
}

impl ChatMessage {
    pub fn new(user: &str, text: &str, time: impl Into<String>) -> Self {
        Self {
            user: html_escape(user, limits::STORED_USER),
            text: html_escape(text, limits::STORED_TEXT),
            time: time.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    /// Append this entry's HTML fragment to `out`.
    pub fn render_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"<div class=\"message\"><span class=\"time\">[");
        out.extend_from_slice(self.time.as_bytes());
        out.extend_from_slice(b"]</span> <span class=\"user\">");
        out.extend_from_slice(self.user.as_bytes());
        out.extend_from_slice(b":</span> <span class=\"text\">");
        out.extend_from_slice(self.text.as_bytes());
        out.extend_from_slice(b"</span></div>\n");
    }
}

/// Bounded, insertion-ordered chat log shared by every connection.
///
/// Once `capacity` entries are held, each new entry evicts the oldest one.
#[derive(Debug)]
pub struct MessageStore {
    log: Mutex<VecDeque<ChatMessage>>,
    capacity: usize,
    offset: UtcOffset,
}

impl MessageStore {
    /// Timestamps are taken in UTC.
    pub fn new(capacity: usize) -> Self {
        Self::with_offset(capacity, UtcOffset::UTC)
    }

    /// Timestamps are taken at the given offset. The local offset has to be
    /// resolved before the runtime spawns its worker threads.
    pub fn with_offset(capacity: usize, offset: UtcOffset) -> Self {
        let capacity = capacity.max(1);
        Self {
            log: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            offset,
        }
    }

    /// Record a message from raw (unescaped) user and text, stamped `HH:MM`.
    pub fn post(&self, user: &str, text: &str) {
        let now = OffsetDateTime::now_utc().to_offset(self.offset);
        let stamp = format!("{:02}:{:02}", now.hour(), now.minute());
        self.push(ChatMessage::new(user, text, stamp));
    }

    pub fn push(&self, message: ChatMessage) {
        let mut log = self.log.lock();
        if log.len() >= self.capacity {
            log.pop_front();
        }
        log.push_back(message);
    }

    /// Append every entry's fragment to `out`, oldest first.
    pub fn render_into(&self, out: &mut Vec<u8>) {
        let log = self.log.lock();
        for message in log.iter() {
            message.render_into(out);
        }
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.log.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
