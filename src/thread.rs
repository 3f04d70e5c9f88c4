//! Message store for one conversation thread
//!
//! A thread is an ordered log of [`Turn`]s plus a running summary that
//! stands in for every turn compaction has already removed. Turns are
//! immutable once appended and carry an id that is unique within the
//! thread, so compaction can delete exactly the turns it summarized.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Originator of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        })
    }
}

/// Thread-local turn identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(u64);

impl TurnId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// One message in a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    id: TurnId,
    role: Role,
    content: String,
}

impl Turn {
    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Which turns survive a compaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Keep at most `count` trailing turns. A tool turn is never left at
    /// the head of the tail; it is summarized with the turns before it.
    LastTurns { count: usize },
    /// Keep the last `count` exchanges, each starting at a user turn.
    CompleteExchanges { count: usize },
}

impl Default for Retention {
    fn default() -> Self {
        Retention::LastTurns { count: 2 }
    }
}

impl Retention {
    /// Index of the first retained turn
    fn tail_start(self, messages: &[Turn]) -> usize {
        match self {
            Retention::LastTurns { count } => {
                let mut start = messages.len().saturating_sub(count);
                while messages
                    .get(start)
                    .is_some_and(|turn| turn.role == Role::Tool)
                {
                    start += 1;
                }
                start
            }
            Retention::CompleteExchanges { count } => {
                if count == 0 {
                    return messages.len();
                }
                let user_positions: Vec<usize> = messages
                    .iter()
                    .enumerate()
                    .filter(|(_, turn)| turn.role == Role::User)
                    .map(|(i, _)| i)
                    .collect();
                user_positions
                    .len()
                    .checked_sub(count)
                    .and_then(|i| user_positions.get(i).copied())
                    .unwrap_or(0)
            }
        }
    }

    /// Ids of the turns a compaction would delete, oldest first
    pub fn removable_ids(self, messages: &[Turn]) -> Vec<TurnId> {
        let start = self.tail_start(messages);
        messages.iter().take(start).map(Turn::id).collect()
    }
}

/// Result of summarizing a thread: the new summary and the turns it absorbed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compaction {
    pub summary: String,
    pub removed: Vec<TurnId>,
}

/// Persisted state of one thread
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<Turn>,
    #[serde(default)]
    summary: String,
    next_turn_id: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Turn] {
        &self.messages
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent turn
    pub fn last(&self) -> Option<&Turn> {
        self.messages.last()
    }

    /// Most recent user turn
    pub fn latest_user_turn(&self) -> Option<&Turn> {
        self.messages.iter().rev().find(|t| t.role == Role::User)
    }

    /// Append a turn and return its id
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> TurnId {
        let id = TurnId(self.next_turn_id);
        self.next_turn_id += 1;
        self.messages.push(Turn {
            id,
            role,
            content: content.into(),
        });
        id
    }

    /// Replace the summary and delete the absorbed turns in one step.
    ///
    /// Ids that are no longer present are ignored; turns appended after the
    /// compaction was computed are never touched.
    pub fn apply_compaction(&mut self, compaction: &Compaction) {
        let removed: HashSet<TurnId> = compaction.removed.iter().copied().collect();
        self.messages.retain(|turn| !removed.contains(&turn.id));
        self.summary.clone_from(&compaction.summary);
    }
}
