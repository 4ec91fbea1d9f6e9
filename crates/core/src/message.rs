//! Conversation domain types.
//!
//! These are the value objects that flow through the whole system:
//! a caller supplies a [`ConversationId`] and some text, the session layer
//! turns it into a user [`Turn`], and the store keeps the resulting
//! [`ConversationHistory`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

/// Longest accepted conversation id.
pub const MAX_CONVERSATION_ID_LEN: usize = 128;

/// Opaque identifier for a conversation, safe to use as a file name or
/// object key.
///
/// Only `[A-Za-z0-9_-]` is accepted, so an id can never climb out of the
/// storage directory or inject a key hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConversationId(String);

impl ConversationId {
    /// Validate and wrap a caller-supplied id.
    pub fn parse(s: &str) -> Result<Self, SessionError> {
        if s.is_empty() {
            return Err(SessionError::InvalidConversationId(
                "conversation id must not be empty".into(),
            ));
        }
        if s.len() > MAX_CONVERSATION_ID_LEN {
            return Err(SessionError::InvalidConversationId(format!(
                "conversation id longer than {MAX_CONVERSATION_ID_LEN} characters"
            )));
        }
        if let Some(bad) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(SessionError::InvalidConversationId(format!(
                "unsupported character {bad:?} in conversation id"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// A fresh random id, used when the caller starts a new conversation.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ConversationId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ConversationId {
    type Error = SessionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ConversationId> for String {
    fn from(id: ConversationId) -> Self {
        id.0
    }
}

/// Who wrote a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The persona (model reply)
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    fn other(self) -> Self {
        match self {
            Self::User => Self::Assistant,
            Self::Assistant => Self::User,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Accepts RFC 3339 timestamps as well as offset-less ISO 8601 ones
/// (`2025-03-01T10:00:00.123456`), which are read as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
}

impl Turn {
    /// Create a user turn stamped now.
    pub fn user(content: impl Into<String>) -> Self {
        Self::at(Role::User, content, Utc::now())
    }

    /// Create an assistant turn stamped now.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::at(Role::Assistant, content, Utc::now())
    }

    pub fn at(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }
}

/// The ordered turns of one conversation, oldest first.
///
/// Serializes as a bare JSON array of turns: the persisted record format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap turns read back from storage as-is.
    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The most recent `size` turns, oldest of the window first.
    pub fn window(&self, size: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(size);
        &self.turns[start..]
    }

    /// The role the next committed turn must have.
    pub fn next_role(&self) -> Role {
        self.last().map_or(Role::User, |t| t.role.other())
    }

    /// The earliest timestamp a new turn may carry without going backwards.
    pub fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        }
    }

    /// Check that `turns` continue this history: roles keep alternating and
    /// timestamps never go backwards. Returns the reason on failure.
    pub fn check_continuation(&self, turns: &[Turn]) -> Result<(), String> {
        let mut expected = self.next_role();
        let mut floor = self.last().map(|t| t.timestamp);
        for (i, turn) in turns.iter().enumerate() {
            if turn.role != expected {
                return Err(format!(
                    "turn {i} has role '{}' but '{expected}' was expected",
                    turn.role
                ));
            }
            if let Some(prev) = floor
                && turn.timestamp < prev
            {
                return Err(format!("turn {i} is older than the turn before it"));
            }
            expected = expected.other();
            floor = Some(turn.timestamp);
        }
        Ok(())
    }

    /// Append turns after validating them with [`Self::check_continuation`].
    pub fn extend(&mut self, turns: &[Turn]) -> Result<(), String> {
        self.check_continuation(turns)?;
        self.turns.extend_from_slice(turns);
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn exchange(n: usize) -> ConversationHistory {
        let base = Utc::now();
        let turns = (0..n)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                Turn::at(role, format!("turn {i}"), base + Duration::seconds(i as i64))
            })
            .collect();
        ConversationHistory::from_turns(turns)
    }

    #[test]
    fn conversation_id_accepts_uuid() {
        let id = ConversationId::generate();
        assert!(ConversationId::parse(id.as_str()).is_ok());
        assert_eq!(id.as_str().len(), 36);
    }

    #[test]
    fn conversation_id_rejects_traversal_and_empty() {
        assert!(ConversationId::parse("").is_err());
        assert!(ConversationId::parse("../etc/passwd").is_err());
        assert!(ConversationId::parse("a/b").is_err());
        assert!(ConversationId::parse("a.json").is_err());
        assert!(ConversationId::parse(&"x".repeat(129)).is_err());
        assert!(ConversationId::parse("session_01-ab").is_ok());
    }

    #[test]
    fn conversation_id_deserialization_validates() {
        let ok: Result<ConversationId, _> = serde_json::from_str("\"abc-123\"");
        assert!(ok.is_ok());
        let bad: Result<ConversationId, _> = serde_json::from_str("\"../x\"");
        assert!(bad.is_err());
    }

    #[test]
    fn turn_serializes_lowercase_role() {
        let json = serde_json::to_string(&Turn::user("hi")).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"timestamp\""));
    }

    #[test]
    fn turn_accepts_naive_and_offset_timestamps() {
        let naive: Turn = serde_json::from_str(
            r#"{"role":"user","content":"Hi","timestamp":"2025-03-01T10:00:00.123456"}"#,
        )
        .unwrap();
        let offset: Turn = serde_json::from_str(
            r#"{"role":"user","content":"Hi","timestamp":"2025-03-01T11:00:00.123456+01:00"}"#,
        )
        .unwrap();
        assert_eq!(naive.timestamp, offset.timestamp);

        let bad: Result<Turn, _> =
            serde_json::from_str(r#"{"role":"user","content":"Hi","timestamp":"yesterday"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn window_takes_most_recent_turns() {
        let history = exchange(5);
        let window = history.window(2);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "turn 3");
        assert_eq!(window[1].content, "turn 4");
        assert_eq!(history.window(50).len(), 5);
        assert!(history.window(0).is_empty());
    }

    #[test]
    fn next_role_alternates() {
        assert_eq!(ConversationHistory::new().next_role(), Role::User);
        assert_eq!(exchange(1).next_role(), Role::Assistant);
        assert_eq!(exchange(2).next_role(), Role::User);
    }

    #[test]
    fn extend_rejects_repeated_role() {
        let mut history = exchange(2);
        let err = history
            .extend(&[Turn::assistant("again")])
            .unwrap_err();
        assert!(err.contains("'user' was expected"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn extend_rejects_time_going_backwards() {
        let mut history = exchange(2);
        let stale = history.turns()[0].timestamp - Duration::hours(1);
        let err = history
            .extend(&[Turn::at(Role::User, "late", stale)])
            .unwrap_err();
        assert!(err.contains("older"));
    }

    #[test]
    fn extend_accepts_pair() {
        let mut history = ConversationHistory::new();
        let ts = history.next_timestamp();
        history
            .extend(&[
                Turn::at(Role::User, "hello", ts),
                Turn::at(Role::Assistant, "hi there", ts),
            ])
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.next_role(), Role::User);
    }

    #[test]
    fn history_serializes_as_bare_array() {
        let history = exchange(2);
        let json = serde_json::to_string(&history).unwrap();
        assert!(json.starts_with('['));
        let back: ConversationHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }
}
