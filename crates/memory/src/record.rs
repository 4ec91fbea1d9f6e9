//! On-disk / on-bucket record format for a conversation.
//!
//! A record is a pretty-printed JSON array of `{role, content, timestamp}`
//! objects, oldest first. Both persistent backends share this codec so a
//! record written by one can be read by the other.

use doppel_core::error::StoreError;
use doppel_core::message::{ConversationHistory, ConversationId, Turn};
use tracing::warn;

/// Serialize a history into record bytes.
pub fn encode(history: &ConversationHistory) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(history).map_err(|e| {
        StoreError::StorageUnavailable(format!("Failed to serialize conversation record: {e}"))
    })
}

/// Parse record bytes. A record that parses but breaks role alternation or
/// timestamp order is reported as corrupt too.
pub fn decode(id: &ConversationId, bytes: &[u8]) -> Result<ConversationHistory, StoreError> {
    let corrupt = |reason: String| StoreError::CorruptRecord {
        conversation_id: id.to_string(),
        reason,
    };

    let turns: Vec<Turn> = serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
    let mut history = ConversationHistory::new();
    history.extend(&turns).map_err(corrupt)?;
    Ok(history)
}

/// Parse record bytes, falling back to an empty history when the record is
/// unreadable. Conversation memory is best-effort, so a corrupt record is
/// logged and dropped rather than failing the request.
pub fn decode_or_empty(id: &ConversationId, bytes: &[u8]) -> ConversationHistory {
    match decode(id, bytes) {
        Ok(history) => history,
        Err(e) => {
            warn!(conversation_id = %id, error = %e, "Discarding unreadable conversation record");
            ConversationHistory::new()
        }
    }
}
