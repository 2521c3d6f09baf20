//! Folding a burst of buffered messages into one run's input text (§4.B
//! "Coalescing").

use switchyard_core::WorkItemId;
use switchyard_storage::QueueMessageRow;

/// The result of folding a burst of messages into one run: the text handed
/// to the agent, and the work item whose context the run should carry
/// forward (the last included message's).
#[derive(Debug, Clone)]
pub struct Coalesced {
    /// The text to use as `coalesced_text`.
    pub text: String,
    /// The work item of the last included message.
    pub response_work_item_id: WorkItemId,
}

/// Fold `messages` (already in arrival order) per §4.B "Coalescing": a
/// single message passes through unchanged; multiple get a header line and
/// one `"[HH:MM:SS - sender] text"` line each.
///
/// # Panics
///
/// Panics if `messages` is empty — callers must only coalesce non-empty
/// bursts.
#[must_use]
pub fn coalesce(messages: &[QueueMessageRow]) -> Coalesced {
    let last = messages.last().expect("coalesce requires at least one message");
    let response_work_item_id = last.work_item_id;

    if messages.len() == 1 {
        return Coalesced {
            text: messages[0].text.clone(),
            response_work_item_id,
        };
    }

    let mut text = format!("[{} messages arrived while you were working]\n", messages.len());
    for (i, message) in messages.iter().enumerate() {
        if i > 0 {
            text.push('\n');
        }
        let sender = message.sender_name.as_deref().unwrap_or("unknown");
        text.push_str(&format!(
            "[{} - {sender}] {}",
            message.arrived_at.format("%H:%M:%S"),
            message.text
        ));
    }

    Coalesced {
        text,
        response_work_item_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use switchyard_core::QueueKey;

    fn message(text: &str, sender: &str, hhmmss: (u32, u32, u32)) -> QueueMessageRow {
        let (h, m, s) = hhmmss;
        QueueMessageRow {
            id: uuid::Uuid::new_v4(),
            queue_key: QueueKey::from("session:agent".to_string()),
            work_item_id: WorkItemId::new(),
            text: text.to_string(),
            sender_name: Some(sender.to_string()),
            arrived_at: Utc.with_ymd_and_hms(2026, 1, 1, h, m, s).unwrap(),
        }
    }

    #[test]
    fn single_message_passes_through_unchanged() {
        let messages = vec![message("hello", "ada", (10, 0, 0))];
        let result = coalesce(&messages);
        assert_eq!(result.text, "hello");
    }

    #[test]
    fn multiple_messages_get_a_header_and_per_line_timestamps() {
        let messages = vec![
            message("first", "ada", (10, 0, 0)),
            message("second", "grace", (10, 0, 5)),
        ];
        let result = coalesce(&messages);
        assert_eq!(
            result.text,
            "[2 messages arrived while you were working]\n\
             [10:00:00 - ada] first\n\
             [10:00:05 - grace] second"
        );
        assert_eq!(result.response_work_item_id, messages[1].work_item_id);
    }
}
