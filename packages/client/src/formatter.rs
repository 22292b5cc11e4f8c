//! Event formatting utilities for client display.

use kakiko_server::infrastructure::dto::{
    codec::{decode, parse_payload},
    http::ThreadDto,
    websocket::{AppendEvent, MessageType, PostCreatedEvent, PostEvent, SpliceEvent, SyncResponse},
};
use kakiko_shared::time::timestamp_to_rfc3339;

const RULE: &str = "============================================================";

/// Event formatter for client display
pub struct EventFormatter;

impl EventFormatter {
    /// Format a thread snapshot with all of its posts
    pub fn format_thread(thread: &ThreadDto) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", RULE));
        output.push_str(&format!(
            "/{}/ #{} {} (created {})\n",
            thread.board, thread.id, thread.subject, thread.created_at
        ));

        if thread.posts.is_empty() {
            output.push_str("(No posts)\n");
        } else {
            for post in &thread.posts {
                let editing = if post.editing { " (editing)" } else { "" };
                output.push_str(&format!(
                    "#{}{} at {}: {}\n",
                    post.id, editing, post.created_at, post.body
                ));
            }
        }

        output.push_str(&format!("{}\n", RULE));
        output
    }

    /// Format any frame received from the server. Frames that don't parse are
    /// shown raw.
    pub fn format_frame(frame: &str) -> String {
        Self::try_format_frame(frame).unwrap_or_else(|| Self::format_raw(frame))
    }

    fn try_format_frame(frame: &str) -> Option<String> {
        let (tag, payload) = decode(frame).ok()?;
        let line = match MessageType::try_from(tag).ok()? {
            MessageType::Synchronise | MessageType::Resynchronise => {
                let sync: SyncResponse = parse_payload(tag, payload).ok()?;
                format!("* synced at {} ({} watching)", sync.counter, sync.synced)
            }
            MessageType::InsertPost => {
                let event: PostCreatedEvent = parse_payload(tag, payload).ok()?;
                format!(
                    "+ #{} opened in /{}/ #{} at {}",
                    event.id,
                    event.board,
                    event.thread,
                    timestamp_to_rfc3339(event.time)
                )
            }
            MessageType::Append => {
                let event: AppendEvent = parse_payload(tag, payload).ok()?;
                format!("  #{} += {:?}", event.id, event.text)
            }
            MessageType::Backspace => {
                let event: PostEvent = parse_payload(tag, payload).ok()?;
                format!("  #{} <-", event.id)
            }
            MessageType::Splice => {
                let event: SpliceEvent = parse_payload(tag, payload).ok()?;
                format!(
                    "  #{} [{}..+{}] = {:?}",
                    event.id, event.start, event.len, event.text
                )
            }
            MessageType::ClosePost => {
                let event: PostEvent = parse_payload(tag, payload).ok()?;
                format!("- #{} closed", event.id)
            }
            MessageType::PostId => {
                let id: u64 = parse_payload(tag, payload).ok()?;
                format!("* you are writing #{}", id)
            }
            MessageType::Invalid => {
                let reason: String = parse_payload(tag, payload).ok()?;
                format!("! server rejected the last message: {}", reason)
            }
        };
        Some(format!("\n{}\n", line))
    }

    /// Format a frame that couldn't be parsed
    pub fn format_raw(text: &str) -> String {
        format!("\n{}\n", text)
    }
}
