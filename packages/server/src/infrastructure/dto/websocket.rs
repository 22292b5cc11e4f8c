//! WebSocket message types and payloads.
//!
//! Tag values are shared with client builds and must not be renumbered.

use serde::{Deserialize, Serialize};

use crate::domain::{BoardId, Counter, PostId, ThreadId};

use super::codec::{CodecError, parse_payload};

/// Frame type tag, the first two characters of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Server notice that the client misbehaved, sent just before closing
    Invalid = 0,
    /// c→s: begin a post; s→c: a post was created
    InsertPost = 2,
    /// c→s: append text; s→c: a post body was appended to
    Append = 3,
    Backspace = 4,
    Splice = 5,
    ClosePost = 6,
    Synchronise = 30,
    Resynchronise = 31,
    /// s→c: id of the post this client just opened
    PostId = 32,
}

impl MessageType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Types accepted before the client is synced
    pub fn is_sync(self) -> bool {
        matches!(self, MessageType::Synchronise | MessageType::Resynchronise)
    }

    /// Types that are appended to update feeds and therefore advance the
    /// feed counter a client tracks
    pub fn is_feed_event(self) -> bool {
        matches!(
            self,
            MessageType::InsertPost
                | MessageType::Append
                | MessageType::Backspace
                | MessageType::Splice
                | MessageType::ClosePost
        )
    }
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(MessageType::Invalid),
            2 => Ok(MessageType::InsertPost),
            3 => Ok(MessageType::Append),
            4 => Ok(MessageType::Backspace),
            5 => Ok(MessageType::Splice),
            6 => Ok(MessageType::ClosePost),
            30 => Ok(MessageType::Synchronise),
            31 => Ok(MessageType::Resynchronise),
            32 => Ok(MessageType::PostId),
            other => Err(other),
        }
    }
}

// ========================================
// Client → Server
// ========================================

/// Synchronise / Resynchronise request. Thread 0 syncs to the board feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub board: BoardId,
    #[serde(default)]
    pub thread: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertPostRequest {
    pub thread: ThreadId,
    pub board: BoardId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpliceRequest {
    pub start: usize,
    pub len: usize,
    pub text: String,
}

/// Every message a client may send, one variant per accepted type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Synchronise(SyncRequest),
    Resynchronise(SyncRequest),
    InsertPost(InsertPostRequest),
    Append(String),
    Backspace,
    Splice(SpliceRequest),
    ClosePost,
}

impl ClientMessage {
    /// Parse a decoded frame. Server-only and unassigned tags are
    /// `UnknownMessageType`.
    pub fn parse(tag: u8, payload: &str) -> Result<Self, CodecError> {
        let typ = MessageType::try_from(tag).map_err(CodecError::UnknownMessageType)?;
        match typ {
            MessageType::Synchronise => Ok(Self::Synchronise(parse_payload(tag, payload)?)),
            MessageType::Resynchronise => Ok(Self::Resynchronise(parse_payload(tag, payload)?)),
            MessageType::InsertPost => Ok(Self::InsertPost(parse_payload(tag, payload)?)),
            MessageType::Append => Ok(Self::Append(parse_payload(tag, payload)?)),
            MessageType::Backspace => Ok(Self::Backspace),
            MessageType::Splice => Ok(Self::Splice(parse_payload(tag, payload)?)),
            MessageType::ClosePost => Ok(Self::ClosePost),
            MessageType::Invalid | MessageType::PostId => Err(CodecError::UnknownMessageType(tag)),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Synchronise(_) => MessageType::Synchronise,
            Self::Resynchronise(_) => MessageType::Resynchronise,
            Self::InsertPost(_) => MessageType::InsertPost,
            Self::Append(_) => MessageType::Append,
            Self::Backspace => MessageType::Backspace,
            Self::Splice(_) => MessageType::Splice,
            Self::ClosePost => MessageType::ClosePost,
        }
    }
}

// ========================================
// Server → Client
// ========================================

/// Reply to Synchronise / Resynchronise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub counter: Counter,
    /// Clients synced to the same feed, including this one
    pub synced: usize,
}

/// Feed event: a post was opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCreatedEvent {
    pub id: PostId,
    pub thread: ThreadId,
    pub board: BoardId,
    pub time: i64,
}

/// Feed event: text was appended to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendEvent {
    pub id: PostId,
    pub text: String,
}

/// Feed event: a splice was applied to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpliceEvent {
    pub id: PostId,
    pub start: usize,
    pub len: usize,
    pub text: String,
}

/// Feed event carrying only the affected post (backspace, close)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEvent {
    pub id: PostId,
}
