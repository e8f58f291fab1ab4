//! Core domain types for chatinsights
//!
//! These types are the plain records the insight engine consumes. Loaders
//! (database readers, chat-export parsers) produce them; the engine never
//! touches a data source directly.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Jid** | Stable identifier of a chat: `{number}[-{sub}]@{domain}` |
//! | **User** | A one-to-one chat (`@s.whatsapp.net`, `@c.us`) |
//! | **Group** | A group chat (`@g.us`) |
//! | **Broadcast** | A pseudo-chat such as `status@broadcast`; never ranked |
//! | **Message** | A single chat message, possibly carrying media |
//! | **Call** | A voice or video call log entry |
//! | **Event** | Either a Message or a Call, as fed to the engine |

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// The pseudo-chat where status updates are posted.
pub const STATUS_BROADCAST_JID: &str = "status@broadcast";

// ============================================
// Jid
// ============================================

fn user_jid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^.+@(s\.whatsapp\.net|c\.us)$").expect("valid user jid regex"))
}

fn group_jid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^.+@g\.us$").expect("valid group jid regex"))
}

fn broadcast_jid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^.+@broadcast$").expect("valid broadcast jid regex"))
}

/// Identifier of a chat participant, group or broadcast list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Jid(String);

impl Jid {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify this jid by its domain suffix.
    ///
    /// Returns an identity error when the jid is none of user, group or
    /// broadcast.
    pub fn kind(&self) -> Result<JidKind> {
        if user_jid_regex().is_match(&self.0) {
            Ok(JidKind::User)
        } else if group_jid_regex().is_match(&self.0) {
            Ok(JidKind::Group)
        } else if broadcast_jid_regex().is_match(&self.0) {
            Ok(JidKind::Broadcast)
        } else {
            Err(Error::Identity(format!(
                "jid {:?} is neither a user, a group nor a broadcast list",
                self.0
            )))
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self.kind(), Ok(JidKind::User))
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind(), Ok(JidKind::Group))
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self.kind(), Ok(JidKind::Broadcast))
    }

    /// Text before the `@` (the phone number for users).
    pub fn user_part(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(user, _)| user)
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Jid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Jid {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Jid {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// What a jid points at, derived purely from its domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JidKind {
    User,
    Group,
    Broadcast,
}

impl JidKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JidKind::User => "user",
            JidKind::Group => "group",
            JidKind::Broadcast => "broadcast",
        }
    }
}

// ============================================
// Mime classification
// ============================================

/// Mime type predicates.
///
/// All of them are prefix matches; a missing mime type is simply "not that
/// kind of media".
pub mod mime {
    use regex::Regex;
    use std::sync::OnceLock;

    fn audio_regex() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"^audio/").expect("valid audio regex"))
    }

    fn voice_regex() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"^audio/ogg; codecs=opus").expect("valid voice regex"))
    }

    fn image_regex() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"^image/").expect("valid image regex"))
    }

    fn video_regex() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"^video/").expect("valid video regex"))
    }

    pub fn is_audio(mime_type: Option<&str>) -> bool {
        mime_type.is_some_and(|m| audio_regex().is_match(m))
    }

    /// Audio recorded as a voice note (ogg container, opus codec).
    pub fn is_voice_message(mime_type: Option<&str>) -> bool {
        mime_type.is_some_and(|m| voice_regex().is_match(m))
    }

    pub fn is_image(mime_type: Option<&str>) -> bool {
        mime_type.is_some_and(|m| image_regex().is_match(m))
    }

    pub fn is_video(mime_type: Option<&str>) -> bool {
        mime_type.is_some_and(|m| video_regex().is_match(m))
    }
}

// ============================================
// Messages and calls
// ============================================

/// Reference to a quoted message, by key.
///
/// A message never owns the message it quotes; only what is needed to
/// identify it is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotedMessage {
    /// Chat the quoted message belongs to
    pub remote_jid: Jid,
    /// Whether I sent the quoted message
    pub from_me: bool,
    /// Key of the quoted message
    #[serde(default)]
    pub key_id: String,
    /// When the quoted message was sent
    pub date: Option<DateTime<Utc>>,
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Chat this message belongs to
    pub remote_jid: Jid,
    /// Whether I sent it
    pub from_me: bool,
    /// Message key, unique within its chat
    #[serde(default)]
    pub key_id: String,
    /// When it was sent
    pub date: DateTime<Utc>,
    /// Media mime type, if the message carries media
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Media duration in seconds (audio and video)
    #[serde(default)]
    pub media_duration: Option<i64>,
    /// Media file name
    #[serde(default)]
    pub media_name: Option<String>,
    /// Whether the message was forwarded from another chat
    #[serde(default)]
    pub forwarded: bool,
    /// Message this one replies to
    #[serde(default)]
    pub quoted: Option<QuotedMessage>,
}

impl Message {
    pub fn is_audio(&self) -> bool {
        mime::is_audio(self.mime_type.as_deref())
    }

    pub fn is_voice_message(&self) -> bool {
        mime::is_voice_message(self.mime_type.as_deref())
    }

    pub fn is_image(&self) -> bool {
        mime::is_image(self.mime_type.as_deref())
    }

    pub fn is_video(&self) -> bool {
        mime::is_video(self.mime_type.as_deref())
    }

    /// Whether this message replies to a status I posted.
    pub fn answers_my_status(&self) -> bool {
        self.quoted
            .as_ref()
            .is_some_and(|q| q.from_me && q.remote_jid.as_str() == STATUS_BROADCAST_JID)
    }
}

/// A call log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Who was called, or who called
    pub remote_jid: Jid,
    /// Whether I placed the call
    pub from_me: bool,
    /// When the call started
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub is_video_call: bool,
    /// Duration in seconds; 0 when unanswered
    #[serde(default)]
    pub duration: i64,
    /// Opaque call result code
    #[serde(default)]
    pub result: Option<i64>,
}

impl Call {
    /// Whether the call was picked up.
    pub fn is_answered(&self) -> bool {
        self.duration > 0
    }
}

// ============================================
// Events
// ============================================

/// Kind of event the engine routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Message,
    Call,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::Call => "call",
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "message" => Ok(EventKind::Message),
            "call" => Ok(EventKind::Call),
            _ => Err(format!("unknown event kind: {}", s)),
        }
    }
}

/// A single event fed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Message(Message),
    Call(Call),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Message(_) => EventKind::Message,
            Event::Call(_) => EventKind::Call,
        }
    }

    pub fn remote_jid(&self) -> &Jid {
        match self {
            Event::Message(m) => &m.remote_jid,
            Event::Call(c) => &c.remote_jid,
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        match self {
            Event::Message(m) => m.date,
            Event::Call(c) => c.date,
        }
    }

    /// Decode a raw event record tagged with a `kind` field.
    ///
    /// A record whose kind is missing or unknown is an [`Error::EventKind`];
    /// a known kind with malformed fields is an [`Error::Json`].
    pub fn from_json(mut value: serde_json::Value) -> Result<Self> {
        let kind = match value.as_object_mut().and_then(|o| o.remove("kind")) {
            Some(serde_json::Value::String(kind)) => kind,
            Some(other) => return Err(Error::EventKind(other.to_string())),
            None => return Err(Error::EventKind("<missing>".to_string())),
        };

        match kind.parse::<EventKind>().map_err(Error::EventKind)? {
            EventKind::Message => Ok(Event::Message(serde_json::from_value(value)?)),
            EventKind::Call => Ok(Event::Call(serde_json::from_value(value)?)),
        }
    }
}

impl From<Message> for Event {
    fn from(message: Message) -> Self {
        Event::Message(message)
    }
}

impl From<Call> for Event {
    fn from(call: Call) -> Self {
        Event::Call(call)
    }
}

/// Sort events by date, keeping the input order of simultaneous events.
///
/// The engine never sorts on its own; callers feeding the conversation
/// insighter must hand it chronological input.
pub fn sort_chronologically(events: &mut [Event]) {
    events.sort_by_key(Event::date);
}
