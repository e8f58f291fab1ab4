//! JSON chat dumps
//!
//! The loaders that read a phone's message store live outside this crate;
//! they hand over a JSON dump shaped like:
//!
//! ```json
//! {
//!   "contacts": [{ "jid": "...", "display_name": "...", "profile_image": null }],
//!   "messages": [{ "remote_jid": "...", "from_me": false, "date": "..." }],
//!   "calls": [{ "remote_jid": "...", "from_me": true, "date": "...", "duration": 42 }],
//!   "events": [{ "kind": "message", "remote_jid": "...", "from_me": false, "date": "..." }]
//! }
//! ```
//!
//! Every section is optional. `events` holds records tagged with `kind`; an
//! unknown kind fails the whole load.

use serde::Deserialize;
use std::path::Path;

use crate::contacts::ContactEntry;
use crate::error::{Error, Result};
use crate::types::{sort_chronologically, Call, Event, Message};

#[derive(Debug, Deserialize)]
struct RawDump {
    #[serde(default)]
    contacts: Vec<ContactEntry>,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    calls: Vec<Call>,
    #[serde(default)]
    events: Vec<serde_json::Value>,
}

/// Contacts and events of one chat dump, events in date order.
#[derive(Debug, Clone, Default)]
pub struct ChatDump {
    pub contacts: Vec<ContactEntry>,
    pub events: Vec<Event>,
}

impl ChatDump {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawDump = serde_json::from_str(content)?;

        let mut events: Vec<Event> = raw
            .messages
            .into_iter()
            .map(Event::from)
            .chain(raw.calls.into_iter().map(Event::from))
            .collect();
        for record in raw.events {
            events.push(Event::from_json(record)?);
        }
        sort_chronologically(&mut events);

        Ok(Self {
            contacts: raw.contacts,
            events,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let dump = Self::from_json_str(&content)?;
        tracing::info!(
            path = %path.display(),
            contacts = dump.contacts.len(),
            events = dump.events.len(),
            "Loaded chat dump"
        );
        Ok(dump)
    }

    pub fn message_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Message(_)))
            .count()
    }

    pub fn call_count(&self) -> usize {
        self.events.len() - self.message_count()
    }
}

/// Read a secondary identity source: a JSON array of contact entries.
pub fn load_contacts(path: &Path) -> Result<Vec<ContactEntry>> {
    let content = std::fs::read_to_string(path)?;
    let entries: Vec<ContactEntry> = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("failed to parse contacts file {:?}: {}", path, e))
    })?;
    tracing::debug!(path = %path.display(), contacts = entries.len(), "Loaded contacts file");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DUMP: &str = r#"{
        "contacts": [
            {"jid": "5531933330000@s.whatsapp.net", "display_name": "Bruno"}
        ],
        "messages": [
            {"remote_jid": "5531933330000@s.whatsapp.net", "from_me": false,
             "date": "2023-01-01T10:00:05Z"}
        ],
        "calls": [
            {"remote_jid": "5531933330000@s.whatsapp.net", "from_me": true,
             "date": "2023-01-01T09:00:00Z", "duration": 42}
        ],
        "events": [
            {"kind": "message", "remote_jid": "5531933330000@s.whatsapp.net",
             "from_me": true, "date": "2023-01-01T10:00:00Z"}
        ]
    }"#;

    #[test]
    fn test_dump_sections_merge_in_date_order() {
        let dump = ChatDump::from_json_str(DUMP).unwrap();
        assert_eq!(dump.contacts.len(), 1);
        assert_eq!(dump.events.len(), 3);
        assert_eq!(dump.message_count(), 2);
        assert_eq!(dump.call_count(), 1);

        assert!(matches!(dump.events[0], Event::Call(_)));
        assert!(dump.events.windows(2).all(|w| w[0].date() <= w[1].date()));
    }

    #[test]
    fn test_unknown_event_kind_fails() {
        let content = r#"{"events": [{"kind": "reaction", "remote_jid": "x@c.us"}]}"#;
        assert!(matches!(
            ChatDump::from_json_str(content),
            Err(Error::EventKind(_))
        ));
    }

    #[test]
    fn test_empty_dump() {
        let dump = ChatDump::from_json_str("{}").unwrap();
        assert!(dump.events.is_empty());
        assert!(dump.contacts.is_empty());
    }

    #[test]
    fn test_load_contacts_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"jid": "5531933330000@s.whatsapp.net", "display_name": "Bruno B."}}]"#
        )
        .unwrap();
        let entries = load_contacts(file.path()).unwrap();
        assert_eq!(entries[0].display_name.as_deref(), Some("Bruno B."));

        let mut bad = NamedTempFile::new().unwrap();
        write!(bad, "{{}}").unwrap();
        assert!(matches!(load_contacts(bad.path()), Err(Error::Config(_))));
    }
}
