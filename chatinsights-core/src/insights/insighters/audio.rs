//! Voice note statistics.

use super::Accumulator;
use crate::insights::rank::{Peak, RankTable, Standing};
use crate::types::{Jid, Message};

/// File extension voice notes are stored with.
const VOICE_NOTE_EXTENSION: &str = ".opus";

/// A received, non-forwarded voice note with a known duration.
fn is_received_voice_note(message: &Message, check_media_name: bool) -> bool {
    !message.from_me
        && message.is_voice_message()
        && message.media_duration.is_some_and(|d| d > 0)
        && !message.forwarded
        && (!check_media_name
            || message
                .media_name
                .as_deref()
                .is_some_and(|name| name.ends_with(VOICE_NOTE_EXTENSION)))
}

/// Longest voice note received from each contact.
#[derive(Debug, Clone)]
pub struct LongestAudio {
    check_media_name: bool,
    peaks: RankTable<Peak<Message>>,
}

impl LongestAudio {
    pub fn new(check_media_name: bool) -> Self {
        Self {
            check_media_name,
            peaks: RankTable::new(),
        }
    }
}

impl Accumulator<Message> for LongestAudio {
    fn is_valid(&self, message: &Message) -> bool {
        is_received_voice_note(message, self.check_media_name)
    }

    fn accumulate(&mut self, jid: &Jid, message: &Message) {
        let Some(duration) = message.media_duration else {
            return;
        };
        self.peaks.offer(
            jid,
            Peak {
                value: duration,
                date: message.date,
                source: message.clone(),
            },
        );
    }

    fn standings(&self) -> Vec<Standing> {
        self.peaks.standings()
    }

    fn reset(&mut self) {
        self.peaks.clear();
    }
}

/// Number of voice notes received from each contact.
#[derive(Debug, Clone)]
pub struct GreatestAudioAmount {
    check_media_name: bool,
    counts: RankTable<i64>,
}

impl GreatestAudioAmount {
    pub fn new(check_media_name: bool) -> Self {
        Self {
            check_media_name,
            counts: RankTable::new(),
        }
    }
}

impl Accumulator<Message> for GreatestAudioAmount {
    fn is_valid(&self, message: &Message) -> bool {
        is_received_voice_note(message, self.check_media_name)
    }

    fn accumulate(&mut self, jid: &Jid, _message: &Message) {
        self.counts.add(jid, 1);
    }

    fn standings(&self) -> Vec<Standing> {
        self.counts.standings()
    }

    fn reset(&mut self) {
        self.counts.clear();
    }
}
