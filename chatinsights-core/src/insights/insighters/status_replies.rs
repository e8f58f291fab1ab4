use super::Accumulator;
use crate::insights::rank::{RankTable, Standing};
use crate::types::{Jid, Message};

/// Replies each contact sent to statuses I posted.
#[derive(Debug, Clone, Default)]
pub struct GreatestMyStatusAnswered {
    counts: RankTable<i64>,
}

impl Accumulator<Message> for GreatestMyStatusAnswered {
    fn is_valid(&self, message: &Message) -> bool {
        !message.from_me && message.answers_my_status()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QuotedMessage, STATUS_BROADCAST_JID};
    use chrono::Utc;

    fn reply(from_me: bool, quoted_chat: &str, quoted_from_me: bool) -> Message {
        Message {
            remote_jid: Jid::from("5511911110000@s.whatsapp.net"),
            from_me,
            key_id: "r1".to_string(),
            date: Utc::now(),
            mime_type: None,
            media_duration: None,
            media_name: None,
            forwarded: false,
            quoted: Some(QuotedMessage {
                remote_jid: Jid::from(quoted_chat),
                from_me: quoted_from_me,
                key_id: "s1".to_string(),
                date: None,
            }),
        }
    }

    #[test]
    fn test_only_replies_to_my_status() {
        let acc = GreatestMyStatusAnswered::default();
        assert!(acc.is_valid(&reply(false, STATUS_BROADCAST_JID, true)));
        // Their own status
        assert!(!acc.is_valid(&reply(false, STATUS_BROADCAST_JID, false)));
        // My reply
        assert!(!acc.is_valid(&reply(true, STATUS_BROADCAST_JID, true)));
        // Quoting a chat message
        assert!(!acc.is_valid(&reply(false, "5511911110000@s.whatsapp.net", true)));
    }
}
