use super::Accumulator;
use crate::insights::rank::{RankTable, Standing};
use crate::types::{Jid, Message};

/// Number of images received from each contact.
#[derive(Debug, Clone, Default)]
pub struct GreatestPhotoAmount {
    counts: RankTable<i64>,
}

impl Accumulator<Message> for GreatestPhotoAmount {
    fn is_valid(&self, message: &Message) -> bool {
        !message.from_me && message.is_image()
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
    use chrono::Utc;

    fn message(from_me: bool, mime: Option<&str>) -> Message {
        Message {
            remote_jid: Jid::from("5511911110000@s.whatsapp.net"),
            from_me,
            key_id: String::new(),
            date: Utc::now(),
            mime_type: mime.map(str::to_string),
            media_duration: None,
            media_name: None,
            forwarded: false,
            quoted: None,
        }
    }

    #[test]
    fn test_only_received_images_count() {
        let acc = GreatestPhotoAmount::default();
        assert!(acc.is_valid(&message(false, Some("image/jpeg"))));
        assert!(!acc.is_valid(&message(true, Some("image/jpeg"))));
        assert!(!acc.is_valid(&message(false, Some("video/mp4"))));
        assert!(!acc.is_valid(&message(false, None)));
    }
}
