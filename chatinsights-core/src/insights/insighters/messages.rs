//! Message volume statistics.

use super::Accumulator;
use crate::insights::rank::{Podium, RankTable, Standing};
use crate::types::{Jid, Message};

/// Messages exchanged with each contact, both directions.
#[derive(Debug, Clone, Default)]
pub struct GreatestMessagesAmount {
    counts: RankTable<i64>,
}

impl Accumulator<Message> for GreatestMessagesAmount {
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

/// Messages exchanged, ranked by an incrementally maintained podium.
///
/// Ties keep the order in which contacts reached the count, so the ranking
/// can differ from [`GreatestMessagesAmount`] among equal counts.
#[derive(Debug, Clone)]
pub struct TopMessagesAmount {
    top: usize,
    counts: RankTable<i64>,
    podium: Podium,
}

impl TopMessagesAmount {
    pub fn new(top: usize) -> Self {
        Self {
            top,
            counts: RankTable::new(),
            podium: Podium::new(),
        }
    }

    fn standing(&self, jid: &Jid) -> Standing {
        Standing::new(jid.clone(), self.counts.value(jid.as_str()))
    }
}

impl Accumulator<Message> for TopMessagesAmount {
    fn accumulate(&mut self, jid: &Jid, _message: &Message) {
        self.counts.add(jid, 1);
        self.podium.promote(jid, &self.counts);
    }

    fn standings(&self) -> Vec<Standing> {
        self.podium.iter().map(|jid| self.standing(jid)).collect()
    }

    fn podium(&self, n: usize) -> Vec<Standing> {
        self.podium
            .top(n)
            .iter()
            .map(|jid| self.standing(jid))
            .collect()
    }

    fn podium_size(&self) -> Option<usize> {
        Some(self.top)
    }

    fn reset(&mut self) {
        self.counts.clear();
        self.podium.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(remote: &str) -> Message {
        Message {
            remote_jid: Jid::from(remote),
            from_me: false,
            key_id: String::new(),
            date: Utc::now(),
            mime_type: None,
            media_duration: None,
            media_name: None,
            forwarded: false,
            quoted: None,
        }
    }

    fn jids(standings: &[Standing]) -> Vec<&str> {
        standings.iter().map(|s| s.jid.as_str()).collect()
    }

    #[test]
    fn test_greatest_counts_every_message() {
        let mut acc = GreatestMessagesAmount::default();
        for remote in ["b@c.us", "a@c.us", "b@c.us"] {
            let m = message(remote);
            assert!(acc.is_valid(&m));
            acc.accumulate(&m.remote_jid, &m);
        }
        let standings = acc.standings();
        assert_eq!(jids(&standings), vec!["b@c.us", "a@c.us"]);
        assert_eq!(standings[0].value, 2);
        assert_eq!(acc.podium_size(), None);
    }

    #[test]
    fn test_top_podium_order() {
        let mut acc = TopMessagesAmount::new(2);
        for remote in ["a@c.us", "b@c.us", "c@c.us", "c@c.us", "b@c.us", "b@c.us"] {
            let m = message(remote);
            acc.accumulate(&m.remote_jid, &m);
        }

        assert_eq!(jids(&acc.podium(acc.podium_size().unwrap())), vec!["b@c.us", "c@c.us"]);
        assert_eq!(jids(&acc.standings()), vec!["b@c.us", "c@c.us", "a@c.us"]);
        assert_eq!(acc.podium(1)[0].value, 3);
    }

    #[test]
    fn test_top_ties_keep_arrival_order() {
        let mut acc = TopMessagesAmount::new(3);
        for remote in ["z@c.us", "a@c.us"] {
            let m = message(remote);
            acc.accumulate(&m.remote_jid, &m);
        }
        // Jid order would put a first; the podium keeps z
        assert_eq!(jids(&acc.podium(3)), vec!["z@c.us", "a@c.us"]);
    }
}
