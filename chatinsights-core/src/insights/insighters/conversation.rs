//! Longest run of quick back-and-forth with one contact.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::Accumulator;
use crate::insights::rank::{Peak, RankTable, Standing};
use crate::types::{Jid, Message};

/// Running window for one contact.
#[derive(Debug, Clone)]
struct Window {
    start: Message,
    last_date: DateTime<Utc>,
    total: i64,
    direction: Option<Ordering>,
    warned: bool,
}

impl Window {
    fn open(message: &Message) -> Self {
        Self {
            start: message.clone(),
            last_date: message.date,
            total: 0,
            direction: None,
            warned: false,
        }
    }
}

/// Longest conversation per contact, measured as the sum of the gaps between
/// consecutive messages while every gap stays within `gap_secs`.
///
/// Messages must arrive in date order, ascending or descending. A contact
/// whose stream changes direction is logged once at warn level; its result is
/// then meaningless.
#[derive(Debug, Clone)]
pub struct LongestConversation {
    gap_secs: i64,
    windows: HashMap<Jid, Window>,
    best: RankTable<Peak<Message>>,
}

impl LongestConversation {
    pub fn new(gap_secs: i64) -> Self {
        Self {
            gap_secs,
            windows: HashMap::new(),
            best: RankTable::new(),
        }
    }

    fn extend(&mut self, jid: &Jid, message: &Message) -> (i64, Message) {
        let Some(window) = self.windows.get_mut(jid) else {
            let window = Window::open(message);
            let snapshot = (window.total, window.start.clone());
            self.windows.insert(jid.clone(), window);
            return snapshot;
        };

        let step = message.date.cmp(&window.last_date);
        if step != Ordering::Equal {
            match window.direction {
                None => window.direction = Some(step),
                Some(direction) if direction != step && !window.warned => {
                    tracing::warn!(
                        jid = %jid,
                        date = %message.date,
                        "Messages are not in date order, longest conversation is unreliable"
                    );
                    window.warned = true;
                }
                Some(_) => {}
            }
        }

        let gap = (message.date - window.last_date).num_seconds().abs();
        if gap <= self.gap_secs {
            window.total += gap;
        } else {
            window.start = message.clone();
            window.total = 0;
        }
        window.last_date = message.date;

        (window.total, window.start.clone())
    }
}

impl Accumulator<Message> for LongestConversation {
    fn accumulate(&mut self, jid: &Jid, message: &Message) {
        let (total, start) = self.extend(jid, message);

        let best = self.best.entry_or(jid, || Peak {
            value: total,
            date: start.date,
            source: start.clone(),
        });
        // Strictly larger only: the first window to reach a total keeps it
        if total > best.value {
            *best = Peak {
                value: total,
                date: start.date,
                source: start,
            };
        }
    }

    fn standings(&self) -> Vec<Standing> {
        self.best.standings()
    }

    fn reset(&mut self) {
        self.windows.clear();
        self.best.clear();
    }
}
