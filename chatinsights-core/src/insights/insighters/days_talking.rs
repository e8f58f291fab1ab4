//! Days on which both sides of a chat wrote something.

use chrono::{FixedOffset, NaiveDate};
use std::collections::HashMap;

use super::Accumulator;
use crate::insights::rank::{RankTable, Standing};
use crate::types::{Jid, Message};

const THEY_SENT: u8 = 0b10;
const I_SENT: u8 = 0b01;
const BOTH_SENT: u8 = THEY_SENT | I_SENT;

/// Number of calendar days on which both I and the contact sent a message.
///
/// Each (contact, day) pair carries a 2-bit flag. The day counts once, when
/// the flag first becomes `0b11`. Days are cut in `offset`.
#[derive(Debug, Clone)]
pub struct GreatestAmountOfDaysTalking {
    offset: FixedOffset,
    flags: HashMap<(Jid, NaiveDate), u8>,
    days: RankTable<i64>,
}

impl GreatestAmountOfDaysTalking {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            flags: HashMap::new(),
            days: RankTable::new(),
        }
    }
}

impl Accumulator<Message> for GreatestAmountOfDaysTalking {
    fn accumulate(&mut self, jid: &Jid, message: &Message) {
        let day = message.date.with_timezone(&self.offset).date_naive();
        let side = if message.from_me { I_SENT } else { THEY_SENT };

        // Contacts show up with zero days until both sides write on one day
        let days = self.days.entry_or(jid, || 0);

        let flag = self.flags.entry((jid.clone(), day)).or_insert(0);
        if *flag == BOTH_SENT {
            return;
        }
        *flag |= side;
        if *flag == BOTH_SENT {
            *days += 1;
        }
    }

    fn standings(&self) -> Vec<Standing> {
        self.days.standings()
    }

    fn reset(&mut self) {
        self.flags.clear();
        self.days.clear();
    }
}
