//! Call log statistics. Only answered calls count.

use super::Accumulator;
use crate::insights::rank::{Peak, RankTable, Standing};
use crate::types::{Call, Jid};

/// Longest answered call with each contact.
#[derive(Debug, Clone, Default)]
pub struct LongestCall {
    peaks: RankTable<Peak<Call>>,
}

impl Accumulator<Call> for LongestCall {
    fn is_valid(&self, call: &Call) -> bool {
        call.is_answered()
    }

    fn accumulate(&mut self, jid: &Jid, call: &Call) {
        self.peaks.offer(
            jid,
            Peak {
                value: call.duration,
                date: call.date,
                source: call.clone(),
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

/// Answered calls with each contact.
#[derive(Debug, Clone, Default)]
pub struct GreatestCallAmount {
    counts: RankTable<i64>,
}

impl Accumulator<Call> for GreatestCallAmount {
    fn is_valid(&self, call: &Call) -> bool {
        call.is_answered()
    }

    fn accumulate(&mut self, jid: &Jid, _call: &Call) {
        self.counts.add(jid, 1);
    }

    fn standings(&self) -> Vec<Standing> {
        self.counts.standings()
    }

    fn reset(&mut self) {
        self.counts.clear();
    }
}

/// Total answered call time with each contact, in seconds.
#[derive(Debug, Clone, Default)]
pub struct LongestTimeInCalls {
    totals: RankTable<i64>,
}

impl Accumulator<Call> for LongestTimeInCalls {
    fn is_valid(&self, call: &Call) -> bool {
        call.is_answered()
    }

    fn accumulate(&mut self, jid: &Jid, call: &Call) {
        self.totals.add(jid, call.duration);
    }

    fn standings(&self) -> Vec<Standing> {
        self.totals.standings()
    }

    fn reset(&mut self) {
        self.totals.clear();
    }
}
