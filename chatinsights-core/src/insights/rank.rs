//! Rank tables and ranked output rows.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::types::{Call, Jid, Message};

/// The event a ranked value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackObject {
    Message(Message),
    Call(Call),
}

impl TrackObject {
    pub fn date(&self) -> DateTime<Utc> {
        match self {
            TrackObject::Message(m) => m.date,
            TrackObject::Call(c) => c.date,
        }
    }
}

impl From<Message> for TrackObject {
    fn from(message: Message) -> Self {
        TrackObject::Message(message)
    }
}

impl From<Call> for TrackObject {
    fn from(call: Call) -> Self {
        TrackObject::Call(call)
    }
}

/// Unformatted ranking row produced by an accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub jid: Jid,
    pub value: i64,
    pub track: Option<TrackObject>,
}

impl Standing {
    pub fn new(jid: Jid, value: i64) -> Self {
        Self {
            jid,
            value,
            track: None,
        }
    }

    pub fn tracked(jid: Jid, value: i64, track: impl Into<TrackObject>) -> Self {
        Self {
            jid,
            value,
            track: Some(track.into()),
        }
    }
}

/// Order standings best first.
///
/// Higher values first; equal values put the earlier source event first,
/// then fall back to jid order so the result never depends on the order
/// events arrived in.
pub fn sort_standings(standings: &mut [Standing]) {
    standings.sort_by(|a, b| {
        b.value
            .cmp(&a.value)
            .then_with(|| match (&a.track, &b.track) {
                (Some(x), Some(y)) => x.date().cmp(&y.date()),
                _ => Ordering::Equal,
            })
            .then_with(|| a.jid.cmp(&b.jid))
    });
}

/// Formatted ranking row, as handed to reports and renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub jid: Jid,
    pub value: i64,
    pub formatted_value: String,
    pub track_object: Option<TrackObject>,
}

/// Per-jid accumulated values.
///
/// Entries are created with an explicit default the first time a jid is
/// seen and are only ever combined afterwards, never removed.
#[derive(Debug, Clone, PartialEq)]
pub struct RankTable<V> {
    entries: BTreeMap<Jid, V>,
}

impl<V> Default for RankTable<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> RankTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `jid`, inserting `default()` first if absent.
    pub fn entry_or(&mut self, jid: &Jid, default: impl FnOnce() -> V) -> &mut V {
        self.entries.entry(jid.clone()).or_insert_with(default)
    }

    pub fn get(&self, jid: &str) -> Option<&V> {
        self.entries.get(jid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Jid, &V)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl RankTable<i64> {
    /// Add `amount` to `jid`'s running value, starting from zero.
    pub fn add(&mut self, jid: &Jid, amount: i64) -> i64 {
        let value = self.entry_or(jid, || 0);
        *value += amount;
        *value
    }

    pub fn value(&self, jid: &str) -> i64 {
        self.get(jid).copied().unwrap_or(0)
    }

    pub fn standings(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .iter()
            .map(|(jid, value)| Standing::new(jid.clone(), *value))
            .collect();
        sort_standings(&mut standings);
        standings
    }
}

/// Best value seen for a jid, with the event it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Peak<T> {
    pub value: i64,
    pub date: DateTime<Utc>,
    pub source: T,
}

impl<T> Peak<T> {
    /// Whether this peak should replace `other`: a larger value, or the same
    /// value observed earlier.
    pub fn beats(&self, other: &Peak<T>) -> bool {
        self.value > other.value || (self.value == other.value && self.date < other.date)
    }
}

impl<T: Clone + Into<TrackObject>> RankTable<Peak<T>> {
    /// Keep `candidate` if it beats the current peak for `jid`.
    pub fn offer(&mut self, jid: &Jid, candidate: Peak<T>) -> bool {
        match self.entries.get_mut(jid) {
            Some(current) => {
                if candidate.beats(current) {
                    *current = candidate;
                    true
                } else {
                    false
                }
            }
            None => {
                self.entries.insert(jid.clone(), candidate);
                true
            }
        }
    }

    pub fn standings(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .iter()
            .map(|(jid, peak)| Standing::tracked(jid.clone(), peak.value, peak.source.clone()))
            .collect();
        sort_standings(&mut standings);
        standings
    }
}

/// Incrementally ordered podium over a count table.
///
/// Every time a jid's count grows it is promoted past predecessors with a
/// smaller count, one insertion-sort step at a time. Jids with equal counts
/// keep the order in which they reached that count.
#[derive(Debug, Clone, Default)]
pub struct Podium {
    order: Vec<Jid>,
    positions: HashMap<Jid, usize>,
}

impl Podium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-seat `jid` after its count in `counts` changed.
    pub fn promote(&mut self, jid: &Jid, counts: &RankTable<i64>) {
        let mut pos = match self.positions.get(jid) {
            Some(pos) => *pos,
            None => {
                self.order.push(jid.clone());
                self.positions.insert(jid.clone(), self.order.len() - 1);
                self.order.len() - 1
            }
        };

        let value = counts.value(jid.as_str());
        while pos > 0 && value > counts.value(self.order[pos - 1].as_str()) {
            self.order.swap(pos, pos - 1);
            self.positions.insert(self.order[pos].clone(), pos);
            self.positions.insert(self.order[pos - 1].clone(), pos - 1);
            pos -= 1;
        }
    }

    /// The first `n` jids, best first.
    pub fn top(&self, n: usize) -> &[Jid] {
        &self.order[..n.min(self.order.len())]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Jid> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jid(raw: &str) -> Jid {
        Jid::from(raw)
    }

    fn call(remote: &str, second: u32, duration: i64) -> Call {
        Call {
            remote_jid: jid(remote),
            from_me: false,
            date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, second).unwrap(),
            is_video_call: false,
            duration,
            result: None,
        }
    }

    #[test]
    fn test_count_table() {
        let mut table = RankTable::new();
        assert_eq!(table.add(&jid("a@c.us"), 1), 1);
        assert_eq!(table.add(&jid("a@c.us"), 2), 3);
        assert_eq!(table.add(&jid("b@c.us"), 1), 1);

        assert_eq!(table.value("a@c.us"), 3);
        assert_eq!(table.value("z@c.us"), 0);
        assert_eq!(table.len(), 2);

        let standings = table.standings();
        assert_eq!(standings[0].jid.as_str(), "a@c.us");
        assert_eq!(standings[0].value, 3);
    }

    #[test]
    fn test_count_ties_fall_back_to_jid_order() {
        let mut table = RankTable::new();
        table.add(&jid("b@c.us"), 1);
        table.add(&jid("a@c.us"), 1);

        let order: Vec<_> = table.standings().into_iter().map(|s| s.jid).collect();
        assert_eq!(order, vec![jid("a@c.us"), jid("b@c.us")]);
    }

    #[test]
    fn test_peak_prefers_earlier_on_tie() {
        let mut table: RankTable<Peak<Call>> = RankTable::new();
        let later = call("a@c.us", 30, 60);
        let earlier = call("a@c.us", 10, 60);

        assert!(table.offer(
            &later.remote_jid.clone(),
            Peak {
                value: later.duration,
                date: later.date,
                source: later.clone(),
            }
        ));
        assert!(table.offer(
            &earlier.remote_jid.clone(),
            Peak {
                value: earlier.duration,
                date: earlier.date,
                source: earlier.clone(),
            }
        ));
        // Same value, later date: rejected
        assert!(!table.offer(
            &later.remote_jid.clone(),
            Peak {
                value: later.duration,
                date: later.date,
                source: later.clone(),
            }
        ));

        assert_eq!(table.get("a@c.us").unwrap().source, earlier);
    }

    #[test]
    fn test_standings_ties_prefer_earlier_track() {
        let mut table: RankTable<Peak<Call>> = RankTable::new();
        let late = call("a@c.us", 50, 60);
        let early = call("b@c.us", 5, 60);
        for c in [late, early] {
            table.offer(
                &c.remote_jid.clone(),
                Peak {
                    value: c.duration,
                    date: c.date,
                    source: c,
                },
            );
        }

        let standings = table.standings();
        assert_eq!(standings[0].jid.as_str(), "b@c.us");
        assert!(matches!(standings[0].track, Some(TrackObject::Call(_))));
    }

    #[test]
    fn test_podium_promotes_past_smaller_counts() {
        let mut counts = RankTable::new();
        let mut podium = Podium::new();
        let bump = |counts: &mut RankTable<i64>, podium: &mut Podium, raw: &str| {
            let j = jid(raw);
            counts.add(&j, 1);
            podium.promote(&j, counts);
        };

        bump(&mut counts, &mut podium, "a@c.us");
        bump(&mut counts, &mut podium, "b@c.us");
        bump(&mut counts, &mut podium, "c@c.us");
        // b and c tie with a; insertion order holds
        assert_eq!(podium.top(3), &[jid("a@c.us"), jid("b@c.us"), jid("c@c.us")]);

        bump(&mut counts, &mut podium, "c@c.us");
        assert_eq!(podium.top(3), &[jid("c@c.us"), jid("a@c.us"), jid("b@c.us")]);

        bump(&mut counts, &mut podium, "b@c.us");
        assert_eq!(podium.top(2), &[jid("c@c.us"), jid("b@c.us")]);
        assert_eq!(podium.top(10).len(), 3);
    }
}
