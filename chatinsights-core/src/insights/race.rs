//! Chart-race timeline
//!
//! Lays message events out as cumulative per-contact counts over fixed-width
//! time buckets, one [`RaceFrame`] per bucket. Rendering the frames is left to
//! whoever consumes them.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::contacts::ContactRegistry;
use crate::error::{Error, Result};
use crate::insights::engine::ManagerOptions;
use crate::insights::rank::{Podium, RankTable};
use crate::types::{Event, Jid};

/// Chart-race layout options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceOptions {
    /// Width of one bucket
    pub bucket: Duration,
    /// Contacts kept per frame
    pub bars: usize,
    pub group_by_display_name: bool,
    pub include_groups: bool,
}

impl Default for RaceOptions {
    fn default() -> Self {
        Self {
            bucket: Duration::days(7),
            bars: 10,
            group_by_display_name: true,
            include_groups: false,
        }
    }
}

/// One contact's bar in a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaceStanding {
    pub jid: Jid,
    /// Messages exchanged up to the end of the frame
    pub messages: i64,
}

/// Standings at the end of one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaceFrame {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Top contacts, best first
    pub standings: Vec<RaceStanding>,
}

/// Build chart-race frames from `events`.
///
/// Calls are ignored. Messages go through the same exclusion and grouping
/// rules as [`crate::insights::InsighterManager`] and are bucketed by date
/// starting at the earliest one; input order does not matter. Empty buckets
/// still produce a frame, and the trailing partial bucket is included.
pub fn race_frames<'a>(
    events: impl IntoIterator<Item = &'a Event>,
    registry: &ContactRegistry,
    options: &RaceOptions,
) -> Result<Vec<RaceFrame>> {
    if options.bucket <= Duration::zero() {
        return Err(Error::Config("race bucket must be positive".to_string()));
    }

    let routing = ManagerOptions {
        group_by_display_name: options.group_by_display_name,
        include_groups: options.include_groups,
    };

    let mut timeline: Vec<(DateTime<Utc>, Jid)> = Vec::new();
    for event in events {
        let Event::Message(message) = event else {
            continue;
        };
        if let Ok(jid) = routing.route(&message.remote_jid, registry)? {
            timeline.push((message.date, jid));
        }
    }
    timeline.sort_by_key(|(date, _)| *date);

    let Some((first, _)) = timeline.first() else {
        return Ok(Vec::new());
    };

    let mut start = *first;
    let mut end = bucket_end(start, options.bucket)?;
    let mut counts = RankTable::new();
    let mut podium = Podium::new();
    let mut frames = Vec::new();

    let snapshot = |start, end, counts: &RankTable<i64>, podium: &Podium| RaceFrame {
        start,
        end,
        standings: podium
            .top(options.bars)
            .iter()
            .map(|jid| RaceStanding {
                jid: jid.clone(),
                messages: counts.value(jid.as_str()),
            })
            .collect(),
    };

    for (date, jid) in &timeline {
        while *date >= end {
            frames.push(snapshot(start, end, &counts, &podium));
            start = end;
            end = bucket_end(start, options.bucket)?;
        }
        counts.add(jid, 1);
        podium.promote(jid, &counts);
    }
    frames.push(snapshot(start, end, &counts, &podium));

    tracing::debug!(
        messages = timeline.len(),
        frames = frames.len(),
        contacts = counts.len(),
        "Built chart-race frames"
    );

    Ok(frames)
}

fn bucket_end(start: DateTime<Utc>, bucket: Duration) -> Result<DateTime<Utc>> {
    start.checked_add_signed(bucket).ok_or_else(|| {
        Error::Config(format!(
            "race bucket of {} days starting {} ends past the last representable date",
            bucket.num_days(),
            start
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Call, Message};
    use chrono::TimeZone;

    const ANA_OLD: &str = "5511911110000@s.whatsapp.net";
    const ANA_NEW: &str = "5521922220000@s.whatsapp.net";
    const BRUNO: &str = "5531933330000@s.whatsapp.net";
    const FAMILY: &str = "5511911110000-1500000000@g.us";

    fn on_day(remote: &str, day: i64) -> Event {
        Event::Message(Message {
            remote_jid: Jid::from(remote),
            from_me: false,
            key_id: format!("{}-{}", remote, day),
            date: Utc.with_ymd_and_hms(2021, 1, 1, 9, 0, 0).unwrap() + Duration::days(day),
            mime_type: None,
            media_duration: None,
            media_name: None,
            forwarded: false,
            quoted: None,
        })
    }

    fn registry() -> ContactRegistry {
        let mut registry = ContactRegistry::new();
        registry.add_contact(ANA_OLD, Some("Ana".to_string())).unwrap();
        registry.add_contact(ANA_NEW, Some("Ana".to_string())).unwrap();
        registry.add_contact(BRUNO, Some("Bruno".to_string())).unwrap();
        registry
    }

    fn bars(frame: &RaceFrame) -> Vec<(&str, i64)> {
        frame
            .standings
            .iter()
            .map(|s| (s.jid.as_str(), s.messages))
            .collect()
    }

    #[test]
    fn test_frames_accumulate_across_buckets() {
        let events = vec![
            on_day(BRUNO, 0),
            on_day(ANA_NEW, 1),
            on_day(ANA_NEW, 8),
            on_day(BRUNO, 9),
            on_day(BRUNO, 20),
        ];
        let frames = race_frames(&events, &registry(), &RaceOptions::default()).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(bars(&frames[0]), vec![(BRUNO, 1), (ANA_NEW, 1)]);
        assert_eq!(bars(&frames[1]), vec![(ANA_NEW, 2), (BRUNO, 2)]);
        // Trailing partial bucket
        assert_eq!(bars(&frames[2]), vec![(BRUNO, 3), (ANA_NEW, 2)]);
        assert_eq!(frames[1].start, frames[0].end);
    }

    #[test]
    fn test_empty_buckets_repeat_standings() {
        let events = vec![on_day(BRUNO, 0), on_day(BRUNO, 15)];
        let frames = race_frames(&events, &registry(), &RaceOptions::default()).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(bars(&frames[1]), vec![(BRUNO, 1)]);
        assert_eq!(bars(&frames[2]), vec![(BRUNO, 2)]);
    }

    #[test]
    fn test_grouping_exclusion_and_bars() {
        let mut events = vec![
            on_day(ANA_OLD, 2),
            on_day(ANA_NEW, 1),
            on_day(FAMILY, 0),
            on_day("status@broadcast", 0),
            on_day(BRUNO, 3),
        ];
        events.push(Event::Call(Call {
            remote_jid: Jid::from(BRUNO),
            from_me: true,
            date: Utc.with_ymd_and_hms(2021, 1, 2, 0, 0, 0).unwrap(),
            is_video_call: false,
            duration: 60,
            result: None,
        }));

        let options = RaceOptions {
            bars: 1,
            ..RaceOptions::default()
        };
        let frames = race_frames(&events, &registry(), &options).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(bars(&frames[0]), vec![(ANA_NEW, 2)]);
    }

    #[test]
    fn test_no_messages_no_frames() {
        let frames = race_frames(&[], &registry(), &RaceOptions::default()).unwrap();
        assert!(frames.is_empty());

        let zero = RaceOptions {
            bucket: Duration::zero(),
            ..RaceOptions::default()
        };
        assert!(race_frames(&[], &registry(), &zero).is_err());
    }

    #[test]
    fn test_bucket_ending_past_last_date_fails() {
        let config: crate::config::Config =
            toml::from_str("[insights]\nrace_bucket_days = 1000000000").unwrap();
        config.validate().unwrap();
        let options = config.insights.race_options().unwrap();

        let events = vec![on_day(BRUNO, 0)];
        assert!(matches!(
            race_frames(&events, &registry(), &options),
            Err(Error::Config(_))
        ));
    }
}
