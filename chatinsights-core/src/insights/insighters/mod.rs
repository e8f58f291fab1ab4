//! Insighter catalogue.
//!
//! Every statistic is a variant of a closed set. Message statistics live in
//! [`MessageInsighter`], call statistics in [`CallInsighter`], so routing an
//! event to the insighters that accept it is a static match.
//!
//! | Insighter | Event | Value |
//! |-----------|-------|-------|
//! | `LongestAudio` | message | longest voice note received, seconds |
//! | `GreatestAudioAmount` | message | voice notes received |
//! | `GreatestPhotoAmount` | message | images received |
//! | `GreatestAmountOfDaysTalking` | message | days both sides wrote |
//! | `LongestConversation` | message | longest run of quick replies, seconds |
//! | `GreatestMessagesAmount` | message | messages exchanged |
//! | `TopMessagesAmount` | message | messages exchanged, podium order |
//! | `GreatestMyStatusAnswered` | message | replies to my status posts |
//! | `LongestCall` | call | longest answered call, seconds |
//! | `GreatestCallAmount` | call | answered calls |
//! | `LongestTimeInCalls` | call | total answered call time, seconds |

mod audio;
mod calls;
mod conversation;
mod days_talking;
mod messages;
mod photo;
mod status_replies;

pub use audio::{GreatestAudioAmount, LongestAudio};
pub use calls::{GreatestCallAmount, LongestCall, LongestTimeInCalls};
pub use conversation::LongestConversation;
pub use days_talking::GreatestAmountOfDaysTalking;
pub use messages::{GreatestMessagesAmount, TopMessagesAmount};
pub use photo::GreatestPhotoAmount;
pub use status_replies::GreatestMyStatusAnswered;

use chrono::{FixedOffset, Offset, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::format::ValueFormat;
use crate::insights::rank::{RankEntry, Standing};
use crate::types::{Call, EventKind, Jid, Message};

/// Suffix accepted (and ignored) after an insighter name.
const NAME_SUFFIX: &str = "Insighter";

/// Accumulation rule of one statistic over events of type `E`.
pub trait Accumulator<E> {
    /// Whether `event` takes part in this statistic at all.
    fn is_valid(&self, _event: &E) -> bool {
        true
    }

    /// Fold a valid event into the rank table under `jid`.
    fn accumulate(&mut self, jid: &Jid, event: &E);

    /// Every entry, best first.
    fn standings(&self) -> Vec<Standing>;

    /// The first `n` entries of [`Accumulator::standings`].
    fn podium(&self, n: usize) -> Vec<Standing> {
        let mut standings = self.standings();
        standings.truncate(n);
        standings
    }

    /// Podium size this statistic was built with, if it keeps one.
    fn podium_size(&self) -> Option<usize> {
        None
    }

    /// Drop all accumulated state.
    fn reset(&mut self);
}

/// Names of every insighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum InsighterKind {
    LongestAudio,
    GreatestAudioAmount,
    GreatestPhotoAmount,
    GreatestAmountOfDaysTalking,
    LongestConversation,
    GreatestMessagesAmount,
    TopMessagesAmount,
    GreatestMyStatusAnswered,
    LongestCall,
    GreatestCallAmount,
    LongestTimeInCalls,
}

impl InsighterKind {
    pub const ALL: [InsighterKind; 11] = [
        InsighterKind::LongestAudio,
        InsighterKind::GreatestAudioAmount,
        InsighterKind::GreatestPhotoAmount,
        InsighterKind::GreatestAmountOfDaysTalking,
        InsighterKind::LongestConversation,
        InsighterKind::GreatestMessagesAmount,
        InsighterKind::TopMessagesAmount,
        InsighterKind::GreatestMyStatusAnswered,
        InsighterKind::LongestCall,
        InsighterKind::GreatestCallAmount,
        InsighterKind::LongestTimeInCalls,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InsighterKind::LongestAudio => "LongestAudio",
            InsighterKind::GreatestAudioAmount => "GreatestAudioAmount",
            InsighterKind::GreatestPhotoAmount => "GreatestPhotoAmount",
            InsighterKind::GreatestAmountOfDaysTalking => "GreatestAmountOfDaysTalking",
            InsighterKind::LongestConversation => "LongestConversation",
            InsighterKind::GreatestMessagesAmount => "GreatestMessagesAmount",
            InsighterKind::TopMessagesAmount => "TopMessagesAmount",
            InsighterKind::GreatestMyStatusAnswered => "GreatestMyStatusAnswered",
            InsighterKind::LongestCall => "LongestCall",
            InsighterKind::GreatestCallAmount => "GreatestCallAmount",
            InsighterKind::LongestTimeInCalls => "LongestTimeInCalls",
        }
    }

    /// The event kind this insighter consumes.
    pub fn event_kind(&self) -> EventKind {
        match self {
            InsighterKind::LongestCall
            | InsighterKind::GreatestCallAmount
            | InsighterKind::LongestTimeInCalls => EventKind::Call,
            _ => EventKind::Message,
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            InsighterKind::LongestAudio => "Longest audio message",
            InsighterKind::GreatestAudioAmount => "Most audio messages",
            InsighterKind::GreatestPhotoAmount => "Most photos received",
            InsighterKind::GreatestAmountOfDaysTalking => "Most days talking",
            InsighterKind::LongestConversation => "Longest conversation",
            InsighterKind::GreatestMessagesAmount => "Most messages exchanged",
            InsighterKind::TopMessagesAmount => "Top contacts by messages",
            InsighterKind::GreatestMyStatusAnswered => "Most replies to my status",
            InsighterKind::LongestCall => "Longest call",
            InsighterKind::GreatestCallAmount => "Most calls",
            InsighterKind::LongestTimeInCalls => "Most time in calls",
        }
    }

    pub fn default_format(&self) -> ValueFormat {
        match self {
            InsighterKind::LongestAudio => ValueFormat::duration("{value}", "ms", false),
            InsighterKind::GreatestAudioAmount => ValueFormat::count("{value} audios"),
            InsighterKind::GreatestPhotoAmount => ValueFormat::count("{value} photos"),
            InsighterKind::GreatestAmountOfDaysTalking => ValueFormat::count("{value} days"),
            InsighterKind::LongestConversation => ValueFormat::duration("{value}", "hm", true),
            InsighterKind::GreatestMessagesAmount | InsighterKind::TopMessagesAmount => {
                ValueFormat::count("{value} messages")
            }
            InsighterKind::GreatestMyStatusAnswered => ValueFormat::count("{value} replies"),
            InsighterKind::LongestCall => ValueFormat::duration("{value}", "hms", false),
            InsighterKind::GreatestCallAmount => ValueFormat::count("{value} calls"),
            InsighterKind::LongestTimeInCalls => ValueFormat::duration("{value}", "dhm", true),
        }
    }

    /// Build a fresh insighter of this kind with default labels.
    pub fn build(&self, settings: &InsighterSettings) -> Insighter {
        let state: Built = match self {
            InsighterKind::LongestAudio => {
                MessageInsighter::LongestAudio(LongestAudio::new(settings.check_media_name)).into()
            }
            InsighterKind::GreatestAudioAmount => MessageInsighter::GreatestAudioAmount(
                GreatestAudioAmount::new(settings.check_media_name),
            )
            .into(),
            InsighterKind::GreatestPhotoAmount => {
                MessageInsighter::GreatestPhotoAmount(GreatestPhotoAmount::default()).into()
            }
            InsighterKind::GreatestAmountOfDaysTalking => {
                MessageInsighter::GreatestAmountOfDaysTalking(GreatestAmountOfDaysTalking::new(
                    settings.utc_offset,
                ))
                .into()
            }
            InsighterKind::LongestConversation => MessageInsighter::LongestConversation(
                LongestConversation::new(settings.conversation_gap_secs),
            )
            .into(),
            InsighterKind::GreatestMessagesAmount => {
                MessageInsighter::GreatestMessagesAmount(GreatestMessagesAmount::default()).into()
            }
            InsighterKind::TopMessagesAmount => {
                MessageInsighter::TopMessagesAmount(TopMessagesAmount::new(settings.top_count))
                    .into()
            }
            InsighterKind::GreatestMyStatusAnswered => {
                MessageInsighter::GreatestMyStatusAnswered(GreatestMyStatusAnswered::default())
                    .into()
            }
            InsighterKind::LongestCall => CallInsighter::LongestCall(LongestCall::default()).into(),
            InsighterKind::GreatestCallAmount => {
                CallInsighter::GreatestCallAmount(GreatestCallAmount::default()).into()
            }
            InsighterKind::LongestTimeInCalls => {
                CallInsighter::LongestTimeInCalls(LongestTimeInCalls::default()).into()
            }
        };

        match state {
            Built::Message(accumulator) => Insighter::Message(Insight::new(*self, accumulator)),
            Built::Call(accumulator) => Insighter::Call(Insight::new(*self, accumulator)),
        }
    }
}

impl fmt::Display for InsighterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InsighterKind {
    type Err = Error;

    /// Accepts both `LongestAudio` and `LongestAudioInsighter`.
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        let name = name.strip_suffix(NAME_SUFFIX).unwrap_or(name);
        InsighterKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| Error::Config(format!("unknown insighter: {}", s)))
    }
}

/// Knobs shared by the insighters that need them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsighterSettings {
    /// Podium size of `TopMessagesAmount`
    pub top_count: usize,
    /// Longest gap, in seconds, that keeps a conversation going
    pub conversation_gap_secs: i64,
    /// Require voice notes to carry a `.opus` file name
    pub check_media_name: bool,
    /// Offset used to cut calendar days
    pub utc_offset: FixedOffset,
}

impl Default for InsighterSettings {
    fn default() -> Self {
        Self {
            top_count: 3,
            conversation_gap_secs: 60,
            check_media_name: true,
            utc_offset: Utc.fix(),
        }
    }
}

// ============================================
// Kind-specific dispatch
// ============================================

/// Insighters that consume messages.
#[derive(Debug, Clone)]
pub enum MessageInsighter {
    LongestAudio(LongestAudio),
    GreatestAudioAmount(GreatestAudioAmount),
    GreatestPhotoAmount(GreatestPhotoAmount),
    GreatestAmountOfDaysTalking(GreatestAmountOfDaysTalking),
    LongestConversation(LongestConversation),
    GreatestMessagesAmount(GreatestMessagesAmount),
    TopMessagesAmount(TopMessagesAmount),
    GreatestMyStatusAnswered(GreatestMyStatusAnswered),
}

macro_rules! dispatch_message {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            MessageInsighter::LongestAudio($inner) => $body,
            MessageInsighter::GreatestAudioAmount($inner) => $body,
            MessageInsighter::GreatestPhotoAmount($inner) => $body,
            MessageInsighter::GreatestAmountOfDaysTalking($inner) => $body,
            MessageInsighter::LongestConversation($inner) => $body,
            MessageInsighter::GreatestMessagesAmount($inner) => $body,
            MessageInsighter::TopMessagesAmount($inner) => $body,
            MessageInsighter::GreatestMyStatusAnswered($inner) => $body,
        }
    };
}

impl Accumulator<Message> for MessageInsighter {
    fn is_valid(&self, message: &Message) -> bool {
        dispatch_message!(self, inner => inner.is_valid(message))
    }

    fn accumulate(&mut self, jid: &Jid, message: &Message) {
        dispatch_message!(self, inner => inner.accumulate(jid, message))
    }

    fn standings(&self) -> Vec<Standing> {
        dispatch_message!(self, inner => inner.standings())
    }

    fn podium(&self, n: usize) -> Vec<Standing> {
        dispatch_message!(self, inner => inner.podium(n))
    }

    fn podium_size(&self) -> Option<usize> {
        dispatch_message!(self, inner => inner.podium_size())
    }

    fn reset(&mut self) {
        dispatch_message!(self, inner => inner.reset())
    }
}

/// Insighters that consume calls.
#[derive(Debug, Clone)]
pub enum CallInsighter {
    LongestCall(LongestCall),
    GreatestCallAmount(GreatestCallAmount),
    LongestTimeInCalls(LongestTimeInCalls),
}

impl Accumulator<Call> for CallInsighter {
    fn is_valid(&self, call: &Call) -> bool {
        match self {
            CallInsighter::LongestCall(inner) => inner.is_valid(call),
            CallInsighter::GreatestCallAmount(inner) => inner.is_valid(call),
            CallInsighter::LongestTimeInCalls(inner) => inner.is_valid(call),
        }
    }

    fn accumulate(&mut self, jid: &Jid, call: &Call) {
        match self {
            CallInsighter::LongestCall(inner) => inner.accumulate(jid, call),
            CallInsighter::GreatestCallAmount(inner) => inner.accumulate(jid, call),
            CallInsighter::LongestTimeInCalls(inner) => inner.accumulate(jid, call),
        }
    }

    fn standings(&self) -> Vec<Standing> {
        match self {
            CallInsighter::LongestCall(inner) => inner.standings(),
            CallInsighter::GreatestCallAmount(inner) => inner.standings(),
            CallInsighter::LongestTimeInCalls(inner) => inner.standings(),
        }
    }

    fn reset(&mut self) {
        match self {
            CallInsighter::LongestCall(inner) => inner.reset(),
            CallInsighter::GreatestCallAmount(inner) => inner.reset(),
            CallInsighter::LongestTimeInCalls(inner) => inner.reset(),
        }
    }
}

enum Built {
    Message(MessageInsighter),
    Call(CallInsighter),
}

impl From<MessageInsighter> for Built {
    fn from(inner: MessageInsighter) -> Self {
        Built::Message(inner)
    }
}

impl From<CallInsighter> for Built {
    fn from(inner: CallInsighter) -> Self {
        Built::Call(inner)
    }
}

// ============================================
// Labeled insight
// ============================================

/// A statistic together with the labels used to present it.
#[derive(Debug, Clone)]
pub struct Insight<A> {
    kind: InsighterKind,
    title: String,
    format: ValueFormat,
    accumulator: A,
}

impl<A> Insight<A> {
    pub fn new(kind: InsighterKind, accumulator: A) -> Self {
        Self {
            kind,
            title: kind.default_title().to_string(),
            format: kind.default_format(),
            accumulator,
        }
    }

    pub fn kind(&self) -> InsighterKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn format(&self) -> &ValueFormat {
        &self.format
    }

    pub fn accumulator(&self) -> &A {
        &self.accumulator
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Replace the template, keeping the value style.
    pub fn set_template(&mut self, template: impl Into<String>) {
        self.format = self.format.clone().with_template(template);
    }

    fn entry(&self, standing: Standing) -> RankEntry {
        RankEntry {
            formatted_value: self.format.render(standing.value),
            jid: standing.jid,
            value: standing.value,
            track_object: standing.track,
        }
    }

    /// Validate then accumulate. Returns whether the event counted.
    pub fn update<E>(&mut self, jid: &Jid, event: &E) -> bool
    where
        A: Accumulator<E>,
    {
        if !self.accumulator.is_valid(event) {
            return false;
        }
        self.accumulator.accumulate(jid, event);
        true
    }

    /// Highest ranked entry, or `None` when nothing matched.
    pub fn winner<E>(&self) -> Option<RankEntry>
    where
        A: Accumulator<E>,
    {
        self.podium::<E>(1).into_iter().next()
    }

    pub fn ranked_list<E>(&self) -> Vec<RankEntry>
    where
        A: Accumulator<E>,
    {
        self.accumulator
            .standings()
            .into_iter()
            .map(|s| self.entry(s))
            .collect()
    }

    pub fn podium<E>(&self, n: usize) -> Vec<RankEntry>
    where
        A: Accumulator<E>,
    {
        self.accumulator
            .podium(n)
            .into_iter()
            .map(|s| self.entry(s))
            .collect()
    }

    pub fn reset<E>(&mut self)
    where
        A: Accumulator<E>,
    {
        self.accumulator.reset();
    }
}

/// An insighter of either event kind.
#[derive(Debug, Clone)]
pub enum Insighter {
    Message(Insight<MessageInsighter>),
    Call(Insight<CallInsighter>),
}

impl Insighter {
    pub fn kind(&self) -> InsighterKind {
        match self {
            Insighter::Message(insight) => insight.kind(),
            Insighter::Call(insight) => insight.kind(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Insighter::Message(insight) => insight.title(),
            Insighter::Call(insight) => insight.title(),
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        match self {
            Insighter::Message(insight) => insight.set_title(title),
            Insighter::Call(insight) => insight.set_title(title),
        }
    }

    pub fn set_template(&mut self, template: impl Into<String>) {
        match self {
            Insighter::Message(insight) => insight.set_template(template),
            Insighter::Call(insight) => insight.set_template(template),
        }
    }

    pub fn winner(&self) -> Option<RankEntry> {
        match self {
            Insighter::Message(insight) => insight.winner::<Message>(),
            Insighter::Call(insight) => insight.winner::<Call>(),
        }
    }

    pub fn ranked_list(&self) -> Vec<RankEntry> {
        match self {
            Insighter::Message(insight) => insight.ranked_list::<Message>(),
            Insighter::Call(insight) => insight.ranked_list::<Call>(),
        }
    }

    pub fn podium(&self, n: usize) -> Vec<RankEntry> {
        match self {
            Insighter::Message(insight) => insight.podium::<Message>(n),
            Insighter::Call(insight) => insight.podium::<Call>(n),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Insighter::Message(insight) => insight.reset::<Message>(),
            Insighter::Call(insight) => insight.reset::<Call>(),
        }
    }
}
