//! Insighter manager
//!
//! Single entry point events are pushed through. For each event the manager
//! checks the chat jid, drops broadcast lists (and group chats unless asked
//! to keep them), resolves the jid to its canonical identity when grouping by
//! display name, and hands the event to every insighter of its kind.
//!
//! ```text
//! Event ──► jid kind ──► resolve_identity ──┬──► message insighters
//!           (drop broadcast/groups)         └──► call insighters
//! ```
//!
//! The manager does not sort. `LongestConversation` needs date-ordered input;
//! see [`crate::types::sort_chronologically`].
//!
//! ## Usage
//!
//! ```rust
//! use chatinsights_core::contacts::ContactRegistry;
//! use chatinsights_core::insights::{InsighterKind, InsighterManager, ManagerOptions};
//! use chatinsights_core::insights::insighters::InsighterSettings;
//!
//! let mut manager = InsighterManager::new(ManagerOptions::default());
//! manager.register_kind(InsighterKind::GreatestMessagesAmount, &InsighterSettings::default());
//!
//! let registry = ContactRegistry::new();
//! let events: Vec<chatinsights_core::Event> = Vec::new();
//! let summary = manager.run(&events, &registry).unwrap();
//! assert_eq!(summary.events, 0);
//! assert!(manager.reports()[0].winner.is_none());
//! ```

use serde::Serialize;

use crate::config::Config;
use crate::contacts::{resolve_identity, ContactRegistry};
use crate::error::Result;
use crate::insights::insighters::{
    Accumulator, CallInsighter, Insight, Insighter, InsighterKind, InsighterSettings,
    MessageInsighter,
};
use crate::insights::InsightReport;
use crate::types::{Call, Event, Jid, JidKind, Message};

/// How the manager treats chat jids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Aggregate contacts sharing a display name under one jid
    pub group_by_display_name: bool,
    /// Feed group chats to the insighters
    pub include_groups: bool,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            group_by_display_name: true,
            include_groups: false,
        }
    }
}

impl ManagerOptions {
    /// The jid an event is aggregated under, or why it is skipped.
    ///
    /// Fails with [`crate::Error::Identity`] for a malformed jid.
    pub fn route(
        &self,
        jid: &Jid,
        registry: &ContactRegistry,
    ) -> Result<std::result::Result<Jid, SkipReason>> {
        match jid.kind()? {
            JidKind::Broadcast => return Ok(Err(SkipReason::Broadcast)),
            JidKind::Group if !self.include_groups => return Ok(Err(SkipReason::Group)),
            _ => {}
        }

        if self.group_by_display_name {
            Ok(Ok(resolve_identity(jid, registry)))
        } else {
            Ok(Ok(jid.clone()))
        }
    }
}

/// Why an event never reached the insighters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Broadcast,
    Group,
}

/// Outcome of [`InsighterManager::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Routed under `jid`; `accepted` insighters found it valid
    Dispatched { jid: Jid, accepted: usize },
    Skipped(SkipReason),
}

/// Counters for one [`InsighterManager::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub events: usize,
    pub messages: usize,
    pub calls: usize,
    pub dispatched: usize,
    /// Dispatched under a different jid than the event carried
    pub regrouped: usize,
    pub skipped_broadcast: usize,
    pub skipped_group: usize,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Message(usize),
    Call(usize),
}

/// Routes events to registered insighters.
#[derive(Debug, Clone, Default)]
pub struct InsighterManager {
    options: ManagerOptions,
    messages: Vec<Insight<MessageInsighter>>,
    calls: Vec<Insight<CallInsighter>>,
    /// Registration order, used for reports
    order: Vec<Slot>,
}

impl InsighterManager {
    /// Create a manager with no insighters.
    pub fn new(options: ManagerOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Build the manager described by `config`, labels applied.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let settings = config.insights.insighter_settings()?;
        let mut manager = Self::new(config.insights.manager_options());

        for kind in config.insights.insighter_kinds()? {
            let mut insighter = kind.build(&settings);
            if let Some(label) = config.label_for(kind) {
                if let Some(title) = &label.title {
                    insighter.set_title(title.clone());
                }
                if let Some(format) = &label.format {
                    insighter.set_template(format.clone());
                }
            }
            manager.register(insighter);
        }
        Ok(manager)
    }

    pub fn options(&self) -> ManagerOptions {
        self.options
    }

    /// Register an insighter. Reports follow registration order.
    pub fn register(&mut self, insighter: Insighter) {
        tracing::info!(
            insighter = insighter.kind().name(),
            event_kind = insighter.kind().event_kind().as_str(),
            "Registered insighter"
        );
        match insighter {
            Insighter::Message(insight) => {
                self.order.push(Slot::Message(self.messages.len()));
                self.messages.push(insight);
            }
            Insighter::Call(insight) => {
                self.order.push(Slot::Call(self.calls.len()));
                self.calls.push(insight);
            }
        }
    }

    /// Register a freshly built insighter of `kind` with default labels.
    pub fn register_kind(&mut self, kind: InsighterKind, settings: &InsighterSettings) {
        self.register(kind.build(settings));
    }

    /// Names of registered insighters, in report order.
    pub fn kinds(&self) -> Vec<InsighterKind> {
        self.order
            .iter()
            .map(|slot| match slot {
                Slot::Message(i) => self.messages[*i].kind(),
                Slot::Call(i) => self.calls[*i].kind(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Push one event through every insighter of its kind.
    ///
    /// Insighters are not reset: feeding the same events twice counts them
    /// twice. Use [`InsighterManager::run`] for a complete pass.
    pub fn update(&mut self, event: &Event, registry: &ContactRegistry) -> Result<Dispatch> {
        let jid = match self.options.route(event.remote_jid(), registry)? {
            Ok(jid) => jid,
            Err(reason) => {
                tracing::trace!(
                    jid = %event.remote_jid(),
                    kind = event.kind().as_str(),
                    reason = ?reason,
                    "Skipped event"
                );
                return Ok(Dispatch::Skipped(reason));
            }
        };

        let accepted = match event {
            Event::Message(message) => dispatch(&mut self.messages, &jid, message),
            Event::Call(call) => dispatch(&mut self.calls, &jid, call),
        };

        Ok(Dispatch::Dispatched { jid, accepted })
    }

    /// Reset every insighter, then feed `events` in order.
    ///
    /// Running twice over the same events yields the same reports.
    pub fn run<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a Event>,
        registry: &ContactRegistry,
    ) -> Result<RunSummary> {
        self.reset();

        let mut summary = RunSummary::default();
        for event in events {
            summary.events += 1;
            match event {
                Event::Message(_) => summary.messages += 1,
                Event::Call(_) => summary.calls += 1,
            }

            match self.update(event, registry)? {
                Dispatch::Dispatched { jid, .. } => {
                    summary.dispatched += 1;
                    if &jid != event.remote_jid() {
                        summary.regrouped += 1;
                    }
                }
                Dispatch::Skipped(SkipReason::Broadcast) => summary.skipped_broadcast += 1,
                Dispatch::Skipped(SkipReason::Group) => summary.skipped_group += 1,
            }
        }

        tracing::info!(
            events = summary.events,
            dispatched = summary.dispatched,
            regrouped = summary.regrouped,
            skipped_broadcast = summary.skipped_broadcast,
            skipped_group = summary.skipped_group,
            insighters = self.order.len(),
            "Insight run completed"
        );

        Ok(summary)
    }

    /// Clear the state of every insighter.
    pub fn reset(&mut self) {
        for insight in &mut self.messages {
            insight.reset::<Message>();
        }
        for insight in &mut self.calls {
            insight.reset::<Call>();
        }
    }

    fn report_for(&self, slot: Slot) -> InsightReport {
        match slot {
            Slot::Message(i) => InsightReport::from_insight::<_, Message>(&self.messages[i]),
            Slot::Call(i) => InsightReport::from_insight::<_, Call>(&self.calls[i]),
        }
    }

    /// One report per registered insighter, in registration order.
    pub fn reports(&self) -> Vec<InsightReport> {
        self.order.iter().map(|slot| self.report_for(*slot)).collect()
    }

    /// Report of the first registered insighter of `kind`.
    pub fn report(&self, kind: InsighterKind) -> Option<InsightReport> {
        self.order
            .iter()
            .copied()
            .find(|slot| match slot {
                Slot::Message(i) => self.messages[*i].kind() == kind,
                Slot::Call(i) => self.calls[*i].kind() == kind,
            })
            .map(|slot| self.report_for(slot))
    }
}

fn dispatch<A, E>(insights: &mut [Insight<A>], jid: &Jid, event: &E) -> usize
where
    A: Accumulator<E>,
{
    let mut accepted = 0;
    for insight in insights.iter_mut() {
        if insight.update(jid, event) {
            accepted += 1;
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::{TimeZone, Utc};

    const ANA_OLD: &str = "5511911110000@s.whatsapp.net";
    const ANA_NEW: &str = "5521922220000@s.whatsapp.net";
    const BRUNO: &str = "5531933330000@s.whatsapp.net";
    const FAMILY: &str = "5511911110000-1500000000@g.us";

    fn message(remote: &str, from_me: bool, second: i64) -> Event {
        Event::Message(Message {
            remote_jid: Jid::from(remote),
            from_me,
            key_id: format!("k{}", second),
            date: Utc.timestamp_opt(1_650_000_000 + second, 0).unwrap(),
            mime_type: None,
            media_duration: None,
            media_name: None,
            forwarded: false,
            quoted: None,
        })
    }

    fn call(remote: &str, duration: i64) -> Event {
        Event::Call(Call {
            remote_jid: Jid::from(remote),
            from_me: true,
            date: Utc.with_ymd_and_hms(2022, 6, 1, 10, 0, 0).unwrap(),
            is_video_call: false,
            duration,
            result: None,
        })
    }

    fn registry() -> ContactRegistry {
        let mut registry = ContactRegistry::new();
        registry.add_contact(ANA_OLD, Some("Ana".to_string())).unwrap();
        registry.add_contact(ANA_NEW, Some("Ana".to_string())).unwrap();
        registry.add_contact(BRUNO, Some("Bruno".to_string())).unwrap();
        registry.add_contact(FAMILY, Some("Family".to_string())).unwrap();
        registry
    }

    fn build_manager(options: ManagerOptions) -> InsighterManager {
        let mut manager = InsighterManager::new(options);
        let settings = InsighterSettings::default();
        manager.register_kind(InsighterKind::GreatestMessagesAmount, &settings);
        manager.register_kind(InsighterKind::GreatestCallAmount, &settings);
        manager
    }

    fn ranking(manager: &InsighterManager, kind: InsighterKind) -> Vec<(String, i64)> {
        manager
            .report(kind)
            .unwrap()
            .ranking
            .into_iter()
            .map(|e| (e.jid.to_string(), e.value))
            .collect()
    }

    #[test]
    fn test_routes_by_event_kind() {
        let mut manager = build_manager(ManagerOptions::default());
        let registry = registry();

        let dispatch = manager.update(&message(BRUNO, false, 0), &registry).unwrap();
        assert_eq!(
            dispatch,
            Dispatch::Dispatched {
                jid: Jid::from(BRUNO),
                accepted: 1
            }
        );

        // Unanswered calls reach the call insighter but are not valid
        let dispatch = manager.update(&call(BRUNO, 0), &registry).unwrap();
        assert_eq!(
            dispatch,
            Dispatch::Dispatched {
                jid: Jid::from(BRUNO),
                accepted: 0
            }
        );
        assert!(manager.report(InsighterKind::GreatestCallAmount).unwrap().winner.is_none());
    }

    #[test]
    fn test_grouping_by_display_name() {
        let mut manager = build_manager(ManagerOptions::default());
        let registry = registry();
        let events = vec![
            message(ANA_OLD, false, 0),
            message(ANA_NEW, true, 1),
            message(ANA_OLD, false, 2),
            message(BRUNO, false, 3),
        ];

        let summary = manager.run(&events, &registry).unwrap();
        assert_eq!(summary.dispatched, 4);
        assert_eq!(summary.regrouped, 2);
        assert_eq!(
            ranking(&manager, InsighterKind::GreatestMessagesAmount),
            vec![(ANA_NEW.to_string(), 3), (BRUNO.to_string(), 1)]
        );

        let mut ungrouped = manager_with_grouping(false);
        ungrouped.run(&events, &registry).unwrap();
        assert_eq!(
            ranking(&ungrouped, InsighterKind::GreatestMessagesAmount),
            vec![
                (ANA_OLD.to_string(), 2),
                (ANA_NEW.to_string(), 1),
                (BRUNO.to_string(), 1)
            ]
        );
    }

    fn manager_with_grouping(group_by_display_name: bool) -> InsighterManager {
        build_manager(ManagerOptions {
            group_by_display_name,
            include_groups: false,
        })
    }

    #[test]
    fn test_groups_and_broadcasts_are_excluded() {
        let registry = registry();
        let events = vec![
            message(FAMILY, false, 0),
            message("status@broadcast", false, 1),
            message(BRUNO, false, 2),
        ];

        let mut manager = build_manager(ManagerOptions::default());
        let summary = manager.run(&events, &registry).unwrap();
        assert_eq!(summary.skipped_group, 1);
        assert_eq!(summary.skipped_broadcast, 1);
        assert_eq!(
            ranking(&manager, InsighterKind::GreatestMessagesAmount),
            vec![(BRUNO.to_string(), 1)]
        );

        let mut with_groups = build_manager(ManagerOptions {
            group_by_display_name: true,
            include_groups: true,
        });
        let summary = with_groups.run(&events, &registry).unwrap();
        assert_eq!(summary.skipped_group, 0);
        assert_eq!(summary.skipped_broadcast, 1);
        assert_eq!(
            ranking(&with_groups, InsighterKind::GreatestMessagesAmount),
            vec![(FAMILY.to_string(), 1), (BRUNO.to_string(), 1)]
        );
    }

    #[test]
    fn test_malformed_jid_fails_fast() {
        let mut manager = build_manager(ManagerOptions::default());
        let result = manager.update(&message("not-a-jid", false, 0), &registry());
        assert!(matches!(result, Err(Error::Identity(_))));
    }

    #[test]
    fn test_run_resets_between_passes() {
        let mut manager = build_manager(ManagerOptions::default());
        let registry = registry();
        let events = vec![message(BRUNO, false, 0), call(BRUNO, 30)];

        manager.run(&events, &registry).unwrap();
        let first = manager.reports();
        manager.run(&events, &registry).unwrap();
        assert_eq!(manager.reports(), first);

        // A bare update on top of a finished run counts again
        manager.update(&events[0], &registry).unwrap();
        assert_eq!(
            ranking(&manager, InsighterKind::GreatestMessagesAmount),
            vec![(BRUNO.to_string(), 2)]
        );
    }

    #[test]
    fn test_reports_follow_registration_order() {
        let mut manager = InsighterManager::new(ManagerOptions::default());
        let settings = InsighterSettings::default();
        for kind in [
            InsighterKind::LongestCall,
            InsighterKind::LongestAudio,
            InsighterKind::GreatestCallAmount,
        ] {
            manager.register_kind(kind, &settings);
        }

        let keys: Vec<_> = manager.reports().into_iter().map(|r| r.key).collect();
        assert_eq!(
            keys,
            vec![
                InsighterKind::LongestCall,
                InsighterKind::LongestAudio,
                InsighterKind::GreatestCallAmount
            ]
        );
        assert_eq!(manager.kinds(), keys);
    }

    #[test]
    fn test_from_config_applies_labels() {
        let config: Config = toml::from_str(
            r#"
[insights]
insighters = ["GreatestCallAmount"]
group_by_display_name = false

[labels.GreatestCallAmountInsighter]
title = "Mais ligações"
format = "{value} ligações"
"#,
        )
        .unwrap();

        let mut manager = InsighterManager::from_config(&config).unwrap();
        assert!(!manager.options().group_by_display_name);
        manager.run(&[call(BRUNO, 12)], &registry()).unwrap();

        let report = manager.report(InsighterKind::GreatestCallAmount).unwrap();
        assert_eq!(report.title, "Mais ligações");
        assert_eq!(report.winner.unwrap().formatted_value, "1 ligações");
    }
}
