//! JSON rank document consumed by downstream renderers.
//!
//! ```json
//! {
//!   "LongestCall": {
//!     "title": "Longest call",
//!     "rank": [
//!       {
//!         "jid": "5531933330000@s.whatsapp.net",
//!         "contact_name": "Bruno",
//!         "value": 300,
//!         "formatted_value": "5m",
//!         "date": "01 Feb 2023 20:10:00"
//!       }
//!     ]
//!   }
//! }
//! ```

use serde::Serialize;
use serde_json::{Map, Value};

use crate::contacts::ContactRegistry;
use crate::error::Result;
use crate::format::format_rank_date;
use crate::insights::rank::RankEntry;
use crate::insights::InsightReport;
use crate::types::Jid;

/// One row of a rank list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankRow {
    pub jid: Jid,
    pub contact_name: Option<String>,
    pub value: i64,
    pub formatted_value: String,
    /// Date of the source event, when the statistic tracks one
    pub date: Option<String>,
}

impl RankRow {
    pub fn new(entry: &RankEntry, registry: &ContactRegistry) -> Self {
        Self {
            jid: entry.jid.clone(),
            contact_name: registry
                .get(entry.jid.as_str())
                .and_then(|c| c.display_name.clone()),
            value: entry.value,
            formatted_value: entry.formatted_value.clone(),
            date: entry.track_object.as_ref().map(|t| format_rank_date(t.date())),
        }
    }
}

/// Rank list of one insighter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankSection {
    pub title: String,
    pub rank: Vec<RankRow>,
}

/// Build the rank document: insighter name to title and full ranking.
pub fn rank_document(reports: &[InsightReport], registry: &ContactRegistry) -> Result<Value> {
    let mut document = Map::new();
    for report in reports {
        let section = RankSection {
            title: report.title.clone(),
            rank: report
                .ranking
                .iter()
                .map(|entry| RankRow::new(entry, registry))
                .collect(),
        };
        document.insert(report.key.name().to_string(), serde_json::to_value(section)?);
    }
    Ok(Value::Object(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::insighters::{InsighterKind, InsighterSettings};
    use crate::insights::{InsighterManager, ManagerOptions};
    use crate::types::{Call, Event};
    use chrono::{TimeZone, Utc};

    const BRUNO: &str = "5531933330000@s.whatsapp.net";
    const CARLA: &str = "5541944440000@s.whatsapp.net";

    #[test]
    fn test_rank_document_shape() {
        let mut registry = ContactRegistry::new();
        registry.add_contact(BRUNO, Some("Bruno".to_string())).unwrap();

        let calls: Vec<Event> = [(BRUNO, 10, 300), (CARLA, 20, 90)]
            .into_iter()
            .map(|(jid, minute, duration)| {
                Event::Call(Call {
                    remote_jid: Jid::from(jid),
                    from_me: false,
                    date: Utc.with_ymd_and_hms(2023, 2, 1, 20, minute, 0).unwrap(),
                    is_video_call: false,
                    duration,
                    result: None,
                })
            })
            .collect();

        let mut manager = InsighterManager::new(ManagerOptions::default());
        let settings = InsighterSettings::default();
        manager.register_kind(InsighterKind::LongestCall, &settings);
        manager.register_kind(InsighterKind::GreatestCallAmount, &settings);
        manager.run(&calls, &registry).unwrap();

        let document = rank_document(&manager.reports(), &registry).unwrap();

        let longest = &document["LongestCall"];
        assert_eq!(longest["title"], "Longest call");
        assert_eq!(longest["rank"][0]["jid"], BRUNO);
        assert_eq!(longest["rank"][0]["contact_name"], "Bruno");
        assert_eq!(longest["rank"][0]["value"], 300);
        assert_eq!(longest["rank"][0]["formatted_value"], "5m");
        assert_eq!(longest["rank"][0]["date"], "01 Feb 2023 20:10:00");
        // Unknown contact
        assert!(longest["rank"][1]["contact_name"].is_null());

        // Counts carry no source event
        let amount = &document["GreatestCallAmount"];
        assert_eq!(amount["rank"].as_array().unwrap().len(), 2);
        assert!(amount["rank"][0]["date"].is_null());
    }
}
