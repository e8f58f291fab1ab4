//! Value formatting shared by reports and exports.

use chrono::{DateTime, Utc};

/// Date format used for source events in rank files and summaries.
pub const RANK_DATE_FORMAT: &str = "%d %b %Y %H:%M:%S";

/// Placeholder replaced by the rendered value in a template.
pub const VALUE_PLACEHOLDER: &str = "{value}";

/// How a raw value is rendered before it is placed in the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueStyle {
    /// Plain integer
    Count,
    /// Seconds rendered with unit letters, e.g. `"2m 30s"`
    Duration { units: String, round: bool },
}

/// Template plus value style for one insighter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueFormat {
    template: String,
    style: ValueStyle,
}

impl ValueFormat {
    pub fn count(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            style: ValueStyle::Count,
        }
    }

    pub fn duration(template: impl Into<String>, units: impl Into<String>, round: bool) -> Self {
        Self {
            template: template.into(),
            style: ValueStyle::Duration {
                units: units.into(),
                round,
            },
        }
    }

    /// Same style, different template.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn style(&self) -> &ValueStyle {
        &self.style
    }

    pub fn render(&self, value: i64) -> String {
        let rendered = match &self.style {
            ValueStyle::Count => value.to_string(),
            ValueStyle::Duration { units, round } => format_duration(value, units, *round),
        };
        self.template.replace(VALUE_PLACEHOLDER, &rendered)
    }
}

fn unit_factor(unit: char) -> Option<i64> {
    match unit {
        'd' => Some(86_400),
        'h' => Some(3_600),
        'm' => Some(60),
        's' => Some(1),
        _ => None,
    }
}

/// Render `seconds` using the given unit letters, largest first.
///
/// Zero-valued units are left out. With `round`, any remainder below the
/// last unit rounds the value up to the next whole last unit. Negative input
/// is treated as zero; an all-zero result renders as `0` of the last unit.
///
/// ```
/// use chatinsights_core::format::format_duration;
///
/// assert_eq!(format_duration(150, "ms", false), "2m 30s");
/// assert_eq!(format_duration(3_601, "hm", true), "1h 1m");
/// ```
pub fn format_duration(seconds: i64, units: &str, round: bool) -> String {
    let units: Vec<(char, i64)> = units
        .chars()
        .filter_map(|u| unit_factor(u).map(|f| (u, f)))
        .collect();
    let Some(&(last_unit, last_factor)) = units.last() else {
        return seconds.max(0).to_string();
    };

    let mut remaining = seconds.max(0);
    if round && remaining % last_factor != 0 {
        remaining += last_factor - remaining % last_factor;
    }

    let mut parts = Vec::new();
    for (unit, factor) in units {
        let value = remaining / factor;
        remaining %= factor;
        if value > 0 {
            parts.push(format!("{}{}", value, unit));
        }
    }

    if parts.is_empty() {
        format!("0{}", last_unit)
    } else {
        parts.join(" ")
    }
}

/// Format a source event date the way rank files expect.
pub fn format_rank_date(date: DateTime<Utc>) -> String {
    date.format(RANK_DATE_FORMAT).to_string()
}
