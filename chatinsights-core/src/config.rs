//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/chatinsights/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/chatinsights/` (~/.config/chatinsights/)
//! - State/Logs: `$XDG_STATE_HOME/chatinsights/` (~/.local/state/chatinsights/)
//!
//! Titles and value templates of each insighter can be relabeled, either in
//! `[labels.<Insighter>]` tables or from a JSON locale file of the same shape.

use crate::contacts::MergeOptions;
use crate::error::{Error, Result};
use crate::format::VALUE_PLACEHOLDER;
use crate::insights::engine::ManagerOptions;
use crate::insights::insighters::{InsighterKind, InsighterSettings};
use crate::insights::race::RaceOptions;
use chrono::{Duration, FixedOffset};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Engine configuration
    #[serde(default)]
    pub insights: InsightsConfig,

    /// Contact reconciliation options
    #[serde(default)]
    pub contacts: MergeOptions,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Title and template overrides, keyed by insighter name
    #[serde(default)]
    pub labels: BTreeMap<String, LabelConfig>,
}

/// Insight engine configuration
#[derive(Debug, Deserialize, Clone)]
pub struct InsightsConfig {
    /// Aggregate contacts sharing a display name under one jid
    #[serde(default = "default_true")]
    pub group_by_display_name: bool,

    /// Feed group chats to the insighters
    #[serde(default)]
    pub include_groups: bool,

    /// Insighters to run, in report order. Empty runs all of them.
    #[serde(default)]
    pub insighters: Vec<String>,

    /// Podium size for `TopMessagesAmount`
    #[serde(default = "default_top_count")]
    pub top_count: usize,

    /// Longest gap between messages that keeps a conversation going
    #[serde(default = "default_conversation_gap_secs")]
    pub conversation_gap_secs: i64,

    /// Require voice notes to have a `.opus` file name
    #[serde(default = "default_true")]
    pub check_media_name: bool,

    /// Offset from UTC used to cut calendar days
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Width of one chart-race bucket
    #[serde(default = "default_race_bucket_days")]
    pub race_bucket_days: i64,

    /// Bars shown per chart-race frame
    #[serde(default = "default_race_bars")]
    pub race_bars: usize,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            group_by_display_name: true,
            include_groups: false,
            insighters: vec![],
            top_count: default_top_count(),
            conversation_gap_secs: default_conversation_gap_secs(),
            check_media_name: true,
            utc_offset_minutes: 0,
            race_bucket_days: default_race_bucket_days(),
            race_bars: default_race_bars(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_top_count() -> usize {
    3
}

fn default_conversation_gap_secs() -> i64 {
    60
}

fn default_race_bucket_days() -> i64 {
    7
}

fn default_race_bars() -> usize {
    10
}

impl InsightsConfig {
    /// The insighters to run. All of them when none are listed.
    pub fn insighter_kinds(&self) -> Result<Vec<InsighterKind>> {
        if self.insighters.is_empty() {
            return Ok(InsighterKind::ALL.to_vec());
        }
        self.insighters.iter().map(|name| name.parse()).collect()
    }

    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).ok_or_else(|| {
            Error::Config(format!(
                "insights.utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }

    pub fn insighter_settings(&self) -> Result<InsighterSettings> {
        Ok(InsighterSettings {
            top_count: self.top_count,
            conversation_gap_secs: self.conversation_gap_secs,
            check_media_name: self.check_media_name,
            utc_offset: self.utc_offset()?,
        })
    }

    pub fn manager_options(&self) -> ManagerOptions {
        ManagerOptions {
            group_by_display_name: self.group_by_display_name,
            include_groups: self.include_groups,
        }
    }

    /// Fails when `race_bucket_days` is too large to express as a duration.
    pub fn race_options(&self) -> Result<RaceOptions> {
        let bucket = Duration::try_days(self.race_bucket_days).ok_or_else(|| {
            Error::Config(format!(
                "insights.race_bucket_days out of range: {}",
                self.race_bucket_days
            ))
        })?;
        Ok(RaceOptions {
            bucket,
            bars: self.race_bars,
            group_by_display_name: self.group_by_display_name,
            include_groups: self.include_groups,
        })
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        self.insighter_kinds()?;
        self.utc_offset()?;

        if self.top_count == 0 {
            return Err(Error::Config(
                "insights.top_count must be at least 1".to_string(),
            ));
        }
        if self.conversation_gap_secs <= 0 {
            return Err(Error::Config(
                "insights.conversation_gap_secs must be positive".to_string(),
            ));
        }
        if self.race_bucket_days <= 0 {
            return Err(Error::Config(
                "insights.race_bucket_days must be positive".to_string(),
            ));
        }
        self.race_options()?;
        if self.race_bars == 0 {
            return Err(Error::Config(
                "insights.race_bars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Presentation overrides for one insighter
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct LabelConfig {
    /// Report title
    pub title: Option<String>,
    /// Value template, must contain `{value}`
    pub format: Option<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Overlay labels from a JSON locale file.
    ///
    /// The file maps insighter names (with or without the `Insighter`
    /// suffix) to `{ "title": ..., "format": ... }`. Entries replace the
    /// fields they set and leave the others alone.
    pub fn merge_locale_file(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read locale file {:?}: {}", path, e)))?;
        let strings: BTreeMap<String, LabelConfig> = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse locale file {:?}: {}", path, e)))?;

        let mut merged = 0;
        for (name, label) in strings {
            let kind: InsighterKind = name.parse()?;
            let entry = self.labels.entry(kind.name().to_string()).or_default();
            if label.title.is_some() {
                entry.title = label.title;
            }
            if label.format.is_some() {
                entry.format = label.format;
            }
            merged += 1;
        }

        tracing::info!(path = %path.display(), labels = merged, "Loaded locale file");
        self.validate()?;
        Ok(merged)
    }

    /// Label overrides for `kind`, whichever name form they were keyed by.
    pub fn label_for(&self, kind: InsighterKind) -> Option<&LabelConfig> {
        self.labels.iter().find_map(|(name, label)| {
            match name.parse::<InsighterKind>() {
                Ok(k) if k == kind => Some(label),
                _ => None,
            }
        })
    }

    /// Validate the whole configuration
    pub fn validate(&self) -> Result<()> {
        self.insights.validate()?;

        for (name, label) in &self.labels {
            name.parse::<InsighterKind>()?;
            if let Some(format) = &label.format {
                if !format.contains(VALUE_PLACEHOLDER) {
                    return Err(Error::Config(format!(
                        "labels.{}.format must contain {}",
                        name, VALUE_PLACEHOLDER
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/chatinsights/config.toml` (~/.config/chatinsights/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("chatinsights").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/chatinsights/` (~/.local/state/chatinsights/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("chatinsights")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/chatinsights/chatinsights.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("chatinsights.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::OverwritePolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.insights.group_by_display_name);
        assert!(!config.insights.include_groups);
        assert_eq!(config.insights.top_count, 3);
        assert_eq!(config.insights.conversation_gap_secs, 60);
        assert_eq!(
            config.insights.insighter_kinds().unwrap(),
            InsighterKind::ALL.to_vec()
        );
        assert!(config.contacts.by_jid_similarity);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[insights]
include_groups = true
insighters = ["LongestAudioInsighter", "LongestCall"]
utc_offset_minutes = -180

[contacts]
by_display_name_similarity = true
overwrite_display_name = "if_empty"

[logging]
level = "debug"

[labels.LongestCall]
title = "Ligação mais longa"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());

        assert!(config.insights.include_groups);
        assert_eq!(
            config.insights.insighter_kinds().unwrap(),
            vec![InsighterKind::LongestAudio, InsighterKind::LongestCall]
        );
        assert_eq!(
            config.insights.utc_offset().unwrap(),
            FixedOffset::west_opt(3 * 3600).unwrap()
        );
        assert!(config.contacts.by_display_name_similarity);
        assert_eq!(config.contacts.overwrite_display_name, OverwritePolicy::IfEmpty);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config
                .label_for(InsighterKind::LongestCall)
                .and_then(|l| l.title.as_deref()),
            Some("Ligação mais longa")
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.insights.insighters = vec!["ShortestAudio".to_string()];
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.insights.conversation_gap_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.insights.top_count = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.insights.race_bucket_days = 200_000_000_000;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        assert!(config.insights.race_options().is_err());

        let mut config = Config::default();
        config.labels.insert(
            "LongestCall".to_string(),
            LabelConfig {
                title: None,
                format: Some("no placeholder".to_string()),
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[insights]\ntop_count = 5").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.insights.top_count, 5);

        let mut bad = NamedTempFile::new().unwrap();
        writeln!(bad, "[insights]\ntop_count = \"five\"").unwrap();
        assert!(matches!(Config::load_from(bad.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_merge_locale_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "LongestCallInsighter": {{"title": "Ligação mais longa"}},
                "GreatestCallAmountInsighter": {{"title": "Mais ligações", "format": "{{value}} ligações"}}
            }}"#
        )
        .unwrap();

        let mut config = Config::default();
        config.labels.insert(
            "LongestCall".to_string(),
            LabelConfig {
                title: None,
                format: Some("{value} no telefone".to_string()),
            },
        );

        assert_eq!(config.merge_locale_file(file.path()).unwrap(), 2);

        let longest = config.label_for(InsighterKind::LongestCall).unwrap();
        assert_eq!(longest.title.as_deref(), Some("Ligação mais longa"));
        assert_eq!(longest.format.as_deref(), Some("{value} no telefone"));

        let amount = config.label_for(InsighterKind::GreatestCallAmount).unwrap();
        assert_eq!(amount.format.as_deref(), Some("{value} ligações"));
    }

    #[test]
    fn test_paths() {
        assert!(Config::config_path().ends_with("chatinsights/config.toml"));
        assert!(Config::log_path().ends_with("chatinsights.log"));
    }
}
