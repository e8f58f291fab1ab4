//! chatinsights-rank - per-contact rankings from a chat history dump
//!
//! Reads a JSON dump of messages and calls, reconciles contacts with any
//! extra contact sources, runs the insighters and prints who wins each one.

use anyhow::{Context, Result};
use chatinsights_core::format::format_rank_date;
use chatinsights_core::input::load_contacts;
use chatinsights_core::insights::export::rank_document;
use chatinsights_core::insights::race::race_frames;
use chatinsights_core::insights::RunSummary;
use chatinsights_core::{
    ChatDump, Config, ContactRegistry, InsightReport, InsighterKind, InsighterManager, Jid,
    RankEntry,
};
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "chatinsights-rank")]
#[command(about = "Chat Insights - who you talk to the most")]
#[command(version)]
struct Args {
    /// JSON chat dump with contacts, messages and calls
    input: PathBuf,

    /// Extra contact source (JSON array of contacts); repeatable
    #[arg(long = "contacts")]
    contacts: Vec<PathBuf>,

    /// Config file (default: ~/.config/chatinsights/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON locale file with insighter titles and formats
    #[arg(long)]
    locale: Option<PathBuf>,

    /// Insighters to run, comma separated (default: all)
    #[arg(long, value_delimiter = ',')]
    insighters: Vec<String>,

    /// Podium size for TopMessagesAmount
    #[arg(long)]
    top: Option<usize>,

    /// Keep contacts sharing a display name apart
    #[arg(long)]
    no_group: bool,

    /// Include group chats
    #[arg(long)]
    include_groups: bool,

    /// Export format (md = markdown, json = rank file, race = chart-race frames)
    #[arg(long)]
    export: Option<String>,

    /// Write the export to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };
    let _log_guard = chatinsights_core::logging::init(&config.logging).ok();

    apply_overrides(&mut config, &args)?;

    let dump = ChatDump::from_path(&args.input)
        .with_context(|| format!("failed to read chat dump {}", args.input.display()))?;
    let registry = build_registry(&dump, &args.contacts, &config)?;

    if args.export.as_deref() == Some("race") {
        let options = config
            .insights
            .race_options()
            .context("invalid chart-race options")?;
        let frames = race_frames(&dump.events, &registry, &options)
            .context("failed to build chart-race frames")?;
        return emit(&serde_json::to_string_pretty(&frames)?, args.output.as_deref());
    }

    let mut manager = InsighterManager::from_config(&config).context("invalid insighter set")?;
    let summary = manager
        .run(&dump.events, &registry)
        .context("failed to compute insights")?;
    let reports = manager.reports();

    match args.export.as_deref() {
        Some("json") => {
            let document = rank_document(&reports, &registry)?;
            emit(&serde_json::to_string_pretty(&document)?, args.output.as_deref())?;
        }
        Some("md") => emit(
            &render_markdown(&reports, &registry, config.insights.top_count),
            args.output.as_deref(),
        )?,
        Some(other) => anyhow::bail!(
            "Unknown export format: {}. Use 'md', 'json' or 'race'",
            other
        ),
        None => print_terminal(&reports, &registry, &summary, config.insights.top_count),
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, args: &Args) -> Result<()> {
    if let Some(locale) = &args.locale {
        config
            .merge_locale_file(locale)
            .with_context(|| format!("failed to load locale {}", locale.display()))?;
    }
    if !args.insighters.is_empty() {
        config.insights.insighters = args.insighters.clone();
    }
    if let Some(top) = args.top {
        config.insights.top_count = top;
    }
    if args.no_group {
        config.insights.group_by_display_name = false;
    }
    if args.include_groups {
        config.insights.include_groups = true;
    }
    config.validate().context("invalid options")?;
    Ok(())
}

fn build_registry(dump: &ChatDump, sources: &[PathBuf], config: &Config) -> Result<ContactRegistry> {
    let mut registry = ContactRegistry::from_entries(dump.contacts.clone());

    for path in sources {
        let entries = load_contacts(path)
            .with_context(|| format!("failed to read contacts {}", path.display()))?;
        let other = ContactRegistry::from_entries(entries);
        let merged = registry
            .merge_from(&other, &config.contacts)
            .with_context(|| format!("failed to merge contacts {}", path.display()))?;
        tracing::info!(
            source = %path.display(),
            added = merged.added,
            renamed = merged.renamed,
            images_updated = merged.images_updated,
            "Merged contact source"
        );
    }

    Ok(registry)
}

fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, format!("{}\n", text))
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn contact_label(jid: &Jid, registry: &ContactRegistry) -> String {
    registry
        .get(jid.as_str())
        .map(|c| c.label())
        .unwrap_or_else(|| jid.user_part().to_string())
}

fn source_date(entry: &RankEntry) -> Option<String> {
    entry
        .track_object
        .as_ref()
        .map(|t| format_rank_date(t.date()))
}

fn medal(position: usize) -> &'static str {
    match position {
        0 => "🥇",
        1 => "🥈",
        2 => "🥉",
        _ => "  ",
    }
}

fn print_terminal(
    reports: &[InsightReport],
    registry: &ContactRegistry,
    summary: &RunSummary,
    top_count: usize,
) {
    println!();
    println!("╭{}╮", "─".repeat(60));
    println!("│{:^60}│", "CHAT INSIGHTS");
    println!("╰{}╯", "─".repeat(60));
    println!();

    println!(
        "   Messages: {:<10} Calls: {:<10} Skipped: {}",
        summary.messages,
        summary.calls,
        summary.skipped_broadcast + summary.skipped_group
    );
    println!();

    if summary.dispatched == 0 {
        println!("  No conversations found.");
        println!();
        return;
    }

    for report in reports {
        println!("{}", report.title.to_uppercase());

        if report.key == InsighterKind::TopMessagesAmount {
            let size = report.podium_size.unwrap_or(top_count);
            for (i, entry) in report.podium(size).iter().enumerate() {
                println!(
                    "   {} {:<28} {}",
                    medal(i),
                    contact_label(&entry.jid, registry),
                    entry.formatted_value
                );
            }
        } else {
            match &report.winner {
                Some(winner) => {
                    let date = source_date(winner)
                        .map(|d| format!("  ({})", d))
                        .unwrap_or_default();
                    println!(
                        "   {:<30} {}{}",
                        contact_label(&winner.jid, registry),
                        winner.formatted_value,
                        date
                    );
                }
                None => println!("   -"),
            }
        }
        println!();
    }
}

fn render_markdown(reports: &[InsightReport], registry: &ContactRegistry, top_count: usize) -> String {
    let mut out = String::new();
    out.push_str("# Chat Insights\n\n");

    for report in reports {
        out.push_str(&format!("## {}\n\n", report.title));

        let podium = report.podium(report.podium_size.unwrap_or(top_count));
        if podium.is_empty() {
            out.push_str("*No winner*\n\n");
            continue;
        }

        for (i, entry) in podium.iter().enumerate() {
            let line = match source_date(entry) {
                Some(date) => format!(
                    "{}. **{}** - {} *({})*\n",
                    i + 1,
                    contact_label(&entry.jid, registry),
                    entry.formatted_value,
                    date
                ),
                None => format!(
                    "{}. **{}** - {}\n",
                    i + 1,
                    contact_label(&entry.jid, registry),
                    entry.formatted_value
                ),
            };
            out.push_str(&line);
        }
        out.push('\n');
    }

    out.push_str("---\n*Generated by chatinsights-rank*");
    out
}
