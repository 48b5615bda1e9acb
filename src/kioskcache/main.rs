use chrono::Utc;
use clap::Parser;
use colored::*;
use kioskcache::api::{
    CleanupReport, CmdMessage, ConfigAction, MediaCache, MessageLevel, PrimeReport, StatusReport,
    SyncReport,
};
use kioskcache::commands;
use kioskcache::config::{CacheConfig, KEYS};
use kioskcache::error::Result;
use kioskcache::logging::{init_logging, LoggingGuard};
use kioskcache::model::{CacheOutcome, MediaKind, CLEANUP_TICK};
use kioskcache::node::NodeRole;
use kioskcache::paths;
use kioskcache::remote::fs::FsRemote;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthStr;

mod args;
use args::{Cli, Commands, ConfigCommand};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct AppContext {
    cache: MediaCache<FsRemote>,
    config: CacheConfig,
    _logging: LoggingGuard,
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_dir = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => paths::default_config_dir()?,
    };

    if let Some(Commands::Config { action }) = cli.command {
        return handle_config(&config_dir, action);
    }

    let ctx = init_context(&cli, &config_dir)?;

    match cli.command {
        Some(Commands::Get { filename }) => handle_get(&ctx, &filename),
        Some(Commands::Prime { folder }) => handle_prime(&ctx, folder),
        Some(Commands::Sync) => handle_sync(&ctx),
        Some(Commands::Cleanup { days }) => handle_cleanup(&ctx, days),
        Some(Commands::Watch { interval, ticks }) => handle_watch(&ctx, interval, ticks),
        Some(Commands::Status) | None => handle_status(&ctx),
        Some(Commands::Config { .. }) => Ok(()),
    }
}

fn init_context(cli: &Cli, config_dir: &std::path::Path) -> Result<AppContext> {
    let mut config = CacheConfig::load(config_dir)?;
    if let Some(remote) = &cli.remote {
        config.remote_path = remote.clone();
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = Some(dir.clone());
    }

    let log_dir = match (&cli.log_dir, &config.log_dir) {
        (Some(dir), _) | (None, Some(dir)) => dir.clone(),
        (None, None) => paths::default_log_dir()?,
    };
    let logging = init_logging(&log_dir, cli.verbose)?;

    let cache = MediaCache::from_config(&config)?;
    Ok(AppContext {
        cache,
        config,
        _logging: logging,
    })
}

fn handle_get(ctx: &AppContext, filename: &str) -> Result<()> {
    let media = ctx.cache.get_media_path(filename)?;
    println!("{}", media.path.display());
    if media.outcome == CacheOutcome::StaleFallback {
        eprintln!("{}", "Remote unavailable, serving an older cached copy.".yellow());
    }
    Ok(())
}

fn handle_prime(ctx: &AppContext, folder: Option<PathBuf>) -> Result<()> {
    let report = match folder {
        Some(folder) => ctx.cache.cache_slideshow_folder(&folder),
        None => ctx.cache.cache_remote_folder(),
    };
    print_messages(&prime_messages(&report));
    Ok(())
}

fn handle_sync(ctx: &AppContext) -> Result<()> {
    let report = ctx.cache.sync_with_remote();
    print_messages(&sync_messages(&report));
    Ok(())
}

fn handle_cleanup(ctx: &AppContext, days: Option<u64>) -> Result<()> {
    let days = days.unwrap_or(ctx.config.cleanup_days);
    let report = ctx.cache.cleanup_old_files(days);
    print_messages(&cleanup_messages(&report, days));
    Ok(())
}

/// Mirrors the display's timers: refresh media every tick, reconcile when
/// due, evict once a day.
fn handle_watch(ctx: &AppContext, interval: u64, ticks: Option<u64>) -> Result<()> {
    let interval = Duration::from_secs(interval.max(1));
    let mut last_cleanup: Option<Instant> = None;
    let mut tick: u64 = 0;

    loop {
        tick += 1;
        if ctx.config.folder_mode {
            print_messages(&prime_messages(&ctx.cache.cache_remote_folder()));
        } else if let Err(e) = ctx.cache.get_media_path(&ctx.config.media_file) {
            print_messages(&[CmdMessage::warning(e.to_string())]);
        }

        if let Some(report) = ctx.cache.sync_if_needed() {
            print_messages(&sync_messages(&report));
        }

        if last_cleanup.is_none_or(|at| at.elapsed() >= CLEANUP_TICK) {
            let report = ctx.cache.cleanup_old_files(ctx.config.cleanup_days);
            print_messages(&cleanup_messages(&report, ctx.config.cleanup_days));
            last_cleanup = Some(Instant::now());
        }

        if ticks.is_some_and(|max| tick >= max) {
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}

fn handle_status(ctx: &AppContext) -> Result<()> {
    let report = ctx.cache.status()?;
    let role = NodeRole::from_server(&ctx.config.server);
    print_status(&report, &role);
    Ok(())
}

fn handle_config(config_dir: &std::path::Path, action: Option<ConfigCommand>) -> Result<()> {
    let action = match action {
        None | Some(ConfigCommand::Show) => ConfigAction::ShowAll,
        Some(ConfigCommand::Get { key }) => ConfigAction::ShowKey(key),
        Some(ConfigCommand::Set { key, value }) => ConfigAction::Set(key, value),
    };

    let result = commands::config::run(config_dir, action)?;
    if let Some(config) = &result.config {
        if result.messages.is_empty() {
            for key in KEYS {
                println!("{} = {}", key, config.get(key).unwrap_or_default());
            }
        }
    }
    print_messages(&result.messages);
    Ok(())
}

fn prime_messages(report: &PrimeReport) -> Vec<CmdMessage> {
    let mut messages = Vec::new();
    if report.folder_missing {
        messages.push(CmdMessage::warning(format!(
            "Folder not reachable: {}",
            report.folder.display()
        )));
        return messages;
    }
    for (name, reason) in &report.failed {
        messages.push(CmdMessage::warning(format!("Not cached: {} ({})", name, reason)));
    }
    let summary = format!("Cached {}/{} media files", report.cached, report.total);
    if report.failed.is_empty() {
        messages.push(CmdMessage::success(summary));
    } else {
        messages.push(CmdMessage::warning(summary));
    }
    messages
}

fn sync_messages(report: &SyncReport) -> Vec<CmdMessage> {
    if report.aborted {
        return vec![CmdMessage::warning(
            "Remote not reachable, nothing removed.",
        )];
    }
    let mut messages: Vec<CmdMessage> = report
        .removed
        .iter()
        .map(|name| CmdMessage::info(format!("Removed: {}", name)))
        .collect();
    for (name, reason) in &report.failed {
        messages.push(CmdMessage::error(format!("Could not remove {}: {}", name, reason)));
    }
    messages.push(CmdMessage::success(format!(
        "Sync done, {} removed",
        report.removed.len()
    )));
    messages
}

fn cleanup_messages(report: &CleanupReport, days: u64) -> Vec<CmdMessage> {
    let mut messages: Vec<CmdMessage> = report
        .removed
        .iter()
        .map(|name| CmdMessage::info(format!("Evicted: {}", name)))
        .collect();
    for (name, reason) in &report.failed {
        messages.push(CmdMessage::error(format!("Could not evict {}: {}", name, reason)));
    }
    if report.partials_removed > 0 {
        messages.push(CmdMessage::info(format!(
            "Cleared {} abandoned partial downloads",
            report.partials_removed
        )));
    }
    messages.push(CmdMessage::success(format!(
        "Cleanup done, {} unused for more than {} days removed",
        report.removed.len(),
        days
    )));
    messages
}

fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

const NAME_WIDTH: usize = 48;
const SIZE_WIDTH: usize = 10;
const TIME_WIDTH: usize = 16;

fn print_status(report: &StatusReport, role: &NodeRole) {
    let reachable = if report.remote_accessible {
        "reachable".green()
    } else {
        "unreachable".red()
    };
    println!("Node:    {}", role);
    println!("Remote:  {} ({})", report.remote_root.display(), reachable);
    println!("Cache:   {}", report.cache_root.display());
    if let Some(at) = report.last_sync {
        println!("Synced:  {}", format_time_ago(at));
    }
    println!();

    if report.entries.is_empty() {
        println!("{}", "Cache is empty.".dimmed());
        return;
    }

    for entry in &report.entries {
        let name = truncate_to_width(&entry.name, NAME_WIDTH);
        let padding = NAME_WIDTH.saturating_sub(name.width());
        let kind = match entry.kind {
            Some(MediaKind::Image) => "img".normal(),
            Some(MediaKind::Video) => "vid".cyan(),
            None => "---".dimmed(),
        };
        println!(
            "  {} {}{}{:>size$}{}",
            kind,
            name,
            " ".repeat(padding),
            format_size(entry.size),
            format_time_ago(entry.modified).dimmed(),
            size = SIZE_WIDTH
        );
    }
    println!();
    println!(
        "{} files, {}",
        report.entries.len(),
        format_size(report.total_bytes())
    );
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthChar;

    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn format_time_ago(timestamp: chrono::DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let formatter = timeago::Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
