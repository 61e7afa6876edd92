use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};

use relaypool_core::{AccountStore, Dispatcher, ExportFormat};
use relaypool_types::{AccountRole, EventQuery, EventType, Outcome};

use crate::cli::Settle;

pub async fn dispatch_once(
    dispatcher: &Arc<Dispatcher>,
    action: String,
    role: Option<String>,
    settle: Settle,
    json: bool,
) -> Result<()> {
    let role = role.map(|r| r.parse::<AccountRole>()).transpose()?;
    let lease = dispatcher.acquire_async(action, role).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&lease)?);
    } else {
        println!(
            "{} Lease on {} for {} (expires {})",
            "✓".green(),
            lease.account_id.cyan(),
            lease.action_type,
            lease.expires_at.format("%H:%M:%S")
        );
    }

    let outcome = match settle {
        Settle::Success => Outcome::Success,
        Settle::Failure => Outcome::Failure,
        Settle::RateLimited => Outcome::RateLimited,
        Settle::Release => {
            dispatcher.release_async(lease).await?;
            if !json {
                println!("  released");
            }
            return Ok(());
        },
    };

    dispatcher.report_async(lease, outcome).await?;
    if !json {
        println!("  reported {}", outcome);
    }
    Ok(())
}

pub fn reset_daily(dispatcher: &Dispatcher) -> Result<()> {
    if dispatcher.reset_daily_counters()? {
        println!("{} Daily budgets reset", "✓".green());
    } else {
        println!("{} Daily budgets were already reset today", "•".yellow());
    }
    Ok(())
}

pub async fn reconcile(dispatcher: &Arc<Dispatcher>, json: bool) -> Result<()> {
    let summary = dispatcher.reconcile_async().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} Reconciled: {} rescored, {} recovered, {} expired leases",
            "✓".green(),
            summary.rescored,
            summary.recovered,
            summary.expired_leases
        );
    }
    Ok(())
}

pub async fn watch(dispatcher: &Arc<Dispatcher>) -> Result<()> {
    let task = dispatcher.start_auto_reconcile();
    println!(
        "{} Reconciling every {}s, press Ctrl+C to stop",
        "✓".green(),
        dispatcher.config().reconcile_interval_secs
    );
    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
    task.abort();
    tracing::info!("Watch stopped");
    Ok(())
}

pub fn stats(dispatcher: &Dispatcher, hours: i64, format: &str, output: Option<&Path>) -> Result<()> {
    if hours <= 0 {
        anyhow::bail!("--hours must be positive");
    }
    let format = format.parse::<ExportFormat>()?;
    let to = Utc::now();
    let from = to - Duration::hours(hours);

    let rendered = dispatcher.export(format, from, to)?;

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} {} report written to {}", "✓".green(), format, path.display());
        },
        None => println!("{}", rendered),
    }
    Ok(())
}

pub fn events(dispatcher: &Dispatcher, account: Option<String>, limit: usize, json: bool) -> Result<()> {
    let query = EventQuery { account_id: account, limit: Some(limit), ..Default::default() };
    let entries = dispatcher.store().events(&query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "No events found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Time", "Account", "Event", "Action", "Detail"]);

    for entry in &entries {
        let event = Cell::new(entry.event_type.as_str());
        let event = match entry.event_type {
            EventType::Succeeded | EventType::Reactivated => event.fg(Color::Green),
            EventType::RateLimited | EventType::Failed => event.fg(Color::Yellow),
            EventType::Disabled | EventType::Removed => event.fg(Color::Red),
            _ => event,
        };
        table.add_row(vec![
            Cell::new(entry.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&entry.account_id),
            event,
            Cell::new(entry.action_type.as_deref().unwrap_or("-")),
            Cell::new(&entry.detail),
        ]);
    }

    println!("{table}");
    Ok(())
}
