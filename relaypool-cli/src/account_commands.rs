use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};

use relaypool_core::{grade, Dispatcher};
use relaypool_types::{
    AccountFilter, AccountRecord, AccountRole, AccountStatus, AccountSummary, Credentials,
    SignalUpdate,
};

pub struct NewAccount {
    pub account_id: String,
    pub role: String,
    pub username: String,
    pub credentials: Credentials,
    pub tags: Vec<String>,
    pub notes: String,
}

fn status_cell(status: AccountStatus) -> Cell {
    let cell = Cell::new(status.as_str());
    match status {
        AccountStatus::Active => cell.fg(Color::Green),
        AccountStatus::RateLimited => cell.fg(Color::Yellow),
        AccountStatus::Erroring => cell.fg(Color::Magenta),
        AccountStatus::Disabled => cell.fg(Color::Red),
    }
}

fn health_cell(score: f64) -> Cell {
    let cell = Cell::new(format!("{score:.1} {}", grade(score)));
    match score {
        s if s >= 70.0 => cell.fg(Color::Green),
        s if s >= 40.0 => cell.fg(Color::Yellow),
        _ => cell.fg(Color::Red),
    }
}

pub fn list_accounts(
    dispatcher: &Dispatcher,
    role: Option<String>,
    status: Option<String>,
    tag: Option<String>,
    json: bool,
) -> Result<()> {
    let mut filter = AccountFilter { tag, ..Default::default() };
    if let Some(role) = role {
        filter.role = Some(role.parse::<AccountRole>()?);
    }
    if let Some(status) = status {
        filter = filter.with_status(status.parse::<AccountStatus>()?);
    }
    let accounts = dispatcher.list_accounts(&filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!("{}", "No accounts found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Account", "Username", "Role", "Status", "Health", "Credential", "Last used"]);

    for acc in &accounts {
        table.add_row(vec![
            Cell::new(&acc.account_id),
            Cell::new(if acc.username.is_empty() { "-" } else { acc.username.as_str() }),
            Cell::new(acc.role.as_str()),
            status_cell(acc.status),
            health_cell(acc.health_score),
            Cell::new(&acc.masked_credential),
            Cell::new(
                acc.last_used_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".to_string()),
            ),
        ]);
    }

    println!("{table}");
    let available = accounts.iter().filter(|a| a.status.is_selectable()).count();
    println!("\n{} accounts total, {} available", accounts.len(), available);
    Ok(())
}

pub fn show_account(dispatcher: &Dispatcher, account_id: &str, json: bool) -> Result<()> {
    let summary = dispatcher.get_account(account_id)?;
    let headroom = dispatcher.headroom(account_id)?;

    if json {
        let budgets: Vec<serde_json::Value> = headroom
            .iter()
            .map(|(action, remaining, limit)| {
                serde_json::json!({ "action_type": action, "remaining": remaining, "limit": limit })
            })
            .collect();
        let out = serde_json::json!({ "account": summary, "budgets": budgets });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_summary(&summary);
    if headroom.is_empty() {
        println!("  Budgets: {}", "none used yet".dimmed());
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Action", "Remaining", "Limit"]);
        for (action, remaining, limit) in &headroom {
            let remaining_cell = if *remaining == 0 {
                Cell::new(remaining).fg(Color::Red)
            } else {
                Cell::new(remaining)
            };
            table.add_row(vec![Cell::new(action), remaining_cell, Cell::new(limit)]);
        }
        println!("{table}");
    }
    Ok(())
}

fn print_summary(summary: &AccountSummary) {
    println!("{}", summary.account_id.cyan().bold());
    if !summary.username.is_empty() {
        println!("  Username: {}", summary.username);
    }
    println!("  Role: {}", summary.role);
    println!("  Status: {}", summary.status);
    println!("  Health: {:.1} ({})", summary.health_score, grade(summary.health_score));
    println!("  Credential: {} [{}]", summary.masked_credential, summary.fingerprint);
    println!("  Violations: {}", summary.violation_count);
    if !summary.tags.is_empty() {
        println!("  Tags: {}", summary.tags.join(", "));
    }
}

pub fn add_account(dispatcher: &Dispatcher, new: NewAccount) -> Result<()> {
    let role = new.role.parse::<AccountRole>()?;
    let mut record = AccountRecord::new(new.account_id, role, new.credentials, Utc::now())
        .with_username(new.username)
        .with_tags(new.tags);
    record.notes = new.notes;

    let summary = dispatcher.register_account(record)?;
    println!(
        "{} Account added: {} ({}, health {:.1})",
        "✓".green(),
        summary.account_id.green(),
        summary.role,
        summary.health_score
    );
    Ok(())
}

pub fn add_from_file(dispatcher: &Dispatcher, path: &std::path::Path) -> Result<()> {
    let content = std::fs::read_to_string(path).context("Failed to read file")?;
    let record: AccountRecord =
        serde_json::from_str(&content).context("Failed to parse account JSON")?;
    let summary = dispatcher.register_account(record)?;
    println!("{} Account imported: {}", "✓".green(), summary.account_id.green());
    Ok(())
}

pub fn remove_account(dispatcher: &Dispatcher, account_id: &str) -> Result<()> {
    dispatcher.remove_account(account_id)?;
    println!("{} Account removed: {}", "✓".green(), account_id.green());
    Ok(())
}

pub fn reactivate_account(dispatcher: &Dispatcher, account_id: &str) -> Result<()> {
    if dispatcher.reactivate(account_id)? {
        println!("{} Account {} reactivated", "✓".green(), account_id);
    } else {
        println!("{} Account {} is already active", "•".yellow(), account_id);
    }
    Ok(())
}

pub fn disable_account(dispatcher: &Dispatcher, account_id: &str, reason: &str) -> Result<()> {
    dispatcher.disable(account_id, reason)?;
    println!("{} Account {} disabled: {}", "✓".green(), account_id, reason);
    Ok(())
}

pub fn update_signals(dispatcher: &Dispatcher, account_id: &str, update: SignalUpdate) -> Result<()> {
    if update.is_empty() {
        anyhow::bail!("Specify at least one of --engagement-rate, --growth, --authenticity");
    }
    let score = dispatcher.update_signals(account_id, update)?;
    println!("{} {} health is now {:.1} ({})", "✓".green(), account_id, score, grade(score));
    Ok(())
}
