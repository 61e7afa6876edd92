//! Output formats for `AggregateReport`.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use relaypool_types::{AggregateReport, ConfigError};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::health::grade;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    Text,
}

impl ExportFormat {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "text" | "txt" => Ok(Self::Text),
            other => Err(ConfigError::Invalid {
                field: "format".to_string(),
                message: format!("unknown export format '{other}'"),
            }),
        }
    }
}

pub fn render(report: &AggregateReport, format: ExportFormat) -> AppResult<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ExportFormat::Csv => Ok(to_csv(report)),
        ExportFormat::Text => Ok(to_text(report)),
    }
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// One `section,key,value` row per metric.
fn to_csv(report: &AggregateReport) -> String {
    let mut rows: Vec<(&str, String, String)> = vec![
        ("window", "start".into(), report.window_start.to_rfc3339()),
        ("window", "end".into(), report.window_end.to_rfc3339()),
    ];
    rows.extend(report.usage_by_action.iter().map(|(k, v)| ("usage", k.clone(), v.to_string())));

    let o = &report.outcomes;
    for (key, value) in [
        ("acquired", o.acquired),
        ("succeeded", o.succeeded),
        ("failed", o.failed),
        ("rate_limited", o.rate_limited),
        ("released", o.released),
        ("disabled", o.disabled),
        ("reactivated", o.reactivated),
    ] {
        rows.push(("outcomes", key.into(), value.to_string()));
    }
    rows.push(("outcomes", "success_rate".into(), format!("{:.4}", report.success_rate)));
    rows.extend(
        report
            .avg_health_by_role
            .iter()
            .map(|(k, v)| ("health_by_role", k.clone(), format!("{v:.2}"))),
    );

    let pool = &report.pool;
    rows.push(("pool", "total_accounts".into(), pool.total_accounts.to_string()));
    rows.push(("pool", "available".into(), pool.available.to_string()));
    rows.push(("pool", "avg_health".into(), format!("{:.2}", pool.avg_health)));
    rows.extend(pool.by_status.iter().map(|(k, v)| ("pool_status", k.clone(), v.to_string())));
    rows.extend(pool.by_role.iter().map(|(k, v)| ("pool_role", k.clone(), v.to_string())));
    if let Some(best) = &pool.best {
        rows.push(("pool", "best".into(), format!("{}:{:.2}", best.account_id, best.health_score)));
    }
    if let Some(worst) = &pool.worst {
        rows.push(("pool", "worst".into(), format!("{}:{:.2}", worst.account_id, worst.health_score)));
    }

    let mut out = String::from("section,key,value\n");
    for (section, key, value) in rows {
        let _ = writeln!(out, "{},{},{}", section, csv_field(&key), csv_field(&value));
    }
    out
}

fn to_text(report: &AggregateReport) -> String {
    let mut out = String::new();
    let o = &report.outcomes;
    let pool = &report.pool;

    let _ = writeln!(
        out,
        "Pool report {} .. {}",
        report.window_start.format("%Y-%m-%d %H:%M"),
        report.window_end.format("%Y-%m-%d %H:%M")
    );
    let _ = writeln!(
        out,
        "Accounts: {} total, {} available, avg health {:.1} ({})",
        pool.total_accounts,
        pool.available,
        pool.avg_health,
        grade(pool.avg_health)
    );
    let statuses: Vec<String> =
        pool.by_status.iter().filter(|(_, n)| **n > 0).map(|(s, n)| format!("{s} {n}")).collect();
    if !statuses.is_empty() {
        let _ = writeln!(out, "Status: {}", statuses.join(", "));
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Leases: {} acquired, {} succeeded, {} failed, {} rate limited, {} released",
        o.acquired, o.succeeded, o.failed, o.rate_limited, o.released
    );
    let _ = writeln!(out, "Success rate: {:.1}%", report.success_rate * 100.0);
    for (action, count) in &report.usage_by_action {
        let _ = writeln!(out, "  {action:<12} {count}");
    }

    if !report.avg_health_by_role.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Health by role:");
        for (role, health) in &report.avg_health_by_role {
            let _ = writeln!(out, "  {role:<12} {health:>5.1} {}", grade(*health));
        }
    }
    if let (Some(best), Some(worst)) = (&pool.best, &pool.worst) {
        let _ = writeln!(out);
        let _ = writeln!(out, "Best:  {} ({:.1})", best.account_id, best.health_score);
        let _ = writeln!(out, "Worst: {} ({:.1})", worst.account_id, worst.health_score);
    }
    out
}
