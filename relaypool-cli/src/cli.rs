use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "relaypool",
    about = "Relaypool - multi-account dispatch manager",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, env = "RELAYPOOL_DATA_DIR", help = "Data directory (default ~/.relaypool)")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Use a throwaway in-memory store; nothing is persisted")]
    pub memory: bool,

    #[arg(short, long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(subcommand, about = "Manage pool accounts")]
    Account(AccountCommands),

    #[command(about = "Acquire a lease and settle it in one step")]
    Dispatch {
        #[arg(help = "Action type (tweet, search, like, retweet, follow, dm, ...)")]
        action: String,

        #[arg(short, long, help = "Restrict to accounts with this role")]
        role: Option<String>,

        #[arg(short, long, value_enum, default_value_t = Settle::Success)]
        outcome: Settle,

        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Zero daily budgets (once per calendar day)")]
    ResetDaily,

    #[command(about = "Rescore accounts, recover rate-limited ones, sweep expired leases")]
    Reconcile {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Run reconciliation and the daily reset until interrupted")]
    Watch,

    #[command(about = "Aggregate usage and health over a time window")]
    Stats {
        #[arg(long, default_value_t = 24, help = "Window length in hours, ending now")]
        hours: i64,

        #[arg(short, long, default_value = "text", help = "json, csv or text")]
        format: String,

        #[arg(short, long, help = "Write to a file instead of stdout")]
        output: Option<PathBuf>,
    },

    #[command(about = "Show the account event log")]
    Events {
        #[arg(short, long, help = "Only this account")]
        account: Option<String>,

        #[arg(short = 'n', long, default_value_t = 50, help = "Newest N entries")]
        limit: usize,

        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(subcommand, about = "View and modify configuration")]
    Config(ConfigCommands),
}

/// How `dispatch` settles the lease it acquired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Settle {
    Success,
    Failure,
    RateLimited,
    /// Give the reservation back without reporting
    Release,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    #[command(about = "List accounts with masked credentials")]
    List {
        #[arg(short, long)]
        role: Option<String>,

        #[arg(short, long)]
        status: Option<String>,

        #[arg(short, long)]
        tag: Option<String>,

        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Show one account and its remaining budgets")]
    Show {
        account_id: String,

        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Register an account from flags or a JSON file")]
    Add {
        #[arg(required_unless_present = "file", help = "Stable account identifier")]
        account_id: Option<String>,

        #[arg(short, long, conflicts_with = "account_id", help = "Path to account JSON file")]
        file: Option<PathBuf>,

        #[arg(short, long, default_value = "main")]
        role: String,

        #[arg(short, long, default_value = "")]
        username: String,

        #[arg(long, env = "RELAYPOOL_API_KEY", hide_env_values = true, default_value = "")]
        api_key: String,

        #[arg(long, env = "RELAYPOOL_API_SECRET", hide_env_values = true, default_value = "")]
        api_secret: String,

        #[arg(long, env = "RELAYPOOL_ACCESS_TOKEN", hide_env_values = true, default_value = "")]
        access_token: String,

        #[arg(long, env = "RELAYPOOL_ACCESS_SECRET", hide_env_values = true, default_value = "")]
        access_secret: String,

        #[arg(long, env = "RELAYPOOL_BEARER_TOKEN", hide_env_values = true, default_value = "")]
        bearer_token: String,

        #[arg(short, long = "tag", help = "Tag (repeatable)")]
        tags: Vec<String>,

        #[arg(long, default_value = "")]
        notes: String,
    },

    #[command(about = "Remove an account (history is kept)")]
    Remove { account_id: String },

    #[command(about = "Return a disabled or rate-limited account to active")]
    Reactivate { account_id: String },

    #[command(about = "Quarantine an account")]
    Disable {
        account_id: String,

        #[arg(short, long, default_value = "operator")]
        reason: String,
    },

    #[command(about = "Record analytics signals and rescore")]
    Signals {
        account_id: String,

        #[arg(long, help = "Interactions per impression, e.g. 0.02")]
        engagement_rate: Option<f64>,

        #[arg(long, allow_hyphen_values = true, help = "Net follower change over 7 days")]
        growth: Option<i64>,

        #[arg(long, help = "Authenticity / quality in [0, 1]")]
        authenticity: Option<f64>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Show current configuration")]
    Show {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Get a specific configuration value")]
    Get {
        #[arg(help = "Configuration key (e.g., 'failure_threshold', 'budget.tweet')")]
        key: String,
    },

    #[command(about = "Set a configuration value")]
    Set {
        #[arg(help = "Configuration key")]
        key: String,

        #[arg(help = "New value ('limit/window_secs' for budget.<action>)")]
        value: String,
    },
}
