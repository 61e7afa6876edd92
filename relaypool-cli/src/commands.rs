use std::sync::Arc;

use anyhow::Result;

use relaypool_core::Dispatcher;

use crate::cli::{AccountCommands, Commands, ConfigCommands};
use crate::{account_commands, config_commands, report_commands};

pub async fn handle_command(dispatcher: &Arc<Dispatcher>, command: Commands) -> Result<()> {
    match command {
        Commands::Account(cmd) => handle_account_command(dispatcher, cmd),
        Commands::Dispatch { action, role, outcome, json } => {
            report_commands::dispatch_once(dispatcher, action, role, outcome, json).await
        },
        Commands::ResetDaily => report_commands::reset_daily(dispatcher),
        Commands::Reconcile { json } => report_commands::reconcile(dispatcher, json).await,
        Commands::Watch => report_commands::watch(dispatcher).await,
        Commands::Stats { hours, format, output } => {
            report_commands::stats(dispatcher, hours, &format, output.as_deref())
        },
        Commands::Events { account, limit, json } => {
            report_commands::events(dispatcher, account, limit, json)
        },
        Commands::Config(cmd) => handle_config_command(cmd),
    }
}

fn handle_account_command(dispatcher: &Dispatcher, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::List { role, status, tag, json } => {
            account_commands::list_accounts(dispatcher, role, status, tag, json)
        },
        AccountCommands::Show { account_id, json } => {
            account_commands::show_account(dispatcher, &account_id, json)
        },
        AccountCommands::Add {
            account_id,
            file,
            role,
            username,
            api_key,
            api_secret,
            access_token,
            access_secret,
            bearer_token,
            tags,
            notes,
        } => match file {
            Some(path) => account_commands::add_from_file(dispatcher, &path),
            None => account_commands::add_account(
                dispatcher,
                account_commands::NewAccount {
                    account_id: account_id.unwrap_or_default(),
                    role,
                    username,
                    credentials: relaypool_types::Credentials {
                        api_key,
                        api_secret,
                        access_token,
                        access_secret,
                        bearer_token,
                    },
                    tags,
                    notes,
                },
            ),
        },
        AccountCommands::Remove { account_id } => {
            account_commands::remove_account(dispatcher, &account_id)
        },
        AccountCommands::Reactivate { account_id } => {
            account_commands::reactivate_account(dispatcher, &account_id)
        },
        AccountCommands::Disable { account_id, reason } => {
            account_commands::disable_account(dispatcher, &account_id, &reason)
        },
        AccountCommands::Signals { account_id, engagement_rate, growth, authenticity } => {
            account_commands::update_signals(
                dispatcher,
                &account_id,
                relaypool_types::SignalUpdate {
                    engagement_rate,
                    follower_growth_7d: growth,
                    authenticity,
                },
            )
        },
    }
}

pub fn handle_config_command(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show { json } => config_commands::show_config(json),
        ConfigCommands::Get { key } => config_commands::get_config_value(&key),
        ConfigCommands::Set { key, value } => config_commands::set_config_value(&key, &value),
    }
}
