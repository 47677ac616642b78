mod categorizer;
mod checksum;
mod cli;
mod config;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod normalizer;
mod rates;
mod reports;
mod settings;

use clap::Parser;
use env_logger::Env;

use cli::{CategoryCommands, Cli, Commands, CurrencyCommands, RateCommands, TransactionCommands};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import => cli::import::run(),
        Commands::Category { command } => match command {
            CategoryCommands::Create { name } => cli::category::create(&name),
            CategoryCommands::List => cli::category::list(),
            CategoryCommands::Update { id, name } => cli::category::update(id, &name),
            CategoryCommands::Delete { id } => cli::category::delete(id),
        },
        Commands::Currency { command } => match command {
            CurrencyCommands::Create { symbol } => cli::currency::create(&symbol),
            CurrencyCommands::List => cli::currency::list(),
            CurrencyCommands::Update { old, new } => cli::currency::update(&old, &new),
            CurrencyCommands::Delete { symbol } => cli::currency::delete(&symbol),
        },
        Commands::Rate { command } => match command {
            RateCommands::Create {
                month,
                from_symbol,
                rate,
            } => cli::rate::create(&month, &from_symbol, rate),
            RateCommands::List => cli::rate::list(),
            RateCommands::Delete { id } => cli::rate::delete(id),
        },
        Commands::Transaction { command } => match command {
            TransactionCommands::List { account, month } => {
                cli::transaction::list(account.as_deref(), month.as_deref())
            }
            TransactionCommands::Search { text, account, month } => {
                cli::transaction::search(&text, account.as_deref(), month.as_deref())
            }
            TransactionCommands::Delete { id } => cli::transaction::delete(id),
            TransactionCommands::Ignore { id, undo } => cli::transaction::ignore(id, undo),
            TransactionCommands::Aggregate { account, month } => {
                cli::transaction::aggregate(account.as_deref(), month.as_deref())
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
