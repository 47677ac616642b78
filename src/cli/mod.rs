pub mod category;
pub mod currency;
pub mod import;
pub mod init;
pub mod rate;
pub mod transaction;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::config::Config;
use crate::error::Result;
use crate::settings::config_path;

/// Rejects an `--account` value that is not an account key in trackit.yaml.
pub(crate) fn check_account(account: Option<&str>) -> Result<()> {
    if let Some(key) = account {
        Config::load(&config_path())?.require_account(key)?;
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "trackit", about = "Import bank CSV exports into a local ledger.")]
pub struct Cli {
    /// Log progress to stderr (debug level).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Directory holding trackit.yaml, trackit.db and the CSV exports
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import every new or changed CSV file in the data directory.
    Import,
    /// Manage categories.
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Manage currencies.
    Currency {
        #[command(subcommand)]
        command: CurrencyCommands,
    },
    /// Manage monthly conversion rates into the base currency.
    Rate {
        #[command(subcommand)]
        command: RateCommands,
    },
    /// Inspect imported transactions.
    Transaction {
        #[command(subcommand)]
        command: TransactionCommands,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Add a category.
    #[command(alias = "add")]
    Create { name: String },
    /// List categories.
    List,
    /// Rename a category.
    Update {
        /// Category ID (shown in `trackit category list`)
        id: i64,
        /// New name
        name: String,
    },
    /// Delete a category. Its transactions become uncategorized.
    Delete {
        /// Category ID (shown in `trackit category list`)
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum CurrencyCommands {
    /// Add a currency, e.g. EUR.
    Create {
        /// Three-letter symbol
        symbol: String,
    },
    /// List currencies.
    List,
    /// Rename a currency symbol. Its rates move with it.
    Update {
        old: String,
        new: String,
    },
    /// Delete a currency and its rates.
    Delete {
        symbol: String,
    },
}

#[derive(Subcommand)]
pub enum RateCommands {
    /// Define the rate for one currency and month. Replaces an existing one.
    Create {
        /// Month: YYYY-MM
        #[arg(long)]
        month: String,
        /// Currency converted from
        #[arg(long = "from-symbol")]
        from_symbol: String,
        /// Units of base currency per unit of `from-symbol`
        #[arg(long)]
        rate: Decimal,
    },
    /// List all rates.
    List,
    /// Delete a rate by ID.
    Delete {
        /// Rate ID (shown in `trackit rate list`)
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum TransactionCommands {
    /// List transactions.
    List {
        #[arg(long)]
        account: Option<String>,
        /// Month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
    },
    /// Find transactions whose counter party contains some text.
    Search {
        text: String,
        #[arg(long)]
        account: Option<String>,
        /// Month: YYYY-MM
        #[arg(long, alias = "date")]
        month: Option<String>,
    },
    /// Delete a transaction.
    #[command(alias = "rm")]
    Delete {
        /// Transaction ID (shown in `trackit transaction list`)
        id: i64,
    },
    /// Exclude a transaction from totals.
    Ignore {
        /// Transaction ID (shown in `trackit transaction list`)
        id: i64,
        /// Include it again
        #[arg(long)]
        undo: bool,
    },
    /// Sum transactions per category.
    Aggregate {
        #[arg(long)]
        account: Option<String>,
        /// Month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
    },
}
