use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::application::{LedgerConfig, LedgerEngine};
use crate::domain::{
    format_cents, parse_cents, Account, AccountId, Cents, CreditRequest, DebitRequest,
    OpenAccountRequest, Statement,
};

/// Tesouro - account ledger
#[derive(Parser)]
#[command(name = "tesouro")]
#[command(about = "Deposits, limit-checked transfers and statements over a SQLite ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path (overrides TESOURO_DATABASE_URL)
    #[arg(short, long)]
    pub database: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Deposit money into an account
    Deposit {
        /// Account id
        account: AccountId,

        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,

        /// Short note (up to 10 characters)
        #[arg(short, long)]
        description: String,
    },

    /// Transfer money to another account by its transfer key
    Transfer {
        /// Paying account id
        account: AccountId,

        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Transfer key of the receiving account
        #[arg(long)]
        to: String,

        /// Short note (up to 10 characters)
        #[arg(short, long)]
        description: String,
    },

    /// Show balance and transaction history
    Statement {
        /// Account id
        account: AccountId,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account with a zero balance
    Open {
        /// Full name of the holder
        name: String,

        /// Credit limit (e.g., "1000" or "1000.00")
        #[arg(short, long, default_value = "0")]
        limit: String,
    },

    /// Show account details
    Show {
        /// Account id
        id: AccountId,
    },

    /// Search accounts by name
    Search {
        /// Part of the holder's name
        name: String,
    },

    /// Show the account's transfer key, generating it on first use
    Key {
        /// Account id
        id: AccountId,
    },
}

/// Install the log subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "tesouro=debug" } else { "tesouro=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl Cli {
    fn config(&self) -> Result<LedgerConfig> {
        let config = LedgerConfig::from_env().context("Invalid configuration")?;
        Ok(match &self.database {
            Some(path) => config.with_database_url(format!("sqlite:{path}")),
            None => config,
        })
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config()?;

        match self.command {
            Commands::Init => {
                let url = config.database_url.clone();
                LedgerEngine::init(config).await?;
                println!("Database initialized: {}", url);
            }
            command => {
                let engine = LedgerEngine::connect(config).await?;
                let result = run_command(&engine, command).await;
                engine.database().close().await;
                result?;
            }
        }
        Ok(())
    }
}

async fn run_command(engine: &LedgerEngine, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {}

        Commands::Account(account_cmd) => run_account_command(engine, account_cmd).await?,

        Commands::Deposit {
            account,
            amount,
            description,
        } => {
            let amount = parse_amount(&amount)?;
            let request = CreditRequest::new(account, amount, &description)?;
            let receipt = engine.apply_credit(request).await?;

            println!(
                "Deposited {} into account {} (balance {}, at {})",
                format_cents(amount),
                account,
                format_cents(receipt.new_balance),
                receipt.completed_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        Commands::Transfer {
            account,
            amount,
            to,
            description,
        } => {
            let amount = parse_amount(&amount)?;
            let request = DebitRequest::new(account, amount, &description, &to)?;
            let receipt = engine.apply_debit(request).await?;

            println!(
                "Transferred {} from account {} to {} (balance {}, transaction {})",
                format_cents(amount),
                account,
                receipt.payee_name,
                format_cents(receipt.new_balance),
                receipt.transaction.id
            );
        }

        Commands::Statement { account, json } => {
            let statement = engine.statement(account).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&statement)?);
            } else {
                print_statement(&statement);
            }
        }
    }
    Ok(())
}

async fn run_account_command(engine: &LedgerEngine, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Open { name, limit } => {
            let credit_limit = parse_amount(&limit)?;
            let account = engine
                .open_account(OpenAccountRequest::new(&name, credit_limit)?)
                .await?;
            let key = engine.ensure_transfer_key(account.id).await?;
            println!(
                "Opened account {} for {} (limit {}, transfer key {})",
                account.id,
                account.full_name,
                format_cents(account.credit_limit),
                key
            );
        }

        AccountCommands::Show { id } => {
            let account = engine.account(id).await?;
            print_account(&account);
        }

        AccountCommands::Search { name } => {
            let accounts = engine.search_accounts(&name).await?;
            if accounts.is_empty() {
                println!("No accounts match '{}'", name);
            }
            for account in &accounts {
                println!(
                    "{:>6}  {:<30} {}",
                    account.id,
                    account.full_name,
                    account
                        .transfer_key
                        .as_ref()
                        .map(|k| k.as_str())
                        .unwrap_or("(no key)")
                );
            }
        }

        AccountCommands::Key { id } => {
            let key = engine.ensure_transfer_key(id).await?;
            println!("{}", key);
        }
    }
    Ok(())
}

fn parse_amount(input: &str) -> Result<Cents> {
    parse_cents(input).with_context(|| format!("Invalid amount '{input}'. Use '50.00' or '50'"))
}

fn print_account(account: &Account) {
    println!("Account:      {}", account.id);
    println!("Holder:       {}", account.full_name);
    println!("Balance:      {}", format_cents(account.balance));
    println!("Credit limit: {}", format_cents(account.credit_limit));
    println!("Available:    {}", format_cents(account.available()));
    println!(
        "Transfer key: {}",
        account
            .transfer_key
            .as_ref()
            .map(|k| k.as_str())
            .unwrap_or("(none)")
    );
}

fn print_statement(statement: &Statement) {
    println!(
        "Account {}  balance {}  limit {}  as of {}",
        statement.account_id,
        format_cents(statement.balance),
        format_cents(statement.credit_limit),
        statement.as_of.format("%Y-%m-%d %H:%M:%S")
    );

    if statement.transactions.is_empty() {
        println!("No transactions yet");
        return;
    }

    println!();
    for t in &statement.transactions {
        println!(
            "{:>6}  {}  {:<6} {:>12}  {:<10} {}",
            t.id,
            t.completed_at.format("%Y-%m-%d %H:%M:%S"),
            t.kind.as_str(),
            format_cents(t.kind.signed(t.amount)),
            t.description,
            t.counterparty
        );
    }
}
