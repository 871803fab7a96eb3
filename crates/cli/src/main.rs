//! RankFi Operator Command Line Interface
//!
//! Drives a ledger and its reward engine persisted in a local JSON state file.
//! Every mutating command loads the state, applies one operation as the
//! `--as` account (the configured administrator by default) and writes the
//! state back only if the operation succeeded.

mod config;
mod state;

use crate::config::{AppConfig, LogFormat};
use crate::state::StateFile;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rankfi_ledger::Ledger;
use rankfi_rewards::RewardEngine;
use rankfi_types::{
    format_amount, parse_amount, AccountId, Amount, ManualClock, SystemClock, TimeSource,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "rankfi")]
#[command(about = "RankFi ledger and reward administration", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// State file; overrides `state_path` from configuration
    #[arg(long, global = true, value_name = "PATH")]
    state: Option<PathBuf>,

    /// Use a fixed clock (unix seconds) instead of the system clock
    #[arg(long, global = true, value_name = "SECS")]
    now: Option<u64>,

    /// Account acting as caller (`@label` or address); defaults to the
    /// configured administrator
    #[arg(long = "as", global = true, value_name = "ACCOUNT")]
    caller: Option<AccountId>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl Switch {
    fn enabled(self) -> bool {
        self == Switch::On
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a state file from configuration (genesis + reward engine)
    Init {
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },
    /// Show an account balance
    Balance { account: AccountId },
    /// Show initial, current and burned supply
    Supply,
    /// Transfer tokens from the caller
    Transfer {
        to: AccountId,
        #[arg(value_parser = parse_token_amount)]
        amount: Amount,
    },
    /// Spend an allowance granted to the caller
    TransferFrom {
        owner: AccountId,
        to: AccountId,
        #[arg(value_parser = parse_token_amount)]
        amount: Amount,
    },
    /// Set the allowance `spender` may draw from the caller
    Approve {
        spender: AccountId,
        #[arg(value_parser = parse_token_amount)]
        amount: Amount,
    },
    /// Destroy tokens held by the caller
    Burn {
        #[arg(value_parser = parse_token_amount)]
        amount: Amount,
    },
    /// Transfer policy administration
    Policy {
        #[command(subcommand)]
        action: PolicyCommands,
    },
    /// Pay the tier reward for `metric` to `account` (caller must be a signer)
    Reward { account: AccountId, metric: u64 },
    /// Authorise or revoke a reward signer
    Signer { account: AccountId, toggle: Switch },
    /// Replace the per-call and per-account daily reward caps
    Caps {
        #[arg(value_parser = parse_token_amount)]
        max_per_call: Amount,
        #[arg(value_parser = parse_token_amount)]
        max_daily: Amount,
    },
    /// Move tokens from the caller into the reward pool (needs an approval)
    TopUp {
        #[arg(value_parser = parse_token_amount)]
        amount: Amount,
    },
    /// Move tokens out of the reward pool
    Rescue {
        to: AccountId,
        #[arg(value_parser = parse_token_amount)]
        amount: Amount,
    },
    /// Hand both ledger and engine administration to another account
    Handover { new_administrator: AccountId },
    /// Reward engine statistics and recent payouts
    Stats {
        /// Number of recent payouts to list
        #[arg(long, default_value_t = 10)]
        recent: usize,
    },
    /// Print the address derived from a label
    Address { label: String },
}

#[derive(Subcommand)]
enum PolicyCommands {
    /// Halt or resume every balance mutation
    Pause { toggle: Switch },
    /// Open or close trading between non-exempt accounts
    Trading { toggle: Switch },
    /// Update transaction and wallet caps
    Limits {
        #[arg(long, value_parser = parse_token_amount)]
        max_tx: Option<Amount>,
        #[arg(long, value_parser = parse_token_amount)]
        max_wallet: Option<Amount>,
        /// Turn cap enforcement on or off
        #[arg(long)]
        enforce: Option<Switch>,
    },
    /// Add or remove an account from the exempt set
    Exempt { account: AccountId, toggle: Switch },
    /// Mark or unmark an account as a pool (skips the wallet cap)
    Pool { account: AccountId, toggle: Switch },
    /// Print the current policy
    Show,
}

fn parse_token_amount(value: &str) -> Result<Amount, String> {
    parse_amount(value).ok_or_else(|| format!("invalid token amount {value:?}"))
}

/// Loaded state plus where it goes back to.
struct Session {
    path: PathBuf,
    caller: AccountId,
    ledger: Ledger,
    engine: RewardEngine,
}

impl Session {
    fn open(path: PathBuf, caller: AccountId, clock: Arc<dyn TimeSource>) -> Result<Self> {
        let (ledger, engine) = StateFile::load(&path)?.into_parts(clock);
        Ok(Self {
            path,
            caller,
            ledger,
            engine,
        })
    }

    fn commit(self) -> Result<()> {
        StateFile::new(self.ledger, &self.engine).save(&self.path)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config);
    for warning in config.warnings() {
        warn!("{warning}");
    }

    let clock: Arc<dyn TimeSource> = match cli.now {
        Some(secs) => Arc::new(ManualClock::new(secs)),
        None => Arc::new(SystemClock::new()),
    };
    let state_path = cli.state.unwrap_or_else(|| config.state_path.clone());
    let caller = match cli.caller {
        Some(caller) => caller,
        None => config.administrator()?,
    };

    match cli.command {
        Commands::Init { force } => handle_init(&config, state_path, force, clock),
        Commands::Address { label } => {
            if label.is_empty() {
                bail!("label must not be empty");
            }
            println!("{}", AccountId::from_label(&label));
            Ok(())
        }
        command => run_on_state(command, state_path, caller, clock),
    }
}

/// Load state, apply `command`, and write back only if it changed something.
fn run_on_state(
    command: Commands,
    path: PathBuf,
    caller: AccountId,
    clock: Arc<dyn TimeSource>,
) -> Result<()> {
    let mut session = Session::open(path, caller, clock)?;
    if handle_command(command, &mut session)? {
        session.commit()?;
    }
    Ok(())
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == LogFormat::Pretty {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn handle_init(
    config: &AppConfig,
    path: PathBuf,
    force: bool,
    clock: Arc<dyn TimeSource>,
) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "state {} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let administrator = config.administrator()?;
    let mut ledger =
        Ledger::genesis(config.genesis_config()?).context("genesis seeding failed")?;
    let engine = RewardEngine::new(administrator, config.reward_config()?, clock)?;
    if config.rewards.exempt_engine {
        ledger.set_limit_exempt(&administrator, &engine.account(), true)?;
    }

    let total_supply = ledger.total_supply();
    let ledger_account = ledger.account();
    StateFile::new(ledger, &engine).save(&path)?;
    info!(
        path = %path.display(),
        administrator = %administrator,
        "Initialised state"
    );

    println!("State written to {}", path.display());
    println!("Total supply: {}", format_amount(total_supply));
    println!("Ledger account: {}", ledger_account);
    println!("Reward pool account: {}", engine.account());
    Ok(())
}

/// Returns whether state changed and must be written back.
fn handle_command(command: Commands, session: &mut Session) -> Result<bool> {
    let caller = session.caller;
    let ledger = &mut session.ledger;
    let engine = &session.engine;

    match command {
        Commands::Init { .. } | Commands::Address { .. } => {
            bail!("command does not operate on loaded state")
        }
        Commands::Balance { account } => {
            println!("{}", format_amount(ledger.balance_of(&account)));
            Ok(false)
        }
        Commands::Supply => {
            print_json(&json!({
                "initial_supply": format_amount(ledger.initial_supply()),
                "total_supply": format_amount(ledger.total_supply()),
                "total_burned": format_amount(ledger.total_burned()),
                "consistent": ledger.supply_is_consistent(),
            }))?;
            Ok(false)
        }
        Commands::Transfer { to, amount } => {
            ledger.transfer(&caller, &to, amount)?;
            println!("Transferred {} to {}", format_amount(amount), to);
            Ok(true)
        }
        Commands::TransferFrom { owner, to, amount } => {
            ledger.transfer_from(&caller, &owner, &to, amount)?;
            println!(
                "Transferred {} from {} to {}",
                format_amount(amount),
                owner,
                to
            );
            Ok(true)
        }
        Commands::Approve { spender, amount } => {
            ledger.approve(&caller, &spender, amount)?;
            println!("Allowance for {} set to {}", spender, format_amount(amount));
            Ok(true)
        }
        Commands::Burn { amount } => {
            ledger.burn(&caller, amount)?;
            println!(
                "Burned {}; total supply now {}",
                format_amount(amount),
                format_amount(ledger.total_supply())
            );
            Ok(true)
        }
        Commands::Policy { action } => handle_policy_command(action, caller, ledger),
        Commands::Reward { account, metric } => {
            let record = engine.reward_player(&caller, &account, metric, ledger)?;
            println!(
                "Paid {} to {} (claimed today: {})",
                format_amount(record.amount),
                record.account,
                format_amount(engine.claimed_today(&account))
            );
            Ok(true)
        }
        Commands::Signer { account, toggle } => {
            engine.set_signer(&caller, &account, toggle.enabled())?;
            println!("Signer {}: {}", account, engine.is_signer(&account));
            Ok(true)
        }
        Commands::Caps {
            max_per_call,
            max_daily,
        } => {
            engine.set_caps(&caller, max_per_call, max_daily)?;
            println!(
                "Reward caps: {} per call, {} per account per day",
                format_amount(max_per_call),
                format_amount(max_daily)
            );
            Ok(true)
        }
        Commands::TopUp { amount } => {
            engine.top_up(&caller, amount, ledger)?;
            println!(
                "Pool balance: {}",
                format_amount(engine.pool_balance(&*ledger))
            );
            Ok(true)
        }
        Commands::Rescue { to, amount } => {
            engine.rescue(&caller, &to, amount, ledger)?;
            println!(
                "Rescued {} to {}; pool balance {}",
                format_amount(amount),
                to,
                format_amount(engine.pool_balance(&*ledger))
            );
            Ok(true)
        }
        Commands::Handover { new_administrator } => {
            ledger.transfer_administrator(&caller, new_administrator)?;
            engine.transfer_administrator(&caller, new_administrator)?;
            println!("Administrator is now {}", new_administrator);
            Ok(true)
        }
        Commands::Stats { recent } => {
            let (max_per_call, max_daily) = engine.caps();
            print_json(&json!({
                "engine_account": engine.account(),
                "administrator": engine.administrator(),
                "pool_balance": format_amount(engine.pool_balance(&*ledger)),
                "max_reward_per_call": format_amount(max_per_call),
                "max_daily_per_account": format_amount(max_daily),
                "signers": engine.signers(),
                "statistics": engine.get_statistics(),
                "recent_payouts": engine.recent_payouts(recent),
            }))?;
            Ok(false)
        }
    }
}

fn handle_policy_command(
    action: PolicyCommands,
    caller: AccountId,
    ledger: &mut Ledger,
) -> Result<bool> {
    match action {
        PolicyCommands::Pause { toggle } => {
            ledger.set_paused(&caller, toggle.enabled())?;
        }
        PolicyCommands::Trading { toggle } => {
            ledger.set_trading_enabled(&caller, toggle.enabled())?;
        }
        PolicyCommands::Limits {
            max_tx,
            max_wallet,
            enforce,
        } => {
            if max_tx.is_none() && max_wallet.is_none() && enforce.is_none() {
                bail!("nothing to change: pass --max-tx, --max-wallet or --enforce");
            }
            if max_tx.is_some() || max_wallet.is_some() {
                let current = ledger.policy();
                let max_tx = max_tx.unwrap_or(current.max_tx_amount);
                let max_wallet = max_wallet.unwrap_or(current.max_wallet_amount);
                ledger.set_limits(&caller, max_tx, max_wallet)?;
            }
            if let Some(enforce) = enforce {
                ledger.set_limits_in_effect(&caller, enforce.enabled())?;
            }
        }
        PolicyCommands::Exempt { account, toggle } => {
            ledger.set_limit_exempt(&caller, &account, toggle.enabled())?;
        }
        PolicyCommands::Pool { account, toggle } => {
            ledger.set_pool_account(&caller, &account, toggle.enabled())?;
        }
        PolicyCommands::Show => {
            print_json(ledger.policy())?;
            return Ok(false);
        }
    }

    print_json(ledger.policy())?;
    Ok(true)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
