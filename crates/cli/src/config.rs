//! Operator configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `RANKFI_*` environment variables (`__` separates nested keys,
//! e.g. `RANKFI_REWARDS__MAX_DAILY_PER_ACCOUNT_TOKENS=20`).
//!
//! Amounts are whole tokens here since TOML integers stop at 64 bits.

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File as ConfigFile};
use rankfi_ledger::{Allocation, GenesisConfig, PolicyConfig, RemainderPolicy};
use rankfi_rewards::RewardConfig;
use rankfi_types::{tokens, AccountId, BasisPoints, BPS_DENOMINATOR};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    pub state_path: PathBuf,
    pub genesis: GenesisSettings,
    pub rewards: RewardSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenesisSettings {
    pub administrator: String,
    pub total_supply_tokens: u64,
    pub allocations: Vec<AllocationSettings>,
    /// Receives the split remainder; unset means it is never minted.
    pub remainder_account: Option<String>,
    pub trading_enabled: bool,
    pub limits_in_effect: bool,
    pub max_tx_tokens: u64,
    pub max_wallet_tokens: u64,
    pub exempt_accounts: Vec<String>,
    pub pool_accounts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AllocationSettings {
    pub account: String,
    pub bps: BasisPoints,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewardSettings {
    pub engine_account: Option<String>,
    pub max_reward_per_call_tokens: u64,
    pub max_daily_per_account_tokens: u64,
    pub signers: Vec<String>,
    /// Add the pool account to the ledger's exempt set at `init`.
    pub exempt_engine: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            state_path: PathBuf::from("rankfi-state.json"),
            genesis: GenesisSettings::default(),
            rewards: RewardSettings::default(),
        }
    }
}

impl Default for GenesisSettings {
    fn default() -> Self {
        let split: [(&str, BasisPoints); 7] = [
            ("@treasury", 2_500),
            ("@liquidity", 3_000),
            ("@rewards", 1_500),
            ("@team", 1_000),
            ("@marketing", 1_000),
            ("@partners", 500),
            ("@reserve", 500),
        ];
        Self {
            administrator: "@admin".to_string(),
            total_supply_tokens: 5_000_000_000,
            allocations: split
                .iter()
                .map(|(account, bps)| AllocationSettings {
                    account: account.to_string(),
                    bps: *bps,
                })
                .collect(),
            remainder_account: None,
            trading_enabled: false,
            limits_in_effect: true,
            max_tx_tokens: 50_000_000,
            max_wallet_tokens: 100_000_000,
            exempt_accounts: Vec::new(),
            pool_accounts: Vec::new(),
        }
    }
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            engine_account: None,
            max_reward_per_call_tokens: 5,
            max_daily_per_account_tokens: 50,
            signers: Vec::new(),
            exempt_engine: true,
        }
    }
}

impl AppConfig {
    /// Load defaults, then `path` (must exist if given), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                bail!(
                    "Configuration file {} not found (specified via --config)",
                    path.display()
                );
            }
            builder = builder.add_source(ConfigFile::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("RANKFI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("failed to assemble configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.administrator()?;

        let cumulative: u32 = self
            .genesis
            .allocations
            .iter()
            .map(|a| a.bps as u32)
            .sum();
        if cumulative as u128 > BPS_DENOMINATOR {
            bail!("genesis allocations sum to {cumulative} bps, more than {BPS_DENOMINATOR}");
        }
        if self.genesis.total_supply_tokens == 0 {
            bail!("genesis.total_supply_tokens must be positive");
        }
        Ok(())
    }

    /// Settings that load fine but are probably not what the operator meant.
    /// Logged by the caller once tracing is installed.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let rewards = &self.rewards;
        if rewards.max_reward_per_call_tokens > rewards.max_daily_per_account_tokens {
            warnings.push(format!(
                "rewards.max_reward_per_call_tokens ({}) exceeds rewards.max_daily_per_account_tokens ({})",
                rewards.max_reward_per_call_tokens, rewards.max_daily_per_account_tokens
            ));
        }
        warnings
    }

    pub fn administrator(&self) -> Result<AccountId> {
        parse_account(&self.genesis.administrator).context("genesis.administrator")
    }

    pub fn genesis_config(&self) -> Result<GenesisConfig> {
        let settings = &self.genesis;

        let allocations = settings
            .allocations
            .iter()
            .map(|a| Ok(Allocation::new(parse_account(&a.account)?, a.bps)))
            .collect::<Result<Vec<_>>>()
            .context("genesis.allocations")?;

        let remainder = match &settings.remainder_account {
            Some(account) => RemainderPolicy::AssignTo(
                parse_account(account).context("genesis.remainder_account")?,
            ),
            None => RemainderPolicy::Discard,
        };

        let policy = PolicyConfig {
            paused: false,
            trading_enabled: settings.trading_enabled,
            limits_in_effect: settings.limits_in_effect,
            max_tx_amount: tokens(settings.max_tx_tokens as u128),
            max_wallet_amount: tokens(settings.max_wallet_tokens as u128),
            exempt_accounts: parse_accounts(&settings.exempt_accounts)
                .context("genesis.exempt_accounts")?,
            pool_accounts: parse_accounts(&settings.pool_accounts)
                .context("genesis.pool_accounts")?,
        };

        Ok(GenesisConfig {
            administrator: self.administrator()?,
            nominal_supply: tokens(settings.total_supply_tokens as u128),
            allocations,
            remainder,
            policy,
        })
    }

    pub fn reward_config(&self) -> Result<RewardConfig> {
        let settings = &self.rewards;
        let account = settings
            .engine_account
            .as_deref()
            .map(parse_account)
            .transpose()
            .context("rewards.engine_account")?;

        Ok(RewardConfig {
            account,
            max_reward_per_call: tokens(settings.max_reward_per_call_tokens as u128),
            max_daily_per_account: tokens(settings.max_daily_per_account_tokens as u128),
            signers: parse_accounts(&settings.signers).context("rewards.signers")?,
        })
    }
}

/// `@label` or the `r`-prefixed hex form.
pub fn parse_account(value: &str) -> Result<AccountId> {
    value
        .parse::<AccountId>()
        .with_context(|| format!("invalid account {value:?}"))
}

fn parse_accounts(values: &[String]) -> Result<BTreeSet<AccountId>> {
    values.iter().map(|v| parse_account(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_reproduce_reference_genesis() {
        let config = AppConfig::default();
        config.validate().unwrap();
        let genesis = config.genesis_config().unwrap();
        let reference = GenesisConfig::reference(AccountId::from_label("admin"));
        assert_eq!(genesis.nominal_supply, reference.nominal_supply);
        assert_eq!(genesis.allocations, reference.allocations);
        assert_eq!(genesis.policy, reference.policy);
        assert_eq!(genesis.remainder, RemainderPolicy::Discard);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
log_level = "debug"
log_format = "pretty"

[genesis]
administrator = "@ops"
total_supply_tokens = 1000
remainder_account = "@reserve"
trading_enabled = true
allocations = [
  {{ account = "@a", bps = 6000 }},
  {{ account = "@b", bps = 3333 }},
]

[rewards]
max_daily_per_account_tokens = 20
signers = ["@game"]
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.administrator().unwrap(), AccountId::from_label("ops"));

        let genesis = config.genesis_config().unwrap();
        assert_eq!(genesis.allocations.len(), 2);
        assert!(genesis.policy.trading_enabled);
        assert_eq!(
            genesis.remainder,
            RemainderPolicy::AssignTo(AccountId::from_label("reserve"))
        );

        let rewards = config.reward_config().unwrap();
        assert_eq!(rewards.max_daily_per_account, tokens(20));
        assert_eq!(rewards.max_reward_per_call, tokens(5));
        assert!(rewards.signers.contains(&AccountId::from_label("game")));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_over_allocation_rejected() {
        let mut config = AppConfig::default();
        config.genesis.allocations.push(AllocationSettings {
            account: "@extra".to_string(),
            bps: 1,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_warnings_reported_not_logged() {
        let mut config = AppConfig::default();
        assert!(config.warnings().is_empty());

        config.rewards.max_reward_per_call_tokens = 60;
        config.validate().unwrap();
        let warnings = config.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("max_reward_per_call_tokens"));
    }

    #[test]
    fn test_bad_account_reported_with_key() {
        let mut config = AppConfig::default();
        config.rewards.signers = vec!["not-an-account".to_string()];
        let err = config.reward_config().unwrap_err();
        assert!(format!("{err:#}").contains("rewards.signers"));
    }
}
