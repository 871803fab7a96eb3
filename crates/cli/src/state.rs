//! Persisted ledger and engine state.
//!
//! One JSON document per deployment. Writes go to a sibling temp file that is
//! renamed over the target, so a crash never leaves a half-written state.

use anyhow::{bail, Context, Result};
use rankfi_ledger::Ledger;
use rankfi_rewards::{EngineState, RewardEngine};
use rankfi_types::TimeSource;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    pub ledger: Ledger,
    pub engine: EngineState,
}

impl StateFile {
    pub fn new(ledger: Ledger, engine: &RewardEngine) -> Self {
        Self {
            version: STATE_VERSION,
            ledger,
            engine: engine.snapshot(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| {
            format!(
                "failed to read state {} (run `rankfi init` first)",
                path.display()
            )
        })?;
        let state: StateFile = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse state {}", path.display()))?;

        if state.version != STATE_VERSION {
            bail!(
                "state {} has version {}, expected {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }
        if !state.ledger.supply_is_consistent() {
            bail!(
                "state {} is corrupt: balances do not sum to total supply",
                path.display()
            );
        }

        debug!(path = %path.display(), "Loaded state");
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).context("failed to encode state")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace state {}", path.display()))?;
        debug!(path = %path.display(), "Saved state");
        Ok(())
    }

    /// Split into a live ledger and engine.
    pub fn into_parts(self, clock: Arc<dyn TimeSource>) -> (Ledger, RewardEngine) {
        (self.ledger, RewardEngine::restore(self.engine, clock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankfi_ledger::GenesisConfig;
    use rankfi_rewards::RewardConfig;
    use rankfi_types::{tokens, AccountId, ManualClock};

    fn sample() -> (Ledger, RewardEngine) {
        let admin = AccountId::from_label("admin");
        let mut ledger = Ledger::genesis(GenesisConfig::reference(admin)).unwrap();
        let engine = RewardEngine::new(
            admin,
            RewardConfig::default(),
            Arc::new(ManualClock::new(0)),
        )
        .unwrap();
        ledger
            .approve(&admin, &AccountId::from_label("spender"), tokens(3))
            .unwrap();
        (ledger, engine)
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let (ledger, engine) = sample();

        StateFile::new(ledger.clone(), &engine).save(&path).unwrap();
        let loaded = StateFile::load(&path).unwrap();

        assert_eq!(loaded.ledger.total_supply(), ledger.total_supply());
        assert_eq!(
            loaded.ledger.allowance(
                &AccountId::from_label("admin"),
                &AccountId::from_label("spender")
            ),
            tokens(3)
        );
        assert_eq!(loaded.engine, engine.snapshot());
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_missing_state_mentions_init() {
        let dir = tempfile::tempdir().unwrap();
        let err = StateFile::load(&dir.path().join("none.json")).unwrap_err();
        assert!(err.to_string().contains("rankfi init"));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let (ledger, engine) = sample();
        let mut state = StateFile::new(ledger, &engine);
        state.version = 99;
        state.save(&path).unwrap();
        assert!(StateFile::load(&path).is_err());
    }
}
