//! Ledger configuration.
//!
//! Defaults suit a classroom ledger; every field can be overridden through
//! `ZAKAT_*` environment variables.

use crate::core::account::AccountId;
use crate::storage::file_store::default_data_path;
use crate::types::amount::Amount;
use crate::utils::log::Level;
use ledger_derive::Error;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_DEFAULT_BALANCE: &str = "ZAKAT_DEFAULT_BALANCE";
pub const ENV_ACCOUNT: &str = "ZAKAT_ACCOUNT";
pub const ENV_GENESIS_SEED: &str = "ZAKAT_GENESIS_SEED";
pub const ENV_TAMPER_POLICY: &str = "ZAKAT_TAMPER_POLICY";
pub const ENV_LOG: &str = "ZAKAT_LOG";
pub const ENV_DATA: &str = "ZAKAT_DATA";

/// What `mine` does when the committed chain no longer validates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TamperPolicy {
    /// Refuse to mine and report the first invalid block.
    #[default]
    Reject,
    /// Log a warning and mine anyway.
    Flag,
}

impl FromStr for TamperPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(TamperPolicy::Reject),
            "flag" => Ok(TamperPolicy::Flag),
            _ => Err(ConfigError::InvalidValue {
                key: ENV_TAMPER_POLICY,
                value: s.to_string(),
                reason: "expected 'reject' or 'flag'".into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("cannot determine a data path: {0}")]
    NoDataPath(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Opening balance given to accounts registered without one.
    pub default_balance: Amount,
    /// Collection account credited with every transfer's zakat.
    pub zakat_account: AccountId,
    /// Seed key of the collection account.
    pub zakat_seed: String,
    /// Seed key sealing the genesis block, and the fallback mining seed.
    pub genesis_seed: String,
    pub tamper_policy: TamperPolicy,
    pub log_level: Level,
    /// Ledger file; `None` means the default under the home directory.
    pub data_path: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_balance: Amount::from_coins(200),
            zakat_account: AccountId::from("Zakat_Account"),
            zakat_seed: "0000".to_string(),
            genesis_seed: "0000".to_string(),
            tamper_policy: TamperPolicy::Reject,
            log_level: Level::Info,
            data_path: None,
        }
    }
}

impl LedgerConfig {
    /// Defaults overridden by whatever `ZAKAT_*` variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_DEFAULT_BALANCE) {
            let balance: Amount = value.parse().map_err(|e| ConfigError::InvalidValue {
                key: ENV_DEFAULT_BALANCE,
                value: value.clone(),
                reason: format!("{e}"),
            })?;
            if balance.is_negative() {
                return Err(ConfigError::InvalidValue {
                    key: ENV_DEFAULT_BALANCE,
                    value,
                    reason: "must not be negative".into(),
                });
            }
            config.default_balance = balance;
        }
        if let Some(value) = non_empty(lookup(ENV_ACCOUNT)) {
            config.zakat_account = AccountId::from(value);
        }
        if let Some(value) = non_empty(lookup(ENV_GENESIS_SEED)) {
            config.genesis_seed = value;
        }
        if let Some(value) = lookup(ENV_TAMPER_POLICY) {
            config.tamper_policy = value.parse()?;
        }
        if let Some(value) = lookup(ENV_LOG) {
            config.log_level = value.parse().map_err(|e| ConfigError::InvalidValue {
                key: ENV_LOG,
                value: value.clone(),
                reason: format!("{e}"),
            })?;
        }
        if let Some(value) = non_empty(lookup(ENV_DATA)) {
            config.data_path = Some(PathBuf::from(value));
        }

        Ok(config)
    }

    /// The configured ledger file, or `~/.zakat-ledger/ledger.bin`.
    pub fn resolve_data_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_path {
            Some(path) => Ok(path.clone()),
            None => default_data_path().map_err(|e| ConfigError::NoDataPath(e.to_string())),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.default_balance.to_string(), "200.00");
        assert_eq!(config.zakat_account.as_str(), "Zakat_Account");
        assert_eq!(config.genesis_seed, "0000");
        assert_eq!(config.tamper_policy, TamperPolicy::Reject);
        assert_eq!(config.log_level, Level::Info);
    }

    #[test]
    fn no_variables_gives_defaults() {
        assert_eq!(
            LedgerConfig::from_lookup(lookup(&[])).unwrap(),
            LedgerConfig::default()
        );
    }

    #[test]
    fn overrides_apply() {
        let config = LedgerConfig::from_lookup(lookup(&[
            (ENV_DEFAULT_BALANCE, "75.5"),
            (ENV_ACCOUNT, "Bait_ul_Mal"),
            (ENV_GENESIS_SEED, "9999"),
            (ENV_TAMPER_POLICY, "Flag"),
            (ENV_LOG, "debug"),
            (ENV_DATA, "/tmp/zakat.bin"),
        ]))
        .unwrap();
        assert_eq!(config.default_balance, "75.5".parse().unwrap());
        assert_eq!(config.zakat_account.as_str(), "Bait_ul_Mal");
        assert_eq!(config.genesis_seed, "9999");
        assert_eq!(config.tamper_policy, TamperPolicy::Flag);
        assert_eq!(config.log_level, Level::Debug);
        assert_eq!(
            config.resolve_data_path().unwrap(),
            PathBuf::from("/tmp/zakat.bin")
        );
    }

    #[test]
    fn blank_names_are_ignored() {
        let config = LedgerConfig::from_lookup(lookup(&[(ENV_ACCOUNT, "  ")])).unwrap();
        assert_eq!(config.zakat_account.as_str(), "Zakat_Account");
    }

    #[test]
    fn bad_values_are_reported() {
        for (key, value) in [
            (ENV_DEFAULT_BALANCE, "lots"),
            (ENV_DEFAULT_BALANCE, "-1"),
            (ENV_TAMPER_POLICY, "ignore"),
            (ENV_LOG, "verbose"),
        ] {
            match LedgerConfig::from_lookup(lookup(&[(key, value)])) {
                Err(ConfigError::InvalidValue { key: k, .. }) => assert_eq!(k, key),
                other => panic!("expected invalid {key}, got {other:?}"),
            }
        }
    }
}
