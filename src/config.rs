//! Runtime settings
//!
//! Loaded from a TOML file, falling back to the embedded `config.toml`.
//! Amounts are exact decimals; write them as strings in the file.

use crate::domain::account::{Amount, Balance, UserId};
use crate::domain::withdrawal::RefundPolicy;
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub admin: AdminSettings,
    pub rewards: RewardSettings,
    pub withdrawals: WithdrawalSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSettings {
    /// The only identity allowed to resolve withdrawals.
    pub id: UserId,
    /// Contact handle shown to users.
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardSettings {
    /// Credit for each solved challenge.
    pub per_challenge: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalSettings {
    /// Global floor checked before a rail can be picked.
    pub min_withdrawal: Decimal,
    #[serde(default)]
    pub refund_policy: RefundPolicy,
    /// How long an address capture may stay open.
    #[serde(default = "default_draft_ttl_secs")]
    pub draft_ttl_secs: u64,
}

fn default_draft_ttl_secs() -> u64 {
    900
}

impl Settings {
    /// Load from a specific path, or the embedded defaults when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings: Settings = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content).map_err(|e| {
                    EngineError::Config(format!("Failed to parse {}: {e}", path.display()))
                })?
            }
            None => toml::from_str(DEFAULT_CONFIG)
                .map_err(|e| EngineError::Config(format!("Failed to parse default config: {e}")))?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rewards.per_challenge <= Decimal::ZERO {
            return Err(EngineError::Config(
                "rewards.per_challenge must be positive".to_string(),
            ));
        }
        if self.withdrawals.min_withdrawal.is_sign_negative() {
            return Err(EngineError::Config(
                "withdrawals.min_withdrawal cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn reward(&self) -> Result<Amount> {
        Amount::new(self.rewards.per_challenge)
    }

    pub fn min_withdrawal(&self) -> Result<Balance> {
        Balance::new(self.withdrawals.min_withdrawal)
    }

    pub fn draft_ttl(&self) -> Duration {
        Duration::from_secs(self.withdrawals.draft_ttl_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        // Only reachable with a broken embedded config.toml.
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            admin: AdminSettings {
                id: 0,
                username: String::new(),
            },
            rewards: RewardSettings {
                per_challenge: Decimal::new(5, 3),
            },
            withdrawals: WithdrawalSettings {
                min_withdrawal: Decimal::new(500, 2),
                refund_policy: RefundPolicy::Overwrite,
                draft_ttl_secs: default_draft_ttl_secs(),
            },
        })
    }
}
