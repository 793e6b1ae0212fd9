use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::accounts::{default_prefund_balance, NamedAccounts};
use crate::constants::{ether, DEFAULT_MAX_CALL_DEPTH};

/// How the wallet's "deposit once per batch" rule is scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchGuard {
    /// The flag lives in each `multicall` frame, so a nested `multicall`
    /// starts fresh and `msg.value` is credited again.
    #[default]
    Bypassable,
    /// `msg.value` is credited at most once per value-carrying call; deposits
    /// delegated from a call that already credited it add nothing.
    Enforced,
}

/// Simulator behaviour switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimConfig {
    /// Scope of the batched-deposit guard
    pub batch_guard: BatchGuard,
    /// Maximum nested call depth before `CallDepthExceeded`
    pub max_call_depth: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            batch_guard: BatchGuard::Bypassable,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl SimConfig {
    /// The patched variant: batched deposits cannot double-credit.
    pub fn patched() -> Self {
        Self {
            batch_guard: BatchGuard::Enforced,
            ..Default::default()
        }
    }

    /// Override the batch guard.
    pub fn with_batch_guard(mut self, guard: BatchGuard) -> Self {
        self.batch_guard = guard;
        self
    }

    /// Override the call depth limit.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Parse from JSON; missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Inputs of the hijack scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenarioConfig {
    /// Simulator switches
    pub sim: SimConfig,
    /// Signing roles
    pub accounts: NamedAccounts,
    /// Starting ether of every named account
    pub prefund: U256,
    /// Value the deployer sends to `createInstance`
    pub instance_deposit: U256,
    /// Value the hacker sends with the batched deposit
    pub attack_deposit: U256,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            accounts: NamedAccounts::default(),
            prefund: default_prefund_balance(),
            instance_deposit: ether(1),
            attack_deposit: ether(1),
        }
    }
}

impl ScenarioConfig {
    /// Parse from JSON; missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
