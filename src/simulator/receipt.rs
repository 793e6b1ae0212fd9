use alloy_primitives::Address;
use serde::Serialize;

use crate::abi::Value;
use crate::journal::StateDiff;

/// Events the simulated contracts emit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    /// Proxy implementation changed (EIP-1967 `Upgraded`)
    Upgraded { implementation: Address },
    /// Factory produced a new wallet (proxy address)
    InstanceCreated { wallet: Address },
}

/// An event together with the address that emitted it (`address(this)`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Log {
    pub emitter: Address,
    pub event: Event,
}

/// Outcome of a committed transaction
#[derive(Debug, Clone)]
pub struct Receipt {
    /// Sequence number within the simulator session
    pub tx_index: u64,
    pub from: Address,
    /// Target instance; `None` for contract creation
    pub to: Option<Address>,
    /// Instance created (or constructed) by this transaction
    pub contract_address: Option<Address>,
    /// Return value of the top-level call
    pub output: Value,
    /// Events in emission order
    pub logs: Vec<Log>,
    /// Storage and balance changes
    pub diff: StateDiff,
}

impl Receipt {
    /// Wallet address from the first `InstanceCreated` log, if any.
    pub fn created_wallet(&self) -> Option<Address> {
        self.logs.iter().find_map(|log| match log.event {
            Event::InstanceCreated { wallet } => Some(wallet),
            _ => None,
        })
    }

    /// Logs emitted by `emitter`.
    pub fn logs_from(&self, emitter: Address) -> impl Iterator<Item = &Log> + '_ {
        self.logs.iter().filter(move |log| log.emitter == emitter)
    }
}
