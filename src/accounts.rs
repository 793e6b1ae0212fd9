use alloy_primitives::{address, Address, U256};
use serde::{Deserialize, Serialize};

use crate::constants::ether;

/// Default balance for prefunded accounts (10,000 ETH in wei)
pub fn default_prefund_balance() -> U256 {
    ether(10_000)
}

/// Standard dev mnemonic accounts (derived from "test test test test test test test test test test test junk")
pub fn dev_accounts() -> Vec<Address> {
    vec![
        address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
        address!("70997970C51812dc3A010C7d01b50e0d17dc79C8"),
        address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"),
        address!("90F79bf6EB2c4f870365E785982E1f101E93b906"),
        address!("15d34AAf54267DB7D7c367839AAf71A00a2C6A65"),
    ]
}

/// Roles the deploy scripts and the scenario sign with.
///
/// Passed explicitly to every script; nothing looks these up globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedAccounts {
    /// Deploys the factory and pays for wallet instances
    pub deployer: Address,
    /// The external actor
    pub hacker: Address,
}

impl Default for NamedAccounts {
    fn default() -> Self {
        let accounts = dev_accounts();
        Self {
            deployer: accounts[0],
            hacker: accounts[1],
        }
    }
}

impl NamedAccounts {
    /// Every named account, deployer first.
    pub fn all(&self) -> [Address; 2] {
        [self.deployer, self.hacker]
    }
}
