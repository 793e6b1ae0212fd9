use alloy_primitives::{Address, U256};
use tracing::debug;

use super::{unknown_method, Contract};
use crate::abi::{selectors, Call, Token, Value};
use crate::config::BatchGuard;
use crate::errors::SimError;
use crate::layout::{
    decode_address, decode_bool, decode_u256, encode_address, encode_bool, encode_u256, Layout,
    VarKind,
};
use crate::simulator::Frame;

pub const INIT: &str = "init(uint256)";
pub const SET_MAX_BALANCE: &str = "setMaxBalance(uint256)";
pub const ADD_TO_WHITELIST: &str = "addToWhitelist(address)";
pub const DEPOSIT: &str = "deposit()";
pub const EXECUTE: &str = "execute(address,uint256,bytes)";
pub const MULTICALL: &str = "multicall(bytes[])";
pub const OWNER: &str = "owner()";
pub const MAX_BALANCE: &str = "maxBalance()";
pub const WHITELISTED: &str = "whitelisted(address)";
pub const BALANCES: &str = "balances(address)";

/// Whitelisted ether wallet with batched calls.
///
/// Meant to run behind [`super::PuzzleProxy`]; its `owner` and `maxBalance`
/// then share slots 0 and 1 with the proxy's `pendingAdmin` and `admin`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PuzzleWallet;

impl PuzzleWallet {
    fn only_whitelisted(frame: &Frame<'_>) -> Result<(), SimError> {
        let slot = frame.mapping_slot("whitelisted", frame.msg_sender())?;
        if !decode_bool(frame.sload_slot(slot)) {
            return Err(SimError::NotWhitelisted);
        }
        Ok(())
    }

    fn deposit(frame: &mut Frame<'_>) -> Result<Value, SimError> {
        Self::only_whitelisted(frame)?;
        let max_balance = decode_u256(frame.sload("maxBalance")?);
        if frame.balance() > max_balance {
            return Err(SimError::MaxBalanceReached);
        }

        let guard = frame.config().batch_guard;
        let credited = match guard {
            BatchGuard::Bypassable => frame.msg_value(),
            // one credit per value-carrying call, however many delegated deposits reuse it
            BatchGuard::Enforced if frame.claim_deposit_credit() => frame.msg_value(),
            BatchGuard::Enforced => U256::ZERO,
        };

        let sender = frame.msg_sender();
        let slot = frame.mapping_slot("balances", sender)?;
        let balance = decode_u256(frame.sload_slot(slot));
        let balance = balance.checked_add(credited).ok_or(SimError::AdditionOverflow)?;
        frame.sstore_slot(slot, encode_u256(balance));
        debug!(target: "sim::wallet", %sender, %credited, depth = frame.depth(), "deposit");
        Ok(Value::None)
    }

    fn execute(frame: &mut Frame<'_>, call: &Call) -> Result<Value, SimError> {
        Self::only_whitelisted(frame)?;
        let to = call.address_arg(0)?;
        let value = call.uint_arg(1)?;
        let data = call.call_arg(2)?;

        let sender = frame.msg_sender();
        let slot = frame.mapping_slot("balances", sender)?;
        let deposited = decode_u256(frame.sload_slot(slot));
        if deposited < value {
            return Err(SimError::InsufficientDeposit {
                account: sender,
                deposited,
                requested: value,
            });
        }
        frame.sstore_slot(slot, encode_u256(deposited - value));
        frame.call(to, data, value)
    }

    fn multicall(frame: &mut Frame<'_>, call: &Call) -> Result<Value, SimError> {
        Self::only_whitelisted(frame)?;
        // local to this frame: a nested multicall starts over
        let mut deposit_called = false;
        for sub in call.calls_arg(0)? {
            if sub.selector() == Some(selectors::deposit()) {
                if deposit_called {
                    return Err(SimError::DepositAlreadyCalled);
                }
                deposit_called = true;
            }
            let this = frame.this();
            frame.delegate_call(this, sub)?;
        }
        Ok(Value::None)
    }
}

impl Contract for PuzzleWallet {
    fn name(&self) -> &'static str {
        "PuzzleWallet"
    }

    fn layout(&self) -> Layout {
        Layout::new("PuzzleWallet")
            .with("owner", VarKind::Address)
            .with("maxBalance", VarKind::Uint)
            .with("whitelisted", VarKind::Mapping)
            .with("balances", VarKind::Mapping)
    }

    fn call(&self, frame: &mut Frame<'_>, call: &Call) -> Result<Value, SimError> {
        match call.signature() {
            INIT => {
                if !decode_u256(frame.sload("maxBalance")?).is_zero() {
                    return Err(SimError::AlreadyInitialized);
                }
                frame.sstore("maxBalance", encode_u256(call.uint_arg(0)?))?;
                let sender = frame.msg_sender();
                frame.sstore("owner", encode_address(sender))?;
                Ok(Value::None)
            }
            SET_MAX_BALANCE => {
                Self::only_whitelisted(frame)?;
                if !frame.balance().is_zero() {
                    return Err(SimError::ContractBalanceNotZero);
                }
                frame.sstore("maxBalance", encode_u256(call.uint_arg(0)?))?;
                Ok(Value::None)
            }
            ADD_TO_WHITELIST => {
                if decode_address(frame.sload("owner")?) != frame.msg_sender() {
                    return Err(SimError::NotOwner);
                }
                let slot = frame.mapping_slot("whitelisted", call.address_arg(0)?)?;
                frame.sstore_slot(slot, encode_bool(true));
                Ok(Value::None)
            }
            DEPOSIT => Self::deposit(frame),
            EXECUTE => Self::execute(frame, call),
            MULTICALL => Self::multicall(frame, call),
            OWNER => Ok(Value::Address(decode_address(frame.sload("owner")?))),
            MAX_BALANCE => Ok(Value::Uint(decode_u256(frame.sload("maxBalance")?))),
            WHITELISTED => {
                let slot = frame.mapping_slot("whitelisted", call.address_arg(0)?)?;
                Ok(Value::Bool(decode_bool(frame.sload_slot(slot))))
            }
            BALANCES => {
                let slot = frame.mapping_slot("balances", call.address_arg(0)?)?;
                Ok(Value::Uint(decode_u256(frame.sload_slot(slot))))
            }
            // no receive or fallback
            _ => Err(unknown_method(self.name(), call)),
        }
    }
}

pub fn init(max_balance: U256) -> Call {
    Call::new(INIT, vec![Token::Uint(max_balance)])
}

pub fn set_max_balance(max_balance: U256) -> Call {
    Call::new(SET_MAX_BALANCE, vec![Token::Uint(max_balance)])
}

pub fn add_to_whitelist(account: Address) -> Call {
    Call::new(ADD_TO_WHITELIST, vec![Token::Address(account)])
}

pub fn deposit() -> Call {
    Call::new(DEPOSIT, vec![])
}

pub fn execute(to: Address, value: U256, data: Call) -> Call {
    Call::new(
        EXECUTE,
        vec![Token::Address(to), Token::Uint(value), Token::Call(data)],
    )
}

pub fn multicall(calls: Vec<Call>) -> Call {
    Call::new(MULTICALL, vec![Token::Calls(calls)])
}

/// `multicall([deposit(), multicall([deposit()])])`: two deposits under one `msg.value`.
pub fn nested_double_deposit() -> Call {
    multicall(vec![deposit(), multicall(vec![deposit()])])
}

pub fn owner() -> Call {
    Call::new(OWNER, vec![])
}

pub fn max_balance() -> Call {
    Call::new(MAX_BALANCE, vec![])
}

pub fn whitelisted(account: Address) -> Call {
    Call::new(WHITELISTED, vec![Token::Address(account)])
}

pub fn balances(account: Address) -> Call {
    Call::new(BALANCES, vec![Token::Address(account)])
}
