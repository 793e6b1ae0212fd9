use alloy_primitives::{Address, U256};
use std::sync::Arc;
use tracing::info;

use super::proxy::PuzzleProxy;
use super::wallet::{self, PuzzleWallet};
use super::{unknown_method, Contract};
use crate::abi::{Call, Value};
use crate::constants::wallet_init_max_balance;
use crate::errors::SimError;
use crate::layout::Layout;
use crate::simulator::{Event, Frame};

pub const CREATE_INSTANCE: &str = "createInstance()";

/// Level factory: deploys a proxied, pre-funded `PuzzleWallet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PuzzleWalletFactory;

impl PuzzleWalletFactory {
    fn create_instance(frame: &mut Frame<'_>) -> Result<Value, SimError> {
        let value = frame.msg_value();
        if value.is_zero() {
            return Err(SimError::ValueRequired(CREATE_INSTANCE.to_string()));
        }
        let factory = frame.this();

        let logic = frame.create(Arc::new(PuzzleWallet), &Call::constructor(vec![]), U256::ZERO)?;
        let init = wallet::init(wallet_init_max_balance());
        let proxy = frame.create(
            Arc::new(PuzzleProxy),
            &PuzzleProxy::constructor(factory, logic, init),
            U256::ZERO,
        )?;

        frame.call(proxy, &wallet::add_to_whitelist(factory), U256::ZERO)?;
        frame.call(proxy, &wallet::deposit(), value)?;

        frame.emit(Event::InstanceCreated { wallet: proxy });
        info!(target: "sim::factory", %proxy, %logic, %value, "instance created");
        Ok(Value::Address(proxy))
    }
}

impl Contract for PuzzleWalletFactory {
    fn name(&self) -> &'static str {
        "PuzzleWalletFactory"
    }

    fn layout(&self) -> Layout {
        Layout::new("PuzzleWalletFactory")
    }

    fn call(&self, frame: &mut Frame<'_>, call: &Call) -> Result<Value, SimError> {
        match call.signature() {
            CREATE_INSTANCE => Self::create_instance(frame),
            _ => Err(unknown_method(self.name(), call)),
        }
    }
}

pub fn create_instance() -> Call {
    Call::new(CREATE_INSTANCE, vec![])
}

/// Address the `n`-th `createInstance` call of `factory` returns.
///
/// Each call creates two instances (logic, then proxy); the factory's nonce
/// starts at 1.
pub fn predicted_wallet(factory: Address, n: u64) -> Address {
    factory.create(2 * n + 2)
}
