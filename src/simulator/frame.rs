use alloy_primitives::{Address, B256, U256};
use std::sync::Arc;

use super::receipt::{Event, Log};
use super::Simulator;
use crate::abi::{Call, Value};
use crate::config::SimConfig;
use crate::contracts::Contract;
use crate::errors::SimError;
use crate::layout::{mapping_address_slot, Layout};

/// Environment of one frame
#[derive(Debug, Clone, Copy)]
pub(crate) struct Message {
    /// Storage owner (`address(this)`)
    pub this: Address,
    /// Account whose logic runs
    pub code: Address,
    pub sender: Address,
    pub value: U256,
    /// Whether `value` moves from `sender` to `this` before the logic runs
    pub transfer: bool,
    pub depth: usize,
    /// Id of the value-carrying call this frame runs under; delegated frames inherit it
    pub call_id: u64,
}

impl Message {
    /// Regular call: `to` is both storage owner and code.
    pub(crate) fn call(
        sender: Address,
        to: Address,
        value: U256,
        depth: usize,
        call_id: u64,
    ) -> Self {
        Self {
            this: to,
            code: to,
            sender,
            value,
            transfer: true,
            depth,
            call_id,
        }
    }

    /// Delegated call: `code` runs over `context`'s storage, keeping sender and value.
    pub(crate) fn delegate(
        context: Address,
        code: Address,
        sender: Address,
        value: U256,
        depth: usize,
        call_id: u64,
    ) -> Self {
        Self {
            this: context,
            code,
            sender,
            value,
            transfer: false,
            depth,
            call_id,
        }
    }
}

/// One activation of contract logic.
///
/// Storage access goes through the frame's layout, which is the layout of the
/// *executing code*, applied to the slot space of [`Frame::this`]. In a
/// delegated frame those belong to different instances.
pub struct Frame<'a> {
    sim: &'a mut Simulator,
    msg: Message,
    layout: Arc<Layout>,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(sim: &'a mut Simulator, msg: Message, layout: Arc<Layout>) -> Self {
        Self { sim, msg, layout }
    }

    /// Storage owner (`address(this)`).
    pub fn this(&self) -> Address {
        self.msg.this
    }

    pub fn msg_sender(&self) -> Address {
        self.msg.sender
    }

    pub fn msg_value(&self) -> U256 {
        self.msg.value
    }

    pub fn depth(&self) -> usize {
        self.msg.depth
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &SimConfig {
        self.sim.config()
    }

    // ── Storage ───────────────────────────────────────────────────────────────

    /// Read a declared variable of the executing layout from `this`'s slots.
    pub fn sload(&self, name: &str) -> Result<B256, SimError> {
        let slot = self.layout.slot_of(name)?;
        Ok(self.sload_slot(slot))
    }

    /// Write a declared variable of the executing layout into `this`'s slots.
    pub fn sstore(&mut self, name: &str, value: B256) -> Result<(), SimError> {
        let slot = self.layout.slot_of(name)?;
        self.sstore_slot(slot, value);
        Ok(())
    }

    /// Slot of `name[key]` for a declared `mapping(address => _)`.
    pub fn mapping_slot(&self, name: &str, key: Address) -> Result<U256, SimError> {
        Ok(mapping_address_slot(key, self.layout.slot_of(name)?))
    }

    pub fn sload_slot(&self, slot: U256) -> B256 {
        self.sim.storage().read(self.msg.this, slot)
    }

    pub fn sstore_slot(&mut self, slot: U256, value: B256) {
        self.sim.write_slot(self.msg.this, slot, value);
    }

    // ── Balances ──────────────────────────────────────────────────────────────

    /// `address(this).balance`
    pub fn balance(&self) -> U256 {
        self.sim.balance_of(self.msg.this)
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.sim.balance_of(account)
    }

    // ── Calls ─────────────────────────────────────────────────────────────────

    /// Call `to` from `this`, sending `value`.
    pub fn call(&mut self, to: Address, call: &Call, value: U256) -> Result<Value, SimError> {
        let call_id = self.sim.next_call_id();
        let msg = Message::call(self.msg.this, to, value, self.msg.depth + 1, call_id);
        self.sim.execute(msg, call)
    }

    /// Run `code`'s logic over `this`'s storage with the current sender and value.
    pub fn delegate_call(&mut self, code: Address, call: &Call) -> Result<Value, SimError> {
        let msg = Message::delegate(
            self.msg.this,
            code,
            self.msg.sender,
            self.msg.value,
            self.msg.depth + 1,
            self.msg.call_id,
        );
        self.sim.execute(msg, call)
    }

    /// Create a new instance owned by `this`.
    pub fn create(
        &mut self,
        contract: Arc<dyn Contract>,
        args: &Call,
        value: U256,
    ) -> Result<Address, SimError> {
        self.sim
            .create_instance(self.msg.this, contract, args, value, self.msg.depth + 1)
    }

    // ── Side channels ─────────────────────────────────────────────────────────

    pub fn emit(&mut self, event: Event) {
        self.sim.push_log(Log {
            emitter: self.msg.this,
            event,
        });
    }

    /// Claim the deposit credit of the value-carrying call this frame runs under.
    ///
    /// Returns `false` if a frame delegated from the same call already claimed it,
    /// i.e. the same `msg.value` is being counted again.
    pub fn claim_deposit_credit(&mut self) -> bool {
        self.sim.claim_credit(self.msg.call_id)
    }
}
