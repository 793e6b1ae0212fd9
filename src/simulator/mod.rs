//! Storage-slot-aware contract state simulator.
//!
//! Holds every deployed instance, the slot store, the ether ledger and the
//! account nonces for one session, and replays operations against them in the
//! order they are issued:
//!
//! ```text
//!   deploy(contract)        → address (CREATE rule), state Deployed
//!   construct / create      → constructor frame, state Active
//!   call(from, to, call)    → frame(this = to, code = to)
//!   delegate_call(ctx, code)→ frame(this = ctx, code = code, layout = code's)
//!   read_slot / get_balance → inspection
//! ```
//!
//! Each top-level operation is one transaction: it either commits and yields a
//! [`Receipt`], or fails and is unwound through the journal, leaving no trace.
//! Everything is synchronous and single-threaded; the session owns its state.

pub mod frame;
pub mod receipt;

pub use frame::Frame;
pub use receipt::{Event, Log, Receipt};

use alloy_primitives::{Address, B256, U256};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::abi::{Call, Value};
use crate::config::SimConfig;
use crate::constants::CONTRACT_INITIAL_NONCE;
use crate::contracts::Contract;
use crate::errors::SimError;
use crate::journal::{Checkpoint, Journal, JournalEntry};
use crate::layout::Layout;
use crate::storage::{Ledger, SlotStore};
use frame::Message;

/// Lifecycle of a simulated instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InstanceState {
    /// Slot space allocated, constructor not yet run
    Deployed,
    /// Constructor done; accepts calls
    Active,
}

/// A deployed contract: its logic, layout and lifecycle state
#[derive(Debug, Clone)]
pub struct Instance {
    logic: Arc<dyn Contract>,
    layout: Arc<Layout>,
    state: InstanceState,
    deployer: Address,
}

impl Instance {
    pub fn name(&self) -> &'static str {
        self.logic.name()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    /// Size of the declared slot space.
    pub fn declared_slots(&self) -> usize {
        self.layout.len()
    }
}

/// One simulation session
#[derive(Debug, Default)]
pub struct Simulator {
    config: SimConfig,
    instances: HashMap<Address, Instance>,
    store: SlotStore,
    ledger: Ledger,
    nonces: HashMap<Address, u64>,
    journal: Journal,
    /// Logs of the running transaction
    logs: Vec<Log>,
    /// Value-carrying calls whose deposit credit was taken this transaction
    credits: HashSet<u64>,
    /// Last issued call id
    call_ids: u64,
    tx_count: u64,
}

impl Simulator {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of committed transactions.
    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }

    // ── Deployment ────────────────────────────────────────────────────────────

    /// Allocate a zeroed instance of `contract` at the deployer's next CREATE address.
    ///
    /// The instance starts [`InstanceState::Deployed`]; run [`Self::construct`]
    /// to activate it.
    pub fn deploy(&mut self, deployer: Address, contract: Arc<dyn Contract>) -> Address {
        let address = self.allocate(deployer, contract);
        self.journal.clear();
        address
    }

    /// Run the constructor of a deployed instance.
    pub fn construct(
        &mut self,
        from: Address,
        instance: Address,
        args: &Call,
        value: U256,
    ) -> Result<Receipt, SimError> {
        self.instance(instance)?;
        self.transact(from, Some(instance), |sim| {
            let call_id = sim.next_call_id();
            sim.run_constructor(Message::call(from, instance, value, 0, call_id), args)?;
            Ok((Value::None, Some(instance)))
        })
    }

    /// Deploy and construct in one transaction; nothing remains if the constructor fails.
    pub fn create(
        &mut self,
        from: Address,
        contract: Arc<dyn Contract>,
        args: &Call,
        value: U256,
    ) -> Result<Receipt, SimError> {
        self.transact(from, None, |sim| {
            let address = sim.create_instance(from, contract, args, value, 0)?;
            Ok((Value::Address(address), Some(address)))
        })
    }

    // ── Transactions ──────────────────────────────────────────────────────────

    /// Call `to` with `value` attached.
    pub fn call(
        &mut self,
        from: Address,
        to: Address,
        call: &Call,
        value: U256,
    ) -> Result<Receipt, SimError> {
        self.instance(to)?;
        self.transact(from, Some(to), |sim| {
            let call_id = sim.next_call_id();
            let output = sim.execute(Message::call(from, to, value, 0, call_id), call)?;
            Ok((output, None))
        })
    }

    /// Run `code`'s logic against `context`'s slot space.
    ///
    /// Variables resolve through `code`'s layout, so a write to its N-th
    /// variable lands in `context`'s slot N whatever `context` declares there.
    pub fn delegate_call(
        &mut self,
        from: Address,
        context: Address,
        code: Address,
        call: &Call,
    ) -> Result<Receipt, SimError> {
        self.instance(context)?;
        self.instance(code)?;
        self.transact(from, Some(context), |sim| {
            let call_id = sim.next_call_id();
            let msg = Message::delegate(context, code, from, U256::ZERO, 0, call_id);
            let output = sim.execute(msg, call)?;
            Ok((output, None))
        })
    }

    /// Plain value transfer (no calldata) to any account.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<Receipt, SimError> {
        self.transact(from, Some(to), |sim| {
            let call_id = sim.next_call_id();
            let msg = Message::call(from, to, amount, 0, call_id);
            let output = sim.execute(msg, &Call::empty())?;
            Ok((output, None))
        })
    }

    /// Execute a call and discard all of its effects.
    pub fn view(&mut self, from: Address, to: Address, call: &Call) -> Result<Value, SimError> {
        self.instance(to)?;
        self.begin_transaction();
        let call_id = self.next_call_id();
        let result = self.execute(Message::call(from, to, U256::ZERO, 0, call_id), call);
        self.revert_to(Checkpoint::default());
        result
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    pub fn instance(&self, address: Address) -> Result<&Instance, SimError> {
        self.instances
            .get(&address)
            .ok_or(SimError::UnknownInstance(address))
    }

    pub fn is_instance(&self, address: Address) -> bool {
        self.instances.contains_key(&address)
    }

    pub fn instance_state(&self, address: Address) -> Result<InstanceState, SimError> {
        self.instance(address).map(Instance::state)
    }

    /// Raw slot value, zero if never written.
    pub fn read_slot(&self, instance: Address, slot: U256) -> Result<B256, SimError> {
        self.instance(instance)?;
        Ok(self.store.read(instance, slot))
    }

    /// Raw slot value for an index inside the declared range.
    pub fn read_declared_slot(&self, instance: Address, index: u64) -> Result<B256, SimError> {
        let declared = self.instance(instance)?.declared_slots();
        if index >= declared as u64 {
            return Err(SimError::InvalidSlotIndex {
                instance,
                index,
                declared,
            });
        }
        Ok(self.store.read(instance, U256::from(index)))
    }

    /// Read `instance`'s own declared variable.
    pub fn read_variable(&self, instance: Address, name: &str) -> Result<B256, SimError> {
        self.read_variable_as(instance, instance, name)
    }

    /// Read `instance`'s slots through the layout of `layout_of`.
    ///
    /// This is how the storage looks to code delegated into it.
    pub fn read_variable_as(
        &self,
        instance: Address,
        layout_of: Address,
        name: &str,
    ) -> Result<B256, SimError> {
        self.instance(instance)?;
        let slot = self.instance(layout_of)?.layout.slot_of(name)?;
        Ok(self.store.read(instance, slot))
    }

    pub fn storage(&self) -> &SlotStore {
        &self.store
    }

    /// Ether balance of a deployed instance.
    pub fn get_balance(&self, instance: Address) -> Result<U256, SimError> {
        self.instance(instance)?;
        Ok(self.ledger.balance(instance))
    }

    /// Ether balance of any account.
    pub fn balance_of(&self, account: Address) -> U256 {
        self.ledger.balance(account)
    }

    pub fn nonce(&self, account: Address) -> u64 {
        self.nonces.get(&account).copied().unwrap_or_default()
    }

    // ── Ledger (outside transactions) ─────────────────────────────────────────

    /// Mint ether to an account; fails without effect on overflow.
    pub fn credit(&mut self, account: Address, amount: U256) -> Result<U256, SimError> {
        self.ledger.credit(account, amount)
    }

    /// Burn ether from an account; fails without effect on overdraft.
    pub fn debit(&mut self, account: Address, amount: U256) -> Result<U256, SimError> {
        self.ledger.debit(account, amount)
    }

    // ── Execution internals ───────────────────────────────────────────────────

    fn begin_transaction(&mut self) {
        self.journal.clear();
        self.logs.clear();
        self.credits.clear();
    }

    fn transact<F>(
        &mut self,
        from: Address,
        to: Option<Address>,
        run: F,
    ) -> Result<Receipt, SimError>
    where
        F: FnOnce(&mut Self) -> Result<(Value, Option<Address>), SimError>,
    {
        self.begin_transaction();
        match run(self) {
            Ok((output, contract_address)) => {
                let tx_index = self.tx_count;
                self.tx_count += 1;
                let diff = self.journal.diff_since(
                    Checkpoint::default(),
                    tx_index,
                    &self.store,
                    &self.ledger,
                    &self.nonces,
                );
                debug!(target: "sim::tx", %from, summary = %diff.summary(), "committed");
                self.journal.clear();
                self.credits.clear();
                Ok(Receipt {
                    tx_index,
                    from,
                    to,
                    contract_address,
                    output,
                    logs: std::mem::take(&mut self.logs),
                    diff,
                })
            }
            Err(err) => {
                self.revert_to(Checkpoint::default());
                debug!(target: "sim::tx", %from, error = %err, "reverted");
                Err(err)
            }
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            entries: self.journal.len(),
            logs: self.logs.len(),
        }
    }

    fn revert_to(&mut self, checkpoint: Checkpoint) {
        for entry in self.journal.unwind(checkpoint) {
            match entry {
                JournalEntry::Storage {
                    address,
                    slot,
                    previous,
                } => {
                    self.store.write(address, slot, previous);
                }
                JournalEntry::Balance { address, previous } => self.ledger.set(address, previous),
                JournalEntry::Nonce { address, previous } => {
                    self.nonces.insert(address, previous);
                }
                JournalEntry::Created { address } => {
                    self.instances.remove(&address);
                    self.store.remove_account(&address);
                    self.nonces.remove(&address);
                }
                JournalEntry::Activated { address } => {
                    if let Some(instance) = self.instances.get_mut(&address) {
                        instance.state = InstanceState::Deployed;
                    }
                }
                JournalEntry::CreditClaimed { call_id } => {
                    self.credits.remove(&call_id);
                }
            }
        }
        self.logs.truncate(checkpoint.logs);
    }

    /// Run `f`; on error unwind everything it did.
    fn scoped<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SimError>,
    ) -> Result<T, SimError> {
        let checkpoint = self.checkpoint();
        let result = f(self);
        if result.is_err() {
            self.revert_to(checkpoint);
        }
        result
    }

    fn set_nonce(&mut self, account: Address, nonce: u64) {
        let previous = self.nonce(account);
        self.journal.record(JournalEntry::Nonce {
            address: account,
            previous,
        });
        self.nonces.insert(account, nonce);
    }

    fn allocate(&mut self, deployer: Address, contract: Arc<dyn Contract>) -> Address {
        let nonce = self.nonce(deployer);
        self.set_nonce(deployer, nonce + 1);
        let address = deployer.create(nonce);

        let layout = Arc::new(contract.layout());
        info!(
            target: "sim::deploy",
            contract = contract.name(),
            %address,
            %deployer,
            declared_slots = layout.len(),
            "allocated instance"
        );
        self.store.allocate(address);
        self.instances.insert(
            address,
            Instance {
                logic: contract,
                layout,
                state: InstanceState::Deployed,
                deployer,
            },
        );
        self.journal.record(JournalEntry::Created { address });
        self.set_nonce(address, CONTRACT_INITIAL_NONCE);
        address
    }

    pub(crate) fn create_instance(
        &mut self,
        deployer: Address,
        contract: Arc<dyn Contract>,
        args: &Call,
        value: U256,
        depth: usize,
    ) -> Result<Address, SimError> {
        if depth > self.config.max_call_depth {
            return Err(SimError::CallDepthExceeded(depth));
        }
        self.scoped(|sim| {
            let address = sim.allocate(deployer, contract);
            let call_id = sim.next_call_id();
            sim.run_constructor(Message::call(deployer, address, value, depth, call_id), args)?;
            Ok(address)
        })
    }

    fn run_constructor(&mut self, msg: Message, args: &Call) -> Result<(), SimError> {
        self.scoped(|sim| {
            let instance = sim.instance(msg.this)?;
            if instance.state == InstanceState::Active {
                return Err(SimError::AlreadyActive(msg.this));
            }
            let logic = Arc::clone(&instance.logic);
            let layout = Arc::clone(&instance.layout);

            sim.transfer_value(msg.sender, msg.this, msg.value)?;
            logic.construct(&mut Frame::new(sim, msg, layout), args)?;

            if let Some(instance) = sim.instances.get_mut(&msg.this) {
                instance.state = InstanceState::Active;
            }
            sim.journal.record(JournalEntry::Activated { address: msg.this });
            debug!(
                target: "sim::deploy",
                contract = logic.name(),
                address = %msg.this,
                "constructed"
            );
            Ok(())
        })
    }

    pub(crate) fn execute(&mut self, msg: Message, call: &Call) -> Result<Value, SimError> {
        if msg.depth > self.config.max_call_depth {
            return Err(SimError::CallDepthExceeded(msg.depth));
        }
        self.scoped(|sim| {
            if msg.transfer {
                sim.transfer_value(msg.sender, msg.this, msg.value)?;
            }
            // no code: externally owned account
            let Some(instance) = sim.instances.get(&msg.code) else {
                return Ok(Value::None);
            };
            if instance.state != InstanceState::Active {
                return Err(SimError::InstanceNotActive(msg.code));
            }
            let logic = Arc::clone(&instance.logic);
            let layout = Arc::clone(&instance.layout);

            if msg.this != msg.code {
                let aliases = sim
                    .instances
                    .get(&msg.this)
                    .map(|owner| owner.layout.aliases(&layout))
                    .unwrap_or_default();
                debug!(
                    target: "sim::call",
                    context = %msg.this,
                    code = logic.name(),
                    method = call.signature(),
                    aliased_slots = aliases.len(),
                    depth = msg.depth,
                    "delegating"
                );
            } else {
                debug!(
                    target: "sim::call",
                    to = %msg.this,
                    contract = logic.name(),
                    method = call.signature(),
                    sender = %msg.sender,
                    value = %msg.value,
                    depth = msg.depth,
                    "calling"
                );
            }
            logic.call(&mut Frame::new(sim, msg, layout), call)
        })
    }

    fn transfer_value(&mut self, from: Address, to: Address, amount: U256) -> Result<(), SimError> {
        if amount.is_zero() {
            return Ok(());
        }
        let from_before = self.ledger.balance(from);
        self.ledger.debit(from, amount)?;
        self.journal.record(JournalEntry::Balance {
            address: from,
            previous: from_before,
        });
        let to_before = self.ledger.balance(to);
        self.ledger.credit(to, amount)?;
        self.journal.record(JournalEntry::Balance {
            address: to,
            previous: to_before,
        });
        Ok(())
    }

    pub(crate) fn write_slot(&mut self, address: Address, slot: U256, value: B256) {
        let previous = self.store.write(address, slot, value);
        trace!(target: "sim::storage", %address, %slot, %previous, %value, "sstore");
        self.journal.record(JournalEntry::Storage {
            address,
            slot,
            previous,
        });
    }

    pub(crate) fn push_log(&mut self, log: Log) {
        self.logs.push(log);
    }

    pub(crate) fn next_call_id(&mut self) -> u64 {
        self.call_ids += 1;
        self.call_ids
    }

    pub(crate) fn claim_credit(&mut self, call_id: u64) -> bool {
        let claimed = self.credits.insert(call_id);
        if claimed {
            self.journal.record(JournalEntry::CreditClaimed { call_id });
        }
        claimed
    }
}
