//! Transaction journal and state diffs.
//!
//! Every mutation the simulator makes inside a transaction is recorded as a
//! [`JournalEntry`] holding the value it replaced. Unwinding entries back to a
//! [`Checkpoint`] restores the exact pre-state; this is how a failed frame or
//! transaction leaves storage, balances and instances untouched.
//!
//! When a transaction commits, the entries since its checkpoint are folded into
//! a [`StateDiff`] that lands on the receipt:
//!
//! ```text
//!   transaction → journal entries (undo log)
//!               → error?  unwind to checkpoint
//!               → success: StateDiffBuilder folds entries → StateDiff on Receipt
//! ```

use alloy_primitives::{Address, B256, U256};
use std::collections::HashMap;

use crate::storage::{Ledger, StorageReader};

// ── Undo log ──────────────────────────────────────────────────────────────────

/// One reversible mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    /// Slot written; `previous` is the value before the write
    Storage {
        address: Address,
        slot: U256,
        previous: B256,
    },
    /// Ether balance changed
    Balance { address: Address, previous: U256 },
    /// Account nonce changed
    Nonce { address: Address, previous: u64 },
    /// Instance allocated
    Created { address: Address },
    /// Instance constructor completed
    Activated { address: Address },
    /// Deposit credit of a value-carrying call claimed under the enforced batch guard
    CreditClaimed { call_id: u64 },
}

/// Position in the journal and the log list to unwind to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checkpoint {
    pub entries: usize,
    pub logs: usize,
}

/// Ordered undo log for the running transaction
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Forget everything (start of a new transaction).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove entries recorded after `checkpoint`, newest first.
    pub fn unwind(&mut self, checkpoint: Checkpoint) -> Vec<JournalEntry> {
        let start = checkpoint.entries.min(self.entries.len());
        let mut undone: Vec<_> = self.entries.drain(start..).collect();
        undone.reverse();
        undone
    }

    pub fn entries_since(&self, checkpoint: Checkpoint) -> &[JournalEntry] {
        let start = checkpoint.entries.min(self.entries.len());
        &self.entries[start..]
    }

    /// Fold the entries since `checkpoint` into a diff against current state.
    pub fn diff_since(
        &self,
        checkpoint: Checkpoint,
        tx_index: u64,
        store: &impl StorageReader,
        ledger: &Ledger,
        nonces: &HashMap<Address, u64>,
    ) -> StateDiff {
        // first recorded `previous` is the pre-transaction value
        let mut slots: HashMap<(Address, U256), B256> = HashMap::new();
        let mut balances: HashMap<Address, U256> = HashMap::new();
        let mut account_nonces: HashMap<Address, u64> = HashMap::new();
        let mut builder = StateDiffBuilder::new(tx_index);

        for entry in self.entries_since(checkpoint) {
            match entry {
                JournalEntry::Storage {
                    address,
                    slot,
                    previous,
                } => {
                    slots.entry((*address, *slot)).or_insert(*previous);
                }
                JournalEntry::Balance { address, previous } => {
                    balances.entry(*address).or_insert(*previous);
                }
                JournalEntry::Nonce { address, previous } => {
                    account_nonces.entry(*address).or_insert(*previous);
                }
                JournalEntry::Created { address } => builder.record_code_change(*address),
                JournalEntry::Activated { .. } | JournalEntry::CreditClaimed { .. } => {}
            }
        }

        for ((address, slot), old) in slots {
            let new = store.read_storage(address, slot).unwrap_or_default();
            builder.record_storage_change(address, slot, old, new);
        }
        for (address, old) in balances {
            builder.record_balance_change(address, old, ledger.balance(address));
        }
        for (address, old) in account_nonces {
            let new = nonces.get(&address).copied().unwrap_or_default();
            builder.record_nonce_change(address, old, new);
        }
        builder.build()
    }
}

// ── Per-account diff ──────────────────────────────────────────────────────────

/// Difference in a single storage slot value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSlotDiff {
    /// Value before the transaction executed.
    pub old_value: B256,
    /// Value after the transaction executed.
    pub new_value: B256,
}

impl StorageSlotDiff {
    pub fn new(old_value: B256, new_value: B256) -> Self {
        Self {
            old_value,
            new_value,
        }
    }
}

/// All changes to a single account during one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountDiff {
    /// Balance changes: (balance_before, balance_after).
    pub balance: Option<(U256, U256)>,
    /// Nonce changes: (nonce_before, nonce_after).
    pub nonce: Option<(u64, u64)>,
    /// Whether the account was created by this transaction.
    pub created: bool,
    /// Changed storage slots.
    pub storage: HashMap<U256, StorageSlotDiff>,
}

impl AccountDiff {
    /// Number of storage slots that changed.
    pub fn storage_change_count(&self) -> usize {
        self.storage.len()
    }

    /// Whether any field actually changed.
    pub fn is_empty(&self) -> bool {
        self.balance.is_none() && self.nonce.is_none() && !self.created && self.storage.is_empty()
    }
}

// ── Transaction-level diff ────────────────────────────────────────────────────

/// Complete state diff produced by one committed transaction.
///
/// A diff captures *exactly* what changed; nothing that stayed the same is included.
#[derive(Debug, Clone, Default)]
pub struct StateDiff {
    /// Sequence number of the transaction in its simulator session.
    pub tx_index: u64,
    /// Per-account changes. Accounts not in this map were untouched.
    pub changes: HashMap<Address, AccountDiff>,
}

impl StateDiff {
    /// Number of accounts touched by this transaction.
    pub fn touched_account_count(&self) -> usize {
        self.changes.len()
    }

    /// Total number of storage slots that changed.
    pub fn total_storage_changes(&self) -> usize {
        self.changes
            .values()
            .map(|a| a.storage_change_count())
            .sum()
    }

    /// Whether this transaction changed any state at all.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Return a one-line summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "tx={} accounts_touched={} storage_slots_changed={}",
            self.tx_index,
            self.touched_account_count(),
            self.total_storage_changes(),
        )
    }

    /// Get the diff for a specific account, if any.
    pub fn account_diff(&self, addr: &Address) -> Option<&AccountDiff> {
        self.changes.get(addr)
    }

    /// Get the new storage value for `(addr, slot)` after this transaction, if it changed.
    pub fn storage_after(&self, addr: &Address, slot: &U256) -> Option<B256> {
        self.changes
            .get(addr)
            .and_then(|a| a.storage.get(slot))
            .map(|d| d.new_value)
    }

    /// Balance change of `addr`, if any.
    pub fn balance_change(&self, addr: &Address) -> Option<(U256, U256)> {
        self.changes.get(addr).and_then(|a| a.balance)
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Incrementally builds a [`StateDiff`].
#[derive(Debug, Default)]
pub struct StateDiffBuilder {
    tx_index: u64,
    changes: HashMap<Address, AccountDiff>,
}

impl StateDiffBuilder {
    /// Create a new builder for the given transaction.
    pub fn new(tx_index: u64) -> Self {
        Self {
            tx_index,
            ..Default::default()
        }
    }

    /// Record a balance change for an account.
    pub fn record_balance_change(&mut self, addr: Address, old: U256, new: U256) {
        if old != new {
            self.changes.entry(addr).or_default().balance = Some((old, new));
        }
    }

    /// Record a nonce change for an account.
    pub fn record_nonce_change(&mut self, addr: Address, old: u64, new: u64) {
        if old != new {
            self.changes.entry(addr).or_default().nonce = Some((old, new));
        }
    }

    /// Mark that an account was created.
    pub fn record_code_change(&mut self, addr: Address) {
        self.changes.entry(addr).or_default().created = true;
    }

    /// Record a storage slot change for an account.
    pub fn record_storage_change(&mut self, addr: Address, slot: U256, old: B256, new: B256) {
        if old != new {
            self.changes
                .entry(addr)
                .or_default()
                .storage
                .insert(slot, StorageSlotDiff::new(old, new));
        }
    }

    /// Consume the builder and produce the final [`StateDiff`].
    pub fn build(self) -> StateDiff {
        StateDiff {
            tx_index: self.tx_index,
            changes: self.changes,
        }
    }
}

// ── Diff applier ──────────────────────────────────────────────────────────────

/// Apply a `StateDiff` to an in-memory state map.
///
/// Replaying every receipt's diff in order onto an empty map must reproduce the
/// simulator's slot store.
pub fn apply_diff(state: &mut HashMap<Address, HashMap<U256, B256>>, diff: &StateDiff) {
    for (addr, account_diff) in &diff.changes {
        let account_storage = state.entry(*addr).or_default();
        for (slot, slot_diff) in &account_diff.storage {
            if slot_diff.new_value == B256::ZERO {
                account_storage.remove(slot);
            } else {
                account_storage.insert(*slot, slot_diff.new_value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SlotStore;

    fn addr(n: u8) -> Address {
        Address::from([n; 20])
    }

    fn slot(n: u64) -> U256 {
        U256::from(n)
    }

    fn val(n: u8) -> B256 {
        B256::from([n; 32])
    }

    // ── Journal ───────────────────────────────────────────────────────────────

    #[test]
    fn test_unwind_returns_newest_first() {
        let mut journal = Journal::new();
        journal.record(JournalEntry::Created { address: addr(1) });
        let cp = Checkpoint {
            entries: journal.len(),
            logs: 0,
        };
        journal.record(JournalEntry::Nonce {
            address: addr(1),
            previous: 0,
        });
        journal.record(JournalEntry::Balance {
            address: addr(1),
            previous: U256::ZERO,
        });

        let undone = journal.unwind(cp);
        assert_eq!(undone.len(), 2);
        assert!(matches!(undone[0], JournalEntry::Balance { .. }));
        assert!(matches!(undone[1], JournalEntry::Nonce { .. }));
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn test_unwind_past_end_is_empty() {
        let mut journal = Journal::new();
        let cp = Checkpoint {
            entries: 5,
            logs: 0,
        };
        assert!(journal.unwind(cp).is_empty());
    }

    #[test]
    fn test_diff_since_uses_first_previous_value() {
        let mut store = SlotStore::new();
        let ledger = Ledger::new();
        let mut journal = Journal::new();

        // 0 → 1 → 2 within one transaction
        for v in [1u8, 2] {
            let previous = store.write(addr(1), slot(0), val(v));
            journal.record(JournalEntry::Storage {
                address: addr(1),
                slot: slot(0),
                previous,
            });
        }

        let diff = journal.diff_since(Checkpoint::default(), 3, &store, &ledger, &HashMap::new());
        let slot_diff = &diff.account_diff(&addr(1)).unwrap().storage[&slot(0)];
        assert_eq!(slot_diff.old_value, B256::ZERO);
        assert_eq!(slot_diff.new_value, val(2));
        assert_eq!(diff.tx_index, 3);
    }

    #[test]
    fn test_diff_since_drops_writes_that_restore_value() {
        let mut store = SlotStore::new();
        let ledger = Ledger::new();
        let mut journal = Journal::new();

        let previous = store.write(addr(1), slot(0), val(1));
        journal.record(JournalEntry::Storage {
            address: addr(1),
            slot: slot(0),
            previous,
        });
        let previous = store.write(addr(1), slot(0), B256::ZERO);
        journal.record(JournalEntry::Storage {
            address: addr(1),
            slot: slot(0),
            previous,
        });

        let diff = journal.diff_since(Checkpoint::default(), 0, &store, &ledger, &HashMap::new());
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_since_balances_and_creation() {
        let store = SlotStore::new();
        let mut ledger = Ledger::new();
        let mut journal = Journal::new();

        journal.record(JournalEntry::Created { address: addr(2) });
        journal.record(JournalEntry::Balance {
            address: addr(2),
            previous: ledger.balance(addr(2)),
        });
        ledger.credit(addr(2), U256::from(7)).unwrap();

        let diff = journal.diff_since(Checkpoint::default(), 0, &store, &ledger, &HashMap::new());
        let account = diff.account_diff(&addr(2)).unwrap();
        assert!(account.created);
        assert_eq!(account.balance, Some((U256::ZERO, U256::from(7))));
    }

    // ── AccountDiff ───────────────────────────────────────────────────────────

    #[test]
    fn test_account_diff_default_is_empty() {
        assert!(AccountDiff::default().is_empty());
    }

    #[test]
    fn test_account_diff_with_storage_is_not_empty() {
        let mut d = AccountDiff::default();
        d.storage
            .insert(slot(0), StorageSlotDiff::new(val(0), val(1)));
        assert!(!d.is_empty());
        assert_eq!(d.storage_change_count(), 1);
    }

    // ── StateDiffBuilder ──────────────────────────────────────────────────────

    #[test]
    fn test_builder_ignores_noops() {
        let mut b = StateDiffBuilder::new(1);
        b.record_balance_change(addr(1), U256::from(500u64), U256::from(500u64));
        b.record_nonce_change(addr(1), 3, 3);
        b.record_storage_change(addr(1), slot(0), val(7), val(7));
        assert!(b.build().is_empty());
    }

    #[test]
    fn test_builder_accumulates_same_account() {
        let mut b = StateDiffBuilder::new(1);
        b.record_nonce_change(addr(1), 0, 1);
        b.record_storage_change(addr(1), slot(0), val(0), val(1));
        let diff = b.build();

        let acc = diff.account_diff(&addr(1)).unwrap();
        assert_eq!(acc.nonce, Some((0, 1)));
        assert_eq!(acc.storage_change_count(), 1);
        assert_eq!(diff.touched_account_count(), 1);
    }

    #[test]
    fn test_diff_helpers() {
        let mut b = StateDiffBuilder::new(42);
        b.record_storage_change(addr(1), slot(3), val(0), val(99));
        b.record_storage_change(addr(2), slot(0), val(0), val(1));
        b.record_balance_change(addr(2), U256::ZERO, U256::from(5));
        let diff = b.build();

        assert_eq!(diff.total_storage_changes(), 2);
        assert_eq!(diff.storage_after(&addr(1), &slot(3)), Some(val(99)));
        assert!(diff.storage_after(&addr(1), &slot(4)).is_none());
        assert_eq!(diff.balance_change(&addr(2)), Some((U256::ZERO, U256::from(5))));
        assert!(diff.summary().contains("tx=42"));
        assert!(diff.summary().contains("storage_slots_changed=2"));
    }

    // ── apply_diff ────────────────────────────────────────────────────────────

    #[test]
    fn test_apply_diff_sets_and_removes() {
        let mut state: HashMap<Address, HashMap<U256, B256>> = HashMap::new();
        state.entry(addr(1)).or_default().insert(slot(0), val(99));

        let mut b = StateDiffBuilder::new(2);
        b.record_storage_change(addr(1), slot(0), val(99), B256::ZERO);
        b.record_storage_change(addr(1), slot(1), B256::ZERO, val(5));
        apply_diff(&mut state, &b.build());

        assert!(!state[&addr(1)].contains_key(&slot(0)), "zeroed slot should be removed");
        assert_eq!(state[&addr(1)][&slot(1)], val(5));
    }
}
