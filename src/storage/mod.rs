//! Slot storage and the ether ledger.
//!
//! [`SlotStore`] holds every instance's raw 256-bit words keyed by
//! `(address, slot)`; absent slots read as zero and writing zero deletes the
//! entry, as in EVM storage. [`Ledger`] is the separate per-account ether
//! balance table. Neither knows about transactions: rollback is the journal's
//! job (see [`crate::journal`]).

use alloy_primitives::{Address, B256, U256};
use std::collections::HashMap;

use crate::errors::SimError;

/// Trait for reading contract storage slots.
///
/// Lets the journal read post-transaction values without owning the store.
pub trait StorageReader {
    /// Read a storage slot value from a contract address.
    /// Returns None if the slot was never written (or was cleared).
    fn read_storage(&self, address: Address, slot: U256) -> Option<B256>;
}

/// Per-instance slot spaces
#[derive(Debug, Clone, Default)]
pub struct SlotStore {
    accounts: HashMap<Address, HashMap<U256, B256>>,
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty slot space for `address` (no-op if it exists).
    pub fn allocate(&mut self, address: Address) {
        self.accounts.entry(address).or_default();
    }

    /// Drop a slot space entirely.
    pub fn remove_account(&mut self, address: &Address) {
        self.accounts.remove(address);
    }

    pub fn has_account(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    /// Current value, zero if never written.
    pub fn read(&self, address: Address, slot: U256) -> B256 {
        self.read_storage(address, slot).unwrap_or(B256::ZERO)
    }

    /// Write a slot and return the value it replaced.
    pub fn write(&mut self, address: Address, slot: U256, value: B256) -> B256 {
        let account = self.accounts.entry(address).or_default();
        let previous = if value == B256::ZERO {
            account.remove(&slot)
        } else {
            account.insert(slot, value)
        };
        previous.unwrap_or(B256::ZERO)
    }

    /// Number of non-zero slots held for `address`.
    pub fn slot_count(&self, address: &Address) -> usize {
        self.accounts.get(address).map_or(0, HashMap::len)
    }

    /// Copy of every slot space, for diff verification.
    pub fn snapshot(&self) -> HashMap<Address, HashMap<U256, B256>> {
        self.accounts.clone()
    }
}

impl StorageReader for SlotStore {
    fn read_storage(&self, address: Address, slot: U256) -> Option<B256> {
        self.accounts.get(&address)?.get(&slot).copied()
    }
}

/// Ether balances, independent of slot storage
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    balances: HashMap<Address, U256>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or(U256::ZERO)
    }

    /// Overwrite a balance; zero removes the entry.
    pub fn set(&mut self, account: Address, balance: U256) {
        if balance.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }

    /// Add to a balance, returning the new balance.
    ///
    /// Fails with `BalanceOverflow` and leaves the balance untouched if the sum
    /// does not fit in 256 bits.
    pub fn credit(&mut self, account: Address, amount: U256) -> Result<U256, SimError> {
        let balance = self.balance(account);
        let total = balance
            .checked_add(amount)
            .ok_or(SimError::BalanceOverflow {
                account,
                balance,
                amount,
            })?;
        self.set(account, total);
        Ok(total)
    }

    /// Subtract from a balance, returning the new balance.
    ///
    /// Fails with `InsufficientBalance` and leaves the balance untouched if it
    /// would go negative.
    pub fn debit(&mut self, account: Address, amount: U256) -> Result<U256, SimError> {
        let balance = self.balance(account);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(SimError::InsufficientBalance {
                account,
                balance,
                requested: amount,
            })?;
        self.set(account, remaining);
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from([n; 20])
    }

    fn slot(n: u64) -> U256 {
        U256::from(n)
    }

    fn val(n: u8) -> B256 {
        B256::from([n; 32])
    }

    // ── SlotStore ─────────────────────────────────────────────────────────────

    #[test]
    fn test_unwritten_slot_reads_zero() {
        let store = SlotStore::new();
        assert_eq!(store.read(addr(1), slot(0)), B256::ZERO);
        assert_eq!(store.read(addr(1), U256::MAX), B256::ZERO);
        assert!(store.read_storage(addr(1), slot(0)).is_none());
    }

    #[test]
    fn test_write_returns_previous() {
        let mut store = SlotStore::new();
        assert_eq!(store.write(addr(1), slot(0), val(1)), B256::ZERO);
        assert_eq!(store.write(addr(1), slot(0), val(2)), val(1));
        assert_eq!(store.read(addr(1), slot(0)), val(2));
    }

    #[test]
    fn test_slot_spaces_are_isolated() {
        let mut store = SlotStore::new();
        store.write(addr(1), slot(0), val(9));
        assert_eq!(store.read(addr(2), slot(0)), B256::ZERO);
    }

    #[test]
    fn test_writing_zero_clears_slot() {
        let mut store = SlotStore::new();
        store.write(addr(1), slot(3), val(5));
        assert_eq!(store.slot_count(&addr(1)), 1);
        store.write(addr(1), slot(3), B256::ZERO);
        assert_eq!(store.slot_count(&addr(1)), 0);
        assert!(store.has_account(&addr(1)));
    }

    #[test]
    fn test_allocate_and_remove_account() {
        let mut store = SlotStore::new();
        store.allocate(addr(4));
        assert!(store.has_account(&addr(4)));
        store.remove_account(&addr(4));
        assert!(!store.has_account(&addr(4)));
    }

    // ── Ledger ────────────────────────────────────────────────────────────────

    #[test]
    fn test_credit_and_debit() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.credit(addr(1), U256::from(10)).unwrap(), U256::from(10));
        assert_eq!(ledger.debit(addr(1), U256::from(4)).unwrap(), U256::from(6));
        assert_eq!(ledger.balance(addr(1)), U256::from(6));
    }

    #[test]
    fn test_overdraft_fails_and_leaves_balance() {
        let mut ledger = Ledger::new();
        ledger.credit(addr(1), U256::from(3)).unwrap();
        let err = ledger.debit(addr(1), U256::from(4)).unwrap_err();
        assert_eq!(
            err,
            SimError::InsufficientBalance {
                account: addr(1),
                balance: U256::from(3),
                requested: U256::from(4),
            }
        );
        assert_eq!(ledger.balance(addr(1)), U256::from(3));
    }

    #[test]
    fn test_credit_overflow_fails_and_leaves_balance() {
        let mut ledger = Ledger::new();
        ledger.credit(addr(1), U256::MAX).unwrap();
        assert_eq!(
            ledger.credit(addr(1), U256::from(1)).unwrap_err(),
            SimError::BalanceOverflow {
                account: addr(1),
                balance: U256::MAX,
                amount: U256::from(1),
            }
        );
        assert_eq!(ledger.balance(addr(1)), U256::MAX);
    }

    #[test]
    fn test_debit_to_exactly_zero() {
        let mut ledger = Ledger::new();
        ledger.credit(addr(1), U256::from(2)).unwrap();
        assert_eq!(ledger.debit(addr(1), U256::from(2)).unwrap(), U256::ZERO);
        assert_eq!(ledger.balance(addr(1)), U256::ZERO);
    }
}
