//! Contract storage layouts.
//!
//! A [`Layout`] is the ordered list of a contract's declared storage
//! variables; declaration order is slot order. Every variable here occupies a
//! whole slot (no packing: each is an address, uint256, bool or mapping base
//! declared next to a full-width neighbour).
//!
//! Delegated calls execute one contract's layout over another contract's slot
//! space. [`Layout::aliases`] lists the slots where two layouts disagree on
//! what lives there, which is exactly where such a call corrupts state.

pub mod helpers;
pub mod slots;

pub use helpers::{
    address_to_uint, decode_address, decode_bool, decode_u256, encode_address, encode_bool,
    encode_u256, mapping_address_slot,
};
pub use slots::{eip1967_slots, hacker_slots, puzzle_proxy_slots, puzzle_wallet_slots};

use alloy_primitives::U256;

use crate::errors::SimError;

/// Solidity type class of a declared variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Address,
    Uint,
    Bool,
    /// Base slot of a mapping; entries live at hashed slots
    Mapping,
}

/// One declared storage variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: &'static str,
    pub kind: VarKind,
}

/// Two layouts disagreeing on a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAlias {
    pub index: u64,
    /// Variable the storage owner declares there
    pub owner: &'static str,
    /// Variable the executing code declares there
    pub executing: &'static str,
}

/// Ordered declared variables of one contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    contract: &'static str,
    variables: Vec<Variable>,
}

impl Layout {
    /// Layout with no declared variables.
    pub fn new(contract: &'static str) -> Self {
        Self {
            contract,
            variables: Vec::new(),
        }
    }

    /// Declare the next variable; it takes the next free slot.
    pub fn with(mut self, name: &'static str, kind: VarKind) -> Self {
        self.variables.push(Variable { name, kind });
        self
    }

    pub fn contract(&self) -> &'static str {
        self.contract
    }

    /// Number of declared variables (= declared slots).
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Index of a declared variable.
    pub fn index_of(&self, name: &str) -> Result<u64, SimError> {
        self.variables
            .iter()
            .position(|v| v.name == name)
            .map(|i| i as u64)
            .ok_or_else(|| SimError::UnknownVariable {
                contract: self.contract,
                name: name.to_string(),
            })
    }

    /// Slot of a declared variable.
    pub fn slot_of(&self, name: &str) -> Result<U256, SimError> {
        self.index_of(name).map(U256::from)
    }

    pub fn variable_at(&self, index: u64) -> Option<&Variable> {
        usize::try_from(index).ok().and_then(|i| self.variables.get(i))
    }

    /// Slots where `self` (storage owner) and `executing` declare different variables.
    pub fn aliases(&self, executing: &Layout) -> Vec<SlotAlias> {
        self.variables
            .iter()
            .zip(executing.variables.iter())
            .enumerate()
            .filter(|(_, (own, exec))| own.name != exec.name)
            .map(|(i, (own, exec))| SlotAlias {
                index: i as u64,
                owner: own.name,
                executing: exec.name,
            })
            .collect()
    }
}
