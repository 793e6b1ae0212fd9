//! Call data for the simulated contracts.
//!
//! A [`Call`] is a method signature plus typed arguments. The selector is
//! derived from the signature exactly as solc does, so logic that compares
//! selectors (the wallet's `multicall`) behaves like the deployed bytecode.
//! Nested call data (`bytes`, `bytes[]`) is carried as [`Token::Call`] /
//! [`Token::Calls`] instead of being ABI-encoded.

pub mod selectors;

pub use selectors::function_selector;

use alloy_primitives::{Address, U256};
use serde::Serialize;

use crate::errors::SimError;

/// A single call argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(U256),
    Bool(bool),
    /// `bytes` carrying one call
    Call(Call),
    /// `bytes[]` carrying a batch
    Calls(Vec<Call>),
}

/// Method invocation: signature plus arguments.
///
/// An empty signature is a plain value transfer (no calldata).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Call {
    signature: String,
    args: Vec<Token>,
}

impl Call {
    /// Signature used for constructor argument lists.
    pub const CONSTRUCTOR: &'static str = "constructor";

    pub fn new(signature: impl Into<String>, args: Vec<Token>) -> Self {
        Self {
            signature: signature.into(),
            args,
        }
    }

    /// Calldata-less call (plain transfer).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Constructor arguments.
    pub fn constructor(args: Vec<Token>) -> Self {
        Self::new(Self::CONSTRUCTOR, args)
    }

    pub fn is_empty(&self) -> bool {
        self.signature.is_empty()
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn args(&self) -> &[Token] {
        &self.args
    }

    /// Four-byte selector; `None` for a plain transfer.
    pub fn selector(&self) -> Option<[u8; 4]> {
        (!self.is_empty()).then(|| function_selector(&self.signature))
    }

    pub fn address_arg(&self, index: usize) -> Result<Address, SimError> {
        match self.args.get(index) {
            Some(Token::Address(address)) => Ok(*address),
            _ => Err(self.invalid(index, "address")),
        }
    }

    pub fn uint_arg(&self, index: usize) -> Result<U256, SimError> {
        match self.args.get(index) {
            Some(Token::Uint(value)) => Ok(*value),
            _ => Err(self.invalid(index, "uint256")),
        }
    }

    pub fn call_arg(&self, index: usize) -> Result<&Call, SimError> {
        match self.args.get(index) {
            Some(Token::Call(call)) => Ok(call),
            _ => Err(self.invalid(index, "bytes")),
        }
    }

    pub fn calls_arg(&self, index: usize) -> Result<&[Call], SimError> {
        match self.args.get(index) {
            Some(Token::Calls(calls)) => Ok(calls),
            _ => Err(self.invalid(index, "bytes[]")),
        }
    }

    fn invalid(&self, index: usize, expected: &'static str) -> SimError {
        SimError::InvalidArgument {
            signature: self.signature.clone(),
            index,
            expected,
        }
    }
}

/// What a call returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    #[default]
    None,
    Address(Address),
    Uint(U256),
    Bool(bool),
}

impl Value {
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Value::Address(address) => Some(*address),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Value::Uint(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }
}
