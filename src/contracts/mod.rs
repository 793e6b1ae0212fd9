//! Contract logic run by the simulator.
//!
//! Each contract is a stateless [`Contract`] implementation: all state lives in
//! the slot space of whatever instance the [`Frame`] executes against, reached
//! only through the frame's layout. Running a contract's logic inside a
//! delegated frame therefore reads and writes the *caller's* slots using the
//! *callee's* variable positions, which is what the proxy below relies on and
//! what the hijack abuses.

pub mod factory;
pub mod hacker;
pub mod proxy;
pub mod wallet;

pub use factory::PuzzleWalletFactory;
pub use hacker::Hacker;
pub use proxy::PuzzleProxy;
pub use wallet::PuzzleWallet;

use std::fmt;

use crate::abi::{Call, Value};
use crate::errors::SimError;
use crate::layout::Layout;
use crate::simulator::Frame;

/// Executable contract logic
pub trait Contract: fmt::Debug + Send + Sync {
    /// Contract name, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Declared storage variables in declaration order.
    fn layout(&self) -> Layout;

    /// Constructor body. Runs once, before the instance becomes active.
    fn construct(&self, frame: &mut Frame<'_>, args: &Call) -> Result<(), SimError> {
        let _ = (frame, args);
        Ok(())
    }

    /// Dispatch a call (an empty call is a plain transfer).
    fn call(&self, frame: &mut Frame<'_>, call: &Call) -> Result<Value, SimError>;
}

/// Error for a call no method or fallback accepts.
pub(crate) fn unknown_method(contract: &'static str, call: &Call) -> SimError {
    SimError::UnknownMethod {
        contract,
        signature: call.signature().to_string(),
    }
}
