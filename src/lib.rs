//! # Puzzle Proxy Sim - storage-slot-aware contract state simulator
//!
//! Reproduces the Puzzle Wallet proxy hijack: an upgradeable proxy and the
//! wallet it forwards to declare different variables in the same storage
//! slots, and the wallet's batched deposit can be nested to credit one
//! `msg.value` twice. Together they let an outsider drain the wallet and take
//! over the proxy's admin slot.
//!
//! The simulator keeps per-instance slot spaces, an ether ledger and account
//! nonces, and executes contract logic in frames whose storage owner and
//! executing layout are separate, so delegated calls alias slots the same way
//! the EVM does.

pub mod abi;
pub mod accounts;
pub mod config;
pub mod constants;
pub mod contracts;
pub mod deploy;
pub mod errors;
pub mod journal;
pub mod layout;
pub mod logging;
pub mod scenario;
pub mod simulator;
pub mod storage;

pub use errors::SimError;
pub use simulator::Simulator;
