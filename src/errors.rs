use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Errors surfaced by the simulator, the simulated contracts and the deploy scripts.
///
/// Contract-level `require` failures are variants too, so a failed transaction
/// reports the same reason the Solidity revert string would.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Operation references an address that was never deployed
    #[error("Unknown instance {0}")]
    UnknownInstance(Address),

    /// Instance was allocated but its constructor has not run
    #[error("Instance {0} is deployed but not active")]
    InstanceNotActive(Address),

    /// Constructor invoked on an instance that already ran it
    #[error("Instance {0} is already active")]
    AlreadyActive(Address),

    /// Ledger debit would take an account below zero
    #[error("Insufficient balance on {account}: have {balance}, need {requested}")]
    InsufficientBalance {
        /// The debited account
        account: Address,
        /// Balance at the time of the debit
        balance: U256,
        /// Requested debit
        requested: U256,
    },

    /// Ledger credit would take a balance past 2^256 - 1
    #[error("Balance overflow on {account}: have {balance}, adding {amount}")]
    BalanceOverflow {
        /// The credited account
        account: Address,
        /// Balance at the time of the credit
        balance: U256,
        /// Requested credit
        amount: U256,
    },

    /// Strict slot read outside the declared variable range
    #[error("Slot {index} is outside the {declared} declared slots of {instance}")]
    InvalidSlotIndex {
        /// Instance whose slot space was read
        instance: Address,
        /// Requested index
        index: u64,
        /// Number of declared variables
        declared: usize,
    },

    /// Layout lookup for a name the contract does not declare
    #[error("{contract} declares no storage variable `{name}`")]
    UnknownVariable {
        /// Contract whose layout was consulted
        contract: &'static str,
        /// Requested variable name
        name: String,
    },

    /// No method (and no fallback) matched the call
    #[error("{contract} has no method `{signature}`")]
    UnknownMethod {
        /// Contract that rejected the call
        contract: &'static str,
        /// Signature of the rejected call (empty for a plain transfer)
        signature: String,
    },

    /// Argument missing or of the wrong kind
    #[error("Invalid argument {index} for `{signature}`: expected {expected}")]
    InvalidArgument {
        /// Signature of the call being decoded
        signature: String,
        /// Argument position
        index: usize,
        /// Expected token kind
        expected: &'static str,
    },

    /// Payable method called without value
    #[error("`{0}` requires a non-zero value")]
    ValueRequired(String),

    /// Nested calls went deeper than the configured limit
    #[error("Call depth {0} exceeds the configured maximum")]
    CallDepthExceeded(usize),

    #[error("Not the owner")]
    NotOwner,

    #[error("Caller is not the admin")]
    NotAdmin,

    #[error("Not whitelisted")]
    NotWhitelisted,

    #[error("Already initialized")]
    AlreadyInitialized,

    #[error("Max balance reached")]
    MaxBalanceReached,

    #[error("Contract balance is not 0")]
    ContractBalanceNotZero,

    #[error("Deposit can only be called once")]
    DepositAlreadyCalled,

    /// Checked `uint256` addition in contract logic wrapped
    #[error("SafeMath: addition overflow")]
    AdditionOverflow,

    /// Wallet-internal deposit record is lower than the requested withdrawal
    #[error("Insufficient balance: {account} deposited {deposited}, requested {requested}")]
    InsufficientDeposit {
        /// Account whose deposit was checked
        account: Address,
        /// Recorded deposit
        deposited: U256,
        /// Requested withdrawal
        requested: U256,
    },

    #[error("Expected new admin {expected} by the current admin is not the pending admin {pending}")]
    PendingAdminMismatch {
        /// Current `pendingAdmin`
        pending: Address,
        /// Address the admin expected
        expected: Address,
    },

    /// Creation committed without reporting the new instance
    #[error("Deployment of {0} returned no contract address")]
    NoContractAddress(&'static str),

    /// Fixture asked for a tag no script provides
    #[error("No deploy script tagged `{0}`")]
    UnknownDeployTag(String),

    /// Deploy script dependencies loop back on themselves
    #[error("Deploy script dependency cycle through `{0}`")]
    DeployCycle(String),
}
