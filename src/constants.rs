use alloy_primitives::U256;

/// One ether in wei (10^18)
pub const ONE_ETHER: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);
/// Maximum nested call depth.
///
/// Frames recurse on the native stack, so this sits below the EVM's 1024 to
/// stay within a 2 MiB thread stack.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 128;
/// Nonce a contract account starts with (EIP-161)
pub const CONTRACT_INITIAL_NONCE: u64 = 1;

/// Convert a whole number of ether to wei.
pub fn ether(amount: u64) -> U256 {
    U256::from(amount) * ONE_ETHER
}

/// The `maxBalance` the factory passes to `PuzzleWallet.init` (100 ETH).
///
/// It never survives: the proxy constructor overwrites the same slot with its admin.
pub fn wallet_init_max_balance() -> U256 {
    ether(100)
}
