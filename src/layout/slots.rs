/// PuzzleProxy storage layout.
///
/// The proxy's own variables start at slot 0, the same place the wallet's do.
pub mod puzzle_proxy_slots {
    use alloy_primitives::U256;

    /// slot 0: pendingAdmin (address)
    pub const PENDING_ADMIN: U256 = U256::from_limbs([0, 0, 0, 0]);
    /// slot 1: admin (address)
    pub const ADMIN: U256 = U256::from_limbs([1, 0, 0, 0]);
}

/// PuzzleWallet storage layout.
pub mod puzzle_wallet_slots {
    use alloy_primitives::U256;

    /// slot 0: owner (address), aliases the proxy's pendingAdmin
    pub const OWNER: U256 = U256::from_limbs([0, 0, 0, 0]);
    /// slot 1: maxBalance (uint256), aliases the proxy's admin
    pub const MAX_BALANCE: U256 = U256::from_limbs([1, 0, 0, 0]);
    /// slot 2: whitelisted mapping base (mapping(address => bool))
    pub const WHITELISTED_MAPPING: U256 = U256::from_limbs([2, 0, 0, 0]);
    /// slot 3: balances mapping base (mapping(address => uint256))
    pub const BALANCES_MAPPING: U256 = U256::from_limbs([3, 0, 0, 0]);
}

/// Hacker contract storage layout.
pub mod hacker_slots {
    use alloy_primitives::U256;

    /// slot 0: owner (address)
    pub const OWNER: U256 = U256::from_limbs([0, 0, 0, 0]);
}

/// EIP-1967 proxy slots, outside any declared layout.
pub mod eip1967_slots {
    use alloy_primitives::{b256, U256};

    /// keccak256("eip1967.proxy.implementation") - 1
    pub const IMPLEMENTATION: U256 = U256::from_be_bytes(
        b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc").0,
    );
}
