use alloy_primitives::keccak256;

/// Compute the Solidity function selector (first 4 bytes of keccak256(signature)).
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

// PuzzleWallet
pub fn deposit() -> [u8; 4] {
    function_selector("deposit()")
}
pub fn multicall() -> [u8; 4] {
    function_selector("multicall(bytes[])")
}
