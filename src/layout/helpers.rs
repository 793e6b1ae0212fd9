use alloy_primitives::{Address, Keccak256, B256, U256};

/// Compute the storage slot for a Solidity `mapping(address => T)` entry.
///
/// For `balances[addr]` at mapping slot 3:
///   slot = keccak256(abi.encode(addr, 3))
pub fn mapping_address_slot(key: Address, mapping_slot: U256) -> U256 {
    let mut hasher = Keccak256::new();
    hasher.update(encode_address(key));
    hasher.update(B256::from(mapping_slot.to_be_bytes()).as_slice());
    U256::from_be_bytes(hasher.finalize().0)
}

/// Decode an address from a B256 storage value (low 20 bytes).
pub fn decode_address(value: B256) -> Address {
    Address::from_slice(&value[12..32])
}

/// Decode a uint256 from a B256 storage value.
pub fn decode_u256(value: B256) -> U256 {
    U256::from_be_bytes(value.0)
}

/// Decode a bool from a B256 storage value.
pub fn decode_bool(value: B256) -> bool {
    value[31] != 0
}

/// Encode a uint256 into a B256 storage value.
pub fn encode_u256(value: U256) -> B256 {
    B256::from(value.to_be_bytes())
}

/// Encode a bool into a B256 storage value.
pub fn encode_bool(value: bool) -> B256 {
    encode_u256(U256::from(value as u8))
}

/// Encode an address into a B256 storage value (left-padded).
pub fn encode_address(addr: Address) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[12..32].copy_from_slice(addr.as_slice());
    B256::from(bytes)
}

/// `uint256(uint160(addr))`
pub fn address_to_uint(addr: Address) -> U256 {
    decode_u256(encode_address(addr))
}
