use alloy_primitives::Address;

use super::Contract;
use crate::abi::{Call, Token, Value};
use crate::errors::SimError;
use crate::layout::{decode_address, eip1967_slots, encode_address, Layout, VarKind};
use crate::simulator::{Event, Frame};

pub const PROPOSE_NEW_ADMIN: &str = "proposeNewAdmin(address)";
pub const APPROVE_NEW_ADMIN: &str = "approveNewAdmin(address)";
pub const UPGRADE_TO: &str = "upgradeTo(address)";
pub const ADMIN: &str = "admin()";
pub const PENDING_ADMIN: &str = "pendingAdmin()";
pub const IMPLEMENTATION: &str = "implementation()";

/// Upgradeable proxy with a two-step admin handover.
///
/// Its two variables occupy slots 0 and 1 of its own storage, which is also
/// where every call it forwards to the implementation reads and writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PuzzleProxy;

impl PuzzleProxy {
    /// Constructor arguments: `(admin, implementation, initData)`.
    pub fn constructor(admin: Address, implementation: Address, init: Call) -> Call {
        Call::constructor(vec![
            Token::Address(admin),
            Token::Address(implementation),
            Token::Call(init),
        ])
    }

    fn implementation(frame: &Frame<'_>) -> Address {
        decode_address(frame.sload_slot(eip1967_slots::IMPLEMENTATION))
    }

    fn set_implementation(frame: &mut Frame<'_>, implementation: Address) {
        frame.sstore_slot(eip1967_slots::IMPLEMENTATION, encode_address(implementation));
    }

    fn only_admin(frame: &Frame<'_>) -> Result<(), SimError> {
        if decode_address(frame.sload("admin")?) != frame.msg_sender() {
            return Err(SimError::NotAdmin);
        }
        Ok(())
    }
}

impl Contract for PuzzleProxy {
    fn name(&self) -> &'static str {
        "PuzzleProxy"
    }

    fn layout(&self) -> Layout {
        Layout::new("PuzzleProxy")
            .with("pendingAdmin", VarKind::Address)
            .with("admin", VarKind::Address)
    }

    fn construct(&self, frame: &mut Frame<'_>, args: &Call) -> Result<(), SimError> {
        let admin = args.address_arg(0)?;
        let implementation = args.address_arg(1)?;
        let init = args.call_arg(2)?;

        Self::set_implementation(frame, implementation);
        if !init.is_empty() {
            frame.delegate_call(implementation, init)?;
        }
        frame.sstore("admin", encode_address(admin))
    }

    fn call(&self, frame: &mut Frame<'_>, call: &Call) -> Result<Value, SimError> {
        match call.signature() {
            PROPOSE_NEW_ADMIN => {
                let new_admin = call.address_arg(0)?;
                frame.sstore("pendingAdmin", encode_address(new_admin))?;
                Ok(Value::None)
            }
            APPROVE_NEW_ADMIN => {
                Self::only_admin(frame)?;
                let expected = call.address_arg(0)?;
                let pending = decode_address(frame.sload("pendingAdmin")?);
                if pending != expected {
                    return Err(SimError::PendingAdminMismatch { pending, expected });
                }
                frame.sstore("admin", encode_address(pending))?;
                Ok(Value::None)
            }
            UPGRADE_TO => {
                Self::only_admin(frame)?;
                let implementation = call.address_arg(0)?;
                Self::set_implementation(frame, implementation);
                frame.emit(Event::Upgraded { implementation });
                Ok(Value::None)
            }
            ADMIN => Ok(Value::Address(decode_address(frame.sload("admin")?))),
            PENDING_ADMIN => Ok(Value::Address(decode_address(frame.sload("pendingAdmin")?))),
            IMPLEMENTATION => Ok(Value::Address(Self::implementation(frame))),
            // fallback: forward everything else, plain transfers included
            _ => {
                let implementation = Self::implementation(frame);
                frame.delegate_call(implementation, call)
            }
        }
    }
}

pub fn propose_new_admin(new_admin: Address) -> Call {
    Call::new(PROPOSE_NEW_ADMIN, vec![Token::Address(new_admin)])
}

pub fn approve_new_admin(expected: Address) -> Call {
    Call::new(APPROVE_NEW_ADMIN, vec![Token::Address(expected)])
}

pub fn upgrade_to(implementation: Address) -> Call {
    Call::new(UPGRADE_TO, vec![Token::Address(implementation)])
}

pub fn admin() -> Call {
    Call::new(ADMIN, vec![])
}

pub fn pending_admin() -> Call {
    Call::new(PENDING_ADMIN, vec![])
}

pub fn implementation() -> Call {
    Call::new(IMPLEMENTATION, vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, U256};
    use std::sync::Arc;

    use crate::constants::DEFAULT_MAX_CALL_DEPTH;
    use crate::contracts::wallet::{self, PuzzleWallet};
    use crate::layout::{address_to_uint, decode_u256, puzzle_proxy_slots, puzzle_wallet_slots};
    use crate::simulator::Simulator;

    fn addr(n: u8) -> Address {
        Address::from([n; 20])
    }

    /// Admin addr(1); wallet initialised through the proxy with maxBalance 100.
    fn setup() -> (Simulator, Address, Address) {
        let mut sim = Simulator::default();
        let logic = sim
            .create(addr(1), Arc::new(PuzzleWallet), &Call::constructor(vec![]), U256::ZERO)
            .unwrap()
            .contract_address
            .unwrap();
        let proxy = sim
            .create(
                addr(1),
                Arc::new(PuzzleProxy),
                &PuzzleProxy::constructor(addr(1), logic, wallet::init(U256::from(100))),
                U256::ZERO,
            )
            .unwrap()
            .contract_address
            .unwrap();
        (sim, proxy, logic)
    }

    // ── Construction ──────────────────────────────────────────────────────────

    #[test]
    fn test_constructor_stores_implementation_and_admin() {
        let (mut sim, proxy, logic) = setup();
        assert_eq!(
            decode_address(sim.read_slot(proxy, eip1967_slots::IMPLEMENTATION).unwrap()),
            logic
        );
        assert_eq!(
            decode_address(sim.read_slot(proxy, puzzle_proxy_slots::ADMIN).unwrap()),
            addr(1)
        );
        assert_eq!(sim.view(addr(9), proxy, &implementation()).unwrap(), Value::Address(logic));
    }

    #[test]
    fn test_init_runs_in_proxy_storage() {
        let (sim, proxy, logic) = setup();
        // init wrote owner (slot 0) and maxBalance (slot 1) of the proxy
        assert_eq!(decode_address(sim.read_variable(proxy, "pendingAdmin").unwrap()), addr(1));
        assert_eq!(sim.read_slot(logic, puzzle_wallet_slots::MAX_BALANCE).unwrap(), B256::ZERO);
        // then the constructor's admin write replaced maxBalance
        assert_eq!(
            decode_u256(sim.read_variable_as(proxy, logic, "maxBalance").unwrap()),
            address_to_uint(addr(1))
        );
    }

    #[test]
    fn test_constructor_emits_nothing() {
        let mut sim = Simulator::default();
        let receipt = sim
            .create(
                addr(1),
                Arc::new(PuzzleProxy),
                &PuzzleProxy::constructor(addr(1), addr(7), Call::empty()),
                U256::ZERO,
            )
            .unwrap();
        let proxy = receipt.contract_address.unwrap();
        assert_eq!(receipt.logs_from(proxy).count(), 0);
        assert_eq!(sim.view(addr(9), proxy, &implementation()).unwrap(), Value::Address(addr(7)));
    }

    // ── Admin handover ────────────────────────────────────────────────────────

    #[test]
    fn test_propose_is_open_to_anyone() {
        let (mut sim, proxy, _) = setup();
        sim.call(addr(5), proxy, &propose_new_admin(addr(5)), U256::ZERO).unwrap();
        assert_eq!(sim.view(addr(9), proxy, &pending_admin()).unwrap(), Value::Address(addr(5)));
    }

    #[test]
    fn test_approve_requires_admin_and_matching_pending() {
        let (mut sim, proxy, _) = setup();
        sim.call(addr(5), proxy, &propose_new_admin(addr(5)), U256::ZERO).unwrap();

        assert_eq!(
            sim.call(addr(5), proxy, &approve_new_admin(addr(5)), U256::ZERO).unwrap_err(),
            SimError::NotAdmin
        );
        assert_eq!(
            sim.call(addr(1), proxy, &approve_new_admin(addr(6)), U256::ZERO).unwrap_err(),
            SimError::PendingAdminMismatch {
                pending: addr(5),
                expected: addr(6),
            }
        );
        sim.call(addr(1), proxy, &approve_new_admin(addr(5)), U256::ZERO).unwrap();
        assert_eq!(sim.view(addr(9), proxy, &admin()).unwrap(), Value::Address(addr(5)));
    }

    #[test]
    fn test_upgrade_is_admin_only() {
        let (mut sim, proxy, _) = setup();
        assert_eq!(
            sim.call(addr(2), proxy, &upgrade_to(addr(8)), U256::ZERO).unwrap_err(),
            SimError::NotAdmin
        );
        let receipt = sim.call(addr(1), proxy, &upgrade_to(addr(8)), U256::ZERO).unwrap();
        assert_eq!(receipt.logs[0].event, Event::Upgraded { implementation: addr(8) });
    }

    // ── Fallback ──────────────────────────────────────────────────────────────

    #[test]
    fn test_unknown_selector_is_forwarded() {
        let (mut sim, proxy, _) = setup();
        // pendingAdmin is read back as the wallet's owner
        sim.call(addr(5), proxy, &propose_new_admin(addr(5)), U256::ZERO).unwrap();
        assert_eq!(sim.view(addr(9), proxy, &wallet::owner()).unwrap(), Value::Address(addr(5)));
    }

    #[test]
    fn test_deeply_nested_multicall_hits_depth_limit() {
        let (mut sim, proxy, _) = setup();
        sim.credit(addr(1), U256::from(10)).unwrap();
        sim.call(addr(1), proxy, &wallet::add_to_whitelist(addr(1)), U256::ZERO).unwrap();

        // two frames per level: proxy fallback, then the wallet logic
        let nested = (0..400).fold(wallet::deposit(), |inner, _| wallet::multicall(vec![inner]));
        assert_eq!(
            sim.call(addr(1), proxy, &nested, U256::from(10)).unwrap_err(),
            SimError::CallDepthExceeded(DEFAULT_MAX_CALL_DEPTH + 1)
        );
        assert_eq!(sim.balance_of(addr(1)), U256::from(10));
        assert_eq!(
            sim.view(addr(9), proxy, &wallet::balances(addr(1))).unwrap(),
            Value::Uint(U256::ZERO)
        );
    }
}
