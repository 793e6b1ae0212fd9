//! Deployment scripts.
//!
//! Every script deploys one contract from one named account with fixed
//! constructor arguments and declares the tags it depends on. [`fixture`]
//! runs the requested tags, dependencies first, each script at most once,
//! and hands back the resulting [`Deployments`]. Callers keep that map and
//! pass it on; nothing is registered globally.

use alloy_primitives::{Address, U256};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::info;

use crate::abi::Call;
use crate::accounts::NamedAccounts;
use crate::contracts::{Contract, Hacker, PuzzleWalletFactory};
use crate::errors::SimError;
use crate::simulator::{Log, Simulator};

pub const HACKER_TAG: &str = "Hacker";
pub const PUZZLE_WALLET_FACTORY_TAG: &str = "PuzzleWalletFactory";

/// One deployed contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub name: &'static str,
    pub address: Address,
    pub deployer: Address,
    /// Events emitted while constructing it
    pub logs: Vec<Log>,
}

/// Deployments by tag
#[derive(Debug, Clone, Default)]
pub struct Deployments {
    by_tag: BTreeMap<String, Deployment>,
}

impl Deployments {
    pub fn get(&self, tag: &str) -> Option<&Deployment> {
        self.by_tag.get(tag)
    }

    /// Address deployed under `tag`.
    pub fn address(&self, tag: &str) -> Result<Address, SimError> {
        self.get(tag)
            .map(|deployment| deployment.address)
            .ok_or_else(|| SimError::UnknownDeployTag(tag.to_string()))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.by_tag.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Deployment)> {
        self.by_tag.iter().map(|(tag, deployment)| (tag.as_str(), deployment))
    }
}

/// A deploy step
#[derive(Debug, Clone, Copy)]
pub struct DeployScript {
    pub tag: &'static str,
    pub dependencies: &'static [&'static str],
    pub deploy: fn(&mut Simulator, &NamedAccounts) -> Result<Deployment, SimError>,
}

/// The project's scripts.
pub fn scripts() -> Vec<DeployScript> {
    vec![
        DeployScript {
            tag: HACKER_TAG,
            dependencies: &[],
            deploy: deploy_hacker,
        },
        DeployScript {
            tag: PUZZLE_WALLET_FACTORY_TAG,
            dependencies: &[],
            deploy: deploy_puzzle_wallet_factory,
        },
    ]
}

/// Deploy `Hacker` from the hacker account.
pub fn deploy_hacker(
    sim: &mut Simulator,
    accounts: &NamedAccounts,
) -> Result<Deployment, SimError> {
    deploy_contract(sim, accounts.hacker, Arc::new(Hacker))
}

/// Deploy `PuzzleWalletFactory` from the deployer account.
pub fn deploy_puzzle_wallet_factory(
    sim: &mut Simulator,
    accounts: &NamedAccounts,
) -> Result<Deployment, SimError> {
    deploy_contract(sim, accounts.deployer, Arc::new(PuzzleWalletFactory))
}

fn deploy_contract(
    sim: &mut Simulator,
    from: Address,
    contract: Arc<dyn Contract>,
) -> Result<Deployment, SimError> {
    let name = contract.name();
    let receipt = sim.create(from, contract, &Call::constructor(vec![]), U256::ZERO)?;
    let address = receipt.contract_address.ok_or(SimError::NoContractAddress(name))?;
    info!(
        target: "sim::deploy",
        contract = name,
        %address,
        deployer = %from,
        tx = receipt.tx_index,
        logs = receipt.logs.len(),
        "deployed"
    );
    Ok(Deployment {
        name,
        address,
        deployer: from,
        logs: receipt.logs,
    })
}

/// Run the scripts tagged `tags` with the project's scripts.
pub fn fixture(
    sim: &mut Simulator,
    accounts: &NamedAccounts,
    tags: &[&str],
) -> Result<Deployments, SimError> {
    run_scripts(sim, accounts, &scripts(), tags)
}

/// Run `tags` and their dependencies from `scripts`, each once, dependencies first.
pub fn run_scripts(
    sim: &mut Simulator,
    accounts: &NamedAccounts,
    scripts: &[DeployScript],
    tags: &[&str],
) -> Result<Deployments, SimError> {
    let mut order = Vec::new();
    let mut visiting = HashSet::new();
    for tag in tags {
        visit(scripts, tag, &mut visiting, &mut order)?;
    }

    let mut deployments = Deployments::default();
    for script in order {
        let deployment = (script.deploy)(sim, accounts)?;
        deployments.by_tag.insert(script.tag.to_string(), deployment);
    }
    Ok(deployments)
}

/// Depth-first post-order over the dependency graph.
fn visit<'s>(
    scripts: &'s [DeployScript],
    tag: &str,
    visiting: &mut HashSet<&'s str>,
    order: &mut Vec<&'s DeployScript>,
) -> Result<(), SimError> {
    let script = scripts
        .iter()
        .find(|script| script.tag == tag)
        .ok_or_else(|| SimError::UnknownDeployTag(tag.to_string()))?;
    if order.iter().any(|done| done.tag == script.tag) {
        return Ok(());
    }
    if !visiting.insert(script.tag) {
        return Err(SimError::DeployCycle(script.tag.to_string()));
    }
    for dependency in script.dependencies {
        visit(scripts, dependency, visiting, order)?;
    }
    visiting.remove(script.tag);
    order.push(script);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Value;
    use crate::contracts::hacker;
    use crate::layout::Layout;
    use crate::simulator::{Event, Frame};

    /// Announces itself from its constructor.
    #[derive(Debug)]
    struct Announcer;

    impl Contract for Announcer {
        fn name(&self) -> &'static str {
            "Announcer"
        }

        fn layout(&self) -> Layout {
            Layout::new("Announcer")
        }

        fn construct(&self, frame: &mut Frame<'_>, _args: &Call) -> Result<(), SimError> {
            let this = frame.this();
            frame.emit(Event::InstanceCreated { wallet: this });
            Ok(())
        }

        fn call(&self, _frame: &mut Frame<'_>, call: &Call) -> Result<Value, SimError> {
            Err(crate::contracts::unknown_method("Announcer", call))
        }
    }

    fn setup() -> (Simulator, NamedAccounts) {
        (Simulator::default(), NamedAccounts::default())
    }

    fn dummy(sim: &mut Simulator, accounts: &NamedAccounts) -> Result<Deployment, SimError> {
        deploy_contract(sim, accounts.deployer, Arc::new(Hacker))
    }

    #[test]
    fn test_fixture_deploys_factory_from_deployer() {
        let (mut sim, accounts) = setup();
        let deployments = fixture(&mut sim, &accounts, &[PUZZLE_WALLET_FACTORY_TAG]).unwrap();

        let factory = deployments.get(PUZZLE_WALLET_FACTORY_TAG).unwrap();
        assert_eq!(factory.name, "PuzzleWalletFactory");
        assert_eq!(factory.deployer, accounts.deployer);
        assert_eq!(factory.address, accounts.deployer.create(0));
        assert!(sim.is_instance(factory.address));
        assert!(!deployments.contains(HACKER_TAG));
    }

    #[test]
    fn test_fixture_deploys_hacker_from_hacker() {
        let (mut sim, accounts) = setup();
        let deployments =
            fixture(&mut sim, &accounts, &[HACKER_TAG, PUZZLE_WALLET_FACTORY_TAG]).unwrap();
        assert_eq!(deployments.len(), 2);

        let address = deployments.address(HACKER_TAG).unwrap();
        assert_eq!(
            sim.view(accounts.deployer, address, &hacker::owner()).unwrap(),
            Value::Address(accounts.hacker)
        );
    }

    #[test]
    fn test_deployment_carries_constructor_logs() {
        let (mut sim, accounts) = setup();
        let deployment = deploy_contract(&mut sim, accounts.deployer, Arc::new(Announcer)).unwrap();
        let address = deployment.address;
        assert_eq!(address, accounts.deployer.create(0));
        assert_eq!(deployment.logs.len(), 1);
        assert_eq!(deployment.logs[0].emitter, address);
        assert_eq!(deployment.logs[0].event, Event::InstanceCreated { wallet: address });

        let factory = deploy_puzzle_wallet_factory(&mut sim, &accounts).unwrap();
        assert!(factory.logs.is_empty());
    }

    #[test]
    fn test_repeated_tag_runs_once() {
        let (mut sim, accounts) = setup();
        fixture(&mut sim, &accounts, &[HACKER_TAG, HACKER_TAG]).unwrap();
        assert_eq!(sim.nonce(accounts.hacker), 1);
    }

    #[test]
    fn test_unknown_tag() {
        let (mut sim, accounts) = setup();
        assert_eq!(
            fixture(&mut sim, &accounts, &["Nope"]).unwrap_err(),
            SimError::UnknownDeployTag("Nope".to_string())
        );
        assert_eq!(
            Deployments::default().address(HACKER_TAG).unwrap_err(),
            SimError::UnknownDeployTag(HACKER_TAG.to_string())
        );
    }

    #[test]
    fn test_dependencies_run_first() {
        let (mut sim, accounts) = setup();
        let scripts = [
            DeployScript {
                tag: "B",
                dependencies: &["A"],
                deploy: dummy,
            },
            DeployScript {
                tag: "A",
                dependencies: &[],
                deploy: dummy,
            },
        ];
        let deployments = run_scripts(&mut sim, &accounts, &scripts, &["B"]).unwrap();
        assert_eq!(deployments.address("A").unwrap(), accounts.deployer.create(0));
        assert_eq!(deployments.address("B").unwrap(), accounts.deployer.create(1));
    }

    #[test]
    fn test_dependency_cycle() {
        let (mut sim, accounts) = setup();
        let scripts = [
            DeployScript {
                tag: "A",
                dependencies: &["B"],
                deploy: dummy,
            },
            DeployScript {
                tag: "B",
                dependencies: &["A"],
                deploy: dummy,
            },
        ];
        assert_eq!(
            run_scripts(&mut sim, &accounts, &scripts, &["A"]).unwrap_err(),
            SimError::DeployCycle("A".to_string())
        );
        assert_eq!(sim.nonce(accounts.deployer), 0);
    }
}
