//! Deployment registry
//!
//! Deploys derivative instances at deterministic addresses and keeps them
//! reachable by address. Instances are shared behind a mutex so a driver
//! can hand the same derivative to several callers.

use crate::collaborators::{Clock, CollateralToken, ReferenceSource};
use crate::contract::Derivative;
use crate::params::DerivativeParams;
use ledger::derive_address;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use types::Address;

pub type SharedDerivative<C, R, K> = Arc<Mutex<Derivative<C, R, K>>>;

pub struct DerivativeRegistry<C, R, K> {
    deployer: Address,
    nonce: Mutex<u64>,
    instances: RwLock<BTreeMap<Address, SharedDerivative<C, R, K>>>,
}

impl<C, R, K> DerivativeRegistry<C, R, K>
where
    C: CollateralToken,
    R: ReferenceSource,
    K: Clock,
{
    pub fn new(deployer: Address) -> Self {
        Self {
            deployer,
            nonce: Mutex::new(0),
            instances: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    /// Deploy an uninitialized derivative and register it
    pub fn deploy(
        &self,
        params: DerivativeParams,
        collateral: C,
        reference: R,
        clock: K,
    ) -> SharedDerivative<C, R, K> {
        let address = {
            let mut nonce = self.nonce.lock();
            let address = derive_address(&self.deployer, *nonce);
            *nonce += 1;
            address
        };

        let instance = Arc::new(Mutex::new(Derivative::new(
            address, params, collateral, reference, clock,
        )));
        self.instances.write().insert(address, Arc::clone(&instance));

        info!(deployer = %self.deployer, derivative = %address, kind = %params.payoff.kind, "derivative deployed");
        instance
    }

    pub fn get(&self, address: &Address) -> Option<SharedDerivative<C, R, K>> {
        self.instances.read().get(address).cloned()
    }

    /// Deployed addresses in ascending order
    pub fn addresses(&self) -> Vec<Address> {
        self.instances.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }
}
