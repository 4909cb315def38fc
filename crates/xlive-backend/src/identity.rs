//! Network identity capability.

use std::net::Ipv4Addr;

use xlive_core::{MacAddress, MachineId};

/// Where this console lives on the network.
pub trait NetworkIdentity: Send + Sync {
    /// Address peers reach us at.
    fn address(&self) -> Ipv4Addr;
    /// Link-layer address.
    fn mac(&self) -> MacAddress;
    /// Console identity.
    fn machine_id(&self) -> MachineId;
}

/// Fixed identity, for configuration-driven setups and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticIdentity {
    /// Address.
    pub address: Ipv4Addr,
    /// Link-layer address.
    pub mac: MacAddress,
    /// Console identity.
    pub machine_id: MachineId,
}

impl NetworkIdentity for StaticIdentity {
    fn address(&self) -> Ipv4Addr {
        self.address
    }

    fn mac(&self) -> MacAddress {
        self.mac
    }

    fn machine_id(&self) -> MachineId {
        self.machine_id
    }
}
