//! Walking the description to bind drivers, and tearing the bindings down again.
//!
//! Buses (`simple-bus`) and multi-function containers (`simple-mfd`) are transparent: the walk
//! descends into them without creating a device. Every other node is a leaf. A leaf becomes a
//! device if some registered driver matches it, and the walk never descends below a leaf.
//! Nodes that only describe software setup (`/aliases`, `/chosen`, memory) are skipped.

use crate::{
    Soc, debug_ex,
    dev::{Device, DeviceHandle, DeviceNode, driver::DriverRegistry},
    error::SocError,
};
use dt::node::{Node, NodeType};
use log::{debug, error, trace};

const TRANSPARENT: [&str; 2] = ["simple-bus", "simple-mfd"];

impl Soc<'_> {
    /// Compute the device set the description yields under `registry`.
    ///
    /// Pure with respect to the context: running it twice gives the same bindings.
    pub fn enumerate_devices(&self, registry: &DriverRegistry) -> Result<Vec<Device>, SocError> {
        let mut devices = vec![];
        self.enumerate_bus(registry, None, self.tree.root(), &mut devices)?;
        Ok(devices)
    }

    fn enumerate_bus(
        &self,
        registry: &DriverRegistry,
        parent: Option<DeviceHandle>,
        bus: &Node,
        devices: &mut Vec<Device>,
    ) -> Result<(), SocError> {
        for child in self.tree.get_children(bus) {
            if child.node_type == NodeType::Description {
                continue;
            }
            self.bind_node(registry, parent, child, devices)?;
        }
        Ok(())
    }

    fn bind_node(
        &self,
        registry: &DriverRegistry,
        parent: Option<DeviceHandle>,
        node: &Node,
        devices: &mut Vec<Device>,
    ) -> Result<(), SocError> {
        trace!("Processing devicetree node at {}", self.tree.get_full_path(node));

        for compat in TRANSPARENT {
            if self.tree.check_compatible(node, compat)? {
                return self.enumerate_bus(registry, parent, node, devices);
            }
        }

        for driver in registry.all() {
            for entry in driver.get_matches() {
                if !self.tree.check_compatible(node, entry.compatible)? {
                    continue;
                }
                debug_ex!(
                    "Bound {} driver to {}",
                    driver.get_name(),
                    self.tree.get_full_path(node)
                );
                devices.push(Device {
                    parent,
                    node: DeviceNode {
                        offset: node.node_id,
                    },
                    driver: *driver,
                    data: None,
                });
                return Ok(());
            }
        }
        Ok(())
    }

    /// Replace the context's devices with a fresh enumeration under `registry`.
    ///
    /// Existing bindings are unbound first.
    pub fn bind_drivers(&mut self, registry: &DriverRegistry) -> Result<(), SocError> {
        debug!("Found {} registered drivers", registry.len());
        self.unbind_all();
        self.devices = self.enumerate_devices(registry)?;
        Ok(())
    }

    /// Release every device, running the driver's destroy for those that were initialised.
    ///
    /// Leaves the device set empty, so a second call does nothing.
    pub fn unbind_all(&mut self) {
        // Devices stay in place until every destroy has run, so destroy can still resolve
        // its own node.
        for index in 0..self.devices.len() {
            let dev = DeviceHandle(index);
            let Some(device) = self.devices.get_mut(index) else {
                break;
            };
            let driver = device.driver;
            if let Some(data) = device.data.take() {
                driver.destroy(self, dev, data);
            }
            let stale: Vec<_> = self
                .bridges
                .iter()
                .filter(|entry| entry.owner == dev)
                .map(|entry| entry.id)
                .collect();
            for id in stale {
                error!(
                    "{} driver left a bridge controller registered, removing it",
                    driver.get_name()
                );
                self.unregister_bridge(id);
            }
            debug!("Unbound instance of driver {}", driver.get_name());
        }
        self.devices.clear();
    }
}
