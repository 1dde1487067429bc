//! Bridge controllers and the audit that folds their verdicts together.
//!
//! A bridge controller reports how exposed one hardware bridge (PCIe, LPC, debug UART) leaves
//! the BMC's AHB. Bridge drivers register a controller with the [Soc] from their init and
//! withdraw it from their destroy.

pub mod debug;
pub mod ilpc;
pub mod p2a;

use crate::{
    Soc,
    ahb::Ahb,
    dev::{DeviceHandle, driver::DriverData},
    error::SocError,
};
use core::fmt::{self, Debug, Display};
use log::{debug, error};
use std::io;

/// Compatible string shared by every bridge controller node.
pub const BRIDGE_CONTROLLER: &str = "bridge-controller";

/// Exposure of a bridge, most exposed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BridgeMode {
    /// The host can read and write the BMC's address space.
    Permissive,
    /// The bridge is enabled but writes are blocked.
    Restricted,
    Disabled,
}

impl Display for BridgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BridgeMode::Permissive => "Permissive",
            BridgeMode::Restricted => "Restricted",
            BridgeMode::Disabled => "Disabled",
        })
    }
}

/// Audited state of one interface capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpState {
    Unknown,
    Absent,
    Enabled,
    Disabled,
}

impl IpState {
    /// `Enabled` when `on`, otherwise `Disabled`.
    pub fn from_enabled(on: bool) -> IpState {
        if on {
            IpState::Enabled
        } else {
            IpState::Disabled
        }
    }
}

impl Display for IpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IpState::Unknown => "Unknown",
            IpState::Absent => "Absent",
            IpState::Enabled => "Enabled",
            IpState::Disabled => "Disabled",
        })
    }
}

pub trait BridgeController: Debug {
    fn name(&self) -> &str;

    /// Inspect the bridge and return its mode. When `verbose`, describe the findings on `out`.
    fn report(
        &mut self,
        ahb: &mut dyn Ahb,
        verbose: bool,
        out: &mut dyn io::Write,
    ) -> Result<BridgeMode, SocError>;

    fn status(&mut self, ahb: &mut dyn Ahb) -> Result<BridgeMode, SocError> {
        self.report(ahb, false, &mut io::sink())
    }
}

/// Identifies a registered controller within its [Soc].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BridgeId(usize);

#[derive(Debug)]
pub(crate) struct BridgeEntry {
    pub id: BridgeId,
    pub owner: DeviceHandle,
    pub controller: Box<dyn BridgeController>,
}

/// Driver state of a bridge-controller driver: the registration to withdraw on destroy.
#[derive(Debug)]
pub struct BridgeRegistration(pub BridgeId);

impl BridgeRegistration {
    /// Register `controller` on behalf of `owner` and return the driver state recording it.
    pub fn announce(
        soc: &mut Soc<'_>,
        owner: DeviceHandle,
        controller: Box<dyn BridgeController>,
    ) -> DriverData {
        Box::new(BridgeRegistration(soc.register_bridge(owner, controller)))
    }

    /// Undo [BridgeRegistration::announce] given the driver state it produced.
    pub fn withdraw(soc: &mut Soc<'_>, data: DriverData) {
        match data.downcast::<BridgeRegistration>() {
            Ok(registration) => {
                soc.unregister_bridge(registration.0);
            }
            Err(_) => error!("Bridge driver state is not a registration"),
        }
    }
}

/// Outcome of [Soc::probe_bridge_controllers].
#[derive(Debug)]
pub struct BridgeAudit {
    /// Most exposed mode reported. `Disabled` when no controller reported.
    pub mode: BridgeMode,
    /// Number of controllers that produced a mode.
    pub reported: usize,
    /// The last report failure, if any.
    pub error: Option<SocError>,
}

impl Soc<'_> {
    /// Announce `controller`, owned by device `owner`.
    pub fn register_bridge(
        &mut self,
        owner: DeviceHandle,
        controller: Box<dyn BridgeController>,
    ) -> BridgeId {
        let id = BridgeId(self.next_bridge_id);
        self.next_bridge_id += 1;
        debug!("Registered {} bridge controller", controller.name());
        self.bridges.push(BridgeEntry {
            id,
            owner,
            controller,
        });
        id
    }

    /// Withdraw a controller. Returns it, or `None` if it was not registered.
    pub fn unregister_bridge(&mut self, id: BridgeId) -> Option<Box<dyn BridgeController>> {
        let index = self.bridges.iter().position(|entry| entry.id == id)?;
        let entry = self.bridges.remove(index);
        debug!("Unregistered {} bridge controller", entry.controller.name());
        Some(entry.controller)
    }

    /// Bring up every bound bridge-controller device so it gets a chance to register.
    fn init_bridge_controllers(&mut self) -> Result<(), SocError> {
        let mut controllers = vec![];
        for dev in self.device_handles() {
            let node = self.node(self.devices[dev.0].node)?;
            if self.tree.check_compatible(node, BRIDGE_CONTROLLER)? {
                controllers.push(dev);
            }
        }
        for dev in controllers {
            // A controller that fails to come up is logged by init and left out.
            if self.device_init_driver(dev).is_ok() {
                debug!(
                    "Initialised {} AHB bridge controller",
                    self.devices[dev.0].driver.get_name()
                );
            }
        }
        Ok(())
    }

    /// Names of all bridge controllers, in registration order.
    pub fn list_bridge_controllers(&mut self) -> Result<Vec<String>, SocError> {
        self.init_bridge_controllers()?;
        Ok(self
            .bridges
            .iter()
            .map(|entry| entry.controller.name().to_string())
            .collect())
    }

    /// Report on every controller called `name`, or on all of them, writing the reports to
    /// `out`.
    ///
    /// A failing controller does not stop the others from being queried.
    pub fn probe_bridge_controllers(
        &mut self,
        name: Option<&str>,
        out: &mut dyn io::Write,
    ) -> Result<BridgeAudit, SocError> {
        self.init_bridge_controllers()?;
        let mut audit = BridgeAudit {
            mode: BridgeMode::Disabled,
            reported: 0,
            error: None,
        };
        let ahb = &mut *self.ahb;
        for entry in self.bridges.iter_mut() {
            let bridge = &mut entry.controller;
            if name.is_some_and(|name| name != bridge.name()) {
                continue;
            }
            match bridge.report(ahb, true, out) {
                Ok(mode) => {
                    audit.mode = audit.mode.min(mode);
                    audit.reported += 1;
                }
                Err(err) => {
                    error!("Failed to generate {} report: {}", bridge.name(), err);
                    audit.error = Some(err);
                }
            }
        }
        Ok(audit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_order_most_exposed_first() {
        assert!(BridgeMode::Permissive < BridgeMode::Restricted);
        assert!(BridgeMode::Restricted < BridgeMode::Disabled);
        let modes = [BridgeMode::Disabled, BridgeMode::Restricted, BridgeMode::Disabled];
        assert_eq!(modes.into_iter().min(), Some(BridgeMode::Restricted));
    }

    #[test]
    fn ip_state_labels() {
        assert_eq!(IpState::from_enabled(true).to_string(), "Enabled");
        assert_eq!(IpState::from_enabled(false).to_string(), "Disabled");
        assert_eq!(IpState::Absent.to_string(), "Absent");
    }
}
