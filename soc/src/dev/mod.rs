//! Devices bound to description nodes, and the operations that discover and drive them

pub mod driver;
mod enumerate;
mod lookup;

pub use lookup::Region;

use crate::{
    Soc,
    dev::driver::{Driver, DriverData},
    error::SocError,
};
use core::any::Any;
use log::{debug, error, info};

/// A node of the SoC's hardware description.
///
/// Only meaningful for the [Soc] that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceNode {
    pub offset: usize,
}

/// Index of a bound [Device] within its [Soc].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub(crate) usize);

/// A description node bound to the driver that matched it.
///
/// Driver state is created on first use by [Soc::device_init_driver] and released when the
/// device is unbound.
#[derive(Debug)]
pub struct Device {
    pub parent: Option<DeviceHandle>,
    pub node: DeviceNode,
    pub driver: &'static dyn Driver,
    pub(crate) data: Option<DriverData>,
}

impl Device {
    pub fn is_initialised(&self) -> bool {
        self.data.is_some()
    }
}

impl Soc<'_> {
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, dev: DeviceHandle) -> Option<&Device> {
        self.devices.get(dev.0)
    }

    /// Handles of all bound devices, in binding order.
    pub fn device_handles(&self) -> impl Iterator<Item = DeviceHandle> + use<> {
        (0..self.devices.len()).map(DeviceHandle)
    }

    /// Bound device sitting on `node`, if any.
    pub fn device_at(&self, node: DeviceNode) -> Option<DeviceHandle> {
        self.devices
            .iter()
            .position(|dev| dev.node == node)
            .map(DeviceHandle)
    }

    /// Return the driver state of `dev`, running the driver's init first if needed.
    ///
    /// A failed init is logged and leaves nothing cached, so the next call tries again.
    pub fn device_init_driver(&mut self, dev: DeviceHandle) -> Result<&mut dyn Any, SocError> {
        let device = self.devices.get(dev.0).ok_or(SocError::InvalidArgument)?;
        if device.data.is_none() {
            let driver = device.driver;
            let node = device.node;
            match driver.init(self, dev) {
                Ok(data) => {
                    let device = self.devices.get_mut(dev.0).ok_or(SocError::InvalidArgument)?;
                    device.data = Some(data);
                    debug!("Initialised {} driver", driver.get_name());
                }
                Err(err) => {
                    error!(
                        "Failed to initialise {} driver for {}: {}",
                        driver.get_name(),
                        self.node_path(node),
                        err
                    );
                    return Err(SocError::DriverInit(err));
                }
            }
        }
        self.devices
            .get_mut(dev.0)
            .and_then(|device| device.data.as_deref_mut())
            .ok_or(SocError::InvalidArgument)
    }

    /// State of the first device bound to `driver`, initialising it on demand.
    pub fn driver_data<T: Any>(&mut self, driver: &dyn Driver) -> Result<&mut T, SocError> {
        let dev = self
            .devices
            .iter()
            .position(|dev| dev.driver.get_name() == driver.get_name())
            .map(DeviceHandle)
            .ok_or(SocError::NotFound)?;
        self.device_init_driver(dev)?
            .downcast_mut::<T>()
            .ok_or(SocError::InvalidArgument)
    }

    /// State of the device called `name` (alias or path), which must be bound to `driver`.
    pub fn driver_data_by_name<T: Any>(
        &mut self,
        driver: &dyn Driver,
        name: &str,
    ) -> Result<&mut T, SocError> {
        let node = self.device_from_name(name).inspect_err(|err| {
            debug!("Failed to find device by name '{}': {}", name, err);
        })?;
        let dev = self.device_at(node).ok_or(SocError::NotFound)?;
        let bound = self.devices[dev.0].driver.get_name();
        if bound != driver.get_name() {
            info!(
                "Failed to match driver {} on device {} (bound to {})",
                driver.get_name(),
                name,
                bound
            );
            return Err(SocError::InvalidArgument);
        }
        self.device_init_driver(dev)?
            .downcast_mut::<T>()
            .ok_or(SocError::InvalidArgument)
    }
}
