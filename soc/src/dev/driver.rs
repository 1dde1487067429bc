//! Driver subsystem: descriptors, registration and match tables.
//!
//! Responsibilities:
//! - Provide the [Driver] trait implemented by every SoC driver, and the [DeviceMatch] table
//!   entries used to bind drivers to description nodes.
//! - Keep the process-wide [DriverRegistry] that enumeration consults. The registry is filled
//!   exactly once by [init] in a fixed order and is read-only afterwards.
//!
//! Ordering notes:
//! - When two drivers match the same node, the one registered first wins. The order in
//!   [crate::drivers::register_drivers] is therefore part of the contract.
use crate::{Soc, ahb::AhbError, debug_ex, dev::DeviceHandle, error::SocError};
use core::{
    any::Any,
    fmt::{self, Debug, Display},
};
use spin::Once;

/// Driver-private state, created by [Driver::init] and owned by the bound device.
pub type DriverData = Box<dyn Any>;

/// Trait implemented by drivers.
///
/// Guarantees and expectations:
/// - Implementations must be `Sync` and `'static`, since the registry hands out shared
///   references for the lifetime of the process.
/// - [Driver::init] runs lazily, the first time a consumer asks for the device's state. It may
///   run again after a failure.
/// - [Driver::destroy] runs at most once per successful [Driver::init], when the device is
///   unbound. It receives back the state returned by init.
pub trait Driver: Sync + Debug {
    fn get_name(&self) -> &'static str;
    fn get_matches(&self) -> &'static [DeviceMatch];
    fn init(&self, soc: &mut Soc<'_>, dev: DeviceHandle) -> Result<DriverData, DriverInitError>;
    fn destroy(&self, soc: &mut Soc<'_>, dev: DeviceHandle, data: DriverData);
}

/// One entry of a match table: a compatible string and optional data handed to the driver.
#[derive(Debug, Clone, Copy)]
pub struct DeviceMatch {
    pub compatible: &'static str,
    pub data: Option<&'static (dyn Any + Send + Sync)>,
}

impl DeviceMatch {
    pub const fn new(compatible: &'static str) -> DeviceMatch {
        DeviceMatch {
            compatible,
            data: None,
        }
    }

    pub const fn with_data(
        compatible: &'static str,
        data: &'static (dyn Any + Send + Sync),
    ) -> DeviceMatch {
        DeviceMatch {
            compatible,
            data: Some(data),
        }
    }
}

/// Ordered collection of drivers. No de-duplication and no removal.
#[derive(Debug, Default)]
pub struct DriverRegistry {
    drivers: Vec<&'static dyn Driver>,
}

impl DriverRegistry {
    pub const fn new() -> DriverRegistry {
        DriverRegistry { drivers: vec![] }
    }

    pub fn register(&mut self, driver: &'static dyn Driver) {
        debug_ex!("\tRegistered driver '{}'.", driver.get_name());
        self.drivers.push(driver);
    }

    /// Every registered driver in registration order.
    pub fn all(&self) -> &[&'static dyn Driver] {
        &self.drivers
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

static DRIVERS: Once<DriverRegistry> = Once::new();

/// Build the process-wide registry. Later calls return the registry built by the first.
pub fn init() -> &'static DriverRegistry {
    DRIVERS.call_once(|| {
        debug_ex!("Registering drivers...");
        let mut registry = DriverRegistry::new();
        crate::drivers::register_drivers(&mut registry);
        debug_ex!("{} drivers registered.", registry.len());
        registry
    })
}

/// The process-wide registry, built on first use.
pub fn registry() -> &'static DriverRegistry {
    init()
}

// region: Error Types

/// Errors that may be returned by [Driver::init].
#[derive(Debug)]
pub enum DriverInitError {
    /// Register window problems.
    Mmio(MmioError),
    /// A driver this one depends on is not bound or failed to initialise.
    Dependency { driver: &'static str },
    /// Resolving a description resource failed.
    Lookup(Box<SocError>),
    /// Bus access failed while bringing the device up.
    Transport(AhbError),
    /// Custom driver-specific information.
    Customized { info: &'static str },
}

/// Register window failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmioError {
    /// Device did not specify a register window.
    AddressNotSpecified,
    /// The window is smaller than the registers the driver needs.
    NotEnoughSpace,
}

impl Display for DriverInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverInitError::Mmio(MmioError::AddressNotSpecified) => {
                f.write_str("no register window specified")
            }
            DriverInitError::Mmio(MmioError::NotEnoughSpace) => {
                f.write_str("register window too small")
            }
            DriverInitError::Dependency { driver } => {
                write!(f, "required driver '{}' unavailable", driver)
            }
            DriverInitError::Lookup(err) => write!(f, "lookup failed: {}", err),
            DriverInitError::Transport(err) => write!(f, "{}", err),
            DriverInitError::Customized { info } => f.write_str(info),
        }
    }
}

impl From<SocError> for DriverInitError {
    fn from(value: SocError) -> Self {
        match value {
            SocError::Transport(err) => DriverInitError::Transport(err),
            other => DriverInitError::Lookup(Box::new(other)),
        }
    }
}

impl From<AhbError> for DriverInitError {
    fn from(value: AhbError) -> Self {
        DriverInitError::Transport(value)
    }
}

impl From<MmioError> for DriverInitError {
    fn from(value: MmioError) -> Self {
        DriverInitError::Mmio(value)
    }
}

// endregion
