//! SDRAM memory controller: where DRAM sits on the AHB and how much of it there is.

use crate::{
    Soc,
    ast::sdmc,
    dev::{
        DeviceHandle, Region,
        driver::{DeviceMatch, Driver, DriverData, DriverInitError, MmioError},
    },
    error::SocError,
};
use log::debug;

/// Per-generation DRAM decoding.
#[derive(Debug)]
pub struct SdmcConfig {
    pub dram_base: u32,
    /// Size selected by a configuration value of zero. Each step doubles it.
    pub size_unit: u32,
}

static AST2400: SdmcConfig = SdmcConfig {
    dram_base: 0x4000_0000,
    size_unit: 64 << 20,
};
static AST2500: SdmcConfig = SdmcConfig {
    dram_base: 0x8000_0000,
    size_unit: 128 << 20,
};
static AST2600: SdmcConfig = SdmcConfig {
    dram_base: 0x8000_0000,
    size_unit: 256 << 20,
};

static MATCHES: [DeviceMatch; 3] = [
    DeviceMatch::with_data("aspeed,ast2400-sdram-controller", &AST2400),
    DeviceMatch::with_data("aspeed,ast2500-sdram-controller", &AST2500),
    DeviceMatch::with_data("aspeed,ast2600-sdram-controller", &AST2600),
];

/// Decoded controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sdmc {
    dram: Region,
}

impl Sdmc {
    /// Installed DRAM as seen on the AHB.
    pub fn dram(&self) -> Region {
        self.dram
    }

    /// The DRAM window of the first bound controller, initialising it on demand.
    pub fn lookup(soc: &mut Soc<'_>) -> Result<Region, SocError> {
        Ok(soc.driver_data::<Sdmc>(&DRIVER)?.dram())
    }
}

#[derive(Debug)]
pub struct SdmcDriver;

pub static DRIVER: SdmcDriver = SdmcDriver;

impl Driver for SdmcDriver {
    fn get_name(&self) -> &'static str {
        "sdmc"
    }

    fn get_matches(&self) -> &'static [DeviceMatch] {
        &MATCHES
    }

    fn init(&self, soc: &mut Soc<'_>, dev: DeviceHandle) -> Result<DriverData, DriverInitError> {
        let node = soc
            .device(dev)
            .ok_or(DriverInitError::Customized {
                info: "device vanished",
            })?
            .node;
        let config = soc
            .device_get_match_data::<SdmcConfig>(&MATCHES, node)?
            .ok_or(DriverInitError::Customized {
                info: "no DRAM layout for this controller",
            })?;
        let regs = match soc.device_get_memory(node) {
            Ok(regs) => regs,
            Err(SocError::NotFound) => return Err(MmioError::AddressNotSpecified.into()),
            Err(err) => return Err(err.into()),
        };
        if regs.length < sdmc::CONFIG + 4 {
            return Err(MmioError::NotEnoughSpace.into());
        }
        let cfg = soc.ahb().read(regs.start + sdmc::CONFIG)?;
        let dram = Region {
            start: config.dram_base,
            length: config.size_unit << (cfg & sdmc::CONFIG_DRAM_SIZE_MASK),
        };
        debug!(
            "DRAM: {:#010x}-{:#010x} ({} MiB)",
            dram.start,
            dram.end(),
            dram.length >> 20
        );
        Ok(Box::new(Sdmc { dram }))
    }

    fn destroy(&self, _soc: &mut Soc<'_>, _dev: DeviceHandle, _data: DriverData) {}
}
