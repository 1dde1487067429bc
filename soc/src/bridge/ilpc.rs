//! LPC-to-AHB bridge (iLPC2AHB), reachable by the host through the SuperIO interface.

use crate::{
    Soc,
    ahb::Ahb,
    ast::{lpc, scu},
    bridge::{BridgeController, BridgeMode, BridgeRegistration, IpState},
    dev::{
        DeviceHandle, Region,
        driver::{DeviceMatch, Driver, DriverData, DriverInitError},
    },
    error::SocError,
};
use std::io;

/// Where the strap that turns off SuperIO decoding lives.
#[derive(Debug)]
pub struct IlpcConfig {
    /// Offset of the strap register within the SCU.
    pub strap: u32,
    /// Strap bits that, when set, disable SuperIO decoding.
    pub sio_disabled: u32,
}

static AST2400: IlpcConfig = IlpcConfig {
    strap: scu::HW_STRAP,
    sio_disabled: scu::HwStrap::SIO_DEC.bits(),
};
static AST2500: IlpcConfig = IlpcConfig {
    strap: scu::HW_STRAP,
    sio_disabled: scu::HwStrap::SIO_DEC.bits(),
};
static AST2600: IlpcConfig = IlpcConfig {
    strap: scu::G6_HW_STRAP2,
    sio_disabled: scu::G6_HW_STRAP2_SIO_DEC,
};

static MATCHES: [DeviceMatch; 3] = [
    DeviceMatch::with_data("aspeed,ast2400-ilpc-ahb-bridge", &AST2400),
    DeviceMatch::with_data("aspeed,ast2500-ilpc-ahb-bridge", &AST2500),
    DeviceMatch::with_data("aspeed,ast2600-ilpc-ahb-bridge", &AST2600),
];

#[derive(Debug)]
pub struct IlpcBridge {
    lpc: Region,
    scu: Region,
    config: &'static IlpcConfig,
}

impl IlpcBridge {
    pub fn new(lpc: Region, scu: Region, config: &'static IlpcConfig) -> IlpcBridge {
        IlpcBridge { lpc, scu, config }
    }
}

impl BridgeController for IlpcBridge {
    fn name(&self) -> &str {
        "ilpc"
    }

    fn report(
        &mut self,
        ahb: &mut dyn Ahb,
        verbose: bool,
        out: &mut dyn io::Write,
    ) -> Result<BridgeMode, SocError> {
        let strap = ahb.read(self.scu.start + self.config.strap)?;
        let superio = IpState::from_enabled(strap & self.config.sio_disabled == 0);
        let mode = if superio == IpState::Disabled {
            BridgeMode::Disabled
        } else {
            let hicrb = lpc::Hicrb::from_bits_truncate(ahb.read(self.lpc.start + lpc::HICRB)?);
            if hicrb.contains(lpc::Hicrb::ILPC_RO) {
                BridgeMode::Restricted
            } else {
                BridgeMode::Permissive
            }
        };

        if verbose {
            writeln!(out, "LPC2AHB bridge (iLPC): {}", mode)?;
            writeln!(out, "\tSuperIO decoding: {}", superio)?;
            if mode != BridgeMode::Disabled {
                let access = if mode == BridgeMode::Restricted {
                    "read-only"
                } else {
                    "read-write"
                };
                writeln!(out, "\tAHB access: 0x00000000-0xffffffff ({})", access)?;
            }
        }
        Ok(mode)
    }
}

#[derive(Debug)]
pub struct IlpcDriver;

pub static DRIVER: IlpcDriver = IlpcDriver;

impl Driver for IlpcDriver {
    fn get_name(&self) -> &'static str {
        "ilpc"
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
            .device_get_match_data::<IlpcConfig>(&MATCHES, node)?
            .ok_or(DriverInitError::Customized {
                info: "no strap layout for this bridge",
            })?;
        let lpc = soc.device_get_memory(node)?;
        let scu = soc.device_from_name("scu")?;
        let scu = soc.device_get_memory(scu)?;
        let bridge = IlpcBridge::new(lpc, scu, config);
        Ok(BridgeRegistration::announce(soc, dev, Box::new(bridge)))
    }

    fn destroy(&self, soc: &mut Soc<'_>, _dev: DeviceHandle, data: DriverData) {
        BridgeRegistration::withdraw(soc, data);
    }
}
