//! Debug UART bridge: a console on UART1 or UART5 that accepts AHB read and write commands.

use crate::{
    Soc,
    ahb::Ahb,
    ast::scu::{self, HwStrap, Misc},
    bridge::{BridgeController, BridgeMode, BridgeRegistration, IpState},
    dev::{
        DeviceHandle, Region,
        driver::{DeviceMatch, Driver, DriverData, DriverInitError},
    },
    error::SocError,
};
use core::fmt::{self, Display};
use std::io;

static MATCHES: [DeviceMatch; 2] = [
    DeviceMatch::new("aspeed,ast2400-debug-ahb-bridge"),
    DeviceMatch::new("aspeed,ast2500-debug-ahb-bridge"),
];

/// UART the debug console is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugUart {
    Uart1,
    Uart5,
}

impl Display for DebugUart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebugUart::Uart1 => f.write_str("UART1"),
            DebugUart::Uart5 => f.write_str("UART5"),
        }
    }
}

#[derive(Debug)]
pub struct DebugBridge {
    scu: Region,
}

impl DebugBridge {
    pub fn new(scu: Region) -> DebugBridge {
        DebugBridge { scu }
    }
}

impl BridgeController for DebugBridge {
    fn name(&self) -> &str {
        "debug"
    }

    fn report(
        &mut self,
        ahb: &mut dyn Ahb,
        verbose: bool,
        out: &mut dyn io::Write,
    ) -> Result<BridgeMode, SocError> {
        let misc = Misc::from_bits_truncate(ahb.read(self.scu.start + scu::MISC)?);
        let state = IpState::from_enabled(!misc.contains(Misc::UART_DBG));
        let mode = if state == IpState::Enabled {
            BridgeMode::Permissive
        } else {
            BridgeMode::Disabled
        };

        if verbose {
            writeln!(out, "Debug UART: {}", mode)?;
            if state == IpState::Enabled {
                let strap = HwStrap::from_bits_truncate(ahb.read(self.scu.start + scu::HW_STRAP)?);
                let uart = if strap.contains(HwStrap::UART_DBG_SEL) {
                    DebugUart::Uart5
                } else {
                    DebugUart::Uart1
                };
                writeln!(out, "\tRouted to: {}", uart)?;
            }
        }
        Ok(mode)
    }
}

#[derive(Debug)]
pub struct DebugDriver;

pub static DRIVER: DebugDriver = DebugDriver;

impl Driver for DebugDriver {
    fn get_name(&self) -> &'static str {
        "debug"
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
        let scu = soc.device_get_memory(node)?;
        Ok(BridgeRegistration::announce(soc, dev, Box::new(DebugBridge::new(scu))))
    }

    fn destroy(&self, soc: &mut Soc<'_>, _dev: DeviceHandle, data: DriverData) {
        BridgeRegistration::withdraw(soc, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ahb::MemoryAhb;

    const SCU: Region = Region {
        start: 0x1e6e_2000,
        length: 0x1000,
    };

    #[test]
    fn disable_bit_turns_the_console_off() {
        let mut ahb = MemoryAhb::new().with(SCU.start + scu::MISC, Misc::UART_DBG.bits());
        assert_eq!(DebugBridge::new(SCU).status(&mut ahb).unwrap(), BridgeMode::Disabled);
    }

    #[test]
    fn report_names_the_routed_uart() {
        let mut ahb = MemoryAhb::new().with(SCU.start + scu::HW_STRAP, HwStrap::UART_DBG_SEL.bits());
        let mut out = vec![];
        let mode = DebugBridge::new(SCU).report(&mut ahb, true, &mut out).unwrap();
        assert_eq!(mode, BridgeMode::Permissive);
        assert_eq!(String::from_utf8(out).unwrap(), "Debug UART: Permissive\n\tRouted to: UART5\n");
    }
}
