//! PCIe-to-AHB bridge (P2A), exposed to the host through the BMC's VGA and BMC PCIe functions.
//!
//! The bridge is only reachable when one of the PCIe functions has its MMIO BAR enabled. The
//! AHB is then split into regions whose write protection is controlled individually through
//! SCU02C.

use crate::{
    Soc,
    ahb::Ahb,
    ast::scu::{self, Misc, PcieConfig},
    bridge::{BridgeController, BridgeMode, BridgeRegistration, IpState},
    dev::{
        DeviceHandle, Region,
        driver::{DeviceMatch, Driver, DriverData, DriverInitError},
    },
    drivers::sdmc::Sdmc,
    error::SocError,
};
use log::warn;
use std::io;

/// A slice of the AHB with its own write-protect bit.
#[derive(Debug)]
pub struct P2aRegion {
    pub name: &'static str,
    pub start: u32,
    pub length: u32,
    pub read_only: Misc,
}

#[derive(Debug)]
pub struct P2aConfig {
    pub regions: &'static [P2aRegion],
}

const fn region(name: &'static str, start: u32, length: u32, read_only: Misc) -> P2aRegion {
    P2aRegion {
        name,
        start,
        length,
        read_only,
    }
}

static AST2400_REGIONS: [P2aRegion; 5] = [
    region("Firmware", 0x0000_0000, 0x1800_0000, Misc::G4_P2A_FMC_RO),
    region("SoC IO", 0x1800_0000, 0x0800_0000, Misc::G4_P2A_SOC_RO),
    region("SPI", 0x2000_0000, 0x1000_0000, Misc::G4_P2A_SPI_RO),
    region("Reserved", 0x3000_0000, 0x1000_0000, Misc::G4_P2A_SPI_RO),
    region("DRAM", 0x4000_0000, 0xc000_0000, Misc::G4_P2A_DRAM_RO),
];

static AST2500_REGIONS: [P2aRegion; 7] = [
    region("Firmware", 0x0000_0000, 0x1000_0000, Misc::G5_P2A_FLASH_RO),
    region("SoC IO", 0x1000_0000, 0x1000_0000, Misc::G5_P2A_SOC_RO),
    region("FMC", 0x2000_0000, 0x1000_0000, Misc::G5_P2A_FLASH_RO),
    region("SPI", 0x3000_0000, 0x1000_0000, Misc::G5_P2A_FLASH_RO),
    region("Reserved", 0x4000_0000, 0x2000_0000, Misc::G5_P2A_FLASH_RO),
    region("LPC Host", 0x6000_0000, 0x2000_0000, Misc::G5_P2A_LPCH_RO),
    region("DRAM", 0x8000_0000, 0x8000_0000, Misc::G5_P2A_DRAM_RO),
];

static AST2400: P2aConfig = P2aConfig {
    regions: &AST2400_REGIONS,
};
static AST2500: P2aConfig = P2aConfig {
    regions: &AST2500_REGIONS,
};

static MATCHES: [DeviceMatch; 2] = [
    DeviceMatch::with_data("aspeed,ast2400-p2a-bridge", &AST2400),
    DeviceMatch::with_data("aspeed,ast2500-p2a-bridge", &AST2500),
];

/// PCIe functions that can carry the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcieState {
    pub vga: IpState,
    pub vga_mmio: IpState,
    pub vga_xdma: IpState,
    pub bmc: IpState,
    pub bmc_mmio: IpState,
    pub bmc_xdma: IpState,
}

impl PcieState {
    pub fn decode(config: PcieConfig) -> PcieState {
        let vga = config.contains(PcieConfig::VGA);
        let bmc = config.contains(PcieConfig::BMC);
        PcieState {
            vga: IpState::from_enabled(vga),
            vga_mmio: IpState::from_enabled(vga && config.contains(PcieConfig::VGA_MMIO)),
            vga_xdma: IpState::from_enabled(vga && config.contains(PcieConfig::VGA_XDMA)),
            bmc: IpState::from_enabled(bmc),
            bmc_mmio: IpState::from_enabled(bmc && config.contains(PcieConfig::BMC_MMIO)),
            bmc_xdma: IpState::from_enabled(bmc && config.contains(PcieConfig::BMC_XDMA)),
        }
    }

    /// Whether the host can reach the bridge through either function.
    pub fn exposed(&self) -> bool {
        self.vga_mmio == IpState::Enabled || self.bmc_mmio == IpState::Enabled
    }
}

#[derive(Debug)]
pub struct P2aBridge {
    scu: Region,
    config: &'static P2aConfig,
    dram: Region,
    vga: Option<Region>,
}

impl P2aBridge {
    pub fn new(scu: Region, config: &'static P2aConfig, dram: Region, vga: Option<Region>) -> P2aBridge {
        P2aBridge {
            scu,
            config,
            dram,
            vga,
        }
    }
}

impl BridgeController for P2aBridge {
    fn name(&self) -> &str {
        "p2a"
    }

    fn report(
        &mut self,
        ahb: &mut dyn Ahb,
        verbose: bool,
        out: &mut dyn io::Write,
    ) -> Result<BridgeMode, SocError> {
        let pcie = PcieState::decode(PcieConfig::from_bits_truncate(
            ahb.read(self.scu.start + scu::PCIE_CONFIG)?,
        ));
        let misc = if pcie.exposed() {
            Some(Misc::from_bits_truncate(ahb.read(self.scu.start + scu::MISC)?))
        } else {
            None
        };
        let mode = match misc {
            None => BridgeMode::Disabled,
            Some(misc) if self.config.regions.iter().all(|r| misc.contains(r.read_only)) => {
                BridgeMode::Restricted
            }
            Some(_) => BridgeMode::Permissive,
        };

        if verbose {
            writeln!(out, "PCIe-to-AHB bridge (P2A): {}", mode)?;
            writeln!(
                out,
                "\tVGA device: {} (MMIO: {}, XDMA: {})",
                pcie.vga, pcie.vga_mmio, pcie.vga_xdma
            )?;
            writeln!(
                out,
                "\tBMC device: {} (MMIO: {}, XDMA: {})",
                pcie.bmc, pcie.bmc_mmio, pcie.bmc_xdma
            )?;
            if let Some(misc) = misc {
                for region in self.config.regions {
                    let access = if misc.contains(region.read_only) {
                        "read-only"
                    } else {
                        "read-write"
                    };
                    writeln!(
                        out,
                        "\t{:<10} {:#010x}-{:#010x} {}",
                        region.name,
                        region.start,
                        region.start.wrapping_add(region.length - 1),
                        access
                    )?;
                }
            }
            writeln!(
                out,
                "\tInstalled DRAM: {:#010x}-{:#010x}",
                self.dram.start,
                self.dram.end()
            )?;
            if let Some(vga) = self.vga {
                writeln!(out, "\tVGA memory: {:#010x}-{:#010x}", vga.start, vga.end())?;
            }
        }
        Ok(mode)
    }
}

#[derive(Debug)]
pub struct P2aDriver;

pub static DRIVER: P2aDriver = P2aDriver;

impl Driver for P2aDriver {
    fn get_name(&self) -> &'static str {
        "p2a"
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
            .device_get_match_data::<P2aConfig>(&MATCHES, node)?
            .ok_or(DriverInitError::Customized {
                info: "no region layout for this bridge",
            })?;
        let scu = soc.device_get_memory(node)?;
        let dram = Sdmc::lookup(soc).map_err(|err| {
            warn!("P2A needs the SDRAM controller: {}", err);
            DriverInitError::Dependency { driver: "sdmc" }
        })?;
        let vga = match soc.device_get_memory_region_named(node, "vga") {
            Ok(region) => Some(region),
            Err(SocError::NotFound) => None,
            Err(err) => return Err(err.into()),
        };
        let bridge = P2aBridge::new(scu, config, dram, vga);
        Ok(BridgeRegistration::announce(soc, dev, Box::new(bridge)))
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
    const DRAM: Region = Region {
        start: 0x8000_0000,
        length: 0x2000_0000,
    };

    fn bridge() -> P2aBridge {
        P2aBridge::new(SCU, &AST2500, DRAM, None)
    }

    fn all_read_only() -> u32 {
        AST2500_REGIONS
            .iter()
            .fold(Misc::empty(), |acc, r| acc | r.read_only)
            .bits()
    }

    #[test]
    fn no_mmio_function_means_disabled() {
        let mut ahb = MemoryAhb::new().with(SCU.start + scu::PCIE_CONFIG, PcieConfig::VGA.bits());
        assert_eq!(bridge().status(&mut ahb).unwrap(), BridgeMode::Disabled);
    }

    #[test]
    fn mmio_gates_on_function_enable() {
        let state = PcieState::decode(PcieConfig::VGA_MMIO | PcieConfig::BMC_MMIO);
        assert!(!state.exposed());
        let state = PcieState::decode(PcieConfig::BMC | PcieConfig::BMC_MMIO);
        assert!(state.exposed());
        assert_eq!(state.vga, IpState::Disabled);
    }

    #[test]
    fn write_protection_decides_between_restricted_and_permissive() {
        let pcie = (PcieConfig::VGA | PcieConfig::VGA_MMIO).bits();
        let mut ahb = MemoryAhb::new()
            .with(SCU.start + scu::PCIE_CONFIG, pcie)
            .with(SCU.start + scu::MISC, all_read_only());
        assert_eq!(bridge().status(&mut ahb).unwrap(), BridgeMode::Restricted);

        ahb.set(SCU.start + scu::MISC, all_read_only() & !Misc::G5_P2A_DRAM_RO.bits());
        assert_eq!(bridge().status(&mut ahb).unwrap(), BridgeMode::Permissive);
        assert!(ahb.writes().is_empty());
    }

    #[test]
    fn verbose_report_lists_regions() {
        let pcie = (PcieConfig::VGA | PcieConfig::VGA_MMIO).bits();
        let mut ahb = MemoryAhb::new().with(SCU.start + scu::PCIE_CONFIG, pcie);
        let vga = Region {
            start: 0x9f00_0000,
            length: 0x0100_0000,
        };
        let mut bridge = P2aBridge::new(SCU, &AST2500, DRAM, Some(vga));
        let mut out = vec![];
        assert_eq!(bridge.report(&mut ahb, true, &mut out).unwrap(), BridgeMode::Permissive);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("DRAM       0x80000000-0xffffffff read-write"));
        assert!(text.contains("VGA memory: 0x9f000000-0x9fffffff"));
        assert!(text.contains("Installed DRAM: 0x80000000-0x9fffffff"));
    }
}
