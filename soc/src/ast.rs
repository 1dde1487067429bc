//! Register layout of the Aspeed SCU and LPC controllers

use bitflags::bitflags;

/// System Control Unit
pub mod scu {
    use super::*;

    /// Fixed location of the SCU, needed before any description is loaded.
    pub const BASE: u32 = 0x1e6e_2000;

    pub const G6_SILICON_REVISION: u32 = 0x04;
    pub const MISC: u32 = 0x2c;
    pub const HW_STRAP: u32 = 0x70;
    pub const SILICON_REVISION: u32 = 0x7c;
    pub const PCIE_CONFIG: u32 = 0x180;
    pub const G6_HW_STRAP2: u32 = 0x510;
    /// SCU510 bit set when SuperIO decoding is disabled
    pub const G6_HW_STRAP2_SIO_DEC: u32 = 1 << 3;

    bitflags! {
        /// SCU02C: Misc. Control Register
        pub struct Misc: u32 {
            const G4_P2A_DRAM_RO    = 1 << 25;
            const G4_P2A_SPI_RO     = 1 << 24;
            const G4_P2A_SOC_RO     = 1 << 23;
            const G4_P2A_FMC_RO     = 1 << 22;
            const G5_P2A_DRAM_RO    = 1 << 25;
            const G5_P2A_LPCH_RO    = 1 << 24;
            const G5_P2A_SOC_RO     = 1 << 23;
            const G5_P2A_FLASH_RO   = 1 << 22;
            /// Set when the debug UART is disabled
            const UART_DBG          = 1 << 10;
        }
    }

    bitflags! {
        /// SCU070: Hardware Strapping Register
        pub struct HwStrap: u32 {
            /// Debug UART routed to UART5 rather than UART1
            const UART_DBG_SEL      = 1 << 29;
            /// Set when SuperIO decoding is disabled
            const SIO_DEC           = 1 << 20;
        }
    }

    bitflags! {
        /// SCU180: PCIe Configuration Setting Control Register
        pub struct PcieConfig: u32 {
            const BMC_XDMA          = 1 << 14;
            const BMC_MMIO          = 1 << 9;
            const BMC               = 1 << 8;
            const VGA_XDMA          = 1 << 6;
            const VGA_MMIO          = 1 << 1;
            const VGA               = 1 << 0;
        }
    }
}

/// LPC Host Controller
pub mod lpc {
    use super::*;

    pub const HICRB: u32 = 0x100;

    bitflags! {
        /// HICRB: Host Interface Control Register B
        pub struct Hicrb: u32 {
            /// iLPC2AHB bridge is read-only
            const ILPC_RO           = 1 << 6;
        }
    }
}

/// SDRAM Memory Controller
pub mod sdmc {
    /// MCR04: Configuration Register
    pub const CONFIG: u32 = 0x04;
    pub const CONFIG_DRAM_SIZE_MASK: u32 = 0b11;
}
