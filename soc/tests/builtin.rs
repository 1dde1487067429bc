use soc::{
    Soc, SocError,
    ahb::MemoryAhb,
    ast::{lpc, scu},
    bridge::BridgeMode,
    drivers::sdmc::{self, Sdmc},
    rev::{self, Generation},
};

const SCU: u32 = scu::BASE;
const SDMC: u32 = 0x1e6e_0000;
const LPC: u32 = 0x1e78_9000;

#[test]
fn each_generation_selects_its_description() {
    for (rev, generation, model) in [
        (rev::AST2400_A1, Generation::G4, "aspeed,ast2400"),
        (rev::AST2500_A2, Generation::G5, "aspeed,ast2500"),
        (rev::AST2600_A3, Generation::G6, "aspeed,ast2600"),
    ] {
        let mut ahb = MemoryAhb::new();
        let soc = Soc::from_rev(&mut ahb, rev).unwrap();
        assert_eq!(soc.rev(), rev);
        assert_eq!(soc.generation(), generation);
        let tree = soc.tree();
        assert!(tree.check_compatible(tree.root(), model).unwrap());
    }
}

#[test]
fn unknown_revisions_are_refused() {
    let mut ahb = MemoryAhb::new();
    assert!(matches!(
        Soc::from_rev(&mut ahb, 0x0600_0303),
        Err(SocError::UnsupportedRevision(0x0600_0303))
    ));
    assert!(matches!(
        Soc::from_rev(&mut ahb, 0x0402_0303),
        Err(SocError::UnsupportedRevision(_))
    ));
    assert!(matches!(Soc::probe(&mut ahb), Err(SocError::UnsupportedRevision(0))));
}

fn ast2500() -> MemoryAhb {
    let all_p2a_ro = (scu::Misc::G5_P2A_DRAM_RO
        | scu::Misc::G5_P2A_LPCH_RO
        | scu::Misc::G5_P2A_SOC_RO
        | scu::Misc::G5_P2A_FLASH_RO)
        .bits();
    MemoryAhb::new()
        .with(SCU + scu::SILICON_REVISION, rev::AST2500_A1)
        .with(SDMC + 0x04, 1)
        .with(
            SCU + scu::PCIE_CONFIG,
            (scu::PcieConfig::VGA | scu::PcieConfig::VGA_MMIO).bits(),
        )
        .with(SCU + scu::MISC, all_p2a_ro | scu::Misc::UART_DBG.bits())
        .with(LPC + lpc::HICRB, lpc::Hicrb::ILPC_RO.bits())
}

#[test]
fn ast2500_binds_every_builtin_driver() {
    let mut ahb = ast2500();
    let mut soc = Soc::probe(&mut ahb).unwrap();
    let drivers: Vec<_> = soc.devices().iter().map(|dev| dev.driver.get_name()).collect();
    assert_eq!(drivers, ["sdmc", "p2a", "debug", "ilpc"]);
    assert_eq!(soc.list_bridge_controllers().unwrap(), ["p2a", "debug", "ilpc"]);

    let dram = soc.driver_data::<Sdmc>(&sdmc::DRIVER).unwrap().dram();
    assert_eq!((dram.start, dram.length), (0x8000_0000, 256 << 20));
}

#[test]
fn ast2500_audit_reports_restricted_when_locked_down() {
    let mut ahb = ast2500();
    let mut out = vec![];
    {
        let mut soc = Soc::probe(&mut ahb).unwrap();
        let audit = soc.probe_bridge_controllers(None, &mut out).unwrap();
        assert!(audit.error.is_none());
        assert_eq!(audit.reported, 3);
        assert_eq!(audit.mode, BridgeMode::Restricted);
    }
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("PCIe-to-AHB bridge (P2A): Restricted"));
    assert!(text.contains("VGA memory: 0x9f000000-0x9fffffff"));
    assert!(text.contains("Debug UART: Disabled"));
    assert!(text.contains("LPC2AHB bridge (iLPC): Restricted"));
    assert!(ahb.writes().is_empty());
}

#[test]
fn ast2500_writable_ilpc_is_permissive() {
    let mut ahb = ast2500();
    ahb.set(LPC + lpc::HICRB, 0);
    let mut soc = Soc::probe(&mut ahb).unwrap();
    let audit = soc.probe_bridge_controllers(Some("ilpc"), &mut Vec::new()).unwrap();
    assert_eq!(audit.mode, BridgeMode::Permissive);
    assert_eq!(audit.reported, 1);
}

#[test]
fn ast2600_revision_is_found_at_its_own_location() {
    let mut ahb = MemoryAhb::new()
        .with(SCU + scu::G6_SILICON_REVISION, rev::AST2600_A3)
        .with(SCU + scu::G6_HW_STRAP2, scu::G6_HW_STRAP2_SIO_DEC);
    let mut soc = Soc::probe(&mut ahb).unwrap();
    assert_eq!(soc.generation(), Generation::G6);
    assert_eq!(soc.list_bridge_controllers().unwrap(), ["ilpc"]);
    let audit = soc.probe_bridge_controllers(None, &mut Vec::new()).unwrap();
    assert_eq!(audit.mode, BridgeMode::Disabled);
}

#[test]
fn p2a_fails_without_dram_controller_access() {
    let mut ahb = ast2500();
    ahb.fault(SDMC + 0x04);
    let mut soc = Soc::probe(&mut ahb).unwrap();
    // p2a cannot come up, the other two still report
    assert_eq!(soc.list_bridge_controllers().unwrap(), ["debug", "ilpc"]);
    let audit = soc.probe_bridge_controllers(None, &mut Vec::new()).unwrap();
    assert_eq!(audit.reported, 2);
    assert_eq!(audit.mode, BridgeMode::Restricted);
    let misc = soc.ahb().read(SCU + scu::MISC).unwrap();
    assert_ne!(misc & scu::Misc::UART_DBG.bits(), 0);
}
