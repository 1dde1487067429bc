#![allow(dead_code)]

use dt::fdt::writer::{FdtWriter, NodeBuilder};
use soc::{
    Soc, SocError,
    ahb::Ahb,
    bridge::{BridgeController, BridgeMode, BridgeRegistration},
    dev::{
        DeviceHandle,
        driver::{DeviceMatch, Driver, DriverData, DriverInitError, DriverRegistry},
    },
    rev,
};
use std::{
    io,
    sync::atomic::{AtomicUsize, Ordering},
};

pub const REV: u32 = rev::AST2500_A1;

/// A small board exercising every lookup path.
pub fn board() -> Vec<u8> {
    let root = NodeBuilder::new("")
        .prop_strlist("compatible", &["test,board"])
        .prop_u32("#address-cells", 1)
        .prop_u32("#size-cells", 1)
        .child(
            NodeBuilder::new("aliases")
                .prop_str("lpc", "/bus/leaf@1e789000")
                .prop_str("mfd", "/bus/mfd@1e6e2000"),
        )
        .child(
            NodeBuilder::new("memory@80000000")
                .prop_str("device_type", "memory")
                .prop_cells("reg", &[0x8000_0000, 0x2000_0000]),
        )
        .child(
            NodeBuilder::new("reserved-memory").child(
                NodeBuilder::new("vga-memory@9f000000")
                    .prop_cells("reg", &[0x9f00_0000, 0x0100_0000])
                    .prop_u32("phandle", 1),
            ),
        )
        .child(
            NodeBuilder::new("bus")
                .prop_strlist("compatible", &["simple-bus"])
                .child(
                    NodeBuilder::new("leaf@1e789000")
                        .prop_strlist("compatible", &["test,leaf"])
                        .prop_cells("reg", &[0x1e78_9000, 0x1000, 0x1e78_a000, 0x100]),
                )
                .child(
                    NodeBuilder::new("mfd@1e6e2000")
                        .prop_strlist("compatible", &["test,mfd", "simple-mfd"])
                        .prop_cells("reg", &[0x1e6e_2000, 0x1000])
                        .child(
                            NodeBuilder::new("child")
                                .prop_strlist("compatible", &["test,child"])
                                .prop_cells("memory-region", &[1, 7])
                                .prop_strlist(
                                    "memory-region-names",
                                    &["vga", "dangling", "short"],
                                ),
                        ),
                )
                .child(
                    NodeBuilder::new("nested")
                        .prop_strlist("compatible", &["simple-bus"])
                        .child(NodeBuilder::new("deep").prop_strlist("compatible", &["test,deep"])),
                )
                .child(
                    NodeBuilder::new("orphan")
                        .prop_strlist("compatible", &["test,orphan"])
                        .child(NodeBuilder::new("below").prop_strlist("compatible", &["test,leaf"])),
                ),
        )
        .child(
            NodeBuilder::new("bridges")
                .prop_strlist("compatible", &["simple-bus"])
                .child(bridge_node("alpha"))
                .child(bridge_node("beta"))
                .child(bridge_node("gamma")),
        );
    FdtWriter::write(&root)
}

fn bridge_node(name: &str) -> NodeBuilder {
    let compat = format!("test,bridge-{}", name);
    NodeBuilder::new(name).prop_strlist("compatible", &[compat.as_str(), "bridge-controller"])
}

/// A driver that counts its calls and can be told to fail.
#[derive(Debug)]
pub struct CountingDriver {
    pub name: &'static str,
    pub matches: &'static [DeviceMatch],
    pub inits: AtomicUsize,
    pub destroys: AtomicUsize,
    pub failures: AtomicUsize,
}

impl CountingDriver {
    pub fn leak(name: &'static str, compatibles: &[&'static str]) -> &'static CountingDriver {
        let matches: Vec<DeviceMatch> = compatibles.iter().map(|c| DeviceMatch::new(*c)).collect();
        Box::leak(Box::new(CountingDriver {
            name,
            matches: Box::leak(matches.into_boxed_slice()),
            inits: AtomicUsize::new(0),
            destroys: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }))
    }

    /// Fail the next `count` inits.
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }
}

impl Driver for CountingDriver {
    fn get_name(&self) -> &'static str {
        self.name
    }

    fn get_matches(&self) -> &'static [DeviceMatch] {
        self.matches
    }

    fn init(&self, _soc: &mut Soc<'_>, _dev: DeviceHandle) -> Result<DriverData, DriverInitError> {
        let attempt = self.inits.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(DriverInitError::Customized { info: "told to fail" });
        }
        Ok(Box::new(attempt))
    }

    fn destroy(&self, _soc: &mut Soc<'_>, _dev: DeviceHandle, _data: DriverData) {
        self.destroys.fetch_add(1, Ordering::SeqCst);
    }
}

/// Reports a fixed mode, or fails when `mode` is `None`.
#[derive(Debug)]
pub struct FixedBridge {
    pub name: &'static str,
    pub mode: Option<BridgeMode>,
}

impl BridgeController for FixedBridge {
    fn name(&self) -> &str {
        self.name
    }

    fn report(
        &mut self,
        _ahb: &mut dyn Ahb,
        verbose: bool,
        out: &mut dyn io::Write,
    ) -> Result<BridgeMode, SocError> {
        let mode = self.mode.ok_or(SocError::InvalidArgument)?;
        if verbose {
            writeln!(out, "{}: {}", self.name, mode)?;
        }
        Ok(mode)
    }
}

/// Registers a [FixedBridge] when initialised.
#[derive(Debug)]
pub struct FixedBridgeDriver {
    pub name: &'static str,
    pub matches: &'static [DeviceMatch],
    pub mode: Option<BridgeMode>,
    /// Whether destroy withdraws the registration.
    pub withdraw: bool,
    pub destroys: AtomicUsize,
}

impl FixedBridgeDriver {
    pub fn leak(name: &'static str, mode: Option<BridgeMode>) -> &'static FixedBridgeDriver {
        let compat: &'static str = Box::leak(format!("test,bridge-{}", name).into_boxed_str());
        Box::leak(Box::new(FixedBridgeDriver {
            name,
            matches: Box::leak(Box::new([DeviceMatch::new(compat)])),
            mode,
            withdraw: true,
            destroys: AtomicUsize::new(0),
        }))
    }

    /// Like [FixedBridgeDriver::leak], but destroy leaves the controller registered.
    pub fn leak_forgetful(
        name: &'static str,
        mode: Option<BridgeMode>,
    ) -> &'static FixedBridgeDriver {
        let compat: &'static str = Box::leak(format!("test,bridge-{}", name).into_boxed_str());
        Box::leak(Box::new(FixedBridgeDriver {
            name,
            matches: Box::leak(Box::new([DeviceMatch::new(compat)])),
            mode,
            withdraw: false,
            destroys: AtomicUsize::new(0),
        }))
    }

    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }
}

impl Driver for FixedBridgeDriver {
    fn get_name(&self) -> &'static str {
        self.name
    }

    fn get_matches(&self) -> &'static [DeviceMatch] {
        self.matches
    }

    fn init(&self, soc: &mut Soc<'_>, dev: DeviceHandle) -> Result<DriverData, DriverInitError> {
        let bridge = FixedBridge {
            name: self.name,
            mode: self.mode,
        };
        Ok(BridgeRegistration::announce(soc, dev, Box::new(bridge)))
    }

    fn destroy(&self, soc: &mut Soc<'_>, _dev: DeviceHandle, data: DriverData) {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        if self.withdraw {
            BridgeRegistration::withdraw(soc, data);
        }
    }
}

pub fn registry(drivers: &[&'static dyn Driver]) -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    for driver in drivers {
        registry.register(*driver);
    }
    registry
}

/// Bound (driver, path) pairs, in binding order.
pub fn bindings(soc: &Soc<'_>) -> Vec<(String, String)> {
    soc.devices()
        .iter()
        .map(|dev| (dev.driver.get_name().to_string(), soc.node_path(dev.node).to_string()))
        .collect()
}
