use crate::{
    ahb::Ahb,
    bridge::BridgeEntry,
    dev::{
        Device,
        driver::{self, DriverRegistry},
    },
    devicetree,
    error::SocError,
    rev::{self, Generation},
};
use dt::node::DeviceTree;
use log::{error, info};

/// One audit session against one SoC.
///
/// Owns a private copy of the hardware description, the devices bound from it and the bridge
/// controllers those devices registered. The bus transport is borrowed for the session.
/// Dropping the context unbinds every device.
pub struct Soc<'a> {
    rev: u32,
    generation: Generation,
    pub(crate) tree: DeviceTree,
    pub(crate) ahb: &'a mut dyn Ahb,
    pub(crate) devices: Vec<Device>,
    pub(crate) bridges: Vec<BridgeEntry>,
    pub(crate) next_bridge_id: usize,
}

impl<'a> Soc<'a> {
    /// A context for `rev` using the built-in description of its generation. No drivers are
    /// bound yet.
    pub fn from_rev(ahb: &'a mut dyn Ahb, rev: u32) -> Result<Soc<'a>, SocError> {
        let generation = rev::generation(rev).inspect_err(|_| {
            error!("Found unsupported SoC generation: {:#010x}", rev);
        })?;
        Soc::from_blob(ahb, rev, devicetree::blob(generation))
    }

    /// A context for `rev` using the description in `blob`. The blob is copied.
    pub fn from_blob(ahb: &'a mut dyn Ahb, rev: u32, blob: &[u8]) -> Result<Soc<'a>, SocError> {
        let generation = rev::generation(rev)?;
        let tree = dt::parse(blob).inspect_err(|err| {
            error!("Failed to parse hardware description: {}", err);
        })?;
        Ok(Soc {
            rev,
            generation,
            tree,
            ahb,
            devices: vec![],
            bridges: vec![],
            next_bridge_id: 0,
        })
    }

    /// Identify the SoC behind `ahb` and bind the registered drivers to its devices.
    pub fn probe(ahb: &'a mut dyn Ahb) -> Result<Soc<'a>, SocError> {
        Soc::probe_with(ahb, driver::registry())
    }

    pub fn probe_with(ahb: &'a mut dyn Ahb, registry: &DriverRegistry) -> Result<Soc<'a>, SocError> {
        let rev = rev::probe(ahb).inspect_err(|err| {
            error!("Failed to probe SoC revision: {}", err);
        })?;
        let mut soc = Soc::from_rev(ahb, rev)?;
        info!(
            "Probed {} ({:#010x})",
            rev::name(rev).unwrap_or("SoC"),
            rev
        );
        soc.bind_drivers(registry)?;
        Ok(soc)
    }

    pub fn rev(&self) -> u32 {
        self.rev
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn tree(&self) -> &DeviceTree {
        &self.tree
    }

    /// The bus transport, for driver init and reports.
    pub fn ahb(&mut self) -> &mut (dyn Ahb + 'a) {
        &mut *self.ahb
    }
}

impl Drop for Soc<'_> {
    fn drop(&mut self) {
        self.unbind_all();
    }
}
