//! Platform drivers that are not bridge controllers, and the registration order of all drivers

pub mod sdmc;

use crate::{bridge, dev::driver::DriverRegistry};

/// Register every driver. Earlier entries win when several drivers match one node.
pub fn register_drivers(registry: &mut DriverRegistry) {
    registry.register(&sdmc::DRIVER);
    registry.register(&bridge::ilpc::DRIVER);
    registry.register(&bridge::p2a::DRIVER);
    registry.register(&bridge::debug::DRIVER);
}
