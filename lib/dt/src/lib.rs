//! Flattened device tree support: an owned, bounds-checked reader and a writer.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod fdt;
pub mod node;
pub mod prop;

use crate::{
    fdt::{FdtError, reader::FdtReader},
    node::DeviceTree,
};

/// Parse `blob` into an owned [DeviceTree].
pub fn parse(blob: &[u8]) -> Result<DeviceTree, FdtError> {
    FdtReader::new(blob).read()
}
