//! Locating description nodes and resolving their resources

use crate::{
    Soc,
    dev::{DeviceNode, driver::DeviceMatch},
    error::{DescriptionError, SocError},
};
use core::any::Any;
use std::borrow::Cow;
use dt::{node::Node, prop::PropertyError};
use log::{debug, error, warn};

/// A register window or memory region: `length` bytes from `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: u32,
    pub length: u32,
}

impl Region {
    /// Last address covered by the region.
    pub fn end(&self) -> u32 {
        self.start.wrapping_add(self.length.saturating_sub(1))
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr - self.start < self.length
    }
}

impl Soc<'_> {
    pub(crate) fn node(&self, dn: DeviceNode) -> Result<&Node, SocError> {
        self.tree.get(dn.offset).ok_or(SocError::InvalidArgument)
    }

    /// Full path of `dn`, for diagnostics.
    pub fn node_path(&self, dn: DeviceNode) -> Box<str> {
        match self.tree.get(dn.offset) {
            Some(node) => self.tree.get_full_path(node),
            None => Box::from("<invalid node>"),
        }
    }

    pub fn root(&self) -> DeviceNode {
        DeviceNode {
            offset: self.tree.root_id,
        }
    }

    /// Resolve `name` as an alias, or failing that as a path.
    ///
    /// A relative path is taken to start with an alias, e.g. `lpc/ilpc-ahb-bridge`.
    pub fn device_from_name(&self, name: &str) -> Result<DeviceNode, SocError> {
        debug!("fdt: Looking up device name '{}'", name);
        let path = match self.tree.get_alias(name)? {
            Some(path) => Cow::Borrowed(path),
            None if name.starts_with('/') => Cow::Borrowed(name),
            None => {
                let Some((alias, rest)) = name.split_once('/') else {
                    return Err(SocError::InvalidArgument);
                };
                let Some(base) = self.tree.get_alias(alias)? else {
                    return Err(SocError::InvalidArgument);
                };
                Cow::Owned(format!("{}/{}", base.trim_end_matches('/'), rest))
            }
        };
        debug!("fdt: Locating node with device path '{}'", path);
        if !path.starts_with('/') {
            return Err(SocError::InvalidArgument);
        }
        self.tree
            .get_node(&*path)
            .map(|node| DeviceNode {
                offset: node.node_id,
            })
            .ok_or(SocError::NotFound)
    }

    /// First top-level node whose `device_type` is `ty`.
    pub fn device_from_type(&self, ty: &str) -> Result<DeviceNode, SocError> {
        debug!("fdt: Searching devicetree for type '{}'", ty);
        for node in self.tree.get_children(self.tree.root()) {
            if let Some(prop) = self.tree.get_property(node, "device_type") {
                if prop.value_as_str()? == ty {
                    return Ok(DeviceNode {
                        offset: node.node_id,
                    });
                }
            }
        }
        Err(SocError::NotFound)
    }

    /// Find a node for the first entry of `table` that matches anywhere in the description.
    ///
    /// The root is tried before the rest of the tree for each entry.
    pub fn device_match_node(&self, table: &[DeviceMatch]) -> Result<DeviceNode, SocError> {
        let root = self.tree.root();
        let root_compat = self
            .tree
            .get_property(root, "compatible")
            .map(|prop| prop.value_as_str())
            .transpose()?;
        for entry in table {
            debug!("Searching devicetree for compatible '{}'", entry.compatible);
            if root_compat == Some(entry.compatible) {
                return Ok(self.root());
            }
            if let Some(node) = self.tree.find_compatible(Some(root.node_id), entry.compatible)? {
                return Ok(DeviceNode {
                    offset: node.node_id,
                });
            }
        }
        Err(SocError::NotFound)
    }

    pub fn device_is_compatible(
        &self,
        table: &[DeviceMatch],
        dn: DeviceNode,
    ) -> Result<bool, SocError> {
        Ok(self.device_get_match(table, dn)?.is_some())
    }

    fn device_get_match<'t>(
        &self,
        table: &'t [DeviceMatch],
        dn: DeviceNode,
    ) -> Result<Option<&'t DeviceMatch>, SocError> {
        let node = self.node(dn)?;
        for entry in table {
            if self.tree.check_compatible(node, entry.compatible)? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Data attached to the first entry of `table` that `dn` is compatible with.
    ///
    /// `Ok(None)` if nothing matches or the matching entry carries no data of type `T`.
    pub fn device_get_match_data<T: Any>(
        &self,
        table: &[DeviceMatch],
        dn: DeviceNode,
    ) -> Result<Option<&'static T>, SocError> {
        Ok(self
            .device_get_match(table, dn)?
            .and_then(|entry| entry.data)
            .and_then(|data| data.downcast_ref::<T>()))
    }

    /// The node that holds the resources of `dn`: its parent if that is a `simple-mfd`,
    /// otherwise `dn` itself.
    pub fn device_resolve_node(&self, dn: DeviceNode) -> Result<DeviceNode, SocError> {
        let node = self.node(dn)?;
        let Some(parent) = self.tree.get_parent(node) else {
            error!("Failed to find parent of {}", self.tree.get_full_path(node));
            return Err(SocError::InvalidArgument);
        };
        if self.tree.check_compatible(parent, "simple-mfd")? {
            Ok(DeviceNode {
                offset: parent.node_id,
            })
        } else {
            Ok(dn)
        }
    }

    /// The `index`th `<address size>` pair of the `reg` property governing `dn`.
    ///
    /// Assumes one address cell and one size cell.
    pub fn device_get_memory_index(&self, dn: DeviceNode, index: usize) -> Result<Region, SocError> {
        let dn = self.device_resolve_node(dn)?;
        let node = self.node(dn)?;
        let Some(reg) = self.tree.get_property(node, "reg") else {
            warn!("fdt: Failed to find reg property in {}", self.tree.get_full_path(node));
            return Err(SocError::NotFound);
        };
        let cells = reg.value_as_cells()?;
        let first = index.checked_mul(2).ok_or(SocError::OutOfRange)?;
        let last = first.checked_add(2).ok_or(SocError::OutOfRange)?;
        match cells.get(first..last) {
            Some(&[start, length]) => Ok(Region { start, length }),
            _ => Err(SocError::OutOfRange),
        }
    }

    pub fn device_get_memory(&self, dn: DeviceNode) -> Result<Region, SocError> {
        self.device_get_memory_index(dn, 0)
    }

    /// The region `name` in `memory-region-names`, via the matching `memory-region` phandle.
    pub fn device_get_memory_region_named(
        &self,
        dn: DeviceNode,
        name: &str,
    ) -> Result<Region, SocError> {
        let node = self.node(dn)?;
        let path = self.tree.get_full_path(node);
        let index = match self.tree.get_property(node, "memory-region-names") {
            Some(names) => names.stringlist_search(name)?,
            None => None,
        };
        let Some(index) = index else {
            warn!("fdt: No memory region named '{}' for {}", name, path);
            return Err(SocError::NotFound);
        };
        let Some(regions) = self.tree.get_property(node, "memory-region") else {
            warn!("fdt: Failed to find 'memory-region' property in {}", path);
            return Err(SocError::NotFound);
        };
        let Some(&phandle) = regions.value_as_cells()?.get(index) else {
            error!(
                "fdt: Memory region name '{}' at index {} is out of range in {}",
                name, index, path
            );
            return Err(SocError::OutOfRange);
        };
        let Some(target) = self.tree.get_node_by_phandle(phandle) else {
            error!(
                "fdt: Failed to find node for phandle {} at index {}",
                phandle, index
            );
            return Err(SocError::CorruptDescription(DescriptionError::Property(
                PropertyError::DanglingHandle,
            )));
        };
        self.device_get_memory(DeviceNode {
            offset: target.node_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_bounds() {
        let region = Region {
            start: 0x1e78a000,
            length: 0x100,
        };
        assert_eq!(region.end(), 0x1e78a0ff);
        assert!(region.contains(0x1e78a0ff));
        assert!(!region.contains(0x1e78a100));
        assert!(!region.contains(0x1e789fff));
    }
}
