//! Serialise a node tree into a flattened device tree blob.
//!
//! Used at build time to compile the bundled hardware descriptions, and by tests to
//! fabricate descriptions.

use crate::{
    fdt::{
        FDT_MAGIC, FDT_VERSION, FdtHeader, FdtNodeType, LAST_COMP_VERSION, ReservedMemoryEntry,
    },
    prop::Property,
};
use alloc::{collections::btree_map::BTreeMap, string::String, vec, vec::Vec};
use utils::{
    endian::{BigEndian32, EndianData},
    num::AlignableTo,
};

/// A node under construction.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    name: String,
    props: Vec<Property>,
    children: Vec<NodeBuilder>,
}

impl NodeBuilder {
    pub fn new(name: impl Into<String>) -> NodeBuilder {
        NodeBuilder {
            name: name.into(),
            props: vec![],
            children: vec![],
        }
    }

    pub fn add_prop(&mut self, name: &str, data: &[u8]) {
        self.props.push(Property::new(name, data));
    }

    pub fn add_child(&mut self, child: NodeBuilder) {
        self.children.push(child);
    }

    pub fn prop(mut self, name: &str, data: &[u8]) -> NodeBuilder {
        self.add_prop(name, data);
        self
    }

    pub fn prop_empty(self, name: &str) -> NodeBuilder {
        self.prop(name, &[])
    }

    pub fn prop_str(self, name: &str, value: &str) -> NodeBuilder {
        self.prop_strlist(name, &[value])
    }

    pub fn prop_strlist(self, name: &str, values: &[&str]) -> NodeBuilder {
        let mut data = vec![];
        for value in values {
            data.extend_from_slice(value.as_bytes());
            data.push(0);
        }
        self.prop(name, &data)
    }

    pub fn prop_u32(self, name: &str, value: u32) -> NodeBuilder {
        self.prop_cells(name, &[value])
    }

    pub fn prop_cells(self, name: &str, cells: &[u32]) -> NodeBuilder {
        let data: Vec<u8> = cells
            .iter()
            .flat_map(|x| BigEndian32::from_value(*x).to_raw())
            .collect();
        self.prop(name, &data)
    }

    pub fn child(mut self, child: NodeBuilder) -> NodeBuilder {
        self.add_child(child);
        self
    }
}

/// Accumulates the structure and string blocks of a blob.
pub struct FdtWriter {
    structure: Vec<u8>,
    strings: Vec<u8>,
    string_offsets: BTreeMap<String, u32>,
}

impl FdtWriter {
    /// Offset of the (empty) memory reservation map: directly after the header.
    const RSVMAP_OFFSET: usize = FdtHeader::SIZE;
    const RSVMAP_SIZE: usize = ReservedMemoryEntry::SIZE;

    /// Build a version 17 blob with an empty memory reservation map.
    pub fn write(root: &NodeBuilder) -> Vec<u8> {
        let mut writer = FdtWriter {
            structure: vec![],
            strings: vec![],
            string_offsets: BTreeMap::new(),
        };
        writer.write_node(root);
        writer.push_u32(FdtNodeType::FDT_END.bits());
        writer.finish()
    }

    fn push_u32(&mut self, value: u32) {
        self.structure
            .extend_from_slice(&BigEndian32::from_value(value).to_raw());
    }

    fn push_bytes_aligned(&mut self, bytes: &[u8]) {
        self.structure.extend_from_slice(bytes);
        let len = self.structure.len().align_up(4);
        self.structure.resize(len, 0);
    }

    fn string_offset(&mut self, name: &str) -> u32 {
        if let Some(offset) = self.string_offsets.get(name) {
            return *offset;
        }
        let offset = self.strings.len() as u32;
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        self.string_offsets.insert(String::from(name), offset);
        offset
    }

    fn write_node(&mut self, node: &NodeBuilder) {
        self.push_u32(FdtNodeType::FDT_BEGIN_NODE.bits());
        let mut name = vec![];
        name.extend_from_slice(node.name.as_bytes());
        name.push(0);
        self.push_bytes_aligned(&name);
        for prop in &node.props {
            let offset = self.string_offset(&prop.name);
            self.push_u32(FdtNodeType::FDT_PROP.bits());
            self.push_u32(prop.data.len() as u32);
            self.push_u32(offset);
            self.push_bytes_aligned(&prop.data);
        }
        for child in &node.children {
            self.write_node(child);
        }
        self.push_u32(FdtNodeType::FDT_END_NODE.bits());
    }

    fn finish(self) -> Vec<u8> {
        let off_dt_struct = Self::RSVMAP_OFFSET + Self::RSVMAP_SIZE;
        let off_dt_strings = off_dt_struct + self.structure.len();
        let totalsize = off_dt_strings + self.strings.len();
        let word = |x: usize| BigEndian32::from_value(x as u32);
        let header = FdtHeader {
            magic: BigEndian32::from_value(FDT_MAGIC),
            totalsize: word(totalsize),
            off_dt_struct: word(off_dt_struct),
            off_dt_strings: word(off_dt_strings),
            off_mem_rsvmap: word(Self::RSVMAP_OFFSET),
            version: BigEndian32::from_value(FDT_VERSION),
            last_comp_version: BigEndian32::from_value(LAST_COMP_VERSION),
            boot_cpuid_phys: word(0),
            size_dt_strings: word(self.strings.len()),
            size_dt_struct: word(self.structure.len()),
        };
        let mut blob = Vec::with_capacity(totalsize);
        blob.extend_from_slice(&header.to_bytes());
        blob.resize(off_dt_struct, 0);
        blob.extend_from_slice(&self.structure);
        blob.extend_from_slice(&self.strings);
        blob
    }
}
