use core::{mem::swap, str};

use crate::{
    fdt::{
        FDT_MAGIC, FDT_VERSION, FdtError, FdtHeader, FdtNodeType, LAST_COMP_VERSION,
        ReservedMemoryEntry,
    },
    node::{DeviceTree, Node, NodeType},
    prop::Property,
};
use alloc::{boxed::Box, collections::btree_map::BTreeMap, vec, vec::Vec};
use utils::{
    endian::{BigEndian32, EndianData},
    num::AlignableTo,
};

/// Parser for a flattened device tree held in a byte slice.
///
/// Every offset is bounds-checked, so a corrupt blob produces an [FdtError] rather than
/// a fault.
pub struct FdtReader<'a> {
    blob: &'a [u8],
    cursor: usize,
    nodes: Vec<Node>,
}

/// Basic Reader Functions
impl<'a> FdtReader<'a> {
    /// Read a 32-bit big-endian word at the cursor without advancing it.
    #[inline(always)]
    fn peek_u32(&self) -> Result<u32, FdtError> {
        self.blob
            .get(self.cursor..)
            .and_then(BigEndian32::from_raw)
            .map(|x| x.value())
            .ok_or(FdtError::Truncated {
                cursor: self.cursor,
            })
    }

    /// Advance the cursor by 4 bytes.
    #[inline(always)]
    fn advance(&mut self) {
        self.cursor += 4;
    }

    /// Read a 32-bit big-endian word and advance the cursor by 4 bytes.
    #[inline(always)]
    fn read_u32(&mut self) -> Result<u32, FdtError> {
        let res = self.peek_u32()?;
        self.advance();
        Ok(res)
    }

    /// Read `len` bytes at the cursor and advance it to the next 4-byte aligned position.
    #[inline(always)]
    fn readbytes_aligned(&mut self, len: usize) -> Result<&'a [u8], FdtError> {
        let blob = self.blob;
        let res = blob
            .get(self.cursor..self.cursor + len)
            .ok_or(FdtError::Truncated {
                cursor: self.cursor,
            })?;
        self.cursor = (self.cursor + len).align_up(4);
        Ok(res)
    }

    /// Advance past NOPs to the next meaningful token.
    #[inline(always)]
    fn skip(&mut self) -> Result<(), FdtError> {
        while self.peek_u32()? == FdtNodeType::FDT_NOP.bits() {
            self.advance();
        }
        Ok(())
    }

    /// Read a NUL-terminated string and advance the cursor to the next aligned position.
    #[inline(always)]
    fn readstr_aligned(&mut self) -> Result<&'a str, FdtError> {
        let res = c_str(self.blob, self.cursor, self.blob.len())?;
        self.cursor = (self.cursor + res.len() + 1).align_up(4);
        Ok(res)
    }

    /// Read a tag word and verify it equals `supposed`.
    fn read_and_check(&mut self, supposed: FdtNodeType) -> Result<(), FdtError> {
        let node_type = self.read_u32()?;
        if node_type != supposed.bits() {
            return Err(FdtError::InvalidNodeType {
                node_type: node_type as usize,
                cursor: self.cursor - 4,
            });
        }
        Ok(())
    }
}

/// Borrow the NUL-terminated string starting at `offset`, which must end before `bound`.
fn c_str(blob: &[u8], offset: usize, bound: usize) -> Result<&str, FdtError> {
    let bytes = blob
        .get(offset..bound.min(blob.len()))
        .ok_or(FdtError::BadString { offset })?;
    let len = bytes
        .iter()
        .position(|x| *x == 0)
        .ok_or(FdtError::BadString { offset })?;
    str::from_utf8(&bytes[..len]).map_err(|_| FdtError::BadString { offset })
}

impl<'a> FdtReader<'a> {
    pub fn new(blob: &'a [u8]) -> FdtReader<'a> {
        FdtReader {
            blob,
            cursor: 0,
            nodes: vec![],
        }
    }

    /// Return the decoded FDT header.
    pub fn get_header(&self) -> Result<FdtHeader, FdtError> {
        FdtHeader::from_bytes(self.blob).ok_or(FdtError::Truncated { cursor: 0 })
    }

    /// Validate the FDT header (magic number, compatible version range and size).
    pub fn validate(&self) -> Result<FdtHeader, FdtError> {
        let header = self.get_header()?;

        // 1. Check the magic number
        let magic = header.magic.value();
        if magic != FDT_MAGIC {
            return Err(FdtError::InvalidMagic {
                magic: magic as usize,
            });
        }

        // 2. Check the fdt version. We use version 17, and the last compatible version is 16
        let version = header.version.value();
        if version < LAST_COMP_VERSION || header.last_comp_version.value() > FDT_VERSION {
            return Err(FdtError::IncompatibleVersion {
                version: version as usize,
            });
        }

        // 3. The blob must hold everything the header claims
        if header.totalsize() > self.blob.len() || header.totalsize() < FdtHeader::SIZE {
            return Err(FdtError::Truncated {
                cursor: self.blob.len(),
            });
        }
        Ok(header)
    }

    /// Read a string from the FDT string table.
    fn get_string(&self, header: &FdtHeader, offset: usize) -> Result<&'a str, FdtError> {
        let start = header.off_dt_strings.value() as usize;
        let end = start + header.size_dt_strings.value() as usize;
        c_str(self.blob, start + offset, end)
    }

    /// Read consecutive property entries from the structure block and return them.
    ///
    /// Stops when a non-`FDT_PROP` tag is encountered and returns the collected props.
    fn read_props(&mut self, header: &FdtHeader) -> Result<Vec<Property>, FdtError> {
        let mut res = Vec::<Property>::new();
        loop {
            self.skip()?;
            if self.peek_u32()? != FdtNodeType::FDT_PROP.bits() {
                break Ok(res);
            }
            self.advance();
            let len = self.read_u32()? as usize;
            let name_offset = self.read_u32()? as usize;
            let name = self.get_string(header, name_offset)?;
            let data = self.readbytes_aligned(len)?;
            res.push(Property::new(name, data));
        }
    }

    /// Parse a single node (name, properties and child nodes) from the structure block.
    ///
    /// Ids are handed out before descending so that they follow document order.
    fn read_node(&mut self, header: &FdtHeader, parent: Option<usize>) -> Result<usize, FdtError> {
        self.skip()?;
        self.read_and_check(FdtNodeType::FDT_BEGIN_NODE)?;
        let full_name = self.readstr_aligned()?;
        let (node_name, unit_addr) = match full_name.find('@') {
            Some(idx) => (&full_name[0..idx], &full_name[idx + 1..]),
            None => (full_name, ""),
        };
        let id = self.nodes.len();
        self.nodes.push(Node {
            node_id: id,
            parent_id: parent.unwrap_or(id),
            full_name: Box::from(full_name),
            node_name: Box::from(node_name),
            unit_addr: Box::from(unit_addr),
            children: vec![],
            props: vec![],
            node_type: NodeType::Device,
        });
        self.nodes[id].props = self.read_props(header)?;
        loop {
            self.skip()?;
            let nodetype = self.peek_u32()?;
            if nodetype == FdtNodeType::FDT_BEGIN_NODE.bits() {
                let child = self.read_node(header, Some(id))?;
                self.nodes[id].children.push(child);
            } else if nodetype == FdtNodeType::FDT_END_NODE.bits() {
                self.advance();
                break;
            } else {
                return Err(FdtError::InvalidNodeType {
                    node_type: nodetype as usize,
                    cursor: self.cursor,
                });
            }
        }
        Ok(id)
    }

    /// Walk the memory reservation map up to its all-zero terminator and return the number of
    /// entries.
    ///
    /// Reservations are not kept, but an entry that wraps the address space marks the blob
    /// as corrupt.
    fn check_mem_rsv_map(&self, header: &FdtHeader) -> Result<usize, FdtError> {
        let mut cursor = header.off_mem_rsvmap.value() as usize;
        let mut count = 0;
        loop {
            let entry = self
                .blob
                .get(cursor..cursor + ReservedMemoryEntry::SIZE)
                .and_then(ReservedMemoryEntry::from_bytes)
                .ok_or(FdtError::Truncated { cursor })?;
            let addr = entry.addr.value();
            let size = entry.size.value();
            if addr == 0 && size == 0 {
                break Ok(count);
            }
            if addr.checked_add(size).is_none() {
                break Err(FdtError::BadReservation { cursor });
            }
            count += 1;
            cursor += ReservedMemoryEntry::SIZE;
        }
    }

    fn get_phandle_map(&self) -> Result<BTreeMap<u32, usize>, FdtError> {
        let mut res = BTreeMap::new();
        for node in &self.nodes {
            let prop = node
                .props
                .iter()
                .find(|p| p.name.as_ref() == "phandle" || p.name.as_ref() == "linux,phandle");
            if let Some(prop) = prop {
                let phandle = prop
                    .value_as_u32()
                    .map_err(|_| FdtError::BadPhandle { node: node.node_id })?;
                res.insert(phandle, node.node_id);
            }
        }
        Ok(res)
    }

    fn read_internal(&mut self) -> Result<DeviceTree, FdtError> {
        let header = self.validate()?;
        self.blob = &self.blob[..header.totalsize()];
        self.cursor = header.off_dt_struct.value() as usize;
        let root_id = self.read_node(&header, None)?;
        self.skip()?;
        self.read_and_check(FdtNodeType::FDT_END)?;

        for child in self.nodes[root_id].children.clone() {
            let node = &mut self.nodes[child];
            let described = matches!(
                node.full_name.as_ref(),
                "aliases" | "chosen" | "reserved-memory"
            ) || node.node_name.as_ref() == "memory";
            if described {
                node.node_type = NodeType::Description;
            }
        }

        let reservations = self.check_mem_rsv_map(&header)?;
        let mut tree = DeviceTree {
            root_id,
            container: vec![],
            phandle_map: self.get_phandle_map()?,
        };
        swap(&mut self.nodes, &mut tree.container);
        log::trace!(
            "Parsed device tree with {} nodes, {} phandles and {} memory reservations.",
            tree.container.len(),
            tree.phandle_map.len(),
            reservations
        );
        Ok(tree)
    }

    /// Parse the entire structure block into a [DeviceTree].
    ///
    /// All strings and byte-array data are **copied**, so the source blob can be released
    /// as soon as this returns.
    pub fn read(&mut self) -> Result<DeviceTree, FdtError> {
        match self.read_internal() {
            Ok(res) => Ok(res),
            Err(err) => {
                self.cursor = 0;
                self.nodes.clear();
                Err(err)
            }
        }
    }
}
