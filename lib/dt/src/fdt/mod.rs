//! This module provides functionalities to read and write a flattened device tree

use bitflags::bitflags;
use core::fmt;
use utils::endian::{BigEndian32, BigEndian64, EndianData};

pub mod reader;
pub mod writer;

/// Expected FDT magic number (0xd00dfeed).
pub const FDT_MAGIC: u32 = 0xd00dfeed;
/// The FDT version this crate reads and writes.
pub const FDT_VERSION: u32 = 17;
/// The last compatible FDT version accepted by the reader.
pub const LAST_COMP_VERSION: u32 = 16;

/// Raw Flattened Device Tree header (big-endian fields).
///
/// This maps directly to the FDT header structure; fields are stored as
/// big-endian 32-bit values and should be interpreted as `EndianData`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FdtHeader {
    pub magic: BigEndian32,
    pub totalsize: BigEndian32,
    pub off_dt_struct: BigEndian32,
    pub off_dt_strings: BigEndian32,
    pub off_mem_rsvmap: BigEndian32,
    pub version: BigEndian32,
    pub last_comp_version: BigEndian32,
    pub boot_cpuid_phys: BigEndian32,
    pub size_dt_strings: BigEndian32,
    pub size_dt_struct: BigEndian32,
}

impl FdtHeader {
    pub const SIZE: usize = size_of::<FdtHeader>();

    /// Decode the header from the start of a blob. Return [None] if the blob is too short.
    pub fn from_bytes(blob: &[u8]) -> Option<FdtHeader> {
        let mut words = blob.get(..Self::SIZE)?.chunks_exact(4).map(BigEndian32::from_raw);
        let mut next = || words.next().flatten();
        Some(FdtHeader {
            magic: next()?,
            totalsize: next()?,
            off_dt_struct: next()?,
            off_dt_strings: next()?,
            off_mem_rsvmap: next()?,
            version: next()?,
            last_comp_version: next()?,
            boot_cpuid_phys: next()?,
            size_dt_strings: next()?,
            size_dt_struct: next()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let words = [
            self.magic,
            self.totalsize,
            self.off_dt_struct,
            self.off_dt_strings,
            self.off_mem_rsvmap,
            self.version,
            self.last_comp_version,
            self.boot_cpuid_phys,
            self.size_dt_strings,
            self.size_dt_struct,
        ];
        let mut res = [0u8; Self::SIZE];
        for (chunk, word) in res.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_raw());
        }
        res
    }

    pub fn totalsize(&self) -> usize {
        self.totalsize.value() as usize
    }
}

/// Flattened Reserved Memory Entry
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ReservedMemoryEntry {
    pub addr: BigEndian64,
    pub size: BigEndian64,
}

impl ReservedMemoryEntry {
    pub const SIZE: usize = size_of::<ReservedMemoryEntry>();

    pub fn from_bytes(bytes: &[u8]) -> Option<ReservedMemoryEntry> {
        Some(ReservedMemoryEntry {
            addr: BigEndian64::from_raw(bytes)?,
            size: BigEndian64::from_raw(bytes.get(8..)?)?,
        })
    }
}

bitflags! {
    /// Type tags found in the FDT structure block.
    pub struct FdtNodeType : u32{
        /// Begin a node (followed by its name string)
        const FDT_BEGIN_NODE  = 0x01;
        /// End a node
        const FDT_END_NODE    = 0x02;
        /// A property entry (length, nameoff, data)
        const FDT_PROP        = 0x03;
        /// No-op padding word
        const FDT_NOP         = 0x04;
        /// End of the structure block
        const FDT_END         = 0x09;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FdtError {
    InvalidNodeType { node_type: usize, cursor: usize },
    InvalidMagic { magic: usize },
    IncompatibleVersion { version: usize },
    /// A read ran past the end of the blob or of the block it belongs to.
    Truncated { cursor: usize },
    /// A name is not NUL-terminated or not valid UTF-8.
    BadString { offset: usize },
    BadPhandle { node: usize },
    /// A memory reservation entry wraps past the end of the address space.
    BadReservation { cursor: usize },
}

impl fmt::Display for FdtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FdtError::InvalidNodeType { node_type, cursor } => {
                write!(f, "unexpected token {:#x} at offset {:#x}", node_type, cursor)
            }
            FdtError::InvalidMagic { magic } => write!(f, "bad magic {:#010x}", magic),
            FdtError::IncompatibleVersion { version } => {
                write!(f, "unsupported version {}", version)
            }
            FdtError::Truncated { cursor } => write!(f, "truncated at offset {:#x}", cursor),
            FdtError::BadString { offset } => write!(f, "bad string at offset {:#x}", offset),
            FdtError::BadPhandle { node } => write!(f, "malformed phandle on node {}", node),
            FdtError::BadReservation { cursor } => {
                write!(f, "memory reservation at offset {:#x} overflows", cursor)
            }
        }
    }
}
