//! Register access to the SoC's AHB address space.
//!
//! The audit engine never touches the bus itself; it hands an [Ahb] to drivers and bridge
//! controllers. [MemoryAhb] backs tests and offline replays, [DevMem] talks to a live system.

use core::fmt::{self, Display};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{File, OpenOptions},
    io,
    path::Path,
};
use utils::{
    endian::{EndianData, LittleEndian32},
    num::AlignableTo,
};

/// Addressed 32-bit register access.
pub trait Ahb {
    fn read(&mut self, addr: u32) -> Result<u32, AhbError>;
    fn write(&mut self, addr: u32, value: u32) -> Result<(), AhbError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AhbError {
    /// Register accesses must be word aligned.
    Unaligned { addr: u32 },
    /// The transport refused or failed the access.
    Io { addr: u32, kind: io::ErrorKind },
}

impl Display for AhbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AhbError::Unaligned { addr } => write!(f, "unaligned access at {:#010x}", addr),
            AhbError::Io { addr, kind } => write!(f, "access at {:#010x} failed: {}", addr, kind),
        }
    }
}

fn check_aligned(addr: u32) -> Result<(), AhbError> {
    if !(addr as usize).is_aligned_to(4) {
        return Err(AhbError::Unaligned { addr });
    }
    Ok(())
}

/// A sparse register file. Unset registers read as zero.
#[derive(Debug, Default)]
pub struct MemoryAhb {
    regs: BTreeMap<u32, u32>,
    faults: BTreeSet<u32>,
    writes: Vec<(u32, u32)>,
}

impl MemoryAhb {
    pub fn new() -> MemoryAhb {
        MemoryAhb::default()
    }

    /// Preload a register.
    pub fn with(mut self, addr: u32, value: u32) -> MemoryAhb {
        self.regs.insert(addr, value);
        self
    }

    pub fn set(&mut self, addr: u32, value: u32) {
        self.regs.insert(addr, value);
    }

    /// Make every access to `addr` fail.
    pub fn fault(&mut self, addr: u32) {
        self.faults.insert(addr);
    }

    /// Every write performed so far, in order.
    pub fn writes(&self) -> &[(u32, u32)] {
        &self.writes
    }

    fn check(&self, addr: u32) -> Result<(), AhbError> {
        check_aligned(addr)?;
        if self.faults.contains(&addr) {
            return Err(AhbError::Io {
                addr,
                kind: io::ErrorKind::PermissionDenied,
            });
        }
        Ok(())
    }
}

impl Ahb for MemoryAhb {
    fn read(&mut self, addr: u32) -> Result<u32, AhbError> {
        self.check(addr)?;
        Ok(self.regs.get(&addr).copied().unwrap_or(0))
    }

    fn write(&mut self, addr: u32, value: u32) -> Result<(), AhbError> {
        self.check(addr)?;
        self.regs.insert(addr, value);
        self.writes.push((addr, value));
        Ok(())
    }
}

/// Physical memory exposed through a character device such as `/dev/mem`.
#[derive(Debug)]
pub struct DevMem {
    file: File,
}

impl DevMem {
    pub fn open(path: impl AsRef<Path>) -> io::Result<DevMem> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(DevMem { file })
    }
}

#[cfg(unix)]
impl Ahb for DevMem {
    fn read(&mut self, addr: u32) -> Result<u32, AhbError> {
        use std::os::unix::fs::FileExt;
        check_aligned(addr)?;
        let mut buf = [0u8; 4];
        self.file
            .read_exact_at(&mut buf, addr as u64)
            .map_err(|err| AhbError::Io {
                addr,
                kind: err.kind(),
            })?;
        LittleEndian32::from_raw(&buf)
            .map(|word| word.value())
            .ok_or(AhbError::Io {
                addr,
                kind: io::ErrorKind::UnexpectedEof,
            })
    }

    fn write(&mut self, addr: u32, value: u32) -> Result<(), AhbError> {
        use std::os::unix::fs::FileExt;
        check_aligned(addr)?;
        self.file
            .write_all_at(&LittleEndian32::from_value(value).to_raw(), addr as u64)
            .map_err(|err| AhbError::Io {
                addr,
                kind: err.kind(),
            })
    }
}
