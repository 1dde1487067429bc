//! Error kinds surfaced by the audit engine

use crate::{ahb::AhbError, dev::driver::DriverInitError};
use core::fmt::{self, Display};
use dt::{fdt::FdtError, prop::PropertyError};
use std::io;

/// Why a hardware description was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionError {
    /// The blob itself does not parse.
    Fdt(FdtError),
    /// A property exists but its value is malformed or dangles.
    Property(PropertyError),
}

#[derive(Debug)]
pub enum SocError {
    /// The silicon revision is not one of the supported generations.
    UnsupportedRevision(u32),
    /// The hardware description is structurally invalid.
    CorruptDescription(DescriptionError),
    /// A device, alias, type, compatible match or property does not exist.
    NotFound,
    /// A malformed request, such as a relative device path.
    InvalidArgument,
    /// A requested index lies beyond the end of an existing property.
    OutOfRange,
    /// A bound driver failed to initialise.
    DriverInit(DriverInitError),
    /// The bus transport failed.
    Transport(AhbError),
    /// Writing a report failed.
    Io(io::Error),
}

impl Display for SocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocError::UnsupportedRevision(rev) => {
                write!(f, "unsupported SoC revision {:#010x}", rev)
            }
            SocError::CorruptDescription(DescriptionError::Fdt(err)) => {
                write!(f, "corrupt devicetree: {}", err)
            }
            SocError::CorruptDescription(DescriptionError::Property(err)) => {
                write!(f, "corrupt devicetree: {}", err)
            }
            SocError::NotFound => f.write_str("not found"),
            SocError::InvalidArgument => f.write_str("invalid argument"),
            SocError::OutOfRange => f.write_str("index out of range"),
            SocError::DriverInit(err) => write!(f, "driver initialisation failed: {}", err),
            SocError::Transport(err) => write!(f, "bus transport failed: {}", err),
            SocError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for SocError {}

impl From<FdtError> for SocError {
    fn from(value: FdtError) -> Self {
        SocError::CorruptDescription(DescriptionError::Fdt(value))
    }
}

impl From<PropertyError> for SocError {
    fn from(value: PropertyError) -> Self {
        match value {
            PropertyError::PropNotFound => SocError::NotFound,
            other => SocError::CorruptDescription(DescriptionError::Property(other)),
        }
    }
}

impl From<AhbError> for SocError {
    fn from(value: AhbError) -> Self {
        SocError::Transport(value)
    }
}

impl From<DriverInitError> for SocError {
    fn from(value: DriverInitError) -> Self {
        SocError::DriverInit(value)
    }
}

impl From<io::Error> for SocError {
    fn from(value: io::Error) -> Self {
        SocError::Io(value)
    }
}
