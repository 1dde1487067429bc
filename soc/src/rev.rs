//! Silicon revision decoding and probing

use crate::{ahb::Ahb, ast::scu, error::SocError};
use core::fmt::{self, Display};
use log::{debug, error};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Supported SoC generations, keyed by bits 31:24 of the silicon revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Generation {
    /// AST2400
    G4 = 0x02,
    /// AST2500
    G5 = 0x04,
    /// AST2600
    G6 = 0x05,
}

impl Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Generation::G4 => "AST2400",
            Generation::G5 => "AST2500",
            Generation::G6 => "AST2600",
        })
    }
}

pub const AST2400_A0: u32 = 0x0200_0303;
pub const AST2400_A1: u32 = 0x0201_0303;
pub const AST2500_A0: u32 = 0x0400_0303;
pub const AST2500_A1: u32 = 0x0401_0303;
pub const AST2500_A2: u32 = 0x0403_0303;
pub const AST2600_A0: u32 = 0x0500_0303;
pub const AST2600_A1: u32 = 0x0501_0303;
pub const AST2600_A2: u32 = 0x0502_0303;
pub const AST2600_A3: u32 = 0x0503_0303;

const REVISIONS: [(u32, &str); 9] = [
    (AST2400_A0, "AST2400 A0"),
    (AST2400_A1, "AST2400 A1"),
    (AST2500_A0, "AST2500 A0"),
    (AST2500_A1, "AST2500 A1"),
    (AST2500_A2, "AST2500 A2"),
    (AST2600_A0, "AST2600 A0"),
    (AST2600_A1, "AST2600 A1"),
    (AST2600_A2, "AST2600 A2"),
    (AST2600_A3, "AST2600 A3"),
];

/// Marketing name of a known revision.
pub fn name(rev: u32) -> Option<&'static str> {
    REVISIONS.iter().find(|(r, _)| *r == rev).map(|(_, n)| *n)
}

pub fn is_supported(rev: u32) -> bool {
    name(rev).is_some()
}

/// Map a revision onto its generation. Unknown revisions are unsupported even if the
/// generation byte looks familiar.
pub fn generation(rev: u32) -> Result<Generation, SocError> {
    if !is_supported(rev) {
        return Err(SocError::UnsupportedRevision(rev));
    }
    Generation::try_from((rev >> 24) as u8).map_err(|_| SocError::UnsupportedRevision(rev))
}

pub fn is_generation(rev: u32, generation: Generation) -> bool {
    self::generation(rev).is_ok_and(|g| g == generation)
}

/// Read the silicon revision from live hardware.
///
/// AST2400 and AST2500 keep it at SCU07C, AST2600 moved it to SCU004.
pub fn probe(ahb: &mut dyn Ahb) -> Result<u32, SocError> {
    let rev = ahb.read(scu::BASE + scu::SILICON_REVISION)?;
    if is_supported(rev) {
        debug!("Found {} via SCU07C", name(rev).unwrap_or("SoC"));
        return Ok(rev);
    }
    let rev = ahb.read(scu::BASE + scu::G6_SILICON_REVISION)?;
    if is_supported(rev) {
        debug!("Found {} via SCU004", name(rev).unwrap_or("SoC"));
        return Ok(rev);
    }
    error!("Found unsupported SoC revision: {:#010x}", rev);
    Err(SocError::UnsupportedRevision(rev))
}
