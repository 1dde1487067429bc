//! Hardware descriptions compiled in by the build script

use crate::rev::Generation;

static AST2400: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/g4.dtb"));
static AST2500: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/g5.dtb"));
static AST2600: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/g6.dtb"));

pub fn blob(generation: Generation) -> &'static [u8] {
    match generation {
        Generation::G4 => AST2400,
        Generation::G5 => AST2500,
        Generation::G6 => AST2600,
    }
}
