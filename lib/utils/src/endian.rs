//! ## Endianness Module
//! This module provides some structs to better resolve data stored with a specific byte order,
//! such as the cells of a flattened device tree or a register dump.
//!
//! All the types declared here implement [EndianData<T>],
//! which defines [EndianData<T>::value] to read the data in the byte order of the host.

///[u32] in Big Endianness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BigEndian32(u32);

///[u32] in Little Endianness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LittleEndian32(u32);

///[u64] in Big Endianness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BigEndian64(u64);

/// This trait defines a packed data in memory with some specific endianness.
pub trait EndianData<T>: Copy + Clone {
    /// Width of the packed data in bytes.
    const WIDTH: usize;

    /// Parse the value into the endianness of the current architecture.
    fn value(&self) -> T;

    /// Pack a host value.
    fn from_value(value: T) -> Self;

    /// Take the raw bytes as stored in memory. Return [None] if `bytes` is too short.
    fn from_raw(bytes: &[u8]) -> Option<Self>;
}

/// Implement an [EndianData<T>] for a specific type, and explain the data in big endianess
macro_rules! impl_converter_big {
    ($type: tt, $tval: tt) => {
        impl EndianData<$tval> for $type {
            const WIDTH: usize = size_of::<$tval>();

            #[inline(always)]
            fn value(&self) -> $tval {
                $tval::from_be(self.0)
            }

            #[inline(always)]
            fn from_value(value: $tval) -> Self {
                Self(value.to_be())
            }

            #[inline(always)]
            fn from_raw(bytes: &[u8]) -> Option<Self> {
                let raw = bytes.get(..Self::WIDTH)?.try_into().ok()?;
                Some(Self($tval::from_ne_bytes(raw)))
            }
        }
    };
}

/// Implement an [EndianData<T>] for a specific type, and explain the data in little endianess
macro_rules! impl_converter_little {
    ($type: tt, $tval: tt) => {
        impl EndianData<$tval> for $type {
            const WIDTH: usize = size_of::<$tval>();

            #[inline(always)]
            fn value(&self) -> $tval {
                $tval::from_le(self.0)
            }

            #[inline(always)]
            fn from_value(value: $tval) -> Self {
                Self(value.to_le())
            }

            #[inline(always)]
            fn from_raw(bytes: &[u8]) -> Option<Self> {
                let raw = bytes.get(..Self::WIDTH)?.try_into().ok()?;
                Some(Self($tval::from_ne_bytes(raw)))
            }
        }
    };
}

impl_converter_big!(BigEndian32, u32);
impl_converter_big!(BigEndian64, u64);

impl_converter_little!(LittleEndian32, u32);

impl BigEndian32 {
    /// The bytes of the packed value as they are laid out in memory.
    pub fn to_raw(self) -> [u8; 4] {
        self.0.to_ne_bytes()
    }
}

impl LittleEndian32 {
    pub fn to_raw(self) -> [u8; 4] {
        self.0.to_ne_bytes()
    }
}
