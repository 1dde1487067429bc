use alloc::{boxed::Box, vec, vec::Vec};
use core::{fmt, str};
use utils::endian::{BigEndian32, BigEndian64, EndianData};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: Box<str>,
    pub data: Box<[u8]>,
}

impl Property {
    pub fn new(name: &str, data: &[u8]) -> Property {
        Property {
            name: Box::from(name),
            data: Box::from(data),
        }
    }

    fn value_as<T: EndianData<V>, V>(&self) -> Result<V, PropertyError> {
        if self.data.len() != T::WIDTH {
            return Err(PropertyError::InvalidPropFormat);
        }
        T::from_raw(&self.data)
            .map(|x| x.value())
            .ok_or(PropertyError::InvalidPropFormat)
    }

    /// Split the raw bytes into NUL-terminated strings.
    fn strings(&self) -> Result<impl Iterator<Item = &[u8]>, PropertyError> {
        if self.data.last().is_some_and(|x| *x != 0) {
            return Err(PropertyError::InvalidPropFormat);
        }
        let body = match self.data.len() {
            0 => &self.data[..0],
            len => &self.data[..len - 1],
        };
        Ok(body.split(|x| *x == 0).filter(move |_| !self.data.is_empty()))
    }
}

impl Property {
    pub fn value_as_u32(&self) -> Result<u32, PropertyError> {
        self.value_as::<BigEndian32, u32>()
    }
    pub fn value_as_u64(&self) -> Result<u64, PropertyError> {
        self.value_as::<BigEndian64, u64>()
    }
    /// The first string of the property. A string list yields its first entry.
    pub fn value_as_str(&self) -> Result<&str, PropertyError> {
        let first = self
            .strings()?
            .next()
            .ok_or(PropertyError::InvalidPropFormat)?;
        str::from_utf8(first).map_err(|_| PropertyError::InvalidPropFormat)
    }
    pub fn value_as_strlist(&self) -> Result<Vec<&str>, PropertyError> {
        let mut res = vec![];
        for raw in self.strings()? {
            res.push(str::from_utf8(raw).map_err(|_| PropertyError::InvalidPropFormat)?);
        }
        Ok(res)
    }
    /// Interpret the property as an array of `T`, ignoring exceeding not-aligned bytes.
    pub fn value_as_proplist<T: EndianData<V>, V>(&self) -> Result<Vec<T>, PropertyError> {
        self.data
            .chunks_exact(T::WIDTH)
            .map(|chunk| T::from_raw(chunk).ok_or(PropertyError::InvalidPropFormat))
            .collect()
    }
    pub fn value_as_cells(&self) -> Result<Vec<u32>, PropertyError> {
        Ok(self
            .value_as_proplist::<BigEndian32, u32>()?
            .iter()
            .map(|x| x.value())
            .collect())
    }
    /// Index of `needle` within a string-list property, if present.
    pub fn stringlist_search(&self, needle: &str) -> Result<Option<usize>, PropertyError> {
        Ok(self
            .value_as_strlist()?
            .iter()
            .position(|x| *x == needle))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyError {
    InvalidPropFormat,
    PropNotFound,
    DanglingHandle,
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyError::InvalidPropFormat => f.write_str("malformed property value"),
            PropertyError::PropNotFound => f.write_str("property not found"),
            PropertyError::DanglingHandle => f.write_str("phandle does not reference a node"),
        }
    }
}
