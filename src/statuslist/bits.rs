//! Packed status bit array
//!
//! Slot `i` of width `bits` lives in byte `i / (8 / bits)` at shift
//! `(i % (8 / bits)) * bits` counted from the least significant bit.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Width of one status slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusBits {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
}

impl StatusBits {
    pub fn from_u8(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(StatusBits::One),
            2 => Some(StatusBits::Two),
            4 => Some(StatusBits::Four),
            8 => Some(StatusBits::Eight),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Slots packed into one byte
    pub fn per_byte(self) -> u32 {
        8 / u32::from(self.as_u8())
    }

    /// Largest storable value
    pub fn max_value(self) -> u8 {
        ((1u16 << self.as_u8()) - 1) as u8
    }

    /// Byte length of a list with `size` slots
    pub fn byte_len(self, size: u32) -> usize {
        (size as usize * self.as_u8() as usize).div_ceil(8)
    }

    /// (byte offset, bit shift from LSB) of a slot
    pub fn position(self, index: u32) -> (usize, u32) {
        let per_byte = self.per_byte();
        (
            (index / per_byte) as usize,
            (index % per_byte) * u32::from(self.as_u8()),
        )
    }
}

/// A status list's raw bytes together with its slot width
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusList {
    bits: StatusBits,
    bytes: Vec<u8>,
}

impl StatusList {
    /// All-zero list of `size` slots
    pub fn zeroed(bits: StatusBits, size: u32) -> Self {
        Self {
            bits,
            bytes: vec![0u8; bits.byte_len(size)],
        }
    }

    pub fn from_bytes(bits: StatusBits, bytes: Vec<u8>) -> Self {
        Self { bits, bytes }
    }

    /// Decode a zlib-compressed `lst`
    pub fn decompress(bits: StatusBits, lst: &[u8]) -> std::io::Result<Self> {
        let mut bytes = Vec::new();
        ZlibDecoder::new(lst).read_to_end(&mut bytes)?;
        Ok(Self { bits, bytes })
    }

    pub fn bits(&self) -> StatusBits {
        self.bits
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of slots the bytes can hold
    pub fn capacity(&self) -> u32 {
        (self.bytes.len() as u32) * self.bits.per_byte()
    }

    /// Status at `index`; None past the end
    pub fn get(&self, index: u32) -> Option<u8> {
        let (byte, shift) = self.bits.position(index);
        self.bytes
            .get(byte)
            .map(|b| (b >> shift) & self.bits.max_value())
    }

    /// Overwrite the status at `index`; false past the end
    pub fn set(&mut self, index: u32, value: u8) -> bool {
        let (byte, shift) = self.bits.position(index);
        let mask = self.bits.max_value() << shift;
        match self.bytes.get_mut(byte) {
            Some(b) => {
                *b = (*b & !mask) | ((value << shift) & mask);
                true
            }
            None => false,
        }
    }

    /// zlib (DEFLATE) compression at best level
    pub fn compress(&self) -> std::io::Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&self.bytes)?;
        encoder.finish()
    }
}
