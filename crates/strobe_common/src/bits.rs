//! Fixed-width unsigned bit vectors used for every signal value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed-width, two-state unsigned bit vector.
///
/// Bits are packed little-endian into `u64` words: bit 0 is the least
/// significant bit of the first word. Bits above `width` are always zero, so
/// two vectors of the same width compare equal exactly when their values do.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bits {
    width: u32,
    data: Vec<u64>,
}

/// Number of bits packed per storage word.
const BITS_PER_WORD: u32 = 64;

/// Errors produced when a value does not fit the requested width.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BitsError {
    /// An integer has set bits at or above the target width.
    #[error("value {value:#x} does not fit in {width} bits")]
    ValueTooWide {
        /// The rejected value.
        value: u64,
        /// The target width in bits.
        width: u32,
    },
    /// A byte slice is longer than the target width can hold.
    #[error("{bytes} byte(s) do not fit in {width} bits")]
    BytesTooWide {
        /// Number of bytes supplied.
        bytes: usize,
        /// The target width in bits.
        width: u32,
    },
}

impl Bits {
    /// Creates an all-zero vector of the given width.
    pub fn zero(width: u32) -> Self {
        Self {
            width,
            data: vec![0; word_count(width)],
        }
    }

    /// Returns the width in bits.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn bit(&self, index: u32) -> bool {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word = (index / BITS_PER_WORD) as usize;
        (self.data[word] >> (index % BITS_PER_WORD)) & 1 != 0
    }

    /// Sets the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set_bit(&mut self, index: u32, value: bool) {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word = (index / BITS_PER_WORD) as usize;
        let mask = 1u64 << (index % BITS_PER_WORD);
        if value {
            self.data[word] |= mask;
        } else {
            self.data[word] &= !mask;
        }
    }

    /// Creates a single-bit vector from a boolean.
    pub fn from_bool(value: bool) -> Self {
        let mut v = Self::zero(1);
        v.data[0] = u64::from(value);
        v
    }

    /// Creates a vector of the given width holding `value`.
    ///
    /// Fails if `value` has any bit set at or above `width`.
    pub fn from_u64(value: u64, width: u32) -> Result<Self, BitsError> {
        if width < BITS_PER_WORD && value >> width != 0 {
            return Err(BitsError::ValueTooWide { value, width });
        }
        let mut v = Self::zero(width);
        if let Some(first) = v.data.first_mut() {
            *first = value;
        } else if value != 0 {
            return Err(BitsError::ValueTooWide { value, width });
        }
        Ok(v)
    }

    /// Creates a vector of the given width with its lowest `count` bits set.
    ///
    /// `count` is clamped to `width`. This is the shape of a byte-lane
    /// qualifier covering the first `count` lanes.
    pub fn low_mask(width: u32, count: u32) -> Self {
        let mut v = Self::zero(width);
        let count = count.min(width);
        for (i, word) in v.data.iter_mut().enumerate() {
            let start = i as u32 * BITS_PER_WORD;
            if count >= start + BITS_PER_WORD {
                *word = u64::MAX;
            } else if count > start {
                *word = (1u64 << (count - start)) - 1;
            }
        }
        v
    }

    /// Packs bytes little-endian (byte 0 in bits 7..0) into a vector of `width` bits.
    ///
    /// Bytes beyond the slice are zero. Fails if the slice holds more bits
    /// than `width`.
    pub fn from_le_bytes(bytes: &[u8], width: u32) -> Result<Self, BitsError> {
        if bytes.len() as u64 * 8 > u64::from(width) {
            return Err(BitsError::BytesTooWide {
                bytes: bytes.len(),
                width,
            });
        }
        let mut v = Self::zero(width);
        for (i, &byte) in bytes.iter().enumerate() {
            let word = i / 8;
            v.data[word] |= u64::from(byte) << ((i % 8) * 8);
        }
        Ok(v)
    }

    /// Unpacks the vector into `ceil(width / 8)` little-endian bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let len = self.width.div_ceil(8) as usize;
        (0..len)
            .map(|i| (self.data[i / 8] >> ((i % 8) * 8)) as u8)
            .collect()
    }

    /// Converts to a `u64`, or `None` if any bit at position 64 or above is set.
    pub fn to_u64(&self) -> Option<u64> {
        if self.data.iter().skip(1).any(|&w| w != 0) {
            return None;
        }
        Some(self.data.first().copied().unwrap_or(0))
    }

    /// Returns true if every bit is zero.
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&w| w == 0)
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> u32 {
        self.data.iter().map(|w| w.count_ones()).sum()
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}'h", self.width)?;
        let digits = self.width.div_ceil(4).max(1);
        for d in (0..digits).rev() {
            let word = (d * 4 / BITS_PER_WORD) as usize;
            let nibble = (self.data.get(word).copied().unwrap_or(0) >> ((d * 4) % BITS_PER_WORD)) & 0xF;
            write!(f, "{nibble:x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bits({self})")
    }
}

impl From<bool> for Bits {
    fn from(value: bool) -> Self {
        Self::from_bool(value)
    }
}

/// Returns the number of u64 words needed to store `width` bits.
fn word_count(width: u32) -> usize {
    width.div_ceil(BITS_PER_WORD) as usize
}
