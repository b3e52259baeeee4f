//! Device register maps as data.
//!
//! Each device describes its command and response words as `const` tables
//! of [`Field`]s instead of scattered shifts and masks. Fields within one
//! word never overlap; [`fields_disjoint`] checks that for a table.

use crate::error::{Error, Result};

/// A bit range within a word: `width` bits starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub offset: u8,
    pub width: u8,
}

impl Field {
    /// Panics (at compile time for `const` tables) unless `1 <= width` and
    /// `offset + width <= 32`.
    pub const fn new(offset: u8, width: u8) -> Self {
        let field = Self { offset, width };
        assert!(field.fits_word(), "field must lie within a 32-bit word");
        field
    }

    /// True when the field is non-empty and lies inside a 32-bit word.
    pub const fn fits_word(self) -> bool {
        self.width >= 1 && self.offset as u32 + self.width as u32 <= 32
    }

    /// Largest value the field can hold.
    pub const fn max_value(self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    /// The field's bits in word position.
    /// Empty for an offset past the end of the word.
    pub const fn mask(self) -> u32 {
        match self.max_value().checked_shl(self.offset as u32) {
            Some(mask) => mask,
            None => 0,
        }
    }

    pub const fn extract(self, word: u32) -> u32 {
        match word.checked_shr(self.offset as u32) {
            Some(bits) => bits & self.max_value(),
            None => 0,
        }
    }

    /// Replace the field in `word`. Values wider than the field are refused.
    pub fn insert(self, word: u32, value: u32) -> Result<u32> {
        if !self.fits_word() {
            return Err(Error::InvalidParameter("field outside 32-bit word"));
        }
        if value > self.max_value() {
            return Err(Error::InvalidParameter("value wider than register field"));
        }
        Ok((word & !self.mask()) | (value << self.offset))
    }

    pub const fn overlaps(self, other: Field) -> bool {
        self.mask() & other.mask() != 0
    }
}

/// True when no two fields in `fields` share a bit.
pub const fn fields_disjoint(fields: &[Field]) -> bool {
    let mut i = 0;
    while i < fields.len() {
        let mut j = i + 1;
        while j < fields.len() {
            if fields[i].overlaps(fields[j]) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

/// A named device register: address plus the field holding its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub name: &'static str,
    pub address: u8,
    pub field: Field,
}

impl Register {
    /// Value occupies the low `width` bits.
    pub const fn new(name: &'static str, address: u8, width: u8) -> Self {
        Self {
            name,
            address,
            field: Field::new(0, width),
        }
    }

    pub const fn width(self) -> u8 {
        self.field.width
    }

    /// Bytes needed to carry the value on a byte-framed bus.
    pub const fn byte_len(self) -> usize {
        (self.field.width as usize).div_ceil(8)
    }
}

/// Linear code-to-quantity conversion: `full_scale * code / max_code`.
/// `max_code` must be non-zero; [`Scale::new`] enforces it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub full_scale: f32,
    pub max_code: u32,
}

impl Scale {
    pub const fn new(full_scale: f32, max_code: u32) -> Self {
        assert!(max_code != 0, "scale needs a non-zero max_code");
        Self {
            full_scale,
            max_code,
        }
    }

    pub fn decode(self, code: u32) -> f32 {
        code as f32 / self.max_code as f32 * self.full_scale
    }
}
