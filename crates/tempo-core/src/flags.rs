// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! An integer-backed bit-flag word addressed by bit index.

/// A set of up to 32 boolean flags packed into a `u32`, addressed by bit
/// index.
///
/// Callers use this to track auxiliary state alongside a ticker (paused,
/// catching-up, and the like). The tick core itself never reads it.
///
/// Indices must be in `0..32`; larger indices are a caller bug.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BitFlags {
    bits: u32,
}

impl BitFlags {
    /// The empty flag word.
    pub const EMPTY: Self = Self { bits: 0 };

    /// Creates a flag word from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    /// Returns the raw value of the flag word.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Returns `true` if the flag at `index` is set.
    pub const fn is_set(&self, index: u32) -> bool {
        debug_assert!(index < 32);
        (self.bits >> index) & 1 != 0
    }

    /// Sets the flag at `index`.
    pub fn set(&mut self, index: u32) {
        debug_assert!(index < 32);
        self.bits |= 1 << index;
    }

    /// Clears the flag at `index`.
    pub fn clear(&mut self, index: u32) {
        debug_assert!(index < 32);
        self.bits &= !(1 << index);
    }

    /// Returns a new flag word with the flag at `index` set.
    #[must_use]
    pub const fn with(self, index: u32) -> Self {
        debug_assert!(index < 32);
        Self {
            bits: self.bits | (1 << index),
        }
    }

    /// Returns a new flag word with the flag at `index` cleared.
    #[must_use]
    pub const fn without(self, index: u32) -> Self {
        debug_assert!(index < 32);
        Self {
            bits: self.bits & !(1 << index),
        }
    }
}

impl From<u32> for BitFlags {
    fn from(bits: u32) -> Self {
        Self::from_bits(bits)
    }
}

impl core::fmt::Debug for BitFlags {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "BitFlags({:#034b})", self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_word_has_nothing_set() {
        let flags = BitFlags::EMPTY;
        assert_eq!(flags.bits(), 0);
        for index in 0..32 {
            assert!(!flags.is_set(index));
        }
        assert_eq!(BitFlags::default(), BitFlags::EMPTY);
    }

    #[test]
    fn set_and_clear_round_trip() {
        let mut flags = BitFlags::EMPTY;
        flags.set(3);
        assert!(flags.is_set(3));
        flags.clear(3);
        assert!(!flags.is_set(3));
        assert_eq!(flags.bits(), 0);
    }

    #[test]
    fn set_leaves_unrelated_bits_untouched() {
        let mut flags = BitFlags::from_bits(0b1010);
        flags.set(0);
        assert_eq!(flags.bits(), 0b1011);
        flags.clear(1);
        assert_eq!(flags.bits(), 0b1001);
        assert!(flags.is_set(3));
    }

    #[test]
    fn with_and_without_do_not_mutate_original() {
        let original = BitFlags::from_bits(0b1);
        let widened = original.with(4);
        assert!(widened.is_set(0));
        assert!(widened.is_set(4));
        assert_eq!(original.bits(), 0b1, "Original should be unchanged");

        let narrowed = widened.without(0);
        assert!(!narrowed.is_set(0));
        assert!(narrowed.is_set(4));
    }

    #[test]
    fn high_bit_index() {
        let flags = BitFlags::EMPTY.with(31);
        assert!(flags.is_set(31));
        assert_eq!(flags.bits(), 1 << 31);
    }

    #[test]
    fn from_u32_conversion() {
        let flags: BitFlags = 0b110u32.into();
        assert!(!flags.is_set(0));
        assert!(flags.is_set(1));
        assert!(flags.is_set(2));
    }
}
