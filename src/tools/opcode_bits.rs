//! Random-access bit storage with an append-cursor and bit-level file I/O.
//!
//! Wraps `bit_vec::BitVec` to add the `capacity_bits`/`cursor_bits` split
//! the opcode stream needs: `capacity_bits` is how much storage has been
//! allocated, `cursor_bits` is how many of those bits were actually
//! written through `append_bit`. Bit ordering on disk is little-endian by
//! bit index (bit `i` lives at byte `i / 8`, mask `1 << (i & 7)`), which is
//! the opposite of `BitVec::to_bytes`/`from_bytes` (MSB-first); `output`
//! and `input` therefore pack and unpack bytes by hand rather than going
//! through those methods.

use bit_vec::BitVec;
use std::io::{Read, Write};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SizeMode {
    Full,
    Stream,
}

#[derive(Debug, Clone)]
pub(crate) struct OpcodeBits {
    storage: BitVec,
    cursor: usize,
}

impl OpcodeBits {
    pub fn create(n_bits: usize) -> Result<Self, Error> {
        if n_bits == 0 {
            return Err(Error::InvalidArgument(
                "bit vector requires nonzero capacity".to_string(),
            ));
        }
        Ok(Self {
            storage: BitVec::from_elem(n_bits, false),
            cursor: 0,
        })
    }

    pub fn capacity_bits(&self) -> usize {
        self.storage.len()
    }

    pub fn cursor_bits(&self) -> usize {
        self.cursor
    }

    pub fn get_size(&self, mode: SizeMode) -> usize {
        match mode {
            SizeMode::Full => self.capacity_bits(),
            SizeMode::Stream => self.cursor_bits(),
        }
    }

    pub fn check(&self, i: usize) -> Result<bool, Error> {
        self.storage
            .get(i)
            .ok_or_else(|| Error::InvalidArgument(format!("bit index {i} out of range")))
    }

    pub fn set(&mut self, i: usize) -> Result<(), Error> {
        if i >= self.storage.len() {
            return Err(Error::InvalidArgument(format!("bit index {i} out of range")));
        }
        self.storage.set(i, true);
        Ok(())
    }

    pub fn clear(&mut self, i: usize) -> Result<(), Error> {
        if i >= self.storage.len() {
            return Err(Error::InvalidArgument(format!("bit index {i} out of range")));
        }
        self.storage.set(i, false);
        Ok(())
    }

    /// Append one bit, doubling capacity (first doubling from 1) if full.
    pub fn append_bit(&mut self, bit: bool) {
        if self.cursor == self.storage.len() {
            let grow_by = if self.storage.is_empty() { 1 } else { self.storage.len() };
            self.storage.grow(grow_by, false);
        }
        self.storage.set(self.cursor, bit);
        self.cursor += 1;
    }

    /// Append `[0, other.get_size(mode))` bits of `other`.
    pub fn append_vector(&mut self, other: &OpcodeBits, mode: SizeMode) {
        let len = other.get_size(mode);
        for i in 0..len {
            self.append_bit(other.storage.get(i).unwrap_or(false));
        }
    }

    /// Reallocate storage to `ceil(new_bits / 8)` bytes; `cursor` is left
    /// untouched (the caller is responsible if this shrinks past it).
    pub fn resize(&mut self, new_bits: usize) -> Result<(), Error> {
        let byte_aligned = new_bits
            .checked_add(7)
            .map(|n| (n / 8) * 8)
            .ok_or_else(|| Error::AllocationFailure("bit count overflow in resize".to_string()))?;
        if byte_aligned > self.storage.len() {
            self.storage.grow(byte_aligned - self.storage.len(), false);
        } else if byte_aligned < self.storage.len() {
            self.storage.truncate(byte_aligned);
        }
        Ok(())
    }

    /// Parse a string over `{'0','1'}`; other characters are ignored.
    /// The resulting cursor is the number of valid bits accepted.
    pub fn convert(text: &str) -> Self {
        let mut v = Self {
            storage: BitVec::new(),
            cursor: 0,
        };
        for ch in text.chars() {
            match ch {
                '0' => v.append_bit(false),
                '1' => v.append_bit(true),
                _ => {}
            }
        }
        v
    }

    /// Write a little-endian `u64` header equal to `get_size(mode)`,
    /// followed by `ceil(that / 8) + 1` packed bytes (bit `i` at byte
    /// `i/8`, mask `1 << (i & 7)`); the trailing byte carries no bits and
    /// is always zero.
    pub fn output<W: Write>(&self, writer: &mut W, mode: SizeMode) -> Result<(), Error> {
        let size = self.get_size(mode);
        writer.write_all(&(size as u64).to_le_bytes())?;
        let nbytes = (size + 7) / 8 + 1;
        let mut buf = vec![0u8; nbytes];
        for i in 0..size {
            if self.storage.get(i).unwrap_or(false) {
                buf[i / 8] |= 1 << (i % 8);
            }
        }
        writer.write_all(&buf)?;
        Ok(())
    }

    /// Inverse of `output`: reads the `u64` header, allocates a vector of
    /// that capacity, sets `cursor = capacity`, and reads the storage
    /// bytes (including the trailing padding byte `output` writes).
    /// Truncated input surfaces as `CorruptArtifact`.
    pub fn input<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let mut hdr = [0u8; 8];
        read_exact_or_corrupt(reader, &mut hdr, "truncated opcode body length")?;
        let bits = u64::from_le_bytes(hdr) as usize;
        let nbytes = (bits + 7) / 8 + 1;
        let mut buf = vec![0u8; nbytes];
        read_exact_or_corrupt(reader, &mut buf, "truncated opcode body")?;
        let mut storage = BitVec::from_elem(bits, false);
        for i in 0..bits {
            if buf[i / 8] & (1 << (i % 8)) != 0 {
                storage.set(i, true);
            }
        }
        Ok(Self { storage, cursor: bits })
    }

    pub fn bit_at(&self, i: usize) -> Option<bool> {
        self.storage.get(i)
    }
}

pub(crate) fn read_exact_or_corrupt<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    msg: &str,
) -> Result<(), Error> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(Error::CorruptArtifact(msg.to_string()))
        }
        Err(e) => Err(Error::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_bit_grows_by_doubling() {
        let mut v = OpcodeBits::create(1).unwrap();
        assert_eq!(v.capacity_bits(), 1);
        v.append_bit(true);
        assert_eq!(v.cursor_bits(), 1);
        v.append_bit(false);
        assert_eq!(v.capacity_bits(), 2);
        assert_eq!(v.cursor_bits(), 2);
    }

    #[test]
    fn convert_ignores_non_binary_characters() {
        let v = OpcodeBits::convert("0a1b01");
        assert_eq!(v.cursor_bits(), 4);
        assert_eq!(v.bit_at(0), Some(false));
        assert_eq!(v.bit_at(1), Some(true));
        assert_eq!(v.bit_at(2), Some(false));
        assert_eq!(v.bit_at(3), Some(true));
    }

    #[test]
    fn round_trips_through_output_input() {
        let mut v = OpcodeBits::create(1).unwrap();
        for bit in [true, false, true, true, false, false, false, true, true] {
            v.append_bit(bit);
        }
        let mut buf = Vec::new();
        v.output(&mut buf, SizeMode::Stream).unwrap();
        let mut cursor = std::io::Cursor::new(&buf);
        let back = OpcodeBits::input(&mut cursor).unwrap();
        assert_eq!(back.cursor_bits(), v.cursor_bits());
        for i in 0..v.cursor_bits() {
            assert_eq!(back.bit_at(i), v.bit_at(i));
        }
    }

    #[test]
    fn little_endian_bit_packing() {
        let mut v = OpcodeBits::create(1).unwrap();
        for bit in [true, false, false, false, false, false, false, false] {
            v.append_bit(bit);
        }
        let mut buf = Vec::new();
        v.output(&mut buf, SizeMode::Stream).unwrap();
        // header (8 bytes) + one packed byte with bit 0 set
        assert_eq!(buf[8], 0x01);
    }

    #[test]
    fn truncated_input_is_corrupt() {
        let mut cursor = std::io::Cursor::new(&[0u8, 1, 2][..]);
        assert!(OpcodeBits::input(&mut cursor).is_err());
    }
}
