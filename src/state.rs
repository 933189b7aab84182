//! Save-state byte-cursor primitives.
//!
//! Per the design notes (§9), state isn't serialized via a struct-layout
//! `transmute` (as the C reference core does with static offset asserts);
//! instead [`crate::apu::Apu::save_state`]/[`crate::apu::Apu::load_state`]
//! write an explicit, versioned sequence of fixed-width little-endian
//! fields through the cursor types here. The schema is just "every field
//! in declaration order" — there are no gaps to skip and no alignment
//! padding to reason about, since this is a flat byte stream, not a struct
//! layout.

use crate::error::{ApuError, Result};

/// Appends fixed-width fields to a growing `Vec<u8>`. Infallible: the
/// vector grows as needed.
pub struct StateWriter<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> StateWriter<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> StateWriter<'a> {
        StateWriter { buf }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(v as u8);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}

/// Reads fixed-width fields back out of a byte slice, failing with
/// [`ApuError::StateSizeMismatch`] if the source runs out before the
/// schema is satisfied.
pub struct StateReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    pub fn new(buf: &'a [u8]) -> StateReader<'a> {
        StateReader { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(ApuError::StateSizeMismatch {
                expected: self.pos + n,
                actual: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes: [u8; 2] = self.take(2)?.try_into().unwrap();
        Ok(u16::from_le_bytes(bytes))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(i32::from_le_bytes(bytes))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Call after the schema is fully read to catch a source buffer that's
    /// larger than expected (as much a bug as one that's too small).
    pub fn expect_exhausted(&self) -> Result<()> {
        if self.pos != self.buf.len() {
            return Err(ApuError::StateSizeMismatch {
                expected: self.pos,
                actual: self.buf.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_mixed_width_fields() {
        let mut buf = Vec::new();
        {
            let mut w = StateWriter::new(&mut buf);
            w.write_u8(0xAB);
            w.write_u16(0xBEEF);
            w.write_u32(0xDEAD_BEEF);
            w.write_i32(-42);
            w.write_bool(true);
            w.write_bytes(&[1, 2, 3]);
        }

        let mut r = StateReader::new(&buf);
        assert_eq!(r.read_u8().unwrap(), 0xAB);
        assert_eq!(r.read_u16().unwrap(), 0xBEEF);
        assert_eq!(r.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.read_i32().unwrap(), -42);
        assert_eq!(r.read_bool().unwrap(), true);
        assert_eq!(r.read_bytes(3).unwrap(), &[1, 2, 3]);
        r.expect_exhausted().unwrap();
    }

    #[test]
    fn short_buffer_is_a_size_mismatch_not_a_panic() {
        let buf = [0u8; 2];
        let mut r = StateReader::new(&buf);
        assert!(r.read_u32().is_err());
    }
}
