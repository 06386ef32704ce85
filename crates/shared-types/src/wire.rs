//! # Wire Helpers
//!
//! Bounded reads and writes for the fixed binary layouts used between
//! committee peers.
//!
//! Every integer is little-endian. Readers check the remaining length before
//! interpreting any bytes, so an under-read is always reported as
//! [`WireError::TruncatedMessage`] and never as a partially filled field.

use crate::errors::WireError;

/// Cursor over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take exactly `n` bytes.
    pub fn read_slice(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::TruncatedMessage {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Signed 64-bit value carried in its unsigned wire form.
    pub fn read_i64(&mut self) -> Result<i64, WireError> {
        Ok(self.read_u64()? as i64)
    }

    /// Any nonzero byte decodes as `true`.
    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.read_u8()? != 0)
    }

    /// Byte string with a 16-bit length prefix.
    pub fn read_bytes16(&mut self) -> Result<Vec<u8>, WireError> {
        let len = self.read_u16()? as usize;
        Ok(self.read_slice(len)?.to_vec())
    }

    /// Consume the reader, failing if anything is left.
    pub fn finish(self) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            count => Err(WireError::TrailingBytes { count }),
        }
    }
}

/// Append-only encoding into a byte buffer.
pub trait WireWrite {
    fn write_raw(&mut self, bytes: &[u8]);

    fn write_u8(&mut self, v: u8) {
        self.write_raw(&[v]);
    }

    fn write_u16(&mut self, v: u16) {
        self.write_raw(&v.to_le_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.write_raw(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_raw(&v.to_le_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.write_u64(v as u64);
    }

    /// Always exactly 0 or 1.
    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    /// Write a collection length as a 16-bit count.
    fn write_len16(&mut self, len: usize) -> Result<(), WireError> {
        let len = u16::try_from(len).map_err(|_| WireError::TooLong { len })?;
        self.write_u16(len);
        Ok(())
    }

    fn write_bytes16(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        self.write_len16(bytes.len())?;
        self.write_raw(bytes);
        Ok(())
    }
}

impl WireWrite for Vec<u8> {
    fn write_raw(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}
