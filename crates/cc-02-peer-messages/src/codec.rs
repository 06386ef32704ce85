//! Encode/decode contract shared by all peer messages.

use shared_types::{WireError, WireReader};

/// A message with a fixed type byte and a binary body.
pub trait PeerMessage: Sized {
    /// Type byte carried in the transport envelope.
    const MSG_TYPE: u8;

    /// Append the body to `buf`.
    fn write(&self, buf: &mut Vec<u8>) -> Result<(), WireError>;

    /// Read one body from `r`, leaving any following bytes unread.
    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError>;

    fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }

    /// Decode a complete payload. Leftover bytes are an error.
    fn from_bytes(payload: &[u8]) -> Result<Self, WireError> {
        let mut r = WireReader::new(payload);
        let msg = Self::read(&mut r)?;
        r.finish()?;
        Ok(msg)
    }
}
