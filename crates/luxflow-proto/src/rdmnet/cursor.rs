//! Bounds-checked reader shared by the RDMnet message decoders

use super::error::RdmnetDecodeError;
use super::Result;

pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(RdmnetDecodeError::TooShort {
                needed: self.pos + count,
                actual: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reserved bytes must decode as zero
    pub fn read_reserved(&mut self) -> Result<()> {
        let offset = self.pos;
        let value = self.read_u8()?;
        if value != 0 {
            return Err(RdmnetDecodeError::ReservedNonZero { offset, value });
        }
        Ok(())
    }

    /// A length-prefixed UTF-8 text block (u16 length)
    pub fn read_text(&mut self) -> Result<String> {
        let length = self.read_u16()? as usize;
        if self.remaining() < length {
            return Err(RdmnetDecodeError::LengthOverrun {
                claimed: length,
                available: self.remaining(),
            });
        }
        let bytes = self.take(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| RdmnetDecodeError::InvalidText)
    }

    /// The rest of the buffer as UTF-8 text
    pub fn read_text_to_end(&mut self) -> Result<String> {
        let bytes = self.take(self.remaining())?;
        String::from_utf8(bytes.to_vec()).map_err(|_| RdmnetDecodeError::InvalidText)
    }

    /// Fail unless every byte has been consumed
    pub fn expect_end(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(RdmnetDecodeError::TrailingBytes {
                expected: self.pos,
                actual: self.buf.len(),
            });
        }
        Ok(())
    }
}

/// Append a u16-length-prefixed UTF-8 text block
pub(crate) fn write_text(out: &mut Vec<u8>, text: &str) {
    out.extend_from_slice(&(text.len() as u16).to_be_bytes());
    out.extend_from_slice(text.as_bytes());
}
