use crate::SerdeErr;

/// Reads bits back out of a buffer produced by [`crate::BitWriter`]
pub struct BitReader<'b> {
    buffer: &'b [u8],
    bits_read: u32,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            bits_read: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        let byte_index = (self.bits_read / 8) as usize;
        let Some(byte) = self.buffer.get(byte_index) else {
            return Err(SerdeErr::UnexpectedEnd {
                bits_read: self.bits_read,
            });
        };
        let bit = (byte >> (self.bits_read % 8)) & 1 != 0;
        self.bits_read += 1;
        Ok(bit)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let mut output: u8 = 0;
        for index in 0..8 {
            if self.read_bit()? {
                output |= 1 << index;
            }
        }
        Ok(output)
    }

    /// Reads `count` whole bytes. A count longer than the rest of the
    /// buffer fails before anything is allocated.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, SerdeErr> {
        if count > self.bits_remaining() / 8 {
            return Err(SerdeErr::UnexpectedEnd {
                bits_read: self.bits_read,
            });
        }
        let mut output = Vec::with_capacity(count);
        for _ in 0..count {
            output.push(self.read_byte()?);
        }
        Ok(output)
    }

    pub fn bits_read(&self) -> u32 {
        self.bits_read
    }

    pub fn bits_remaining(&self) -> usize {
        (self.buffer.len() * 8).saturating_sub(self.bits_read as usize)
    }

    /// Whether every whole byte of the buffer has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.bits_read.div_ceil(8) as usize >= self.buffer.len()
    }
}
