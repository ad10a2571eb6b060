use crate::{bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr, serde::Serde};

pub type UnsignedVariableInteger<const BITS: u8> = SerdeInteger<false, BITS>;
pub type SignedVariableInteger<const BITS: u8> = SerdeInteger<true, BITS>;

/// A variable-length integer written in chunks of `BITS` bits, each chunk
/// preceded by a "proceed" bit. Small values (string lengths, scores) stay
/// small on the wire.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SerdeInteger<const SIGNED: bool, const BITS: u8> {
    value: i64,
}

impl<const SIGNED: bool, const BITS: u8> SerdeInteger<SIGNED, BITS> {
    /// Returns `None` for a negative value on an unsigned integer
    pub fn new<T: Into<i64>>(value: T) -> Option<Self> {
        let value = value.into();
        if !SIGNED && value < 0 {
            return None;
        }
        Some(Self { value })
    }

    pub fn get(&self) -> i64 {
        self.value
    }
}

impl<const SIGNED: bool, const BITS: u8> Serde for SerdeInteger<SIGNED, BITS> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let negative = self.value < 0;
        if SIGNED {
            writer.write_bit(negative);
        }
        let mut value = self.value.unsigned_abs();

        loop {
            let proceed = value >= 1_u64 << BITS;
            writer.write_bit(proceed);
            for _ in 0..BITS {
                writer.write_bit(value & 1 != 0);
                value >>= 1;
            }
            if !proceed {
                return;
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let negative = if SIGNED { reader.read_bit()? } else { false };

        let mut total_bits: u32 = 0;
        let mut output: u64 = 0;
        loop {
            let proceed = reader.read_bit()?;
            for _ in 0..BITS {
                let bit = reader.read_bit()?;
                if bit {
                    if total_bits >= 64 {
                        return Err(SerdeErr::IntegerOverflow);
                    }
                    output |= 1 << total_bits;
                }
                total_bits += 1;
            }
            if !proceed {
                break;
            }
        }

        let magnitude = i128::from(output);
        let value = if negative { -magnitude } else { magnitude };
        let Ok(value) = i64::try_from(value) else {
            return Err(SerdeErr::OutOfRange {
                type_name: "i64",
                value,
            });
        };
        Ok(Self { value })
    }
}
