use crate::{
    bit_reader::BitReader,
    bit_writer::BitWrite,
    error::SerdeErr,
    integer::{SignedVariableInteger, UnsignedVariableInteger},
};

/// A type that can be written to and read back from a bit stream
pub trait Serde: Sized {
    fn ser(&self, writer: &mut dyn BitWrite);

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;
}

impl Serde for bool {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bit(*self);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_bit()
    }
}

impl Serde for u8 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_byte(*self);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_byte()
    }
}

impl Serde for u64 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bytes(&self.to_le_bytes());
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let mut bytes = [0u8; 8];
        for byte in bytes.iter_mut() {
            *byte = reader.read_byte()?;
        }
        Ok(u64::from_le_bytes(bytes))
    }
}

impl Serde for u32 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        if let Some(value) = UnsignedVariableInteger::<7>::new(*self) {
            value.ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let value = UnsignedVariableInteger::<7>::de(reader)?.get();
        u32::try_from(value).map_err(|_| SerdeErr::OutOfRange {
            type_name: "u32",
            value: i128::from(value),
        })
    }
}

impl Serde for i32 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        // signed integers are always constructible
        if let Some(value) = SignedVariableInteger::<7>::new(*self) {
            value.ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let value = SignedVariableInteger::<7>::de(reader)?.get();
        i32::try_from(value).map_err(|_| SerdeErr::OutOfRange {
            type_name: "i32",
            value: i128::from(value),
        })
    }
}

impl Serde for String {
    fn ser(&self, writer: &mut dyn BitWrite) {
        (self.len() as u32).ser(writer);
        writer.write_bytes(self.as_bytes());
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length = u32::de(reader)? as usize;
        let bytes = reader.read_bytes(length)?;
        String::from_utf8(bytes).map_err(|_| SerdeErr::InvalidUtf8)
    }
}

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            Some(value) => {
                writer.write_bit(true);
                value.ser(writer);
            }
            None => writer.write_bit(false),
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        (self.len() as u32).ser(writer);
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length = u32::de(reader)? as usize;
        let mut output = Vec::with_capacity(length.min(1024));
        for _ in 0..length {
            output.push(T::de(reader)?);
        }
        Ok(output)
    }
}
