use crate::error::FormatError;
use crate::reader::BinaryReader;

/// Arrays and annotations may nest; anything deeper than this is treated as corrupt.
const MAX_NESTING: usize = 32;

#[derive(Debug, PartialEq, Clone)]
pub struct EncodedAnnotation {
    pub type_idx: u32,
    pub elements: Vec<AnnotationElement>,
}

impl EncodedAnnotation {
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<EncodedAnnotation, FormatError> {
        EncodedAnnotation::read_nested(reader, 0)
    }

    fn read_nested(reader: &mut BinaryReader<'_>, depth: usize) -> Result<EncodedAnnotation, FormatError> {
        let type_idx = reader.read_uleb128()?;
        let size = reader.read_uleb128()? as usize;
        let mut elements = Vec::with_capacity(size.min(reader.remaining()));

        for _ in 0..size {
            let name_idx = reader.read_uleb128()?;
            let value = EncodedValue::read_nested(reader, depth)?;
            elements.push(AnnotationElement { name_idx, value });
        }

        Ok(EncodedAnnotation { type_idx, elements })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct AnnotationElement {
    pub name_idx: u32,
    pub value: EncodedValue,
}

#[derive(Debug, PartialEq, Clone)]
pub enum EncodedValue {
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    MethodType(u32),
    MethodHandle(u32),
    String(u32),
    Type(u32),
    Field(u32),
    Method(u32),
    Enum(u32),
    Array(Vec<EncodedValue>),
    Annotation(EncodedAnnotation),
    Null,
    Boolean(bool),
}

impl EncodedValue {
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<EncodedValue, FormatError> {
        EncodedValue::read_nested(reader, 0)
    }

    fn read_nested(reader: &mut BinaryReader<'_>, depth: usize) -> Result<EncodedValue, FormatError> {
        let start = reader.position();
        if depth > MAX_NESTING {
            fail!(at start, "encoded_value nested deeper than {}", MAX_NESTING);
        }
        let header_byte = reader.read_u8()?;
        let value_arg = header_byte >> 5;
        let value_type = header_byte & 0x1F;
        let size = value_arg as usize + 1;

        let check_size = |max: usize| -> Result<(), FormatError> {
            if size > max {
                fail!(at start, "encoded_value type 0x{:02x} with {} bytes (at most {})", value_type, size, max);
            }
            Ok(())
        };

        match value_type {
            0x00 => {
                check_size(1)?;
                Ok(EncodedValue::Byte(reader.read_i8()?))
            },
            0x02 => {
                check_size(2)?;
                Ok(EncodedValue::Short(read_signed(reader, size)? as i16))
            },
            0x03 => {
                check_size(2)?;
                Ok(EncodedValue::Char(read_unsigned(reader, size)? as u16))
            },
            0x04 => {
                check_size(4)?;
                Ok(EncodedValue::Int(read_signed(reader, size)? as i32))
            },
            0x06 => {
                check_size(8)?;
                Ok(EncodedValue::Long(read_signed(reader, size)?))
            },
            0x10 => {
                check_size(4)?;
                let bits = read_right_extended(reader, size, 4)? as u32;
                Ok(EncodedValue::Float(f32::from_bits(bits)))
            },
            0x11 => {
                check_size(8)?;
                Ok(EncodedValue::Double(f64::from_bits(read_right_extended(reader, size, 8)?)))
            },
            0x15..=0x1B => {
                check_size(4)?;
                let idx = read_unsigned(reader, size)? as u32;
                Ok(match value_type {
                    0x15 => EncodedValue::MethodType(idx),
                    0x16 => EncodedValue::MethodHandle(idx),
                    0x17 => EncodedValue::String(idx),
                    0x18 => EncodedValue::Type(idx),
                    0x19 => EncodedValue::Field(idx),
                    0x1A => EncodedValue::Method(idx),
                    _ => EncodedValue::Enum(idx),
                })
            },
            0x1C => {
                if value_arg != 0 {
                    fail!(at start, "encoded_array with value_arg {}", value_arg);
                }
                Ok(EncodedValue::Array(read_array_nested(reader, depth + 1)?))
            },
            0x1D => {
                if value_arg != 0 {
                    fail!(at start, "encoded_annotation with value_arg {}", value_arg);
                }
                Ok(EncodedValue::Annotation(EncodedAnnotation::read_nested(reader, depth + 1)?))
            },
            0x1E => {
                if value_arg != 0 {
                    fail!(at start, "null value with value_arg {}", value_arg);
                }
                Ok(EncodedValue::Null)
            },
            0x1F => match value_arg {
                0 => Ok(EncodedValue::Boolean(false)),
                1 => Ok(EncodedValue::Boolean(true)),
                _ => fail!(at start, "boolean value with value_arg {}", value_arg),
            },
            _ => fail!(at start, "unknown encoded_value type 0x{:02x}", value_type),
        }
    }
}

/// Little-endian value of `size` bytes, zero-extended.
fn read_unsigned(reader: &mut BinaryReader<'_>, size: usize) -> Result<u64, FormatError> {
    let mut result = 0u64;
    for (i, byte) in reader.read_bytes(size)?.iter().enumerate() {
        result |= (*byte as u64) << (8 * i);
    }
    Ok(result)
}

/// Little-endian value of `size` bytes, sign-extended from its top byte.
fn read_signed(reader: &mut BinaryReader<'_>, size: usize) -> Result<i64, FormatError> {
    let raw = read_unsigned(reader, size)?;
    let unused = 64 - 8 * size as u32;
    Ok(((raw << unused) as i64) >> unused)
}

/// Floating point bytes are the high-order bytes of a `width`-byte value.
fn read_right_extended(reader: &mut BinaryReader<'_>, size: usize, width: usize) -> Result<u64, FormatError> {
    let raw = read_unsigned(reader, size)?;
    Ok(raw << (8 * (width - size)))
}

/// encoded_array: a uleb128 count followed by that many encoded_values.
fn read_array_nested(reader: &mut BinaryReader<'_>, depth: usize) -> Result<Vec<EncodedValue>, FormatError> {
    let size = reader.read_uleb128()? as usize;
    let mut values = Vec::with_capacity(size.min(reader.remaining()));
    for _ in 0..size {
        values.push(EncodedValue::read_nested(reader, depth)?);
    }
    Ok(values)
}
