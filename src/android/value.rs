//! Typed attribute values (`Res_value`) and their textual form.

use std::fmt;

use crate::error::FormatError;

const TYPE_NULL: u8 = 0x00;
const TYPE_REFERENCE: u8 = 0x01;
const TYPE_ATTRIBUTE: u8 = 0x02;
const TYPE_STRING: u8 = 0x03;
const TYPE_FLOAT: u8 = 0x04;
const TYPE_DIMENSION: u8 = 0x05;
const TYPE_FRACTION: u8 = 0x06;
const TYPE_DYNAMIC_REFERENCE: u8 = 0x07;
const TYPE_DYNAMIC_ATTRIBUTE: u8 = 0x08;
const TYPE_INT_DEC: u8 = 0x10;
const TYPE_INT_HEX: u8 = 0x11;
const TYPE_INT_BOOLEAN: u8 = 0x12;
const TYPE_INT_COLOR_ARGB8: u8 = 0x1c;
const TYPE_INT_COLOR_RGB8: u8 = 0x1d;
const TYPE_INT_COLOR_ARGB4: u8 = 0x1e;
const TYPE_INT_COLOR_RGB4: u8 = 0x1f;

/// Payload of a null value that means "explicitly empty" rather than "undefined".
const DATA_NULL_EMPTY: u32 = 1;

const COMPLEX_UNIT_MASK: u32 = 0xf;
const COMPLEX_RADIX_SHIFT: u32 = 4;
const COMPLEX_MANTISSA_MASK: u32 = 0xffff_ff00;
const RADIX_MULTS: [f32; 4] = [
    1.0 / 256.0,
    1.0 / 32_768.0,
    1.0 / 8_388_608.0,
    1.0 / 2_147_483_648.0,
];
const DIMENSION_UNITS: [&str; 6] = ["px", "dip", "sp", "pt", "in", "mm"];
const FRACTION_UNITS: [&str; 2] = ["%", "%p"];

/// The `dataType` byte of a typed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Reference,
    Attribute,
    String,
    Float,
    Dimension,
    Fraction,
    DynamicReference,
    DynamicAttribute,
    IntDec,
    IntHex,
    Boolean,
    ColorArgb8,
    ColorRgb8,
    ColorArgb4,
    ColorRgb4,
    Unknown(u8),
}

impl From<u8> for ValueKind {
    fn from(value: u8) -> Self {
        match value {
            TYPE_NULL => ValueKind::Null,
            TYPE_REFERENCE => ValueKind::Reference,
            TYPE_ATTRIBUTE => ValueKind::Attribute,
            TYPE_STRING => ValueKind::String,
            TYPE_FLOAT => ValueKind::Float,
            TYPE_DIMENSION => ValueKind::Dimension,
            TYPE_FRACTION => ValueKind::Fraction,
            TYPE_DYNAMIC_REFERENCE => ValueKind::DynamicReference,
            TYPE_DYNAMIC_ATTRIBUTE => ValueKind::DynamicAttribute,
            TYPE_INT_DEC => ValueKind::IntDec,
            TYPE_INT_HEX => ValueKind::IntHex,
            TYPE_INT_BOOLEAN => ValueKind::Boolean,
            TYPE_INT_COLOR_ARGB8 => ValueKind::ColorArgb8,
            TYPE_INT_COLOR_RGB8 => ValueKind::ColorRgb8,
            TYPE_INT_COLOR_ARGB4 => ValueKind::ColorArgb4,
            TYPE_INT_COLOR_RGB4 => ValueKind::ColorRgb4,
            other => ValueKind::Unknown(other),
        }
    }
}

impl ValueKind {
    pub fn code(self) -> u8 {
        match self {
            ValueKind::Null => TYPE_NULL,
            ValueKind::Reference => TYPE_REFERENCE,
            ValueKind::Attribute => TYPE_ATTRIBUTE,
            ValueKind::String => TYPE_STRING,
            ValueKind::Float => TYPE_FLOAT,
            ValueKind::Dimension => TYPE_DIMENSION,
            ValueKind::Fraction => TYPE_FRACTION,
            ValueKind::DynamicReference => TYPE_DYNAMIC_REFERENCE,
            ValueKind::DynamicAttribute => TYPE_DYNAMIC_ATTRIBUTE,
            ValueKind::IntDec => TYPE_INT_DEC,
            ValueKind::IntHex => TYPE_INT_HEX,
            ValueKind::Boolean => TYPE_INT_BOOLEAN,
            ValueKind::ColorArgb8 => TYPE_INT_COLOR_ARGB8,
            ValueKind::ColorRgb8 => TYPE_INT_COLOR_RGB8,
            ValueKind::ColorArgb4 => TYPE_INT_COLOR_ARGB4,
            ValueKind::ColorRgb4 => TYPE_INT_COLOR_RGB4,
            ValueKind::Unknown(code) => code,
        }
    }
}

/// A decoded attribute value: its type tag, the raw 32-bit payload and, for
/// string values, the pool text the payload points at.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedValue {
    pub kind: ValueKind,
    pub data: u32,
    pub string: Option<String>,
}

impl TypedValue {
    /// Build a value, rejecting payloads that cannot be rendered.
    ///
    /// `string` must be the resolved pool entry when `data_type` is a string.
    pub fn new(data_type: u8, data: u32, string: Option<String>) -> Result<Self, FormatError> {
        let kind = ValueKind::from(data_type);
        match kind {
            ValueKind::String if string.is_none() => {
                fail!("string value without pool text (index {})", data)
            }
            ValueKind::Dimension if complex_unit(data) as usize >= DIMENSION_UNITS.len() => {
                fail!("unknown dimension unit {} in 0x{:08x}", complex_unit(data), data)
            }
            ValueKind::Fraction if complex_unit(data) as usize >= FRACTION_UNITS.len() => {
                fail!("unknown fraction unit {} in 0x{:08x}", complex_unit(data), data)
            }
            _ => {}
        }
        Ok(TypedValue { kind, data, string })
    }

    pub fn string(text: impl Into<String>, index: u32) -> Self {
        TypedValue {
            kind: ValueKind::String,
            data: index,
            string: Some(text.into()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.string.as_deref()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            ValueKind::Boolean => Some(self.data != 0),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.kind {
            ValueKind::IntDec | ValueKind::IntHex => Some(i64::from(self.data as i32)),
            _ => None,
        }
    }

    /// Resource id of a (dynamic) reference.
    pub fn as_reference(&self) -> Option<u32> {
        match self.kind {
            ValueKind::Reference | ValueKind::DynamicReference => Some(self.data),
            _ => None,
        }
    }

    /// The attribute-value text of this value.
    pub fn render(&self) -> String {
        let data = self.data;
        match self.kind {
            ValueKind::Null if data == DATA_NULL_EMPTY => "@empty".to_string(),
            ValueKind::Null => String::new(),
            ValueKind::Reference | ValueKind::DynamicReference if data == 0 => "@null".to_string(),
            ValueKind::Reference | ValueKind::DynamicReference => format!("@0x{data:08x}"),
            ValueKind::Attribute | ValueKind::DynamicAttribute => format!("?0x{data:08x}"),
            ValueKind::String => self.string.clone().unwrap_or_default(),
            ValueKind::Float => format_float(f32::from_bits(data)),
            ValueKind::Dimension => {
                let unit = DIMENSION_UNITS.get(complex_unit(data) as usize).copied().unwrap_or("");
                format!("{}{}", format_float(complex_value(data)), unit)
            }
            ValueKind::Fraction => {
                let unit = FRACTION_UNITS.get(complex_unit(data) as usize).copied().unwrap_or("");
                format!("{}{}", format_float(complex_value(data) * 100.0), unit)
            }
            ValueKind::IntDec => (data as i32).to_string(),
            ValueKind::IntHex => format!("0x{data:08x}"),
            ValueKind::Boolean => (data != 0).to_string(),
            ValueKind::ColorArgb8 => format!("#{data:08x}"),
            ValueKind::ColorRgb8 => format!("#{:06x}", data & 0x00ff_ffff),
            ValueKind::ColorArgb4 => format!(
                "#{:x}{:x}{:x}{:x}",
                (data >> 28) & 0xf,
                (data >> 20) & 0xf,
                (data >> 12) & 0xf,
                (data >> 4) & 0xf
            ),
            ValueKind::ColorRgb4 => format!(
                "#{:x}{:x}{:x}",
                (data >> 20) & 0xf,
                (data >> 12) & 0xf,
                (data >> 4) & 0xf
            ),
            ValueKind::Unknown(_) => format!("0x{data:08x}"),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn complex_unit(data: u32) -> u32 {
    data & COMPLEX_UNIT_MASK
}

fn complex_value(data: u32) -> f32 {
    let mantissa = (data & COMPLEX_MANTISSA_MASK) as i32 as f32;
    mantissa * RADIX_MULTS[((data >> COMPLEX_RADIX_SHIFT) & 3) as usize]
}

fn format_float(value: f32) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
