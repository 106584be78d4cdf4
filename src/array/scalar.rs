use crate::utils::{fixed_bytes, ByteOrder};

use num_traits::ToPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// On-disk numeric type of a `DataArray` element
pub enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    #[default]
    Float64,
}

impl ScalarType {
    /// parse the `type` attribute of a `DataArray` element
    pub fn from_vtk(name: &str) -> Option<Self> {
        let ty = match name {
            "Int8" | "Char" => Self::Int8,
            "UInt8" | "UnsignedChar" => Self::UInt8,
            "Int16" | "Short" => Self::Int16,
            "UInt16" | "UnsignedShort" => Self::UInt16,
            "Int32" | "Int" => Self::Int32,
            "UInt32" | "UnsignedInt" => Self::UInt32,
            "Int64" | "Long" | "IdType" => Self::Int64,
            "UInt64" | "UnsignedLong" => Self::UInt64,
            "Float32" | "Float" => Self::Float32,
            "Float64" | "Double" => Self::Float64,
            _ => return None,
        };
        Some(ty)
    }

    /// the name written to the `type` attribute
    pub fn vtk_name(&self) -> &'static str {
        match self {
            Self::Int8 => "Int8",
            Self::UInt8 => "UInt8",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
        }
    }

    /// number of bytes of a single element
    pub fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// decode a single element from exactly `self.size()` bytes
    pub(crate) fn decode(&self, bytes: &[u8], order: ByteOrder) -> f64 {
        match self {
            Self::Int8 => i8::from_le_bytes(fixed_bytes(bytes, order)) as f64,
            Self::UInt8 => u8::from_le_bytes(fixed_bytes(bytes, order)) as f64,
            Self::Int16 => i16::from_le_bytes(fixed_bytes(bytes, order)) as f64,
            Self::UInt16 => u16::from_le_bytes(fixed_bytes(bytes, order)) as f64,
            Self::Int32 => i32::from_le_bytes(fixed_bytes(bytes, order)) as f64,
            Self::UInt32 => u32::from_le_bytes(fixed_bytes(bytes, order)) as f64,
            Self::Int64 => i64::from_le_bytes(fixed_bytes(bytes, order)) as f64,
            Self::UInt64 => u64::from_le_bytes(fixed_bytes(bytes, order)) as f64,
            Self::Float32 => f32::from_le_bytes(fixed_bytes(bytes, order)) as f64,
            Self::Float64 => f64::from_le_bytes(fixed_bytes(bytes, order)),
        }
    }

    /// decode a whole buffer, ignoring any trailing partial element
    pub(crate) fn decode_all(&self, bytes: &[u8], order: ByteOrder) -> Vec<f64> {
        bytes
            .chunks_exact(self.size())
            .map(|chunk| self.decode(chunk, order))
            .collect()
    }

    /// little endian bytes of `value` converted to this type
    pub(crate) fn encode(&self, value: f64, out: &mut Vec<u8>) {
        match self {
            Self::Int8 => out.extend(value.to_i8().unwrap_or_default().to_le_bytes()),
            Self::UInt8 => out.extend(value.to_u8().unwrap_or_default().to_le_bytes()),
            Self::Int16 => out.extend(value.to_i16().unwrap_or_default().to_le_bytes()),
            Self::UInt16 => out.extend(value.to_u16().unwrap_or_default().to_le_bytes()),
            Self::Int32 => out.extend(value.to_i32().unwrap_or_default().to_le_bytes()),
            Self::UInt32 => out.extend(value.to_u32().unwrap_or_default().to_le_bytes()),
            Self::Int64 => out.extend(value.to_i64().unwrap_or_default().to_le_bytes()),
            Self::UInt64 => out.extend(value.to_u64().unwrap_or_default().to_le_bytes()),
            Self::Float32 => out.extend((value as f32).to_le_bytes()),
            Self::Float64 => out.extend(value.to_le_bytes()),
        }
    }

    /// ascii representation of `value` converted to this type
    pub(crate) fn format_ascii(&self, value: f64, buffer: &mut ryu::Buffer) -> String {
        if self.is_float() {
            if self == &Self::Float32 {
                buffer.format(value as f32).to_string()
            } else {
                buffer.format(value).to_string()
            }
        } else {
            value.to_i64().unwrap_or_default().to_string()
        }
    }
}
