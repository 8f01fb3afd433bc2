use serde::{Deserialize, Serialize};
use zarrs::array::{DataType, FillValue, data_type};

use crate::{Error, Result};

/// Numeric data type of a dimension or attribute.
///
/// This is the closed set of types the cf layer supports; each maps onto a
/// fixed-size zarr data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl Dtype {
    pub fn name(&self) -> &'static str {
        match self {
            Dtype::Int8 => "int8",
            Dtype::Int16 => "int16",
            Dtype::Int32 => "int32",
            Dtype::Int64 => "int64",
            Dtype::UInt8 => "uint8",
            Dtype::UInt16 => "uint16",
            Dtype::UInt32 => "uint32",
            Dtype::UInt64 => "uint64",
            Dtype::Float32 => "float32",
            Dtype::Float64 => "float64",
        }
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(self, Dtype::Int8 | Dtype::Int16 | Dtype::Int32 | Dtype::Int64)
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            Dtype::UInt8 | Dtype::UInt16 | Dtype::UInt32 | Dtype::UInt64
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Dtype::Float32 | Dtype::Float64)
    }

    /// The corresponding zarr data type.
    pub fn to_zarr(&self) -> DataType {
        match self {
            Dtype::Int8 => data_type::int8(),
            Dtype::Int16 => data_type::int16(),
            Dtype::Int32 => data_type::int32(),
            Dtype::Int64 => data_type::int64(),
            Dtype::UInt8 => data_type::uint8(),
            Dtype::UInt16 => data_type::uint16(),
            Dtype::UInt32 => data_type::uint32(),
            Dtype::UInt64 => data_type::uint64(),
            Dtype::Float32 => data_type::float32(),
            Dtype::Float64 => data_type::float64(),
        }
    }

    /// Zero of this type, used when an attribute defines no fill value.
    pub fn default_fill(&self) -> FillValue {
        match self {
            Dtype::Int8 => FillValue::from(0i8),
            Dtype::Int16 => FillValue::from(0i16),
            Dtype::Int32 => FillValue::from(0i32),
            Dtype::Int64 => FillValue::from(0i64),
            Dtype::UInt8 => FillValue::from(0u8),
            Dtype::UInt16 => FillValue::from(0u16),
            Dtype::UInt32 => FillValue::from(0u32),
            Dtype::UInt64 => FillValue::from(0u64),
            Dtype::Float32 => FillValue::from(0.0f32),
            Dtype::Float64 => FillValue::from(0.0f64),
        }
    }

    /// Convert a JSON number into a fill value of this type.
    pub fn fill_from_number(&self, number: &serde_json::Number) -> Result<FillValue> {
        let err = || {
            Error::schema(format!(
                "fill value {number} is not representable as {}",
                self.name()
            ))
        };
        let fill = match self {
            Dtype::Int8 => FillValue::from(
                i8::try_from(number.as_i64().ok_or_else(err)?).map_err(|_| err())?,
            ),
            Dtype::Int16 => FillValue::from(
                i16::try_from(number.as_i64().ok_or_else(err)?).map_err(|_| err())?,
            ),
            Dtype::Int32 => FillValue::from(
                i32::try_from(number.as_i64().ok_or_else(err)?).map_err(|_| err())?,
            ),
            Dtype::Int64 => FillValue::from(number.as_i64().ok_or_else(err)?),
            Dtype::UInt8 => FillValue::from(
                u8::try_from(number.as_u64().ok_or_else(err)?).map_err(|_| err())?,
            ),
            Dtype::UInt16 => FillValue::from(
                u16::try_from(number.as_u64().ok_or_else(err)?).map_err(|_| err())?,
            ),
            Dtype::UInt32 => FillValue::from(
                u32::try_from(number.as_u64().ok_or_else(err)?).map_err(|_| err())?,
            ),
            Dtype::UInt64 => FillValue::from(number.as_u64().ok_or_else(err)?),
            Dtype::Float32 => FillValue::from(number.as_f64().ok_or_else(err)? as f32),
            Dtype::Float64 => FillValue::from(number.as_f64().ok_or_else(err)?),
        };
        Ok(fill)
    }
}

impl std::fmt::Display for Dtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
